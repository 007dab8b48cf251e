use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotenvLoadOutcome {
    LoadedDefault,
    LoadedFallback(PathBuf),
    Missing,
}

fn fallback_dotenv_path(diary_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = diary_home {
        return Some(base.join(".env"));
    }
    Some(home_dir?.join("diary/.env"))
}

pub fn load_dotenv() -> DotenvLoadOutcome {
    if dotenvy::dotenv().is_ok() {
        return DotenvLoadOutcome::LoadedDefault;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("DIARY_HOME")
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty()),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return DotenvLoadOutcome::Missing;
    };
    if path.is_file() && dotenvy::from_path(&path).is_ok() {
        return DotenvLoadOutcome::LoadedFallback(path);
    }

    DotenvLoadOutcome::Missing
}
