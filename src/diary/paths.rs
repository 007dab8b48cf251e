use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DiaryPaths {
    pub diary_home: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
}

impl DiaryPaths {
    pub fn audit_log(&self) -> PathBuf {
        self.logs_dir.join("audit.log")
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

fn diary_home_from_inputs(home: PathBuf, diary_home_env: Option<&str>) -> PathBuf {
    match diary_home_env {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => home.join("diary"),
    }
}

pub fn resolve_paths() -> Result<DiaryPaths> {
    let home = required_home_dir()?;
    let diary_home_env = env::var("DIARY_HOME").ok();
    let diary_home = diary_home_from_inputs(home, diary_home_env.as_deref());

    let logs_dir = env_or_default_path("DIARY_LOGS_DIR", diary_home.join("logs"));
    let config_file = env_or_default_path("DIARY_CONFIG_PATH", diary_home.join("diary.toml"));

    Ok(DiaryPaths {
        diary_home,
        logs_dir,
        config_file,
    })
}
