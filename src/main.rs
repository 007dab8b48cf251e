mod cli;
mod commands;
mod diary;
mod env_loader;
mod error;
mod logging;

fn main() {
    if let env_loader::DotenvLoadOutcome::LoadedFallback(path) = env_loader::load_dotenv() {
        logging::info("env", &[("dotenv", path.display().to_string().as_str())]);
    }
    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
