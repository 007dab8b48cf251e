use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::diary::config::PublishMode;

#[derive(Debug, Parser)]
#[command(name = "diary-bot")]
#[command(about = "Write one generated entry to the shared diary log and exit")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DIARY_BUILD_ID"), ")"))]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate and publish today's entry (default).
    Run(RunArgs),
    /// List one day's entries.
    History(HistoryArgs),
    /// Validate and print the resolved configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// Skip publishing when this author already wrote today.
    #[arg(long)]
    pub skip_if_duplicate: bool,
    #[arg(long, value_parser = parse_publish_mode)]
    pub publish_mode: Option<PublishMode>,
    /// Generate and sanitize, but do not write.
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args, Default)]
pub struct HistoryArgs {
    /// Day to list, YYYY-MM-DD. Defaults to today in the configured offset.
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Args, Default)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

fn parse_publish_mode(raw: &str) -> Result<PublishMode, String> {
    PublishMode::parse(raw).ok_or_else(|| format!("expected append or overwrite-day, got `{raw}`"))
}

fn print_report(report: &commands::CommandReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("command: {}", report.command);
    println!("ok: {}", report.ok);
    if !report.details.is_empty() {
        println!("details:");
        for detail in &report.details {
            println!("- {detail}");
        }
    }
    if !report.issues.is_empty() {
        println!("issues:");
        for issue in &report.issues {
            println!("- {issue}");
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));
    let report = match command {
        Command::Run(args) => commands::diary_run::run(&commands::diary_run::DiaryRunOptions {
            skip_if_duplicate: args.skip_if_duplicate,
            publish_mode: args.publish_mode,
            dry_run: args.dry_run,
            seed: args.seed,
        })?,
        Command::History(args) => {
            commands::diary_history::run(&commands::diary_history::DiaryHistoryOptions {
                date: args.date,
            })?
        }
        Command::Config(args) => {
            commands::diary_config::run(&commands::diary_config::DiaryConfigOptions {
                show: args.show,
            })?
        }
    };

    print_report(&report, cli.json)?;

    if report.ok {
        Ok(())
    } else {
        std::process::exit(2);
    }
}
