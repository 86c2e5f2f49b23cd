mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use lockscreen_core::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "lockscreen", version)]
#[command(about = "Render today's calendar events onto a lockscreen image and publish it")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, render and upload to S3 (the default)
    Run {
        #[command(flatten)]
        target: Target,
    },
    /// Render to a local file without uploading
    Preview {
        #[command(flatten)]
        target: Target,

        /// Where to write the JPEG
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write a sample config file
    Init {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[derive(Args)]
pub(crate) struct Target {
    /// Config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub(crate) config: PathBuf,

    /// Render this date instead of today (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| Commands::Run {
        target: Target {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            date: None,
        },
    });

    let result = match command {
        Commands::Run { target } => commands::run::run(&target).await,
        Commands::Preview { target, output } => commands::preview::run(&target, &output).await,
        Commands::Init { config } => commands::init::run(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Config errors happen before the configured subscriber is up.
            logging::init(None);
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_preview_target_args() {
        let cli = Cli::try_parse_from([
            "lockscreen",
            "preview",
            "--output",
            "out.jpg",
            "--date",
            "2025-09-26",
        ])
        .unwrap();

        let Some(Commands::Preview { target, output }) = cli.command else {
            panic!("expected preview");
        };
        assert_eq!(target.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(target.date, NaiveDate::from_ymd_opt(2025, 9, 26));
        assert_eq!(output, PathBuf::from("out.jpg"));
    }

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["lockscreen"]).unwrap();
        assert!(cli.command.is_none());
    }
}
