use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use smtrace::Engine;

#[derive(Parser)]
#[command(name = "smtrace")]
#[command(about = "Extracts state machine transition graphs from step-builder code")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Trace step methods and export the transition graph
    Trace {
        /// Source directory to analyze (defaults to the configured source dirs)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output file for the JSON graph (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => {
                engine.init(path).await?;
                Ok(())
            }
            Commands::Trace { source, output } => {
                engine.trace(source, output).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace_command() {
        let cli = Cli::try_parse_from(["smtrace", "-v", "trace", "--source", "pkg", "-o", "out.json"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Trace { source, output } => {
                assert_eq!(source, Some(PathBuf::from("pkg")));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected trace command"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["smtrace", "init", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Init { path: None }));
    }
}
