use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opcon")]
#[command(about = "Embed an external tool's window inside a host container")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the tool and embed its window into a container
    Run {
        /// Executable to launch
        #[arg(long, value_name = "PATH")]
        exe: Option<PathBuf>,

        /// Native handle of the container window (decimal or 0x-prefixed hex)
        #[arg(long, value_name = "HWND")]
        container: String,

        /// Native handle of the top-level host window; defaults to the
        /// container
        #[arg(long, value_name = "HWND")]
        host_window: Option<String>,

        /// Exact window title to embed
        #[arg(long)]
        title: Option<String>,

        /// Title substring to match (repeatable)
        #[arg(long = "keyword", value_name = "TEXT")]
        keywords: Vec<String>,

        /// JSON configuration file; flags override its values
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Fail on discovery timeout instead of offering manual selection
        #[arg(long)]
        no_manual: bool,
    },

    /// List visible top-level windows with their handles
    Windows {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Parses a window handle given as decimal or `0x`-prefixed hex.
pub fn parse_handle(text: &str) -> anyhow::Result<isize> {
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => isize::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|_| anyhow::anyhow!("invalid window handle: {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_run_with_keywords_and_handles() {
        let cli = Cli::try_parse_from([
            "opcon",
            "run",
            "--exe",
            "C:/tools/editor.exe",
            "--container",
            "0x1a2b",
            "--host-window",
            "4242",
            "--keyword",
            "MASTER",
            "--keyword",
            "TAIHO",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                container,
                host_window,
                keywords,
                no_manual,
                ..
            } => {
                assert_eq!(parse_handle(&container).unwrap(), 0x1a2b);
                assert_eq!(parse_handle(&host_window.unwrap()).unwrap(), 4242);
                assert_eq!(keywords, vec!["MASTER", "TAIHO"]);
                assert!(!no_manual);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn handle_parsing_rejects_garbage() {
        assert!(parse_handle("0xzz").is_err());
        assert!(parse_handle("not-a-number").is_err());
        assert_eq!(parse_handle(" 17 ").unwrap(), 17);
    }
}
