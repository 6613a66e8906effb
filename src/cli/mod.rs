//! CLI module for Tubelens.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Tubelens - transcripts and AI analysis for YouTube videos
///
/// Fetches a video's transcript through a chain of fallback strategies
/// (captions, webhook bridge, subtitle download, speech-to-text) and asks a
/// language model for a structured analysis of it.
#[derive(Parser, Debug)]
#[command(name = "tubelens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TUBELENS_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Fetch a video's transcript and analyze it
    Analyze {
        /// YouTube URL or 11-character video ID
        url: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch a video's normalized transcript without analysis
    Transcript {
        /// YouTube URL or 11-character video ID
        url: String,

        /// Write the transcript to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Transcribe and analyze a local audio file
    Upload {
        /// Path to an audio file (mp3, wav, m4a, mp4, webm, ogg, flac)
        file: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tubelens",
            "-vv",
            "analyze",
            "https://youtu.be/dQw4w9WgXcQ",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze { url, json } => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_defaults_to_config() {
        let cli = Cli::try_parse_from(["tubelens", "serve", "--port", "8080"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
