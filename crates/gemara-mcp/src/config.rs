use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mcp_common::fetch::FetchConfig;

use crate::error::AppError;

const BUILD: &str = match option_env!("GEMARA_BUILD") {
    Some(build) => build,
    None => "dev",
};

/// Version string reported by the `version` subcommand and the MCP handshake log.
pub fn version() -> String {
    format!("{}-{}", env!("CARGO_PKG_VERSION"), BUILD)
}

#[derive(Debug, Parser)]
#[command(
    name = "gemara-mcp-server",
    about = "Gemara MCP Server",
    long_about = "A Model Context Protocol server for Gemara (GRC Engineering Model for \
                  Automated Risk Assessment) artifacts with CUE import support"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "GEMARA_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Serve MCP over TCP at this address instead of stdio (e.g. 127.0.0.1:7070).
    #[arg(long, env = "MCP_TCP_LISTEN_ADDR")]
    pub listen: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print version information.
    Version,
}

/// Application configuration assembled from flags and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_file: Option<PathBuf>,
    pub listen_addr: Option<String>,
    pub fetch: FetchConfig,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let listen_addr = match cli.listen.as_deref().map(str::trim) {
            Some("") => {
                return Err(AppError::Config(
                    "--listen / MCP_TCP_LISTEN_ADDR must not be empty".to_string(),
                ))
            }
            other => other.map(str::to_string),
        };

        Ok(Self {
            log_file: cli.log_file.clone(),
            listen_addr,
            fetch: FetchConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_subcommand_parses() {
        let cli = Cli::try_parse_from(["gemara-mcp-server", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn flags_populate_config() {
        let cli = Cli::try_parse_from([
            "gemara-mcp-server",
            "--log-file",
            "/tmp/gemara.log",
            "--listen",
            "127.0.0.1:7070",
        ])
        .unwrap();
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/gemara.log")));
        assert_eq!(config.listen_addr.as_deref(), Some("127.0.0.1:7070"));
    }

    #[test]
    fn blank_listen_address_is_rejected() {
        let cli = Cli::try_parse_from(["gemara-mcp-server", "--listen", " "]).unwrap();
        let err = Config::from_cli(&cli).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn version_includes_build_tag() {
        assert!(version().starts_with(env!("CARGO_PKG_VERSION")));
        assert!(version().contains('-'));
    }
}
