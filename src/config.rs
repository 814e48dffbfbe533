//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "pomodoro-timer")]
#[command(about = "A state-managed HTTP daemon for a Pomodoro focus/break timer")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// File holding persisted settings and the associated task
    #[arg(long, default_value = "pomodoro-store.json")]
    pub store: PathBuf,

    /// Base URL of the task service (e.g. http://localhost:5000)
    #[arg(long)]
    pub task_service: Option<String>,

    /// Show desktop notifications when a phase ends
    #[arg(long)]
    pub desktop_notifications: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["pomodoro-timer"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.store, PathBuf::from("pomodoro-store.json"));
        assert!(config.task_service.is_none());
        assert!(!config.desktop_notifications);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn parses_flags() {
        let config = Config::try_parse_from([
            "pomodoro-timer",
            "-p",
            "9000",
            "--task-service",
            "http://localhost:5000",
            "--desktop-notifications",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.task_service.as_deref(), Some("http://localhost:5000"));
        assert!(config.desktop_notifications);
        assert_eq!(config.log_level(), "debug");
    }
}
