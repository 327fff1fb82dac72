//! # Webhook Monitor - Main Entry Point
//!
//! Receives signed webhook deliveries from a payments platform and streams
//! them to dashboard clients in real time. This entry point handles CLI
//! parsing, configuration loading, and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! webhook-monitor
//!
//! # Specify custom configuration
//! webhook-monitor --config production.toml
//!
//! # Override specific settings
//! webhook-monitor --host 0.0.0.0 --port 4000 --signing-secret whsec_... --log-level debug
//!
//! # JSON logging for production
//! webhook-monitor --json-logs
//! ```
//!
//! ## Configuration
//!
//! The monitor loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//! `MONITOR_API_KEY` and `MONITOR_SIGNING_SECRET` override the file's
//! secrets; command-line flags override both.
//!
//! ## Signal Handling
//!
//! The monitor shuts down gracefully on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;

// Re-export main types for potential library usage
pub use config::{
    AppConfig, CacheSettings, LoggingSettings, PlatformSettings, ServerSettings, StatsSettings,
};

/// Runs the webhook monitor.
///
/// Handles the complete application lifecycle:
/// 1. Command-line argument parsing
/// 2. Configuration loading with environment and CLI overrides
/// 3. Logging system initialization
/// 4. Application creation and execution
///
/// Any error returned here is fatal; the binary exits with status 1.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config = app::load_config(&args).await?;

    logging::setup_logging(&config.logging, args.json_logs)?;

    Application::new(config)?.run().await
}
