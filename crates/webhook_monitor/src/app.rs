//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates monitor
//! startup, signal handling, and graceful shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, wait_for_signal},
};
use monitor_events::ShutdownState;
use monitor_server::MonitorServer;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the server task gets to drain after shutdown is initiated.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(8);

/// Main application struct.
///
/// Owns the merged configuration and the monitor server built from it.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Monitor server instance
    server: MonitorServer,
}

/// Loads the configuration file and layers environment and CLI overrides
/// on top, in that order.
pub async fn load_config(args: &CliArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    config.apply_env_overrides();
    apply_cli_overrides(&mut config, args);
    Ok(config)
}

/// Applies command-line overrides to a loaded configuration.
pub fn apply_cli_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(webhook_port) = args.webhook_port {
        config.server.webhook_port = Some(webhook_port);
    }

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }

    if let Some(secret) = &args.signing_secret {
        config.platform.signing_secret = Some(secret.clone());
    }

    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }

    if args.json_logs {
        config.logging.json_format = true;
    }
}

impl Application {
    /// Creates a new application from a merged configuration.
    ///
    /// # Process
    ///
    /// 1. Validate the configuration
    /// 2. Display startup banner
    /// 3. Build the monitor server and its platform client
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration validated successfully");

        display_banner();

        let server = MonitorServer::new(config.to_server_config()?)?;
        Ok(Self { config, server })
    }

    /// Runs the monitor until a termination signal arrives.
    ///
    /// Both listeners are bound before this returns control to the signal
    /// handler, so a port conflict is reported as a startup error. A second
    /// signal during shutdown exits immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting webhook monitor");
        self.log_configuration_summary();

        let store = self.server.store();
        let bound = self.server.bind().await?;
        let dashboard_addr = bound.dashboard_addr()?;
        let webhook_addr = bound.webhook_addr()?;

        let shutdown_state = ShutdownState::new();
        let mut server_handle = tokio::spawn(bound.serve(shutdown_state.clone()));

        info!("✅ Webhook monitor is now running!");
        info!("🖥️ Dashboard API on http://{}", dashboard_addr);
        info!("📬 Point the platform's webhooks at http://{}/", webhook_addr);
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            signal = setup_signal_handlers(&shutdown_state) => signal?,
            finished = &mut server_handle => {
                // the server only stops on its own when a listener failed
                shutdown_state.initiate_shutdown();
                return match finished {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(format!("Server task failed: {e}").into()),
                };
            }
        }

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown signal received again! Exiting immediately.");
            std::process::exit(1);
        });

        info!("⏳ Waiting for server task to complete gracefully...");
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Server task completed gracefully"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => warn!("⏰ Server task did not complete within {:?}", SHUTDOWN_TIMEOUT),
        }
        shutdown_state.complete_shutdown();

        info!("📊 Final Statistics:");
        info!("  - Events recorded: {}", store.total_recorded().await);
        info!("  - Events cached: {}", store.cached_len().await);

        info!("✅ Webhook monitor shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let config = &self.config;
        info!("📋 Configuration Summary:");
        info!(
            "  🌐 Dashboard: {}:{} | Webhooks: {}:{}",
            config.server.host,
            config.server.port,
            config.server.host,
            config.server.effective_webhook_port()
        );
        info!(
            "  🔐 Signature verification: {}",
            if config.platform.signing_secret().is_some() { "enabled" } else { "DISABLED" }
        );
        info!(
            "  🔑 Platform API key: {}",
            if config.platform.api_key().is_some() { "configured" } else { "missing" }
        );
        info!(
            "  📈 Stats window: {} samples every {}ms ({:?} while paused)",
            config.stats.max_event_count, config.stats.interval_ms, config.stats.paused_tick_policy
        );
        match config.cache.max_events {
            Some(max) => info!("  🗃️ Event cache: up to {} events", max),
            None => info!("  🗃️ Event cache: unbounded"),
        }
    }
}
