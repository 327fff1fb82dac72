//! Command-line interface handling for the webhook monitor.
//!
//! This module provides command-line argument parsing using the `clap`
//! crate. Every flag overrides the matching configuration file setting.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Command line arguments parsed from user input.
///
/// This structure holds all the command-line options that can be used to
/// override configuration file settings.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the dashboard port
    pub port: Option<u16>,
    /// Optional override for the webhook port
    pub webhook_port: Option<u16>,
    /// Optional override for the bind host
    pub host: Option<String>,
    /// Optional override for the webhook signing secret
    pub signing_secret: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    ///
    /// Invalid arguments print clap's usage message and exit.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, returning clap's error instead of
    /// exiting.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            port: matches.get_one::<u16>("port").copied(),
            webhook_port: matches.get_one::<u16>("webhook-port").copied(),
            host: matches.get_one::<String>("host").cloned(),
            signing_secret: matches.get_one::<String>("signing-secret").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

fn command() -> Command {
    Command::new("Webhook Monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live monitor for payments platform webhooks")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Dashboard port; webhooks listen on the next port unless --webhook-port is set")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("webhook-port")
                .long("webhook-port")
                .value_name("PORT")
                .help("Webhook port")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("ADDRESS")
                .help("Bind address for both listeners (e.g., 0.0.0.0)"),
        )
        .arg(
            Arg::new("signing-secret")
                .long("signing-secret")
                .value_name("SECRET")
                .help("Webhook signing secret"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}
