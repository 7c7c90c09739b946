use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared across all binaries
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Common subcommands available for all binaries
#[derive(Subcommand, Debug, Clone, Default)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    #[default]
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use crate::path::parse_path;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments
    pub fn init_logging(args: &CommonArgs) {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(log_level(args)))
            .init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("keymeter configuration:");
            println!("=======================");
            println!("Keyspace name: {:?}", config.keyspace_name);
            println!("Store: {} ({})", config.store, config.store_backend());
            println!("Path: {}", config.path);
            println!(
                "Metadata server timeout: {:?}",
                config.metadata_client.server_timeout
            );
            println!(
                "Cluster TLS: {}",
                if config.security.is_tls_enabled() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        if config.store_backend().is_cluster() {
            let path = parse_path(&config.path)
                .with_context(|| format!("Invalid metadata path '{}'", config.path))?;
            log::info!("Metadata endpoints: {}", path.endpoints.join(","));
        }

        if config.requires_keyspace_lookup() {
            log::info!(
                "Metrics will carry keyspace_id of keyspace '{}'",
                config.keyspace()
            );
        } else {
            log::info!("Metrics will be registered without keyspace_id");
        }

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Run one of the common commands against `config`
    pub fn handle_common_command(command: &CommonCommands, config: &Configuration) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestConfigBuilder;

    #[test]
    fn test_common_commands_default() {
        assert!(matches!(CommonCommands::default(), CommonCommands::Validate));
    }

    #[test]
    fn test_log_level() {
        let args = CommonArgs {
            config: None,
            verbose: true,
            quiet: false,
        };
        assert_eq!(utils::log_level(&args), "debug");
        let args = CommonArgs {
            quiet: true,
            ..args
        };
        assert_eq!(utils::log_level(&args), "warn");
    }

    #[test]
    fn test_validate_config() {
        let ok = TestConfigBuilder::new()
            .cluster("pd-0:2379")
            .with_keyspace("tenant_7")
            .build();
        assert!(utils::validate_config(&ok).is_ok());

        let bad = TestConfigBuilder::new().cluster("pd-0").build();
        assert!(utils::validate_config(&bad).is_err());

        // Path is irrelevant for the local store.
        let local = TestConfigBuilder::new().local().with_path("pd-0").build();
        assert!(utils::validate_config(&local).is_ok());
    }

    #[test]
    fn test_handle_common_command() {
        let config = TestConfigBuilder::new().build();
        assert!(utils::handle_common_command(&CommonCommands::Validate, &config).is_ok());
        assert!(utils::handle_common_command(&CommonCommands::Version, &config).is_ok());

        let bad = TestConfigBuilder::new().cluster("pd-0").build();
        assert!(utils::handle_common_command(&CommonCommands::Validate, &bad).is_err());
    }

    #[test]
    fn test_version_info() {
        let version = utils::version_info();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
    }
}
