use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::MetricsRegistry;
use common::cli::{CommonArgs, CommonCommands, utils};
use keymeter::standalone;
use registration::registrar::security_option;

#[derive(Parser)]
#[command(name = "keymeter")]
#[command(about = "keymeter - keyspace-aware metrics registration")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<KeymeterCommands>,
}

#[derive(Subcommand)]
enum KeymeterCommands {
    #[command(flatten)]
    Common(CommonCommands),
    /// Register metrics from the configuration against an embedded metadata service
    Register,
    /// Register metrics the way an external tool does, without TLS
    RegisterTool {
        #[arg(
            long,
            value_delimiter = ',',
            required = true,
            help = "Metadata service endpoints"
        )]
        endpoints: Vec<String>,

        #[arg(long, default_value = "", help = "Keyspace name")]
        keyspace: String,
    },
}

impl Default for KeymeterCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;

    match cli.command.unwrap_or_default() {
        KeymeterCommands::Common(command) => {
            if matches!(command, CommonCommands::Validate) {
                security_option(&config.security)
                    .validate()
                    .context("Invalid cluster TLS configuration")?;
            }
            utils::handle_common_command(&command, &config)?;
        }
        KeymeterCommands::Register => {
            let service = standalone::seeded_service(&[config.keyspace_name.as_str()]).await?;
            let registry = MetricsRegistry::default();
            let registration = standalone::registrar(service)
                .register_with_config(&config, &registry)
                .await
                .context("Metrics registration failed")?;
            for line in standalone::describe(&registration, &registry) {
                println!("{line}");
            }
            registry.shutdown();
        }
        KeymeterCommands::RegisterTool {
            endpoints,
            keyspace,
        } => {
            let service = standalone::seeded_service(&[keyspace.as_str()]).await?;
            let registry = MetricsRegistry::default();
            let registration = standalone::registrar(service)
                .register_for_tool(&endpoints, &keyspace, &registry)
                .await
                .context("Metrics registration failed")?;
            for line in standalone::describe(&registration, &registry) {
                println!("{line}");
            }
            registry.shutdown();
        }
    }

    Ok(())
}
