pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, LogLevel, TransportKind};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging_safe};

use crate::domain::ShipError;
use crate::identity::StreamIdentity;
use crate::reliability::{RetryPolicy, RetryingTransport};
use crate::sender::{
    DispatchAck, EnvCredentialResolver, HttpQueueTransport, QueueTransport, SqsTransport,
};
use crate::shipper::{LogShipper, ShipOptions};
use clap::Parser;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// Command line of the `rask-log-shipper` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "rask-log-shipper", author, version, about = "Ship log events to the durable log queue")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// Destination log group
    #[arg(long, short = 'g', env = "LOG_GROUP_NAME", default_value = "")]
    pub log_group: String,

    /// Severity 0-5 (0 drops the call, 2 is INFO)
    #[arg(long, short = 'l', default_value_t = 2)]
    pub level: i64,

    /// Stream name overriding the process stream identity
    #[arg(long)]
    pub stream_name: Option<String>,

    /// Messages to ship; one per stdin line when omitted
    pub messages: Vec<String>,
}

pub struct App {
    cli: Cli,
    config: Config,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::parse_from(args);
        Self::from_cli(cli)
    }

    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let config = if let Some(config_file) = &cli.config.config_file {
            Config::from_file(config_file)?
        } else {
            let mut config = cli.config.clone();
            config.post_process()?;
            config.validate()?;
            config
        };
        Ok(Self { cli, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    pub async fn run(self) -> anyhow::Result<Vec<DispatchAck>> {
        info!(
            "Starting rask-log-shipper v{} (transport={:?})",
            env!("CARGO_PKG_VERSION"),
            self.config.transport
        );

        match self.config.transport {
            TransportKind::Sqs => {
                let transport = if self.config.use_named_credentials {
                    SqsTransport::from_resolver(
                        &EnvCredentialResolver::new(),
                        &self.config.credentials_name,
                        self.config.queue_url.clone(),
                        self.config.fifo,
                    )
                    .await?
                } else {
                    SqsTransport::from_env(self.config.queue_url.clone(), self.config.fifo).await
                };
                self.ship_with(transport).await
            }
            TransportKind::Http => {
                let transport = HttpQueueTransport::new(self.config.http_transport_config())?;
                self.ship_with(transport).await
            }
        }
    }

    async fn ship_with<T: QueueTransport>(self, transport: T) -> anyhow::Result<Vec<DispatchAck>> {
        let policy = RetryPolicy::from(&self.config.retry);
        let shipper = LogShipper::new(
            Arc::new(RetryingTransport::new(transport, policy)),
            Arc::new(StreamIdentity::new()),
            self.config.shipper_settings(),
        );

        let events = if self.cli.messages.is_empty() {
            read_stdin_lines().await?
        } else {
            self.cli.messages
        };

        let options = ShipOptions {
            level: self.cli.level,
            stream_identity: self.cli.stream_name,
        };
        let acknowledgements = shipper.ship(events, &self.cli.log_group, options).await?;
        Ok(acknowledgements)
    }
}

async fn read_stdin_lines() -> std::io::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events = Vec::new();
    while let Some(line) = lines.next_line().await? {
        events.push(line);
    }
    Ok(events)
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let app = App::from_args(std::env::args_os())?;

    if let Err(e) = setup_logging_safe(app.config().log_level, app.config().log_format) {
        eprintln!("Warning: {e}, continuing without structured logging");
    }

    match app.run().await {
        Ok(acknowledgements) => {
            for ack in &acknowledgements {
                println!("{}", ack.message_id);
            }
            Ok(())
        }
        Err(e) => {
            if let Some(ship_error) = e.downcast_ref::<ShipError>() {
                for failure in ship_error.failures() {
                    error!("Undelivered {}", failure);
                }
            }
            error!("Shipping failed: {:#}", e);
            process::exit(1);
        }
    }
}
