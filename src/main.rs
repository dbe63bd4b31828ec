use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use baps_gateway::config::GatewayConfig;
use baps_gateway::output::write_stdout_line;
use baps_gateway::protocol::codes::CodeGroup;
use baps_gateway::{telemetry, Client, GatewayError, Result};

#[derive(Parser, Debug)]
#[command(
    name = "baps-gateway",
    version,
    about = "Connect to a BAPS playout server, log in and follow its updates"
)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Server host.
    #[arg(long)]
    host: Option<String>,

    /// Server port.
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Write synchronised responses to stdout as JSON lines.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List protocol codes, optionally for one group.
    Codes {
        /// playback, playlist, database, config or system.
        group: Option<String>,
    },
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(username) = &self.username {
            config.auth.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.auth.password = password.clone();
        }
        if self.json {
            config.output.json = true;
        }
        if let Some(level) = telemetry::level_from_verbosity(self.verbose) {
            config.logging.level = level.to_string().to_lowercase();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Codes { group }) = &cli.command {
        return match list_codes(group.as_deref()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::from(2)
            }
        };
    }

    let config = match GatewayConfig::load(cli.config.as_deref()) {
        Ok(mut config) => {
            cli.apply(&mut config);
            config
        }
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = telemetry::init(&config.logging.level) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Fatal session errors are already logged where they happen
            if !matches!(
                e,
                GatewayError::ConnectionLost | GatewayError::AuthenticationFailed { .. }
            ) && !e.is_protocol()
            {
                tracing::error!(error = %e, "gateway stopped");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: GatewayConfig) -> Result<()> {
    let client = Client::builder()
        .credentials(config.auth.username.clone(), config.auth.password.clone())
        .channel_capacity(config.writer_config().channel_capacity)
        .json_output(config.output.json)
        .connect(&config.server.host, config.server.port)
        .await?;

    client
        .run_until(interrupted(tokio::signal::ctrl_c()))
        .await
}

/// Resolve when `signal` fires. If the handler could not be installed the
/// session runs until it ends on its own.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("interrupted, closing session"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

fn list_codes(group: Option<&str>) -> Result<()> {
    let groups = match group {
        Some(name) => vec![name.parse::<CodeGroup>()?],
        None => CodeGroup::ALL.to_vec(),
    };

    for group in groups {
        for (code, name) in group.codes() {
            write_stdout_line(&format!("{:<8} 0x{code:04X}  {name}", group.name()))?;
        }
    }
    Ok(())
}
