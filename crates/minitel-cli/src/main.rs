//! `minitel`: run one MiniTel-Lite emergency override attempt.
//!
//! Connects to the server, performs HELLO → DUMP → DUMP → STOP and logs the
//! override code. Every option can also be set through its `MINITEL_*`
//! environment variable; log verbosity follows `RUST_LOG` (default `info`).
//!
//! Exit status is 0 only when the whole exchange completed. A code obtained
//! before a later failure is still logged.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use minitel_client::{
    ClientConfig, HandshakeDriver, HandshakeEvent, JsonSessionRecorder, Outcome, SystemEnv,
    TcpTransport, config::DEFAULT_PORT,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "minitel", version, about = "MiniTel-Lite emergency override client")]
struct Cli {
    /// Server host name or address
    #[arg(long, env = "MINITEL_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(long, env = "MINITEL_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect timeout in milliseconds
    #[arg(long, env = "MINITEL_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    connect_timeout_ms: u64,

    /// Per-command response timeout in milliseconds
    #[arg(long, env = "MINITEL_RESPONSE_TIMEOUT_MS", default_value_t = 5_000)]
    response_timeout_ms: u64,

    /// Bytes requested per transport read
    #[arg(long, env = "MINITEL_READ_BUFFER_SIZE", default_value_t = 4096)]
    read_buffer_size: usize,

    /// Record the session as JSON into this directory
    #[arg(long = "record", env = "MINITEL_RECORD_DIR", value_name = "DIR")]
    record_dir: Option<PathBuf>,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            read_buffer_size: self.read_buffer_size.max(1),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.client_config();
    info!(server = %config.address(), "starting override attempt");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let status = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let HandshakeEvent::Progress(progress) = event {
                info!("{progress}");
            }
        }
    });

    let mut driver =
        HandshakeDriver::new(TcpTransport, SystemEnv, config.clone()).with_events(tx);
    if let Some(dir) = &cli.record_dir {
        info!(dir = %dir.display(), "recording session");
        driver = driver.with_recorder(JsonSessionRecorder::new(dir, config.host, config.port));
    }

    let outcome = driver.run().await;
    drop(driver);
    if let Err(err) = status.await {
        warn!(%err, "status task ended abnormally");
    }

    match outcome {
        Outcome::Completed { override_code } => {
            info!(override_code = %override_code, "override code obtained");
            ExitCode::SUCCESS
        },
        Outcome::Failed { error, override_code: Some(code) } => {
            warn!(
                override_code = %code,
                %error,
                "override code obtained, but the exchange failed"
            );
            ExitCode::FAILURE
        },
        Outcome::Failed { error, override_code: None } => {
            error!(%error, "override attempt failed");
            ExitCode::FAILURE
        },
    }
}
