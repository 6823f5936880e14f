//! Maestro server binary.
//!
//! Exit codes: 0 clean shutdown, 1 configuration error (missing provider
//! credentials, malformed catalog), 2 unexpected crash.

use std::process::ExitCode;

use maestro_core::CoreError;
use maestro_server::{start_server, ConfigError, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_config_error(&e) => {
            tracing::error!("configuration error: {e:#}");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    start_server(config).await
}

fn is_config_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.is::<ConfigError>()
            || matches!(cause.downcast_ref::<CoreError>(), Some(CoreError::Catalog(_)))
    })
}
