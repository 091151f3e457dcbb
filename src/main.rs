use anyhow::{anyhow, Context};
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use thumbnailer::app::thumbnails::{InvocationContext, ThumbnailService};
use thumbnailer::config::AppConfig;
use thumbnailer::infra::{queue::QueueClient, storage::ObjectStorage};
use thumbnailer::jobs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let storage = ObjectStorage::new(&config).await?;
    let service = ThumbnailService::new(
        Arc::new(storage),
        config.destination_bucket.clone(),
        config.thumbnail_spec(),
        config.key_extension,
        Duration::from_secs(config.invocation_timeout_seconds),
    );

    match config.app_mode.as_str() {
        "worker" => {
            let queue = QueueClient::new(&config).await?;
            tracing::info!(
                destination_bucket = %service.destination_bucket(),
                "starting worker mode"
            );
            tokio::select! {
                result = jobs::thumbnail_worker::run(service, queue) => {
                    result?;
                }
                _ = shutdown_signal() => {}
            }
        }
        "once" => {
            let event = read_event(config.event_path.as_deref())?;
            let ctx = InvocationContext::new(Uuid::new_v4().to_string());
            let event = service.handle(event, &ctx).await?;
            println!("{}", serde_json::to_string(&event)?);
        }
        other => return Err(anyhow!("unknown APP_MODE: {}", other)),
    }

    Ok(())
}

fn read_event(path: Option<&str>) -> anyhow::Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event from {}", path))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read event from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
