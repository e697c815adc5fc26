use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rulebook::PipelineHandler;
use rulebook_core::config::Config;
use rulebook_core::vault::EnvVaultProvider;
use rulebook_core::AskPipeline;
use rulebook_gateway::GatewayServer;
use rulebook_llm::OpenAiProvider;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Answer questions about the rulebook over HTTP.
#[derive(Debug, Parser)]
#[command(name = "rulebook", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config);
    let mut config = Config::load(&config_path)?;
    config.validate()?;
    config
        .resolve_secrets(&EnvVaultProvider)
        .await
        .context("failed to resolve secrets")?;
    let api_key = config.require_api_key()?.expose().to_owned();

    let provider = OpenAiProvider::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
    )
    .with_timeout(Duration::from_secs(config.llm.timeout_secs))
    .with_max_retries(config.llm.max_retries);
    tracing::info!(
        model = provider.model(),
        embedding_model = provider.embedding_model(),
        document = %config.document.path,
        "using OpenAI provider"
    );

    let pipeline = Arc::new(
        AskPipeline::from_config(Arc::new(provider), &config)
            .context("invalid index configuration")?,
    );

    if config.index.warm_up {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            pipeline.warm_up().await;
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        Arc::new(PipelineHandler::new(pipeline)),
        shutdown_rx,
    )
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await?;

    Ok(())
}

fn init_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli {
        return path;
    }
    if let Ok(path) = std::env::var("RULEBOOK_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_default() {
        let path = resolve_config_path(Some(PathBuf::from("/etc/rulebook.toml")));
        assert_eq!(path, PathBuf::from("/etc/rulebook.toml"));
    }

    #[test]
    fn cli_parses_config_flag() {
        let cli = Cli::try_parse_from(["rulebook", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));

        let cli = Cli::try_parse_from(["rulebook"]).unwrap();
        assert!(cli.config.is_none());
    }
}
