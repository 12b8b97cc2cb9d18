use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use conduit_client::{ConsumerClient, Outcome, StreamConsumer, TerminalRenderer};
use conduit_core::ChatRequest;
use conduit_origin::{
    fixtures, KeywordStageSelector, ProgressPacing, ProgressSource, TemplateResponder, TokenPacing,
    TokenSource,
};
use conduit_relay::{HttpUpstream, RelayService};
use conduit_server::{start_origin, start_relay, OriginState, ServerConfig, ServerHandle};
use conduit_settings::ConduitSettings;
use conduit_telemetry::{init_telemetry, parse_level, TelemetryConfig};

#[derive(Parser)]
#[command(name = "conduit", version, about = "Three-hop SSE streaming relay")]
struct Cli {
    /// Settings file (default: ~/.conduit/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the origin service
    Origin {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the relay service
    Relay {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        origin_url: Option<String>,
    },
    /// Stream a search through the relay and render it
    Search {
        #[arg(long, default_value = "homes near me")]
        query: String,
        #[arg(long)]
        relay_url: Option<String>,
    },
    /// Stream a chat answer about the sample property
    Chat {
        #[arg(long, default_value = "Tell me about this property")]
        query: String,
        #[arg(long)]
        relay_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => conduit_settings::load_settings_from_path(path),
        None => conduit_settings::load_settings(),
    }
    .context("failed to load settings")?;

    let level_name = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    let log_level = parse_level(level_name)
        .with_context(|| format!("invalid log level: {level_name}"))?;
    let _telemetry = init_telemetry(TelemetryConfig {
        log_level,
        module_levels: Vec::new(),
        json: settings.logging.json,
    })?;

    match cli.command {
        Command::Origin { host, port } => {
            let config = ServerConfig::new(
                host.unwrap_or_else(|| settings.origin.host.clone()),
                port.unwrap_or(settings.origin.port),
            );
            let handle = start_origin(config, origin_state(&settings)).await?;
            tracing::info!(port = handle.port, "origin ready");
            run_until_ctrl_c(handle).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Relay {
            host,
            port,
            origin_url,
        } => {
            let config = ServerConfig::new(
                host.unwrap_or_else(|| settings.relay.host.clone()),
                port.unwrap_or(settings.relay.port),
            );
            let origin_url = origin_url.unwrap_or_else(|| settings.relay.origin_url.clone());
            let timeout = Duration::from_secs(settings.relay.timeout_secs);
            let upstream = HttpUpstream::from_url(origin_url.clone(), timeout);
            let relay = RelayService::new(Arc::new(upstream), timeout);

            let handle = start_relay(config, relay).await?;
            tracing::info!(port = handle.port, %origin_url, "relay ready");
            run_until_ctrl_c(handle).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Search { query, relay_url } => {
            let client = consumer_client(&settings, relay_url);
            let mut renderer = TerminalRenderer::stdout();
            renderer.search_banner(&query);

            let mut consumer = StreamConsumer::new(renderer, client.timeout());
            let outcome = client.search(&query, &mut consumer).await;
            finish(outcome, consumer)
        }
        Command::Chat { query, relay_url } => {
            let client = consumer_client(&settings, relay_url);
            let property = fixtures::sample_property();
            let mut renderer = TerminalRenderer::stdout();
            renderer.chat_banner(&query, property.get("address").and_then(Value::as_str));

            let request = ChatRequest {
                property_details: property,
                user_question: query,
                chat_history: Vec::new(),
            };
            let mut consumer = StreamConsumer::new(renderer, client.timeout());
            let outcome = client.chat(&request, &mut consumer).await;
            finish(outcome, consumer)
        }
    }
}

fn origin_state(settings: &ConduitSettings) -> OriginState {
    let origin = &settings.origin;
    OriginState {
        progress: ProgressSource::new(
            Arc::new(KeywordStageSelector),
            fixtures::search_results(),
            ProgressPacing {
                char_delay: Duration::from_millis(origin.char_delay_ms),
                stage_budget: Duration::from_millis(origin.stage_budget_ms),
            },
        ),
        tokens: TokenSource::new(
            Arc::new(TemplateResponder),
            TokenPacing {
                token_delay: Duration::from_millis(origin.token_delay_ms),
            },
        ),
    }
}

fn consumer_client(settings: &ConduitSettings, relay_url: Option<String>) -> ConsumerClient {
    ConsumerClient::new(
        relay_url.unwrap_or_else(|| settings.client.relay_url.clone()),
        Duration::from_secs(settings.client.timeout_secs),
    )
}

async fn run_until_ctrl_c(handle: ServerHandle) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}

fn finish(outcome: Outcome, consumer: StreamConsumer<TerminalRenderer<std::io::Stdout>>) -> Result<ExitCode> {
    let mut renderer = consumer.into_renderer();
    if let Some(e) = renderer.take_error() {
        return Err(e).context("failed to write to terminal");
    }
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
