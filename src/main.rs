//! slack-mcp - Main entry point.

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use slack_mcp::{
    cli::{Cli, Command, LogFormat},
    config::{Config, McpTransportKind, load_env_file},
    mcp::{McpServer, mcp_router, serve_stdio},
    queue::{EventConsumer, MemoryBackend, QueueBackend},
    server::{bind, serve, shutdown_signal, with_middleware},
    slack::{ClientManager, HttpSlackApiFactory, TokenSource, credentials::default_token_sources},
    tools::{ToolRegistry, register_slack_tools},
    webhook::{EventDispatcher, WebhookState, webhook_router},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load the env file before anything reads the environment
    if let Some((path, required)) = cli.env_file() {
        load_env_file(path, required)?;
    }

    init_tracing(&cli);

    let mut config = Config::from_env()?;
    cli.apply_overrides(&mut config);
    tracing::debug!(?config, "Loaded configuration");

    let clients = Arc::new(build_client_manager(&cli, &config)?);
    if !clients.has_default_token() {
        tracing::warn!(
            "No default Slack token configured; tools need an explicit 'token' argument \
             and webhook events cannot be answered"
        );
    }

    match &cli.command {
        Command::Mcp(args) => run_mcp(&config, clients, args.integrated).await,
        Command::Webhook(args) => run_webhook(&config, clients, args.integrated).await,
    }
}

/// Logs go to stderr so stdout stays free for the stdio transport.
fn init_tracing(cli: &Cli) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn build_client_manager(cli: &Cli, config: &Config) -> anyhow::Result<ClientManager> {
    let factory = HttpSlackApiFactory::from_config(&config.slack)?;
    let policy = config
        .retry
        .policy()
        .context("Invalid Slack retry settings")?;

    let mut sources = default_token_sources();
    if let Some(token) = &cli.slack_token {
        sources.push(TokenSource::fixed("--slack-token", token.clone()));
    }

    Ok(ClientManager::new(Arc::new(factory), policy).with_token_sources(sources))
}

fn build_mcp_server(clients: Arc<ClientManager>) -> anyhow::Result<McpServer> {
    let mut registry = ToolRegistry::new();
    register_slack_tools(&mut registry, clients)?;
    tracing::info!(tools = registry.len(), "Registered MCP tools");
    Ok(McpServer::new(registry))
}

/// Webhook state plus the consumer draining its queue.
struct EventPipeline {
    state: WebhookState,
    queue: Arc<MemoryBackend>,
    consumer: Arc<EventConsumer>,
    handle: JoinHandle<()>,
}

impl EventPipeline {
    fn start(config: &Config, clients: Arc<ClientManager>) -> Self {
        let queue = Arc::new(MemoryBackend::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&clients),
            config.slack.bot_id.clone(),
        ));
        let consumer = Arc::new(EventConsumer::new(
            queue.clone() as Arc<dyn QueueBackend>,
            dispatcher,
            config.slack.events_topic.clone(),
        ));
        let handle = tokio::spawn({
            let consumer = Arc::clone(&consumer);
            async move { consumer.run().await }
        });

        if config.slack.signing_secret.is_none() {
            tracing::warn!("SLACK_SIGNING_SECRET is not set; all Slack requests will be rejected");
        }
        let state = WebhookState::new(
            config.slack.signing_secret.clone(),
            queue.clone() as Arc<dyn QueueBackend>,
            config.slack.events_topic.clone(),
            clients,
        );

        Self {
            state,
            queue,
            consumer,
            handle,
        }
    }

    async fn stop(self) {
        self.consumer.shutdown();
        self.queue.close().await;
        if let Err(e) = self.handle.await {
            tracing::error!("Event consumer task failed: {}", e);
        }
    }
}

async fn run_webhook(
    config: &Config,
    clients: Arc<ClientManager>,
    integrated: bool,
) -> anyhow::Result<()> {
    let pipeline = EventPipeline::start(config, Arc::clone(&clients));

    let mut app = webhook_router(pipeline.state.clone());
    if integrated {
        let mcp = build_mcp_server(clients)?;
        tracing::info!(path = %config.mcp.mount_path, "Serving MCP endpoint alongside webhook");
        app = app.merge(mcp_router(mcp, &config.mcp.mount_path));
    }
    let app = with_middleware(app, &config.cors);

    let listener = bind("webhook", &config.webhook.host, config.webhook.port).await?;
    let result = serve("webhook", listener, app, shutdown_signal()).await;
    pipeline.stop().await;
    result?;
    Ok(())
}

async fn run_mcp(
    config: &Config,
    clients: Arc<ClientManager>,
    integrated: bool,
) -> anyhow::Result<()> {
    let mcp = build_mcp_server(Arc::clone(&clients))?;

    match config.mcp.transport {
        McpTransportKind::Stdio => {
            if integrated {
                bail!("Integrated mode needs an HTTP listener; use --transport http");
            }
            tokio::select! {
                result = serve_stdio(&mcp) => { result?; }
                _ = shutdown_signal() => {}
            }
            Ok(())
        }
        McpTransportKind::Http => {
            let mut app = mcp_router(mcp, &config.mcp.mount_path);
            let pipeline = if integrated {
                let pipeline = EventPipeline::start(config, clients);
                app = app.merge(webhook_router(pipeline.state.clone()));
                tracing::info!("Serving webhook routes alongside MCP endpoint");
                Some(pipeline)
            } else {
                None
            };
            let app = with_middleware(app, &config.cors);

            let listener = bind("mcp", &config.mcp.host, config.mcp.port).await?;
            tracing::info!(path = %config.mcp.mount_path, "MCP endpoint ready");
            let result = serve("mcp", listener, app, shutdown_signal()).await;
            if let Some(pipeline) = pipeline {
                pipeline.stop().await;
            }
            result?;
            Ok(())
        }
    }
}
