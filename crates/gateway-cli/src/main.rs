//! CLI entry point for the conversation gateway.
//!
//! Wires together the tool registry, stores, model provider, and native
//! agent runtime into the [`gateway_web`] HTTP/SSE server and starts
//! listening (§4.6, §10.4).

mod config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dashmap::DashSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gateway_agent::{AnthropicProvider, Budgets, NativeAgentRuntime, ProgressiveSummarizer};
use gateway_kernel::ToolRegistry;
use gateway_store::{ArtifactStore, Database, MemoryConversationStore, SqlSessionStore, TruncationConfig};
use gateway_tools::{HttpExternalDataClient, ToolCatalog};
use gateway_web::{AppState, AuthVerifier, GatewayConfig, RateLimiter, WebConfig, WebServer};

use crate::config::{CliConfig, ConversationStoreType};

/// The conversation gateway service.
#[derive(Parser)]
#[command(name = "gateway", version, about = "Conversational AI gateway for the teaching platform")]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::from_env().context("failed to load configuration")?;

    let data_dir = Path::new(&config.data_dir);
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir).context("failed to create data directory")?;
    }

    let artifact_db = Database::open_and_migrate(config.artifact_store_url.clone())
        .await
        .context("failed to open artifact store")?;
    let artifacts = Arc::new(ArtifactStore::new(artifact_db));

    let sessions: Arc<dyn gateway_store::ConversationStore> = match config.conversation_store_type {
        ConversationStoreType::Memory => Arc::new(MemoryConversationStore::new()),
        ConversationStoreType::Sqlite => {
            let session_db_path = data_dir.join("sessions.db");
            let db = Database::open_and_migrate(session_db_path)
                .await
                .context("failed to open session store")?;
            Arc::new(SqlSessionStore::new(db))
        }
    };

    let external = Arc::new(
        HttpExternalDataClient::new(config.external_data_base_url.clone(), config.external_data_timeout)
            .context("failed to build external data client")?,
    );
    let catalog = Arc::new(ToolCatalog::new(external, Arc::clone(&artifacts)));

    let registry = Arc::new(ToolRegistry::new());
    ToolCatalog::register_definitions(&registry).context("failed to register tool definitions")?;

    let provider = Arc::new(
        AnthropicProvider::new(gateway_agent::providers::anthropic::AnthropicConfig::new(config.provider.api_key.clone()))
            .context("failed to build model provider")?,
    );

    let mut runtime = NativeAgentRuntime::new(Arc::clone(&registry), catalog, provider.clone(), config.provider.default_model.clone())
        .with_budgets(Budgets {
            max_tool_calls: config.max_tool_calls,
            max_turn_duration: config.max_turn_duration,
            per_tool_timeout: config.per_tool_timeout,
            ..Budgets::default()
        })
        .with_truncation_config(TruncationConfig::default());

    if let Some(fast_model) = config.provider.fast_model.clone() {
        let summarizer = Arc::new(ProgressiveSummarizer::new(provider, fast_model));
        runtime = runtime.with_summarizer(summarizer);
    }

    let auth: Option<Arc<dyn AuthVerifier>> = None;

    let state = Arc::new(AppState {
        registry,
        sessions,
        artifacts,
        runtime: Arc::new(runtime),
        auth,
        rate_limiter: Arc::new(RateLimiter::with_default_policy()),
        in_flight: Arc::new(DashSet::new()),
        config: GatewayConfig { heartbeat_interval: config.heartbeat_interval, native_agent_enabled: config.native_agent_enabled },
    });

    let web_config = WebConfig { bind_addr: cli.bind, port: config.service_port, cors_origins: config.cors_origins };

    println!();
    println!("  Conversation gateway v{}", env!("CARGO_PKG_VERSION"));
    println!("  Model:    {}", config.provider.default_model);
    println!("  Listening on http://{}:{}", web_config.bind_addr, web_config.port);
    println!();

    info!(debug = config.debug, native_agent_enabled = config.native_agent_enabled, "starting conversation gateway");

    let server = WebServer::new(web_config, state);
    server.start().await.map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(())
}
