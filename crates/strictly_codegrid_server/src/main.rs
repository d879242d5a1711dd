//! Strictly Codegrid - Unified CLI
//!
//! MCP game server over stdio or streamable HTTP.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rmcp::ServiceExt;
use strictly_codegrid_server::{
    Cli, Command, GameServer, GameStore, ServerConfig, ServerOptions, build_verifier,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Server { options } => run_mcp_server(options).await,
        Command::Http {
            port,
            host,
            options,
        } => run_http_server(host, port, options).await,
    }
}

/// Loads configuration and builds a server sharing `store`.
#[instrument(skip(store))]
fn build_server(options: &ServerOptions, store: GameStore) -> Result<GameServer> {
    let mut config = ServerConfig::load_or_default(&options.config)?;
    if let Some(verifier) = options.verifier {
        info!(%verifier, "Overriding configured verifier");
        config = config.with_verifier(verifier);
    }

    let catalog = Arc::new(config.load_catalog()?);
    let verifier = build_verifier(&config, catalog.clone(), tokio::runtime::Handle::current())?;
    info!(verifier = %config.verifier(), challenges = catalog.len(), "Verifier ready");

    Ok(GameServer::with_store(store, catalog, verifier))
}

/// Run the MCP game server (stdio mode)
async fn run_mcp_server(options: ServerOptions) -> Result<()> {
    // Stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Strictly Codegrid MCP server");

    let server = build_server(&options, GameStore::new())?;

    info!("Server ready - connect via MCP protocol");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

/// Run the HTTP game server
async fn run_http_server(host: String, port: u16, options: ServerOptions) -> Result<()> {
    use axum::{Router, body::Body, http::Request};
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager,
        tower::{StreamableHttpServerConfig, StreamableHttpService},
    };
    use tower::ServiceBuilder;
    use tracing::{debug, warn};

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rmcp=debug")),
        )
        .init();

    info!(%host, port, "Starting Strictly Codegrid MCP server on HTTP");

    // Built once so configuration errors surface before binding.
    let template = build_server(&options, GameStore::new())?;
    let store = template.store().clone();
    let catalog = template.catalog();
    let verifier = template.verifier();

    let session_manager = Arc::new(LocalSessionManager::default());
    let mut config = StreamableHttpServerConfig::default();
    config.stateful_mode = true;
    debug!(?config, "HTTP service configuration");

    // Every MCP session gets its own handler over the shared store.
    let http_service = StreamableHttpService::new(
        move || {
            debug!("Creating GameServer instance with shared store");
            Ok(GameServer::with_store(
                store.clone(),
                catalog.clone(),
                verifier.clone(),
            ))
        },
        session_manager,
        config,
    );

    let app = Router::new().fallback_service(
        ServiceBuilder::new()
            .map_request(|req: Request<Body>| {
                info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                req
            })
            .service(tower::service_fn(move |req: Request<Body>| {
                let mut service = http_service.clone();
                async move {
                    let uri = req.uri().clone();
                    let result = tower::Service::call(&mut service, req).await;
                    match &result {
                        Ok(resp) => debug!(status = ?resp.status(), uri = %uri, "Response sent"),
                        Err(e) => warn!(error = ?e, uri = %uri, "Request failed"),
                    }
                    result
                }
            })),
    );

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Server ready at http://{}:{}/", host, port);
    axum::serve(listener, app).await?;

    Ok(())
}
