use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use strata::{Config, Engine, Environment, JsonHook, ReloadHub, RuntimeContext, TemplateHelpers};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Environment variable selecting dev or prod when `--env` is not given
const ENV_VAR: &str = "STRATA_ENV";

#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about = "Serve a strata site", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "strata.toml")]
    config: PathBuf,

    /// Environment: dev or prod (default: $STRATA_ENV, then dev)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Host to bind (overrides [server].host)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides [server].port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable the file watcher and live reload
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let env = match cli.env {
        Some(env) => env,
        None => match std::env::var(ENV_VAR) {
            Ok(value) => value
                .parse::<Environment>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {}", ENV_VAR))?,
            Err(_) => Environment::default(),
        },
    };

    // The watcher only exists to drive dev rebuilds and live reload
    let watch = env.is_dev() && config.dev.watch && !cli.no_watch;

    let mut builder = Engine::builder(config.clone())
        .runtime(RuntimeContext::new(env).with_watch(watch))
        .hooks(JsonHook)
        .helpers(TemplateHelpers::new(env, config.output_root()));

    if watch {
        builder = builder.reload_hub(ReloadHub::new());
    }

    let engine = Arc::new(builder.build());
    info!(
        routes = engine.dispatcher().snapshot().len(),
        cache = config.cache.enabled,
        watching = engine.is_watching(),
        "engine ready"
    );

    let app = strata::http::app(engine.clone())
        .nest_service("/public", ServeDir::new(config.public_root()))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("{} {}", "strata".green().bold(), env.to_string().cyan());
    println!("  Routes: {}", config.routes_root().display());
    if engine.reload_hub().is_some() {
        println!("  Live reload: {}", "enabled".green());
    }
    println!("  Listening on {}", format!("http://{}", addr).bold());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
