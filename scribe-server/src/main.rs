use std::sync::Arc;

use clap::Parser;
use scribe_core::{GeneratorConfig, NoteService, OpenAiNoteGenerator, PgNoteStore, ScribeConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "scribe.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match ScribeConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.service.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Connect to DB
    let pool = match scribe_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match scribe_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Scribe DB health check passed");
        return Ok(());
    }

    scribe_core::db::ensure_schema(&pool).await?;

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let generator = match OpenAiNoteGenerator::new(GeneratorConfig::new(api_key, &config.llm)) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to create note generator (is OPENAI_API_KEY set?): {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(model = generator.model(), "Note generator ready");

    let service = NoteService::new(
        Arc::new(PgNoteStore::new(pool.clone())),
        Arc::new(generator),
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let result =
        scribe_server::http::start_http_server(service, config, tx.subscribe()).await;

    pool.close().await;
    tracing::info!("Database pool closed");

    result
}
