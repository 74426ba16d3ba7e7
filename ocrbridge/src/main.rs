use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrbridge::api::{create_router, AppState};
use ocrbridge::config::Config;
use ocrbridge::ocr::{parse_dpi, ExtractionRequest, ExtractionResult, OcrService};

#[derive(Parser)]
#[command(name = "ocrbridge")]
#[command(about = "HTTP and command-line front end for an external OCR engine")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (the default)
    Serve,
    /// Run one extraction and print the result
    Extract {
        /// Input files; more than one runs a batch
        #[arg(required = true)]
        files: Vec<String>,
        /// Language codes, e.g. `--languages en fr`
        #[arg(long, num_args = 1..)]
        languages: Vec<String>,
        /// Include confidence scores and bounding boxes
        #[arg(long)]
        detail: bool,
        /// Rasterization DPI for PDF inputs
        #[arg(long)]
        dpi: Option<u32>,
        /// Override OCR_TIMEOUT_SECS for this run
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocrbridge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Extract {
            files,
            languages,
            detail,
            dpi,
            timeout_secs,
        } => {
            let mut engine = config.engine.clone();
            if let Some(secs) = timeout_secs {
                engine = engine.with_timeout_secs(secs);
            }
            let ocr = OcrService::from_config(&engine);

            let dpi = dpi.map(parse_dpi).transpose()?;
            let request = ExtractionRequest::new(files)?
                .with_languages(languages)
                .with_detail(detail)
                .with_dpi(dpi);

            let cancel_token = CancellationToken::new();
            let token = cancel_token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, stopping OCR engine...");
                    token.cancel();
                }
            });

            match ocr.extract(&request, &cancel_token).await? {
                ExtractionResult::Text { text } | ExtractionResult::RawFallback { text } => {
                    println!("{text}");
                }
                structured => println!("{}", serde_json::to_string_pretty(&structured)?),
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Initializing OCR engine: {}...", config.engine.program);
    let ocr = OcrService::from_config(&config.engine);
    if !ocr.probe().await {
        tracing::warn!(
            "OCR engine '{}' did not answer --help - extraction requests will fail until it is installed",
            config.engine.program
        );
    }

    let cancel_token = CancellationToken::new();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, ocr, cancel_token.child_token());
    let app = create_router(state);

    tracing::info!("ocrbridge starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping in-flight OCR runs...");
    cancel_token.cancel();
}
