use clap::Parser;
use dotenvy::dotenv;
use mobile_optimizer::infrastructure::storage;
use mobile_optimizer::{FailurePolicy, Pipeline, PipelineConfig, StoreConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Builds missing mobile variants of bucket images",
    long_about = None
)]
struct Args {
    /// Key prefix to scan (overrides S3_PREFIX)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Cache directory for downloaded originals (overrides RAW_DIR)
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Directory for transcoded outputs (overrides OUT_DIR)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Items processed in parallel per stage (overrides CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Abort the run on the first fetch or upload failure
    #[arg(long)]
    fail_fast: bool,

    /// List and select targets without transferring anything
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mobile_optimizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("🚀 Starting...");

    let mut store_config = StoreConfig::from_env()?;
    if let Some(prefix) = args.prefix {
        store_config.prefix = prefix;
    }

    let mut config = PipelineConfig::from_env();
    if let Some(raw_dir) = args.raw_dir {
        config.raw_dir = raw_dir;
    }
    if let Some(out_dir) = args.out_dir {
        config.out_dir = out_dir;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.max(1);
    }
    if args.fail_fast {
        config.failure_policy = FailurePolicy::Abort;
    }
    info!(
        "⚙️  Config: Concurrency={}, Policy={:?}, Max Width={}px",
        config.concurrency, config.failure_policy, config.transcode.max_width
    );

    let storage = storage::setup_storage(&store_config).await;
    let pipeline =
        Pipeline::new(storage, store_config.prefix.clone(), config).dry_run(args.dry_run);

    match pipeline.run().await {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            if report.has_failures() {
                info!("⚠️  Finished with isolated failures, see warnings above.");
            }
            info!("✅ Done!");
            Ok(())
        }
        Err(e) => {
            error!("❌ Run failed: {}", e);
            Err(e.into())
        }
    }
}
