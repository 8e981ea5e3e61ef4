use anyhow::{Context, Result};
use clap::Parser;
use screener_core::StrategyConfig;
use screening_orchestrator::{market_data_source, resolve_as_of, write_report, RunOptions, ScreeningPipeline};

mod cli;

use cli::Cli;

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = StrategyConfig::load(&cli.config)
        .with_context(|| format!("Failed to load strategy {}", cli.config.display()))?;

    if cli.dry_run {
        println!("[dry-run] Loaded strategy: {} (mode={})", config.name, config.mode);
        println!("[dry-run] Quant metrics: {}", config.quantitative.metrics.len());
        println!("[dry-run] Qual axes: {}", config.qualitative.axes.len());
        return Ok(());
    }

    config.check_required_env()?;

    let as_of = match &cli.as_of_from {
        Some(dir) => {
            let (date, path) = resolve_as_of(dir)?;
            tracing::info!("As-of {} taken from {}", date, path.display());
            date
        }
        None => cli.explicit_or_today(),
    };

    let source = market_data_source(&config)?;
    let mut pipeline = ScreeningPipeline::new(config, source);
    let options = RunOptions {
        top_n: cli.top_n,
        top_k: cli.top_k,
    };
    let result = pipeline.run(as_of, options).await?;

    let report_path = write_report(&result, &cli.output, as_of)?;
    println!("Report generated: {}", report_path.display());
    Ok(())
}
