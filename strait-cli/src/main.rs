//! Strait Watch CLI
//!
//! Cross-strait threat indicators from open sources.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use strait_core::{IndicatorCalculator, IndicatorReport};
use strait_report::{
    resolve_backend_model, OpenAIBackend, Persona, ReportGenerator, ANALYSIS_MODELS,
    DEFAULT_ANALYSIS_MODEL,
};
use strait_runtime::{AnalysisRunner, MemoryTaskStore, TaskRecord, TaskStatus};
use strait_sources::{FixtureCollector, LiveCollector, SourceCollector, SourceConfig};

#[derive(Parser)]
#[command(name = "strait-watch")]
#[command(author, version, about = "Strait Watch: open-source cross-strait threat indicators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect sources, calculate indicators and write a briefing
    Analyze {
        /// Analysis model ID (see `models`)
        #[arg(short, long, default_value = DEFAULT_ANALYSIS_MODEL)]
        model: String,

        /// Score a saved data bundle instead of live sources
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Output file for the briefing (default: report_<timestamp>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the full analysis result as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// OpenAI API key (or set OPENAI_API_KEY env var); without one the
        /// briefing uses the template
        #[arg(long, env = "OPENAI_API_KEY")]
        api_key: Option<String>,

        /// Fail instead of falling back to the template when no key is set
        #[arg(long)]
        require_ai: bool,

        /// Analyst persona TOML (default: embedded analyst)
        #[arg(long)]
        persona: Option<PathBuf>,

        /// Maximum runtime in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Per-request timeout for source fetches in seconds
        #[arg(long, default_value = "15")]
        http_timeout: u64,

        /// Proxy for source fetches (e.g. socks5h://127.0.0.1:9050)
        #[arg(long)]
        proxy: Option<String>,
    },

    /// Score a raw JSON data bundle offline
    Score {
        /// Bundle file with military, economic, news and stock entries
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List analysis model IDs
    Models,

    /// Check connectivity to the news source
    Status {
        /// Proxy for the check
        #[arg(long)]
        proxy: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Analyze {
            model,
            fixture,
            output,
            json,
            api_key,
            require_ai,
            persona,
            timeout,
            http_timeout,
            proxy,
        } => {
            if require_ai && api_key.is_none() {
                anyhow::bail!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key");
            }
            let mut source_config = SourceConfig::default().with_timeout(http_timeout);
            if let Some(proxy) = &proxy {
                source_config = source_config.with_proxy(proxy);
            }
            run_analysis(
                &model,
                fixture,
                output,
                json,
                api_key,
                persona,
                timeout,
                source_config,
            )
            .await?;
        }
        Commands::Score { input } => {
            score_bundle(&input)?;
        }
        Commands::Models => {
            list_models();
        }
        Commands::Status { proxy } => {
            let mut config = SourceConfig::default();
            if let Some(proxy) = &proxy {
                config = config.with_proxy(proxy);
            }
            check_status(&config).await?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_analysis(
    model: &str,
    fixture: Option<PathBuf>,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
    api_key: Option<String>,
    persona: Option<PathBuf>,
    timeout: u64,
    source_config: SourceConfig,
) -> Result<()> {
    println!("🛰️ Strait Watch - Cross-Strait Threat Indicators\n");

    let persona = match persona {
        Some(path) => Persona::load_from_file(&path)?,
        None => Persona::embedded_analyst()?,
    };

    let backend = OpenAIBackend::shared(api_key.as_deref(), &persona)?;
    match &backend {
        Some(backend) => println!(
            "📡 Provider: {} | Model: {} ({})",
            backend.provider(),
            model,
            resolve_backend_model(model)
        ),
        None => println!("📡 No API key configured - briefing will use the template"),
    }

    let collector: Arc<dyn SourceCollector> = match &fixture {
        Some(path) => {
            println!("📂 Fixture: {}", path.display());
            Arc::new(FixtureCollector::new(path))
        }
        None => {
            println!("🌐 Live sources (timeout {}s per request)", source_config.timeout_secs);
            Arc::new(LiveCollector::new(source_config))
        }
    };
    println!("⏱️  Timeout: {}s\n", timeout);

    let generator = ReportGenerator::new(backend);
    let runner = AnalysisRunner::new(
        collector,
        Arc::new(generator),
        Arc::new(MemoryTaskStore::new()),
    );

    println!("🚀 Starting analysis...");
    let id = runner.start(model)?;

    let record = tokio::time::timeout(Duration::from_secs(timeout), wait_with_progress(&runner, &id))
        .await
        .map_err(|_| anyhow::anyhow!("Analysis did not finish within {}s. Try increasing --timeout", timeout))??;

    let result = match (record.status, record.result) {
        (TaskStatus::Completed, Some(result)) => result,
        _ => {
            let error = record.error.unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("Analysis failed: {}", error);
        }
    };

    let indicators = &result.indicators;
    println!("\n📊 Indicators:");
    println!("   Military threat:     {}%", indicators.military_threat);
    println!("   Economic pressure:   {}%", indicators.economic_pressure);
    println!("   News alert:          {}%", indicators.news_alert);
    println!("   Stock impact:        {}%", indicators.stock_impact);
    println!("   Overall probability: {}%", indicators.overall_threat_probability);
    if let Some(error) = &indicators.error {
        println!("   ⚠️  Fallback values in use: {}", error);
    }

    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("report_{}.md", timestamp))
    });
    fs::write(&output_path, &result.report.content)?;

    println!("\n✅ Analysis complete!");
    println!("📄 Report saved to: {}", output_path.display());

    if let Some(json_path) = json {
        fs::write(&json_path, serde_json::to_string_pretty(&result)?)?;
        println!("🗂️  Result saved to: {}", json_path.display());
    }

    // Print report preview
    println!("\n{}", "=".repeat(60));
    let content = &result.report.content;
    let preview: String = content.chars().take(1000).collect();
    println!("{}", preview);
    if content.chars().count() > 1000 {
        println!("...\n[truncated - see full report in output file]");
    }

    Ok(())
}

/// Poll a task, printing each progress change
async fn wait_with_progress(runner: &AnalysisRunner, id: &str) -> Result<TaskRecord> {
    let mut last_progress = None;
    loop {
        let record = runner.get(id)?;
        if last_progress != Some(record.progress) {
            println!("   [{:>3}%] {}", record.progress, record.status);
            last_progress = Some(record.progress);
        }
        if record.status.is_finished() {
            return Ok(record);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

fn score_bundle(input: &Path) -> Result<()> {
    let text = fs::read_to_string(input)?;

    let report = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(raw) => IndicatorCalculator::new().calculate_value(&raw),
        Err(e) => IndicatorReport::fallback(format!("bundle is not valid JSON: {}", e)),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn list_models() {
    println!("📋 Analysis models:\n");
    for model in ANALYSIS_MODELS {
        let marker = if model.id == DEFAULT_ANALYSIS_MODEL { " (default)" } else { "" };
        println!("   {} -> {}{}", model.id, model.backend_model, marker);
    }
}

async fn check_status(config: &SourceConfig) -> Result<()> {
    println!("🔌 Checking news source connectivity...\n");

    match strait_sources::check_connectivity(config).await {
        Ok(true) => {
            println!("✅ News source is reachable");
            if let Some(proxy) = &config.proxy {
                println!("   Proxy: {}", proxy);
            }
        }
        Ok(false) => {
            println!("❌ News source is not reachable");
            println!("   Live collection will fall back to built-in articles");
        }
        Err(e) => {
            println!("❌ Error checking news source: {}", e);
        }
    }

    Ok(())
}
