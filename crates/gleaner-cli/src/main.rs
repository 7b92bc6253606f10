use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gleaner_client::fetcher::DEFAULT_USER_AGENT;
use gleaner_client::llm::DEFAULT_BASE_URL;
use gleaner_client::{HtmdCleaner, OpenAiExtractor, ReadabilityExtractor, ReqwestFetcher};
use gleaner_core::batch::{BatchConfig, BatchService};
use gleaner_core::models::ResultRecord;
use gleaner_core::sink::{CsvSink, JsonlSink};
use gleaner_core::source::{DEFAULT_URL_COLUMN, read_urls_from_path};
use gleaner_core::structured::StructuredService;
use gleaner_core::traits::{ResultSink, StructuredExtractor};

#[derive(Parser)]
#[command(name = "gleaner", version, about = "Concurrent web page content extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch many pages concurrently and write one record per URL
    Batch {
        /// CSV file with a column of URLs
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Name of the URL column in the input CSV
        #[arg(short, long, default_value = DEFAULT_URL_COLUMN)]
        column: String,

        /// Extra URL to process (repeatable), appended after the CSV rows
        #[arg(short, long = "url")]
        urls: Vec<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (inferred from the output extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Maximum number of pages fetched at once
        #[arg(long, env = "GLEANER_CONCURRENCY", default_value_t = 10)]
        concurrency: usize,

        /// Per-page fetch deadline in seconds
        #[arg(long, env = "GLEANER_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,

        /// User-Agent header sent with every request
        #[arg(long, env = "GLEANER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },

    /// Extract readable content from a single page
    Extract {
        /// Target URL
        #[arg(short, long)]
        url: String,

        /// Fetch deadline in seconds
        #[arg(long, env = "GLEANER_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,

        /// User-Agent header
        #[arg(long, env = "GLEANER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },

    /// Extract live music events from a page with an LLM
    Events {
        /// Target URL
        #[arg(short, long)]
        url: String,

        /// LLM model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
        #[arg(short, long, env = "GLEANER_MODEL")]
        model: String,

        /// OpenAI-compatible API base URL
        #[arg(short, long, env = "GLEANER_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// API key (reads from GLEANER_API_KEY env var if not provided)
        #[arg(short, long, env = "GLEANER_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Page fetch deadline in seconds
        #[arg(long, env = "GLEANER_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Jsonl,
    Csv,
}

impl OutputFormat {
    fn resolve(explicit: Option<Self>, output: Option<&Path>) -> Self {
        explicit.unwrap_or_else(|| {
            match output.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
                _ => OutputFormat::Jsonl,
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gleaner=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Batch {
            input,
            column,
            urls,
            output,
            format,
            concurrency,
            timeout_secs,
            user_agent,
        } => {
            let mut all_urls = match &input {
                Some(path) => read_urls_from_path(path, &column)?,
                None => Vec::new(),
            };
            all_urls.extend(urls);
            if all_urls.is_empty() {
                anyhow::bail!("No URLs to process: pass --input and/or --url");
            }

            let config = BatchConfig::new(concurrency, Duration::from_secs(timeout_secs));
            let format = OutputFormat::resolve(format, output.as_deref());
            cmd_batch(&all_urls, &config, &user_agent, format, output.as_deref()).await?;
        }
        Commands::Extract {
            url,
            timeout_secs,
            user_agent,
        } => {
            cmd_extract(&url, Duration::from_secs(timeout_secs), &user_agent).await?;
        }
        Commands::Events {
            url,
            model,
            base_url,
            api_key,
            timeout_secs,
        } => {
            cmd_events(
                &url,
                &model,
                &base_url,
                &api_key,
                Duration::from_secs(timeout_secs),
            )
            .await?;
        }
    }

    Ok(())
}

fn batch_service(user_agent: &str) -> Result<BatchService<ReqwestFetcher, ReadabilityExtractor>> {
    let fetcher = ReqwestFetcher::with_user_agent(user_agent).context("Failed to create HTTP client")?;
    Ok(BatchService::new(fetcher, ReadabilityExtractor::new()))
}

async fn cmd_batch(
    urls: &[String],
    config: &BatchConfig,
    user_agent: &str,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let results = batch_service(user_agent)?.run(urls, config).await?;

    write_results(&results, format, output)?;

    let mut by_outcome: BTreeMap<String, usize> = BTreeMap::new();
    for record in &results {
        *by_outcome.entry(record.outcome_kind().to_string()).or_default() += 1;
    }
    tracing::info!(
        total = results.len(),
        breakdown = ?by_outcome,
        output = %output.map_or_else(|| "stdout".to_string(), |p| p.display().to_string()),
        "Batch written"
    );

    Ok(())
}

fn write_results(results: &[ResultRecord], format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(std::io::stdout().lock()),
    };

    match format {
        OutputFormat::Jsonl => JsonlSink::new(writer).write_all(results)?,
        OutputFormat::Csv => CsvSink::new(writer)?.write_all(results)?,
    }
    Ok(())
}

async fn cmd_extract(url: &str, timeout: Duration, user_agent: &str) -> Result<()> {
    let config = BatchConfig::default().with_timeout(timeout);
    let record = batch_service(user_agent)?
        .run(&[url.to_string()], &config)
        .await?
        .into_iter()
        .next()
        .context("Batch returned no record")?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_events(
    url: &str,
    model: &str,
    base_url: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<()> {
    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let extractor = OpenAiExtractor::with_base_url(api_key, model, base_url)
        .context("Failed to create LLM client")?;

    tracing::info!("Extracting events with model {} ...", model);

    let service = StructuredService::new(fetcher, HtmdCleaner::new(), extractor).with_timeout(timeout);
    let events = service.extract_structured(url).await?;

    tracing::info!(count = events.len(), "Events extracted");
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}
