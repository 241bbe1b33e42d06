use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, ValueEnum};
use errwatch_api::{EndpointKind, ErrorLogClient, RetryConfig};
use errwatch_core::{
    time::{format_time_from_now, parse_day_as},
    Config, Dashboard, ErrorLogProvider, FilterCriteria, LoadState, Statistics,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "errwatch")]
#[command(version, about = "Terminal dashboard for an error-log store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Root URL of the admin proxy or PostgREST server
    #[arg(long, env = "ERRWATCH_BASE_URL", global = true)]
    base_url: Option<String>,

    /// API key sent as bearer token
    #[arg(long, env = "ERRWATCH_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Which endpoint flavour the server speaks
    #[arg(long, value_enum, global = true)]
    kind: Option<KindArg>,

    /// Records to fetch per refresh
    #[arg(long, global = true)]
    limit: Option<u32>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open the live dashboard (default)
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Fetch once and print statistics
    Stats {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Fetch once and print the matching records
    List {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        json: bool,
    },
    /// Write a config file with the current settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Case-insensitive text matched against type, node and message
    #[arg(short, long, default_value = "")]
    query: String,

    /// First day to include (display date format, dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long)]
    from: Option<String>,

    /// Last day to include (display date format, dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long)]
    to: Option<String>,
}

impl FilterArgs {
    fn criteria(&self, config: &Config) -> anyhow::Result<FilterCriteria> {
        Ok(FilterCriteria::new(config.offset())
            .with_query(self.query.clone())
            .with_range(
                day_arg(self.from.as_deref(), &config.display.date_format)?,
                day_arg(self.to.as_deref(), &config.display.date_format)?,
            ))
    }
}

fn day_arg(value: Option<&str>, date_format: &str) -> anyhow::Result<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(raw) => parse_day_as(raw, date_format)
            .map(Some)
            .with_context(|| format!("Not a date: {}", raw)),
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    AdminProxy,
    Postgrest,
}

impl From<KindArg> for EndpointKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::AdminProxy => EndpointKind::AdminProxy,
            KindArg::Postgrest => EndpointKind::PostgRest,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Dashboard {
        filters: FilterArgs::default(),
    });

    // The TUI owns the terminal, so its logs go to a file
    let log_to_file = matches!(command, Commands::Dashboard { .. });
    init_logging(log_to_file)?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    if let Some(base_url) = cli.base_url {
        config.source.base_url = base_url;
    }
    if let Some(api_key) = cli.api_key {
        config.source.api_key = Some(api_key);
    }
    if let Some(kind) = cli.kind {
        config.source.kind = kind.into();
    }
    if let Some(limit) = cli.limit {
        config.source.limit = limit;
    }
    config.validate()?;
    tracing::info!(
        "Using {} ({:?}, limit {})",
        config.source.base_url,
        config.source.kind,
        config.source.limit
    );

    match command {
        Commands::Dashboard { filters } => {
            let criteria = filters.criteria(&config)?;
            let dashboard = build_dashboard(&config, criteria)?;
            let app = errwatch_tui::App::new(dashboard, config.display.date_format.clone());
            errwatch_tui::run_tui(app).await?;
        }
        Commands::Stats { filters, json } => {
            let dashboard = fetch_once(&config, filters.criteria(&config)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(dashboard.statistics())?);
            } else {
                print_stats(&dashboard, &config);
            }
        }
        Commands::List { filters, json } => {
            let dashboard = fetch_once(&config, filters.criteria(&config)?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(dashboard.records())?);
            } else {
                print_records(&dashboard, &config);
            }
        }
        Commands::InitConfig { force } => {
            let target = match &cli.config {
                Some(path) => path.clone(),
                None => Config::config_path()?,
            };
            if target.exists() && !force {
                bail!("{} already exists, pass --force to overwrite", target.display());
            }
            let written = match &cli.config {
                Some(path) => {
                    config.save_to(path)?;
                    path.clone()
                }
                None => config.save()?,
            };
            println!("Wrote {}", written.display());
        }
    }

    Ok(())
}

fn init_logging(to_file: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "errwatch=info,errwatch_core=info,errwatch_api=info".into());

    if to_file {
        let dir = dirs::cache_dir()
            .context("Could not find cache directory")?
            .join("errwatch");
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("errwatch.log"))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn build_dashboard(config: &Config, criteria: FilterCriteria) -> anyhow::Result<Dashboard> {
    let client = ErrorLogClient::with_timeout(
        config.source.base_url.clone(),
        config.source.kind,
        config.source.api_key.clone(),
        Duration::from_secs(config.source.timeout_secs),
    )?
    .with_retry_config(RetryConfig {
        max_retries: config.source.max_retries,
        ..RetryConfig::default()
    });
    tracing::debug!("Fetching from {} ({:?})", client.endpoint_url(), client.kind());
    let source = Arc::new(ErrorLogProvider::new(client));
    Ok(Dashboard::new(source, config.to_refresh_config(), criteria))
}

/// Run the initial load only, then stop
async fn fetch_once(config: &Config, criteria: FilterCriteria) -> anyhow::Result<Dashboard> {
    let mut dashboard = build_dashboard(config, criteria)?;
    dashboard.start();
    let outcome = dashboard.wait_until_loaded().await.cloned();
    dashboard.dispose();

    match outcome {
        Some(LoadState::Ready) => Ok(dashboard),
        Some(LoadState::Failed { reason }) => bail!("Could not load error logs: {}", reason),
        Some(LoadState::Loading) | None => bail!("Error log did not finish loading"),
    }
}

fn print_stats(dashboard: &Dashboard, config: &Config) {
    let stats: &Statistics = dashboard.statistics();

    println!("Records:        {} of {}", stats.total, dashboard.total_records());
    if let Some(dates) = dashboard.criteria().describe_dates(&config.display.date_format) {
        println!("Dates:          {}", dates);
    }
    println!("Affected nodes: {}", stats.unique_node_count);
    println!("Error types:    {}", stats.unique_category_count);

    if !stats.source_buckets.is_empty() {
        println!();
        println!("Sources:");
        for bucket in &stats.source_buckets {
            println!(
                "  {:<6} {:>5} ({:.1}%)",
                bucket.source_key,
                bucket.count,
                bucket.percent_of(stats.total)
            );
        }
    }

    if !stats.daily_buckets.is_empty() {
        println!();
        println!("Per day:");
        for bucket in &stats.daily_buckets {
            println!("  {}  {:>5}", bucket.day_key, bucket.count);
        }
    }
}

fn print_records(dashboard: &Dashboard, config: &Config) {
    let offset = config.offset();
    let time_format = format!("{} %H:%M:%S", config.display.date_format);
    let now = Utc::now();

    for record in dashboard.records() {
        let assignment = record.category();
        println!(
            "{}  {:<16}  {:<24}  {:<12}  {}",
            record.created_at.with_timezone(&offset).format(&time_format),
            format_time_from_now(record.created_at, now),
            assignment.display_label,
            record.node_display(),
            record.message_display().lines().next().unwrap_or("")
        );
    }

    if dashboard.is_filtered() {
        println!(
            "\n{} of {} records shown",
            dashboard.records().len(),
            dashboard.total_records()
        );
    }
}
