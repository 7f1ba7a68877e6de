#[cfg(feature = "browser")]
mod browser;
mod db;
mod listing;
mod parser;
mod run;
mod scraper;
mod settings;
mod taxonomy;

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use parser::{extract, Pipeline};
use scraper::{Crawler, HttpSource, PageSource};
use settings::Settings;
use taxonomy::Taxonomy;

#[derive(Parser)]
#[command(name = "jobminer", about = "Job board scraper: offers → normalized listings in SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Scrape the board and upsert listings (the default)
    Run {
        /// Stop after this many list pages
        #[arg(long)]
        max_pages: Option<u32>,
        /// Concurrent offer fetches
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Listing and run counters for the configured source
    Stats,
    /// Most common skills across stored listings
    Skills {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },
    /// Classify free text (argument or stdin) against the taxonomy
    Classify {
        text: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("invalid JOBMINER_* configuration")?;
    info!(source = %settings.source, db = %settings.database_path, "settings loaded");

    let command = cli.command.unwrap_or(Commands::Run {
        max_pages: None,
        concurrency: None,
    });

    let result = match command {
        Commands::Init => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            println!("Schema ready in {}", settings.database_path);
            Ok(())
        }
        Commands::Run {
            max_pages,
            concurrency,
        } => {
            if let Some(n) = max_pages {
                settings.max_pages = n;
            }
            if let Some(n) = concurrency {
                settings.concurrency = n;
            }
            settings.validate()?;
            run_scrape(&settings).await
        }
        Commands::Stats => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn, &settings.source)?;
            println!("Source:      {}", settings.source);
            println!("Listings:    {}", s.listings);
            println!("With salary: {}", s.with_salary);
            for (mode, n) in &s.by_mode {
                println!("  {:<9} {}", mode, n);
            }
            match s.last_run {
                Some(r) => println!(
                    "Last run:    {} | {} offers, {} saved, {} skipped, {} foreign | {}",
                    r.started_at,
                    r.offers,
                    r.written,
                    r.skipped,
                    r.foreign,
                    format_duration(std::time::Duration::from_millis(r.duration_ms.max(0) as u64)),
                ),
                None => println!("Last run:    never"),
            }
            Ok(())
        }
        Commands::Skills { limit } => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_skill_counts(&conn, &settings.source, limit)?;
            if rows.is_empty() {
                println!("No skills recorded. Run a scrape first.");
                return Ok(());
            }
            println!("{:>3} | {:<18} | {:<14} | {:>8}", "#", "Skill", "Category", "Listings");
            println!("{}", "-".repeat(52));
            for (i, r) in rows.iter().enumerate() {
                println!("{:>3} | {:<18} | {:<14} | {:>8}", i + 1, r.skill, r.category, r.listings);
            }
            Ok(())
        }
        Commands::Classify { text } => classify(&settings, text),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_scrape(settings: &Settings) -> anyhow::Result<()> {
    let taxonomy = Taxonomy::load(settings.taxonomy_path.as_deref())?;

    // No network work before the database is known to be usable.
    let mut conn = db::connect(&settings.database_path)
        .with_context(|| format!("cannot open {}", settings.database_path))?;
    db::init_schema(&conn)?;

    let pipeline = Pipeline::new(&settings.source, &taxonomy, Utc::now())?;
    let crawler = Crawler::new(page_source(settings).await?, settings)?;

    println!(
        "Scraping {} (up to {} pages, {} at a time)...",
        settings.list_page_url(1),
        settings.max_pages,
        settings.concurrency
    );
    let report = run::execute(&crawler, &pipeline, &mut conn, &settings.source).await?;
    report.print();
    Ok(())
}

#[cfg(feature = "browser")]
async fn page_source(settings: &Settings) -> anyhow::Result<Arc<dyn PageSource>> {
    if settings.use_browser {
        return Ok(Arc::new(browser::BrowserSource::launch(settings).await?));
    }
    Ok(Arc::new(HttpSource::new(settings)?))
}

#[cfg(not(feature = "browser"))]
async fn page_source(settings: &Settings) -> anyhow::Result<Arc<dyn PageSource>> {
    if settings.use_browser {
        anyhow::bail!("JOBMINER_USE_BROWSER needs a build with `--features browser`");
    }
    Ok(Arc::new(HttpSource::new(settings)?))
}

fn classify(settings: &Settings, text: Option<String>) -> anyhow::Result<()> {
    let text = match text {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("cannot read stdin")?;
            buf
        }
    };

    let taxonomy = Taxonomy::load(settings.taxonomy_path.as_deref())?;
    let pipeline = Pipeline::new(&settings.source, &taxonomy, Utc::now())?;

    let skills = pipeline.skills().classify(&text);
    let mode = extract::mode::classify(None, Some(text.as_str()));
    let experience = extract::experience::classify(None, None, Some(text.as_str()), pipeline.bands());
    let salary = extract::salary::parse(Some(text.as_str()));

    println!("Mode:       {}", mode.as_str());
    println!("Experience: {}", experience.as_str());
    match salary {
        Some(s) => println!(
            "Salary:     {} - {} {}",
            s.min.map(|v| v.to_string()).unwrap_or_else(|| "?".into()),
            s.max.map(|v| v.to_string()).unwrap_or_else(|| "?".into()),
            s.currency.unwrap_or_default()
        ),
        None => println!("Salary:     -"),
    }
    println!("Skills ({} of {} known):", skills.len(), pipeline.skills().len());
    for tag in &skills {
        println!("  {:<18} {}", tag.name, tag.category);
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
