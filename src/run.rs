use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{self, WriteError};
use crate::listing::Listing;
use crate::parser::{Pipeline, RawPage};
use crate::scraper::{CrawlStats, Crawler};

/// Counters for one run; printed to the operator and stored in `scrape_runs`.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub list_pages: usize,
    pub list_failures: usize,
    pub offers: usize,
    pub fetched: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    pub written: usize,
    pub row_failures: usize,
    pub foreign: usize,
    pub duration: Duration,
}

impl RunReport {
    /// Offers that were found but never reached the table.
    pub fn skipped(&self) -> usize {
        self.fetch_failures + self.parse_failures + self.row_failures
    }

    pub fn print(&self) {
        println!(
            "List pages: {} ok, {} failed. Offers found: {}.",
            self.list_pages, self.list_failures, self.offers
        );
        println!(
            "Fetched {} offers ({} failed), {} unparsable.",
            self.fetched, self.fetch_failures, self.parse_failures
        );
        println!(
            "Saved {} listings, {} rejected rows, {} owned by another source.",
            self.written, self.row_failures, self.foreign
        );
    }
}

/// Parse + normalize + classify every page in parallel. Pages that do not
/// parse are logged and counted, never fatal.
pub fn process_pages(pipeline: &Pipeline, pages: &[RawPage]) -> (Vec<Listing>, usize) {
    let results: Vec<_> = pages.par_iter().map(|page| pipeline.process_page(page)).collect();

    let mut listings = Vec::with_capacity(results.len());
    let mut failures = 0;
    for result in results {
        match result {
            Ok(listing) => listings.push(listing),
            Err(e) => {
                warn!(error = %e, "skipping unparsable offer");
                failures += 1;
            }
        }
    }
    (listings, failures)
}

/// Full scrape: discover, fetch, process, write, record. Only a database
/// failure ends it early.
pub async fn execute(
    crawler: &Crawler,
    pipeline: &Pipeline,
    conn: &mut Connection,
    source: &str,
) -> Result<RunReport, WriteError> {
    let t0 = Instant::now();
    let started_at = Utc::now();

    let mut crawl = CrawlStats::default();
    let urls = crawler.discover(&mut crawl).await;
    let pages = crawler.fetch_details(urls, &mut crawl).await;

    let t_process = Instant::now();
    let (listings, parse_failures) = process_pages(pipeline, &pages);
    info!(
        listings = listings.len(),
        parse_failures,
        secs = t_process.elapsed().as_secs_f64(),
        "processed offers"
    );

    let written = db::write_batch(conn, &listings)?;

    let report = RunReport {
        started_at,
        list_pages: crawl.list_pages,
        list_failures: crawl.list_failures,
        offers: crawl.offers,
        fetched: crawl.fetched,
        fetch_failures: crawl.fetch_failures,
        parse_failures,
        written: written.written,
        row_failures: written.row_failures,
        foreign: written.foreign,
        duration: t0.elapsed(),
    };
    let run_id = db::record_run(conn, source, &report)?;
    info!(run_id, written = report.written, skipped = report.skipped(), "run finished");
    Ok(report)
}
