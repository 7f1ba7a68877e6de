use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use thiserror::Error;
use tracing::{debug, warn};

use crate::listing::Listing;
use crate::run::RunReport;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot prepare database directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("database connection failed: {0}")]
    Connection(#[from] rusqlite::Error),
}

pub fn connect(path: &str) -> Result<Connection, WriteError> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| WriteError::Io {
            path: dir.display().to_string(),
            source,
        })?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), WriteError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS listings (
            id             INTEGER PRIMARY KEY,
            url            TEXT UNIQUE NOT NULL,
            source         TEXT NOT NULL,
            job_id         TEXT NOT NULL,
            title          TEXT NOT NULL CHECK(length(trim(title)) > 0),
            company        TEXT,
            salary_min     INTEGER,
            salary_max     INTEGER,
            currency       TEXT,
            locations      TEXT NOT NULL DEFAULT '[]',
            operating_mode TEXT NOT NULL
                           CHECK(operating_mode IN ('on-site','hybrid','remote','unknown')),
            experience     TEXT NOT NULL,
            experience_years INTEGER,
            contract_type  TEXT,
            description    TEXT NOT NULL,
            skills         TEXT NOT NULL DEFAULT '',
            scraped_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_listings_source ON listings(source);
        CREATE INDEX IF NOT EXISTS idx_listings_mode ON listings(operating_mode);

        CREATE TABLE IF NOT EXISTS listing_skills (
            url       TEXT NOT NULL REFERENCES listings(url) ON DELETE CASCADE,
            source    TEXT NOT NULL,
            skill     TEXT NOT NULL,
            category  TEXT NOT NULL,
            UNIQUE(url, skill)
        );
        CREATE INDEX IF NOT EXISTS idx_listing_skills_skill ON listing_skills(skill);

        CREATE TABLE IF NOT EXISTS scrape_runs (
            id             INTEGER PRIMARY KEY,
            source         TEXT NOT NULL,
            started_at     TEXT NOT NULL,
            finished_at    TEXT NOT NULL,
            list_pages     INTEGER NOT NULL,
            list_failures  INTEGER NOT NULL,
            offers         INTEGER NOT NULL,
            fetched        INTEGER NOT NULL,
            fetch_failures INTEGER NOT NULL,
            parse_failures INTEGER NOT NULL,
            written        INTEGER NOT NULL,
            row_failures   INTEGER NOT NULL,
            foreign_rows   INTEGER NOT NULL,
            duration_ms    INTEGER NOT NULL
        );
        ",
    )?;
    add_column_if_missing(conn, "listings", "experience_years", "INTEGER")?;
    Ok(())
}

/// Brings tables created by older builds up to date.
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, decl: &str) -> rusqlite::Result<()> {
    let columns = {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };
    let exists = columns.iter().any(|name| name == column);
    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl))?;
    }
    Ok(())
}

// ── Listings ──

const UPSERT_LISTING: &str = "
    INSERT INTO listings
        (url, source, job_id, title, company, salary_min, salary_max, currency, locations,
         operating_mode, experience, experience_years, contract_type, description, skills,
         scraped_at)
    VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)
    ON CONFLICT(url) DO UPDATE SET
        job_id = excluded.job_id,
        title = excluded.title,
        company = excluded.company,
        salary_min = excluded.salary_min,
        salary_max = excluded.salary_max,
        currency = excluded.currency,
        locations = excluded.locations,
        operating_mode = excluded.operating_mode,
        experience = excluded.experience,
        experience_years = excluded.experience_years,
        contract_type = excluded.contract_type,
        description = excluded.description,
        skills = excluded.skills,
        scraped_at = excluded.scraped_at,
        updated_at = datetime('now')
    WHERE listings.source = excluded.source";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub written: usize,
    pub row_failures: usize,
    pub foreign: usize,
}

/// Upsert a batch in one transaction. A row that violates the schema is rolled
/// back alone and counted; anything else aborts the batch.
pub fn write_batch(conn: &mut Connection, listings: &[Listing]) -> Result<WriteStats, WriteError> {
    let mut stats = WriteStats::default();
    let mut tx = conn.transaction()?;

    for listing in listings {
        let mut sp = tx.savepoint()?;
        match upsert_listing(&sp, listing) {
            Ok(true) => {
                sp.commit()?;
                stats.written += 1;
            }
            Ok(false) => {
                debug!(url = %listing.url, "owned by another source, left untouched");
                sp.commit()?;
                stats.foreign += 1;
            }
            Err(e) if is_row_level(&e) => {
                warn!(url = %listing.url, error = %e, "row rejected");
                sp.rollback()?;
                stats.row_failures += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tx.commit()?;
    Ok(stats)
}

/// `Ok(false)` when the URL belongs to a different source.
fn upsert_listing(conn: &Connection, l: &Listing) -> rusqlite::Result<bool> {
    let locations = serde_json::to_string(&l.locations)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let (salary_min, salary_max, currency) = match &l.salary {
        Some(s) => (s.min, s.max, s.currency.as_deref()),
        None => (None, None, None),
    };

    let changed = conn.prepare_cached(UPSERT_LISTING)?.execute(params![
        l.url,
        l.source,
        l.job_id,
        l.title,
        l.company,
        salary_min,
        salary_max,
        currency,
        locations,
        l.mode.as_str(),
        l.experience.as_str(),
        l.experience_years,
        l.contract_type,
        l.description,
        l.skill_names().join(","),
        l.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    ])?;
    if changed == 0 {
        return Ok(false);
    }

    conn.prepare_cached("DELETE FROM listing_skills WHERE url = ?1")?
        .execute([&l.url])?;
    let mut insert = conn.prepare_cached(
        "INSERT INTO listing_skills (url, source, skill, category) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for tag in &l.skills {
        insert.execute(params![l.url, l.source, tag.name, tag.category])?;
    }
    Ok(true)
}

fn is_row_level(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.code,
            ErrorCode::ConstraintViolation | ErrorCode::TooBig | ErrorCode::TypeMismatch
        ),
        rusqlite::Error::ToSqlConversionFailure(_) => true,
        _ => false,
    }
}

// ── Runs ──

pub fn record_run(conn: &Connection, source: &str, report: &RunReport) -> Result<i64, WriteError> {
    conn.execute(
        "INSERT INTO scrape_runs
         (source, started_at, finished_at, list_pages, list_failures, offers, fetched,
          fetch_failures, parse_failures, written, row_failures, foreign_rows, duration_ms)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
        params![
            source,
            report.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            report.list_pages,
            report.list_failures,
            report.offers,
            report.fetched,
            report.fetch_failures,
            report.parse_failures,
            report.written,
            report.row_failures,
            report.foreign,
            report.duration.as_millis() as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Stats ──

pub struct LastRun {
    pub started_at: String,
    pub offers: usize,
    pub written: usize,
    pub skipped: usize,
    pub foreign: usize,
    pub duration_ms: i64,
}

pub struct Stats {
    pub listings: usize,
    pub by_mode: Vec<(String, usize)>,
    pub with_salary: usize,
    pub last_run: Option<LastRun>,
}

pub fn get_stats(conn: &Connection, source: &str) -> Result<Stats, WriteError> {
    let listings: usize = conn.query_row(
        "SELECT COUNT(*) FROM listings WHERE source = ?1",
        [source],
        |r| r.get(0),
    )?;
    let with_salary: usize = conn.query_row(
        "SELECT COUNT(*) FROM listings
         WHERE source = ?1 AND (salary_min IS NOT NULL OR salary_max IS NOT NULL)",
        [source],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT operating_mode, COUNT(*) FROM listings
         WHERE source = ?1
         GROUP BY operating_mode
         ORDER BY COUNT(*) DESC, operating_mode",
    )?;
    let by_mode = stmt
        .query_map([source], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let last_run = conn
        .query_row(
            "SELECT started_at, offers, written,
                    fetch_failures + parse_failures + row_failures, foreign_rows, duration_ms
             FROM scrape_runs
             WHERE source = ?1
             ORDER BY id DESC
             LIMIT 1",
            [source],
            |row| {
                Ok(LastRun {
                    started_at: row.get(0)?,
                    offers: row.get(1)?,
                    written: row.get(2)?,
                    skipped: row.get(3)?,
                    foreign: row.get(4)?,
                    duration_ms: row.get(5)?,
                })
            },
        )
        .optional()?;

    Ok(Stats {
        listings,
        by_mode,
        with_salary,
        last_run,
    })
}

pub struct SkillCount {
    pub skill: String,
    pub category: String,
    pub listings: usize,
}

pub fn fetch_skill_counts(conn: &Connection, source: &str, limit: usize) -> Result<Vec<SkillCount>, WriteError> {
    let mut stmt = conn.prepare(
        "SELECT skill, category, COUNT(*) AS n
         FROM listing_skills
         WHERE source = ?1
         GROUP BY skill, category
         ORDER BY n DESC, skill
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![source, limit], |row| {
            Ok(SkillCount {
                skill: row.get(0)?,
                category: row.get(1)?,
                listings: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
