use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    InsertOutcome, NewSubmission, Submission, ERROR_PREFIX, PLACEHOLDER_PREFIX,
};

use super::schema::SCHEMA;

const SUBMISSION_COLUMNS: &str = "id, source_url, submitter, status, content, digest, \
     created_at, scraped_at, shared_to_group_at";

/// Durable submission store. All statements run on the single connection thread
/// owned by `tokio_rusqlite`, so every call is atomic relative to the others.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Write operations

    /// Insert a pending submission unless the url is already tracked.
    pub async fn insert_submission(&self, submission: NewSubmission) -> Result<InsertOutcome> {
        let id = Uuid::new_v4().to_string();
        let created_at = timestamp(Utc::now());
        let outcome = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    r#"INSERT INTO submissions (id, source_url, submitter, status, created_at)
                       VALUES (?1, ?2, ?3, 'pending', ?4)
                       ON CONFLICT(source_url) DO NOTHING"#,
                    params![id, submission.source_url, submission.submitter, created_at],
                )?;
                Ok(if inserted == 0 {
                    InsertOutcome::AlreadyExists
                } else {
                    InsertOutcome::Inserted(id)
                })
            })
            .await?;
        Ok(outcome)
    }

    /// Overwrite content and digest and move the record to `scraped`.
    /// Returns the number of rows touched (0 when the url is unknown).
    pub async fn record_scrape_result(
        &self,
        url: &str,
        content: String,
        digest: String,
    ) -> Result<usize> {
        let url = url.to_string();
        let scraped_at = timestamp(Utc::now());
        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    r#"UPDATE submissions
                       SET content = ?1, digest = ?2, status = 'scraped', scraped_at = ?3
                       WHERE source_url = ?4"#,
                    params![content, digest, scraped_at, url],
                )?;
                Ok(updated)
            })
            .await?;
        Ok(updated)
    }

    /// Store a failure placeholder without leaving the pending state.
    /// A record that was already scraped keeps its good content.
    pub async fn record_scrape_failure(&self, url: &str, placeholder: String) -> Result<usize> {
        let url = url.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    r#"UPDATE submissions
                       SET content = ?1, digest = ?1
                       WHERE source_url = ?2 AND status != 'scraped'"#,
                    params![placeholder, url],
                )?;
                Ok(updated)
            })
            .await?;
        Ok(updated)
    }

    /// Stamp `shared_to_group_at` on every given url that is not yet shared.
    /// Runs in one transaction; returns how many rows flipped.
    pub async fn mark_shared(&self, urls: &[String]) -> Result<usize> {
        let urls = urls.to_vec();
        let shared_at = timestamp(Utc::now());
        let marked = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut marked = 0;
                {
                    let mut stmt = tx.prepare(
                        r#"UPDATE submissions SET shared_to_group_at = ?1
                           WHERE source_url = ?2 AND shared_to_group_at IS NULL"#,
                    )?;
                    for url in &urls {
                        marked += stmt.execute(params![shared_at, url])?;
                    }
                }
                tx.commit()?;
                Ok(marked)
            })
            .await?;
        Ok(marked)
    }

    /// Clear every share marker. Content and digests are untouched.
    pub async fn reset_all_shared(&self) -> Result<usize> {
        let reset = self
            .conn
            .call(|conn| {
                let reset = conn.execute(
                    "UPDATE submissions SET shared_to_group_at = NULL WHERE shared_to_group_at IS NOT NULL",
                    [],
                )?;
                Ok(reset)
            })
            .await?;
        Ok(reset)
    }

    // Queries

    pub async fn distinct_submitters(&self) -> Result<Vec<String>> {
        let submitters = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT submitter FROM submissions WHERE submitter != '' ORDER BY submitter",
                )?;
                let submitters = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(submitters)
            })
            .await?;
        Ok(submitters)
    }

    /// A submitter's records, newest first.
    pub async fn submissions_by_submitter(&self, submitter: &str) -> Result<Vec<Submission>> {
        let submitter = submitter.to_string();
        let submissions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE submitter = ?1 \
                     ORDER BY created_at DESC, rowid DESC"
                ))?;
                let submissions = stmt
                    .query_map(params![submitter], submission_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(submissions)
            })
            .await?;
        Ok(submissions)
    }

    pub async fn submission_by_url(&self, url: &str) -> Result<Option<Submission>> {
        let url = url.to_string();
        let submission = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE source_url = ?1"
                ))?;
                let submission = stmt
                    .query_row(params![url], submission_from_row)
                    .optional()?;
                Ok(submission)
            })
            .await?;
        Ok(submission)
    }

    /// Scraped records created on `date` (UTC), oldest first.
    pub async fn scraped_on(&self, date: NaiveDate) -> Result<Vec<Submission>> {
        let day = date.format("%Y-%m-%d").to_string();
        let submissions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions \
                     WHERE substr(created_at, 1, 10) = ?1 AND status = 'scraped' \
                     ORDER BY created_at ASC, rowid ASC"
                ))?;
                let submissions = stmt
                    .query_map(params![day], submission_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(submissions)
            })
            .await?;
        Ok(submissions)
    }

    /// Records that still need a scrape: not yet scraped, no usable content,
    /// or content that is only a failure placeholder.
    pub async fn unscraped(&self) -> Result<Vec<Submission>> {
        let submissions = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions \
                     WHERE status != 'scraped' \
                        OR content IS NULL \
                        OR trim(content) = '' \
                        OR substr(content, 1, length(?1)) = ?1 \
                        OR substr(content, 1, length(?2)) = ?2 \
                     ORDER BY created_at ASC, rowid ASC"
                ))?;
                let submissions = stmt
                    .query_map(params![ERROR_PREFIX, PLACEHOLDER_PREFIX], submission_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(submissions)
            })
            .await?;
        Ok(submissions)
    }

    pub async fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn submission_from_row(row: &Row) -> rusqlite::Result<Submission> {
    let status: String = row.get(3)?;
    let status = status
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;

    Ok(Submission {
        id: row.get(0)?,
        source_url: row.get(1)?,
        submitter: row.get(2)?,
        status,
        content: row.get(4)?,
        digest: row.get(5)?,
        created_at: datetime_column(row, 6)?,
        scraped_at: optional_datetime_column(row, 7)?,
        shared_to_group_at: optional_datetime_column(row, 8)?,
    })
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn optional_datetime_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => datetime_column(row, idx).map(Some),
        None => Ok(None),
    }
}
