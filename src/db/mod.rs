//! Verdict and duplicate-group persistence.
//!
//! Uses SQLx with SQLite so duplicate checks can be reviewed after a run.
//! Nothing in the matcher depends on this module; callers that do not want
//! a history simply never open a pool.
//!
//! # Example
//!
//! ```ignore
//! use music_dedupe::db::{init_db, save_report, get_groups};
//!
//! let pool = init_db("sqlite:dedupe.db").await?;
//! save_report(&pool, &report).await?;
//! let groups = get_groups(&pool).await?;
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::batch::BatchReport;
use crate::canonical::{DuplicateGroup, ScoredRecord};
use crate::model::{CandidateAsset, DuplicateVerdict, RecordRef, SourceKind};
use crate::resolution::{Action, Resolution};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "music_dedupe.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// A verdict as it was stored.
#[derive(Debug, Clone)]
pub struct StoredVerdict {
    pub candidate_id: String,
    pub title: String,
    pub artist: String,
    pub verdict: DuplicateVerdict,
    pub resolution: Resolution,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct VerdictRow {
    candidate_id: String,
    title: String,
    artist: String,
    action: String,
    reason_code: String,
    reason: String,
    verdict_json: String,
    checked_at: String,
}

impl TryFrom<VerdictRow> for StoredVerdict {
    type Error = sqlx::Error;

    fn try_from(row: VerdictRow) -> Result<Self, Self::Error> {
        let verdict = serde_json::from_str(&row.verdict_json)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let action = row.action.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let code = row
            .reason_code
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(StoredVerdict {
            candidate_id: row.candidate_id,
            title: row.title,
            artist: row.artist,
            verdict,
            resolution: Resolution {
                action,
                code,
                reason: row.reason,
            },
            checked_at: row
                .checked_at
                .parse()
                .map_err(|e: chrono::ParseError| sqlx::Error::Decode(Box::new(e)))?,
        })
    }
}

const VERDICT_COLUMNS: &str =
    "candidate_id, title, artist, action, reason_code, reason, verdict_json, checked_at";

async fn upsert_verdict(
    conn: &mut SqliteConnection,
    candidate: &CandidateAsset,
    verdict: &DuplicateVerdict,
    resolution: &Resolution,
) -> sqlx::Result<()> {
    let verdict_json =
        serde_json::to_string(verdict).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO verdicts (candidate_id, title, artist, is_duplicate, score, strategy,
                              best_match, action, reason_code, reason, verdict_json, checked_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(candidate_id) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            is_duplicate = excluded.is_duplicate,
            score = excluded.score,
            strategy = excluded.strategy,
            best_match = excluded.best_match,
            action = excluded.action,
            reason_code = excluded.reason_code,
            reason = excluded.reason,
            verdict_json = excluded.verdict_json,
            checked_at = excluded.checked_at
        "#,
    )
    .bind(&candidate.local_id)
    .bind(&candidate.title)
    .bind(&candidate.artist)
    .bind(verdict.is_duplicate)
    .bind(verdict.score)
    .bind(verdict.strategy.map(|s| s.as_str()))
    .bind(verdict.best_match.as_ref().map(|r| r.to_string()))
    .bind(resolution.action.as_str())
    .bind(resolution.code.as_str())
    .bind(&resolution.reason)
    .bind(verdict_json)
    .bind(Utc::now().to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Store (or replace) the verdict for one candidate.
pub async fn save_verdict(
    pool: &SqlitePool,
    candidate: &CandidateAsset,
    verdict: &DuplicateVerdict,
    resolution: &Resolution,
) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;
    upsert_verdict(&mut *conn, candidate, verdict, resolution).await
}

/// Latest verdict for a candidate.
pub async fn get_verdict(
    pool: &SqlitePool,
    candidate_id: &str,
) -> sqlx::Result<Option<StoredVerdict>> {
    let row: Option<VerdictRow> = sqlx::query_as(&format!(
        "SELECT {VERDICT_COLUMNS} FROM verdicts WHERE candidate_id = ?"
    ))
    .bind(candidate_id)
    .fetch_optional(pool)
    .await?;

    row.map(StoredVerdict::try_from).transpose()
}

/// Every stored verdict with the given action, by candidate id.
pub async fn get_verdicts_by_action(
    pool: &SqlitePool,
    action: Action,
) -> sqlx::Result<Vec<StoredVerdict>> {
    let rows: Vec<VerdictRow> = sqlx::query_as(&format!(
        "SELECT {VERDICT_COLUMNS} FROM verdicts WHERE action = ? ORDER BY candidate_id"
    ))
    .bind(action.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(StoredVerdict::try_from).collect()
}

/// Store every verdict and group of a batch run in a single transaction.
///
/// Returns the number of groups written.
pub async fn save_report(pool: &SqlitePool, report: &BatchReport) -> sqlx::Result<usize> {
    let mut tx = pool.begin().await?;
    let created_at = Utc::now().to_rfc3339();

    for item in &report.items {
        upsert_verdict(&mut *tx, &item.candidate, &item.verdict, &item.resolution).await?;
    }

    for group in &report.groups {
        let group_id = sqlx::query(
            "INSERT INTO duplicate_groups (canonical_source, canonical_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(group.canonical.source.as_str())
        .bind(&group.canonical.id)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, member) in group.members.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO duplicate_group_members
                    (group_id, position, source, record_id, title, completeness)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(group_id)
            .bind(position as i64)
            .bind(member.record.source.as_str())
            .bind(&member.record.id)
            .bind(&member.title)
            .bind(member.completeness)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    tracing::debug!(
        verdicts = report.items.len(),
        groups = report.groups.len(),
        "Saved batch report"
    );
    Ok(report.groups.len())
}

fn parse_source(s: &str) -> sqlx::Result<SourceKind> {
    s.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))
}

/// Every stored duplicate group, oldest first, members in discovery order.
pub async fn get_groups(pool: &SqlitePool) -> sqlx::Result<Vec<DuplicateGroup>> {
    let groups: Vec<(i64, String, String)> = sqlx::query_as(
        "SELECT id, canonical_source, canonical_id FROM duplicate_groups ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let members: Vec<(i64, String, String, Option<String>, f64)> = sqlx::query_as(
        r#"
        SELECT group_id, source, record_id, title, completeness
        FROM duplicate_group_members
        ORDER BY group_id, position
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut result = Vec::with_capacity(groups.len());
    for (id, source, canonical_id) in groups {
        let members = members
            .iter()
            .filter(|(group_id, ..)| *group_id == id)
            .map(|(_, source, record_id, title, completeness)| {
                Ok(ScoredRecord {
                    record: RecordRef::new(parse_source(source)?, record_id.clone()),
                    title: title.clone(),
                    completeness: *completeness,
                })
            })
            .collect::<sqlx::Result<Vec<_>>>()?;

        result.push(DuplicateGroup {
            members,
            canonical: RecordRef::new(parse_source(&source)?, canonical_id),
        });
    }

    Ok(result)
}
