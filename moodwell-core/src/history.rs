//! Mood history for the dashboard
//!
//! Users log moods explicitly; the dashboard asks for a summary over the
//! last N days: per-category counts (every category present, zero-filled),
//! the dominant mood and one bucket per calendar day (UTC).

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::error::StoreError;
use crate::models::{MoodCategory, MoodEntry};

pub const MAX_NOTE_CHARS: usize = 500;
pub const MAX_SUMMARY_DAYS: u32 = 366;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Mood log error: {0}")]
    Store(#[from] StoreError),
}

impl HistoryError {
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryError::InvalidInput(_) => "invalid_input",
            HistoryError::Store(_) => "store",
        }
    }
}

#[async_trait]
pub trait MoodLog: Send + Sync {
    async fn record(&self, entry: &MoodEntry) -> Result<(), StoreError>;

    /// Entries for `user_id` recorded at or after `since`, oldest first.
    async fn entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMood {
    pub date: NaiveDate,
    pub count: usize,
    pub dominant: Option<MoodCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub days: u32,
    pub total: usize,
    pub counts: BTreeMap<MoodCategory, usize>,
    pub dominant: Option<MoodCategory>,
    pub daily: Vec<DailyMood>,
}

/// Validate and store one mood entry.
pub async fn record_mood(
    log: &dyn MoodLog,
    user_id: &str,
    category: MoodCategory,
    note: Option<String>,
) -> Result<MoodEntry, HistoryError> {
    if user_id.trim().is_empty() {
        return Err(HistoryError::InvalidInput("user id must not be empty".to_string()));
    }
    let note = note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(n) = &note {
        if n.chars().count() > MAX_NOTE_CHARS {
            return Err(HistoryError::InvalidInput(format!(
                "note exceeds {} characters",
                MAX_NOTE_CHARS
            )));
        }
    }

    let entry = MoodEntry::new(user_id, category, note);
    log.record(&entry).await?;
    tracing::info!(user_id = %user_id, category = %category, "Mood recorded");
    Ok(entry)
}

/// First day (UTC) of an N-day window ending on `now`'s date.
pub fn window_start(now: DateTime<Utc>, days: u32) -> NaiveDate {
    now.date_naive() - Duration::days(i64::from(days.max(1)) - 1)
}

/// Load the last `days` days of entries and summarize them.
pub async fn mood_summary(
    log: &dyn MoodLog,
    user_id: &str,
    now: DateTime<Utc>,
    days: u32,
) -> Result<MoodSummary, HistoryError> {
    if days == 0 || days > MAX_SUMMARY_DAYS {
        return Err(HistoryError::InvalidInput(format!(
            "days must be between 1 and {}",
            MAX_SUMMARY_DAYS
        )));
    }
    let since = window_start(now, days)
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);
    let entries = log.entries_since(user_id, since).await?;
    Ok(summarize(&entries, now, days))
}

/// Pure aggregation; entries outside the window are ignored.
pub fn summarize(entries: &[MoodEntry], now: DateTime<Utc>, days: u32) -> MoodSummary {
    let days = days.max(1);
    let start = window_start(now, days);
    let end = now.date_naive();

    let mut counts: BTreeMap<MoodCategory, usize> =
        MoodCategory::ALL.iter().map(|c| (*c, 0)).collect();
    let mut per_day: HashMap<NaiveDate, BTreeMap<MoodCategory, usize>> = HashMap::new();
    let mut total = 0;

    for entry in entries {
        let date = entry.recorded_at.date_naive();
        if date < start || date > end {
            continue;
        }
        total += 1;
        *counts.entry(entry.category).or_default() += 1;
        *per_day
            .entry(date)
            .or_default()
            .entry(entry.category)
            .or_default() += 1;
    }

    let daily = (0..days)
        .map(|offset| {
            let date = start + Duration::days(i64::from(offset));
            let day_counts = per_day.get(&date);
            DailyMood {
                date,
                count: day_counts.map(|c| c.values().sum()).unwrap_or(0),
                dominant: day_counts.and_then(dominant),
            }
        })
        .collect();

    MoodSummary {
        days,
        total,
        dominant: dominant(&counts),
        counts,
        daily,
    }
}

/// Most frequent category; ties go to the earlier category.
fn dominant(counts: &BTreeMap<MoodCategory, usize>) -> Option<MoodCategory> {
    let mut best: Option<(MoodCategory, usize)> = None;
    for (category, count) in counts {
        if *count == 0 {
            continue;
        }
        match best {
            Some((_, top)) if *count <= top => {}
            _ => best = Some((*category, *count)),
        }
    }
    best.map(|(c, _)| c)
}

// ============================================================================
// MemoryMoodLog
// ============================================================================

#[derive(Default)]
pub struct MemoryMoodLog {
    entries: RwLock<HashMap<String, Vec<MoodEntry>>>,
}

impl MemoryMoodLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MoodLog for MemoryMoodLog {
    async fn record(&self, entry: &MoodEntry) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("mood log lock poisoned".to_string()))?
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError> {
        let map = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("mood log lock poisoned".to_string()))?;
        let mut out: Vec<MoodEntry> = map
            .get(user_id)
            .map(|v| v.iter().filter(|e| e.recorded_at >= since).cloned().collect())
            .unwrap_or_default();
        out.sort_by_key(|e| e.recorded_at);
        Ok(out)
    }
}

// ============================================================================
// PgMoodLog
// ============================================================================

const MOOD_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS mood_entries (
        id          UUID PRIMARY KEY,
        user_id     TEXT NOT NULL,
        category    TEXT NOT NULL,
        note        TEXT,
        recorded_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS mood_entries_user_recorded_idx
        ON mood_entries (user_id, recorded_at)
    "#,
];

#[derive(Debug, Clone)]
pub struct PgMoodLog {
    pool: PgPool,
}

impl PgMoodLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in MOOD_SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MoodLog for PgMoodLog {
    async fn record(&self, entry: &MoodEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO mood_entries (id, user_id, category, note, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(entry.category.as_str())
        .bind(&entry.note)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, category, note, recorded_at
            FROM mood_entries
            WHERE user_id = $1 AND recorded_at >= $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<MoodEntry, StoreError> {
                let category: String = row.try_get("category")?;
                Ok(MoodEntry {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    category: MoodCategory::parse(&category).ok_or_else(|| {
                        StoreError::InvalidRecord(format!("unknown mood category '{}'", category))
                    })?,
                    note: row.try_get("note")?,
                    recorded_at: row.try_get("recorded_at")?,
                })
            })
            .collect()
    }
}
