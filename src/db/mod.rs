// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Photo store: enriched photo records keyed by URL

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::content::{sample_rating, Sampler};
use crate::geo::GeoPoint;
use crate::vibes::{join_vibes, split_vibes, Vibe};
use crate::{Result, SnapSphereError};

/// How busy a spot usually is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrowdLevel {
    Low,
    Medium,
    High,
}

impl CrowdLevel {
    pub const ALL: [CrowdLevel; 3] = [CrowdLevel::Low, CrowdLevel::Medium, CrowdLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            CrowdLevel::Low => "low",
            CrowdLevel::Medium => "medium",
            CrowdLevel::High => "high",
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrowdLevel {
    type Err = SnapSphereError;

    fn from_str(s: &str) -> Result<Self> {
        CrowdLevel::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SnapSphereError::InvalidInput(format!("unknown crowd level '{}'", s)))
    }
}

/// An enriched photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub photo_url: String,
    pub location: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
    pub vibes: Vec<Vibe>,
    pub place_name: Option<String>,
    pub full_address: Option<String>,
    pub description: Option<String>,
    pub best_time: Option<String>,
    pub crowd_level: Option<CrowdLevel>,
    pub safety_notes: Option<String>,
    pub rating: Option<f64>,
    pub submitted_by: Option<String>,
}

impl PhotoRecord {
    /// True when the fields shown to users are all present
    pub fn is_fully_enriched(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.place_name) && filled(&self.description) && !self.vibes.is_empty()
    }
}

/// Thread-safe SQLite photo store
#[derive(Clone)]
pub struct PhotoStore {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "photo_url, latitude, longitude, vibes, timestamp, place_name, full_address, \
     description, best_time, crowd_level, safety_notes, rating, submitted_by";

impl PhotoStore {
    /// Open or create the store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SnapSphereError::Config("Database lock poisoned".to_string()))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS photos (
                photo_url TEXT PRIMARY KEY,
                latitude REAL,
                longitude REAL,
                vibes TEXT NOT NULL DEFAULT '',
                timestamp TEXT NOT NULL,
                place_name TEXT,
                full_address TEXT,
                description TEXT,
                best_time TEXT,
                crowd_level TEXT,
                safety_notes TEXT,
                rating REAL,
                submitted_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_photos_location ON photos(latitude, longitude);
        "#)?;
        Ok(())
    }

    /// Insert a record, or overwrite the one stored under the same URL
    pub fn put(&self, record: &PhotoRecord) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"INSERT INTO photos (photo_url, latitude, longitude, vibes, timestamp, place_name, full_address,
                                   description, best_time, crowd_level, safety_notes, rating, submitted_by)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
               ON CONFLICT(photo_url) DO UPDATE SET
                   latitude = excluded.latitude,
                   longitude = excluded.longitude,
                   vibes = excluded.vibes,
                   timestamp = excluded.timestamp,
                   place_name = excluded.place_name,
                   full_address = excluded.full_address,
                   description = excluded.description,
                   best_time = excluded.best_time,
                   crowd_level = excluded.crowd_level,
                   safety_notes = excluded.safety_notes,
                   rating = excluded.rating,
                   submitted_by = excluded.submitted_by"#,
            params![
                record.photo_url,
                record.location.map(|p| p.latitude),
                record.location.map(|p| p.longitude),
                join_vibes(&record.vibes),
                record.timestamp.to_rfc3339(),
                record.place_name,
                record.full_address,
                record.description,
                record.best_time,
                record.crowd_level.map(CrowdLevel::as_str),
                record.safety_notes,
                record.rating,
                record.submitted_by,
            ],
        )?;
        debug!("Stored photo {}", record.photo_url);
        Ok(())
    }

    /// Look up a photo by URL and exact coordinates
    pub fn get_by_key(&self, photo_url: &str, location: GeoPoint) -> Result<Option<PhotoRecord>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {} FROM photos WHERE photo_url = ?1 AND latitude = ?2 AND longitude = ?3",
            SELECT_COLUMNS
        );
        conn.query_row(&sql, params![photo_url, location.latitude, location.longitude], row_to_record)
            .optional()
            .map_err(Into::into)
    }

    /// Look up a photo by URL alone
    pub fn get_by_url(&self, photo_url: &str) -> Result<Option<PhotoRecord>> {
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {} FROM photos WHERE photo_url = ?1", SELECT_COLUMNS);
        conn.query_row(&sql, params![photo_url], row_to_record)
            .optional()
            .map_err(Into::into)
    }

    pub fn contains_url(&self, photo_url: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM photos WHERE photo_url = ?1", params![photo_url], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Every stored photo, in first-insertion order
    pub fn all(&self) -> Result<Vec<PhotoRecord>> {
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {} FROM photos ORDER BY rowid", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt.query_map([], row_to_record)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Give every photo without a rating a generated one. Returns how many changed.
    pub fn backfill_ratings(&self, sampler: &dyn Sampler) -> Result<usize> {
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;
        let urls = {
            let mut stmt = tx.prepare("SELECT photo_url FROM photos WHERE rating IS NULL ORDER BY rowid")?;
            let urls = stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
            urls
        };
        for url in &urls {
            tx.execute(
                "UPDATE photos SET rating = ?1 WHERE photo_url = ?2",
                params![sample_rating(sampler), url],
            )?;
        }
        tx.commit()?;
        Ok(urls.len())
    }
}

#[cfg(test)]
impl PhotoStore {
    /// Run raw SQL against the store
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.lock_conn()?.execute_batch(sql)?;
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PhotoRecord> {
    let latitude: Option<f64> = row.get(1)?;
    let longitude: Option<f64> = row.get(2)?;
    let vibes: Option<String> = row.get(3)?;
    let timestamp: String = row.get(4)?;
    let crowd_level: Option<String> = row.get(9)?;

    Ok(PhotoRecord {
        photo_url: row.get(0)?,
        location: match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        },
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        vibes: vibes.as_deref().map(split_vibes).unwrap_or_default(),
        place_name: row.get(5)?,
        full_address: row.get(6)?,
        description: row.get(7)?,
        best_time: row.get(8)?,
        crowd_level: crowd_level.and_then(|c| c.parse().ok()),
        safety_notes: row.get(10)?,
        rating: row.get(11)?,
        submitted_by: row.get(12)?,
    })
}
