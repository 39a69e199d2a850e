use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

pub const DEFAULT_TARGET_STAR_RATING: f64 = 5.5;
pub const DEFAULT_TARGET_MAX_BPM: f64 = 200.0;
pub const DEFAULT_GOAL_ACCURACY: f64 = 96.0;

const KEY_TARGET_SR: &str = "target_sr";
const KEY_TARGET_BPM: &str = "target_bpm";
const KEY_GOAL_ACCURACY: &str = "goal_accuracy";
const KEY_GOAL_MISSES: &str = "goal_misses";
const KEY_GOAL_SCORE: &str = "goal_score";
const KEY_PLAYER: &str = "player_name";

/// Trainer values remembered between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub target_star_rating: f64,
    pub target_max_bpm: f64,
    pub goal_accuracy: Option<f64>,
    pub goal_misses: Option<u32>,
    pub goal_score: Option<u64>,
    pub player_name: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            target_star_rating: DEFAULT_TARGET_STAR_RATING,
            target_max_bpm: DEFAULT_TARGET_MAX_BPM,
            goal_accuracy: Some(DEFAULT_GOAL_ACCURACY),
            goal_misses: None,
            goal_score: None,
            player_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreferenceEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO preferences (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, now],
        )?;
        debug!(key, value, "preference stored");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<PreferenceEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM preferences ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(PreferenceEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Unparseable stored values fall back to the defaults instead of failing.
    pub fn load_preferences(&self) -> Result<Preferences> {
        let defaults = Preferences::default();
        let positive = |value: f64| value.is_finite() && value > 0.0;
        Ok(Preferences {
            target_star_rating: self
                .parsed::<f64>(KEY_TARGET_SR)?
                .filter(|v| positive(*v))
                .unwrap_or(defaults.target_star_rating),
            target_max_bpm: self
                .parsed::<f64>(KEY_TARGET_BPM)?
                .filter(|v| positive(*v))
                .unwrap_or(defaults.target_max_bpm),
            goal_accuracy: match self.get(KEY_GOAL_ACCURACY)? {
                Some(raw) => raw.parse().ok(),
                None => defaults.goal_accuracy,
            },
            goal_misses: self.parsed(KEY_GOAL_MISSES)?,
            goal_score: self.parsed(KEY_GOAL_SCORE)?,
            player_name: self.get(KEY_PLAYER)?.filter(|name| !name.is_empty()),
        })
    }

    pub fn save_targets(&self, star_rating: f64, max_bpm: f64) -> Result<()> {
        self.set(KEY_TARGET_SR, &format!("{star_rating:.1}"))?;
        self.set(KEY_TARGET_BPM, &format!("{max_bpm}"))
    }

    /// An unset goal is stored as an empty value so it stays unset on reload.
    pub fn save_goal(
        &self,
        accuracy: Option<f64>,
        misses: Option<u32>,
        score: Option<u64>,
    ) -> Result<()> {
        let text = |v: Option<String>| v.unwrap_or_default();
        self.set(KEY_GOAL_ACCURACY, &text(accuracy.map(|v| v.to_string())))?;
        self.set(KEY_GOAL_MISSES, &text(misses.map(|v| v.to_string())))?;
        self.set(KEY_GOAL_SCORE, &text(score.map(|v| v.to_string())))
    }

    pub fn save_player(&self, player_name: &str) -> Result<()> {
        self.set(KEY_PLAYER, player_name)
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        Ok(self.get(key)?.and_then(|raw| raw.trim().parse().ok()))
    }
}
