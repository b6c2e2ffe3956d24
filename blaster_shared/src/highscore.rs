//! Highscore table and persistence.
//!
//! # Features
//! - Initials → best score, ordered by initials for stable serialization
//! - Keep-best uploads and max-merge of two tables
//! - Ranked listing for display
//! - Async `HighscoreStore` backends: JSON file and in-memory

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Best score per set of initials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighscoreTable {
    scores: BTreeMap<String, u32>,
}

/// One row of a ranked listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreEntry {
    /// 1-indexed rank.
    pub rank: u32,
    pub initials: String,
    pub score: u32,
}

impl HighscoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `score` under `initials` if it beats the stored one.
    /// Returns whether the table changed.
    pub fn record(&mut self, initials: &str, score: u32) -> bool {
        match self.scores.get_mut(initials) {
            Some(best) if *best >= score => false,
            Some(best) => {
                *best = score;
                true
            }
            None => {
                self.scores.insert(initials.to_string(), score);
                true
            }
        }
    }

    pub fn get(&self, initials: &str) -> Option<u32> {
        self.scores.get(initials).copied()
    }

    /// Folds another table in, keeping the maximum per initials.
    /// Returns whether anything changed.
    pub fn merge(&mut self, other: &HighscoreTable) -> bool {
        let mut changed = false;
        for (initials, score) in &other.scores {
            changed |= self.record(initials, *score);
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Entries in initials order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries sorted by descending score, ties broken by initials.
    pub fn ranked(&self) -> Vec<HighscoreEntry> {
        let mut rows: Vec<_> = self.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows.into_iter()
            .enumerate()
            .map(|(i, (initials, score))| HighscoreEntry {
                rank: (i + 1) as u32,
                initials: initials.to_string(),
                score,
            })
            .collect()
    }
}

/// Where highscores persist between sessions.
#[async_trait]
pub trait HighscoreStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<HighscoreTable>;
    async fn save(&self, table: &HighscoreTable) -> anyhow::Result<()>;
}

/// Current on-disk format version.
pub const HIGHSCORE_FORMAT_VERSION: u32 = 1;

/// On-disk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HighscoreFile {
    version: u32,
    saved_at: DateTime<Utc>,
    scores: HighscoreTable,
}

/// JSON file backend. A missing file loads as an empty table.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HighscoreStore for JsonFileStore {
    async fn load(&self) -> anyhow::Result<HighscoreTable> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No highscore file yet");
                return Ok(HighscoreTable::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read highscores {}", self.path.display()))
            }
        };
        let file: HighscoreFile =
            serde_json::from_slice(&bytes).context("deserialize highscores")?;
        if file.version > HIGHSCORE_FORMAT_VERSION {
            anyhow::bail!(
                "highscore file version {} is newer than supported {}",
                file.version,
                HIGHSCORE_FORMAT_VERSION
            );
        }
        Ok(file.scores)
    }

    async fn save(&self, table: &HighscoreTable) -> anyhow::Result<()> {
        let file = HighscoreFile {
            version: HIGHSCORE_FORMAT_VERSION,
            saved_at: Utc::now(),
            scores: table.clone(),
        };
        let payload = serde_json::to_vec_pretty(&file).context("serialize highscores")?;
        // Write-then-rename; readers never observe a partial file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &payload)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("rename into {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<HighscoreTable>,
    saves: Mutex<u32>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new(initial: HighscoreTable) -> Self {
        Self {
            table: Mutex::new(initial),
            saves: Mutex::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// A store whose every operation errors.
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    /// Switches failure on or off for later operations.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> HighscoreTable {
        self.table.lock().await.clone()
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> u32 {
        *self.saves.lock().await
    }
}

#[async_trait]
impl HighscoreStore for MemoryStore {
    async fn load(&self) -> anyhow::Result<HighscoreTable> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("memory store configured to fail");
        }
        Ok(self.table.lock().await.clone())
    }

    async fn save(&self, table: &HighscoreTable) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("memory store configured to fail");
        }
        *self.table.lock().await = table.clone();
        *self.saves.lock().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_best() {
        let mut t = HighscoreTable::new();
        assert!(t.record("AB", 3));
        assert!(!t.record("AB", 2));
        assert!(!t.record("AB", 3));
        assert!(t.record("AB", 7));
        assert_eq!(t.get("AB"), Some(7));
    }

    #[test]
    fn merge_takes_max_per_initials() {
        let mut a = HighscoreTable::new();
        a.record("AB", 10);
        a.record("CD", 1);
        let mut b = HighscoreTable::new();
        b.record("AB", 4);
        b.record("CD", 9);
        b.record("EF", 2);
        assert!(a.merge(&b));
        assert_eq!(a.get("AB"), Some(10));
        assert_eq!(a.get("CD"), Some(9));
        assert_eq!(a.get("EF"), Some(2));
        assert!(!a.merge(&b));
    }

    #[test]
    fn ranked_orders_by_score_then_initials() {
        let mut t = HighscoreTable::new();
        t.record("ZZ", 5);
        t.record("AA", 5);
        t.record("MM", 9);
        let ranked = t.ranked();
        let order: Vec<_> = ranked.iter().map(|e| e.initials.as_str()).collect();
        assert_eq!(order, vec!["MM", "AA", "ZZ"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[tokio::test]
    async fn json_store_roundtrips_and_tolerates_missing_file() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("blaster-hs-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await?;
        let store = JsonFileStore::new(dir.join("scores.json"));

        assert!(store.load().await?.is_empty());

        let mut t = HighscoreTable::new();
        t.record("AB", 12);
        store.save(&t).await?;
        assert_eq!(store.load().await?, t);

        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    #[tokio::test]
    async fn failing_store_errors() {
        let store = MemoryStore::failing();
        assert!(store.load().await.is_err());
        assert!(store.save(&HighscoreTable::new()).await.is_err());
        store.set_failing(false);
        assert!(store.save(&HighscoreTable::new()).await.is_ok());
        assert_eq!(store.save_count().await, 1);
    }
}
