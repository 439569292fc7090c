//! Usage tracking and frecency scoring.
//!
//! Every launch is recorded against the item's name and persisted
//! immediately; launches are low-frequency human events, so write-through
//! costs nothing and survives crashes. Scores blend three signals:
//!
//! ```text
//! score = 0.4 * frequency + 0.4 * recency + 0.2 * trend
//! ```
//!
//! where `frequency` is the raw launch count, `recency` decays with a 7-day
//! half-life scaled to 0-100, and `trend` estimates launches/day from the
//! last ten launch timestamps, capped at 10/day and scaled to 0-100.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics;

/// Maximum launch timestamps kept per record.
const RECENT_RING_CAP: usize = 10;

/// Recency half-life in hours (7 days).
const HALF_LIFE_HOURS: f64 = 168.0;

/// Trend saturates at this many launches per day.
const TREND_CAP_PER_DAY: f64 = 10.0;

const WEIGHT_FREQUENCY: f64 = 0.4;
const WEIGHT_RECENCY: f64 = 0.4;
const WEIGHT_TREND: f64 = 0.2;

/// Launch history for one item name.
///
/// Serialized as `{launch_count, first_launched, last_launched,
/// recent_launches}` with ISO-8601 timestamps; `recent_launches` is a ring
/// of up to ten Unix-second timestamps, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub launch_count: u64,
    pub first_launched: DateTime<Utc>,
    pub last_launched: DateTime<Utc>,
    #[serde(default)]
    pub recent_launches: VecDeque<i64>,
}

impl UsageRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            launch_count: 0,
            first_launched: now,
            last_launched: now,
            recent_launches: VecDeque::new(),
        }
    }
}

/// Compute the frecency score for a record as of `now`.
pub fn score_record(record: &UsageRecord, now: DateTime<Utc>) -> f64 {
    let frequency = record.launch_count as f64;

    let hours_since_last = (now - record.last_launched).num_seconds().max(0) as f64 / 3600.0;
    let recency = 100.0 * 0.5_f64.powf(hours_since_last / HALF_LIFE_HOURS);

    let trend = trend_score(&record.recent_launches);

    WEIGHT_FREQUENCY * frequency + WEIGHT_RECENCY * recency + WEIGHT_TREND * trend
}

/// Estimate launches/day from the average inter-launch interval in the ring.
fn trend_score(recent: &VecDeque<i64>) -> f64 {
    if recent.len() < 2 {
        return 0.0;
    }
    let (Some(first), Some(last)) = (recent.front(), recent.back()) else {
        return 0.0;
    };

    let span_secs = (last - first).max(0) as f64;
    let intervals = (recent.len() - 1) as f64;
    let avg_interval_secs = span_secs / intervals;

    // All launches within the same second saturate the trend.
    let per_day = if avg_interval_secs <= 0.0 {
        TREND_CAP_PER_DAY
    } else {
        (86_400.0 / avg_interval_secs).min(TREND_CAP_PER_DAY)
    };

    per_day * (100.0 / TREND_CAP_PER_DAY)
}

/// Persistent per-name launch history with frecency scoring.
///
/// The table lives behind a single reader/writer lock; lookups run
/// concurrently, mutations serialize. Disk writes happen outside the lock.
pub struct UsageTracker {
    path: PathBuf,
    records: RwLock<HashMap<String, UsageRecord>>,
}

impl UsageTracker {
    /// Load the usage table from `path`.
    ///
    /// A missing file starts an empty table; an unreadable or unparseable
    /// file is logged and also starts empty rather than failing startup.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Failed to parse usage history {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to read usage history {:?}: {}", path, e);
                HashMap::new()
            }
        };

        debug!("Loaded {} usage records from {:?}", records.len(), path);
        Self {
            path,
            records: RwLock::new(records),
        }
    }

    fn records(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, UsageRecord>> {
        self.records.read().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - stale usage data is
            // preferable to a dead tracker
            poisoned.into_inner()
        })
    }

    fn records_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, UsageRecord>> {
        self.records.write().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - stale usage data is
            // preferable to a dead tracker
            poisoned.into_inner()
        })
    }

    /// Record one launch of `name` and persist the table.
    ///
    /// Persistence failures are logged; the in-memory table stays
    /// authoritative and the next successful write recovers durability.
    pub fn record_launch(&self, name: &str) {
        let now = Utc::now();
        let snapshot = {
            let mut records = self.records_mut();
            let record = records
                .entry(name.to_string())
                .or_insert_with(|| UsageRecord::new(now));

            record.launch_count += 1;
            record.last_launched = now;
            record.recent_launches.push_back(now.timestamp());
            while record.recent_launches.len() > RECENT_RING_CAP {
                record.recent_launches.pop_front();
            }

            records.clone()
        };

        metrics::LAUNCHES_RECORDED.inc();
        debug!("Recorded launch of '{}'", name);

        if let Err(e) = persist(&self.path, &snapshot) {
            warn!("Failed to persist usage history: {:#}", e);
        }
    }

    /// Frecency score for `name` as of now; 0.0 for unknown names.
    pub fn score(&self, name: &str) -> f64 {
        let now = Utc::now();
        self.records()
            .get(name)
            .map(|record| score_record(record, now))
            .unwrap_or(0.0)
    }

    /// The `limit` highest-scoring names, descending.
    pub fn top(&self, limit: usize) -> Vec<(String, f64)> {
        let now = Utc::now();
        let mut scored: Vec<(String, f64)> = self
            .records()
            .iter()
            .map(|(name, record)| (name.clone(), score_record(record, now)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    /// Look up the record for `name`.
    pub fn get(&self, name: &str) -> Option<UsageRecord> {
        self.records().get(name).cloned()
    }

    /// Remove one name from the table; returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let (removed, snapshot) = {
            let mut records = self.records_mut();
            let removed = records.remove(name).is_some();
            (removed, records.clone())
        };

        if removed {
            if let Err(e) = persist(&self.path, &snapshot) {
                warn!("Failed to persist usage history: {:#}", e);
            }
        }
        removed
    }

    /// Drop the whole table.
    pub fn clear(&self) {
        self.records_mut().clear();
        if let Err(e) = persist(&self.path, &HashMap::new()) {
            warn!("Failed to persist usage history: {:#}", e);
        }
    }

    /// Persist the current table; used at shutdown.
    pub fn flush(&self) -> Result<()> {
        let snapshot = self.records().clone();
        persist(&self.path, &snapshot)
    }

    /// Number of tracked names.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Write the table as pretty JSON using a temp file + rename.
fn persist(path: &Path, records: &HashMap<String, UsageRecord>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }

    let content =
        serde_json::to_string_pretty(records).with_context(|| "Failed to serialize usage history")?;

    let temp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;

    file.write_all(content.as_bytes())
        .with_context(|| "Failed to write usage history content")?;

    file.sync_all()
        .with_context(|| "Failed to sync usage history file")?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to {:?}", path))?;

    debug!("Saved {} usage records to {:?}", records.len(), path);
    Ok(())
}
