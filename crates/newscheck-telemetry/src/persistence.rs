//! Prediction log persistence
//!
//! Every served prediction is appended to a JSON-lines file with a single
//! unbuffered write. A failed write is rolled back so the file never holds a
//! record the in-memory summary lacks. Opening an existing log replays it so
//! the label summary survives restarts.

use crate::metrics::{LabelStats, MetricsSummary};
use chrono::{DateTime, Utc};
use newscheck_core::{InputSource, PredictionResult, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Characters of raw text kept in `source_value`
pub const SOURCE_TEXT_PREVIEW_CHARS: usize = 280;

/// One logged prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub source: InputSource,

    /// The URL, or a prefix of the submitted text
    pub source_value: String,

    pub label: String,
    pub score: f64,

    #[serde(default)]
    pub abstain: bool,

    #[serde(default)]
    pub pattern: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Build a record for a prediction over text read from `source`
    pub fn new(source: InputSource, url: Option<&str>, text: &str, result: &PredictionResult) -> Self {
        let source_value = match (source, url) {
            (InputSource::Url, Some(url)) => url.to_string(),
            _ => text.chars().take(SOURCE_TEXT_PREVIEW_CHARS).collect(),
        };

        Self {
            id: generate_record_id(),
            source,
            source_value,
            label: result.label.clone(),
            score: result.score,
            abstain: result.abstain,
            pattern: result.pattern.clone(),
            created_at: Utc::now(),
        }
    }
}

fn generate_record_id() -> String {
    format!("pred_{}", uuid::Uuid::new_v4())
}

struct LogState {
    file: File,
    stats: LabelStats,
}

/// Append-only prediction log with an in-memory label summary
pub struct PredictionLog {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl std::fmt::Debug for PredictionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionLog").field("path", &self.path).finish()
    }
}

impl PredictionLog {
    /// Open (or create) the log at `path`, replaying existing records
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let stats = if path.exists() {
            replay(&path)?
        } else {
            LabelStats::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Prediction log at {:?} ({} records)", path, stats.total());

        Ok(Self {
            path,
            state: Mutex::new(LogState {
                file,
                stats,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record; on failure neither the file nor the summary changes
    pub fn append(&self, record: &PredictionRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut guard = self.state.lock();
        let LogState { file, stats } = &mut *guard;

        let committed = file.metadata()?.len();
        if let Err(e) = file.write_all(&line) {
            // drop any partial line
            if let Err(rollback) = file.set_len(committed) {
                warn!("Failed to roll back prediction log {:?}: {}", self.path, rollback);
            }
            return Err(e.into());
        }
        stats.record(&record.label, record.score);

        debug!(id = %record.id, label = %record.label, "Logged prediction");
        Ok(())
    }

    /// Totals over every record in the log
    pub fn summary(&self) -> MetricsSummary {
        self.state.lock().stats.summary()
    }
}

fn replay(path: &Path) -> Result<LabelStats> {
    let reader = BufReader::new(File::open(path)?);
    let mut stats = LabelStats::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PredictionRecord>(&line) {
            Ok(record) => stats.record(&record.label, record.score),
            Err(e) => warn!("Skipping malformed prediction log line {}: {}", line_no + 1, e),
        }
    }

    Ok(stats)
}
