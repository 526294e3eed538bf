//! JSON-file storage.
//!
//! Layout under the data directory:
//!
//! ```text
//! articles/YYYY-MM-DD.json      one file per corpus day
//! metadata/seen.jsonl           append-only seen-set, one entry per line
//! metadata/last_run.json        accounting of the most recent crawl
//! reports/week-YYYY-MM-DD.json  persisted weekly reports
//! ```
//!
//! Daily files and reports are written whole through a `.tmp` rename, so a
//! crash never leaves a half-written file in place. The seen-set is only
//! ever appended to; a torn trailing line from an interrupted append is
//! skipped on load.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use tw_core::{Admission, Article, ArticleStore, Error, Result, RunSummary, WeeklyReport};

const ARTICLES_DIR: &str = "articles";
const METADATA_DIR: &str = "metadata";
const REPORTS_DIR: &str = "reports";
const SEEN_FILE: &str = "seen.jsonl";
const LAST_RUN_FILE: &str = "last_run.json";

/// One line of `seen.jsonl`.
#[derive(Debug, Serialize, Deserialize)]
struct SeenEntry {
    id: String,
    content_hash: String,
    seen_at: DateTime<Utc>,
}

/// On-disk shape of one corpus day.
#[derive(Debug, Serialize, Deserialize)]
struct DailyFile {
    date: NaiveDate,
    count: usize,
    articles: Vec<Article>,
    saved_at: DateTime<Utc>,
}

/// Persisted report plus the storage-layer timestamp. The report itself
/// stays free of ambient state so regenerating it is reproducible.
#[derive(Debug, Serialize, Deserialize)]
struct ReportFile {
    report: WeeklyReport,
    saved_at: DateTime<Utc>,
}

struct SeenIndex {
    ids: HashSet<String>,
    hashes: HashSet<String>,
}

pub struct JsonStore {
    data_dir: PathBuf,
    seen: RwLock<SeenIndex>,
}

impl JsonStore {
    /// Open a data directory, creating the layout as needed, and load the
    /// seen-set index into memory.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        for sub in [ARTICLES_DIR, METADATA_DIR, REPORTS_DIR] {
            tokio::fs::create_dir_all(data_dir.join(sub))
                .await
                .map_err(|e| storage_err("creating", &data_dir.join(sub), e))?;
        }
        let seen_path = data_dir.join(METADATA_DIR).join(SEEN_FILE);
        let seen = load_seen_index(&seen_path).await?;
        info!(
            dir = %data_dir.display(),
            seen = seen.ids.len(),
            "opened json store"
        );
        Ok(Self {
            data_dir,
            seen: RwLock::new(seen),
        })
    }

    fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(ARTICLES_DIR).join(format!("{date}.json"))
    }

    fn seen_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_DIR).join(SEEN_FILE)
    }

    fn report_path(&self, window_start: NaiveDate) -> PathBuf {
        self.data_dir
            .join(REPORTS_DIR)
            .join(format!("week-{window_start}.json"))
    }

    /// Delete corpus and report files dated before `today - retention_days`.
    /// `0` disables cleanup. The seen-set is never cleaned, so articles that
    /// age out stay rejected if they ever resurface.
    pub async fn cleanup_older_than(&self, retention_days: u32, today: NaiveDate) -> Result<usize> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = today - chrono::Duration::days(i64::from(retention_days));
        let mut removed = 0usize;
        for (dir, prefix) in [(ARTICLES_DIR, ""), (REPORTS_DIR, "week-")] {
            let dir = self.data_dir.join(dir);
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| storage_err("listing", &dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| storage_err("listing", &dir, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let Some(date_part) = name
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(".json"))
                else {
                    continue;
                };
                let Ok(date) = date_part.parse::<NaiveDate>() else {
                    continue;
                };
                if date < cutoff {
                    tokio::fs::remove_file(entry.path())
                        .await
                        .map_err(|e| storage_err("removing", &entry.path(), e))?;
                    debug!(file = %name, "removed expired file");
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            info!(removed, %cutoff, "retention cleanup finished");
        }
        Ok(removed)
    }
}

#[async_trait]
impl ArticleStore for JsonStore {
    async fn persist_article(&self, article: &Article) -> Result<()> {
        let path = self.daily_path(article.discovered_date);
        let mut daily = read_daily(&path).await?.unwrap_or_else(|| DailyFile {
            date: article.discovered_date,
            count: 0,
            articles: Vec::new(),
            saved_at: Utc::now(),
        });
        // The gate keeps ids unique across runs; a repeat here is a
        // re-persist of the same article, keep the newest version.
        daily.articles.retain(|existing| existing.id != article.id);
        daily.articles.push(article.clone());
        daily.count = daily.articles.len();
        daily.saved_at = Utc::now();

        let bytes = serde_json::to_vec_pretty(&daily)?;
        write_atomic(&path, &bytes).await
    }

    async fn load_articles(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Article>> {
        let mut all = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            if let Some(daily) = read_daily(&self.daily_path(date)).await? {
                all.extend(daily.articles);
            }
        }
        Ok(all)
    }

    async fn is_seen(&self, id: &str) -> Result<bool> {
        Ok(self.seen.read().await.ids.contains(id))
    }

    async fn mark_seen(&self, id: &str, content_hash: &str) -> Result<Admission> {
        // One write lock spans the check, the append and the index insert.
        let mut seen = self.seen.write().await;
        if seen.ids.contains(id) {
            return Ok(Admission::DuplicateId);
        }
        if seen.hashes.contains(content_hash) {
            return Ok(Admission::DuplicateContent);
        }

        let entry = SeenEntry {
            id: id.to_string(),
            content_hash: content_hash.to_string(),
            seen_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        let path = self.seen_path();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| storage_err("opening", &path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| storage_err("appending to", &path, e))?;
        file.flush()
            .await
            .map_err(|e| storage_err("flushing", &path, e))?;

        // Index only after the line is durable; a failed append stays
        // retryable instead of admitting on memory alone.
        seen.ids.insert(entry.id);
        seen.hashes.insert(entry.content_hash);
        Ok(Admission::Accepted)
    }

    async fn save_run_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = self.data_dir.join(METADATA_DIR).join(LAST_RUN_FILE);
        let bytes = serde_json::to_vec_pretty(summary)?;
        write_atomic(&path, &bytes).await
    }

    async fn save_report(&self, report: &WeeklyReport) -> Result<()> {
        let path = self.report_path(report.window_start);
        let file = ReportFile {
            report: report.clone(),
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        write_atomic(&path, &bytes).await
    }
}

fn storage_err(action: &str, path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{action} {}: {err}", path.display()))
}

async fn read_daily(path: &Path) -> Result<Option<DailyFile>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(storage_err("reading", path, err)),
    };
    let daily = serde_json::from_str(&content).map_err(|e| storage_err("parsing", path, e))?;
    Ok(Some(daily))
}

/// Write a whole file through a temporary sibling and a rename, so readers
/// never observe a partial file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| storage_err("writing", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_err("renaming", &tmp, e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn load_seen_index(path: &Path) -> Result<SeenIndex> {
    let mut index = SeenIndex {
        ids: HashSet::new(),
        hashes: HashSet::new(),
    };
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(index),
        Err(err) => return Err(storage_err("reading", path, err)),
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SeenEntry>(line) {
            Ok(entry) => {
                index.ids.insert(entry.id);
                index.hashes.insert(entry.content_hash);
            }
            // An interrupted append can leave a torn trailing line; skip it
            // rather than refusing to open the store.
            Err(err) => warn!(error = %err, "skipping unreadable seen-set line"),
        }
    }
    Ok(index)
}
