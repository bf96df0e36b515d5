//! Per-URL orchestration: fetch, extract, merge, store.
//!
//! Each URL runs through a small state machine. Fetch failures are retried
//! with a fixed wait and then abandoned without touching the store; a store
//! failure is the only error a run hands back to its caller.

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::db::{CaseRecord, CaseStore};
use crate::error::{FetchError, StoreError};
use crate::parser::{self, CaseMetadata, PageExtraction};
use crate::scraper::Fetcher;

static URL_CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"citation/(\[.*?\]\+.*?)(?:\?|$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub wait: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            wait: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    /// Not started, or skipped because the citation is already stored.
    Pending,
    Fetching,
    Extracting,
    Merging,
    Persisted,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CaseRun {
    pub url: String,
    /// URL-derived until the page supplies its own citation.
    pub citation: String,
    pub state: CaseState,
    pub attempts: u32,
}

impl CaseRun {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            citation: citation_from_url(url),
            state: CaseState::Pending,
            attempts: 0,
        }
    }

    fn advance(&mut self, next: CaseState) {
        debug!("{}: {:?} -> {:?}", self.citation, self.state, next);
        self.state = next;
    }
}

/// `.../citation/[2026]+SGHC+21?ref=x` gives `[2026] SGHC 21`; anything else
/// is keyed by the URL itself.
pub fn citation_from_url(url: &str) -> String {
    URL_CITATION_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace('+', " ").trim().to_string())
        .unwrap_or_else(|| url.to_string())
}

/// Final tallies of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub store_errors: usize,
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<CaseStore>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<CaseStore>,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Process one URL. Fetch exhaustion ends in `Failed` with `Ok`; only
    /// store errors are returned.
    ///
    /// The skip check runs before the fetch, so it can only use the citation
    /// derived from the URL. A URL without a `citation/[...]` segment whose
    /// page carries its own citation is stored under the page citation and
    /// fetched again on every run; the upsert keeps the row consistent.
    pub async fn process_case(&self, url: &str, force: bool) -> Result<CaseRun, StoreError> {
        let mut run = CaseRun::new(url);

        if !force && self.store.exists(&run.citation)? {
            info!("Skipping {} - already stored", run.citation);
            return Ok(run);
        }

        info!("Processing case: {}", run.citation);
        run.advance(CaseState::Fetching);
        let Some(html) = self.fetch_with_retry(&mut run).await else {
            error!(
                "Failed to fetch content for {} after {} attempts",
                run.url, run.attempts
            );
            run.advance(CaseState::Failed);
            return Ok(run);
        };

        run.advance(CaseState::Extracting);
        let page = parser::extract_page(&html);
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                "HTML metadata for {}: {}",
                run.citation,
                serde_json::to_string(&page.html).unwrap_or_default()
            );
        }
        info!("Extracted {} characters of judgment text", page.body.chars().count());

        run.advance(CaseState::Merging);
        let record = assemble_record(&run.citation, page);
        run.citation = record.citation.clone();

        if let Err(e) = self.store.upsert(&record) {
            run.advance(CaseState::Failed);
            return Err(e);
        }
        run.advance(CaseState::Persisted);
        info!("Stored {}", run.citation);
        Ok(run)
    }

    /// Up to `attempts` tries, each bounded by the timeout, with a fixed wait
    /// in between. An empty body counts as a failed attempt.
    async fn fetch_with_retry(&self, run: &mut CaseRun) -> Option<String> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            run.attempts = attempt;
            let result =
                match tokio::time::timeout(self.retry.timeout, self.fetcher.fetch(&run.url)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(self.retry.timeout)),
                };
            let result = result.and_then(|body| {
                if body.trim().is_empty() {
                    Err(FetchError::Empty(run.url.clone()))
                } else {
                    Ok(body)
                }
            });

            match result {
                Ok(body) => return Some(body),
                Err(e) => warn!(
                    "Attempt {}/{} failed for {}: {}",
                    attempt, attempts, run.url, e
                ),
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry.wait).await;
            }
        }
        None
    }

    /// Run every URL as its own task, at most `concurrency` at a time.
    /// One URL failing never stops the others.
    pub async fn run_batch(self: Arc<Self>, urls: Vec<String>, force: bool) -> BatchStats {
        let total = urls.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let started = Instant::now();

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let (tx, mut rx) =
            mpsc::channel::<Result<CaseRun, (String, StoreError)>>(self.concurrency * 2);

        let mut tasks = JoinSet::new();
        for url in urls {
            let pipeline = Arc::clone(&self);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();

            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };
                let result = pipeline.process_case(&url, force).await;
                let _ = tx.send(result.map_err(|e| (url, e))).await;
            });
        }

        // rx closes once every task has dropped its sender
        drop(tx);

        let mut stats = BatchStats {
            total,
            ..Default::default()
        };
        while let Some(outcome) = rx.recv().await {
            match outcome {
                Ok(run) => match run.state {
                    CaseState::Persisted => stats.persisted += 1,
                    CaseState::Pending => stats.skipped += 1,
                    _ => stats.failed += 1,
                },
                Err((url, e)) => {
                    error!("Failed to store {}: {}", url, e);
                    stats.store_errors += 1;
                }
            }
            pb.inc(1);
        }

        // a panicked task never sent a result
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Batch task ended without a result: {}", e);
                stats.failed += 1;
                pb.inc(1);
            }
        }

        pb.finish_and_clear();
        info!(
            "Processed {} URLs in {:.1}s ({} stored, {} skipped, {} failed, {} store errors)",
            stats.total,
            started.elapsed().as_secs_f64(),
            stats.persisted,
            stats.skipped,
            stats.failed,
            stats.store_errors
        );
        stats
    }
}

/// Merge both extractions into a record. A citation found on the page wins
/// over the URL-derived one.
fn assemble_record(url_citation: &str, page: PageExtraction) -> CaseRecord {
    let merged = CaseMetadata::merge(page.text, page.html);
    CaseRecord {
        citation: merged
            .citation
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| url_citation.to_string()),
        case_name: merged.case_name,
        plaintiff_name: merged.plaintiff_name,
        defendant_name: merged.defendant_name,
        judge_name: merged.judge_name,
        decision_date: merged.decision_date,
        area_of_law: merged.area_of_law,
        outcome: merged.outcome,
        plaintiff_counsel: merged.plaintiff_counsel,
        defendant_counsel: merged.defendant_counsel,
        raw_judgment_text: page.body,
    }
}

// ── Tests ──
