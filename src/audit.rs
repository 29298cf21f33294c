//! Batch orchestrator: walks the audit set in input order and refreshes each
//! record from the remote archive and the storage mirrors.

use std::io::IsTerminal;
use std::path::Path;

use chrono::{DateTime, Local, TimeDelta};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::archive::{self, ArchiveService, ListingClient};
use crate::reconcile::reconcile;
use crate::record::{AuditRecord, AuditSet, AuditStatus};
use crate::retry::RetryConfig;
use crate::storage::{self, ObjectLister, StorageError};
use crate::store;
use crate::types::Category;

/// Subset of application config consumed by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    /// Skip records checked within this window; `None` audits everything.
    pub skip_recent: Option<TimeDelta>,
    pub retry: RetryConfig,
    pub no_progress_bar: bool,
}

/// Tally of one pass over the audit set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditSummary {
    pub processed: usize,
    pub skipped: usize,
    pub ok: usize,
    pub warn: usize,
    pub errors: usize,
    pub interrupted: bool,
}

impl AuditSummary {
    fn count(&mut self, status: Option<&AuditStatus>) {
        self.processed += 1;
        match status {
            Some(AuditStatus::Ok) => self.ok += 1,
            Some(AuditStatus::Warn) => self.warn += 1,
            Some(s) if s.is_error() => self.errors += 1,
            _ => {}
        }
    }
}

/// Returns `ProgressBar::hidden()` when `--no-progress-bar` was passed or
/// stdout is not a TTY.
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% Processed: {pos} from {len} ({eta})",
        )
        .expect("valid template")
        .progress_chars("=> "),
    );
    pb
}

/// Runs the audit over an [`AuditSet`] using the given collaborators.
pub struct Auditor<'a> {
    archive: &'a dyn ArchiveService,
    listing: &'a dyn ListingClient,
    storage: &'a dyn ObjectLister,
    config: &'a AuditConfig,
}

impl<'a> Auditor<'a> {
    pub fn new(
        archive: &'a dyn ArchiveService,
        listing: &'a dyn ListingClient,
        storage: &'a dyn ObjectLister,
        config: &'a AuditConfig,
    ) -> Self {
        Self {
            archive,
            listing,
            storage,
            config,
        }
    }

    fn should_skip(&self, item_id: &str, record: &AuditRecord, now: DateTime<Local>) -> bool {
        let Some(window) = self.config.skip_recent else {
            return false;
        };
        let Some(raw) = record.last_checked.as_deref() else {
            return false;
        };
        if record.last_checked_at().is_none() {
            tracing::warn!("{} -- Unparseable last_checked {:?}, auditing anyway", item_id, raw);
            return false;
        }
        if record.checked_within(now, window) {
            tracing::debug!(
                "{} -- Skipped due to --skip-recent flag (last checked {})",
                item_id,
                raw
            );
            return true;
        }
        false
    }

    /// Refresh one record: remote inventory (unless cached), all three
    /// storage inventories, then the gaps and status.
    ///
    /// Remote failures end up in the record's status. Storage failures are
    /// returned.
    pub async fn process_item(
        &self,
        item_id: &str,
        record: &mut AuditRecord,
        now: DateTime<Local>,
    ) -> Result<(), StorageError> {
        record.mark_checked(now);

        if !record.has_remote_inventory() {
            let files = archive::fetch_remote_filenames(
                self.archive,
                self.listing,
                &self.config.retry,
                item_id,
                record,
            )
            .await;
            record.ia_files = Some(files);
        }

        for category in Category::ALL {
            let names = storage::fetch_storage_filenames(self.storage, item_id, category).await?;
            match category {
                Category::Downloads => record.s3_files = Some(names),
                Category::Ocr => record.s3_ocr = Some(names),
                Category::Thumbnails => record.s3_thumbnails = Some(names),
            }
        }

        reconcile(record);

        let status = record.status.as_ref().map(AuditStatus::as_str).unwrap_or_default();
        tracing::info!("{} -- {}", item_id, status);
        Ok(())
    }

    /// Audit every record of `set` in order.
    ///
    /// Stops early, with `interrupted` set, once `shutdown` is cancelled. The
    /// caller owns persistence and must save `set` whatever this returns.
    pub async fn run(
        &self,
        set: &mut AuditSet,
        shutdown: &CancellationToken,
    ) -> anyhow::Result<AuditSummary> {
        let pb = create_progress_bar(self.config.no_progress_bar, set.len() as u64);
        let mut summary = AuditSummary::default();

        for (item_id, record) in set.iter_mut() {
            pb.inc(1);
            if shutdown.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let now = Local::now();
            if self.should_skip(item_id, record, now) {
                summary.skipped += 1;
                continue;
            }

            tokio::select! {
                result = self.process_item(item_id, &mut *record, now) => result?,
                _ = shutdown.cancelled() => {
                    tracing::warn!("{} -- Interrupted before completion", item_id);
                    summary.interrupted = true;
                    break;
                }
            }
            summary.count(record.status.as_ref());
        }

        pb.finish_and_clear();
        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            ok = summary.ok,
            warn = summary.warn,
            errors = summary.errors,
            interrupted = summary.interrupted,
            "Audit pass finished"
        );
        Ok(summary)
    }
}

/// Run one pass over `set`, then back up and overwrite the audit file at
/// `path` whatever the pass returned.
///
/// An interrupted pass is an error once its partial progress is saved.
pub async fn run_and_save(
    auditor: &Auditor<'_>,
    path: &Path,
    set: &mut AuditSet,
    shutdown: &CancellationToken,
) -> anyhow::Result<AuditSummary> {
    let outcome = auditor.run(set, shutdown).await;
    let saved = store::finalize(path, set);

    match (outcome, saved) {
        (Ok(summary), Ok(_)) => {
            if summary.interrupted {
                anyhow::bail!("Audit interrupted; partial progress saved");
            }
            Ok(summary)
        }
        (Err(e), Ok(_)) => Err(e.context("Audit aborted; partial progress saved")),
        (Ok(_), Err(save_err)) => Err(save_err.into()),
        (Err(e), Err(save_err)) => {
            tracing::error!("Failed to save audit data: {}", save_err);
            Err(e.context(format!("Audit aborted and saving failed: {save_err}")))
        }
    }
}
