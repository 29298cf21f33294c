//! Inventory reconciliation: compares the remote page-image list against the
//! three storage mirrors and classifies the item.

use std::collections::HashSet;

use crate::record::{AuditRecord, AuditStatus};

/// Comparison key for a filename: everything before the first `.`.
///
/// `page_001.jp2` and `page_001.jpg` compare equal; `a.b.c.txt` reduces to `a`.
pub fn basename(filename: &str) -> &str {
    filename.split('.').next().unwrap_or(filename)
}

pub fn basenames(filenames: &[String]) -> Vec<&str> {
    filenames.iter().map(|f| basename(f)).collect()
}

/// Entries of `left` whose value does not occur anywhere in `right`.
///
/// Order and duplicates of `left` are kept; a single match in `right`
/// removes every equal entry from `left`.
pub fn list_difference(left: &[&str], right: &[&str]) -> Vec<String> {
    let exclude: HashSet<&str> = right.iter().copied().collect();
    left.iter()
        .filter(|name| !exclude.contains(*name))
        .map(|name| name.to_string())
        .collect()
}

/// Derive the status from the current inventories and gaps.
fn classify(record: &AuditRecord) -> AuditStatus {
    if record.ia_files().is_empty() {
        AuditStatus::NoFilesFound
    } else if !record.missing_files().is_empty()
        || !record.missing_ocr().is_empty()
        || !record.missing_thumbnails().is_empty()
    {
        AuditStatus::Warn
    } else {
        AuditStatus::Ok
    }
}

/// Recompute the missing-file lists and the status of `record` in place.
///
/// Missing lists are derived only from the current `ia_files` and `s3_*`
/// fields. A sticky connection error already on the record is kept.
pub fn reconcile(record: &mut AuditRecord) {
    let expected = basenames(record.ia_files());
    let missing_files = list_difference(&expected, &basenames(record.s3_files()));
    let missing_ocr = list_difference(&expected, &basenames(record.s3_ocr()));
    let missing_thumbnails = list_difference(&expected, &basenames(record.s3_thumbnails()));

    record.missing_files = Some(missing_files);
    record.missing_ocr = Some(missing_ocr);
    record.missing_thumbnails = Some(missing_thumbnails);

    if record.status_is_sticky() {
        return;
    }
    record.status = Some(classify(record));
}
