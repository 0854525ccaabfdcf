//! Revision history: groups field-level audit records into numbered revisions

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{PodashError, Result};
use crate::model::ChangeRecord;

/// Edits made by one actor within the same calendar minute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    /// Highest for the most recent revision
    pub number: usize,
    pub changed_by: String,
    pub minute: DateTime<Utc>,
    pub changes: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionPage {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_revisions: usize,
    pub revisions: Vec<Revision>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HistoryView {
    /// No history recorded for the batch
    Empty,
    Page(RevisionPage),
}

fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Newest revision first. Records inside a revision keep newest-first order.
pub fn group_revisions(mut records: Vec<ChangeRecord>) -> Vec<Revision> {
    records.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));

    let mut revisions: Vec<Revision> = Vec::new();
    let mut index: HashMap<(DateTime<Utc>, String), usize> = HashMap::new();

    for record in records {
        let key = (truncate_to_minute(record.changed_at), record.changed_by.clone());
        match index.get(&key) {
            Some(&i) => revisions[i].changes.push(record),
            None => {
                index.insert(key.clone(), revisions.len());
                revisions.push(Revision {
                    number: 0,
                    changed_by: key.1,
                    minute: key.0,
                    changes: vec![record],
                });
            }
        }
    }

    let total = revisions.len();
    for (i, revision) in revisions.iter_mut().enumerate() {
        revision.number = total - i;
    }
    revisions
}

/// Slice grouped revisions into 1-based pages
pub fn paginate(revisions: Vec<Revision>, page: usize, page_size: usize) -> Result<HistoryView> {
    if revisions.is_empty() {
        return Ok(HistoryView::Empty);
    }

    let page_size = page_size.max(1);
    let total_revisions = revisions.len();
    let total_pages = total_revisions.div_ceil(page_size);
    if page == 0 || page > total_pages {
        return Err(PodashError::InvalidPage {
            page,
            total: total_pages,
        });
    }

    let revisions = revisions
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(HistoryView::Page(RevisionPage {
        page,
        page_size,
        total_pages,
        total_revisions,
        revisions,
    }))
}
