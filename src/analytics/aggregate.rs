//! Aggregation stage: pure functions from enriched orders to dashboard views.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::Clock;
use crate::model::{EnrichedOrder, InwardStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateOptions {
    /// Vendors kept after sorting by value, `None` keeps all
    pub top_vendors: Option<usize>,
    pub top_projects: Option<usize>,
    /// Number of trailing calendar months in the trend, including the current one
    pub trend_months: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_vendors: Some(10),
            top_projects: None,
            trend_months: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatusTotals {
    pub total_pos: usize,
    pub total_value: f64,
    pub open_pos: usize,
    pub open_value: f64,
    pub partially_inwarded_pos: usize,
    pub partially_inwarded_value: f64,
    pub completed_pos: usize,
    pub completed_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBucket {
    pub status: InwardStatus,
    pub count: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorAnalytics {
    pub vendor_name: String,
    pub total_pos: usize,
    pub total_value: f64,
    pub completed_pos: usize,
    pub completion_rate: f64,
    pub avg_turnaround_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectAnalytics {
    pub project_code: String,
    pub total_pos: usize,
    pub total_value: f64,
    pub completed_pos: usize,
    pub completion_rate: f64,
    pub avg_po_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// "Mon YYYY", e.g. "Jan 2024"
    pub month: String,
    pub total_pos: usize,
    pub total_value: f64,
    pub completed_pos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub status_totals: StatusTotals,
    pub status_distribution: Vec<StatusBucket>,
    pub vendors: Vec<VendorAnalytics>,
    pub projects: Vec<ProjectAnalytics>,
    pub monthly_trend: Vec<MonthlyTrend>,
}

/// `part / whole * 100`, or 0 for an empty group
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn status_totals(orders: &[EnrichedOrder]) -> StatusTotals {
    let mut totals = StatusTotals::default();
    for po in orders {
        let amount = po.order.total_amount;
        totals.total_pos += 1;
        totals.total_value += amount;
        match po.inward_status {
            InwardStatus::Open => {
                totals.open_pos += 1;
                totals.open_value += amount;
            }
            InwardStatus::PartiallyInwarded => {
                totals.partially_inwarded_pos += 1;
                totals.partially_inwarded_value += amount;
            }
            InwardStatus::Completed => {
                totals.completed_pos += 1;
                totals.completed_value += amount;
            }
        }
    }
    totals
}

/// One bucket per inward status, in `InwardStatus::ALL` order
pub fn status_distribution(orders: &[EnrichedOrder]) -> Vec<StatusBucket> {
    let mut buckets: Vec<StatusBucket> = InwardStatus::ALL
        .iter()
        .map(|&status| StatusBucket {
            status,
            count: 0,
            value: 0.0,
        })
        .collect();

    for po in orders {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.status == po.inward_status) {
            bucket.count += 1;
            bucket.value += po.order.total_amount;
        }
    }
    buckets
}

#[derive(Default)]
struct GroupAccumulator {
    total_pos: usize,
    total_value: f64,
    completed_pos: usize,
    turnaround_days: Vec<f64>,
}

fn group_by<F>(
    orders: &[EnrichedOrder],
    key: F,
    clock: &dyn Clock,
) -> BTreeMap<String, GroupAccumulator>
where
    F: Fn(&EnrichedOrder) -> &str,
{
    let now = clock.now();
    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();

    for po in orders {
        let acc = groups.entry(key(po).to_string()).or_default();
        acc.total_pos += 1;
        acc.total_value += po.order.total_amount;
        if po.is_completed() {
            acc.completed_pos += 1;
            // turnaround runs from approval to now
            if let Some(approved_at) = po.order.approval_date {
                let days = (now - approved_at).num_days().max(0);
                acc.turnaround_days.push(days as f64);
            }
        }
    }
    groups
}

/// Sort by value descending; keys break ties since groups arrive key-ordered
fn sort_and_truncate<T, F>(mut rows: Vec<T>, value: F, limit: Option<usize>) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| value(b).total_cmp(&value(a)));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

pub fn vendor_analytics(
    orders: &[EnrichedOrder],
    clock: &dyn Clock,
    limit: Option<usize>,
) -> Vec<VendorAnalytics> {
    let rows = group_by(orders, |po| po.order.vendor_name.as_str(), clock)
        .into_iter()
        .map(|(vendor_name, acc)| VendorAnalytics {
            vendor_name,
            total_pos: acc.total_pos,
            total_value: acc.total_value,
            completed_pos: acc.completed_pos,
            completion_rate: percentage(acc.completed_pos, acc.total_pos),
            avg_turnaround_days: mean(&acc.turnaround_days),
        })
        .collect();
    sort_and_truncate(rows, |v: &VendorAnalytics| v.total_value, limit)
}

pub fn project_analytics(
    orders: &[EnrichedOrder],
    clock: &dyn Clock,
    limit: Option<usize>,
) -> Vec<ProjectAnalytics> {
    let rows = group_by(orders, |po| po.order.project_code.as_str(), clock)
        .into_iter()
        .map(|(project_code, acc)| ProjectAnalytics {
            project_code,
            total_pos: acc.total_pos,
            total_value: acc.total_value,
            completed_pos: acc.completed_pos,
            completion_rate: percentage(acc.completed_pos, acc.total_pos),
            avg_po_value: if acc.total_pos == 0 {
                0.0
            } else {
                acc.total_value / acc.total_pos as f64
            },
        })
        .collect();
    sort_and_truncate(rows, |p: &ProjectAnalytics| p.total_value, limit)
}

pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// Labels for the trailing `months` calendar months, oldest first
pub fn trailing_months(today: NaiveDate, months: usize) -> Vec<String> {
    let Some(first_of_month) = today.with_day(1) else {
        return Vec::new();
    };
    (0..months)
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back as u32)))
        .map(month_label)
        .collect()
}

/// Pre-seeded trend buckets; orders outside the window are dropped
pub fn monthly_trend(
    orders: &[EnrichedOrder],
    clock: &dyn Clock,
    months: usize,
) -> Vec<MonthlyTrend> {
    let mut trend: Vec<MonthlyTrend> = trailing_months(clock.today(), months)
        .into_iter()
        .map(|month| MonthlyTrend {
            month,
            total_pos: 0,
            total_value: 0.0,
            completed_pos: 0,
        })
        .collect();

    let index: HashMap<String, usize> = trend
        .iter()
        .enumerate()
        .map(|(i, bucket)| (bucket.month.clone(), i))
        .collect();

    let mut dropped = 0usize;
    for po in orders {
        match index.get(&month_label(po.order.po_date)) {
            Some(&i) => {
                let bucket = &mut trend[i];
                bucket.total_pos += 1;
                bucket.total_value += po.order.total_amount;
                if po.is_completed() {
                    bucket.completed_pos += 1;
                }
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, months, "orders outside the trend window");
    }
    trend
}

pub fn aggregate(
    orders: &[EnrichedOrder],
    options: &AggregateOptions,
    clock: &dyn Clock,
) -> DashboardSummary {
    let summary = DashboardSummary {
        status_totals: status_totals(orders),
        status_distribution: status_distribution(orders),
        vendors: vendor_analytics(orders, clock, options.top_vendors),
        projects: project_analytics(orders, clock, options.top_projects),
        monthly_trend: monthly_trend(orders, clock, options.trend_months),
    };
    tracing::debug!(
        orders = orders.len(),
        vendors = summary.vendors.len(),
        projects = summary.projects.len(),
        "aggregated dashboard"
    );
    summary
}
