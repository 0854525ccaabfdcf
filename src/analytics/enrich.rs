//! Ingestion stage: approval filter, time window, inward-status lookups

use chrono::{Months, NaiveDate};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fmt;
use std::str::FromStr;

use super::Clock;
use crate::api::PoSource;
use crate::error::{PodashError, Result};
use crate::model::{EnrichedOrder, InwardStatus, PurchaseOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFrame {
    #[default]
    All,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl TimeFrame {
    pub fn months(&self) -> Option<u32> {
        match self {
            TimeFrame::All => None,
            TimeFrame::ThreeMonths => Some(3),
            TimeFrame::SixMonths => Some(6),
            TimeFrame::OneYear => Some(12),
        }
    }

    /// Earliest `po_date` kept by this window, `None` for `All`
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.months()
            .map(|m| today.checked_sub_months(Months::new(m)).unwrap_or(NaiveDate::MIN))
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeFrame::All => "all",
            TimeFrame::ThreeMonths => "3months",
            TimeFrame::SixMonths => "6months",
            TimeFrame::OneYear => "1year",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeFrame {
    type Err = PodashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TimeFrame::All),
            "3months" | "3m" => Ok(TimeFrame::ThreeMonths),
            "6months" | "6m" => Ok(TimeFrame::SixMonths),
            "1year" | "1y" | "12months" => Ok(TimeFrame::OneYear),
            _ => Err(PodashError::InvalidTimeFrame(s.to_string())),
        }
    }
}

/// Keep only approved orders inside the time window, preserving input order
pub fn filter_orders(
    orders: Vec<PurchaseOrder>,
    timeframe: TimeFrame,
    clock: &dyn Clock,
) -> Vec<PurchaseOrder> {
    let cutoff = timeframe.cutoff(clock.today());
    orders
        .into_iter()
        .filter(|po| po.approval_status)
        .filter(|po| cutoff.map_or(true, |c| po.po_date >= c))
        .collect()
}

/// Look up every order's inward status on a dedicated pool of `concurrency`
/// workers.
///
/// A failed lookup only affects its own order, which falls back to `open`.
/// Output order matches input order.
pub fn enrich(
    source: &dyn PoSource,
    orders: Vec<PurchaseOrder>,
    concurrency: usize,
) -> Result<Vec<EnrichedOrder>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .thread_name(|i| format!("podash-lookup-{i}"))
        .build()?;

    let enriched: Vec<EnrichedOrder> = pool.install(|| {
        orders
            .into_par_iter()
            .map(|order| {
                let status = match source.fetch_inward_status(&order.po_number) {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!(
                            po_number = %order.po_number,
                            "inward status lookup failed, assuming open: {e}"
                        );
                        InwardStatus::Open
                    }
                };
                EnrichedOrder::new(order, status)
            })
            .collect()
    });
    Ok(enriched)
}

/// Full ingestion: approval + time filter, then status enrichment
pub fn prepare(
    source: &dyn PoSource,
    orders: Vec<PurchaseOrder>,
    timeframe: TimeFrame,
    clock: &dyn Clock,
    concurrency: usize,
) -> Result<Vec<EnrichedOrder>> {
    let received = orders.len();
    let filtered = filter_orders(orders, timeframe, clock);
    tracing::info!(
        received,
        kept = filtered.len(),
        %timeframe,
        "filtered purchase orders"
    );
    enrich(source, filtered, concurrency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::FixedClock;
    use crate::api::SnapshotSource;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    fn po(number: &str, date: (i32, u32, u32), approved: bool) -> PurchaseOrder {
        PurchaseOrder {
            po_number: number.to_string(),
            po_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            vendor_name: "Acme".to_string(),
            project_code: "P1".to_string(),
            total_amount: 100.0,
            status: crate::model::PoStatus::Approved,
            approval_status: approved,
            approval_date: None,
            created_at: None,
            line_items: Vec::new(),
        }
    }

    fn clock() -> FixedClock {
        FixedClock(chrono::Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn timeframe_parsing() {
        assert_eq!("all".parse::<TimeFrame>().unwrap(), TimeFrame::All);
        assert_eq!("6months".parse::<TimeFrame>().unwrap(), TimeFrame::SixMonths);
        assert_eq!("1YEAR".parse::<TimeFrame>().unwrap(), TimeFrame::OneYear);
        assert!("fortnight".parse::<TimeFrame>().is_err());
    }

    #[test]
    fn cutoff_uses_calendar_months() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(
            TimeFrame::ThreeMonths.cutoff(today),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(TimeFrame::All.cutoff(today), None);
    }

    #[test]
    fn drops_unapproved_and_out_of_window() {
        let orders = vec![
            po("PO-1", (2024, 6, 1), true),
            po("PO-2", (2024, 6, 2), false),
            po("PO-3", (2024, 1, 1), true),
            po("PO-4", (2024, 3, 15), true),
        ];

        let kept = filter_orders(orders.clone(), TimeFrame::ThreeMonths, &clock());
        let numbers: Vec<_> = kept.iter().map(|p| p.po_number.as_str()).collect();
        assert_eq!(numbers, vec!["PO-1", "PO-4"]);

        let all = filter_orders(orders, TimeFrame::All, &clock());
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn failed_lookup_defaults_to_open_without_aborting() {
        let mut statuses = HashMap::new();
        statuses.insert("PO-1".to_string(), InwardStatus::Completed);
        statuses.insert("PO-3".to_string(), InwardStatus::PartiallyInwarded);
        let source = SnapshotSource::new(Vec::new(), statuses, Vec::new());

        let orders = vec![
            po("PO-1", (2024, 6, 1), true),
            po("PO-2", (2024, 6, 2), true),
            po("PO-3", (2024, 6, 3), true),
        ];

        let enriched = enrich(&source, orders, 4).unwrap();
        let statuses: Vec<_> = enriched
            .iter()
            .map(|e| (e.order.po_number.as_str(), e.inward_status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("PO-1", InwardStatus::Completed),
                ("PO-2", InwardStatus::Open),
                ("PO-3", InwardStatus::PartiallyInwarded),
            ]
        );
    }

    /// Answers every lookup after a fixed delay, like a slow API
    struct SlowSource {
        delay: Duration,
    }

    impl PoSource for SlowSource {
        fn fetch_purchase_orders(&self) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }

        fn fetch_inward_status(&self, _po_number: &str) -> Result<InwardStatus> {
            std::thread::sleep(self.delay);
            Ok(InwardStatus::Completed)
        }

        fn fetch_history(&self, _batch_id: &str) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn lookups_run_in_parallel_regardless_of_core_count() {
        let source = SlowSource {
            delay: Duration::from_millis(100),
        };
        let orders: Vec<_> = (0..32)
            .map(|i| po(&format!("PO-{i}"), (2024, 6, 1), true))
            .collect();

        let started = Instant::now();
        let enriched = enrich(&source, orders, 16).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(enriched.len(), 32);
        assert!(enriched.iter().all(|e| e.is_completed()));
        assert_eq!(enriched[31].order.po_number, "PO-31");
        // serial would be 3.2s, 16 workers need two rounds
        assert!(
            elapsed < Duration::from_millis(1600),
            "32 lookups took {elapsed:?}"
        );
    }

    #[test]
    fn zero_concurrency_still_runs() {
        let source = SnapshotSource::default();
        let enriched = enrich(&source, vec![po("PO-1", (2024, 6, 1), true)], 0).unwrap();
        assert_eq!(enriched[0].inward_status, InwardStatus::Open);
    }
}
