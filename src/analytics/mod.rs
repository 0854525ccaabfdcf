//! Purchase-order analytics pipeline: ingestion, aggregation, display helpers

mod aggregate;
mod clock;
mod enrich;
pub mod format;

pub use aggregate::{
    aggregate, month_label, monthly_trend, percentage, project_analytics, status_distribution,
    status_totals, trailing_months, vendor_analytics, AggregateOptions, DashboardSummary,
    MonthlyTrend, ProjectAnalytics, StatusBucket, StatusTotals, VendorAnalytics,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use enrich::{enrich, filter_orders, prepare, TimeFrame};
