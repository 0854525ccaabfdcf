pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod history;
pub mod model;

pub use analytics::{aggregate, AggregateOptions, Clock, DashboardSummary, SystemClock, TimeFrame};
pub use api::{build_source, PoSource};
pub use config::Config;
pub use error::{PodashError, Result};
pub use model::{ChangeRecord, EnrichedOrder, InwardStatus, PoStatus, PurchaseOrder};
