//! Precision/recall bookkeeping for threshold sweeps.
//!
//! Workers accumulate [`Counters`]; the coordinator reduces them into one
//! [`Metrics`] per threshold, stores it in a [`ThresholdTable`] and folds it
//! into an [`OptimalMetrics`]. [`ReportSink`] persists the finished sweep.

mod metrics;
mod report;
mod table;

pub use metrics::{Counters, Metrics, OptimalMetrics};
pub use report::{format_optimal, write_pr_table, ReportError, ReportSink};
pub use table::ThresholdTable;
