//! Router-wide middleware.

pub mod deadline;
pub mod metrics;

pub use self::deadline::enforce_deadline;
pub use self::metrics::track_metrics;
