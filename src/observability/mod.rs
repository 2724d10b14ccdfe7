//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (request counters, latency, live session gauge)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape endpoint (optional, config-gated)
//! ```
//!
//! # Design Decisions
//! - Connection-scoped failures are logged at the relay boundary; only
//!   truly unexpected panics reach the process-wide hook, which logs and
//!   keeps the process alive.
//! - Metric updates are cheap atomic operations; the exporter runs on its
//!   own listener and never touches the proxy path.

pub mod logging;
pub mod metrics;
