//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → tls.rs (load PEM material, or report it missing)
//!     → plaintext listener always starts
//!     → TLS listener starts only when material loads
//! ```
//!
//! # Design Decisions
//! - TLS is strictly optional: missing or invalid material logs a warning
//!   and the gateway keeps serving plaintext.
//! - Material is read once at startup and held immutably for the
//!   listener's lifetime.

pub mod tls;
