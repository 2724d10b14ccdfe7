//! Process lifecycle subsystem.
//!
//! Startup is owned by `main`; this module provides the shutdown
//! coordination shared by listeners and tests.

pub mod shutdown;

pub use shutdown::Shutdown;
