//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, upgrade classification, dispatch)
//!     → headers.rs (inbound → outbound header transformation)
//!     → relay.rs (ordinary requests: forward upstream, stream back)
//!       or websocket.rs (upgrade requests: paired frame relay)
//!     → response.rs (identity/health and structured error bodies)
//! ```

pub mod headers;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use headers::Scheme;
pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::GatewayServer;
