//! Edge gateway: a reverse proxy for a single upstream service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 EDGE GATEWAY                 │
//!                    │                                              │
//!   Client ──────────┼─▶ listener ──▶ dispatcher ──┬─▶ http relay ──┼─▶ Upstream
//!   (HTTP/WS,        │   (80/443)    (upgrade?)    │                │   (fixed)
//!    plain or TLS)   │                             └─▶ ws session ──┼─▶
//!                    │                                 relay        │
//!                    │                                              │
//!                    │  ┌────────────────────────────────────────┐  │
//!                    │  │          Cross-Cutting Concerns        │  │
//!                    │  │  config (env)  tls loading  logging +  │  │
//!                    │  │                             metrics    │  │
//!                    │  └────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! The gateway terminates client HTTP and WebSocket connections, forwards
//! them to one configured upstream, and streams responses back. `GET /`
//! answers with identity/health metadata; anything under the API prefix is
//! proxied; everything else is a structured 404. TLS material is optional:
//! when it is missing, the plaintext listener still serves.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
