//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (APP_MODE, API_PROXY_URL, SSL_*_PATH, ...)
//!     → loader.rs (read & parse, defaults for anything absent)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is an immutable snapshot taken once at process start; it is
//!   passed explicitly into components, never looked up ambiently.
//! - Every field has a default so an empty environment still boots.
//! - Missing TLS paths are not an error here; the listener layer decides
//!   whether to downgrade to plaintext-only serving.

pub mod loader;
pub mod schema;

pub use loader::ConfigError;
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::PathPolicy;
pub use schema::ServerInfo;
