//! Cross-cutting pieces every open-metadata resource client shares:
//! building the platform connection and installing a tracing subscriber.

pub mod http;
pub mod tracing_config;

pub use http::{ConnectionConfig, TlsMode, build_connection};
pub use tracing_config::{LogFormat, TracingConfig, init_tracing};
