pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, LoggingConfig, ServerConfig, UserConfig};
pub use observability::{FilterSource, init_tracing, shutdown_tracing};
pub use server::{ServerBuilder, WardenServer, build_app, build_auth};
