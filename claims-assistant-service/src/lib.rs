pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, LogFormat, ServiceConfig};
pub use error::{ApiError, ErrorResponse};
pub use service::{AppState, SessionView, build_router, create_app_state};
pub use telemetry::{correlation_id_middleware, init_tracing};
