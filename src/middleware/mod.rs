mod auth;
mod correlation;
mod error_handler;

pub use auth::{
    INTERNAL_PREFIX, Identity, REFRESH_COOKIE, RouteClass, SESSION_COOKIE, StrictIdentity,
    classify, extract_credential, internal_guard, resolve_session_id, session_guard, strict_guard,
};
pub use correlation::{CorrelationId, correlation_id};
pub use error_handler::log_errors;
