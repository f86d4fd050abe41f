mod handler;
mod model;

pub use handler::{
    create_session, delete_session, extend_session, get_session, list_user_sessions,
    revoke_user_sessions, rotate_session, validate_users,
};
pub use model::{
    BulkValidateRequest, BulkValidateResponse, CreateSessionRequest, ExtendSessionResponse,
    RemovedResponse, RotateSessionRequest, SessionLookupResponse, UserSessionsResponse,
};
