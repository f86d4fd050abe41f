mod handler;
mod model;

pub use handler::{logout, refresh};
pub use model::{LogoutResponse, SessionTokenResponse};
