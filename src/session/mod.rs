// 会话模块
// 用户有效性查询与会话生命周期管理

pub mod oracle;
pub mod service;

pub use oracle::{UserIdentitySnapshot, UserStatus, UserValidityOracle};
pub use service::{SessionService, ValidatedSession};
