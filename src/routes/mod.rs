// 网关本地路由：健康检查、刷新/登出、内部会话接口，其余请求全部转发

pub mod auth;
pub mod health;
pub mod internal;
pub mod proxy;
