// 请求转发模块
// 逻辑服务名解析、请求头处理、下游调用

pub mod client;
pub mod headers;

pub use client::{ForwardedRequest, ForwardedResponse, Relayed, RequestDispatcher};
