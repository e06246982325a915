//! 网络通信模块
//!
//! 持久连接、走法发送、REST 对局详情与客户端事件循环

mod api;
mod connection;
mod dispatcher;
mod runtime;

pub use api::*;
pub use connection::*;
pub use dispatcher::*;
pub use runtime::*;
