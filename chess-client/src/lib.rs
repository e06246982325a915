//! 国际象棋对局同步客户端
//!
//! 维护服务端权威快照的本地副本，处理选子交互、走法校验与发送，
//! 以及持久连接的断线重连。

pub mod board;
pub mod game;
pub mod network;
pub mod settings;
