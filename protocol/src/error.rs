//! 错误类型定义

use thiserror::Error;

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 无效的格子编码
    #[error("Invalid square key: {key:?}")]
    InvalidSquare { key: String },

    /// 无效的棋子编码
    #[error("Invalid piece code: {code:?}")]
    InvalidPiece { code: String },

    /// 无效的阵营
    #[error("Invalid color: {value:?}")]
    InvalidColor { value: String },

    /// 无效的胜负结果
    #[error("Invalid winner: {value:?}")]
    InvalidWinner { value: String },

    /// 无效的上一步走法
    #[error("Invalid last move: {value:?}")]
    InvalidLastMove { value: String },

    /// 棋盘布局不是 8x8
    #[error("Invalid board layout: {reason}")]
    InvalidLayout { reason: String },

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket 错误
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
