//! 棋盘同步共享协议库
//!
//! 包含:
//! - 格子、棋子、棋盘快照等核心数据结构
//! - 可走表与视角变换
//! - 消息类型定义 (ClientEnvelope, ServerEnvelope, GameDetail)
//! - 传输层抽象 (Connector trait, ChannelHandle)

mod board;
mod constants;
mod error;
mod message;
mod piece;
mod square;
mod transport;

pub use board::{
    to_display_order, AllowedMoveTable, BoardCell, BoardLayout, BoardSnapshot, LayoutCell,
    Orientation,
};
pub use constants::*;
pub use error::{ProtocolError, Result};
pub use message::{
    ApiResponse, ChessState, ClientEnvelope, GameDetail, GameId, GameUpdate, LastMove,
    MovePayload, Participant, ServerEnvelope, Status, UserId, Winner,
};
pub use piece::{Color, Piece, PieceId, PieceKind};
pub use square::Square;
pub use transport::{ChannelEvent, ChannelHandle, Connector, WsConnector};
