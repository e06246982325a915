//! 消息类型定义
//!
//! 持久连接上的信封格式与 REST 快照响应。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::board::{AllowedMoveTable, BoardLayout, BoardSnapshot};
use crate::constants::{GAME_UPDATE_TYPE, SUCCESS_RESPONSE_KEY};
use crate::error::ProtocolError;
use crate::piece::{Color, PieceId};
use crate::square::Square;

/// 对局 ID
pub type GameId = String;

// ============================================================================
// 客户端 -> 服务端
// ============================================================================

/// 客户端发送的信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: MovePayload,
}

/// 走棋载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovePayload {
    pub piece: PieceId,
    pub source: Square,
    pub destination: Square,
    pub game_id: GameId,
    pub token: String,
}

impl ClientEnvelope {
    /// 构造走棋信封
    pub fn game_update(payload: MovePayload) -> Self {
        Self {
            kind: GAME_UPDATE_TYPE.to_string(),
            payload,
        }
    }
}

// ============================================================================
// 服务端 -> 客户端
// ============================================================================

/// 响应状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// 服务端发送的信封
///
/// 载荷保持为原始 JSON：错误信封的载荷不参与状态更新，
/// 成功信封的载荷由调用方再解码为 [`GameUpdate`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ServerEnvelope {
    /// 解码成功载荷
    pub fn game_update(&self) -> Result<GameUpdate, ProtocolError> {
        let payload = self.payload.clone().unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(payload)?)
    }

    /// 构造成功信封
    pub fn success(update: &GameUpdate) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: Some(GAME_UPDATE_TYPE.to_string()),
            status: Status::Success,
            message: None,
            payload: Some(serde_json::to_value(update)?),
        })
    }
}

/// 棋局状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChessState {
    pub board: BoardSnapshot,
    pub board_layout: BoardLayout,
    pub allowed_moves: AllowedMoveTable,
    pub turn: Color,
    /// 部分服务端版本把上一步放在棋局状态内
    #[serde(
        default,
        alias = "lastMove",
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_move: Option<LastMove>,
}

/// 成功信封的载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub chess_state: ChessState,
    #[serde(
        default,
        alias = "lastMove",
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_move: Option<LastMove>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub winner: Option<Winner>,
}

impl GameUpdate {
    /// 上一步：优先取载荷层，其次取棋局状态内的字段
    pub fn last_move(&self) -> Option<LastMove> {
        self.last_move.or(self.chess_state.last_move)
    }
}

/// 上一步走法，线上格式为 `"e2e4"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LastMove {
    pub from: Square,
    pub to: Square,
}

impl fmt::Display for LastMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

impl FromStr for LastMove {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidLastMove {
            value: value.to_string(),
        };
        if value.len() != 4 || !value.is_ascii() {
            return Err(invalid());
        }
        let from = value[..2].parse().map_err(|_| invalid())?;
        let to = value[2..].parse().map_err(|_| invalid())?;
        Ok(Self { from, to })
    }
}

impl TryFrom<String> for LastMove {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LastMove> for String {
    fn from(last_move: LastMove) -> Self {
        last_move.to_string()
    }
}

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl FromStr for Winner {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "white" | "w" => Ok(Winner::White),
            "black" | "b" => Ok(Winner::Black),
            "draw" => Ok(Winner::Draw),
            _ => Err(ProtocolError::InvalidWinner {
                value: value.to_string(),
            }),
        }
    }
}

impl Winner {
    /// 获胜方，和棋为 None
    pub fn color(&self) -> Option<Color> {
        match self {
            Winner::White => Some(Color::White),
            Winner::Black => Some(Color::Black),
            Winner::Draw => None,
        }
    }
}

/// 空字符串与 null 均视为缺省
fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// REST 快照
// ============================================================================

/// 用户 ID，服务端可能以数字或字符串下发
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawUserId", into = "String")]
pub struct UserId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Text(String),
}

impl From<RawUserId> for UserId {
    fn from(raw: RawUserId) -> Self {
        match raw {
            RawUserId::Number(n) => UserId(n.to_string()),
            RawUserId::Text(s) => UserId(s),
        }
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 对局参与者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

impl Participant {
    /// 展示名："john-doe-42" -> "John Doe"，空名为 "Anonymous"
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            return "Anonymous".to_string();
        }
        self.name
            .split('-')
            .filter(|word| !word.is_empty())
            .take(2)
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// REST 响应外层
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub response_key: String,
    #[serde(default)]
    pub response_message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.response_key == SUCCESS_RESPONSE_KEY
    }
}

/// 对局详情（会话开始时获取一次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetail {
    pub chess_state: ChessState,
    /// 等待对手加入时缺席
    #[serde(default)]
    pub white_user: Option<Participant>,
    #[serde(default)]
    pub black_user: Option<Participant>,
    #[serde(
        default,
        alias = "lastMove",
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_move: Option<LastMove>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub winner: Option<Winner>,
}

impl GameDetail {
    /// 转换为与推送更新一致的载荷
    pub fn to_update(&self) -> GameUpdate {
        GameUpdate {
            chess_state: self.chess_state.clone(),
            last_move: self.last_move,
            winner: self.winner,
        }
    }
}
