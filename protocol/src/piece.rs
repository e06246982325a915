//! 棋子定义

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// 阵营
///
/// 线上统一输出 `"white"` / `"black"`，兼容旧格式 `"w"` / `"b"` 输入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// 白方（先手）
    #[serde(alias = "w")]
    White,
    /// 黑方
    #[serde(alias = "b")]
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// 棋子编码中的阵营字符
    pub fn code(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// 从阵营字符解析
    pub fn from_code(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "white" | "w" => Ok(Color::White),
            "black" | "b" => Ok(Color::Black),
            _ => Err(ProtocolError::InvalidColor {
                value: value.to_string(),
            }),
        }
    }
}

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// 棋子编码中的类型字符
    pub fn code(&self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    /// 从类型字符解析
    pub fn from_code(c: char) -> Option<PieceKind> {
        match c {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    /// 创建新棋子
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// 两字符编码，如 `"wP"`
    pub fn code(&self) -> String {
        format!("{}{}", self.color.code(), self.kind.code())
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.color.code(), self.kind.code())
    }
}

/// 棋子标识
///
/// 两字符棋子编码加上服务端可选的序号后缀（如 `"wP"`、`"wR1"`）。
/// 作为可走表的键，必须原样往返。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceId {
    code: String,
}

impl PieceId {
    /// 不带序号的棋子标识
    pub fn new(piece: Piece) -> Self {
        Self { code: piece.code() }
    }

    /// 棋子（阵营 + 类型）
    pub fn piece(&self) -> Piece {
        let mut chars = self.code.chars();
        // 构造时已校验前两个字符
        let color = chars.next().and_then(Color::from_code).unwrap_or(Color::White);
        let kind = chars.next().and_then(PieceKind::from_code).unwrap_or(PieceKind::Pawn);
        Piece { kind, color }
    }

    pub fn color(&self) -> Color {
        self.piece().color
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl FromStr for PieceId {
    type Err = ProtocolError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let mut chars = code.chars();
        let valid = chars.next().and_then(Color::from_code).is_some()
            && chars.next().and_then(PieceKind::from_code).is_some()
            && chars.all(|c| c.is_ascii_digit());
        if valid {
            Ok(Self {
                code: code.to_string(),
            })
        } else {
            Err(ProtocolError::InvalidPiece {
                code: code.to_string(),
            })
        }
    }
}

impl TryFrom<String> for PieceId {
    type Error = ProtocolError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        code.parse()
    }
}

impl From<PieceId> for String {
    fn from(id: PieceId) -> Self {
        id.code
    }
}

impl From<Piece> for PieceId {
    fn from(piece: Piece) -> Self {
        PieceId::new(piece)
    }
}
