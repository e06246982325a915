//! 棋盘状态、布局与视角变换

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, EMPTY_PIECE_CODE};
use crate::error::ProtocolError;
use crate::piece::{Color, PieceId};
use crate::square::Square;

// ============================================================================
// 棋盘快照
// ============================================================================

/// 棋盘快照
///
/// 每次服务端更新整体替换，从不做增量修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "HashMap<String, Option<BoardCell>>",
    into = "BTreeMap<String, String>"
)]
pub struct BoardSnapshot {
    /// 8x8 棋盘，索引为 rank * 8 + file，使用 Vec 以支持 serde
    squares: Vec<Option<PieceId>>,
}

/// 棋盘格子的线上表示
///
/// 规范格式为棋子编码字符串；兼容旧格式 `[格子颜色, 棋子编码]` 与空格子标记 `"---"`。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoardCell {
    Code(String),
    Pair(Vec<String>),
}

impl BoardCell {
    fn into_piece(self) -> Result<Option<PieceId>, ProtocolError> {
        let code = match self {
            BoardCell::Code(code) => code,
            BoardCell::Pair(mut parts) => {
                if parts.len() != 2 {
                    return Err(ProtocolError::InvalidPiece {
                        code: parts.join(","),
                    });
                }
                parts.swap_remove(1)
            }
        };
        if code.is_empty() || code == EMPTY_PIECE_CODE {
            Ok(None)
        } else {
            code.parse().map(Some)
        }
    }
}

impl BoardSnapshot {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; BOARD_SIZE * BOARD_SIZE],
        }
    }

    /// 获取指定格子的棋子
    pub fn get(&self, square: Square) -> Option<&PieceId> {
        self.squares.get(square.to_index()).and_then(Option::as_ref)
    }

    /// 设置指定格子的棋子
    pub fn set(&mut self, square: Square, piece: Option<PieceId>) {
        if let Some(slot) = self.squares.get_mut(square.to_index()) {
            *slot = piece;
        }
    }

    /// 链式放置棋子（构造快照用）
    pub fn with(mut self, square: Square, piece: PieceId) -> Self {
        self.set(square, Some(piece));
        self
    }

    /// 指定格子是否被某方棋子占据
    pub fn is_occupied_by(&self, square: Square, color: Color) -> bool {
        self.get(square).is_some_and(|piece| piece.color() == color)
    }

    /// 遍历所有棋子
    pub fn pieces(&self) -> impl Iterator<Item = (Square, &PieceId)> {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(index, piece)| Some((Square::from_index(index)?, piece.as_ref()?)))
    }

    /// 查找棋子所在格子
    pub fn find(&self, id: &PieceId) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| *piece == id)
            .map(|(square, _)| square)
    }
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<HashMap<String, Option<BoardCell>>> for BoardSnapshot {
    type Error = ProtocolError;

    fn try_from(cells: HashMap<String, Option<BoardCell>>) -> Result<Self, Self::Error> {
        let mut board = Self::empty();
        for (key, cell) in cells {
            let square: Square = key.parse()?;
            let piece = match cell {
                Some(cell) => cell.into_piece()?,
                None => None,
            };
            board.set(square, piece);
        }
        Ok(board)
    }
}

impl From<BoardSnapshot> for BTreeMap<String, String> {
    fn from(board: BoardSnapshot) -> Self {
        board
            .pieces()
            .map(|(square, piece)| (square.to_string(), piece.to_string()))
            .collect()
    }
}

// ============================================================================
// 可走表
// ============================================================================

/// 可走表：棋子标识 -> 有序目标格子
///
/// 仅对当前走子方有效；缺少键即表示该棋子无可走步。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<PieceId, Option<Vec<Square>>>",
    into = "HashMap<PieceId, Vec<Square>>"
)]
pub struct AllowedMoveTable {
    moves: HashMap<PieceId, Vec<Square>>,
}

impl AllowedMoveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加条目（构造可走表用）
    pub fn with(mut self, piece: PieceId, targets: Vec<Square>) -> Self {
        self.moves.insert(piece, targets);
        self
    }

    /// 指定棋子的目标格子，缺少键时为空
    pub fn targets(&self, piece: &PieceId) -> &[Square] {
        self.moves.get(piece).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_entry(&self, piece: &PieceId) -> bool {
        self.moves.contains_key(piece)
    }

    /// 目标格子是否在该棋子的可走列表中
    pub fn contains(&self, piece: &PieceId, target: Square) -> bool {
        self.targets(piece).contains(&target)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl From<HashMap<PieceId, Option<Vec<Square>>>> for AllowedMoveTable {
    fn from(raw: HashMap<PieceId, Option<Vec<Square>>>) -> Self {
        Self {
            moves: raw
                .into_iter()
                .map(|(piece, targets)| (piece, targets.unwrap_or_default()))
                .collect(),
        }
    }
}

impl From<AllowedMoveTable> for HashMap<PieceId, Vec<Square>> {
    fn from(table: AllowedMoveTable) -> Self {
        table.moves
    }
}

// ============================================================================
// 棋盘布局与视角
// ============================================================================

/// 棋盘视角
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// 白方在下
    #[default]
    WhiteBottom,
    /// 黑方在下
    BlackBottom,
}

impl Orientation {
    /// 根据观看者所执阵营得出视角；旁观者使用白方视角
    pub fn for_player(color: Option<Color>) -> Self {
        match color {
            Some(Color::Black) => Orientation::BlackBottom,
            Some(Color::White) | None => Orientation::WhiteBottom,
        }
    }

    /// 位于下方的阵营
    pub fn bottom(&self) -> Color {
        match self {
            Orientation::WhiteBottom => Color::White,
            Orientation::BlackBottom => Color::Black,
        }
    }
}

/// 棋盘布局：按绘制顺序排列的行
///
/// 规范布局第一行为第 8 行（a8..h8），最后一行为第 1 行。
/// 兼容旧格式 `[格子编码, 格子颜色]` 的单元格。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<LayoutCell>>", into = "Vec<Vec<Square>>")]
pub struct BoardLayout {
    rows: Vec<Vec<Square>>,
}

/// 布局单元格的线上表示
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LayoutCell {
    Key(String),
    Pair(Vec<String>),
}

impl BoardLayout {
    /// 标准布局（白方视角的规范顺序）
    pub fn standard() -> Self {
        let rows = (0..BOARD_SIZE as u8)
            .rev()
            .map(|rank| {
                (0..BOARD_SIZE as u8)
                    .map(|file| Square::new_unchecked(file, rank))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Square>] {
        &self.rows
    }

    /// 按绘制顺序遍历所有格子
    pub fn squares(&self) -> impl Iterator<Item = Square> + '_ {
        self.rows.iter().flatten().copied()
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<Vec<LayoutCell>>> for BoardLayout {
    type Error = ProtocolError;

    fn try_from(raw: Vec<Vec<LayoutCell>>) -> Result<Self, Self::Error> {
        if raw.len() != BOARD_SIZE {
            return Err(ProtocolError::InvalidLayout {
                reason: format!("expected {} rows, got {}", BOARD_SIZE, raw.len()),
            });
        }
        let mut rows = Vec::with_capacity(BOARD_SIZE);
        for row in raw {
            if row.len() != BOARD_SIZE {
                return Err(ProtocolError::InvalidLayout {
                    reason: format!("expected {} squares per row, got {}", BOARD_SIZE, row.len()),
                });
            }
            let squares = row
                .into_iter()
                .map(|cell| match cell {
                    LayoutCell::Key(key) => key.parse(),
                    LayoutCell::Pair(parts) => match parts.first() {
                        Some(key) => key.parse(),
                        None => Err(ProtocolError::InvalidSquare { key: String::new() }),
                    },
                })
                .collect::<Result<Vec<Square>, _>>()?;
            rows.push(squares);
        }
        Ok(Self { rows })
    }
}

impl From<BoardLayout> for Vec<Vec<Square>> {
    fn from(layout: BoardLayout) -> Self {
        layout.rows
    }
}

/// 将布局转换为绘制顺序
///
/// 黑方在下时行序与每行内的格子顺序同时反转（旋转 180°），白方在下时原样返回。
/// 纯函数；同一视角连续应用两次得到原布局。
pub fn to_display_order(layout: &BoardLayout, orientation: Orientation) -> BoardLayout {
    match orientation {
        Orientation::WhiteBottom => layout.clone(),
        Orientation::BlackBottom => BoardLayout {
            rows: layout
                .rows
                .iter()
                .rev()
                .map(|row| row.iter().rev().copied().collect())
                .collect(),
        },
    }
}
