//! 棋盘快照存储
//!
//! 持有最新的权威快照与可走表，唯一写入方为 [`SnapshotStore::replace`]。

use chrono::{DateTime, Utc};
use protocol::{
    AllowedMoveTable, BoardLayout, BoardSnapshot, Color, GameUpdate, LastMove, PieceId, Square,
    Winner,
};

/// 一次完整的服务端快照
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub board: BoardSnapshot,
    pub layout: BoardLayout,
    pub allowed_moves: AllowedMoveTable,
    pub turn: Color,
    pub last_move: Option<LastMove>,
    pub winner: Option<Winner>,
}

impl From<GameUpdate> for GameSnapshot {
    fn from(update: GameUpdate) -> Self {
        let last_move = update.last_move();
        let state = update.chess_state;
        Self {
            board: state.board,
            layout: state.board_layout,
            allowed_moves: state.allowed_moves,
            turn: state.turn,
            last_move,
            winner: update.winner,
        }
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            board: BoardSnapshot::empty(),
            layout: BoardLayout::standard(),
            allowed_moves: AllowedMoveTable::new(),
            turn: Color::White,
            last_move: None,
            winner: None,
        }
    }
}

/// 快照存储
///
/// 未播种时持有空快照：空棋盘、空可走表。
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: GameSnapshot,
    seeded: bool,
    /// 一旦观察到终局即保持，后续快照不会解除
    terminal: bool,
    /// 最近一次接受快照的时间
    updated_at: Option<DateTime<Utc>>,
    /// 已接受的快照数
    revision: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以新快照整体替换当前内容
    pub fn replace(&mut self, snapshot: GameSnapshot) {
        if snapshot.winner.is_some() {
            self.terminal = true;
        }
        self.current = snapshot;
        self.seeded = true;
        self.updated_at = Some(Utc::now());
        self.revision += 1;
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.seeded.then_some(&self.current)
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn board(&self) -> &BoardSnapshot {
        &self.current.board
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.current.layout
    }

    pub fn allowed_moves(&self) -> &AllowedMoveTable {
        &self.current.allowed_moves
    }

    pub fn piece_at(&self, square: Square) -> Option<&PieceId> {
        self.current.board.get(square)
    }

    pub fn turn(&self) -> Option<Color> {
        self.seeded.then_some(self.current.turn)
    }

    pub fn last_move(&self) -> Option<LastMove> {
        self.current.last_move
    }

    pub fn winner(&self) -> Option<Winner> {
        self.current.winner
    }

    /// 是否已观察到终局
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
