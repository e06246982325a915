//! 输入处理：选子状态机
//!
//! 把点击与拖放转换为待提交的走法意图。高亮只是数据，由渲染层读取。

use std::collections::BTreeSet;

use protocol::{Color, PieceId, Square};

use super::state::SnapshotStore;

/// 待提交的走法意图
///
/// 只存在于“选定目标”与“尝试提交”之间，校验后即被消费。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMoveIntent {
    pub piece: PieceId,
    pub source: Square,
    pub target: Square,
}

/// 当前选中的棋子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub square: Square,
    pub piece: PieceId,
}

/// 选子状态机：Idle（无选中）/ Selected（选中一个棋子）
#[derive(Debug, Default)]
pub struct MoveSelector {
    selection: Option<Selection>,
    highlights: BTreeSet<Square>,
}

impl MoveSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn highlights(&self) -> &BTreeSet<Square> {
        &self.highlights
    }

    pub fn is_idle(&self) -> bool {
        self.selection.is_none()
    }

    /// 清除选中与高亮，回到 Idle
    pub fn clear(&mut self) {
        self.selection = None;
        self.highlights.clear();
    }

    /// 处理一次点击
    ///
    /// `player` 为观看者所执阵营，旁观者为 None（不能选子）。
    pub fn click(
        &mut self,
        square: Square,
        store: &SnapshotStore,
        player: Option<Color>,
    ) -> Option<PendingMoveIntent> {
        let clicked = store.piece_at(square);
        let own_piece = clicked.filter(|piece| Some(piece.color()) == player).cloned();

        let Some(selection) = self.selection.take() else {
            // Idle
            if let Some(piece) = own_piece {
                self.select(square, piece, store);
            }
            return None;
        };

        // Selected
        if selection.square == square {
            self.clear();
            return None;
        }

        if self.highlights.contains(&square) {
            self.clear();
            return Some(PendingMoveIntent {
                piece: selection.piece,
                source: selection.square,
                target: square,
            });
        }

        match own_piece {
            Some(piece) => self.select(square, piece, store),
            None => self.clear(),
        }
        None
    }

    /// 处理一次拖放
    ///
    /// 与点击状态机并行：只要拖起的是己方棋子，落点即为候选目标，与当前选中状态无关。
    pub fn drag_drop(
        &mut self,
        from: Square,
        to: Square,
        store: &SnapshotStore,
        player: Option<Color>,
    ) -> Option<PendingMoveIntent> {
        let piece = store
            .piece_at(from)
            .filter(|piece| Some(piece.color()) == player)
            .cloned()?;
        if from == to {
            return None;
        }
        self.clear();
        Some(PendingMoveIntent {
            piece,
            source: from,
            target: to,
        })
    }

    /// 安装新的选中；先清除旧高亮再写入新高亮
    fn select(&mut self, square: Square, piece: PieceId, store: &SnapshotStore) {
        self.clear();
        self.highlights
            .extend(store.allowed_moves().targets(&piece).iter().copied());
        if self.highlights.is_empty() {
            tracing::debug!("No allowed moves for {} at {}", piece, square);
        }
        self.selection = Some(Selection { square, piece });
    }
}
