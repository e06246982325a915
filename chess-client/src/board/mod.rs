//! 棋盘渲染模块
//!
//! 渲染层只读取 [`BoardView`]；高亮是数据，不涉及监听器的挂载与移除。

mod pieces;
mod render;

pub use pieces::*;
pub use render::*;

use protocol::{Color, Orientation, PieceId, Square, Winner};

use crate::network::ConnectionState;

/// 单个格子的视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareView {
    pub square: Square,
    pub piece: Option<PieceId>,
    /// 浅色格
    pub light: bool,
    /// 当前选中棋子的可走目标
    pub highlighted: bool,
    pub selected: bool,
    /// 上一步的起点或终点
    pub last_move: bool,
}

/// 棋盘一侧的玩家信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLine {
    pub color: Color,
    /// 展示名；对手尚未加入时为占位文本
    pub name: String,
    /// 轮到该方走棋
    pub to_move: bool,
}

/// 按绘制顺序排列的棋盘视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub rows: Vec<Vec<SquareView>>,
    pub orientation: Orientation,
    /// 棋盘上方（远端）的玩家
    pub top: PlayerLine,
    /// 棋盘下方（近端）的玩家
    pub bottom: PlayerLine,
    pub turn: Option<Color>,
    pub player: Option<Color>,
    /// 观看者可以走棋
    pub my_turn: bool,
    pub winner: Option<Winner>,
}

impl BoardView {
    /// 所有高亮格子
    pub fn highlighted(&self) -> impl Iterator<Item = &SquareView> {
        self.rows.iter().flatten().filter(|cell| cell.highlighted)
    }
}

/// 渲染层接口（外部协作方）
pub trait Renderer {
    /// 全量重绘
    fn render(&mut self, view: &BoardView);

    /// 显示错误原因
    fn show_error(&mut self, message: &str);

    /// 连接状态变化
    fn connection_changed(&mut self, _state: ConnectionState) {}
}
