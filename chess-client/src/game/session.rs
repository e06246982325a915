//! 对局会话
//!
//! 一个对局视图的全部可变状态：快照存储、选子状态、视角与身份。

use protocol::{
    to_display_order, Color, GameDetail, GameId, Orientation, Participant, Square, UserId,
};

use super::input::{MoveSelector, PendingMoveIntent, Selection};
use super::reconcile::{reconcile, ReconcileOutcome};
use super::state::{GameSnapshot, SnapshotStore};
use crate::board::{BoardView, PlayerLine, SquareView};

/// 观看者身份（由外部身份引导提供）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub token: String,
}

/// 对局双方；等待对手时一方缺席
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participants {
    pub white: Option<Participant>,
    pub black: Option<Participant>,
}

impl Participants {
    pub fn get(&self, color: Color) -> Option<&Participant> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    /// 通过显式身份比较得出观看者所执阵营；旁观者为 None
    pub fn color_of(&self, user_id: &UserId) -> Option<Color> {
        [Color::White, Color::Black]
            .into_iter()
            .find(|&color| self.get(color).is_some_and(|p| &p.id == user_id))
    }
}

/// 对局会话
#[derive(Debug)]
pub struct GameSession {
    game_id: GameId,
    identity: Identity,
    participants: Participants,
    /// 观看者所执阵营
    player: Option<Color>,
    /// 会话建立时确定，之后不再推断
    orientation: Orientation,
    store: SnapshotStore,
    selector: MoveSelector,
}

impl GameSession {
    /// 创建未播种的会话（旁观视角）
    fn new(game_id: impl Into<GameId>, identity: Identity) -> Self {
        Self {
            game_id: game_id.into(),
            identity,
            participants: Participants::default(),
            player: None,
            orientation: Orientation::default(),
            store: SnapshotStore::new(),
            selector: MoveSelector::new(),
        }
    }

    /// 用 REST 获取的对局详情播种会话，并确定视角
    pub fn from_detail(game_id: impl Into<GameId>, identity: Identity, detail: GameDetail) -> Self {
        let mut session = Self::new(game_id, identity);
        session.store.replace(GameSnapshot::from(detail.to_update()));
        session.set_participants(Participants {
            white: detail.white_user,
            black: detail.black_user,
        });
        session
    }

    /// 记录对局双方并一次性确定所执阵营与视角
    fn set_participants(&mut self, participants: Participants) {
        self.player = participants.color_of(&self.identity.user_id);
        self.orientation = Orientation::for_player(self.player);
        tracing::info!(
            "Viewing game {} as {} ({:?})",
            self.game_id,
            self.player.map_or("spectator", |c| c.as_str()),
            self.orientation
        );
        self.participants = participants;
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn player(&self) -> Option<Color> {
        self.player
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selector.selection()
    }

    /// 是否已观察到终局
    pub fn is_terminal(&self) -> bool {
        self.store.is_terminal()
    }

    /// 是否轮到观看者走棋
    pub fn is_my_turn(&self) -> bool {
        self.player.is_some() && self.store.turn() == self.player && !self.is_terminal()
    }

    /// 点击格子
    pub fn click(&mut self, square: Square) -> Option<PendingMoveIntent> {
        self.selector.click(square, &self.store, self.player)
    }

    /// 拖放
    pub fn drag_drop(&mut self, from: Square, to: Square) -> Option<PendingMoveIntent> {
        self.selector.drag_drop(from, to, &self.store, self.player)
    }

    /// 放弃当前选中
    pub fn clear_selection(&mut self) {
        self.selector.clear();
    }

    /// 应用一条入站消息
    ///
    /// 新快照或服务端拒绝都会清除选中：高亮来自旧可走表，不能继续使用。
    pub fn apply_inbound(&mut self, text: &str) -> ReconcileOutcome {
        let outcome = reconcile(&mut self.store, text);
        match outcome {
            ReconcileOutcome::Applied { .. } | ReconcileOutcome::Rejected { .. } => {
                self.selector.clear();
            }
            ReconcileOutcome::Ignored { .. } => {}
        }
        outcome
    }

    /// 生成供渲染层读取的视图
    pub fn view(&self) -> BoardView {
        let display = to_display_order(self.store.layout(), self.orientation);
        let selected = self.selector.selection().map(|s| s.square);
        let last_move = self.store.last_move();
        let highlights = self.selector.highlights();

        let rows = display
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&square| SquareView {
                        square,
                        piece: self.store.piece_at(square).cloned(),
                        light: square.is_light(),
                        highlighted: highlights.contains(&square),
                        selected: selected == Some(square),
                        last_move: last_move.is_some_and(|m| m.from == square || m.to == square),
                    })
                    .collect()
            })
            .collect();

        let bottom = self.orientation.bottom();
        BoardView {
            rows,
            orientation: self.orientation,
            top: self.player_line(bottom.opponent()),
            bottom: self.player_line(bottom),
            turn: self.store.turn(),
            player: self.player,
            my_turn: self.is_my_turn(),
            winner: self.store.winner(),
        }
    }

    fn player_line(&self, color: Color) -> PlayerLine {
        PlayerLine {
            color,
            name: self
                .participants
                .get(color)
                .map_or_else(|| "waiting...".to_string(), Participant::display_name),
            to_move: !self.is_terminal() && self.store.turn() == Some(color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{
        AllowedMoveTable, BoardLayout, BoardSnapshot, ChessState, PieceId, ServerEnvelope,
        GameUpdate,
    };

    fn sq(key: &str) -> Square {
        key.parse().unwrap()
    }

    fn id(code: &str) -> PieceId {
        code.parse().unwrap()
    }

    fn identity(user: &str) -> Identity {
        Identity {
            user_id: UserId::new(user),
            token: format!("token-{}", user),
        }
    }

    fn detail() -> GameDetail {
        GameDetail {
            chess_state: ChessState {
                board: BoardSnapshot::empty()
                    .with(sq("e2"), id("wP"))
                    .with(sq("e7"), id("bP"))
                    .with(sq("e1"), id("wK"))
                    .with(sq("e8"), id("bK")),
                board_layout: BoardLayout::standard(),
                allowed_moves: AllowedMoveTable::new().with(id("wP"), vec![sq("e3"), sq("e4")]),
                turn: Color::White,
                last_move: None,
            },
            white_user: Some(Participant { id: UserId::new("1"), name: "white-fox".to_string() }),
            black_user: Some(Participant { id: UserId::new("2"), name: "black-owl".to_string() }),
            last_move: None,
            winner: None,
        }
    }

    #[test]
    fn test_orientation_from_identity() {
        let white = GameSession::from_detail("g1", identity("1"), detail());
        assert_eq!(white.player(), Some(Color::White));
        assert_eq!(white.orientation(), Orientation::WhiteBottom);

        let black = GameSession::from_detail("g1", identity("2"), detail());
        assert_eq!(black.player(), Some(Color::Black));
        assert_eq!(black.orientation(), Orientation::BlackBottom);

        let spectator = GameSession::from_detail("g1", identity("3"), detail());
        assert_eq!(spectator.player(), None);
        assert_eq!(spectator.orientation(), Orientation::WhiteBottom);
    }

    #[test]
    fn test_orientation_survives_snapshots() {
        let mut session = GameSession::from_detail("g1", identity("2"), detail());
        let mut update = detail().to_update();
        update.chess_state.turn = Color::Black;
        let text = serde_json::to_string(&ServerEnvelope::success(&update).unwrap()).unwrap();
        session.apply_inbound(&text);
        assert_eq!(session.orientation(), Orientation::BlackBottom);
    }

    #[test]
    fn test_view_black_bottom() {
        let session = GameSession::from_detail("g1", identity("2"), detail());
        let view = session.view();
        assert_eq!(view.rows[0][0].square, sq("h1"));
        assert_eq!(view.rows[7][7].square, sq("a8"));
        assert_eq!(view.rows[0][3].piece, Some(id("wK")));
    }

    #[test]
    fn test_view_marks_selection_and_highlights() {
        let mut session = GameSession::from_detail("g1", identity("1"), detail());
        session.click(sq("e2"));
        let view = session.view();
        let cell = |key: &str| {
            view.rows
                .iter()
                .flatten()
                .find(|c| c.square == sq(key))
                .cloned()
                .unwrap()
        };
        assert!(cell("e2").selected);
        assert!(cell("e3").highlighted);
        assert!(cell("e4").highlighted);
        assert!(!cell("e5").highlighted);
        assert_eq!(view.highlighted().count(), 2);
    }

    #[test]
    fn test_inbound_snapshot_clears_selection() {
        let mut session = GameSession::from_detail("g1", identity("1"), detail());
        session.click(sq("e2"));
        assert!(session.selection().is_some());

        let update: GameUpdate = detail().to_update();
        let text = serde_json::to_string(&ServerEnvelope::success(&update).unwrap()).unwrap();
        session.apply_inbound(&text);
        assert!(session.selection().is_none());
        assert_eq!(session.view().highlighted().count(), 0);
    }

    #[test]
    fn test_ignored_message_keeps_selection() {
        let mut session = GameSession::from_detail("g1", identity("1"), detail());
        session.click(sq("e2"));
        session.apply_inbound("garbage");
        assert!(session.selection().is_some());
    }

    #[test]
    fn test_is_my_turn() {
        let white = GameSession::from_detail("g1", identity("1"), detail());
        let black = GameSession::from_detail("g1", identity("2"), detail());
        assert!(white.is_my_turn());
        assert!(!black.is_my_turn());
        assert!(white.view().my_turn);
        assert!(!black.view().my_turn);
    }

    #[test]
    fn test_player_lines_follow_orientation() {
        let white = GameSession::from_detail("g1", identity("1"), detail()).view();
        assert_eq!(white.bottom.color, Color::White);
        assert_eq!(white.bottom.name, "White Fox");
        assert!(white.bottom.to_move);
        assert_eq!(white.top.color, Color::Black);
        assert_eq!(white.top.name, "Black Owl");
        assert!(!white.top.to_move);

        let black = GameSession::from_detail("g1", identity("2"), detail()).view();
        assert_eq!(black.bottom.name, "Black Owl");
        assert_eq!(black.top.name, "White Fox");
        assert!(black.top.to_move);
    }

    #[test]
    fn test_waiting_for_opponent() {
        let mut waiting = detail();
        waiting.black_user = None;

        let white = GameSession::from_detail("g1", identity("1"), waiting.clone());
        assert_eq!(white.player(), Some(Color::White));
        assert_eq!(white.view().top.name, "waiting...");

        // 缺席一方不会匹配任何身份
        let other = GameSession::from_detail("g1", identity("2"), waiting);
        assert_eq!(other.player(), None);
        assert_eq!(other.orientation(), Orientation::WhiteBottom);
    }
}
