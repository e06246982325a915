//! 走法发送：校验通过的意图编码为信封，经连接发出

use protocol::{ClientEnvelope, MovePayload};
use thiserror::Error;

use super::connection::{MessageSink, SendError};
use crate::game::{validate, GameSession, PendingMoveIntent, ValidationError};

/// 发送走法失败
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Game is over")]
    GameOver,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Channel(#[from] SendError),

    #[error("Failed to encode move: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 构造走法信封（附带对局编号与观看者令牌）
pub fn build_envelope(session: &GameSession, intent: &PendingMoveIntent) -> ClientEnvelope {
    ClientEnvelope::game_update(MovePayload {
        piece: intent.piece.clone(),
        source: intent.source,
        destination: intent.target,
        game_id: session.game_id().to_string(),
        token: session.identity().token.clone(),
    })
}

/// 校验并发送一个走法意图
///
/// 本地快照不会被修改，棋盘只在服务端回推新快照后变化。
pub fn dispatch(
    session: &GameSession,
    intent: &PendingMoveIntent,
    sink: &mut impl MessageSink,
) -> Result<ClientEnvelope, DispatchError> {
    if session.is_terminal() {
        return Err(DispatchError::GameOver);
    }
    validate(
        intent,
        session.store().allowed_moves(),
        session.store().board(),
    )?;

    let envelope = build_envelope(session, intent);
    let text = serde_json::to_string(&envelope)?;
    sink.send_text(text)?;
    tracing::info!(
        "Sent move {} {} -> {} for game {}",
        intent.piece,
        intent.source,
        intent.target,
        session.game_id()
    );
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Identity, ReconcileOutcome};
    use crate::network::ConnectionState;
    use protocol::{
        AllowedMoveTable, BoardLayout, BoardSnapshot, ChessState, Color, GameDetail, Participant,
        Square, UserId,
    };

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<String>,
        state: Option<ConnectionState>,
    }

    impl MessageSink for RecordingSink {
        fn send_text(&mut self, text: String) -> Result<(), SendError> {
            match self.state {
                Some(state) if state != ConnectionState::Open => {
                    Err(SendError::ChannelUnavailable(state))
                }
                _ => {
                    self.sent.push(text);
                    Ok(())
                }
            }
        }
    }

    fn sq(key: &str) -> Square {
        key.parse().unwrap()
    }

    fn session() -> GameSession {
        let pawn = "wP".parse().unwrap();
        let detail = GameDetail {
            chess_state: ChessState {
                board: BoardSnapshot::empty()
                    .with(sq("e2"), "wP".parse().unwrap())
                    .with(sq("d2"), "wP1".parse().unwrap())
                    .with(sq("e7"), "bP".parse().unwrap()),
                board_layout: BoardLayout::standard(),
                allowed_moves: AllowedMoveTable::new().with(pawn, vec![sq("e3"), sq("e4")]),
                turn: Color::White,
                last_move: None,
            },
            white_user: Some(Participant { id: UserId::new("1"), name: "alice".to_string() }),
            black_user: Some(Participant { id: UserId::new("2"), name: "bob".to_string() }),
            last_move: None,
            winner: None,
        };
        GameSession::from_detail(
            "game-42",
            Identity { user_id: UserId::new("1"), token: "secret".to_string() },
            detail,
        )
    }

    #[test]
    fn test_click_then_dispatch_sends_envelope() {
        let mut session = session();
        let mut sink = RecordingSink::default();

        assert!(session.click(sq("e2")).is_none());
        let intent = session.click(sq("e4")).unwrap();
        dispatch(&session, &intent, &mut sink).unwrap();

        assert_eq!(sink.sent.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&sink.sent[0]).unwrap();
        assert_eq!(value["type"], "game_update");
        assert_eq!(value["payload"]["piece"], "wP");
        assert_eq!(value["payload"]["source"], "e2");
        assert_eq!(value["payload"]["destination"], "e4");
        assert_eq!(value["payload"]["game_id"], "game-42");
        assert_eq!(value["payload"]["token"], "secret");

        // 本地快照保持不变，等待服务端确认
        assert_eq!(session.store().piece_at(sq("e2")).map(|p| p.as_str()), Some("wP"));
        assert!(session.store().piece_at(sq("e4")).is_none());
    }

    #[test]
    fn test_invalid_target_is_not_sent() {
        let session = session();
        let mut sink = RecordingSink::default();
        let intent = PendingMoveIntent {
            piece: "wP".parse().unwrap(),
            source: sq("e2"),
            target: sq("e5"),
        };
        let err = dispatch(&session, &intent, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Invalid(ValidationError::TargetNotAllowed { .. })
        ));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_own_piece_target_is_not_sent() {
        let session = session();
        let mut sink = RecordingSink::default();
        let intent = PendingMoveIntent {
            piece: "wP".parse().unwrap(),
            source: sq("e2"),
            target: sq("d2"),
        };
        let err = dispatch(&session, &intent, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Invalid(ValidationError::OwnPieceAtTarget { .. })
        ));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_send_while_connecting_fails() {
        let session = session();
        let mut sink = RecordingSink {
            state: Some(ConnectionState::Connecting),
            ..Default::default()
        };
        let intent = PendingMoveIntent {
            piece: "wP".parse().unwrap(),
            source: sq("e2"),
            target: sq("e4"),
        };
        let err = dispatch(&session, &intent, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Channel(SendError::ChannelUnavailable(ConnectionState::Connecting))
        ));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_game_over_blocks_dispatch() {
        let mut session = session();
        let finished = serde_json::json!({
            "status": "success",
            "payload": {
                "chess_state": {
                    "board": { "e2": "wP" },
                    "board_layout": BoardLayout::standard(),
                    "allowed_moves": { "wP": ["e3", "e4"] },
                    "turn": "black"
                },
                "winner": "white"
            }
        });
        assert_eq!(
            session.apply_inbound(&finished.to_string()),
            ReconcileOutcome::Applied { terminal: true }
        );

        let mut sink = RecordingSink::default();
        let intent = PendingMoveIntent {
            piece: "wP".parse().unwrap(),
            source: sq("e2"),
            target: sq("e4"),
        };
        assert!(matches!(
            dispatch(&session, &intent, &mut sink),
            Err(DispatchError::GameOver)
        ));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_game_over_latches_across_snapshots() {
        let mut session = session();
        let finished = serde_json::json!({
            "status": "success",
            "payload": {
                "chess_state": {
                    "board": { "e2": "wP" },
                    "board_layout": BoardLayout::standard(),
                    "allowed_moves": {},
                    "turn": "white"
                },
                "winner": "black"
            }
        });
        session.apply_inbound(&finished.to_string());

        // 之后的快照不带胜负，仍不得重新接受走法
        let later = serde_json::json!({
            "status": "success",
            "payload": {
                "chess_state": {
                    "board": { "e2": "wP" },
                    "board_layout": BoardLayout::standard(),
                    "allowed_moves": { "wP": ["e3", "e4"] },
                    "turn": "white"
                }
            }
        });
        assert_eq!(
            session.apply_inbound(&later.to_string()),
            ReconcileOutcome::Applied { terminal: true }
        );

        let mut sink = RecordingSink::default();
        let intent = PendingMoveIntent {
            piece: "wP".parse().unwrap(),
            source: sq("e2"),
            target: sq("e4"),
        };
        assert!(matches!(
            dispatch(&session, &intent, &mut sink),
            Err(DispatchError::GameOver)
        ));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_server_rejection_keeps_snapshot() {
        let mut session = session();
        let before = session.store().board().clone();
        let outcome = session.apply_inbound(r#"{"status":"error","message":"Not your turn"}"#);
        assert_eq!(
            outcome,
            ReconcileOutcome::Rejected { reason: "Not your turn".to_string() }
        );
        assert_eq!(session.store().board(), &before);
    }
}
