//! 走法校验
//!
//! 只做可走表成员检查，不做任何规则判断；走法合法性以服务端为准。

use protocol::{AllowedMoveTable, BoardSnapshot, PieceId, Square};
use thiserror::Error;

use super::input::PendingMoveIntent;

/// 走法意图被拒绝的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 可走表中没有该棋子
    #[error("No allowed moves for {piece}")]
    NoAllowedMoves { piece: PieceId },

    /// 目标不在该棋子的可走列表中
    #[error("{target} is not an allowed destination for {piece}")]
    TargetNotAllowed { piece: PieceId, target: Square },

    /// 目标格被己方棋子占据
    #[error("{target} is occupied by a friendly piece")]
    OwnPieceAtTarget { target: Square },
}

/// 校验走法意图
///
/// 目标在 `table[piece]` 中且不被同色棋子占据时通过。
/// 同色检查独立于可走表，防止过期或错误的可走表放行。
pub fn validate(
    intent: &PendingMoveIntent,
    table: &AllowedMoveTable,
    board: &BoardSnapshot,
) -> Result<(), ValidationError> {
    if board.is_occupied_by(intent.target, intent.piece.color()) {
        return Err(ValidationError::OwnPieceAtTarget {
            target: intent.target,
        });
    }
    if !table.has_entry(&intent.piece) {
        return Err(ValidationError::NoAllowedMoves {
            piece: intent.piece.clone(),
        });
    }
    if !table.contains(&intent.piece, intent.target) {
        return Err(ValidationError::TargetNotAllowed {
            piece: intent.piece.clone(),
            target: intent.target,
        });
    }
    Ok(())
}

/// [`validate`] 的布尔形式
pub fn is_allowed(
    intent: &PendingMoveIntent,
    table: &AllowedMoveTable,
    board: &BoardSnapshot,
) -> bool {
    validate(intent, table, board).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(key: &str) -> Square {
        key.parse().unwrap()
    }

    fn id(code: &str) -> PieceId {
        code.parse().unwrap()
    }

    fn intent(piece: &str, source: &str, target: &str) -> PendingMoveIntent {
        PendingMoveIntent {
            piece: id(piece),
            source: sq(source),
            target: sq(target),
        }
    }

    fn board() -> BoardSnapshot {
        BoardSnapshot::empty()
            .with(sq("d1"), id("wQ"))
            .with(sq("d2"), id("wP4"))
            .with(sq("h5"), id("bP8"))
    }

    #[test]
    fn test_piece_without_entry_is_rejected() {
        let table = AllowedMoveTable::new().with(id("wP4"), vec![sq("d3")]);
        for target in ["a1", "d3", "h5", "e4"] {
            assert_eq!(
                validate(&intent("wQ", "d1", target), &table, &board()),
                Err(ValidationError::NoAllowedMoves { piece: id("wQ") })
            );
        }
    }

    #[test]
    fn test_listed_target_is_accepted() {
        let table = AllowedMoveTable::new()
            .with(id("wQ"), vec![sq("e2"), sq("f3"), sq("g4"), sq("h5")])
            .with(id("wP4"), vec![sq("d3"), sq("d4")]);
        for (piece, source, target) in [
            ("wQ", "d1", "e2"),
            ("wQ", "d1", "h5"),
            ("wP4", "d2", "d3"),
            ("wP4", "d2", "d4"),
        ] {
            assert!(is_allowed(&intent(piece, source, target), &table, &board()));
        }
    }

    #[test]
    fn test_unlisted_target_is_rejected() {
        let table = AllowedMoveTable::new().with(id("wP4"), vec![sq("d3"), sq("d4")]);
        assert_eq!(
            validate(&intent("wP4", "d2", "d5"), &table, &board()),
            Err(ValidationError::TargetNotAllowed { piece: id("wP4"), target: sq("d5") })
        );
    }

    #[test]
    fn test_own_piece_at_target_rejected_despite_table() {
        // 过期的可走表仍列出被己方占据的格子
        let table = AllowedMoveTable::new().with(id("wQ"), vec![sq("d2"), sq("d3")]);
        assert_eq!(
            validate(&intent("wQ", "d1", "d2"), &table, &board()),
            Err(ValidationError::OwnPieceAtTarget { target: sq("d2") })
        );
    }

    #[test]
    fn test_capture_of_opponent_piece_is_accepted() {
        let table = AllowedMoveTable::new().with(id("wQ"), vec![sq("h5")]);
        assert!(is_allowed(&intent("wQ", "d1", "h5"), &table, &board()));
    }
}
