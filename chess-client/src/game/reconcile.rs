//! 状态合并：把服务端推送的信封应用到快照存储

use protocol::{ServerEnvelope, Status};

use super::state::{GameSnapshot, SnapshotStore};

/// 一条入站消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// 新快照已整体替换旧快照
    Applied { terminal: bool },
    /// 服务端拒绝了走法，快照未变
    Rejected { reason: String },
    /// 消息格式错误，已忽略，快照未变
    Ignored { diagnostic: String },
}

/// 解析并应用一条入站消息
///
/// 任何格式错误都不会修改存储，也不会 panic。
pub fn reconcile(store: &mut SnapshotStore, text: &str) -> ReconcileOutcome {
    let envelope: ServerEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => return ignored(format!("undecodable envelope: {}", e)),
    };

    match envelope.status {
        Status::Error => {
            let reason = envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "move rejected by server".to_string());
            tracing::info!("Server rejected move: {}", reason);
            ReconcileOutcome::Rejected { reason }
        }
        Status::Success => match envelope.game_update() {
            Ok(update) => {
                let snapshot = GameSnapshot::from(update);
                tracing::debug!(
                    "Applying snapshot: turn={}, pieces={}, allowed={}",
                    snapshot.turn,
                    snapshot.board.pieces().count(),
                    snapshot.allowed_moves.len()
                );
                if let Some(winner) = snapshot.winner {
                    tracing::info!("Game over: {:?}", winner);
                }
                store.replace(snapshot);
                ReconcileOutcome::Applied {
                    terminal: store.is_terminal(),
                }
            }
            Err(e) => ignored(format!("malformed snapshot payload: {}", e)),
        },
    }
}

fn ignored(diagnostic: String) -> ReconcileOutcome {
    tracing::warn!("Ignoring inbound message: {}", diagnostic);
    ReconcileOutcome::Ignored { diagnostic }
}
