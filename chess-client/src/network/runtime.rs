//! 客户端事件循环
//!
//! 单一事件循环串行处理用户输入与连接事件，会话状态不跨任务共享。

use std::str::FromStr;

use protocol::{Connector, Square};
use thiserror::Error;
use tokio::sync::mpsc;

use super::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use super::dispatcher::{dispatch, DispatchError};
use crate::board::Renderer;
use crate::game::{GameSession, PendingMoveIntent, ReconcileOutcome};

/// 用户输入命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// 点击格子
    Click(Square),
    /// 拖放棋子
    Drag { from: Square, to: Square },
    /// 放弃当前选中
    Cancel,
    /// 重绘棋盘
    Show,
    Quit,
}

/// 命令解析错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),
}

fn parse_square(key: &str) -> Result<Square, CommandError> {
    key.parse()
        .map_err(|_| CommandError::InvalidSquare(key.to_string()))
}

impl FromStr for UserCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("click" | "c", [square]) => Ok(UserCommand::Click(parse_square(square)?)),
            ("click" | "c", _) => Err(CommandError::Usage("click <square>")),
            ("move" | "drag" | "m", [from, to]) => Ok(UserCommand::Drag {
                from: parse_square(from)?,
                to: parse_square(to)?,
            }),
            ("move" | "drag" | "m", _) => Err(CommandError::Usage("move <from> <to>")),
            ("cancel", []) => Ok(UserCommand::Cancel),
            ("show" | "board", []) => Ok(UserCommand::Show),
            ("quit" | "exit" | "q", []) => Ok(UserCommand::Quit),
            (other, _) => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

enum Wake {
    Command(Option<UserCommand>),
    Connection(ConnectionEvent),
}

/// 客户端运行时：会话 + 连接 + 渲染层
pub struct ClientRuntime<C: Connector, R: Renderer> {
    session: GameSession,
    connection: ConnectionManager<C>,
    renderer: R,
}

impl<C: Connector, R: Renderer> ClientRuntime<C, R> {
    pub fn new(session: GameSession, connection: ConnectionManager<C>, renderer: R) -> Self {
        Self {
            session,
            connection,
            renderer,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// 运行直到用户退出或输入端关闭；退出时主动关闭连接
    pub async fn run(&mut self, mut commands: mpsc::UnboundedReceiver<UserCommand>) {
        self.redraw();
        loop {
            let wake = tokio::select! {
                command = commands.recv() => Wake::Command(command),
                event = self.connection.next_event() => Wake::Connection(event),
            };

            match wake {
                Wake::Command(None) | Wake::Command(Some(UserCommand::Quit)) => break,
                Wake::Command(Some(command)) => self.handle_command(command),
                Wake::Connection(event) => self.handle_event(event),
            }
        }

        self.connection.close();
        self.renderer.connection_changed(self.connection.state());
        tracing::info!("Client runtime stopped for game {}", self.session.game_id());
    }

    fn handle_command(&mut self, command: UserCommand) {
        let intent = match command {
            UserCommand::Click(square) => self.session.click(square),
            UserCommand::Drag { from, to } => self.session.drag_drop(from, to),
            UserCommand::Cancel => {
                self.session.clear_selection();
                None
            }
            UserCommand::Show | UserCommand::Quit => None,
        };
        if let Some(intent) = intent {
            self.send_move(intent);
        }
        self.redraw();
    }

    fn send_move(&mut self, intent: PendingMoveIntent) {
        match dispatch(&self.session, &intent, &mut self.connection) {
            Ok(_) => {}
            Err(DispatchError::Invalid(e)) => {
                tracing::debug!("Refused move intent: {}", e);
            }
            Err(e) => {
                tracing::warn!("Move {} -> {} dropped: {}", intent.source, intent.target, e);
                self.renderer.show_error(&e.to_string());
            }
        }
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { .. } => {
                self.renderer.connection_changed(ConnectionState::Open);
            }
            ConnectionEvent::Message(text) => match self.session.apply_inbound(&text) {
                ReconcileOutcome::Applied { terminal } => {
                    let store = self.session.store();
                    tracing::debug!(
                        "Snapshot revision {} applied at {:?}",
                        store.revision(),
                        store.updated_at()
                    );
                    if terminal {
                        tracing::info!("Game {} finished", self.session.game_id());
                    }
                    self.redraw();
                }
                ReconcileOutcome::Rejected { reason } => {
                    self.renderer.show_error(&reason);
                    self.redraw();
                }
                ReconcileOutcome::Ignored { .. } => {}
            },
            ConnectionEvent::Closed { .. } | ConnectionEvent::Reconnecting { .. } => {
                self.renderer.connection_changed(self.connection.state());
            }
        }
    }

    fn redraw(&mut self) {
        let view = self.session.view();
        self.renderer.render(&view);
    }
}
