//! 传输层抽象
//!
//! 提供 Connector trait 与基于通道的连接句柄，使上层的连接管理与具体传输实现解耦。
//! 每个连接实例由一个后台任务驱动 WebSocket 读写，上层只通过句柄收发文本消息。

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{ProtocolError, Result};
use crate::CONNECT_TIMEOUT;

/// 连接实例产生的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// 收到一条文本消息
    Text(String),
    /// 连接关闭；`clean` 表示任一方主动正常关闭
    Closed { clean: bool },
}

/// 连接句柄
///
/// 丢弃句柄即丢弃该实例及其未发送的缓冲，后台任务随之以正常关闭帧结束。
#[derive(Debug)]
pub struct ChannelHandle {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl ChannelHandle {
    /// 由一对通道构造句柄
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> Self {
        Self { outbound, inbound }
    }

    /// 发送文本（同步入队，不等待写出）
    pub fn send_text(&self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| ProtocolError::ConnectionClosed)
    }

    /// 接收下一个事件；后台任务退出后返回 None
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.inbound.recv().await
    }
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// 建立连接，握手成功后返回句柄
    async fn connect(&self, url: &str) -> Result<ChannelHandle>;
}

// ============================================================================
// WebSocket 实现
// ============================================================================

/// WebSocket 连接器
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: std::time::Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: std::time::Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<ChannelHandle> {
        let (stream, _response) = timeout(self.connect_timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)??;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (mut sink, mut source) = stream.split();

        tokio::spawn(async move {
            let clean = loop {
                tokio::select! {
                    outgoing = out_rx.recv() => match outgoing {
                        Some(text) => {
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                tracing::warn!("WebSocket send failed: {}", e);
                                break false;
                            }
                        }
                        None => {
                            // 句柄已丢弃：主动正常关闭
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: "client closed".into(),
                            };
                            let _ = sink.send(Message::Close(Some(frame))).await;
                            break true;
                        }
                    },
                    incoming = source.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if in_tx.send(ChannelEvent::Text(text.as_str().to_owned())).is_err() {
                                break true;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::debug!("WebSocket close frame: {:?}", frame);
                            break is_clean_close(frame.as_ref());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("WebSocket receive error: {}", e);
                            break false;
                        }
                        None => break false,
                    },
                }
            };
            let _ = in_tx.send(ChannelEvent::Closed { clean });
        });

        tracing::debug!("WebSocket handshake with {} complete", url);
        Ok(ChannelHandle::new(out_tx, in_rx))
    }
}

/// 仅正常关闭码视为主动关闭，其余一律按异常断开处理
fn is_clean_close(frame: Option<&CloseFrame>) -> bool {
    frame.is_some_and(|frame| frame.code == CloseCode::Normal)
}
