//! 网络连接管理
//!
//! 持有唯一的连接实例：建立连接、检测断开、按固定间隔重连。
//! 所有状态转换都在 [`ConnectionManager::next_event`] 返回前同步完成，
//! 建立连接与读写由后台任务完成，只通过通道回报事件。

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use protocol::{ChannelEvent, ChannelHandle, Connector};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, Sleep};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// 任一方主动关闭，不再重连
    ClosedClean,
    /// 异常断开，等待重连
    ClosedUnclean,
}

/// 发送失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// 连接未打开，消息被丢弃
    #[error("Channel unavailable (state: {0:?})")]
    ChannelUnavailable(ConnectionState),

    /// 连接实例已结束，关闭事件尚未处理
    #[error("Channel closed")]
    ChannelClosed,
}

/// 连接管理器向上层报告的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// 握手成功
    Opened { instance: u64 },
    /// 收到一条文本消息
    Message(String),
    /// 连接关闭；非正常关闭时已安排一次重连
    Closed { clean: bool },
    /// 重连计时结束，开始新一次连接
    Reconnecting { instance: u64 },
}

/// 出站文本的接收方
pub trait MessageSink {
    /// 同步发送；未打开时立即失败，不排队也不重试
    fn send_text(&mut self, text: String) -> Result<(), SendError>;
}

/// 连接管理器
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    url: String,
    reconnect_delay: Duration,
    state: ConnectionState,
    /// 已创建的连接实例数，每次连接尝试递增，旧实例从不复用
    instance: u64,
    channel: Option<ChannelHandle>,
    connecting: Option<JoinHandle<protocol::Result<ChannelHandle>>>,
    reconnect: Option<Pin<Box<Sleep>>>,
}

enum Wake {
    Connected(Result<protocol::Result<ChannelHandle>, JoinError>),
    Channel(Option<ChannelEvent>),
    ReconnectDue,
}

impl<C: Connector> ConnectionManager<C> {
    /// 创建管理器并立即发起第一次连接（需在 tokio 运行时内调用）
    pub fn connect(connector: C, url: impl Into<String>, reconnect_delay: Duration) -> Self {
        let mut manager = Self {
            connector: Arc::new(connector),
            url: url.into(),
            reconnect_delay,
            state: ConnectionState::Connecting,
            instance: 0,
            channel: None,
            connecting: None,
            reconnect: None,
        };
        manager.begin_connect();
        manager
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 当前连接实例编号
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 是否有待触发的重连
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// 客户端主动关闭：进入 ClosedClean，不再重连
    pub fn close(&mut self) {
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
        self.reconnect = None;
        if self.channel.take().is_some() {
            tracing::info!("Closing connection to {}", self.url);
        }
        self.state = ConnectionState::ClosedClean;
    }

    /// 等待下一个连接事件
    ///
    /// 可取消：等待点只有任务句柄、通道接收与计时器，状态只在等待结束后同步更新。
    pub async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            let wake = {
                let Self {
                    connecting,
                    channel,
                    reconnect,
                    ..
                } = self;
                tokio::select! {
                    joined = wait_connect(connecting) => Wake::Connected(joined),
                    event = wait_channel(channel) => Wake::Channel(event),
                    () = wait_timer(reconnect) => Wake::ReconnectDue,
                }
            };

            match wake {
                Wake::Connected(joined) => {
                    self.connecting = None;
                    match joined {
                        Ok(Ok(handle)) => {
                            self.channel = Some(handle);
                            self.state = ConnectionState::Open;
                            tracing::info!("Connected to {} (instance {})", self.url, self.instance);
                            return ConnectionEvent::Opened {
                                instance: self.instance,
                            };
                        }
                        Ok(Err(e)) => {
                            tracing::warn!("Connection to {} failed: {}", self.url, e);
                            return self.lost();
                        }
                        Err(e) if e.is_cancelled() => continue,
                        Err(e) => {
                            tracing::error!("Connect task failed: {}", e);
                            return self.lost();
                        }
                    }
                }
                Wake::Channel(Some(ChannelEvent::Text(text))) => {
                    return ConnectionEvent::Message(text);
                }
                Wake::Channel(Some(ChannelEvent::Closed { clean: true })) => {
                    self.channel = None;
                    self.state = ConnectionState::ClosedClean;
                    tracing::info!("Connection to {} closed", self.url);
                    return ConnectionEvent::Closed { clean: true };
                }
                Wake::Channel(Some(ChannelEvent::Closed { clean: false })) | Wake::Channel(None) => {
                    self.channel = None;
                    return self.lost();
                }
                Wake::ReconnectDue => {
                    self.reconnect = None;
                    self.begin_connect();
                    return ConnectionEvent::Reconnecting {
                        instance: self.instance,
                    };
                }
            }
        }
    }

    /// 异常断开：丢弃实例并安排一次重连
    fn lost(&mut self) -> ConnectionEvent {
        self.state = ConnectionState::ClosedUnclean;
        self.reconnect = Some(Box::pin(sleep(self.reconnect_delay)));
        tracing::warn!(
            "Connection to {} lost, reconnecting in {:?}",
            self.url,
            self.reconnect_delay
        );
        ConnectionEvent::Closed { clean: false }
    }

    fn begin_connect(&mut self) {
        self.instance += 1;
        self.state = ConnectionState::Connecting;
        tracing::info!("Connecting to {} (instance {})", self.url, self.instance);
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        self.connecting = Some(tokio::spawn(async move { connector.connect(&url).await }));
    }
}

impl<C: Connector> MessageSink for ConnectionManager<C> {
    fn send_text(&mut self, text: String) -> Result<(), SendError> {
        if self.state != ConnectionState::Open {
            return Err(SendError::ChannelUnavailable(self.state));
        }
        let channel = self
            .channel
            .as_ref()
            .ok_or(SendError::ChannelUnavailable(self.state))?;
        channel.send_text(text).map_err(|_| SendError::ChannelClosed)
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
    }
}

async fn wait_connect(
    slot: &mut Option<JoinHandle<protocol::Result<ChannelHandle>>>,
) -> Result<protocol::Result<ChannelHandle>, JoinError> {
    match slot {
        Some(task) => task.await,
        None => pending().await,
    }
}

async fn wait_channel(slot: &mut Option<ChannelHandle>) -> Option<ChannelEvent> {
    match slot {
        Some(channel) => channel.recv().await,
        None => pending().await,
    }
}

async fn wait_timer(slot: &mut Option<Pin<Box<Sleep>>>) {
    match slot {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}
