//! 协议常量定义

use std::time::Duration;

/// 棋盘边长（文件数 = 行数）
pub const BOARD_SIZE: usize = 8;

/// 空格子的棋子编码（服务端旧格式）
pub const EMPTY_PIECE_CODE: &str = "---";

/// 走棋消息类型
pub const GAME_UPDATE_TYPE: &str = "game_update";

/// REST 接口成功响应标识
pub const SUCCESS_RESPONSE_KEY: &str = "SUCCESS";

/// 默认服务器地址
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// WebSocket 路径
pub const WS_PATH: &str = "/ws";

/// 断线重连间隔（毫秒），固定间隔，不做指数退避
pub const RECONNECT_DELAY_MS: u64 = 5000;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 断线重连间隔 Duration
pub const RECONNECT_DELAY: Duration = Duration::from_millis(RECONNECT_DELAY_MS);

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
