//! 客户端配置
//!
//! 提供配置数据结构与持久化；命令行参数在启动时覆盖文件中的值。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use protocol::{CONNECT_TIMEOUT_SECS, DEFAULT_SERVER_URL, RECONNECT_DELAY_MS, WS_PATH};
use serde::{Deserialize, Serialize};
use url::Url;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// 对应的 EnvFilter 指令
    pub fn directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    // === 服务器 ===
    /// HTTP 基础地址，WebSocket 地址由它推导
    pub server_url: String,
    /// WebSocket 路径
    pub ws_path: String,

    // === 连接 ===
    /// 非正常断开后的重连间隔（毫秒）
    pub reconnect_delay_ms: u64,
    /// 握手超时（秒）
    pub connect_timeout_secs: u64,

    // === 身份 ===
    pub user_id: Option<String>,
    pub token: Option<String>,

    // === 高级 ===
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_path: WS_PATH.to_string(),
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            user_id: None,
            token: None,
            log_level: LogLevel::default(),
        }
    }
}

impl ClientConfig {
    /// 默认配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("chess-client");
            path.push("config.json");
            path
        })
    }

    /// 从指定文件加载；失败时记录原因并使用默认配置
    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(Some(config)) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Ok(None) => {
                tracing::info!("Config file {:?} not found, using defaults", path);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// 读取配置文件；文件不存在时返回 None
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {:?}", path))?;
        Ok(Some(config))
    }

    /// 日志过滤指令，覆盖客户端与协议两个 crate
    pub fn log_directives(&self) -> [String; 2] {
        let level = self.log_level.directive();
        [format!("chess_client={}", level), format!("protocol={}", level)]
    }

    /// 保存到指定文件
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file {:?}", path))?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.server_url)
            .with_context(|| format!("invalid server url '{}'", self.server_url))
    }

    /// 对局详情地址：`{server}/api/chess/game/{id}`
    pub fn game_url(&self, game_id: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("server url '{}' cannot be a base", self.server_url))?
            .pop_if_empty()
            .extend(["api", "chess", "game", game_id]);
        Ok(url)
    }

    /// WebSocket 地址：http 换成 ws，https 换成 wss
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => anyhow::bail!("unsupported server scheme '{}'", other),
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("cannot switch '{}' to {}", self.server_url, scheme))?;
        url.set_path(&self.ws_path);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.reconnect_delay(), Duration::from_millis(5000));
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_derived_urls() {
        let config = ClientConfig {
            server_url: "https://chess.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.game_url("abc").unwrap().as_str(),
            "https://chess.example.com/api/chess/game/abc"
        );
        assert_eq!(config.ws_url().unwrap().as_str(), "wss://chess.example.com/ws");

        let local = ClientConfig::default();
        assert_eq!(local.ws_url().unwrap().as_str(), "ws://127.0.0.1:8080/ws");
    }

    #[test]
    fn test_unsupported_scheme() {
        let config = ClientConfig {
            server_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.ws_url().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = ClientConfig {
            reconnect_delay_ms: 250,
            user_id: Some("7".to_string()),
            log_level: LogLevel::Debug,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(ClientConfig::load_from(&path), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token": "abc"}"#).unwrap();
        let config = ClientConfig::load_from(&path);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.reconnect_delay_ms, 5000);
    }

    #[test]
    fn test_read_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::read(&dir.path().join("missing.json")).unwrap().is_none());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        let err = ClientConfig::read(&broken).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid config file"));
    }

    #[test]
    fn test_log_directives_cover_protocol() {
        let config = ClientConfig {
            log_level: LogLevel::Warn,
            ..Default::default()
        };
        assert_eq!(
            config.log_directives(),
            ["chess_client=warn".to_string(), "protocol=warn".to_string()]
        );
    }

    #[test]
    fn test_invalid_or_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(ClientConfig::load_from(&missing), ClientConfig::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "not json").unwrap();
        assert_eq!(ClientConfig::load_from(&broken), ClientConfig::default());
    }
}
