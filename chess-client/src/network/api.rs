//! REST 接口客户端
//!
//! 会话开始时获取一次对局详情，用于播种快照与确定视角。

use std::time::Duration;

use protocol::{ApiResponse, GameDetail};
use thiserror::Error;
use url::Url;

/// REST 请求错误
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Server rejected request ({key}): {message}")]
    Rejected { key: String, message: String },

    #[error("Response carried no game data")]
    MissingData,
}

/// 对局 REST 客户端
#[derive(Debug, Clone)]
pub struct GameApi {
    client: reqwest::Client,
}

impl GameApi {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// 获取对局详情
    pub async fn fetch_game(&self, url: Url) -> Result<GameDetail, ApiError> {
        tracing::info!("Fetching game from {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let preview: String = body.chars().take(200).collect();
        tracing::debug!("Game response: {}", preview);
        parse_game_response(&body)
    }
}

/// 解析对局详情响应
pub fn parse_game_response(body: &str) -> Result<GameDetail, ApiError> {
    let response: ApiResponse<GameDetail> = serde_json::from_str(body)?;
    if !response.is_success() {
        return Err(ApiError::Rejected {
            message: response.response_message.unwrap_or_default(),
            key: response.response_key,
        });
    }
    response.data.ok_or(ApiError::MissingData)
}
