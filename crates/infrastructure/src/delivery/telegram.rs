//! Telegram Bot API 推送实现

use std::time::Duration;

use async_trait::async_trait;
use curator_core::{
    config::DeliveryConfig, CuratorError, CuratorResult, DeliverySink, MediaKind, OutgoingMessage,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// 单条相册消息最多包含的媒体数
const MAX_MEDIA_GROUP: usize = 10;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

pub struct TelegramDeliverySink {
    client: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramDeliverySink {
    pub fn new(config: &DeliveryConfig) -> CuratorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| CuratorError::Configuration(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call(&self, method: &str, form: Form) -> CuratorResult<serde_json::Value> {
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| CuratorError::Delivery(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CuratorError::Delivery(e.to_string()))?;
        debug!("Telegram {} 返回状态 {}", method, status);
        parse_response(status, &body)
    }

    fn file_part(name: String, blob: &[u8]) -> Part {
        Part::bytes(blob.to_vec()).file_name(name)
    }
}

/// 把接口返回转换为结果，区分限流、网络和拒绝三类错误
fn parse_response(status: StatusCode, body: &str) -> CuratorResult<serde_json::Value> {
    let parsed: Option<ApiResponse> = serde_json::from_str(body).ok();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = parsed
            .as_ref()
            .and_then(|r| r.parameters.as_ref())
            .and_then(|p| p.retry_after)
            .unwrap_or(1);
        warn!("推送被限流, {} 秒后重试", retry_after_secs);
        return Err(CuratorError::RateLimited { retry_after_secs });
    }

    if status.is_server_error() {
        return Err(CuratorError::Delivery(format!("服务端错误: {status}")));
    }

    match parsed {
        Some(ApiResponse {
            ok: true,
            result: Some(result),
            ..
        }) => Ok(result),
        Some(response) => Err(CuratorError::DeliveryRejected(
            response
                .description
                .unwrap_or_else(|| format!("HTTP {status}")),
        )),
        None => Err(CuratorError::DeliveryRejected(format!(
            "无法解析的响应: HTTP {status}"
        ))),
    }
}

/// 取出消息ID，相册消息取第一条
fn message_id(result: &serde_json::Value) -> CuratorResult<i64> {
    let message = match result {
        serde_json::Value::Array(messages) => messages.first(),
        other => Some(other),
    };
    message
        .and_then(|m| m.get("message_id"))
        .and_then(|id| id.as_i64())
        .ok_or_else(|| CuratorError::DeliveryRejected("响应中缺少message_id".to_string()))
}

#[async_trait]
impl DeliverySink for TelegramDeliverySink {
    async fn send(&self, message: &OutgoingMessage) -> CuratorResult<i64> {
        let media = &message.media[..message.media.len().min(MAX_MEDIA_GROUP)];

        let base = Form::new()
            .text("chat_id", message.chat_id.to_string())
            .text("parse_mode", "HTML");

        let result = match (message.media_kind, media) {
            (_, []) => return self.send_text(message.chat_id, &message.caption).await,
            (MediaKind::Dynamic, [first, ..]) => {
                let form = base
                    .text("caption", message.caption.clone())
                    .part("animation", Self::file_part("animation.mp4".to_string(), first));
                self.call("sendAnimation", form).await?
            }
            (MediaKind::Static, [single]) => {
                let form = base
                    .text("caption", message.caption.clone())
                    .part("photo", Self::file_part("photo.jpg".to_string(), single));
                self.call("sendPhoto", form).await?
            }
            (MediaKind::Static, blobs) => {
                let descriptors: Vec<serde_json::Value> = (0..blobs.len())
                    .map(|i| {
                        if i == 0 {
                            json!({
                                "type": "photo",
                                "media": format!("attach://file{i}"),
                                "caption": message.caption,
                                "parse_mode": "HTML",
                            })
                        } else {
                            json!({ "type": "photo", "media": format!("attach://file{i}") })
                        }
                    })
                    .collect();

                let mut form = Form::new()
                    .text("chat_id", message.chat_id.to_string())
                    .text("media", serde_json::Value::Array(descriptors).to_string());
                for (i, blob) in blobs.iter().enumerate() {
                    form = form.part(format!("file{i}"), Self::file_part(format!("file{i}.jpg"), blob));
                }
                self.call("sendMediaGroup", form).await?
            }
        };

        message_id(&result)
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> CuratorResult<i64> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("text", text.to_string())
            .text("parse_mode", "HTML");
        let result = self.call("sendMessage", form).await?;
        message_id(&result)
    }
}
