//! 播放页模板替换

use crate::http_client::{get_text, HttpClientError};
use crate::settings::DEFAULT_THEME;
use crate::types::PlayerConfig;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

/// 默认远程模板地址
pub const DEFAULT_TEMPLATE_URL: &str =
    "https://cdn.jsdelivr.net/gh/geminiproai37-blip/styles-sadsd@main/PLAYER-APPs/player_template.html";

const THEME_TOKEN: &str = "\"${theme}\"";
const GOOGLE_API_KEYS_TOKEN: &str = "${escapedGoogleApiKeys}";
const CONTENT_CONFIG_TOKEN: &str = "${escapedContentConfig}";
const LANGUAGE_SERVERS_TOKEN: &str = "${escapedLanguageServers}";
const DOWNLOAD_SERVERS_TOKEN: &str = "${escapedDownloadServers}";

/// 模板来源
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch_template(&self) -> Result<String, HttpClientError>;
}

/// 通过 HTTP 获取模板
pub struct RemoteTemplate {
    url: String,
}

impl RemoteTemplate {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl TemplateSource for RemoteTemplate {
    async fn fetch_template(&self) -> Result<String, HttpClientError> {
        info!("📄 获取播放页模板: {}", self.url);
        get_text(&self.url).await
    }
}

/// 固定模板
pub struct StaticTemplate(pub String);

#[async_trait]
impl TemplateSource for StaticTemplate {
    async fn fetch_template(&self) -> Result<String, HttpClientError> {
        Ok(self.0.clone())
    }
}

/// 用配置替换模板中的占位符
pub fn render_player_page(template: &str, config: &PlayerConfig) -> Result<String, serde_json::Error> {
    let mut content = config.content.clone();
    let theme = content
        .theme
        .take()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_THEME.to_string());

    let html = template
        .replace(THEME_TOKEN, &serde_json::to_string(&theme)?)
        .replace(GOOGLE_API_KEYS_TOKEN, &script_json(&config.google_api_keys)?)
        .replace(CONTENT_CONFIG_TOKEN, &script_json(&content)?)
        .replace(LANGUAGE_SERVERS_TOKEN, &script_json(&config.language_servers)?)
        .replace(DOWNLOAD_SERVERS_TOKEN, &script_json(&config.download_servers)?);

    debug!("播放页生成完成: {} 字节, 主题 {}", html.len(), theme);
    Ok(html)
}

/// 可以直接嵌入 `<script>` 的 JSON
fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
