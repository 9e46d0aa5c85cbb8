//! 从已生成的播放页中提取配置

use crate::settings::DEFAULT_THEME;
use crate::types::{ContentConfig, DownloadServer, LanguageServers, PlayerConfig, VideoServer};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

static CONTENT_CONFIG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.contentConfig\s*=\s*").expect("invalid regex"));
static LANGUAGE_SERVERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.languageServers\s*=\s*").expect("invalid regex"));
static DOWNLOAD_SERVERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.downloadServers\s*=\s*").expect("invalid regex"));
static GOOGLE_API_KEYS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.GOOGLE_API_KEYS\s*=\s*").expect("invalid regex"));

static HTML_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("html").expect("invalid selector"));

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("页面内容为空")]
    Empty,
    #[error("页面中找不到 {0}")]
    Missing(&'static str),
    #[error("{name} 不是合法的 JSON: {source}")]
    InvalidJson {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// 解析播放页，取回嵌入的配置对象
pub fn parse_player_page(html: &str) -> Result<PlayerConfig, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    let mut content: ContentConfig =
        extract_assignment(html, &CONTENT_CONFIG_RE, "window.contentConfig")?
            .ok_or(ExtractError::Missing("window.contentConfig"))?;
    let language_servers: LanguageServers<VideoServer> =
        extract_assignment(html, &LANGUAGE_SERVERS_RE, "window.languageServers")?
            .ok_or(ExtractError::Missing("window.languageServers"))?;
    let download_servers: LanguageServers<DownloadServer> =
        extract_assignment(html, &DOWNLOAD_SERVERS_RE, "window.downloadServers")?
            .ok_or(ExtractError::Missing("window.downloadServers"))?;
    let google_api_keys =
        extract_assignment(html, &GOOGLE_API_KEYS_RE, "window.GOOGLE_API_KEYS")?.unwrap_or_default();

    content.theme = Some(extract_theme(html).unwrap_or_else(|| DEFAULT_THEME.to_string()));

    debug!(
        "页面解析完成: 标题 {:?}, 播放语言 {:?}, {} 个下载语言",
        content.title,
        language_servers.languages().collect::<Vec<_>>(),
        download_servers.len()
    );
    Ok(PlayerConfig {
        content,
        language_servers,
        download_servers,
        google_api_keys,
    })
}

/// 找到 `window.xxx = ` 之后的第一个 JSON 值
fn extract_assignment<T: DeserializeOwned>(
    html: &str,
    pattern: &Regex,
    name: &'static str,
) -> Result<Option<T>, ExtractError> {
    let Some(m) = pattern.find(html) else {
        return Ok(None);
    };
    let mut de = serde_json::Deserializer::from_str(&html[m.end()..]);
    T::deserialize(&mut de)
        .map(Some)
        .map_err(|source| ExtractError::InvalidJson { name, source })
}

/// `<html data-theme="...">`
fn extract_theme(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&HTML_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("data-theme"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// allorigins `/get` 接口的响应
#[derive(Debug, Deserialize)]
pub struct ProxyResponse {
    pub contents: Option<String>,
}
