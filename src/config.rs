//! 启动配置，全部来自环境变量

use crate::aniskip::ANISKIP_API_BASE;
use crate::jikan::JIKAN_API_BASE;
use crate::template::DEFAULT_TEMPLATE_URL;
use crate::tmdb::{TMDB_API_BASE, TMDB_DEFAULT_LANGUAGE};
use std::path::PathBuf;

/// 默认 CORS 代理 (allorigins `/get` 接口)
pub const DEFAULT_CORS_PROXY: &str = "https://api.allorigins.win/get?url=";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub tmdb_api_key: String,
    pub tmdb_language: String,
    pub tmdb_api_base: String,
    pub jikan_api_base: String,
    pub aniskip_api_base: String,
    pub template_url: String,
    /// 为空时直接请求目标页面
    pub cors_proxy: Option<String>,
    pub settings_path: PathBuf,
    pub default_google_api_keys: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            tmdb_api_key: String::new(),
            tmdb_language: TMDB_DEFAULT_LANGUAGE.to_string(),
            tmdb_api_base: TMDB_API_BASE.to_string(),
            jikan_api_base: JIKAN_API_BASE.to_string(),
            aniskip_api_base: ANISKIP_API_BASE.to_string(),
            template_url: DEFAULT_TEMPLATE_URL.to_string(),
            cors_proxy: Some(DEFAULT_CORS_PROXY.to_string()),
            settings_path: PathBuf::from("settings.json"),
            default_google_api_keys: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 便于测试的读取方式
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        AppConfig {
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            tmdb_api_key: non_empty("TMDB_API_KEY").unwrap_or(defaults.tmdb_api_key),
            tmdb_language: non_empty("TMDB_LANGUAGE").unwrap_or(defaults.tmdb_language),
            tmdb_api_base: non_empty("TMDB_API_BASE").unwrap_or(defaults.tmdb_api_base),
            jikan_api_base: non_empty("JIKAN_API_BASE").unwrap_or(defaults.jikan_api_base),
            aniskip_api_base: non_empty("ANISKIP_API_BASE").unwrap_or(defaults.aniskip_api_base),
            template_url: non_empty("TEMPLATE_URL").unwrap_or(defaults.template_url),
            // 显式设置为空字符串表示不使用代理
            cors_proxy: match lookup("CORS_PROXY_URL") {
                Some(v) if v.trim().is_empty() => None,
                Some(v) => Some(v.trim().to_string()),
                None => defaults.cors_proxy,
            },
            settings_path: non_empty("SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            default_google_api_keys: non_empty("DEFAULT_GOOGLE_API_KEYS")
                .map(|v| {
                    v.split(',')
                        .map(|k| k.trim().to_string())
                        .filter(|k| !k.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.default_google_api_keys),
        }
    }
}
