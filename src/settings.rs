//! 高级设置 (主题与 Google API Key)
//! 保存在本地 JSON 文件中

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// 默认主题
pub const DEFAULT_THEME: &str = "orange";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSettings {
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub google_api_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            google_api_keys: Vec::new(),
            updated_at: None,
        }
    }
}

impl AdvancedSettings {
    /// 读取设置；文件不存在时使用默认值，Key 列表为空时使用默认 Key
    pub fn load(path: &Path, default_keys: &[String]) -> Result<Self> {
        let mut settings = if path.exists() {
            let data = fs::read_to_string(path)
                .with_context(|| format!("读取设置文件失败 {}", path.display()))?;
            serde_json::from_str::<AdvancedSettings>(&data)
                .with_context(|| format!("解析设置文件失败 {}", path.display()))?
        } else {
            AdvancedSettings::default()
        };

        if settings.theme.trim().is_empty() {
            settings.theme = DEFAULT_THEME.to_string();
        }
        settings.google_api_keys = clean_keys(&settings.google_api_keys);
        if settings.google_api_keys.is_empty() {
            settings.google_api_keys = clean_keys(default_keys);
        }
        Ok(settings)
    }

    /// 保存设置，只写入非空 Key
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.google_api_keys = clean_keys(&self.google_api_keys);
        self.updated_at = Some(Utc::now());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建设置目录失败 {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).with_context(|| format!("写入设置文件失败 {}", path.display()))?;

        info!("💾 高级设置已保存: 主题 {}, {} 个 Key", self.theme, self.google_api_keys.len());
        Ok(())
    }
}

/// 去掉首尾空白并丢弃空 Key
pub fn clean_keys(keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
