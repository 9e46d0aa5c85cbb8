//! 播放页配置的数据模型
//! 与模板中 `window.contentConfig` 等对象的 JSON 结构保持一致

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// 内容类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Tv,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Tv => "tv",
        }
    }

    pub fn is_tv(self) -> bool {
        self == ContentType::Tv
    }
}

/// 视频源类型，`Other` 在输出中不带任何标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSourceKind {
    #[default]
    Other,
    Hls,
    Mp4,
    Gdrive,
    Yandex,
}

/// 播放服务器 (模板格式)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoServer {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hls: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mp4: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub gdrive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub yandex: bool,
}

impl VideoServer {
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: VideoSourceKind) -> Self {
        let mut server = VideoServer {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        };
        match kind {
            VideoSourceKind::Other => {}
            VideoSourceKind::Hls => server.hls = true,
            VideoSourceKind::Mp4 => server.mp4 = true,
            VideoSourceKind::Gdrive => server.gdrive = true,
            VideoSourceKind::Yandex => server.yandex = true,
        }
        server
    }

    /// 标记按 hls → mp4 → gdrive → yandex 的顺序取第一个
    pub fn kind(&self) -> VideoSourceKind {
        if self.hls {
            VideoSourceKind::Hls
        } else if self.mp4 {
            VideoSourceKind::Mp4
        } else if self.gdrive {
            VideoSourceKind::Gdrive
        } else if self.yandex {
            VideoSourceKind::Yandex
        } else {
            VideoSourceKind::Other
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// 下载类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    #[default]
    External,
    Mp4,
}

/// 下载服务器 (模板格式)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadServer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: DownloadKind,
}

/// 语言代码 → 服务器列表，保持插入顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageServers<T> {
    entries: Vec<(String, Vec<T>)>,
}

impl<T> Default for LanguageServers<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> LanguageServers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已存在的语言会被原位覆盖 (与 JSON 对象重复键的语义一致)
    pub fn insert(&mut self, lang: impl Into<String>, servers: Vec<T>) {
        let lang = lang.into();
        match self.entries.iter_mut().find(|(k, _)| *k == lang) {
            Some(entry) => entry.1 = servers,
            None => self.entries.push((lang, servers)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, lang: &str) -> Option<&[T]> {
        self.entries
            .iter()
            .find(|(k, _)| k == lang)
            .map(|(_, v)| v.as_slice())
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Serialize> Serialize for LanguageServers<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (lang, servers) in &self.entries {
            map.serialize_entry(lang, servers)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for LanguageServers<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LanguageServersVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for LanguageServersVisitor<T> {
            type Value = LanguageServers<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("语言代码到服务器列表的对象")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut result = LanguageServers::new();
                while let Some((lang, servers)) = access.next_entry::<String, Vec<T>>()? {
                    result.insert(lang, servers);
                }
                Ok(result)
            }
        }

        deserializer.deserialize_map(LanguageServersVisitor(PhantomData))
    }
}

/// 内容元数据 (`window.contentConfig`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub report_poster_url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_seconds")]
    pub intro_start_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_seconds")]
    pub intro_end_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_seconds")]
    pub ending_start_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub back_url: String,
    #[serde(default)]
    pub go_back_id: String,
    /// 页面中存在但本表单不认识的字段，原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 完整的播放页配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(rename = "contentConfig")]
    pub content: ContentConfig,
    #[serde(rename = "languageServers")]
    pub language_servers: LanguageServers<VideoServer>,
    #[serde(rename = "downloadServers")]
    pub download_servers: LanguageServers<DownloadServer>,
    #[serde(rename = "GOOGLE_API_KEYS", default)]
    pub google_api_keys: Vec<String>,
}

/// 预览卡片信息 (TMDB 或 MyAnimeList)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPreview {
    pub image_url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// "TV" / "Movie" 等
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
}

/// 接受数字或以数字开头的字符串，空值视为缺失，其它值记为 0 秒
fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let seconds = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => leading_number(&s),
        Some(_) => 0.0,
    };
    Ok(Some(if seconds.is_finite() { seconds.max(0.0).round() as u32 } else { 0 }))
}

/// 字符串开头的十进制数 ("1:30" → 1)，没有数字时为 0
fn leading_number(raw: &str) -> f64 {
    let s = raw.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return 0.0;
    }
    s[..end].trim_end_matches('.').parse().unwrap_or(0.0)
}

/// 接受字符串或数字，统一为字符串
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("无效的字符串值: {}", other))),
    }
}
