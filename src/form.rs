//! 编辑表单状态
//! 一个编辑会话包含表单字段、两个标签页管理器和服务器取名器

use crate::languages::ServerNamer;
use crate::settings::AdvancedSettings;
use crate::tabs::{ServerRow, TabError, TabKind, TabManager, VideoRow};
use crate::types::{ContentType, DownloadServer, MediaPreview};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 新标签页的默认语言
pub const DEFAULT_LANGUAGE: &str = "es";

/// 分 + 秒输入框
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTime {
    pub minutes: u32,
    pub seconds: u32,
}

impl ClockTime {
    pub fn from_total_seconds(total: f64) -> Self {
        let total = if total.is_finite() { total.max(0.0) } else { 0.0 };
        let minutes = (total / 60.0).floor() as u32;
        let seconds = (total % 60.0).round() as u32;
        ClockTime { minutes, seconds }
    }

    pub fn total_seconds(self) -> u32 {
        self.minutes.saturating_mul(60).saturating_add(self.seconds)
    }
}

/// 表单字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub content_type: ContentType,
    pub tmdb_id: String,
    pub season: String,
    pub episode: String,
    pub mal_id: String,
    /// 单集时长 (秒)，从 TMDB 获取
    pub episode_length: Option<u32>,
    pub title: String,
    pub synopsis: String,
    pub poster_url: String,
    pub report_poster_url: String,
    pub series_name: String,
    pub chapter_name: String,
    pub back_url: String,
    pub intro_start: ClockTime,
    pub intro_end: ClockTime,
    pub ending_start: ClockTime,
    pub theme: String,
    pub google_api_keys: Vec<String>,
    /// 载入页面时遇到的未知 contentConfig 字段
    pub extra: Map<String, Value>,
}

/// 表单局部更新，缺省字段保持不变
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPatch {
    pub content_type: Option<ContentType>,
    pub tmdb_id: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub mal_id: Option<String>,
    pub episode_length: Option<u32>,
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub poster_url: Option<String>,
    pub report_poster_url: Option<String>,
    pub series_name: Option<String>,
    pub chapter_name: Option<String>,
    pub back_url: Option<String>,
    pub intro_start: Option<ClockTime>,
    pub intro_end: Option<ClockTime>,
    pub ending_start: Option<ClockTime>,
    pub theme: Option<String>,
    pub google_api_keys: Option<Vec<String>>,
}

impl FormState {
    pub fn apply(&mut self, patch: FormPatch) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { self.$field = v; })*
            };
        }
        set!(
            content_type,
            tmdb_id,
            season,
            episode,
            mal_id,
            title,
            synopsis,
            poster_url,
            report_poster_url,
            series_name,
            chapter_name,
            back_url,
            intro_start,
            intro_end,
            ending_start,
            theme,
            google_api_keys,
        );
        if patch.episode_length.is_some() {
            self.episode_length = patch.episode_length;
        }
    }

    /// 把三个时间输入框归零
    pub fn reset_skip_times(&mut self) {
        self.intro_start = ClockTime::default();
        self.intro_end = ClockTime::default();
        self.ending_start = ClockTime::default();
    }
}

/// 一个编辑会话
#[derive(Debug, Clone)]
pub struct EditorSession {
    pub form: FormState,
    pub video: TabManager<VideoRow>,
    pub downloads: TabManager<DownloadServer>,
    pub namer: ServerNamer,
    pub preview: Option<MediaPreview>,
}

impl EditorSession {
    /// 用高级设置初始化，两个列表各带一个默认语言标签页
    pub fn new(settings: &AdvancedSettings) -> Self {
        let mut session = EditorSession {
            form: FormState {
                theme: settings.theme.clone(),
                google_api_keys: settings.google_api_keys.clone(),
                ..Default::default()
            },
            video: TabManager::new(TabKind::Video),
            downloads: TabManager::new(TabKind::Download),
            namer: ServerNamer::default(),
            preview: None,
        };
        session.ensure_default_tabs();
        session
    }

    /// 列表为空时补一个默认语言标签页
    pub fn ensure_default_tabs(&mut self) {
        if self.video.tabs().is_empty() {
            self.video.add_tab(DEFAULT_LANGUAGE, Vec::new(), &mut self.namer);
        }
        if self.downloads.tabs().is_empty() {
            self.downloads.add_tab(DEFAULT_LANGUAGE, Vec::new(), &mut self.namer);
        }
    }

    /// 添加标签页，返回标签页 ID
    pub fn add_tab(&mut self, kind: TabKind, lang: &str) -> String {
        match kind {
            TabKind::Video => self.video.add_tab(lang, Vec::new(), &mut self.namer),
            TabKind::Download => self.downloads.add_tab(lang, Vec::new(), &mut self.namer),
        }
    }

    pub fn delete_tab(&mut self, kind: TabKind, tab_id: &str) -> Result<(), TabError> {
        match kind {
            TabKind::Video => self.video.delete_tab(tab_id).map(|_| ()),
            TabKind::Download => self.downloads.delete_tab(tab_id).map(|_| ()),
        }
    }

    pub fn activate_tab(&mut self, kind: TabKind, tab_id: &str) -> Result<(), TabError> {
        match kind {
            TabKind::Video => self.video.activate(tab_id),
            TabKind::Download => self.downloads.activate(tab_id),
        }
    }

    pub fn set_tab_language(&mut self, kind: TabKind, tab_id: &str, lang: &str) -> Result<(), TabError> {
        match kind {
            TabKind::Video => self.video.set_language(tab_id, lang),
            TabKind::Download => self.downloads.set_language(tab_id, lang),
        }
    }

    /// 添加一行服务器，名称为空时自动取名
    pub fn add_server(&mut self, kind: TabKind, tab_id: &str, row: Value) -> Result<usize, TabError> {
        match kind {
            TabKind::Video => {
                let row = parse_row::<VideoRow>(row)?;
                self.video.add_server(tab_id, Some(row), &mut self.namer)
            }
            TabKind::Download => {
                let row = parse_row::<DownloadServer>(row)?;
                self.downloads.add_server(tab_id, Some(row), &mut self.namer)
            }
        }
    }

    pub fn update_server(&mut self, kind: TabKind, tab_id: &str, index: usize, row: Value) -> Result<(), TabError> {
        match kind {
            TabKind::Video => self.video.update_server(tab_id, index, parse_row(row)?),
            TabKind::Download => self.downloads.update_server(tab_id, index, parse_row(row)?),
        }
    }

    pub fn remove_server(&mut self, kind: TabKind, tab_id: &str, index: usize) -> Result<(), TabError> {
        match kind {
            TabKind::Video => self.video.remove_server(tab_id, index).map(|_| ()),
            TabKind::Download => self.downloads.remove_server(tab_id, index).map(|_| ()),
        }
    }

    /// 标签页快照 (JSON)
    pub fn render_tabs(&self, kind: TabKind) -> Result<Value, serde_json::Error> {
        match kind {
            TabKind::Video => serde_json::to_value(self.video.render()),
            TabKind::Download => serde_json::to_value(self.downloads.render()),
        }
    }
}

fn parse_row<R: ServerRow + DeserializeOwned>(row: Value) -> Result<R, TabError> {
    let row = if row.is_null() { Value::Object(Map::new()) } else { row };
    serde_json::from_value(row).map_err(|e| TabError::InvalidRow(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time_split() {
        assert_eq!(
            ClockTime::from_total_seconds(95.0),
            ClockTime { minutes: 1, seconds: 35 }
        );
        assert_eq!(
            ClockTime::from_total_seconds(59.6),
            ClockTime { minutes: 0, seconds: 60 }
        );
        assert_eq!(ClockTime::from_total_seconds(-3.0), ClockTime::default());
        assert_eq!(ClockTime { minutes: 21, seconds: 5 }.total_seconds(), 1265);
    }

    #[test]
    fn test_clock_time_saturates() {
        let huge = ClockTime { minutes: u32::MAX, seconds: 0 };
        assert_eq!(huge.total_seconds(), u32::MAX);
        let edge = ClockTime { minutes: u32::MAX / 60, seconds: u32::MAX };
        assert_eq!(edge.total_seconds(), u32::MAX);
    }

    #[test]
    fn test_apply_patch_keeps_unset_fields() {
        let mut form = FormState {
            title: "Old".into(),
            synopsis: "Keep".into(),
            ..Default::default()
        };
        let patch: FormPatch = serde_json::from_str(
            r#"{"title":"New","contentType":"tv","introStart":{"minutes":1,"seconds":30}}"#,
        )
        .unwrap();
        form.apply(patch);
        assert_eq!(form.title, "New");
        assert_eq!(form.synopsis, "Keep");
        assert_eq!(form.content_type, ContentType::Tv);
        assert_eq!(form.intro_start.total_seconds(), 90);
    }

    #[test]
    fn test_session_dispatches_by_kind() {
        let mut session = EditorSession::new(&AdvancedSettings::default());
        let tab = session.add_tab(TabKind::Download, "en");
        assert_eq!(tab, "download-lang-2");

        let index = session
            .add_server(TabKind::Download, &tab, serde_json::json!({"url": "https://m", "type": "mp4"}))
            .unwrap();
        assert_eq!(index, 1);
        let row = &session.downloads.tab(&tab).unwrap().servers[1];
        assert_eq!(row.name, "Zeus");
        assert_eq!(row.url, "https://m");

        assert!(matches!(
            session.add_server(TabKind::Video, "video-lang-1", serde_json::json!({"kind": "vhs"})),
            Err(TabError::InvalidRow(_))
        ));
        assert!(matches!(
            session.remove_server(TabKind::Video, &tab, 0),
            Err(TabError::UnknownTab(_))
        ));

        let view = session.render_tabs(TabKind::Download).unwrap();
        assert_eq!(view["active"], "download-lang-2");
        assert_eq!(view["tabs"][1]["servers"][1]["type"], "mp4");
    }

    #[test]
    fn test_new_session_has_default_tabs() {
        let session = EditorSession::new(&AdvancedSettings::default());
        assert_eq!(session.video.tabs().len(), 1);
        assert_eq!(session.downloads.tabs().len(), 1);
        assert_eq!(session.video.tabs()[0].lang, DEFAULT_LANGUAGE);
        assert_eq!(session.form.theme, "orange");
    }
}
