//! 表单状态 ⇄ 播放页配置

use crate::form::{ClockTime, EditorSession, DEFAULT_LANGUAGE};
use crate::settings::clean_keys;
use crate::tabs::VideoRow;
use crate::types::{ContentConfig, ContentType, LanguageServers, PlayerConfig};
use tracing::debug;

/// 从当前表单生成配置对象
pub fn build_config(session: &EditorSession) -> PlayerConfig {
    let form = &session.form;
    let is_tv = form.content_type.is_tv();

    let mut content = ContentConfig {
        title: form.title.clone(),
        synopsis: form.synopsis.clone(),
        poster_url: form.poster_url.clone(),
        report_poster_url: form.report_poster_url.clone(),
        content_type: Some(form.content_type),
        theme: Some(form.theme.clone()),
        back_url: form.back_url.clone(),
        go_back_id: String::new(),
        extra: form.extra.clone(),
        ..Default::default()
    };

    if is_tv {
        content.series_name = Some(form.series_name.clone());
        content.chapter_name = Some(form.chapter_name.clone());
        content.intro_start_time = Some(form.intro_start.total_seconds());
        content.intro_end_time = Some(form.intro_end.total_seconds());
        content.ending_start_time = Some(form.ending_start.total_seconds());
        content.season = Some(form.season.clone());
        content.episode = Some(form.episode.clone());
    }

    let mut language_servers = LanguageServers::new();
    for tab in session.video.tabs() {
        if tab.lang.is_empty() {
            continue;
        }
        let servers = tab
            .servers
            .iter()
            .filter(|row| !row.name.is_empty() && !row.url.is_empty())
            .map(VideoRow::to_server)
            .collect();
        language_servers.insert(tab.lang.clone(), servers);
    }

    let mut download_servers = LanguageServers::new();
    for tab in session.downloads.tabs() {
        if tab.lang.is_empty() {
            continue;
        }
        let servers = tab
            .servers
            .iter()
            .filter(|row| !row.name.is_empty() && !row.url.is_empty())
            .cloned()
            .collect();
        download_servers.insert(tab.lang.clone(), servers);
    }

    PlayerConfig {
        content,
        language_servers,
        download_servers,
        google_api_keys: clean_keys(&form.google_api_keys),
    }
}

/// 用配置对象重建表单 (包括两个标签页列表)
pub fn load_config(session: &mut EditorSession, config: PlayerConfig) {
    let PlayerConfig {
        content,
        language_servers,
        download_servers,
        google_api_keys,
    } = config;

    session.video.clear();
    session.downloads.clear();

    let form = &mut session.form;
    form.google_api_keys = if google_api_keys.is_empty() {
        // 保留一个空输入框
        vec![String::new()]
    } else {
        google_api_keys
    };

    if let Some(content_type) = content.content_type {
        form.content_type = content_type;
    }
    let is_tv = form.content_type.is_tv();

    form.title = content.title;
    form.synopsis = content.synopsis;
    form.poster_url = content.poster_url;
    form.report_poster_url = content.report_poster_url;
    form.back_url = content.back_url;
    form.series_name = content.series_name.unwrap_or_default();
    form.chapter_name = content.chapter_name.unwrap_or_default();
    if let Some(theme) = content.theme.filter(|t| !t.is_empty()) {
        form.theme = theme;
    }
    form.extra = content.extra;

    if is_tv {
        let clock = |v: Option<u32>| ClockTime::from_total_seconds(f64::from(v.unwrap_or(0)));
        form.intro_start = clock(content.intro_start_time);
        form.intro_end = clock(content.intro_end_time);
        form.ending_start = clock(content.ending_start_time);

        if let Some(season) = content.season.filter(|s| !s.is_empty()) {
            form.season = season;
        }
        if let Some(episode) = content.episode.filter(|e| !e.is_empty()) {
            form.episode = episode;
        }
    }

    if language_servers.is_empty() {
        session.video.add_tab(DEFAULT_LANGUAGE, Vec::new(), &mut session.namer);
    } else {
        for (lang, servers) in language_servers.iter() {
            let rows = servers.iter().map(VideoRow::from).collect();
            session.video.add_tab(lang, rows, &mut session.namer);
        }
    }

    if download_servers.is_empty() {
        session.downloads.add_tab(DEFAULT_LANGUAGE, Vec::new(), &mut session.namer);
    } else {
        for (lang, servers) in download_servers.iter() {
            session.downloads.add_tab(lang, servers.to_vec(), &mut session.namer);
        }
    }

    debug!(
        "载入配置: {} 个播放语言, {} 个下载语言, 类型 {}",
        session.video.tabs().len(),
        session.downloads.tabs().len(),
        session.form.content_type.as_str()
    );
}

/// 判断内容类型，供载入后的自动查找使用
pub fn lookup_title(content: &ContentConfig) -> Option<(ContentType, String)> {
    let content_type = content.content_type?;
    let title = content
        .series_name
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(content.title.as_str())
        .trim();
    if title.is_empty() {
        return None;
    }
    Some((content_type, title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AdvancedSettings;
    use crate::types::{DownloadKind, DownloadServer, VideoServer, VideoSourceKind};
    use serde_json::json;

    fn session() -> EditorSession {
        EditorSession::new(&AdvancedSettings::default())
    }

    #[test]
    fn test_build_movie_omits_series_fields() {
        let mut s = session();
        s.form.title = "Película".into();
        s.form.series_name = "ignored".into();
        s.form.intro_start = ClockTime { minutes: 1, seconds: 0 };

        let config = build_config(&s);
        let value = serde_json::to_value(&config).unwrap();
        let content = &value["contentConfig"];
        assert_eq!(content["title"], "Película");
        assert_eq!(content["type"], "movie");
        assert_eq!(content["goBackId"], "");
        assert!(content.get("seriesName").is_none());
        assert!(content.get("introStartTime").is_none());
        assert!(content.get("season").is_none());
    }

    #[test]
    fn test_build_tv_converts_times_to_seconds() {
        let mut s = session();
        s.form.content_type = ContentType::Tv;
        s.form.season = "2".into();
        s.form.episode = "7".into();
        s.form.intro_start = ClockTime { minutes: 1, seconds: 30 };
        s.form.intro_end = ClockTime { minutes: 3, seconds: 0 };
        s.form.ending_start = ClockTime { minutes: 21, seconds: 5 };

        let content = build_config(&s).content;
        assert_eq!(content.intro_start_time, Some(90));
        assert_eq!(content.intro_end_time, Some(180));
        assert_eq!(content.ending_start_time, Some(1265));
        assert_eq!(content.season.as_deref(), Some("2"));
        assert_eq!(content.episode.as_deref(), Some("7"));
    }

    #[test]
    fn test_build_skips_incomplete_rows_and_blank_languages() {
        let mut s = session();
        let es = s.video.tabs()[0].id.clone();
        s.video
            .update_server(
                &es,
                0,
                VideoRow {
                    name: "Principal".into(),
                    url: "https://cdn/a.m3u8".into(),
                    kind: VideoSourceKind::Hls,
                },
            )
            .unwrap();
        // 只有名称没有 URL
        s.video.add_server(&es, None, &mut s.namer).unwrap();
        s.video.add_tab("   ", Vec::new(), &mut s.namer);

        let config = build_config(&s);
        assert_eq!(config.language_servers.len(), 1);
        let servers = config.language_servers.get("es").unwrap();
        assert_eq!(servers.len(), 1);
        assert!(servers[0].hls);

        // 下载列表只有默认空行，语言保留但列表为空
        assert_eq!(config.download_servers.get("es").unwrap().len(), 0);
    }

    #[test]
    fn test_build_trims_google_keys() {
        let mut s = session();
        s.form.google_api_keys = vec![" a ".into(), "".into(), "b".into()];
        assert_eq!(build_config(&s).google_api_keys, vec!["a", "b"]);
    }

    #[test]
    fn test_load_rebuilds_tabs_in_order() {
        let mut s = session();
        let mut video = LanguageServers::new();
        video.insert("ja", vec![VideoServer::new("Zeus", "https://z", VideoSourceKind::Yandex)]);
        video.insert(
            "es",
            vec![
                VideoServer::new("A", "https://a", VideoSourceKind::Other),
                VideoServer::new("B", "https://b", VideoSourceKind::Mp4),
            ],
        );
        let mut downloads = LanguageServers::new();
        downloads.insert(
            "en",
            vec![DownloadServer {
                name: "Mega".into(),
                url: "https://mega".into(),
                kind: DownloadKind::External,
            }],
        );

        let config = PlayerConfig {
            content: ContentConfig {
                title: "T".into(),
                content_type: Some(ContentType::Tv),
                intro_start_time: Some(95),
                season: Some("3".into()),
                theme: Some("purple".into()),
                ..Default::default()
            },
            language_servers: video,
            download_servers: downloads,
            google_api_keys: vec![],
        };
        load_config(&mut s, config);

        let langs: Vec<_> = s.video.tabs().iter().map(|t| t.lang.as_str()).collect();
        assert_eq!(langs, vec!["ja", "es"]);
        assert_eq!(s.video.tabs()[0].id, "video-lang-1");
        assert_eq!(s.video.tabs()[1].servers[1].kind, VideoSourceKind::Mp4);
        assert_eq!(s.video.active_tab(), Some("video-lang-2"));
        assert_eq!(s.downloads.tabs()[0].lang, "en");

        assert_eq!(s.form.content_type, ContentType::Tv);
        assert_eq!(s.form.intro_start, ClockTime { minutes: 1, seconds: 35 });
        assert_eq!(s.form.season, "3");
        assert_eq!(s.form.theme, "purple");
        assert_eq!(s.form.google_api_keys, vec![String::new()]);
    }

    #[test]
    fn test_load_empty_maps_adds_default_language() {
        let mut s = session();
        load_config(&mut s, PlayerConfig::default());
        assert_eq!(s.video.tabs().len(), 1);
        assert_eq!(s.video.tabs()[0].lang, DEFAULT_LANGUAGE);
        assert_eq!(s.downloads.tabs()[0].lang, DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_build_after_load_keeps_unknown_fields() {
        let mut s = session();
        let config: PlayerConfig = serde_json::from_value(json!({
            "contentConfig": {"title": "X", "type": "movie", "autoplay": true},
            "languageServers": {"es": [{"name": "A", "url": "https://a"}]},
            "downloadServers": {}
        }))
        .unwrap();
        load_config(&mut s, config);

        let rebuilt = serde_json::to_value(build_config(&s)).unwrap();
        assert_eq!(rebuilt["contentConfig"]["autoplay"], true);
        assert_eq!(rebuilt["languageServers"]["es"][0]["name"], "A");
        assert_eq!(rebuilt["downloadServers"], json!({"es": []}));
    }

    #[test]
    fn test_lookup_title_prefers_series_name() {
        let content = ContentConfig {
            title: "Capítulo 1".into(),
            series_name: Some("Serie".into()),
            content_type: Some(ContentType::Tv),
            ..Default::default()
        };
        assert_eq!(lookup_title(&content), Some((ContentType::Tv, "Serie".to_string())));

        let untyped = ContentConfig {
            title: "X".into(),
            ..Default::default()
        };
        assert_eq!(lookup_title(&untyped), None);
    }
}
