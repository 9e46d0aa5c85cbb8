//! 核心流程
//! 协调编辑会话与外部元数据、模板服务。持锁期间不做任何网络请求。

use crate::aniskip::{parse_mal_id, AniskipClient, AniskipError, SkipTimes};
use crate::config::AppConfig;
use crate::config_builder::{build_config, load_config, lookup_title};
use crate::error::AppError;
use crate::extract::{parse_player_page, ProxyResponse};
use crate::form::{EditorSession, FormState};
use crate::http_client::{get_json, get_text, HttpClientError};
use crate::jikan::JikanClient;
use crate::settings::{clean_keys, AdvancedSettings, DEFAULT_THEME};
use crate::template::{render_player_page, TemplateSource};
use crate::tmdb::TmdbClient;
use crate::types::{ContentType, MediaPreview};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<RwLock<EditorSession>>,
    pub template: Arc<dyn TemplateSource>,
    pub tmdb: TmdbClient,
    pub jikan: JikanClient,
    pub aniskip: AniskipClient,
}

impl AppState {
    pub fn new(config: AppConfig, settings: &AdvancedSettings, template: Arc<dyn TemplateSource>) -> Self {
        let tmdb = TmdbClient::new(
            config.tmdb_api_key.clone(),
            config.tmdb_language.clone(),
            config.tmdb_api_base.clone(),
        );
        let jikan = JikanClient::new(config.jikan_api_base.clone());
        let aniskip = AniskipClient::new(config.aniskip_api_base.clone());
        Self {
            config: Arc::new(config),
            session: Arc::new(RwLock::new(EditorSession::new(settings))),
            template,
            tmdb,
            jikan,
            aniskip,
        }
    }
}

/// 载入页面的结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub title: String,
    pub content_type: ContentType,
    pub video_languages: Vec<String>,
    pub download_languages: Vec<String>,
    pub tmdb_id: Option<u64>,
    pub mal_id: Option<u64>,
    pub skip_times_applied: bool,
    /// 自动查找中的非致命错误
    pub warnings: Vec<String>,
}

/// 按表单中的 TMDB ID 获取信息并填入表单
pub async fn fill_from_tmdb(state: &AppState) -> Result<MediaPreview, AppError> {
    let (content_type, id, season, episode) = {
        let session = state.session.read().await;
        let form = &session.form;
        (
            form.content_type,
            form.tmdb_id.trim().to_string(),
            form.season.trim().to_string(),
            form.episode.trim().to_string(),
        )
    };
    if id.is_empty() {
        return Err(AppError::BadRequest("请先填写 TMDB ID".to_string()));
    }

    let lookup = match state.tmdb.lookup(content_type, &id, &season, &episode).await {
        Ok(lookup) => lookup,
        Err(e) => {
            warn!("TMDB 获取失败 {} {}: {}", content_type.as_str(), id, e);
            // 无效的 ID 不留在表单里
            state.session.write().await.form.tmdb_id.clear();
            return Err(e.into());
        }
    };

    let preview = lookup.preview(&season, &episode);
    {
        let mut session = state.session.write().await;
        lookup.apply(&mut session.form);
        session.preview = Some(preview.clone());
    }
    info!("🎬 已从 TMDB 填写: {}", preview.title);
    Ok(preview)
}

/// 获取 Aniskip 时间并填入三个时间输入框
pub async fn fill_skip_times(state: &AppState) -> Result<SkipTimes, AppError> {
    let form = state.session.read().await.form.clone();

    let mal_id = parse_mal_id(&form.mal_id)?;
    let episode_length = form
        .episode_length
        .filter(|len| *len > 0)
        .ok_or(AniskipError::InvalidEpisodeLength)?;
    let episode = state
        .tmdb
        .absolute_episode_number(form.content_type, &form.tmdb_id, &form.season, &form.episode)
        .await
        .ok_or(AniskipError::InvalidEpisodeNumber)?;

    let times = state.aniskip.fetch(mal_id, episode, episode_length).await?;
    times.apply(&mut state.session.write().await.form);
    Ok(times)
}

/// MAL 预览
pub async fn mal_preview(state: &AppState, mal_id: u64) -> Result<MediaPreview, AppError> {
    if mal_id == 0 {
        return Err(AniskipError::InvalidMalId.into());
    }
    let anime = state.jikan.anime(mal_id).await?;
    let preview = anime.preview();
    state.session.write().await.preview = Some(preview.clone());
    Ok(preview)
}

/// 生成播放页
pub async fn generate_page(state: &AppState) -> Result<String, AppError> {
    let config = build_config(&*state.session.read().await);
    let template = state.template.fetch_template().await?;
    let html = render_player_page(&template, &config)?;
    info!(
        "✨ 已生成播放页: {} ({} 字节)",
        config.content.title,
        html.len()
    );
    Ok(html)
}

/// 载入已有播放页并自动查找元数据
pub async fn load_page(state: &AppState, html: &str) -> Result<LoadReport, AppError> {
    let config = parse_player_page(html)?;
    let lookup = lookup_title(&config.content);

    let mut report = {
        let mut session = state.session.write().await;
        load_config(&mut session, config);
        session.preview = None;
        LoadReport {
            title: session.form.title.clone(),
            content_type: session.form.content_type,
            video_languages: session.video.tabs().iter().map(|t| t.lang.clone()).collect(),
            download_languages: session.downloads.tabs().iter().map(|t| t.lang.clone()).collect(),
            ..Default::default()
        }
    };
    info!(
        "📥 已载入播放页: {} ({} 个播放语言, {} 个下载语言)",
        report.title,
        report.video_languages.len(),
        report.download_languages.len()
    );

    if let Some((content_type, title)) = lookup {
        auto_lookup(state, content_type, &title, &mut report).await;
    }
    Ok(report)
}

/// 按 URL 载入播放页
pub async fn load_url(state: &AppState, url: &str) -> Result<LoadReport, AppError> {
    let url = Url::parse(url.trim()).map_err(|e| AppError::BadRequest(format!("URL 无效: {}", e)))?;
    let html = fetch_remote_page(url.as_str(), state.config.cors_proxy.as_deref()).await?;
    load_page(state, &html).await
}

/// 经 CORS 代理或直接获取页面
pub async fn fetch_remote_page(url: &str, proxy: Option<&str>) -> Result<String, HttpClientError> {
    match proxy {
        Some(proxy) => {
            let proxied = format!("{}{}", proxy, urlencoding::encode(url));
            debug!("经代理获取: {}", proxied);
            let response: ProxyResponse = get_json(&proxied).await?;
            response
                .contents
                .filter(|c| !c.is_empty())
                .ok_or_else(|| HttpClientError::Decode("代理没有返回页面内容".to_string()))
        }
        None => get_text(url).await,
    }
}

/// 载入后的自动查找，失败只记录不中断
async fn auto_lookup(state: &AppState, content_type: ContentType, title: &str, report: &mut LoadReport) {
    info!("🔍 自动查找: {} ({})", title, content_type.as_str());

    match state.tmdb.search_id(content_type, title).await {
        Ok(Some(id)) => {
            state.session.write().await.form.tmdb_id = id.to_string();
            report.tmdb_id = Some(id);
            if let Err(e) = fill_from_tmdb(state).await {
                note(report, format!("TMDB 填写失败: {}", e));
            }
        }
        Ok(None) => note(report, format!("TMDB 没有找到 \"{}\"", title)),
        Err(e) => note(report, format!("TMDB 搜索失败: {}", e)),
    }

    if !content_type.is_tv() {
        return;
    }

    match state.jikan.search_mal_id(title).await {
        Ok(Some(mal_id)) => {
            let has_length = {
                let mut session = state.session.write().await;
                session.form.mal_id = mal_id.to_string();
                session.form.episode_length.is_some_and(|len| len > 0)
            };
            report.mal_id = Some(mal_id);
            if has_length {
                match fill_skip_times(state).await {
                    Ok(_) => report.skip_times_applied = true,
                    Err(e) => note(report, format!("Aniskip 获取失败: {}", e)),
                }
            }
        }
        Ok(None) => note(report, format!("Jikan 没有找到 \"{}\"", title)),
        Err(e) => note(report, format!("Jikan 搜索失败: {}", e)),
    }
}

fn note(report: &mut LoadReport, message: String) {
    warn!("{}", message);
    report.warnings.push(message);
}

/// 读取保存的高级设置
pub fn load_settings(config: &AppConfig) -> Result<AdvancedSettings, AppError> {
    Ok(AdvancedSettings::load(
        &config.settings_path,
        &config.default_google_api_keys,
    )?)
}

/// 保存高级设置并同步到表单
pub async fn save_settings(state: &AppState, mut settings: AdvancedSettings) -> Result<AdvancedSettings, AppError> {
    if settings.theme.trim().is_empty() {
        settings.theme = DEFAULT_THEME.to_string();
    }
    settings.save(&state.config.settings_path)?;

    let mut session = state.session.write().await;
    apply_settings(&mut session.form, &settings);
    info!("💾 已保存高级设置 (主题 {})", settings.theme);
    Ok(settings)
}

fn apply_settings(form: &mut FormState, settings: &AdvancedSettings) {
    form.theme = settings.theme.clone();
    form.google_api_keys = clean_keys(&settings.google_api_keys);
    if form.google_api_keys.is_empty() {
        form.google_api_keys.push(String::new());
    }
}
