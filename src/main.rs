mod aniskip;
mod config;
mod config_builder;
mod core;
mod error;
mod extract;
mod form;
mod http_client;
mod jikan;
mod languages;
mod movie_page;
mod settings;
mod tabs;
mod template;
mod tmdb;
mod types;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::AppConfig;
use crate::config_builder::build_config;
use crate::core::AppState;
use crate::error::AppError;
use crate::form::{FormPatch, DEFAULT_LANGUAGE};
use crate::movie_page::{generate_movie_page, parse_movie_page, MoviePageParams};
use crate::settings::AdvancedSettings;
use crate::tabs::TabKind;
use crate::template::RemoteTemplate;

type ApiResult<T> = Result<T, AppError>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    let _subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let config = AppConfig::from_env();
    if config.tmdb_api_key.is_empty() {
        warn!("⚠️ 未设置 TMDB_API_KEY，TMDB 查询将会失败");
    }

    let settings = match core::load_settings(&config) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("读取高级设置失败，使用默认值: {}", e);
            AdvancedSettings {
                google_api_keys: config.default_google_api_keys.clone(),
                ..Default::default()
            }
        }
    };

    let template = Arc::new(RemoteTemplate::new(config.template_url.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, &settings, template);

    info!("🚀 播放页管理后台启动在 http://{}", addr);
    info!("🎨 主题 {}, {} 个 Google API Key", settings.theme, settings.google_api_keys.len());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    axum::serve(listener, app(state)).await.context("服务器异常退出")?;
    Ok(())
}

/// 路由
fn app(state: AppState) -> Router {
    // CORS 配置
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // 核心路由
        .route("/", get(index_handler))
        .route("/api", get(api_info_handler))
        .route("/health", get(health_handler))
        // 表单与标签页
        .route("/api/form", get(get_form_handler).put(update_form_handler))
        .route("/api/tabs/{kind}", get(tabs_handler).post(add_tab_handler))
        .route("/api/tabs/{kind}/{tab}", put(set_tab_language_handler).delete(delete_tab_handler))
        .route("/api/tabs/{kind}/{tab}/activate", post(activate_tab_handler))
        .route("/api/tabs/{kind}/{tab}/servers", post(add_server_handler))
        .route(
            "/api/tabs/{kind}/{tab}/servers/{index}",
            put(update_server_handler).delete(remove_server_handler),
        )
        // 生成与载入
        .route("/api/config", get(config_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/load", post(load_handler))
        // 元数据
        .route("/api/metadata/tmdb", post(tmdb_handler))
        .route("/api/metadata/aniskip", post(aniskip_handler))
        .route("/api/metadata/mal/{id}", get(mal_handler))
        // 高级设置
        .route("/api/settings", get(get_settings_handler).put(save_settings_handler))
        // 旧版电影页
        .route("/api/movie/generate", post(movie_generate_handler))
        .route("/api/movie/parse", post(movie_parse_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// GET / - 管理页面
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /api - API 信息
async fn api_info_handler() -> impl IntoResponse {
    Json(json!({
        "name": "Player Page Admin",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "电影/动画播放页生成与编辑后台",
        "endpoints": {
            "core": {
                "GET /": "管理页面",
                "GET /health": "健康检查"
            },
            "form": {
                "GET /api/form": "读取表单",
                "PUT /api/form": "更新表单字段 (JSON, 只改给出的字段)",
                "GET /api/tabs/{kind}": "标签页列表 (kind = video | download)",
                "POST /api/tabs/{kind}": "添加语言标签页 {lang}",
                "PUT /api/tabs/{kind}/{tab}": "修改标签页语言 {lang}",
                "DELETE /api/tabs/{kind}/{tab}": "删除标签页",
                "POST /api/tabs/{kind}/{tab}/activate": "激活标签页",
                "POST /api/tabs/{kind}/{tab}/servers": "添加服务器行",
                "PUT /api/tabs/{kind}/{tab}/servers/{index}": "修改服务器行",
                "DELETE /api/tabs/{kind}/{tab}/servers/{index}": "删除服务器行"
            },
            "page": {
                "GET /api/config": "当前配置对象",
                "POST /api/generate": "生成播放页",
                "POST /api/load": "载入播放页 {html} 或 {url}"
            },
            "metadata": {
                "POST /api/metadata/tmdb": "从 TMDB 填写",
                "POST /api/metadata/aniskip": "从 Aniskip 填写片头/片尾时间",
                "GET /api/metadata/mal/{id}": "MyAnimeList 预览"
            },
            "settings": {
                "GET /api/settings": "读取高级设置",
                "PUT /api/settings": "保存高级设置 {theme, googleApiKeys}"
            },
            "movie": {
                "POST /api/movie/generate": "生成旧版电影页",
                "POST /api/movie/parse": "解析旧版电影页 {html}"
            }
        }
    }))
}

/// GET /health - 健康检查
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ============================================================================
// 表单
// ============================================================================

/// GET /api/form
async fn get_form_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(json!({
        "form": session.form,
        "preview": session.preview
    }))
}

/// PUT /api/form
async fn update_form_handler(State(state): State<AppState>, Json(patch): Json<FormPatch>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.form.apply(patch);
    Json(session.form.clone())
}

// ============================================================================
// 标签页
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct TabLanguageRequest {
    #[serde(default)]
    lang: Option<String>,
}

/// GET /api/tabs/{kind}
async fn tabs_handler(State(state): State<AppState>, Path(kind): Path<TabKind>) -> ApiResult<Json<Value>> {
    Ok(Json(state.session.read().await.render_tabs(kind)?))
}

/// POST /api/tabs/{kind}
async fn add_tab_handler(
    State(state): State<AppState>,
    Path(kind): Path<TabKind>,
    Json(req): Json<TabLanguageRequest>,
) -> ApiResult<impl IntoResponse> {
    let lang = req.lang.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    let mut session = state.session.write().await;
    let id = session.add_tab(kind, &lang);
    let tabs = session.render_tabs(kind)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "tabs": tabs }))))
}

/// PUT /api/tabs/{kind}/{tab}
async fn set_tab_language_handler(
    State(state): State<AppState>,
    Path((kind, tab)): Path<(TabKind, String)>,
    Json(req): Json<TabLanguageRequest>,
) -> ApiResult<Json<Value>> {
    let lang = req.lang.unwrap_or_default();
    let mut session = state.session.write().await;
    session.set_tab_language(kind, &tab, &lang)?;
    Ok(Json(session.render_tabs(kind)?))
}

/// DELETE /api/tabs/{kind}/{tab}
async fn delete_tab_handler(
    State(state): State<AppState>,
    Path((kind, tab)): Path<(TabKind, String)>,
) -> ApiResult<Json<Value>> {
    let mut session = state.session.write().await;
    session.delete_tab(kind, &tab)?;
    Ok(Json(session.render_tabs(kind)?))
}

/// POST /api/tabs/{kind}/{tab}/activate
async fn activate_tab_handler(
    State(state): State<AppState>,
    Path((kind, tab)): Path<(TabKind, String)>,
) -> ApiResult<Json<Value>> {
    let mut session = state.session.write().await;
    session.activate_tab(kind, &tab)?;
    Ok(Json(session.render_tabs(kind)?))
}

/// POST /api/tabs/{kind}/{tab}/servers
async fn add_server_handler(
    State(state): State<AppState>,
    Path((kind, tab)): Path<(TabKind, String)>,
    Json(row): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let mut session = state.session.write().await;
    let index = session.add_server(kind, &tab, row)?;
    let tabs = session.render_tabs(kind)?;
    Ok((StatusCode::CREATED, Json(json!({ "index": index, "tabs": tabs }))))
}

/// PUT /api/tabs/{kind}/{tab}/servers/{index}
async fn update_server_handler(
    State(state): State<AppState>,
    Path((kind, tab, index)): Path<(TabKind, String, usize)>,
    Json(row): Json<Value>,
) -> ApiResult<Json<Value>> {
    let mut session = state.session.write().await;
    session.update_server(kind, &tab, index, row)?;
    Ok(Json(session.render_tabs(kind)?))
}

/// DELETE /api/tabs/{kind}/{tab}/servers/{index}
async fn remove_server_handler(
    State(state): State<AppState>,
    Path((kind, tab, index)): Path<(TabKind, String, usize)>,
) -> ApiResult<Json<Value>> {
    let mut session = state.session.write().await;
    session.remove_server(kind, &tab, index)?;
    Ok(Json(session.render_tabs(kind)?))
}

// ============================================================================
// 生成与载入
// ============================================================================

/// GET /api/config
async fn config_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(build_config(&*state.session.read().await))
}

/// POST /api/generate
async fn generate_handler(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let html = core::generate_page(&state).await?;
    Ok(Json(json!({ "html": html })))
}

#[derive(Debug, Deserialize)]
struct LoadRequest {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// POST /api/load
async fn load_handler(State(state): State<AppState>, Json(req): Json<LoadRequest>) -> ApiResult<Json<Value>> {
    let html = req.html.filter(|h| !h.trim().is_empty());
    let url = req.url.filter(|u| !u.trim().is_empty());

    let report = match (html, url) {
        (Some(html), _) => core::load_page(&state, &html).await?,
        (None, Some(url)) => core::load_url(&state, &url).await?,
        (None, None) => {
            return Err(AppError::BadRequest("请提供页面 HTML 或 URL".to_string()));
        }
    };

    let session = state.session.read().await;
    Ok(Json(json!({
        "report": report,
        "form": session.form,
        "preview": session.preview
    })))
}

// ============================================================================
// 元数据
// ============================================================================

/// POST /api/metadata/tmdb - 可以顺带更新 contentType / tmdbId / season / episode
async fn tmdb_handler(State(state): State<AppState>, Json(patch): Json<FormPatch>) -> ApiResult<Json<Value>> {
    state.session.write().await.form.apply(patch);
    let preview = core::fill_from_tmdb(&state).await?;
    let session = state.session.read().await;
    Ok(Json(json!({
        "preview": preview,
        "form": session.form
    })))
}

/// POST /api/metadata/aniskip
async fn aniskip_handler(State(state): State<AppState>, Json(patch): Json<FormPatch>) -> ApiResult<Json<Value>> {
    state.session.write().await.form.apply(patch);
    let times = core::fill_skip_times(&state).await?;
    let session = state.session.read().await;
    Ok(Json(json!({
        "opening": times.opening.is_some(),
        "ending": times.ending.is_some(),
        "form": session.form
    })))
}

/// GET /api/metadata/mal/{id}
async fn mal_handler(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Json<Value>> {
    let preview = core::mal_preview(&state, id).await?;
    Ok(Json(json!({ "preview": preview })))
}

// ============================================================================
// 高级设置
// ============================================================================

/// GET /api/settings
async fn get_settings_handler(State(state): State<AppState>) -> ApiResult<Json<AdvancedSettings>> {
    Ok(Json(core::load_settings(&state.config)?))
}

/// PUT /api/settings
async fn save_settings_handler(
    State(state): State<AppState>,
    Json(settings): Json<AdvancedSettings>,
) -> ApiResult<Json<AdvancedSettings>> {
    Ok(Json(core::save_settings(&state, settings).await?))
}

// ============================================================================
// 旧版电影页
// ============================================================================

/// POST /api/movie/generate
async fn movie_generate_handler(Json(params): Json<MoviePageParams>) -> ApiResult<Json<Value>> {
    let html = generate_movie_page(&params)?;
    info!("🎞️ 已生成电影页: {}", params.media_id.trim());
    Ok(Json(json!({ "html": html })))
}

#[derive(Debug, Deserialize)]
struct MovieParseRequest {
    html: String,
}

/// POST /api/movie/parse
async fn movie_parse_handler(Json(req): Json<MovieParseRequest>) -> ApiResult<Json<MoviePageParams>> {
    Ok(Json(parse_movie_page(&req.html)?))
}

/// 管理页面
const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>播放页管理</title>
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      background: linear-gradient(135deg, #1a1a2e 0%, #16213e 50%, #0f3460 100%);
      min-height: 100vh;
      color: #e8e8e8;
      padding: 20px;
    }
    .container { max-width: 1000px; margin: 0 auto; }
    h1 {
      text-align: center;
      font-size: 2rem;
      margin: 30px 0 20px;
      background: linear-gradient(90deg, #ff9f43, #ff6b6b);
      -webkit-background-clip: text;
      -webkit-text-fill-color: transparent;
      background-clip: text;
    }
    h2 { font-size: 1.1rem; margin-bottom: 12px; color: #ffb86b; }
    .card {
      background: rgba(255,255,255,0.06);
      border-radius: 14px;
      padding: 18px;
      margin-bottom: 18px;
    }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 10px; }
    label { display: flex; flex-direction: column; font-size: 13px; gap: 4px; color: rgba(255,255,255,0.7); }
    input, select, textarea {
      padding: 10px 12px;
      border: none;
      border-radius: 10px;
      background: rgba(255,255,255,0.1);
      color: #fff;
      font-size: 14px;
      outline: none;
    }
    textarea { width: 100%; min-height: 140px; font-family: monospace; font-size: 12px; }
    button {
      padding: 10px 18px;
      border: none;
      border-radius: 10px;
      background: linear-gradient(135deg, #ff9f43, #ff6b6b);
      color: #fff;
      font-weight: 600;
      cursor: pointer;
    }
    button.ghost { background: rgba(255,255,255,0.12); }
    .row { display: flex; gap: 8px; margin-top: 10px; flex-wrap: wrap; align-items: center; }
    .tabs { display: flex; gap: 6px; flex-wrap: wrap; margin-bottom: 10px; }
    .tab { padding: 6px 12px; border-radius: 8px; background: rgba(255,255,255,0.1); cursor: pointer; }
    .tab.active { background: #ff9f43; color: #1a1a2e; }
    .server { display: grid; grid-template-columns: 1fr 2fr 120px auto; gap: 6px; margin-bottom: 6px; }
    .status { font-size: 13px; color: rgba(255,255,255,0.6); min-height: 18px; }
    .preview { display: flex; gap: 14px; align-items: center; }
    .preview img { width: 90px; border-radius: 8px; }
  </style>
</head>
<body>
  <div class="container">
    <h1>🎬 播放页管理</h1>

    <div class="card">
      <h2>内容信息</h2>
      <div class="grid">
        <label>类型
          <select data-field="contentType"><option value="movie">电影</option><option value="tv">剧集</option></select>
        </label>
        <label>TMDB ID<input data-field="tmdbId"></label>
        <label>季<input data-field="season"></label>
        <label>集<input data-field="episode"></label>
        <label>MAL ID<input data-field="malId"></label>
        <label>标题<input data-field="title"></label>
        <label>系列名<input data-field="seriesName"></label>
        <label>章节名<input data-field="chapterName"></label>
        <label>海报 URL<input data-field="posterUrl"></label>
        <label>报告海报 URL<input data-field="reportPosterUrl"></label>
        <label>返回 URL<input data-field="backUrl"></label>
      </div>
      <label style="margin-top:10px">简介<textarea data-field="synopsis" style="min-height:60px"></textarea></label>
      <div class="row">
        <button onclick="fetchTmdb()">从 TMDB 获取</button>
        <button class="ghost" onclick="fetchSkip()">获取片头/片尾</button>
        <button class="ghost" onclick="fetchMal()">MAL 预览</button>
      </div>
      <div class="row preview" id="preview"></div>
    </div>

    <div class="card">
      <h2>播放服务器</h2>
      <div id="video-tabs"></div>
    </div>

    <div class="card">
      <h2>下载服务器</h2>
      <div id="download-tabs"></div>
    </div>

    <div class="card">
      <h2>生成 / 载入</h2>
      <div class="row">
        <button onclick="generate()">生成播放页</button>
        <input id="load-url" placeholder="页面 URL" style="flex:1">
        <button class="ghost" onclick="loadPage()">载入</button>
      </div>
      <textarea id="output" style="margin-top:10px" placeholder="生成的 HTML，或粘贴要载入的页面"></textarea>
      <div class="status" id="status"></div>
    </div>
  </div>

  <script>
    const kinds = ['video', 'download'];
    const status = (msg) => { document.getElementById('status').textContent = msg; };

    async function api(method, url, body) {
      const res = await fetch(url, {
        method,
        headers: { 'Content-Type': 'application/json' },
        body: body === undefined ? undefined : JSON.stringify(body)
      });
      const data = await res.json().catch(() => ({}));
      if (!res.ok) throw new Error(data.error || res.statusText);
      return data;
    }

    function fillForm(form) {
      document.querySelectorAll('[data-field]').forEach(el => {
        const v = form[el.dataset.field];
        el.value = v === undefined || v === null ? '' : v;
      });
    }

    function readForm() {
      const patch = {};
      document.querySelectorAll('[data-field]').forEach(el => { patch[el.dataset.field] = el.value; });
      return patch;
    }

    function showPreview(p) {
      const box = document.getElementById('preview');
      if (!p) { box.innerHTML = ''; return; }
      box.innerHTML = '';
      if (p.imageUrl) { const img = document.createElement('img'); img.src = p.imageUrl; box.appendChild(img); }
      const text = document.createElement('div');
      text.textContent = [p.title, p.year, p.mediaType, p.episodes ? p.episodes + ' 集' : ''].filter(Boolean).join(' · ');
      box.appendChild(text);
    }

    function renderTabs(kind, view) {
      const root = document.getElementById(kind + '-tabs');
      root.innerHTML = '';
      const bar = document.createElement('div');
      bar.className = 'tabs';
      view.tabs.forEach(tab => {
        const el = document.createElement('span');
        el.className = 'tab' + (tab.active ? ' active' : '');
        el.textContent = tab.languageName || tab.lang || '?';
        el.onclick = () => api('POST', `/api/tabs/${kind}/${tab.id}/activate`).then(v => renderTabs(kind, v));
        bar.appendChild(el);
      });
      const add = document.createElement('button');
      add.className = 'ghost';
      add.textContent = '+ 语言';
      add.onclick = () => api('POST', `/api/tabs/${kind}`, { lang: prompt('语言代码', 'es') || 'es' }).then(r => renderTabs(kind, r.tabs));
      bar.appendChild(add);
      root.appendChild(bar);

      const active = view.tabs.find(t => t.active);
      if (!active) return;
      active.servers.forEach(row => {
        const line = document.createElement('div');
        line.className = 'server';
        const name = document.createElement('input'); name.value = row.name;
        const url = document.createElement('input'); url.value = row.url; url.placeholder = 'URL';
        const type = document.createElement('select');
        const options = kind === 'video' ? ['other', 'hls', 'mp4', 'gdrive', 'yandex'] : ['external', 'mp4'];
        options.forEach(o => { const opt = document.createElement('option'); opt.value = o; opt.textContent = o; type.appendChild(opt); });
        type.value = kind === 'video' ? row.kind : row.type;
        const save = () => {
          const body = kind === 'video'
            ? { name: name.value, url: url.value, kind: type.value }
            : { name: name.value, url: url.value, type: type.value };
          api('PUT', `/api/tabs/${kind}/${active.id}/servers/${row.index}`, body).catch(e => status(e.message));
        };
        [name, url, type].forEach(el => el.onchange = save);
        const del = document.createElement('button');
        del.className = 'ghost'; del.textContent = '✕';
        del.onclick = () => api('DELETE', `/api/tabs/${kind}/${active.id}/servers/${row.index}`).then(v => renderTabs(kind, v));
        line.append(name, url, type, del);
        root.appendChild(line);
      });
      const actions = document.createElement('div');
      actions.className = 'row';
      const addRow = document.createElement('button');
      addRow.className = 'ghost'; addRow.textContent = '+ 服务器';
      addRow.onclick = () => api('POST', `/api/tabs/${kind}/${active.id}/servers`, {}).then(r => renderTabs(kind, r.tabs));
      const delTab = document.createElement('button');
      delTab.className = 'ghost'; delTab.textContent = '删除该语言';
      delTab.onclick = () => api('DELETE', `/api/tabs/${kind}/${active.id}`).then(v => renderTabs(kind, v));
      actions.append(addRow, delTab);
      root.appendChild(actions);
    }

    async function refresh() {
      const data = await api('GET', '/api/form');
      fillForm(data.form);
      showPreview(data.preview);
      for (const kind of kinds) renderTabs(kind, await api('GET', `/api/tabs/${kind}`));
    }

    async function fetchTmdb() {
      try {
        const data = await api('POST', '/api/metadata/tmdb', readForm());
        fillForm(data.form); showPreview(data.preview); status('✅ 已从 TMDB 填写');
      } catch (e) { status('❌ ' + e.message); }
    }

    async function fetchSkip() {
      try {
        const data = await api('POST', '/api/metadata/aniskip', readForm());
        fillForm(data.form); status('✅ 已填写片头/片尾时间');
      } catch (e) { status('❌ ' + e.message); }
    }

    async function fetchMal() {
      const id = document.querySelector('[data-field=malId]').value.trim();
      try { showPreview((await api('GET', `/api/metadata/mal/${id}`)).preview); }
      catch (e) { status('❌ ' + e.message); }
    }

    async function generate() {
      try {
        await api('PUT', '/api/form', readForm());
        const data = await api('POST', '/api/generate');
        document.getElementById('output').value = data.html;
        status('✅ 已生成 ' + data.html.length + ' 字节');
      } catch (e) { status('❌ ' + e.message); }
    }

    async function loadPage() {
      const url = document.getElementById('load-url').value.trim();
      const html = document.getElementById('output').value;
      try {
        const data = await api('POST', '/api/load', url ? { url } : { html });
        await refresh();
        const warnings = data.report.warnings.length ? ' (' + data.report.warnings.join('; ') + ')' : '';
        status('📥 已载入 ' + data.report.title + warnings);
      } catch (e) { status('❌ ' + e.message); }
    }

    refresh().catch(e => status('❌ ' + e.message));
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::StaticTemplate;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const TEMPLATE: &str = r#"<html data-theme="${theme}"><script>
window.GOOGLE_API_KEYS = ${escapedGoogleApiKeys};
window.contentConfig = ${escapedContentConfig};
window.languageServers = ${escapedLanguageServers};
window.downloadServers = ${escapedDownloadServers};
</script></html>"#;

    fn test_app() -> Router {
        let config = AppConfig {
            tmdb_api_base: "http://127.0.0.1:9".into(),
            jikan_api_base: "http://127.0.0.1:9".into(),
            aniskip_api_base: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        let state = AppState::new(
            config,
            &AdvancedSettings::default(),
            Arc::new(StaticTemplate(TEMPLATE.to_string())),
        );
        app(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_tab_flow_reaches_config() {
        let app = test_app();

        let (status, body) = send(&app, "POST", "/api/tabs/video", Some(json!({"lang": "ja"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "video-lang-2");

        let (status, body) = send(
            &app,
            "POST",
            "/api/tabs/video/video-lang-2/servers",
            Some(json!({"url": "https://v/1.m3u8", "kind": "hls"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["index"], 1);

        let (status, config) = send(&app, "GET", "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            config["languageServers"]["ja"],
            json!([{"name": "Zeus", "url": "https://v/1.m3u8", "hls": true}])
        );

        let (status, body) = send(&app, "DELETE", "/api/tabs/video/video-lang-2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], "video-lang-1");
    }

    #[tokio::test]
    async fn test_blank_rows_can_be_added_to_both_lists() {
        let app = test_app();
        for kind in ["video", "download"] {
            let uri = format!("/api/tabs/{kind}/{kind}-lang-1/servers");
            let (status, body) = send(&app, "POST", &uri, Some(json!({}))).await;
            assert_eq!(status, StatusCode::CREATED, "{kind}: {body}");
            assert_eq!(body["index"], 1);
            assert_eq!(body["tabs"]["tabs"][0]["servers"][1]["url"], "");
        }

        let (_, body) = send(&app, "GET", "/api/tabs/download", None).await;
        let row = &body["tabs"][0]["servers"][1];
        assert_eq!(row["type"], "external");
        assert!(!row["name"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_huge_clock_values_saturate() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "PUT",
            "/api/form",
            Some(json!({"contentType": "tv", "introStart": {"minutes": u32::MAX, "seconds": 0}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, config) = send(&app, "GET", "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(config["contentConfig"]["introStartTime"], u32::MAX);
    }

    #[tokio::test]
    async fn test_unknown_tab_is_not_found() {
        let app = test_app();
        let (status, body) = send(&app, "DELETE", "/api/tabs/download/download-lang-9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("download-lang-9"));

        let (status, _) = send(&app, "GET", "/api/tabs/subtitles", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_and_load() {
        let app = test_app();
        send(&app, "PUT", "/api/form", Some(json!({"title": "Demo", "theme": "blue"}))).await;

        let (status, body) = send(&app, "POST", "/api/generate", None).await;
        assert_eq!(status, StatusCode::OK);
        let html = body["html"].as_str().unwrap().to_string();
        assert!(html.contains(r#"data-theme="blue""#));
        assert!(html.contains(r#""title":"Demo""#));

        let other = test_app();
        let (status, body) = send(&other, "POST", "/api/load", Some(json!({ "html": html }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["form"]["title"], "Demo");
        assert_eq!(body["form"]["theme"], "blue");
    }

    #[tokio::test]
    async fn test_load_requires_input() {
        let app = test_app();
        let (status, _) = send(&app, "POST", "/api/load", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/api/load", Some(json!({"html": "<p>nada</p>"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_movie_page_endpoints() {
        let app = test_app();
        let params = json!({
            "mediaId": "550",
            "playUrl": "https://p/{id}",
            "theme": "orange",
            "categories": "Drama",
            "tmdbLogoLang": "es"
        });
        let (status, body) = send(&app, "POST", "/api/movie/generate", Some(params.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, parsed) = send(&app, "POST", "/api/movie/parse", Some(json!({"html": body["html"]}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parsed, params);

        let (status, _) = send(&app, "POST", "/api/movie/generate", Some(json!({"mediaId": "1"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
