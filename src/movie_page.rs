//! 单部电影的旧版页面
//! 参数以 `data-*` 属性写入页面，载入时再用正则取回

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ASSETS_BASE: &str = "https://cdn.jsdelivr.net/gh/geminiproai37-blip/styles-sadsd@main/movie";

static MEDIA_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-media-id="([^"]+)""#).expect("invalid regex"));
static PLAY_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-play-url-template="([^"]+)""#).expect("invalid regex"));
static CATEGORIES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-categories="([^"]+)""#).expect("invalid regex"));
static LOGO_LANG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-tmdb-logo-lang="([^"]+)""#).expect("invalid regex"));
static THEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"const themeParam = ("(?:[^"\\]|\\.)*")"#).expect("invalid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoviePageError {
    #[error("缺少参数: {0}")]
    MissingField(&'static str),
    #[error("页面中找不到全部参数")]
    Incomplete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePageParams {
    pub media_id: String,
    pub play_url: String,
    pub theme: String,
    pub categories: String,
    pub tmdb_logo_lang: String,
}

impl MoviePageParams {
    fn validate(&self) -> Result<(), MoviePageError> {
        let fields = [
            ("mediaId", &self.media_id),
            ("playUrl", &self.play_url),
            ("theme", &self.theme),
            ("categories", &self.categories),
            ("tmdbLogoLang", &self.tmdb_logo_lang),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(MoviePageError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// 生成页面
pub fn generate_movie_page(params: &MoviePageParams) -> Result<String, MoviePageError> {
    params.validate()?;

    let attr = |v: &str| escape_attr(v.trim());
    let js = |v: &str| {
        serde_json::to_string(v.trim())
            .unwrap_or_else(|_| "\"\"".to_string())
            .replace("</", "<\\/")
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Cargando...</title>
  <script src="https://cdn.tailwindcss.com"></script>
  <link rel="stylesheet" href="{assets}/style.css" />
</head>
<body class="bg-gray-900 text-white">
  <script>
    const mediaId = {media_id_js};
    const mediaType = "movie";
    const playUrl = {play_url_js};
    const themeParam = {theme_js};
    const categories = {categories_js};
    const tmdbLogoLang = {logo_lang_js};
    document.body.classList.add(themeParam + "-theme");
  </script>
  <div id="local-media-data"
       data-media-type="movie"
       data-media-id="{media_id}"
       data-play-url-template="{play_url}"
       data-categories="{categories}"
       data-tmdb-logo-lang="{logo_lang}"
       class="hidden"></div>
  <div id="app-root"></div>
  <div id="notification-container" class="fixed bottom-4 right-4 z-50"></div>
  <script type="module" src="{assets}/main.js" defer></script>
  <script src="{assets}/lazy-loader.js" defer></script>
</body>
</html>
"#,
        assets = ASSETS_BASE,
        media_id_js = js(&params.media_id),
        play_url_js = js(&params.play_url),
        theme_js = js(&params.theme),
        categories_js = js(&params.categories),
        logo_lang_js = js(&params.tmdb_logo_lang),
        media_id = attr(&params.media_id),
        play_url = attr(&params.play_url),
        categories = attr(&params.categories),
        logo_lang = attr(&params.tmdb_logo_lang),
    ))
}

/// 从页面取回参数，五个参数缺一不可
pub fn parse_movie_page(html: &str) -> Result<MoviePageParams, MoviePageError> {
    let capture = |re: &Regex| re.captures(html).map(|c| unescape_attr(&c[1]));

    let media_id = capture(&MEDIA_ID_RE);
    let play_url = capture(&PLAY_URL_RE);
    let categories = capture(&CATEGORIES_RE);
    let tmdb_logo_lang = capture(&LOGO_LANG_RE);
    let theme = THEME_RE
        .captures(html)
        .and_then(|c| serde_json::from_str::<String>(&c[1]).ok());

    match (media_id, play_url, theme, categories, tmdb_logo_lang) {
        (Some(media_id), Some(play_url), Some(theme), Some(categories), Some(tmdb_logo_lang)) => {
            Ok(MoviePageParams {
                media_id,
                play_url,
                theme,
                categories,
                tmdb_logo_lang,
            })
        }
        _ => Err(MoviePageError::Incomplete),
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MoviePageParams {
        MoviePageParams {
            media_id: "550".into(),
            play_url: "https://play.example/?id={id}&q=\"hd\"".into(),
            theme: "purple".into(),
            categories: "Acción,Drama".into(),
            tmdb_logo_lang: "es".into(),
        }
    }

    #[test]
    fn test_generate_then_parse() {
        let html = generate_movie_page(&params()).unwrap();
        assert!(html.contains(r#"data-media-id="550""#));
        assert!(html.contains("&amp;q=&quot;hd&quot;"));
        assert_eq!(parse_movie_page(&html).unwrap(), params());
    }

    #[test]
    fn test_generate_requires_all_fields() {
        let mut p = params();
        p.categories = " ".into();
        assert_eq!(
            generate_movie_page(&p),
            Err(MoviePageError::MissingField("categories"))
        );
    }

    #[test]
    fn test_parse_incomplete_page() {
        let html = r#"<div data-media-id="1" data-categories="a"></div>"#;
        assert_eq!(parse_movie_page(html), Err(MoviePageError::Incomplete));
    }

    #[test]
    fn test_parse_hand_written_page() {
        let html = r#"
    const themeParam = "orange";
  <div id="local-media-data" data-media-type="movie" data-media-id="603"
       data-play-url-template="https://p/{id}" data-categories="Ciencia ficción"
       data-tmdb-logo-lang="en" class="hidden"></div>"#;
        let parsed = parse_movie_page(html).unwrap();
        assert_eq!(parsed.media_id, "603");
        assert_eq!(parsed.theme, "orange");
        assert_eq!(parsed.tmdb_logo_lang, "en");
    }
}
