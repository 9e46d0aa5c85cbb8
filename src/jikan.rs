//! Jikan (MyAnimeList) API

use crate::http_client::{get_json, HttpClientError};
use crate::types::MediaPreview;
use serde::Deserialize;
use tracing::warn;

pub const JIKAN_API_BASE: &str = "https://api.jikan.moe/v4";

#[derive(Debug, Clone, Deserialize)]
pub struct JikanAnime {
    pub mal_id: u64,
    pub title: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub episodes: Option<u32>,
    pub season: Option<String>,
    pub images: Option<JikanImages>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImages {
    pub jpg: Option<JikanImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImage {
    pub large_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JikanList {
    #[serde(default)]
    data: Vec<JikanAnime>,
}

#[derive(Debug, Deserialize)]
struct JikanSingle {
    data: JikanAnime,
}

#[derive(Debug, Clone)]
pub struct JikanClient {
    base: String,
}

impl Default for JikanClient {
    fn default() -> Self {
        Self::new(JIKAN_API_BASE)
    }
}

impl JikanClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// 按标题搜索，返回第一个结果的 MAL ID
    pub async fn search_mal_id(&self, title: &str) -> Result<Option<u64>, HttpClientError> {
        let url = format!(
            "{}/anime?q={}&limit=1",
            self.base.trim_end_matches('/'),
            urlencoding::encode(title)
        );
        let list: JikanList = get_json(&url).await?;
        let id = list.data.first().map(|a| a.mal_id);
        if id.is_none() {
            warn!("MyAnimeList 没有找到 \"{}\" 的结果", title);
        }
        Ok(id)
    }

    /// 获取动画详情
    pub async fn anime(&self, mal_id: u64) -> Result<JikanAnime, HttpClientError> {
        let url = format!("{}/anime/{}", self.base.trim_end_matches('/'), mal_id);
        let single: JikanSingle = get_json(&url).await?;
        Ok(single.data)
    }
}

impl JikanAnime {
    pub fn preview(&self) -> MediaPreview {
        let is_tv = self.kind.as_deref() == Some("TV");
        MediaPreview {
            image_url: self
                .images
                .as_ref()
                .and_then(|i| i.jpg.as_ref())
                .and_then(|j| j.large_image_url.clone())
                .unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            year: self.year.map(|y| y.to_string()),
            media_type: self.kind.clone(),
            episodes: self.episodes.filter(|_| is_tv),
            season: self.season.clone().filter(|_| is_tv),
            episode: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_preview_tv() {
        let anime: JikanAnime = serde_json::from_value(json!({
            "mal_id": 5114,
            "title": "Fullmetal Alchemist: Brotherhood",
            "year": 2009,
            "type": "TV",
            "episodes": 64,
            "season": "spring",
            "images": {"jpg": {"large_image_url": "https://cdn.myanimelist.net/l.jpg"}}
        }))
        .unwrap();
        let preview = anime.preview();
        assert_eq!(preview.image_url, "https://cdn.myanimelist.net/l.jpg");
        assert_eq!(preview.year.as_deref(), Some("2009"));
        assert_eq!(preview.episodes, Some(64));
        assert_eq!(preview.season.as_deref(), Some("spring"));
    }

    #[test]
    fn test_preview_movie_hides_series_details() {
        let anime: JikanAnime = serde_json::from_value(json!({
            "mal_id": 1, "title": "Película", "type": "Movie", "episodes": 1
        }))
        .unwrap();
        let preview = anime.preview();
        assert_eq!(preview.episodes, None);
        assert_eq!(preview.image_url, "");
    }

    #[tokio::test]
    async fn test_search_and_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/anime"))
            .and(query_param("q", "Frieren"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"mal_id": 52991, "title": "Sousou no Frieren"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/52991"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"mal_id": 52991, "title": "Sousou no Frieren", "type": "TV"}
            })))
            .mount(&server)
            .await;

        let client = JikanClient::new(server.uri());
        assert_eq!(client.search_mal_id("Frieren").await.unwrap(), Some(52991));
        let anime = client.anime(52991).await.unwrap();
        assert_eq!(anime.title.as_deref(), Some("Sousou no Frieren"));
    }
}
