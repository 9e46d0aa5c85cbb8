//! TMDB 元数据
//! 获取电影/剧集详情、单集信息，并计算绝对集数

use crate::form::FormState;
use crate::http_client::{get_json, HttpClientError};
use crate::types::{ContentType, MediaPreview};
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
pub const TMDB_DEFAULT_LANGUAGE: &str = "es-ES";

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// 电影或剧集详情
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbDetails {
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    /// 分钟
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
}

impl TmdbDetails {
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.name.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSeasonSummary {
    pub season_number: i64,
    #[serde(default)]
    pub episode_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbEpisode {
    pub name: Option<String>,
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbSeasonDetails {
    #[serde(default)]
    pub episodes: Vec<TmdbEpisodeNumber>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbEpisodeNumber {
    pub episode_number: i64,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchItem>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchItem {
    id: u64,
}

/// 一次查询的结果: 详情加可选的单集
#[derive(Debug, Clone)]
pub struct TmdbLookup {
    pub content_type: ContentType,
    pub details: TmdbDetails,
    pub episode: Option<TmdbEpisode>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    api_key: String,
    language: String,
    base: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, language: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: language.into(),
            base: base.into(),
        }
    }

    fn url(&self, path: &str, extra: &[(&str, &str)], localized: bool) -> Result<String, HttpClientError> {
        let mut url = Url::parse(&format!("{}/{}", self.base.trim_end_matches('/'), path))
            .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api_key", &self.api_key);
            for (k, v) in extra {
                query.append_pair(k, v);
            }
            if localized {
                query.append_pair("language", &self.language);
            }
        }
        Ok(url.into())
    }

    /// 获取电影或剧集详情
    pub async fn details(&self, content_type: ContentType, id: &str) -> Result<TmdbDetails, HttpClientError> {
        let url = self.url(&format!("{}/{}", content_type.as_str(), id.trim()), &[], true)?;
        get_json(&url).await
    }

    /// 获取单集信息
    pub async fn episode(&self, id: &str, season: &str, episode: &str) -> Result<TmdbEpisode, HttpClientError> {
        let path = format!("tv/{}/season/{}/episode/{}", id.trim(), season.trim(), episode.trim());
        get_json(&self.url(&path, &[], true)?).await
    }

    /// 获取一季的详情
    pub async fn season(&self, id: &str, season: i64) -> Result<TmdbSeasonDetails, HttpClientError> {
        let path = format!("tv/{}/season/{}", id.trim(), season);
        get_json(&self.url(&path, &[], false)?).await
    }

    /// 按标题搜索，返回第一个结果的 ID
    pub async fn search_id(&self, content_type: ContentType, title: &str) -> Result<Option<u64>, HttpClientError> {
        let path = format!("search/{}", content_type.as_str());
        let response: TmdbSearchResponse = get_json(&self.url(&path, &[("query", title)], true)?).await?;
        let id = response.results.first().map(|r| r.id);
        if id.is_none() {
            warn!("TMDB 没有找到 \"{}\" 的结果", title);
        }
        Ok(id)
    }

    /// 获取详情；剧集且填写了季和集时一并获取单集，单集失败不影响整体
    pub async fn lookup(
        &self,
        content_type: ContentType,
        id: &str,
        season: &str,
        episode: &str,
    ) -> Result<TmdbLookup, HttpClientError> {
        let details = self.details(content_type, id).await?;

        let episode = if content_type.is_tv() && !season.trim().is_empty() && !episode.trim().is_empty() {
            match self.episode(id, season, episode).await {
                Ok(ep) => Some(ep),
                Err(e) => {
                    warn!("获取 TMDB 单集失败 {} S{}E{}: {}", id, season, episode, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(TmdbLookup {
            content_type,
            details,
            episode,
        })
    }

    /// 计算绝对集数 (跨季累加)
    ///
    /// 电影固定为 1；集数不是数字时返回 `None`；
    /// 没有 ID、季数无效或是第一季时直接返回相对集数；
    /// 剧集信息获取失败时退回相对集数。
    pub async fn absolute_episode_number(
        &self,
        content_type: ContentType,
        id: &str,
        season: &str,
        episode: &str,
    ) -> Option<u32> {
        if !content_type.is_tv() {
            return Some(1);
        }

        let episode_num: u32 = episode.trim().parse().ok()?;
        let season_num = match season.trim().parse::<i64>() {
            Ok(n) if n > 1 && !id.trim().is_empty() => n,
            _ => return Some(episode_num),
        };

        let series = match self.details(ContentType::Tv, id).await {
            Ok(series) => series,
            Err(e) => {
                warn!("获取剧集季列表失败，使用相对集数: {}", e);
                return Some(episode_num);
            }
        };

        let previous = previous_seasons(&series.seasons, season_num);
        if previous.is_empty() {
            return Some(episode_num);
        }

        let fetched = join_all(previous.iter().map(|s| self.season(id, s.season_number))).await;
        let before = count_previous_episodes(&previous, fetched);
        debug!("绝对集数: 前 {} 季共 {} 集", previous.len(), before);
        Some(before + episode_num)
    }
}

/// 当前季之前的正式季 (排除特别篇和空季)，按季号排序
pub fn previous_seasons(seasons: &[TmdbSeasonSummary], current: i64) -> Vec<TmdbSeasonSummary> {
    let mut previous: Vec<_> = seasons
        .iter()
        .filter(|s| s.season_number > 0 && s.season_number < current && s.episode_count > 0)
        .cloned()
        .collect();
    previous.sort_by_key(|s| s.season_number);
    previous
}

/// 统计前面各季的正式集数 (episode_number > 0)，获取失败时使用概要中的集数
pub fn count_previous_episodes(
    previous: &[TmdbSeasonSummary],
    fetched: Vec<Result<TmdbSeasonDetails, HttpClientError>>,
) -> u32 {
    previous
        .iter()
        .zip(fetched)
        .map(|(summary, result)| match result {
            Ok(details) => details.episodes.iter().filter(|e| e.episode_number > 0).count() as u32,
            Err(e) => {
                warn!("获取第 {} 季详情失败，使用概要集数: {}", summary.season_number, e);
                summary.episode_count
            }
        })
        .sum()
}

/// 单集时长 (秒)
pub fn episode_length_seconds(content_type: ContentType, details: &TmdbDetails) -> Option<u32> {
    match content_type {
        ContentType::Tv => details.episode_run_time.first().map(|m| m * 60),
        ContentType::Movie => details.runtime.filter(|m| *m > 0).map(|m| m * 60),
    }
}

fn image_url(size: &str, path: Option<&str>) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{}/{}{}", IMAGE_BASE, size, p),
        None => String::new(),
    }
}

fn year_of(date: Option<&str>) -> Option<String> {
    date.filter(|d| d.len() >= 4).map(|d| d.chars().take(4).collect())
}

impl TmdbLookup {
    /// 把查询结果填入表单
    pub fn apply(&self, form: &mut FormState) {
        let details = &self.details;

        if let Some(length) = episode_length_seconds(self.content_type, details) {
            form.episode_length = Some(length);
        }

        form.title = details.display_title().unwrap_or_default().to_string();
        form.synopsis = details.overview.clone().unwrap_or_default();

        let series_poster = image_url("original", details.poster_path.as_deref());
        let mut poster = series_poster.clone();

        if self.content_type.is_tv() {
            form.series_name = details.name.clone().unwrap_or_default();
            if let Some(episode) = &self.episode {
                form.chapter_name = episode.name.clone().unwrap_or_default();
                if episode.still_path.as_deref().is_some_and(|p| !p.is_empty()) {
                    poster = image_url("original", episode.still_path.as_deref());
                }
            }
        }

        form.poster_url = poster;
        // 报告用的海报始终是剧集/电影海报
        form.report_poster_url = series_poster;
    }

    /// 预览卡片
    pub fn preview(&self, season: &str, episode: &str) -> MediaPreview {
        let details = &self.details;
        let is_tv = self.content_type.is_tv();
        MediaPreview {
            image_url: image_url("w500", details.poster_path.as_deref()),
            title: details.display_title().unwrap_or_default().to_string(),
            year: if is_tv {
                year_of(details.first_air_date.as_deref())
            } else {
                year_of(details.release_date.as_deref())
            },
            media_type: Some(if is_tv { "TV" } else { "Movie" }.to_string()),
            episodes: details.number_of_episodes.filter(|_| is_tv),
            season: Some(season.to_string()).filter(|_| is_tv),
            episode: Some(episode.to_string()).filter(|_| is_tv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tv_details() -> TmdbDetails {
        serde_json::from_value(json!({
            "name": "Serie",
            "overview": "Sinopsis",
            "poster_path": "/poster.jpg",
            "first_air_date": "2019-04-06",
            "episode_run_time": [24],
            "number_of_episodes": 50
        }))
        .unwrap()
    }

    #[test]
    fn test_apply_tv_with_episode_still() {
        let lookup = TmdbLookup {
            content_type: ContentType::Tv,
            details: tv_details(),
            episode: Some(TmdbEpisode {
                name: Some("Capítulo 3".into()),
                still_path: Some("/still.jpg".into()),
            }),
        };
        let mut form = FormState::default();
        lookup.apply(&mut form);

        assert_eq!(form.title, "Serie");
        assert_eq!(form.series_name, "Serie");
        assert_eq!(form.chapter_name, "Capítulo 3");
        assert_eq!(form.synopsis, "Sinopsis");
        assert_eq!(form.episode_length, Some(1440));
        assert_eq!(form.poster_url, "https://image.tmdb.org/t/p/original/still.jpg");
        assert_eq!(form.report_poster_url, "https://image.tmdb.org/t/p/original/poster.jpg");
    }

    #[test]
    fn test_apply_movie() {
        let details: TmdbDetails = serde_json::from_value(json!({
            "title": "Película",
            "runtime": 100,
            "release_date": "2021-01-01"
        }))
        .unwrap();
        let lookup = TmdbLookup {
            content_type: ContentType::Movie,
            details,
            episode: None,
        };
        let mut form = FormState::default();
        lookup.apply(&mut form);
        assert_eq!(form.title, "Película");
        assert_eq!(form.episode_length, Some(6000));
        assert_eq!(form.poster_url, "");

        let preview = lookup.preview("", "");
        assert_eq!(preview.year.as_deref(), Some("2021"));
        assert_eq!(preview.media_type.as_deref(), Some("Movie"));
        assert_eq!(preview.season, None);
    }

    #[test]
    fn test_preview_tv() {
        let lookup = TmdbLookup {
            content_type: ContentType::Tv,
            details: tv_details(),
            episode: None,
        };
        let preview = lookup.preview("2", "5");
        assert_eq!(preview.image_url, "https://image.tmdb.org/t/p/w500/poster.jpg");
        assert_eq!(preview.year.as_deref(), Some("2019"));
        assert_eq!(preview.episodes, Some(50));
        assert_eq!(preview.season.as_deref(), Some("2"));
    }

    #[test]
    fn test_previous_seasons_filters_specials_and_empty() {
        let seasons: Vec<TmdbSeasonSummary> = serde_json::from_value(json!([
            {"season_number": 3, "episode_count": 12},
            {"season_number": 0, "episode_count": 4},
            {"season_number": 1, "episode_count": 13},
            {"season_number": 2, "episode_count": 0},
            {"season_number": 4, "episode_count": 12}
        ]))
        .unwrap();
        let previous = previous_seasons(&seasons, 4);
        let numbers: Vec<_> = previous.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_count_previous_episodes_with_fallback() {
        let previous = vec![
            TmdbSeasonSummary { season_number: 1, episode_count: 13 },
            TmdbSeasonSummary { season_number: 2, episode_count: 11 },
        ];
        let fetched = vec![
            Ok(serde_json::from_value(json!({"episodes": [
                {"episode_number": 0}, {"episode_number": 1}, {"episode_number": 2}
            ]}))
            .unwrap()),
            Err(HttpClientError::BadStatus(500)),
        ];
        assert_eq!(count_previous_episodes(&previous, fetched), 2 + 11);
    }

    #[tokio::test]
    async fn test_absolute_episode_number_shortcuts() {
        let client = TmdbClient::new("key", "es-ES", "http://127.0.0.1:9");
        assert_eq!(client.absolute_episode_number(ContentType::Movie, "1", "3", "4").await, Some(1));
        assert_eq!(client.absolute_episode_number(ContentType::Tv, "1", "1", "4").await, Some(4));
        assert_eq!(client.absolute_episode_number(ContentType::Tv, "", "3", "4").await, Some(4));
        assert_eq!(client.absolute_episode_number(ContentType::Tv, "1", "3", "x").await, None);
    }

    #[tokio::test]
    async fn test_absolute_episode_number_sums_previous_seasons() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/42"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Serie",
                "seasons": [
                    {"season_number": 0, "episode_count": 2},
                    {"season_number": 1, "episode_count": 12},
                    {"season_number": 2, "episode_count": 10},
                    {"season_number": 3, "episode_count": 12}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/42/season/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "episodes": [{"episode_number": 1}, {"episode_number": 2}, {"episode_number": 3}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/42/season/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = TmdbClient::new("key", "es-ES", server.uri());
        let absolute = client
            .absolute_episode_number(ContentType::Tv, "42", "3", "5")
            .await;
        assert_eq!(absolute, Some(3 + 10 + 5));
    }

    #[tokio::test]
    async fn test_absolute_episode_number_falls_back_when_series_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/42"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = TmdbClient::new("key", "es-ES", server.uri());
        let absolute = client
            .absolute_episode_number(ContentType::Tv, "42", "3", "5")
            .await;
        assert_eq!(absolute, Some(5));
    }

    #[tokio::test]
    async fn test_search_id_takes_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("query", "Mi Serie"))
            .and(query_param("language", "es-ES"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": 7}, {"id": 8}]
            })))
            .mount(&server)
            .await;

        let client = TmdbClient::new("key", "es-ES", server.uri());
        assert_eq!(client.search_id(ContentType::Tv, "Mi Serie").await.unwrap(), Some(7));
        assert_eq!(client.search_id(ContentType::Movie, "Nada").await.ok().flatten(), None);
    }
}
