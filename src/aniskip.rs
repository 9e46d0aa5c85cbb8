//! Aniskip 片头/片尾时间

use crate::form::{ClockTime, FormState};
use crate::http_client::{get_json, HttpClientError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const ANISKIP_API_BASE: &str = "https://api.aniskip.com/v2";

#[derive(Debug, Error)]
pub enum AniskipError {
    #[error("MyAnimeList ID 无效 (必须是正整数)")]
    InvalidMalId,
    #[error("单集时长无效，请先从 TMDB 获取内容信息")]
    InvalidEpisodeLength,
    #[error("绝对集数无效，请检查 TMDB 数据")]
    InvalidEpisodeNumber,
    #[error("没有找到该集的跳过时间")]
    NotFound,
    #[error("Aniskip 请求失败: {0}")]
    Http(#[from] HttpClientError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkipTimesResponse {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub results: Vec<SkipResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipResult {
    pub skip_type: String,
    pub interval: Option<SkipInterval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipInterval {
    pub start_time: f64,
    pub end_time: f64,
}

impl SkipInterval {
    fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// 选出的片头与片尾
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkipTimes {
    pub opening: Option<SkipInterval>,
    pub ending: Option<SkipInterval>,
}

impl SkipTimes {
    /// 先把时间输入框归零，再写入选中的时间
    pub fn apply(&self, form: &mut FormState) {
        form.reset_skip_times();
        if let Some(op) = self.opening {
            form.intro_start = ClockTime::from_total_seconds(op.start_time);
            form.intro_end = ClockTime::from_total_seconds(op.end_time);
        }
        if let Some(ed) = self.ending {
            form.ending_start = ClockTime::from_total_seconds(ed.start_time);
        }
    }
}

/// 解析表单中的 MAL ID
pub fn parse_mal_id(raw: &str) -> Result<u64, AniskipError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AniskipError::InvalidMalId),
    }
}

/// 片头取 endTime 不超过时长的最长区间，片尾取 startTime 不超过时长的最长区间
pub fn select_skip_times(results: &[SkipResult], episode_length: f64) -> SkipTimes {
    let best = |skip_type: &str, fits: fn(&SkipInterval, f64) -> bool| {
        let mut candidates: Vec<SkipInterval> = results
            .iter()
            .filter(|r| r.skip_type == skip_type)
            .filter_map(|r| r.interval)
            .collect();
        candidates.sort_by(|a, b| b.duration().total_cmp(&a.duration()));
        candidates.into_iter().find(|c| fits(c, episode_length))
    };

    SkipTimes {
        opening: best("op", |c, len| c.end_time <= len),
        ending: best("ed", |c, len| c.start_time <= len),
    }
}

#[derive(Debug, Clone)]
pub struct AniskipClient {
    base: String,
}

impl Default for AniskipClient {
    fn default() -> Self {
        Self::new(ANISKIP_API_BASE)
    }
}

impl AniskipClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn skip_times_url(&self, mal_id: u64, episode: u32, episode_length: u32) -> Result<String, AniskipError> {
        let mut url = Url::parse(&format!(
            "{}/skip-times/{}/{}",
            self.base.trim_end_matches('/'),
            mal_id,
            episode
        ))
        .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("types[]", "op")
            .append_pair("types[]", "ed")
            .append_pair("episodeLength", &episode_length.to_string());
        Ok(url.into())
    }

    /// 获取并挑选跳过时间
    pub async fn fetch(&self, mal_id: u64, episode: u32, episode_length: u32) -> Result<SkipTimes, AniskipError> {
        if mal_id == 0 {
            return Err(AniskipError::InvalidMalId);
        }
        if episode_length == 0 {
            return Err(AniskipError::InvalidEpisodeLength);
        }
        if episode == 0 {
            return Err(AniskipError::InvalidEpisodeNumber);
        }

        let url = self.skip_times_url(mal_id, episode, episode_length)?;
        debug!("Aniskip URL: {}", url);
        let response: SkipTimesResponse = get_json(&url).await?;
        if !response.found || response.results.is_empty() {
            return Err(AniskipError::NotFound);
        }

        let times = select_skip_times(&response.results, f64::from(episode_length));
        info!(
            "⏱️ Aniskip MAL {} 第 {} 集: 片头 {:?}, 片尾 {:?}",
            mal_id, episode, times.opening, times.ending
        );
        Ok(times)
    }
}
