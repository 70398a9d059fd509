//! API client for the episode REST service.
//!
//! This module fetches the landing-page episode list and single episode
//! records, and turns the wire format into [`EpisodeDetail`] values with all
//! display fields already formatted.

use crate::error::{AppError, Result};
use crate::format::{DisplayLocale, duration_to_time_string, format_published_at, html_to_text};
use crate::types::{Episode, EpisodeDetail};
use log::{debug, info, warn};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Maximum number of retry attempts for failed requests.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds (doubles each retry).
const BASE_RETRY_DELAY_MS: u64 = 500;

const USER_AGENT: &str = concat!("podcastr/", env!("CARGO_PKG_VERSION"));

/// A JSON value that may arrive either as a number or as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Number(serde_json::Number),
    Text(String),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Number(n) => n.to_string(),
            StringOrNumber::Text(s) => s,
        }
    }

    fn as_seconds(&self) -> Option<u64> {
        let value = match self {
            StringOrNumber::Number(n) => n.as_f64()?,
            StringOrNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };

        if value.is_finite() && value >= 0.0 {
            Some(value.floor() as u64)
        } else {
            None
        }
    }
}

// Wire format of a single episode record
#[derive(Debug, Deserialize)]
struct RawEpisode {
    id: StringOrNumber,
    title: String,
    #[serde(default)]
    members: String,
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    description: String,
    published_at: String,
    file: RawFile,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    url: String,
    duration: StringOrNumber,
}

impl RawEpisode {
    fn into_detail(self, locale: DisplayLocale) -> Result<EpisodeDetail> {
        let id = self.id.into_string();
        let duration = self.file.duration.as_seconds().ok_or_else(|| {
            AppError::Parse(format!(
                "episode '{}' has an invalid duration {:?}",
                id, self.file.duration
            ))
        })?;

        Ok(EpisodeDetail {
            published_at: format_published_at(&self.published_at, locale),
            duration_as_string: duration_to_time_string(duration),
            description: html_to_text(&self.description),
            episode: Episode {
                id,
                title: self.title,
                members: self.members,
                thumbnail: self.thumbnail,
                duration,
                url: self.file.url,
            },
        })
    }
}

/// Parse a single episode record.
pub fn parse_episode(json: &str, locale: DisplayLocale) -> Result<EpisodeDetail> {
    let raw: RawEpisode = serde_json::from_str(json)?;
    raw.into_detail(locale)
}

/// Parse an episode list response.
pub fn parse_episode_list(json: &str, locale: DisplayLocale) -> Result<Vec<EpisodeDetail>> {
    let raw: Vec<RawEpisode> = serde_json::from_str(json)?;
    raw.into_iter().map(|r| r.into_detail(locale)).collect()
}

fn base_url(base: &str) -> Result<Url> {
    let url = Url::parse(base)
        .map_err(|e| AppError::Config(format!("invalid API URL '{}': {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::Config(format!("invalid API URL '{}'", base)));
    }
    Ok(url)
}

/// URL of the landing-page query: newest episodes first.
pub fn episodes_url(base: &str, limit: usize) -> Result<Url> {
    let mut url = base_url(base)?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("episodes");
    }
    url.query_pairs_mut()
        .append_pair("_limit", &limit.to_string())
        .append_pair("_sort", "published_at")
        .append_pair("_order", "desc");
    Ok(url)
}

/// URL of a single episode record.
pub fn episode_url(base: &str, slug: &str) -> Result<Url> {
    let mut url = base_url(base)?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("episodes").push(slug);
    }
    Ok(url)
}

/// Check if an error is retryable (network errors, timeouts, server errors).
fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.is_request()
        || error.status().map(|s| s.is_server_error()).unwrap_or(false)
}

fn classify_error(operation_name: &str, error: reqwest::Error) -> AppError {
    if error.status() == Some(StatusCode::NOT_FOUND) {
        AppError::NotFound(operation_name.to_string())
    } else {
        AppError::Network(format!("{} failed: {}", operation_name, error))
    }
}

/// Retry an async operation with exponential backoff.
///
/// Retries the operation up to `MAX_RETRIES` times on retryable errors,
/// with exponential backoff starting at `BASE_RETRY_DELAY_MS`.
async fn retry_with_backoff<T, F, Fut>(operation_name: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, reqwest::Error>>,
{
    let mut last_error = None;

    for attempt in 0..=MAX_RETRIES {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        "{} succeeded after {} attempts",
                        operation_name,
                        attempt + 1
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt < MAX_RETRIES && is_retryable_error(&e) {
                    let delay = Duration::from_millis(BASE_RETRY_DELAY_MS * 2_u64.pow(attempt));
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempt + 1,
                        MAX_RETRIES + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    last_error = Some(e);
                } else {
                    return Err(classify_error(operation_name, e));
                }
            }
        }
    }

    Err(AppError::Network(format!(
        "{} failed after {} attempts: {}",
        operation_name,
        MAX_RETRIES + 1,
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string())
    )))
}

fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?)
}

async fn get_text(operation_name: &str, url: Url) -> Result<String> {
    let client = build_client()?;

    let resp = retry_with_backoff(operation_name, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
        }
    })
    .await?;

    Ok(resp.text().await?)
}

/// Fetch the newest `limit` episodes for the landing screen.
///
/// # Arguments
///
/// * `base` - Base URL of the episode API
/// * `limit` - Maximum number of episodes to request
/// * `locale` - Locale for the publication dates
pub async fn fetch_episodes(
    base: &str,
    limit: usize,
    locale: DisplayLocale,
) -> Result<Vec<EpisodeDetail>> {
    let url = episodes_url(base, limit)?;
    debug!("Fetching episode list from {}", url);

    let body = get_text("Fetch episodes", url).await?;
    let episodes = parse_episode_list(&body, locale)?;

    debug!("Found {} episodes", episodes.len());
    Ok(episodes)
}

/// Fetch a single episode by its slug.
///
/// Returns [`AppError::NotFound`] when the API has no record for `slug`.
pub async fn fetch_episode(base: &str, slug: &str, locale: DisplayLocale) -> Result<EpisodeDetail> {
    let url = episode_url(base, slug)?;
    debug!("Fetching episode {} from {}", slug, url);

    let body = get_text(&format!("episode '{}'", slug), url).await?;
    parse_episode(&body, locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "id": "a-importancia-da-contribuicao-em-open-source",
        "title": "Faladev #30 | A importância da contribuição em Open Source",
        "members": "Diego Fernandes, João Pedro, Diego Haz e Bruno Lemos",
        "published_at": "2021-01-22 16:30:00",
        "thumbnail": "https://example.com/opensource.jpg",
        "description": "<p>Nesse episódio do Faladev, Diego Fernandes se reúne com João Pedro.</p>",
        "file": {
            "url": "https://example.com/opensource.m4a",
            "type": "audio/x-m4a",
            "duration": 3981
        }
    }"#;

    #[test]
    fn test_parse_episode_formats_at_load_time() {
        let detail = parse_episode(RECORD, DisplayLocale::EnUs).unwrap();
        assert_eq!(
            detail.episode.id,
            "a-importancia-da-contribuicao-em-open-source"
        );
        assert_eq!(detail.episode.duration, 3981);
        assert_eq!(detail.episode.url, "https://example.com/opensource.m4a");
        assert_eq!(detail.published_at, "22 Jan 21");
        assert_eq!(detail.duration_as_string, "01:06:21");
        assert_eq!(
            detail.description,
            "Nesse episódio do Faladev, Diego Fernandes se reúne com João Pedro."
        );
    }

    #[test]
    fn test_parse_episode_accepts_string_duration_and_numeric_id() {
        let json = r#"{
            "id": 7,
            "title": "t",
            "published_at": "2021-01-22",
            "file": { "url": "u", "duration": "120" }
        }"#;
        let detail = parse_episode(json, DisplayLocale::EnUs).unwrap();
        assert_eq!(detail.episode.id, "7");
        assert_eq!(detail.episode.duration, 120);
        assert!(detail.episode.members.is_empty());
    }

    #[test]
    fn test_parse_episode_rejects_bad_duration() {
        let json = r#"{
            "id": "x",
            "title": "t",
            "published_at": "2021-01-22",
            "file": { "url": "u", "duration": "long" }
        }"#;
        let err = parse_episode(json, DisplayLocale::EnUs).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_parse_episode_missing_file_is_parse_error() {
        let err = parse_episode(r#"{"id":"x","title":"t","published_at":""}"#, DisplayLocale::EnUs)
            .unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_parse_episode_list_keeps_order() {
        let json = format!("[{}, {}]", RECORD, RECORD.replace("open-source\",", "b\","));
        let list = parse_episode_list(&json, DisplayLocale::PtBr).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].episode.id, "a-importancia-da-contribuicao-em-b");
    }

    #[test]
    fn test_episodes_url_query() {
        let url = episodes_url("http://localhost:3333", 12).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3333/episodes?_limit=12&_sort=published_at&_order=desc"
        );
    }

    #[test]
    fn test_episode_url_respects_base_path_and_escapes_slug() {
        let url = episode_url("https://api.example.com/v1/", "um episódio").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/episodes/um%20epis%C3%B3dio"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(episode_url("not a url", "x"), Err(AppError::Config(_))));
        assert!(matches!(episodes_url("mailto:a@b.c", 1), Err(AppError::Config(_))));
    }
}
