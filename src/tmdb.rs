use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::models::{CastMember, MovieDetail, MovieSummary};

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const POSTER_PLACEHOLDER: &str = "https://placehold.co/300x450?text=No+Image";
pub const PROFILE_PLACEHOLDER: &str = "/person-placeholder.jpg";
/// Query sent when the user has not typed anything yet.
pub const DEFAULT_QUERY: &str = "popular";
const TOP_CAST: usize = 5;

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_movies(&self, query: &str) -> Result<Vec<MovieSummary>>;
    async fn fetch_movie(&self, id: i32) -> Result<MovieDetail>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Poster,
    Backdrop,
    Profile,
}

impl ImageSize {
    fn bucket(self) -> &'static str {
        match self {
            ImageSize::Poster => "w500",
            ImageSize::Backdrop => "w1280",
            ImageSize::Profile => "w200",
        }
    }
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let user_agent = format!("reelrate/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.tmdb_api_key.clone(), config.tmdb_base_url.clone())
    }

    pub fn search_url(&self, query: &str) -> String {
        let query = if query.is_empty() { DEFAULT_QUERY } else { query };
        format!(
            "{}/search/movie?api_key={}&query={}&include_adult=false",
            self.base_url,
            self.api_key,
            urlencoding::encode(query)
        )
    }

    pub fn detail_url(&self, id: i32) -> String {
        format!(
            "{}/movie/{id}?api_key={}&append_to_response=credits",
            self.base_url, self.api_key
        )
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("TMDB responded with status {}: {}", status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movies(&self, query: &str) -> Result<Vec<MovieSummary>> {
        let url = self.search_url(query);
        let data: SearchResponse = self.get_json(&url).await?;
        Ok(data.into_movies())
    }

    async fn fetch_movie(&self, id: i32) -> Result<MovieDetail> {
        let url = self.detail_url(id);
        self.get_json(&url)
            .await
            .with_context(|| format!("fetching TMDB movie {id}"))
    }
}

/// A search body whose `results` list is missing yields no movies.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    results: Option<Vec<MovieSummary>>,
}

impl SearchResponse {
    pub(crate) fn into_movies(self) -> Vec<MovieSummary> {
        self.results.unwrap_or_default()
    }
}

pub fn image_url(size: ImageSize, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{IMAGE_BASE}/{}{p}", size.bucket()))
}

pub fn poster_url(path: Option<&str>) -> String {
    image_url(ImageSize::Poster, path).unwrap_or_else(|| POSTER_PLACEHOLDER.to_string())
}

pub fn profile_url(path: Option<&str>) -> String {
    image_url(ImageSize::Profile, path).unwrap_or_else(|| PROFILE_PLACEHOLDER.to_string())
}

pub fn top_cast(detail: &MovieDetail) -> &[CastMember] {
    let cast = detail.credits.cast.as_slice();
    &cast[..cast.len().min(TOP_CAST)]
}
