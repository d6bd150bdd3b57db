use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::models::MovieDetail;
use crate::tmdb::TmdbApi;

pub const DETAIL_ERROR_MESSAGE: &str = "Failed to fetch movie details";

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Failed(String),
    Loaded(Box<MovieDetail>),
}

impl DetailState {
    pub fn is_loading(&self) -> bool {
        matches!(self, DetailState::Loading)
    }
}

/// Detail fetch for one open movie view. Dropping the session discards the
/// state and aborts a fetch still in flight; nothing is cached.
/// A session is bound to one movie id and fetches it exactly once.
pub struct DetailSession {
    state: watch::Receiver<DetailState>,
    task: JoinHandle<()>,
}

impl DetailSession {
    pub fn open(tmdb: Arc<dyn TmdbApi>, movie_id: i32) -> Self {
        let (state, task) = start_fetch(tmdb, movie_id);
        Self { state, task }
    }

    pub async fn settled(&mut self) -> DetailState {
        let state = match self.state.wait_for(|s| !s.is_loading()).await {
            Ok(s) => s.clone(),
            Err(_) => DetailState::Failed(DETAIL_ERROR_MESSAGE.to_string()),
        };
        state
    }
}

impl Drop for DetailSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn start_fetch(
    tmdb: Arc<dyn TmdbApi>,
    movie_id: i32,
) -> (watch::Receiver<DetailState>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(DetailState::Loading);
    let task = tokio::spawn(async move {
        let next = match tmdb.fetch_movie(movie_id).await {
            Ok(detail) => {
                info!("Loaded details for movie {} '{}'", movie_id, detail.title);
                DetailState::Loaded(Box::new(detail))
            }
            Err(e) => {
                warn!("Error fetching movie details for {}: {:#}", movie_id, e);
                DetailState::Failed(DETAIL_ERROR_MESSAGE.to_string())
            }
        };
        tx.send_replace(next);
    });
    (rx, task)
}

pub fn format_runtime(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credits, MovieSummary};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingTmdb {
        fetched: Mutex<Vec<i32>>,
    }

    #[async_trait]
    impl TmdbApi for CountingTmdb {
        async fn search_movies(&self, _query: &str) -> Result<Vec<MovieSummary>> {
            Ok(vec![])
        }

        async fn fetch_movie(&self, id: i32) -> Result<MovieDetail> {
            self.fetched.lock().unwrap().push(id);
            if id < 0 {
                return Err(anyhow!("404 Not Found"));
            }
            Ok(MovieDetail {
                id,
                title: format!("Movie {id}"),
                overview: String::new(),
                poster_path: None,
                backdrop_path: None,
                release_date: None,
                vote_average: 0.0,
                runtime: 90,
                genres: vec![],
                credits: Credits::default(),
            })
        }
    }

    #[test]
    fn formats_runtime_as_hours_and_minutes() {
        assert_eq!(format_runtime(148), "2h 28m");
        assert_eq!(format_runtime(60), "1h 0m");
        assert_eq!(format_runtime(45), "0h 45m");
    }

    #[tokio::test]
    async fn open_fetches_once() {
        let tmdb = Arc::new(CountingTmdb::default());
        let mut session = DetailSession::open(tmdb.clone(), 27205);
        match session.settled().await {
            DetailState::Loaded(detail) => assert_eq!(detail.id, 27205),
            other => panic!("unexpected state {other:?}"),
        }
        session.settled().await;
        assert_eq!(*tmdb.fetched.lock().unwrap(), vec![27205]);
    }

    #[tokio::test]
    async fn each_open_fetches_again() {
        let tmdb = Arc::new(CountingTmdb::default());
        DetailSession::open(tmdb.clone(), 2).settled().await;
        DetailSession::open(tmdb.clone(), 2).settled().await;
        assert_eq!(*tmdb.fetched.lock().unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn failed_fetch_reports_error() {
        let tmdb = Arc::new(CountingTmdb::default());
        let mut session = DetailSession::open(tmdb, -1);
        assert_eq!(
            session.settled().await,
            DetailState::Failed(DETAIL_ERROR_MESSAGE.to_string())
        );
    }
}
