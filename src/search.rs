//! Debounced movie search.
//!
//! Query changes are funnelled through a channel into a single debouncer task.
//! Once input has been quiet for the debounce window the settled query is
//! searched on its own task, so a slow request never delays the next one.
//! Each request carries a sequence number and a response older than the one
//! on display is dropped.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::MovieSummary;
use crate::tmdb::TmdbApi;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const SEARCH_ERROR_MESSAGE: &str = "Failed to fetch movies. Please try again later.";

#[derive(Debug, Clone, Default)]
pub struct SearchSnapshot {
    /// Latest query text the user entered.
    pub query: String,
    /// Query whose results are on display.
    pub displayed_query: Option<String>,
    pub movies: Arc<Vec<MovieSummary>>,
    pub error: Option<String>,
    /// A change is waiting out the debounce window.
    pub pending: bool,
    /// Count of accepted query changes, the initial search included.
    pub revision: u64,
    pub issued_seq: u64,
    pub displayed_seq: u64,
}

impl SearchSnapshot {
    pub fn is_loading(&self) -> bool {
        self.displayed_seq < self.issued_seq
    }

    pub fn is_settled(&self) -> bool {
        !self.pending && !self.is_loading()
    }
}

pub struct SearchController {
    changes: mpsc::UnboundedSender<(u64, String)>,
    state: Arc<watch::Sender<SearchSnapshot>>,
    debouncer: JoinHandle<()>,
}

impl SearchController {
    /// Starts the debouncer and schedules the initial empty-query search.
    pub fn spawn(tmdb: Arc<dyn TmdbApi>, debounce: Duration) -> Self {
        let (changes, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(SearchSnapshot {
            pending: true,
            revision: 1,
            ..SearchSnapshot::default()
        });
        let state = Arc::new(state);
        let debouncer = tokio::spawn(run_debouncer(rx, tmdb, Arc::clone(&state), debounce));
        // The receiver is alive inside the task we just spawned.
        let _ = changes.send((1, String::new()));
        Self {
            changes,
            state,
            debouncer,
        }
    }

    /// Records a change of the query text. Returns false when the text is the
    /// same as the current query and nothing was scheduled.
    pub fn set_query(&self, query: impl Into<String>) -> bool {
        let query = query.into();
        let mut revision = 0;
        let changed = self.state.send_if_modified(|s| {
            if s.query == query {
                return false;
            }
            s.query = query.clone();
            s.pending = true;
            s.revision += 1;
            revision = s.revision;
            true
        });
        if changed && self.changes.send((revision, query)).is_err() {
            warn!("Search debouncer has stopped; query change dropped");
            return false;
        }
        changed
    }

    /// Hides the current error panel until the next response arrives.
    pub fn dismiss_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.state.subscribe()
    }

    /// Waits until no change is pending and no newer request is in flight.
    pub async fn settled(&self) -> SearchSnapshot {
        let mut rx = self.subscribe();
        let snapshot = match rx.wait_for(SearchSnapshot::is_settled).await {
            Ok(s) => s.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.debouncer.abort();
    }
}

async fn run_debouncer(
    mut rx: mpsc::UnboundedReceiver<(u64, String)>,
    tmdb: Arc<dyn TmdbApi>,
    state: Arc<watch::Sender<SearchSnapshot>>,
    debounce: Duration,
) {
    while let Some((mut revision, mut query)) = rx.recv().await {
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(next)) => (revision, query) = next,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let mut seq = 0;
        state.send_modify(|s| {
            s.issued_seq += 1;
            s.error = None;
            // A change may have been accepted but not yet received.
            s.pending = s.revision > revision;
            seq = s.issued_seq;
        });
        debug!(seq, query = %query, "Issuing search");
        tokio::spawn(run_search(Arc::clone(&tmdb), Arc::clone(&state), query, seq));
    }
}

async fn run_search(
    tmdb: Arc<dyn TmdbApi>,
    state: Arc<watch::Sender<SearchSnapshot>>,
    query: String,
    seq: u64,
) {
    let result = tmdb.search_movies(&query).await;
    let (movies, error) = match result {
        Ok(movies) => {
            info!("Search '{}' returned {} movies", query, movies.len());
            (movies, None)
        }
        Err(e) => {
            warn!("Failed to fetch movies for '{}': {:#}", query, e);
            (Vec::new(), Some(SEARCH_ERROR_MESSAGE.to_string()))
        }
    };

    let applied = state.send_if_modified(|s| {
        if seq <= s.displayed_seq {
            return false;
        }
        s.displayed_seq = seq;
        s.displayed_query = Some(query.clone());
        s.movies = Arc::new(movies);
        s.error = error;
        true
    });
    if !applied {
        debug!(seq, query = %query, "Discarding stale search response");
    }
}
