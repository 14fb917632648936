//! Fetch-and-commit lifecycle for one instructor's records.
//!
//! Overlapping loads are allowed. Every load takes a generation number when
//! it starts, and its result is committed only if no newer load (or
//! [`StatsLoader::invalidate`]) happened in the meantime. Stale results are
//! dropped on arrival; nothing is cancelled.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::parser::parse_rows;
use crate::services::stats_api::StatsSource;
use crate::stats::StatsRecord;

#[derive(Debug, Clone)]
pub struct LoadState {
    pub instructor_id: Option<String>,
    pub records: Arc<[StatsRecord]>,
    pub error: Option<String>,
    pub loading: bool,
    pub generation: u64,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            instructor_id: None,
            records: Arc::from(Vec::new()),
            error: None,
            loading: false,
            generation: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Result committed; holds the number of records installed.
    Loaded(usize),
    /// Fetch failed; the error was committed and the records cleared.
    Failed(String),
    /// A newer load started first; the result was discarded.
    Superseded,
}

pub struct StatsLoader<S> {
    source: S,
    state: watch::Sender<LoadState>,
}

impl<S: StatsSource> StatsLoader<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(LoadState::default());
        Self { source, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Discards whatever is in flight without starting a new fetch.
    pub fn invalidate(&self) {
        self.state.send_modify(|state| {
            state.generation += 1;
            state.loading = false;
        });
    }

    /// Fetches and parses rows for `instructor_id`, committing the result
    /// unless a newer load has started since.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, instructor_id: &str) -> LoadOutcome {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.loading = true;
            state.instructor_id = Some(instructor_id.to_string());
        });
        debug!(generation, "Load started");

        let result = self.source.fetch_rows(instructor_id).await;

        let outcome = match &result {
            Ok(rows) => LoadOutcome::Loaded(rows.len()),
            Err(e) => LoadOutcome::Failed(e.to_string()),
        };

        let committed = self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.loading = false;
            match &result {
                Ok(rows) => {
                    state.records = Arc::from(parse_rows(rows));
                    state.error = None;
                }
                Err(e) => {
                    state.records = Arc::from(Vec::new());
                    state.error = Some(e.to_string());
                }
            }
            true
        });

        if !committed {
            debug!(generation, "Discarding superseded load result");
            return LoadOutcome::Superseded;
        }

        match &outcome {
            LoadOutcome::Loaded(count) => info!(records = count, "Statistics loaded"),
            LoadOutcome::Failed(error) => warn!(error = %error, "Statistics load failed"),
            LoadOutcome::Superseded => {}
        }
        outcome
    }
}
