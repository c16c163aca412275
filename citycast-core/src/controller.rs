//! Weather view controller.
//!
//! Owns everything a weather view shows: the text being typed, the committed
//! city, the phase of the primary lookup (`Idle → Loading → Ready | Failed`),
//! the type-ahead suggestions and the favorite-city cards. State is published
//! through a `watch` channel so any front-end can render it.
//!
//! Every primary search, suggestion lookup and favorites refresh carries a
//! sequence number; a result whose number is no longer the latest is dropped,
//! so a slow response can never overwrite a newer one.
//!
//! Methods that start background work spawn tokio tasks and must be called
//! from within a runtime.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    error::FetchError,
    config::FALLBACK_CITY,
    model::{ForecastDays, Suggestion, WeatherReport, WeatherSnapshot},
    provider::WeatherSource,
    synthetic::SyntheticWeather,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub forecast_days: ForecastDays,
    /// Quiet period after the last keystroke before suggestions are fetched.
    pub debounce: Duration,
    /// Shorter (trimmed) input never triggers a lookup.
    pub min_query_len: usize,
    pub suggestion_limit: u8,
    pub favorites: Vec<String>,
    /// Seed for synthetic data; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            forecast_days: ForecastDays::default(),
            debounce: Duration::from_millis(300),
            min_query_len: 2,
            suggestion_limit: 5,
            favorites: Vec::new(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready(WeatherReport),
    /// User-facing error message.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    /// Text currently in the search box.
    pub input: String,
    /// City the primary lookup is for.
    pub city: String,
    pub phase: Phase,
    pub suggestions: Vec<Suggestion>,
    pub suggestions_open: bool,
    pub favorites: Vec<WeatherSnapshot>,
}

pub struct WeatherController {
    shared: Arc<Shared>,
}

struct Shared {
    source: WeatherSource,
    settings: ViewSettings,
    synthetic: Mutex<SyntheticWeather>,
    state: watch::Sender<ViewState>,
    search_seq: AtomicU64,
    lookup_seq: AtomicU64,
    favorites_seq: AtomicU64,
    pending_lookup: Mutex<Option<JoinHandle<()>>>,
}

impl WeatherController {
    pub fn new(source: WeatherSource, settings: ViewSettings) -> Self {
        let synthetic = settings
            .seed
            .map(SyntheticWeather::seeded)
            .unwrap_or_else(SyntheticWeather::from_entropy);
        let (state, _) = watch::channel(ViewState::default());

        Self {
            shared: Arc::new(Shared {
                source,
                settings,
                synthetic: Mutex::new(synthetic),
                state,
                search_seq: AtomicU64::new(0),
                lookup_seq: AtomicU64::new(0),
                favorites_seq: AtomicU64::new(0),
                pending_lookup: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.shared.settings
    }

    pub fn state(&self) -> ViewState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.state.subscribe()
    }

    /// Initial search when the view appears. Always runs, even for the city
    /// already committed. A blank city falls back to [`FALLBACK_CITY`].
    pub fn mount(&self, city: &str) -> JoinHandle<Phase> {
        let city = match city.trim() {
            "" => FALLBACK_CITY,
            city => city,
        };
        self.start(city, |s| s.input = city.to_string())
    }

    /// Commit a city. Starts a search only if it differs from the current one.
    pub fn commit_city(&self, city: &str) -> Option<JoinHandle<Phase>> {
        let city = city.trim();
        if !self.changes_city(city) {
            return None;
        }
        Some(self.start(city, |_| {}))
    }

    /// Commit whatever is in the search box.
    pub fn submit(&self) -> Option<JoinHandle<Phase>> {
        let input = self.shared.state.borrow().input.clone();
        self.close_suggestions();
        self.commit_city(&input)
    }

    /// Run one primary search to completion and return its outcome. The
    /// published state only changes if no newer search started meanwhile.
    pub async fn search(&self, city: &str) -> Phase {
        let city = city.trim();
        let seq = self.shared.begin_search(city, |_| {});
        self.shared.finish_search(seq, city).await
    }

    /// Type-ahead: record the new input and (re)arm the debounce timer.
    pub fn on_input(&self, text: &str) {
        let shared = &self.shared;
        shared.update(|s| s.input = text.to_string());
        shared.cancel_pending_lookup();
        let seq = shared.lookup_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let query = text.trim().to_string();
        if query.chars().count() < shared.settings.min_query_len {
            shared.clear_suggestions();
            return;
        }

        let task = Arc::clone(shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(task.settings.debounce).await;
            task.lookup(seq, &query).await;
        });
        *shared.pending_lookup.lock() = Some(handle);
    }

    /// Search box lost focus.
    pub fn blur(&self) {
        self.close_suggestions();
    }

    /// Pick a dropdown entry: it becomes both the input text and the
    /// committed city, published together with the cleared dropdown.
    pub fn select_suggestion(&self, suggestion: &Suggestion) -> Option<JoinHandle<Phase>> {
        let name = suggestion.name.trim();
        self.shared.cancel_pending_lookup();
        self.shared.lookup_seq.fetch_add(1, Ordering::SeqCst);

        let select = |s: &mut ViewState| {
            s.input = name.to_string();
            s.suggestions.clear();
            s.suggestions_open = false;
        };

        if !self.changes_city(name) {
            self.shared.update(select);
            return None;
        }
        Some(self.start(name, select))
    }

    /// Fetch current conditions for every favorite city, skipping failures.
    pub async fn refresh_favorites(&self) -> Vec<WeatherSnapshot> {
        self.shared.refresh_favorites().await
    }

    fn changes_city(&self, city: &str) -> bool {
        !city.is_empty() && self.shared.state.borrow().city != city
    }

    /// Begin a search, applying `prepare` in the same state update that
    /// enters `Loading`.
    fn start(&self, city: &str, prepare: impl FnOnce(&mut ViewState)) -> JoinHandle<Phase> {
        let seq = self.shared.begin_search(city, prepare);

        if !self.shared.settings.favorites.is_empty() {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                shared.refresh_favorites().await;
            });
        }

        let shared = Arc::clone(&self.shared);
        let city = city.to_string();
        tokio::spawn(async move { shared.finish_search(seq, &city).await })
    }

    fn close_suggestions(&self) {
        self.shared.cancel_pending_lookup();
        self.shared.lookup_seq.fetch_add(1, Ordering::SeqCst);
        self.shared.clear_suggestions();
    }
}

impl Drop for WeatherController {
    fn drop(&mut self) {
        self.shared.cancel_pending_lookup();
    }
}

impl Shared {
    fn update(&self, modify: impl FnOnce(&mut ViewState)) {
        self.state.send_modify(modify);
    }

    fn begin_search(&self, city: &str, prepare: impl FnOnce(&mut ViewState)) -> u64 {
        let seq = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|s| {
            prepare(s);
            s.city = city.to_string();
            s.phase = Phase::Loading;
        });
        tracing::debug!(city, seq, "Search started");
        seq
    }

    async fn finish_search(&self, seq: u64, city: &str) -> Phase {
        let phase = match self.load(city).await {
            Ok(report) => {
                tracing::info!(city, "Weather data fetched");
                Phase::Ready(report)
            }
            Err(err) => {
                tracing::warn!(city, error = ?err, "Weather lookup failed");
                Phase::Failed(err.to_string())
            }
        };

        if self.search_seq.load(Ordering::SeqCst) == seq {
            self.update(|s| s.phase = phase.clone());
        } else {
            tracing::debug!(city, seq, "Discarding result of superseded search");
        }

        phase
    }

    async fn load(&self, city: &str) -> Result<WeatherReport, FetchError> {
        let days = self.settings.forecast_days;

        match &self.source {
            WeatherSource::Synthetic => {
                let report = self.synthetic.lock().report(city, days, Utc::now());
                Ok(report)
            }
            WeatherSource::Live(provider) => {
                let (current, mut forecast) =
                    tokio::try_join!(provider.current(city), provider.forecast(city))?;
                forecast.truncate(days.count());
                Ok(WeatherReport { current, forecast })
            }
        }
    }

    async fn current_for(&self, city: &str) -> Result<WeatherSnapshot, FetchError> {
        match &self.source {
            WeatherSource::Synthetic => {
                let snapshot = self.synthetic.lock().current(city, Utc::now());
                Ok(snapshot)
            }
            WeatherSource::Live(provider) => provider.current(city).await,
        }
    }

    async fn refresh_favorites(self: &Arc<Self>) -> Vec<WeatherSnapshot> {
        let seq = self.favorites_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let lookups: Vec<_> = self
            .settings
            .favorites
            .iter()
            .map(|city| {
                let shared = Arc::clone(self);
                let task_city = city.clone();
                let handle = tokio::spawn(async move { shared.current_for(&task_city).await });
                (city.as_str(), handle)
            })
            .collect();

        let mut cards = Vec::with_capacity(lookups.len());
        for (city, handle) in lookups {
            match handle.await {
                Ok(Ok(snapshot)) => cards.push(snapshot),
                Ok(Err(err)) => tracing::warn!(city, error = ?err, "Skipping favorite city"),
                Err(err) => tracing::warn!(city, error = %err, "Favorite city task failed"),
            }
        }

        if self.favorites_seq.load(Ordering::SeqCst) == seq {
            self.update(|s| s.favorites = cards.clone());
        }

        cards
    }

    async fn lookup(&self, seq: u64, query: &str) {
        let suggestions = match &self.source {
            WeatherSource::Live(provider) => {
                match provider.suggest(query, self.settings.suggestion_limit).await {
                    Ok(list) => list,
                    Err(err) => {
                        tracing::debug!(query, error = %err, "Suggestion lookup failed");
                        Vec::new()
                    }
                }
            }
            WeatherSource::Synthetic => Vec::new(),
        };

        if self.lookup_seq.load(Ordering::SeqCst) != seq {
            return;
        }

        self.update(|s| {
            s.suggestions_open = !suggestions.is_empty();
            s.suggestions = suggestions;
        });
    }

    fn clear_suggestions(&self) {
        self.update(|s| {
            s.suggestions.clear();
            s.suggestions_open = false;
        });
    }

    fn cancel_pending_lookup(&self) {
        if let Some(handle) = self.pending_lookup.lock().take() {
            handle.abort();
        }
    }
}
