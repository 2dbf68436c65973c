use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{AuthState, CategoryFilter, FilterState, PipelineState, TimeRange, VideoRecord},
    services::normalize::{self, SEARCH_RESULT_LIMIT},
    services::providers::{IdentityProvider, SearchOptions, SearchProvider, TrendingSource},
};
use tokio::sync::{mpsc, watch, RwLock};

/// Fixed suffix appended to every provider query to bias results toward
/// viral video content
const DISCOVERY_SUFFIX: &str = "viral youtube videos";

/// Outcome of a search command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The query was blank after trimming; nothing was called or changed
    Skipped,
    /// Results were applied: the trimmed query and how many records it produced
    Applied { query: String, found: usize },
    /// A newer search was issued before this one resolved; its outcome was discarded
    Superseded,
}

/// One pipeline's observable state plus its staleness guard
///
/// `begin` bumps the sequence counter and flags the pipeline as loading; the
/// matching `apply_*` call takes effect only while that sequence is still the
/// latest issued. Any later bump (a newer request, a session teardown) turns
/// the in-flight completion into a discarded stale one.
struct PipelineCell {
    state: RwLock<PipelineState>,
    seq: AtomicU64,
}

impl PipelineCell {
    fn new() -> Self {
        Self {
            state: RwLock::new(PipelineState::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// Issues a new request sequence number and marks the pipeline loading
    ///
    /// The bump happens under the state lock so issuance, application, and
    /// reset are mutually ordered; an older issuance can never set the
    /// loading flag after a newer request has already settled.
    async fn begin(&self) -> u64 {
        let mut state = self.state.write().await;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        state.is_loading = true;
        seq
    }

    fn is_current(&self, seq: u64) -> bool {
        self.seq.load(Ordering::SeqCst) == seq
    }

    /// Replaces the result set if `seq` is still current
    ///
    /// Returns whether the results were applied. A successful application
    /// also clears `last_error`.
    async fn apply_results(&self, seq: u64, results: Vec<VideoRecord>) -> bool {
        let mut state = self.state.write().await;
        if !self.is_current(seq) {
            return false;
        }
        state.results = results;
        state.is_loading = false;
        state.last_error = None;
        true
    }

    /// Records a failure if `seq` is still current, keeping prior results
    async fn apply_error(&self, seq: u64, error: &AppError) -> bool {
        let mut state = self.state.write().await;
        if !self.is_current(seq) {
            return false;
        }
        state.is_loading = false;
        state.last_error = Some(error.to_string());
        true
    }

    /// Backs out an issued request if `seq` is still current
    ///
    /// Clears the loading flag without touching results or the recorded
    /// error; used when a request is abandoned after issuance, before any
    /// provider call.
    async fn abort(&self, seq: u64) {
        let mut state = self.state.write().await;
        if self.is_current(seq) {
            state.is_loading = false;
        }
    }

    /// Drops all state and invalidates any in-flight completion
    async fn reset(&self) {
        let mut state = self.state.write().await;
        self.seq.fetch_add(1, Ordering::SeqCst);
        *state = PipelineState::default();
    }

    async fn snapshot(&self) -> PipelineState {
        self.state.read().await.clone()
    }
}

/// Handle for stopping the coordinator's auth watcher task
///
/// Dropping the handle has the same effect as calling [`shutdown`], matching
/// the signal channel's closed-on-drop semantics.
///
/// [`shutdown`]: AuthWatcherHandle::shutdown
pub struct AuthWatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl AuthWatcherHandle {
    /// Stops the auth watcher task deterministically
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Auth watcher shutdown signal sent");
    }
}

/// The coordinator behind the discovery command/query surface
///
/// Owns the two independent data pipelines (trending feed and web search),
/// the trending filter selection, and a read-only view of authentication
/// state. All data access is gated on a settled session: commands issued
/// while auth state is still resolving are dropped, and a session ending
/// discards every pipeline's state so a later or anonymous session never
/// sees data fetched for a previous identity.
///
/// Each pipeline applies results last-write-wins by issuance order: every
/// invocation takes a sequence number up front, performs the provider call
/// without holding any lock, and applies its outcome only if its sequence is
/// still the latest issued. A superseded call completes normally and has its
/// outcome ignored.
pub struct DiscoveryCoordinator {
    identity: Arc<dyn IdentityProvider>,
    trending_source: Arc<dyn TrendingSource>,
    search_provider: Arc<dyn SearchProvider>,
    auth_rx: watch::Receiver<AuthState>,
    filters: RwLock<FilterState>,
    trending: PipelineCell,
    search: PipelineCell,
}

impl DiscoveryCoordinator {
    /// Creates the coordinator and spawns its auth watcher task
    ///
    /// The watcher subscribes to the identity provider and reacts to session
    /// edges: establishment triggers a trending load, teardown discards all
    /// pipeline state. The returned handle stops the watcher; hold it for as
    /// long as the coordinator should react to auth transitions.
    pub async fn new(
        identity: Arc<dyn IdentityProvider>,
        trending_source: Arc<dyn TrendingSource>,
        search_provider: Arc<dyn SearchProvider>,
    ) -> (Arc<Self>, AuthWatcherHandle) {
        let auth_rx = identity.subscribe();

        tracing::info!(
            trending_source = trending_source.name(),
            search_provider = search_provider.name(),
            "Discovery coordinator initialized"
        );

        let coordinator = Arc::new(Self {
            identity,
            trending_source,
            search_provider,
            auth_rx,
            filters: RwLock::new(FilterState::default()),
            trending: PipelineCell::new(),
            search: PipelineCell::new(),
        });

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let watcher_rx = coordinator.identity.subscribe();
        tokio::spawn(auth_watcher_task(
            Arc::clone(&coordinator),
            watcher_rx,
            shutdown_rx,
        ));

        (coordinator, AuthWatcherHandle { shutdown_tx })
    }

    // Queries

    /// Current authentication state as last published by the identity provider
    pub fn auth_state(&self) -> AuthState {
        self.auth_rx.borrow().clone()
    }

    /// Current trending feed selection
    pub async fn filter_state(&self) -> FilterState {
        *self.filters.read().await
    }

    /// Snapshot of the trending pipeline
    pub async fn trending_snapshot(&self) -> PipelineState {
        self.trending.snapshot().await
    }

    /// Snapshot of the search pipeline
    pub async fn search_snapshot(&self) -> PipelineState {
        self.search.snapshot().await
    }

    // Commands

    /// Begins a sign-in via the identity provider
    ///
    /// The new session is observed through the auth subscription, never
    /// returned here.
    pub async fn login(&self) -> AppResult<()> {
        self.ensure_settled()?;
        self.identity.login().await
    }

    /// Signs out via the identity provider
    pub async fn logout(&self) -> AppResult<()> {
        self.ensure_settled()?;
        self.identity.logout().await
    }

    /// Applies a category selection
    ///
    /// The selection is always recorded; a trending reload is triggered and
    /// awaited only while a session is present. Returns the trending snapshot
    /// after the reload settles.
    pub async fn set_category(&self, category: CategoryFilter) -> AppResult<PipelineState> {
        self.ensure_settled()?;
        self.filters.write().await.category = category;

        if self.session_present() {
            self.load_trending().await?;
        } else {
            tracing::debug!(category = %category, "Category recorded without a session, no load triggered");
        }

        Ok(self.trending.snapshot().await)
    }

    /// Applies a time range selection
    ///
    /// The time range re-triggers the trending load the same way a category
    /// change does, but no current trending source narrows its results by it.
    pub async fn set_time_range(&self, time_range: TimeRange) -> AppResult<PipelineState> {
        self.ensure_settled()?;
        self.filters.write().await.time_range = time_range;

        if self.session_present() {
            self.load_trending().await?;
        } else {
            tracing::debug!(time_range = %time_range, "Time range recorded without a session, no load triggered");
        }

        Ok(self.trending.snapshot().await)
    }

    /// Runs a search against the web search provider
    ///
    /// A blank query is a silent no-op, checked before the auth gate so a
    /// blank submission never surfaces a fault. Non-blank queries require a
    /// present session, carry the discovery suffix and result cap, and apply
    /// their normalized results last-issued-wins. Provider faults are
    /// recorded on the pipeline state and returned as the classified error.
    pub async fn run_search(&self, query: &str) -> AppResult<SearchOutcome> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(SearchOutcome::Skipped);
        }

        self.ensure_settled()?;
        if !self.session_present() {
            return Err(AppError::Unauthenticated);
        }

        let seq = self.search.begin().await;

        // The session can end between the gate check and issuance. A request
        // issued after the teardown's bump passes the staleness check, so it
        // must back out here instead of applying into a signed-out
        // coordinator.
        if !self.session_present() {
            self.search.abort(seq).await;
            return Err(AppError::Unauthenticated);
        }

        let provider_query = format!("{} {}", trimmed, DISCOVERY_SUFFIX);

        tracing::debug!(query = %trimmed, seq, "Search issued");

        let outcome = self
            .search_provider
            .query(
                &provider_query,
                SearchOptions {
                    limit: SEARCH_RESULT_LIMIT,
                },
            )
            .await
            .and_then(|response| {
                response.organic_results.ok_or_else(|| {
                    AppError::ExternalApi("Search response missing organic results".to_string())
                })
            });

        match outcome {
            Ok(raw) => {
                let records = normalize::normalize_batch(trimmed, &raw);
                let found = records.len();

                if !self.search.apply_results(seq, records).await {
                    tracing::debug!(query = %trimmed, seq, "Stale search completion discarded");
                    return Ok(SearchOutcome::Superseded);
                }

                tracing::info!(query = %trimmed, found, "Search results applied");
                Ok(SearchOutcome::Applied {
                    query: trimmed.to_string(),
                    found,
                })
            }
            Err(e) => {
                if !self.search.apply_error(seq, &e).await {
                    tracing::debug!(query = %trimmed, seq, "Stale search failure discarded");
                    return Ok(SearchOutcome::Superseded);
                }

                tracing::warn!(query = %trimmed, error = %e, "Search failed");
                Err(e)
            }
        }
    }

    // Pipeline internals

    /// Reloads the trending pipeline for the current filter selection
    ///
    /// The source's full set is fetched and filtered by category in source
    /// order. Failures keep prior results, record `last_error`, and surface
    /// as the classified error; a stale completion is discarded silently.
    async fn load_trending(&self) -> AppResult<()> {
        let seq = self.trending.begin().await;

        // Same teardown race as the search path: a load issued after the
        // reset's bump must not feed a signed-out coordinator.
        if !self.session_present() {
            self.trending.abort(seq).await;
            tracing::debug!(seq, "Trending load abandoned, session ended");
            return Ok(());
        }

        let filters = *self.filters.read().await;

        tracing::debug!(
            category = %filters.category,
            time_range = %filters.time_range,
            seq,
            "Trending load issued"
        );

        match self.trending_source.fetch_all().await {
            Ok(records) => {
                let filtered: Vec<VideoRecord> = records
                    .into_iter()
                    .filter(|record| filters.category.matches(&record.category))
                    .collect();
                let count = filtered.len();

                if self.trending.apply_results(seq, filtered).await {
                    tracing::info!(category = %filters.category, count, "Trending feed loaded");
                } else {
                    tracing::debug!(seq, "Stale trending completion discarded");
                }
                Ok(())
            }
            Err(e) => {
                if self.trending.apply_error(seq, &e).await {
                    tracing::warn!(error = %e, "Trending feed load failed");
                    Err(e)
                } else {
                    tracing::debug!(seq, "Stale trending failure discarded");
                    Ok(())
                }
            }
        }
    }

    fn ensure_settled(&self) -> AppResult<()> {
        if self.auth_rx.borrow().is_loading {
            return Err(AppError::AuthPending);
        }
        Ok(())
    }

    fn session_present(&self) -> bool {
        self.auth_rx.borrow().session.is_some()
    }

    /// Discards both pipelines' state and invalidates in-flight completions
    async fn reset_pipelines(&self) {
        self.trending.reset().await;
        self.search.reset().await;
    }
}

/// Background task reacting to authentication transitions
///
/// Runs until shut down or until the identity provider closes its
/// channel.
async fn auth_watcher_task(
    coordinator: Arc<DiscoveryCoordinator>,
    mut auth_rx: watch::Receiver<AuthState>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!("Auth watcher task started");

    // A session already established before the watcher starts counts as
    // a presence edge.
    let initial = auth_rx.borrow_and_update().clone();
    let mut active_user = handle_auth_transition(&coordinator, None, initial).await;

    loop {
        tokio::select! {
            changed = auth_rx.changed() => {
                match changed {
                    Ok(()) => {
                        let state = auth_rx.borrow_and_update().clone();
                        active_user = handle_auth_transition(&coordinator, active_user, state).await;
                    }
                    Err(_) => {
                        tracing::info!("Identity provider closed, auth watcher stopping");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("Auth watcher task stopped");
                break;
            }
        }
    }
}

/// Applies one observed auth transition, returning the now-active user id
///
/// Transitions still resolving are skipped: the command gate already
/// holds during that window and the next settled state is authoritative.
/// Acting on presence edges against the last settled value keeps
/// watch-channel coalescing harmless.
async fn handle_auth_transition(
    coordinator: &Arc<DiscoveryCoordinator>,
    active_user: Option<String>,
    state: AuthState,
) -> Option<String> {
    if state.is_loading {
        return active_user;
    }

    match (active_user, state.session) {
        (None, Some(session)) => {
            tracing::info!(user_id = %session.user_id, "Session established, loading trending feed");
            spawn_trending_load(coordinator);
            Some(session.user_id)
        }
        (Some(_), None) => {
            tracing::info!("Session ended, discarding pipeline state");
            coordinator.reset_pipelines().await;
            None
        }
        (Some(previous), Some(session)) => {
            if previous != session.user_id {
                // A different identity signed in without an intervening
                // signed-out state; it must not inherit the previous
                // user's results.
                tracing::info!(user_id = %session.user_id, "Session identity changed, reloading");
                coordinator.reset_pipelines().await;
                spawn_trending_load(coordinator);
            }
            Some(session.user_id)
        }
        (None, None) => None,
    }
}

/// Fires a trending load without awaiting its outcome
fn spawn_trending_load(coordinator: &Arc<DiscoveryCoordinator>) {
    let coordinator = Arc::clone(coordinator);
    tokio::spawn(async move {
        // Failures are recorded on the pipeline state; nothing to propagate here.
        let _ = coordinator.load_trending().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawSearchResult, Session, WebSearchResponse};
    use crate::services::providers::{MockSearchProvider, MockTrendingSource};
    use chrono::Utc;
    use std::time::Duration;

    /// Identity stub pinned to a fixed auth state, for gate tests
    struct FixedIdentity {
        state_tx: watch::Sender<AuthState>,
    }

    impl FixedIdentity {
        fn new(state: AuthState) -> Self {
            Self {
                state_tx: watch::Sender::new(state),
            }
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for FixedIdentity {
        fn subscribe(&self) -> watch::Receiver<AuthState> {
            self.state_tx.subscribe()
        }

        async fn login(&self) -> AppResult<()> {
            let session = Session {
                user_id: "user-1".to_string(),
                email: "creator@example.com".to_string(),
                signed_in_at: Utc::now(),
            };
            self.state_tx.send_replace(AuthState::signed_in(session));
            Ok(())
        }

        async fn logout(&self) -> AppResult<()> {
            self.state_tx.send_replace(AuthState::signed_out());
            Ok(())
        }
    }

    fn trending_fixture() -> Vec<VideoRecord> {
        let record = |id: &str, category: &str| VideoRecord {
            id: id.to_string(),
            title: format!("Video {}", id),
            channel: "Channel".to_string(),
            views: "1.0M".to_string(),
            likes: "10K".to_string(),
            duration: "10:00".to_string(),
            published_at: "1 day ago".to_string(),
            thumbnail: "https://images.unsplash.com/photo-1?w=400&h=225&fit=crop".to_string(),
            description: "A video".to_string(),
            tags: vec!["tag".to_string()],
            category: category.to_string(),
            trending_score: 80,
        };

        vec![
            record("a", "Technology"),
            record("b", "Education"),
            record("c", "Business"),
            record("d", "Technology"),
        ]
    }

    fn mock_trending(records: Vec<VideoRecord>) -> MockTrendingSource {
        let mut source = MockTrendingSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_fetch_all()
            .returning(move || Ok(records.clone()));
        source
    }

    fn idle_search() -> MockSearchProvider {
        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const("mock");
        provider
    }

    fn search_response(count: usize) -> WebSearchResponse {
        let results = (0..count)
            .map(|i| RawSearchResult {
                title: Some(format!("Result {}", i)),
                displayed_link: Some("https://www.youtube.com/watch".to_string()),
                snippet: Some("A snippet".to_string()),
            })
            .collect();
        WebSearchResponse {
            organic_results: Some(results),
        }
    }

    /// Polls until the trending pipeline has settled with results
    async fn settled_trending(coordinator: &DiscoveryCoordinator) -> PipelineState {
        for _ in 0..100 {
            let snapshot = coordinator.trending_snapshot().await;
            if !snapshot.is_loading && !snapshot.results.is_empty() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("trending pipeline never settled");
    }

    #[tokio::test]
    async fn test_commands_dropped_while_auth_resolving() {
        let identity = Arc::new(FixedIdentity::new(AuthState::resolving()));
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(idle_search()),
        )
        .await;

        assert!(matches!(
            coordinator.set_category(CategoryFilter::Technology).await,
            Err(AppError::AuthPending)
        ));
        assert!(matches!(
            coordinator.set_time_range(TimeRange::Month).await,
            Err(AppError::AuthPending)
        ));
        assert!(matches!(
            coordinator.run_search("ai tools").await,
            Err(AppError::AuthPending)
        ));
        assert!(matches!(coordinator.login().await, Err(AppError::AuthPending)));
        assert!(matches!(coordinator.logout().await, Err(AppError::AuthPending)));

        // Dropped, not queued: nothing was recorded
        assert_eq!(coordinator.filter_state().await, FilterState::default());
    }

    #[tokio::test]
    async fn test_blank_query_is_a_no_op_even_while_resolving() {
        let identity = Arc::new(FixedIdentity::new(AuthState::resolving()));
        // No query expectation: any provider call would panic the mock
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(vec![])),
            Arc::new(idle_search()),
        )
        .await;

        assert_eq!(coordinator.run_search("").await.unwrap(), SearchOutcome::Skipped);
        assert_eq!(coordinator.run_search("   ").await.unwrap(), SearchOutcome::Skipped);

        let snapshot = coordinator.search_snapshot().await;
        assert!(snapshot.results.is_empty());
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.last_error, None);
    }

    #[tokio::test]
    async fn test_search_without_session_rejected() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(vec![])),
            Arc::new(idle_search()),
        )
        .await;

        assert!(matches!(
            coordinator.run_search("ai tools").await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_filter_selection_recorded_without_session() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        // No fetch_all expectation: a triggered load would panic the mock
        let mut trending = MockTrendingSource::new();
        trending.expect_name().return_const("mock");

        let (coordinator, _watcher) =
            DiscoveryCoordinator::new(identity, Arc::new(trending), Arc::new(idle_search())).await;

        let snapshot = coordinator.set_category(CategoryFilter::Business).await.unwrap();
        assert!(snapshot.results.is_empty());
        assert!(!snapshot.is_loading);

        let filters = coordinator.filter_state().await;
        assert_eq!(filters.category, CategoryFilter::Business);
    }

    #[tokio::test]
    async fn test_sign_in_triggers_trending_load() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(idle_search()),
        )
        .await;

        coordinator.login().await.unwrap();

        let snapshot = settled_trending(&coordinator).await;
        assert_eq!(snapshot.results.len(), 4);
        assert_eq!(snapshot.last_error, None);
    }

    #[tokio::test]
    async fn test_category_filter_retains_matching_records_in_source_order() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(idle_search()),
        )
        .await;

        coordinator.login().await.unwrap();
        settled_trending(&coordinator).await;

        let snapshot = coordinator.set_category(CategoryFilter::Technology).await.unwrap();
        let ids: Vec<&str> = snapshot.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        for record in &snapshot.results {
            assert!(record.category.eq_ignore_ascii_case("technology"));
        }

        // Back to "all": the unfiltered set in source order
        let snapshot = coordinator.set_category(CategoryFilter::All).await.unwrap();
        let ids: Vec<&str> = snapshot.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_time_range_reloads_without_narrowing() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(idle_search()),
        )
        .await;

        coordinator.login().await.unwrap();
        let before = settled_trending(&coordinator).await;

        let after = coordinator.set_time_range(TimeRange::Month).await.unwrap();
        assert_eq!(after.results, before.results);
        assert_eq!(coordinator.filter_state().await.time_range, TimeRange::Month);
    }

    #[tokio::test]
    async fn test_search_carries_discovery_suffix_and_result_cap() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));

        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_query()
            .withf(|text, options| {
                text == "ai tools viral youtube videos" && options.limit == SEARCH_RESULT_LIMIT
            })
            .times(1)
            .returning(|_, _| Ok(search_response(3)));

        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(provider),
        )
        .await;

        coordinator.login().await.unwrap();

        let outcome = coordinator.run_search("  ai tools  ").await.unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Applied {
                query: "ai tools".to_string(),
                found: 3
            }
        );

        let snapshot = coordinator.search_snapshot().await;
        assert_eq!(snapshot.results.len(), 3);
        assert!(!snapshot.is_loading);
        for record in &snapshot.results {
            assert_eq!(record.category, "Search Result");
            assert_eq!(record.tags, vec!["ai", "tools"]);
            assert!((70..=99).contains(&record.trending_score));
        }
    }

    #[tokio::test]
    async fn test_search_failure_keeps_prior_results() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));

        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_query()
            .times(1)
            .returning(|_, _| Ok(search_response(2)));
        provider
            .expect_query()
            .times(1)
            .returning(|_, _| Err(AppError::ExternalApi("search backend down".to_string())));

        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(provider),
        )
        .await;

        coordinator.login().await.unwrap();
        coordinator.run_search("first query").await.unwrap();

        let result = coordinator.run_search("second query").await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));

        let snapshot = coordinator.search_snapshot().await;
        assert_eq!(snapshot.results.len(), 2, "prior results must survive a failure");
        assert!(!snapshot.is_loading);
        assert!(snapshot.last_error.as_deref().unwrap().contains("search backend down"));

        // Tags still belong to the applied (first) query
        assert_eq!(snapshot.results[0].tags, vec!["first", "query"]);
    }

    #[tokio::test]
    async fn test_search_response_missing_results_field_classified() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));

        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const("mock");
        provider.expect_query().times(1).returning(|_, _| {
            Ok(WebSearchResponse {
                organic_results: None,
            })
        });

        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(provider),
        )
        .await;

        coordinator.login().await.unwrap();

        let result = coordinator.run_search("ai tools").await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));

        let snapshot = coordinator.search_snapshot().await;
        assert!(snapshot.results.is_empty());
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn test_trending_failure_recorded_and_surfaced() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));

        let mut trending = MockTrendingSource::new();
        trending.expect_name().return_const("mock");
        trending
            .expect_fetch_all()
            .returning(|| Err(AppError::ExternalApi("feed unavailable".to_string())));

        let (coordinator, _watcher) =
            DiscoveryCoordinator::new(identity, Arc::new(trending), Arc::new(idle_search())).await;

        coordinator.login().await.unwrap();

        // The explicit reload surfaces the classified error
        let result = coordinator.set_category(CategoryFilter::Technology).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));

        let snapshot = coordinator.trending_snapshot().await;
        assert!(snapshot.results.is_empty());
        assert!(!snapshot.is_loading);
        assert!(snapshot.last_error.as_deref().unwrap().contains("feed unavailable"));
    }

    #[tokio::test]
    async fn test_logout_discards_pipeline_state() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));

        let mut provider = MockSearchProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_query()
            .returning(|_, _| Ok(search_response(3)));

        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(provider),
        )
        .await;

        coordinator.login().await.unwrap();
        settled_trending(&coordinator).await;
        coordinator.run_search("ai tools").await.unwrap();

        coordinator.logout().await.unwrap();

        // Teardown is asynchronous; wait for the watcher to observe the edge
        for _ in 0..100 {
            let trending = coordinator.trending_snapshot().await;
            let search = coordinator.search_snapshot().await;
            if trending.results.is_empty() && search.results.is_empty() {
                assert!(!trending.is_loading);
                assert!(!search.is_loading);
                assert_eq!(trending.last_error, None);
                assert_eq!(search.last_error, None);
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pipeline state survived logout");
    }

    #[tokio::test]
    async fn test_search_issued_during_teardown_is_backed_out() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        // No query expectation: reaching the provider would panic the mock
        let (coordinator, _watcher) = DiscoveryCoordinator::new(
            identity,
            Arc::new(mock_trending(trending_fixture())),
            Arc::new(idle_search()),
        )
        .await;

        coordinator.login().await.unwrap();
        settled_trending(&coordinator).await;

        // Hold the search pipeline's lock so the command parks inside
        // issuance, then let the logout land first.
        let guard = coordinator.search.state.write().await;
        let pending = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.run_search("ai tools").await }
        });
        tokio::task::yield_now().await;

        coordinator.logout().await.unwrap();
        drop(guard);

        assert!(matches!(
            pending.await.unwrap(),
            Err(AppError::Unauthenticated)
        ));

        let snapshot = coordinator.search_snapshot().await;
        assert!(snapshot.results.is_empty());
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_filter_reload_issued_during_teardown_is_backed_out() {
        let identity = Arc::new(FixedIdentity::new(AuthState::signed_out()));
        // Exactly one load is expected: the sign-in edge's. The abandoned
        // reload must never reach the source.
        let mut trending = MockTrendingSource::new();
        trending.expect_name().return_const("mock");
        trending
            .expect_fetch_all()
            .times(1)
            .returning(|| Ok(trending_fixture()));

        let (coordinator, _watcher) =
            DiscoveryCoordinator::new(identity, Arc::new(trending), Arc::new(idle_search())).await;

        coordinator.login().await.unwrap();
        settled_trending(&coordinator).await;

        let guard = coordinator.trending.state.write().await;
        let pending = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.set_category(CategoryFilter::Business).await }
        });
        tokio::task::yield_now().await;

        coordinator.logout().await.unwrap();
        drop(guard);
        assert!(pending.await.unwrap().is_ok());

        // Selection recorded, data discarded
        assert_eq!(
            coordinator.filter_state().await.category,
            CategoryFilter::Business
        );
        for _ in 0..100 {
            let snapshot = coordinator.trending_snapshot().await;
            if snapshot.results.is_empty() && !snapshot.is_loading {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("trending data survived the teardown");
    }

    #[tokio::test]
    async fn test_pipeline_cell_discards_stale_completions() {
        let cell = PipelineCell::new();

        let first = cell.begin().await;
        let second = cell.begin().await;

        // The late first completion must not overwrite the newer request
        assert!(!cell.apply_results(first, trending_fixture()).await);
        assert!(cell.apply_results(second, vec![]).await);

        let state = cell.snapshot().await;
        assert!(state.results.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_pipeline_cell_reset_invalidates_in_flight_request() {
        let cell = PipelineCell::new();

        let seq = cell.begin().await;
        cell.reset().await;

        assert!(!cell.apply_results(seq, trending_fixture()).await);
        assert!(!cell.apply_error(seq, &AppError::Internal("late".to_string())).await);

        let state = cell.snapshot().await;
        assert!(state.results.is_empty());
        assert!(!state.is_loading);
        assert_eq!(state.last_error, None);
    }

    #[tokio::test]
    async fn test_pipeline_cell_error_keeps_results() {
        let cell = PipelineCell::new();

        let seq = cell.begin().await;
        assert!(cell.apply_results(seq, trending_fixture()).await);

        let seq = cell.begin().await;
        assert!(cell.apply_error(seq, &AppError::ExternalApi("down".to_string())).await);

        let state = cell.snapshot().await;
        assert_eq!(state.results.len(), 4);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_pipeline_cell_issues_sequence_under_state_lock() {
        let cell = Arc::new(PipelineCell::new());

        // Park an issuance behind a held state lock; the sequence must not
        // move until the lock is released.
        let guard = cell.state.write().await;
        let pending = tokio::spawn({
            let cell = Arc::clone(&cell);
            async move { cell.begin().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(cell.seq.load(Ordering::SeqCst), 0);

        drop(guard);
        assert_eq!(pending.await.unwrap(), 1);
        assert!(cell.snapshot().await.is_loading);
    }

    #[tokio::test]
    async fn test_pipeline_cell_abort_backs_out_current_request_only() {
        let cell = PipelineCell::new();

        let seq = cell.begin().await;
        cell.abort(seq).await;
        let state = cell.snapshot().await;
        assert!(!state.is_loading);
        assert_eq!(state.last_error, None);

        // A stale abort must not disturb the newer request
        let old = cell.begin().await;
        let newer = cell.begin().await;
        cell.abort(old).await;
        assert!(cell.snapshot().await.is_loading);
        assert!(cell.apply_results(newer, vec![]).await);
    }
}
