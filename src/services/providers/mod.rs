use tokio::sync::watch;

/// Boundary collaborator abstractions for video discovery
///
/// This module defines the pluggable seams the coordinator depends on: the
/// identity provider gating data access, the trending data source, and the
/// web search provider. Keeping them as trait objects means the coordinator
/// can be exercised with fakes and each adapter swapped independently.
use crate::{
    error::AppResult,
    models::{AuthState, VideoRecord, WebSearchResponse},
};

pub mod catalog;
pub mod identity;
pub mod serp;

/// Options for a web search call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of organic results requested from the provider
    pub limit: usize,
}

/// Trait for identity providers
///
/// Auth state is observed, never returned: `login` and `logout` only request
/// a transition, and their effects arrive through the subscription channel.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to authentication transitions
    ///
    /// Every transition is published to the returned channel. Dropping the
    /// receiver is the unsubscribe; no callback bookkeeping is involved.
    fn subscribe(&self) -> watch::Receiver<AuthState>;

    /// Begin a sign-in
    ///
    /// `Ok` means the request was accepted, not that a session now exists.
    async fn login(&self) -> AppResult<()>;

    /// Sign out, clearing any established session
    async fn logout(&self) -> AppResult<()>;
}

/// Trait for trending data sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrendingSource: Send + Sync {
    /// Fetch the current full trending set, unfiltered, in source order
    ///
    /// Each call returns the source's present notion of the trending set;
    /// freshness semantics belong to the source, not the caller.
    async fn fetch_all(&self) -> AppResult<Vec<VideoRecord>>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Trait for web search providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a web search, returning the provider's raw organic results
    ///
    /// The response may lack `organic_results` entirely; callers decide how
    /// to classify that.
    async fn query(&self, text: &str, options: SearchOptions) -> AppResult<WebSearchResponse>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
