use serde::{Deserialize, Serialize};

/// A video in its normalized shape, regardless of origin (trending feed or search)
///
/// Records are immutable once produced: filtering and searching build new
/// result sets rather than editing existing records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    /// Unique within its owning result set (not globally unique across pipelines)
    pub id: String,
    /// Video title, may be a placeholder when source data is absent
    pub title: String,
    /// Channel or publisher name
    pub channel: String,
    /// Display-formatted view magnitude (e.g. "2.4M"), not necessarily numeric-parseable
    pub views: String,
    /// Display-formatted like magnitude (e.g. "89K")
    pub likes: String,
    /// "MM:SS" formatted duration
    pub duration: String,
    /// Free-text relative-time string (e.g. "2 days ago"), not a timestamp
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    /// Thumbnail URL, may reference a placeholder image pool
    pub thumbnail: String,
    /// Video description, may be a placeholder
    pub description: String,
    /// Ordered by relevance; insertion order is display order
    pub tags: Vec<String>,
    /// Trending category, or the "Search Result" sentinel for search-origin records
    pub category: String,
    /// Likelihood of virality in [0,100]; opaque for trending records, synthesized for search
    pub trending_score: u8,
}

/// Category selection for the trending feed
///
/// `All` is the no-filter sentinel; the remaining variants correspond to the
/// categories the trending catalog is tagged with. Matching against record
/// categories is case-insensitive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Technology,
    Business,
    Education,
    Entertainment,
    Lifestyle,
}

impl CategoryFilter {
    /// Lowercase wire form of the filter
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Technology => "technology",
            CategoryFilter::Business => "business",
            CategoryFilter::Education => "education",
            CategoryFilter::Entertainment => "entertainment",
            CategoryFilter::Lifestyle => "lifestyle",
        }
    }

    /// Whether a record with the given category passes this filter
    ///
    /// `All` passes everything; otherwise the comparison is case-insensitive.
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            _ => category.eq_ignore_ascii_case(self.as_str()),
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time window selection for the trending feed
///
/// Recognized and stored, and changing it re-triggers a trending load, but no
/// current trending source narrows its result set by it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl TimeRange {
    /// Lowercase wire form of the time range
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw organic result from the web search provider
///
/// Every field is optional on the wire; the normalizer fills the gaps.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct RawSearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub displayed_link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Envelope of a web search provider response
///
/// `organic_results` may be absent entirely; the search pipeline classifies
/// that as a provider fault rather than an empty result set.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct WebSearchResponse {
    #[serde(default)]
    pub organic_results: Option<Vec<RawSearchResult>>,
}
