use rand::Rng;

use crate::models::{RawSearchResult, VideoRecord};

/// At most this many raw results are normalized per search batch, and the
/// same cap is requested from the provider
pub const SEARCH_RESULT_LIMIT: usize = 8;

/// Sentinel category distinguishing search-origin records from any trending category
pub const SEARCH_CATEGORY: &str = "Search Result";

const TITLE_FALLBACK: &str = "Untitled Video";
const CHANNEL_FALLBACK: &str = "Unknown Channel";
const DESCRIPTION_FALLBACK: &str = "No description available";

/// Placeholder thumbnail pool: unsplash photo ids in
/// [`THUMBNAIL_POOL_BASE`, `THUMBNAIL_POOL_BASE + THUMBNAIL_POOL_SPAN`)
const THUMBNAIL_POOL_BASE: u64 = 1_500_000_000_000;
const THUMBNAIL_POOL_SPAN: u64 = 200_000_000;

/// How many leading query tokens become record tags
const TAG_TOKEN_LIMIT: usize = 4;

/// Normalizes a raw search batch into video records
///
/// At most [`SEARCH_RESULT_LIMIT`] results are mapped even if the provider
/// returned more. `query` is the trimmed user text (without the discovery
/// suffix); its leading whitespace-delimited tokens become every record's
/// tags.
pub fn normalize_batch(query: &str, raw: &[RawSearchResult]) -> Vec<VideoRecord> {
    let tags = query_tags(query);

    raw.iter()
        .take(SEARCH_RESULT_LIMIT)
        .enumerate()
        .map(|(index, result)| normalize_result(result, index, &tags))
        .collect()
}

/// Maps one raw result plus its batch position to a video record
///
/// The engagement figures (views, likes, duration, publish age, thumbnail,
/// trending score) are synthesized placeholders: the search provider exposes
/// no engagement metrics, and the dashboard deliberately fabricates plausible
/// ones instead of rendering blanks. The id is positional, so it is unique
/// within the batch only.
fn normalize_result(raw: &RawSearchResult, index: usize, tags: &[String]) -> VideoRecord {
    let mut rng = rand::rng();

    VideoRecord {
        id: format!("search_{}", index),
        title: raw
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| TITLE_FALLBACK.to_string()),
        channel: channel_from_display_link(raw.displayed_link.as_deref()),
        views: format!("{}K", rng.random_range(0..5000)),
        likes: format!("{}K", rng.random_range(0..500)),
        duration: format!("{}:{:02}", rng.random_range(5..25), rng.random_range(0..60)),
        published_at: format!("{} days ago", rng.random_range(1..8)),
        thumbnail: format!(
            "https://images.unsplash.com/photo-{}?w=400&h=225&fit=crop",
            THUMBNAIL_POOL_BASE + rng.random_range(0..THUMBNAIL_POOL_SPAN)
        ),
        description: raw
            .snippet
            .clone()
            .filter(|snippet| !snippet.is_empty())
            .unwrap_or_else(|| DESCRIPTION_FALLBACK.to_string()),
        tags: tags.to_vec(),
        category: SEARCH_CATEGORY.to_string(),
        trending_score: rng.random_range(70..100),
    }
}

/// First [`TAG_TOKEN_LIMIT`] whitespace-delimited tokens of the query
fn query_tags(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .take(TAG_TOKEN_LIMIT)
        .map(str::to_string)
        .collect()
}

/// Extracts a channel-like name from a provider display link
///
/// Takes the third `/`-delimited segment (the host of a scheme-qualified
/// URL) and strips a literal `www.` prefix. An absent field, too few
/// segments, or an empty host falls back to the placeholder; this never
/// fails.
fn channel_from_display_link(displayed_link: Option<&str>) -> String {
    displayed_link
        .and_then(|link| link.split('/').nth(2))
        .map(|segment| segment.strip_prefix("www.").unwrap_or(segment))
        .filter(|channel| !channel.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| CHANNEL_FALLBACK.to_string())
}
