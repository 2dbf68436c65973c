use serde::{Deserialize, Serialize};

use super::video::{CategoryFilter, TimeRange, VideoRecord};

/// Observable state of one data pipeline (trending or search)
///
/// Created empty at coordinator init. `is_loading` is true exactly while a
/// fetch is in flight. On completion either `results` is replaced (success,
/// `last_error` cleared) or `last_error` is set and `results` keeps its
/// previous value: stale-but-valid data is preferred over blanking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PipelineState {
    pub results: Vec<VideoRecord>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Trending feed selection, mutated only by explicit user commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FilterState {
    pub category: CategoryFilter,
    pub time_range: TimeRange,
}
