pub mod pipeline;
pub mod session;
pub mod video;

pub use pipeline::{FilterState, PipelineState};
pub use session::{AuthState, Session};
pub use video::{CategoryFilter, RawSearchResult, TimeRange, VideoRecord, WebSearchResponse};
