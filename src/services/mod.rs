pub mod discovery;
pub mod normalize;
pub mod providers;

pub use discovery::{AuthWatcherHandle, DiscoveryCoordinator, SearchOutcome};
