pub mod catalog;
pub mod refresh;
pub mod status;
pub mod tracking;
pub mod updates;

pub use catalog::{CatalogClient, TmdbClient};
pub use refresh::{FeedState, UpdateFeeds, UpdateRefresher};
pub use status::{HttpStatusClient, StatusClient};
pub use tracking::TrackingStore;
pub use updates::{DerivedFeeds, UpdateEngine, DEFAULT_RECENT_WINDOW_DAYS};
