mod state;

pub use crate::routes::create_router;
pub use state::{AppState, UserSession};
