pub mod manager;
pub mod store;
pub mod types;

pub use manager::{GenerationGuard, SessionManager};
pub use store::{SNAPSHOT_FILE, SessionStore};
pub use types::{MAX_HISTORY, Session, SessionMap, Turn, ensure_session};
