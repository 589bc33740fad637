//! Async filesystem helpers

use std::io;
use std::path::Path;

/// Returns `true` if the path exists, without blocking the runtime.
///
/// A missing path is `Ok(false)`; only OS-level failures such as a
/// permission error are reported as `Err`.
pub async fn file_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    tokio::fs::try_exists(path).await
}
