//! mathtutor-store — persistence for problem sessions and submissions.
//!
//! Two `ProblemStore` backends: SQLite via sqlx for real deployments, and an
//! in-memory map for tests and throwaway runs.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use mathtutor_core::traits::ProblemStore;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Open the store named by a connection URL.
///
/// `memory://` selects [`MemoryStore`]; anything else is handed to sqlx.
pub async fn open_store(url: &str) -> anyhow::Result<Arc<dyn ProblemStore>> {
    if url == "memory://" {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::connect(url).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::model::SessionId;

    #[tokio::test]
    async fn opens_both_backends() {
        for url in ["memory://", "sqlite::memory:"] {
            let store = open_store(url).await.unwrap();
            assert!(store
                .fetch_session(&SessionId::from("nothing"))
                .await
                .unwrap()
                .is_none());
        }
    }

    #[tokio::test]
    async fn bad_url_is_error() {
        assert!(open_store("postgres://nope").await.is_err());
    }
}
