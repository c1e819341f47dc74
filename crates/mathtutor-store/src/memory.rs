//! In-memory problem store.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use mathtutor_core::model::{ProblemSession, SessionId, Submission};
use mathtutor_core::traits::ProblemStore;

/// Process-local store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, ProblemSession>>,
    submissions: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn insert_session(&self, session: &ProblemSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            bail!("session {} already exists", session.id);
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn fetch_session(&self, id: &SessionId) -> Result<Option<ProblemSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<()> {
        if !self
            .sessions
            .read()
            .await
            .contains_key(&submission.session_id)
        {
            bail!("no session {} for submission", submission.session_id);
        }
        self.submissions.write().await.push(submission.clone());
        Ok(())
    }

    async fn list_submissions(&self, id: &SessionId) -> Result<Vec<Submission>> {
        Ok(self
            .submissions
            .read()
            .await
            .iter()
            .filter(|s| &s.session_id == id)
            .cloned()
            .collect())
    }
}
