//! SQLite-backed problem store.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use mathtutor_core::model::{ProblemSession, SessionId, Submission};
use mathtutor_core::traits::ProblemStore;

const CREATE_SESSIONS: &str = "CREATE TABLE IF NOT EXISTS math_problem_sessions (
    id             TEXT PRIMARY KEY,
    problem_text   TEXT NOT NULL,
    correct_answer REAL NOT NULL,
    created_at     TEXT NOT NULL
)";

const CREATE_SUBMISSIONS: &str = "CREATE TABLE IF NOT EXISTS math_problem_submissions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id    TEXT NOT NULL REFERENCES math_problem_sessions(id),
    user_answer   REAL NOT NULL,
    is_correct    INTEGER NOT NULL,
    feedback_text TEXT NOT NULL,
    submitted_at  TEXT NOT NULL
)";

type SessionRow = (String, String, f64, String);
type SubmissionRow = (String, f64, bool, String, String);

/// Durable store on a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://mathtutor.db` or `sqlite::memory:`),
    /// creating the database file and tables if they do not exist.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url: {url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database sees its own empty
        // database, so the pool must hold exactly one connection forever.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database: {url}"))?;

        for statement in [CREATE_SESSIONS, CREATE_SUBMISSIONS] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("failed to create tables")?;
        }

        info!(url, "problem store ready");
        Ok(Self { pool })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad timestamp in store: {raw}"))?
        .with_timezone(&Utc))
}

#[async_trait]
impl ProblemStore for SqliteStore {
    async fn insert_session(&self, session: &ProblemSession) -> Result<()> {
        sqlx::query(
            "INSERT INTO math_problem_sessions (id, problem_text, correct_answer, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(&session.problem_text)
        .bind(session.correct_answer)
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert session {}", session.id))?;
        debug!(session_id = %session.id, "session inserted");
        Ok(())
    }

    async fn fetch_session(&self, id: &SessionId) -> Result<Option<ProblemSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, problem_text, correct_answer, created_at \
             FROM math_problem_sessions WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to fetch session {id}"))?;

        row.map(|(id, problem_text, correct_answer, created_at)| {
            Ok(ProblemSession {
                id: SessionId::from(id),
                problem_text,
                correct_answer,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<()> {
        sqlx::query(
            "INSERT INTO math_problem_submissions \
             (session_id, user_answer, is_correct, feedback_text, submitted_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(submission.session_id.as_str())
        .bind(submission.user_answer)
        .bind(submission.is_correct)
        .bind(&submission.feedback_text)
        .bind(submission.submitted_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "failed to insert submission for session {}",
                submission.session_id
            )
        })?;
        Ok(())
    }

    async fn list_submissions(&self, id: &SessionId) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT session_id, user_answer, is_correct, feedback_text, submitted_at \
             FROM math_problem_submissions WHERE session_id = ? ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list submissions for session {id}"))?;

        rows.into_iter()
            .map(
                |(session_id, user_answer, is_correct, feedback_text, submitted_at)| {
                    Ok(Submission {
                        session_id: SessionId::from(session_id),
                        user_answer,
                        is_correct,
                        feedback_text,
                        submitted_at: parse_timestamp(&submitted_at)?,
                    })
                },
            )
            .collect()
    }
}
