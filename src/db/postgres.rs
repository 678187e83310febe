use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{external_id_of, CatalogMovie, HistoryAppend, MovieId, UserRecord},
};

/// Candidate documents fetched per title lookup; rows without a usable id are skipped
const TITLE_CANDIDATES: i64 = 20;

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    genres: Vec<String>,
    signin_date: DateTime<Utc>,
    last_log_date: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            genres: row.genres,
            signin_date: row.signin_date,
            last_log_date: row.last_log_date,
        }
    }
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn first_movie(&self, sql: &str, title: &str) -> AppResult<Option<CatalogMovie>> {
        let docs: Vec<Value> = sqlx::query_scalar(sql)
            .bind(title)
            .bind(TITLE_CANDIDATES)
            .fetch_all(&self.pool)
            .await?;

        Ok(docs.iter().find_map(CatalogMovie::from_document))
    }
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, genres, signin_date, last_log_date";

#[async_trait::async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn insert_user(&self, user: UserRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, genres, signin_date, last_log_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.genres)
        .bind(user.signin_date)
        .bind(user.last_log_date)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::InvalidInput("User already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_log_date = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn history(&self, email: &str) -> AppResult<Option<Vec<MovieId>>> {
        let list: Option<Vec<MovieId>> =
            sqlx::query_scalar("SELECT movie_list FROM watch_history WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(list)
    }

    async fn append_history(&self, email: &str, movie_id: MovieId) -> AppResult<HistoryAppend> {
        // xmax is 0 only for freshly inserted rows; no row back means the id was already there.
        let inserted: Option<bool> = sqlx::query_scalar(
            r#"
            INSERT INTO watch_history (email, movie_list)
            VALUES ($1, ARRAY[$2::BIGINT])
            ON CONFLICT (email) DO UPDATE
                SET movie_list = array_append(watch_history.movie_list, $2::BIGINT)
                WHERE NOT ($2::BIGINT = ANY(watch_history.movie_list))
            RETURNING (xmax = 0)
            "#,
        )
        .bind(email)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(true) => HistoryAppend::Created,
            Some(false) => HistoryAppend::Appended,
            None => HistoryAppend::AlreadyPresent,
        })
    }

    async fn find_movie_by_title(&self, title: &str) -> AppResult<Option<CatalogMovie>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let exact = self
            .first_movie(
                r#"
                SELECT doc FROM movie_documents
                WHERE lower(trim(doc->>'title')) = lower($1)
                ORDER BY id
                LIMIT $2
                "#,
                title,
            )
            .await?;
        if exact.is_some() {
            return Ok(exact);
        }

        self.first_movie(
            r#"
            SELECT doc FROM movie_documents
            WHERE strpos(lower(doc->>'title'), lower($1)) > 0
            ORDER BY id
            LIMIT $2
            "#,
            title,
        )
        .await
    }

    async fn sample_movie_ids(&self, n: usize) -> AppResult<Vec<MovieId>> {
        let docs: Vec<Value> =
            sqlx::query_scalar("SELECT doc FROM movie_documents ORDER BY random() LIMIT $1")
                .bind(n as i64)
                .fetch_all(&self.pool)
                .await?;

        Ok(docs.iter().filter_map(external_id_of).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
