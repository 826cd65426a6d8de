use async_trait::async_trait;
use quickstart_core::{Credential, QuickstartError};
use quickstart_ports::CredentialStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Postgres, Sqlite};
use std::borrow::Cow;
use std::path::PathBuf;

#[derive(Clone, Debug)]
enum DatabasePool {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

/// SQL-backed credential store (SQLite/Postgres) using SQLx.
pub struct SqlxCredentialStore {
    pool: DatabasePool,
}

impl SqlxCredentialStore {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = if database_url.starts_with("postgres") {
            DatabasePool::Postgres(
                PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await?,
            )
        } else if is_sqlite_memory(database_url) {
            // Each in-memory connection is its own database; pin the pool to one
            // connection that never gets recycled.
            DatabasePool::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect(database_url)
                    .await?,
            )
        } else {
            // Best-effort: if the directory can't be created, sqlx surfaces the
            // underlying error on connect.
            if let Some(path) = sqlite_db_path(database_url) {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                }
            }

            let connect_url = sqlite_url_with_create_mode(database_url);
            DatabasePool::Sqlite(Pool::<Sqlite>::connect(connect_url.as_ref()).await?)
        };

        Ok(Self { pool })
    }

    pub fn db_system(&self) -> &'static str {
        match self.pool {
            DatabasePool::Sqlite(_) => "sqlite",
            DatabasePool::Postgres(_) => "postgresql",
        }
    }

    async fn init_sqlx(&self) -> Result<(), sqlx::Error> {
        // Both statements are idempotent.
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS credentials (
                        user_id TEXT PRIMARY KEY,
                        access_token TEXT NOT NULL,
                        refresh_token TEXT,
                        expiry TEXT,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );
                    "#,
                )
                .execute(pool)
                .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS credentials (
                        user_id TEXT PRIMARY KEY,
                        access_token TEXT NOT NULL,
                        refresh_token TEXT,
                        expiry TIMESTAMPTZ,
                        created_at TIMESTAMPTZ NOT NULL,
                        updated_at TIMESTAMPTZ NOT NULL
                    );
                    "#,
                )
                .execute(pool)
                .await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqlxCredentialStore {
    async fn init(&self) -> Result<(), QuickstartError> {
        self.init_sqlx().await.map_err(Into::into)
    }

    async fn healthcheck(&self) -> Result<(), QuickstartError> {
        // Keep readiness/liveness cheap: no schema bootstrap.
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }

        Ok(())
    }

    async fn save_credential(&self, credential: &Credential) -> Result<(), QuickstartError> {
        // created_at is kept from the first insert.
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO credentials (user_id, access_token, refresh_token, expiry, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(user_id) DO UPDATE SET
                        access_token = excluded.access_token,
                        refresh_token = excluded.refresh_token,
                        expiry = excluded.expiry,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(&credential.user_id)
                .bind(&credential.access_token)
                .bind(&credential.refresh_token)
                .bind(credential.expiry)
                .bind(credential.created_at)
                .bind(credential.updated_at)
                .execute(pool)
                .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO credentials (user_id, access_token, refresh_token, expiry, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (user_id) DO UPDATE SET
                        access_token = EXCLUDED.access_token,
                        refresh_token = EXCLUDED.refresh_token,
                        expiry = EXCLUDED.expiry,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(&credential.user_id)
                .bind(&credential.access_token)
                .bind(&credential.refresh_token)
                .bind(credential.expiry)
                .bind(credential.created_at)
                .bind(credential.updated_at)
                .execute(pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn get_credential(&self, user_id: &str) -> Result<Option<Credential>, QuickstartError> {
        let credential = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await?
            }
        };

        Ok(credential)
    }

    async fn delete_credential(&self, user_id: &str) -> Result<(), QuickstartError> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query("DELETE FROM credentials WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("DELETE FROM credentials WHERE user_id = $1")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
            }
        }

        Ok(())
    }

    async fn count_credentials(&self) -> Result<i64, QuickstartError> {
        let count: i64 = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM credentials")
                    .fetch_one(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM credentials")
                    .fetch_one(pool)
                    .await?
            }
        };

        Ok(count)
    }

    async fn list_credentials(&self) -> Result<Vec<Credential>, QuickstartError> {
        let credentials = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, Credential>("SELECT * FROM credentials ORDER BY user_id")
                    .fetch_all(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, Credential>("SELECT * FROM credentials ORDER BY user_id")
                    .fetch_all(pool)
                    .await?
            }
        };

        Ok(credentials)
    }
}

fn is_sqlite_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn sqlite_db_path(database_url: &str) -> Option<PathBuf> {
    if !database_url.starts_with("sqlite:") || is_sqlite_memory(database_url) {
        return None;
    }

    let mut rest = &database_url["sqlite:".len()..];

    // Reduce URL-ish leading slashes to a single one.
    if rest.starts_with("///") {
        rest = &rest[2..];
    } else if rest.starts_with("//") {
        rest = &rest[1..];
    }

    let path_part = rest.split('?').next().unwrap_or(rest);
    if path_part.is_empty() {
        return None;
    }

    Some(PathBuf::from(path_part))
}

fn sqlite_url_with_create_mode(database_url: &str) -> Cow<'_, str> {
    if !database_url.starts_with("sqlite:") || is_sqlite_memory(database_url) {
        return Cow::Borrowed(database_url);
    }
    if database_url.contains("mode=") {
        return Cow::Borrowed(database_url);
    }

    let sep = if database_url.contains('?') { '&' } else { '?' };
    Cow::Owned(format!("{database_url}{sep}mode=rwc"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickstart_core::OAuthTokens;

    #[test]
    fn sqlite_path_is_extracted_from_url_forms() {
        assert_eq!(
            sqlite_db_path("sqlite:///var/data/quickstart.db"),
            Some(PathBuf::from("/var/data/quickstart.db"))
        );
        assert_eq!(
            sqlite_db_path("sqlite:quickstart.db?mode=rwc"),
            Some(PathBuf::from("quickstart.db"))
        );
        assert_eq!(sqlite_db_path("sqlite::memory:"), None);
        assert_eq!(sqlite_db_path("postgres://localhost/db"), None);
    }

    #[test]
    fn create_mode_is_appended_once() {
        assert_eq!(
            sqlite_url_with_create_mode("sqlite:quickstart.db"),
            "sqlite:quickstart.db?mode=rwc"
        );
        assert_eq!(
            sqlite_url_with_create_mode("sqlite:quickstart.db?cache=shared"),
            "sqlite:quickstart.db?cache=shared&mode=rwc"
        );
        assert_eq!(
            sqlite_url_with_create_mode("sqlite:quickstart.db?mode=ro"),
            "sqlite:quickstart.db?mode=ro"
        );
        assert_eq!(sqlite_url_with_create_mode("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn in_memory_store_upserts_and_keeps_created_at() {
        let store = SqlxCredentialStore::new("sqlite::memory:").await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.db_system(), "sqlite");

        let first = Credential::new(
            "app_1".into(),
            OAuthTokens::new("a1".into(), Some("r1".into()), Some(3600)),
        );
        store.save_credential(&first).await.unwrap();

        let mut second = first.clone().refreshed(OAuthTokens::new("a2".into(), None, None));
        second.created_at = chrono::Utc::now();
        store.save_credential(&second).await.unwrap();

        let stored = store.get_credential("app_1").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "a2");
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
        assert_eq!(stored.expiry, None);
        assert_eq!(
            stored.created_at.timestamp_micros(),
            first.created_at.timestamp_micros()
        );
        assert_eq!(store.count_credentials().await.unwrap(), 1);
    }
}
