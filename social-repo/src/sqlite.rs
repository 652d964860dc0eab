//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;

use social_types::{
    DomainError, Invitation, NewUser, PoolStats, StoreError, User, UserId, UserRepository,
};

use crate::security::hash_token;
use crate::tx::{store_err, timed, with_tx};
use crate::types::{DbRole, DbUser};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.password, u.created_at, u.is_active,
           r.id AS role_id, r.name AS role_name, r.level AS role_level,
           r.description AS role_description
    FROM users u
    JOIN roles r ON u.role_id = r.id
"#;

const MIGRATIONS: [(&str, &str); 3] = [
    ("0001", include_str!("../migrations/0001_create_users.sql")),
    ("0002", include_str!("../migrations/0002_create_invitations.sql")),
    ("0003", include_str!("../migrations/0003_create_followers.sql")),
];

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        for (name, sql) in MIGRATIONS {
            for statement in sql.split(';') {
                let stmt = statement.trim();
                if !stmt.is_empty() {
                    sqlx::query(stmt).execute(&self.pool).await.map_err(|e| {
                        StoreError::Database(format!("Migration {} failed: {}", name, e))
                    })?;
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction steps
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite reports no constraint name, so after a unique violation the
/// colliding column is probed on the same connection. The failed statement
/// is already undone and the transaction stays usable.
async fn classify_user_insert(
    conn: &mut SqliteConnection,
    user: &NewUser,
    err: sqlx::Error,
) -> StoreError {
    let is_unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    if !is_unique {
        return store_err(err);
    }

    if column_taken(conn, "email", &user.email).await {
        return StoreError::DuplicateEmail;
    }
    if column_taken(conn, "username", &user.username).await {
        return StoreError::DuplicateUsername;
    }

    store_err(err)
}

async fn column_taken(conn: &mut SqliteConnection, column: &str, value: &str) -> bool {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {column} = ?)");
    matches!(
        timed(
            sqlx::query_scalar::<_, bool>(&sql)
                .bind(value)
                .fetch_one(&mut *conn)
        )
        .await,
        Ok(Ok(true))
    )
}

async fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> Result<User, StoreError> {
    let role: DbRole = timed(
        sqlx::query_as("SELECT id, name, level, description FROM roles WHERE name = ?")
            .bind(user.role_name())
            .fetch_optional(&mut *conn),
    )
    .await?
    .map_err(store_err)?
    .ok_or_else(|| {
        StoreError::Domain(DomainError::ValidationError(format!(
            "unknown role: {}",
            user.role_name()
        )))
    })?;

    let now = Utc::now();
    let inserted: Result<(i64,), sqlx::Error> = timed(
        sqlx::query_as(
            r#"INSERT INTO users (username, password, email, role_id, created_at, is_active)
               VALUES (?, ?, ?, ?, ?, FALSE)
               RETURNING id"#,
        )
        .bind(&user.username)
        .bind(user.password.as_str())
        .bind(&user.email)
        .bind(role.id)
        .bind(now)
        .fetch_one(&mut *conn),
    )
    .await?;

    let (id,) = match inserted {
        Ok(row) => row,
        Err(e) => return Err(classify_user_insert(conn, user, e).await),
    };

    Ok(User {
        id: UserId::new(id),
        username: user.username.clone(),
        email: user.email.clone(),
        password: user.password.clone(),
        created_at: now,
        is_active: false,
        role: role.into_domain(),
    })
}

async fn insert_invitation(
    conn: &mut SqliteConnection,
    invitation: &Invitation,
) -> Result<(), StoreError> {
    timed(
        sqlx::query("INSERT INTO user_invitations (token, user_id, expiry) VALUES (?, ?, ?)")
            .bind(&invitation.token_hash)
            .bind(invitation.user_id.get())
            .bind(invitation.expiry)
            .execute(&mut *conn),
    )
    .await?
    .map_err(|e| match store_err(e) {
        StoreError::Conflict(_) => StoreError::Conflict("invitation token already issued".into()),
        other => other,
    })?;
    Ok(())
}

async fn user_from_invitation(
    conn: &mut SqliteConnection,
    token_hash: &str,
) -> Result<UserId, StoreError> {
    let row: Option<(i64,)> = timed(
        sqlx::query_as(
            r#"SELECT u.id
               FROM users u
               JOIN user_invitations ui ON u.id = ui.user_id
               WHERE ui.token = ? AND ui.expiry > ?"#,
        )
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_optional(&mut *conn),
    )
    .await?
    .map_err(store_err)?;

    row.map(|(id,)| UserId::new(id)).ok_or(StoreError::NotFound)
}

async fn mark_active(conn: &mut SqliteConnection, id: UserId) -> Result<(), StoreError> {
    timed(
        sqlx::query("UPDATE users SET is_active = TRUE WHERE id = ?")
            .bind(id.get())
            .execute(&mut *conn),
    )
    .await?
    .map_err(store_err)?;
    Ok(())
}

async fn delete_invitations(conn: &mut SqliteConnection, id: UserId) -> Result<(), StoreError> {
    timed(
        sqlx::query("DELETE FROM user_invitations WHERE user_id = ?")
            .bind(id.get())
            .execute(&mut *conn),
    )
    .await?
    .map_err(store_err)?;
    Ok(())
}

async fn delete_user_row(conn: &mut SqliteConnection, id: UserId) -> Result<(), StoreError> {
    let result = timed(
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.get())
            .execute(&mut *conn),
    )
    .await?
    .map_err(store_err)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for SqliteRepo {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<DbUser> = timed(
            sqlx::query_as(&format!("{SELECT_USER} WHERE u.id = ?"))
                .bind(id.get())
                .fetch_optional(&self.pool),
        )
        .await?
        .map_err(store_err)?;

        Ok(row.map(DbUser::into_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<DbUser> = timed(
            sqlx::query_as(&format!("{SELECT_USER} WHERE u.email = ?"))
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await?
        .map_err(store_err)?;

        Ok(row.map(DbUser::into_domain))
    }

    #[tracing::instrument(skip(self, user, raw_token), fields(username = %user.username))]
    async fn create_and_invite(
        &self,
        user: NewUser,
        raw_token: &str,
        invitation_ttl: Duration,
    ) -> Result<User, StoreError> {
        let token_hash = hash_token(raw_token);

        with_tx(&self.pool, move |conn| {
            Box::pin(async move {
                let created = insert_user(conn, &user).await?;
                let invitation = Invitation::issue(token_hash, created.id, invitation_ttl);
                insert_invitation(conn, &invitation).await?;
                Ok(created)
            })
        })
        .await
    }

    #[tracing::instrument(skip(self, raw_token))]
    async fn activate(&self, raw_token: &str) -> Result<(), StoreError> {
        let token_hash = hash_token(raw_token);

        with_tx(&self.pool, move |conn| {
            Box::pin(async move {
                let user_id = user_from_invitation(conn, &token_hash).await?;
                mark_active(conn, user_id).await?;
                delete_invitations(conn, user_id).await?;
                tracing::info!(user_id = %user_id, "user activated");
                Ok(())
            })
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        with_tx(&self.pool, move |conn| {
            Box::pin(async move {
                delete_user_row(conn, id).await?;
                delete_invitations(conn, id).await?;
                Ok(())
            })
        })
        .await
    }

    async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), StoreError> {
        timed(
            sqlx::query("INSERT INTO followers (user_id, follower_id, created_at) VALUES (?, ?, ?)")
                .bind(followee.get())
                .bind(follower.get())
                .bind(Utc::now())
                .execute(&self.pool),
        )
        .await?
        .map_err(|e| match store_err(e) {
            StoreError::Conflict(_) => StoreError::Conflict("already following this user".into()),
            other => other,
        })?;
        Ok(())
    }

    async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), StoreError> {
        timed(
            sqlx::query("DELETE FROM followers WHERE user_id = ? AND follower_id = ?")
                .bind(followee.get())
                .bind(follower.get())
                .execute(&self.pool),
        )
        .await?
        .map_err(store_err)?;
        Ok(())
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        })
    }
}
