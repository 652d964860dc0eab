//! PostgreSQL repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

use social_types::{
    DomainError, Invitation, NewUser, PoolStats, StoreError, User, UserId, UserRepository,
};

use crate::security::hash_token;
use crate::tx::{store_err, timed, with_tx};
use crate::types::{DbRole, DbUser};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.password, u.created_at, u.is_active,
           r.id AS role_id, r.name AS role_name, r.level AS role_level,
           r.description AS role_description
    FROM users u
    JOIN roles r ON u.role_id = r.id
"#;

/// PostgreSQL repository.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_users_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_invitations_pg.sql"),
        "0002",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0003_create_followers_pg.sql"),
        "0003",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction steps
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a failed user insert to a duplicate-field error by constraint name.
fn classify_user_insert(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_email_key") => return StoreError::DuplicateEmail,
                Some("users_username_key") => return StoreError::DuplicateUsername,
                _ => {}
            }
        }
    }
    store_err(err)
}

async fn insert_user(conn: &mut PgConnection, user: &NewUser) -> Result<User, StoreError> {
    let role: DbRole = timed(
        sqlx::query_as("SELECT id, name, level, description FROM roles WHERE name = $1")
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
    let (id,): (i64,) = timed(
        sqlx::query_as(
            r#"INSERT INTO users (username, password, email, role_id, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(&user.username)
        .bind(user.password.as_str())
        .bind(&user.email)
        .bind(role.id)
        .bind(now)
        .fetch_one(&mut *conn),
    )
    .await?
    .map_err(classify_user_insert)?;

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
    conn: &mut PgConnection,
    invitation: &Invitation,
) -> Result<(), StoreError> {
    timed(
        sqlx::query("INSERT INTO user_invitations (token, user_id, expiry) VALUES ($1, $2, $3)")
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
    conn: &mut PgConnection,
    token_hash: &str,
) -> Result<UserId, StoreError> {
    let row: Option<(i64,)> = timed(
        sqlx::query_as(
            r#"SELECT u.id
               FROM users u
               JOIN user_invitations ui ON u.id = ui.user_id
               WHERE ui.token = $1 AND ui.expiry > $2"#,
        )
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_optional(&mut *conn),
    )
    .await?
    .map_err(store_err)?;

    row.map(|(id,)| UserId::new(id)).ok_or(StoreError::NotFound)
}

async fn mark_active(conn: &mut PgConnection, id: UserId) -> Result<(), StoreError> {
    timed(
        sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1")
            .bind(id.get())
            .execute(&mut *conn),
    )
    .await?
    .map_err(store_err)?;
    Ok(())
}

async fn delete_invitations(conn: &mut PgConnection, id: UserId) -> Result<(), StoreError> {
    timed(
        sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
            .bind(id.get())
            .execute(&mut *conn),
    )
    .await?
    .map_err(store_err)?;
    Ok(())
}

async fn delete_user_row(conn: &mut PgConnection, id: UserId) -> Result<(), StoreError> {
    let result = timed(
        sqlx::query("DELETE FROM users WHERE id = $1")
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
impl UserRepository for PostgresRepo {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<DbUser> = timed(
            sqlx::query_as(&format!("{SELECT_USER} WHERE u.id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool),
        )
        .await?
        .map_err(store_err)?;

        Ok(row.map(DbUser::into_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<DbUser> = timed(
            sqlx::query_as(&format!("{SELECT_USER} WHERE u.email = $1"))
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
            sqlx::query(
                "INSERT INTO followers (user_id, follower_id, created_at) VALUES ($1, $2, $3)",
            )
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
            sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follower_id = $2")
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
