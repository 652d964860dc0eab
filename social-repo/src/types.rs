//! Database row types shared by the SQLite and PostgreSQL adapters.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use social_types::{PasswordHash, Role, User, UserId};

/// User row joined with its role.
#[derive(FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub role_id: i64,
    pub role_name: String,
    pub role_level: i32,
    pub role_description: String,
}

impl DbUser {
    pub fn into_domain(self) -> User {
        User {
            id: UserId::new(self.id),
            username: self.username,
            email: self.email,
            password: PasswordHash::from_stored(self.password),
            created_at: self.created_at,
            is_active: self.is_active,
            role: Role {
                id: self.role_id,
                name: self.role_name,
                level: self.role_level,
                description: self.role_description,
            },
        }
    }
}

/// Role row.
#[derive(FromRow)]
pub struct DbRole {
    pub id: i64,
    pub name: String,
    pub level: i32,
    pub description: String,
}

impl DbRole {
    pub fn into_domain(self) -> Role {
        Role {
            id: self.id,
            name: self.name,
            level: self.level,
            description: self.description,
        }
    }
}
