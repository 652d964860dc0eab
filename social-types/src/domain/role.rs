//! Role domain model.

use serde::{Deserialize, Serialize};

/// A named privilege level attached to every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    /// Higher is more privileged.
    pub level: i32,
    pub description: String,
}

impl Role {
    /// Role assigned when registration does not name one.
    pub const DEFAULT_NAME: &'static str = "user";
}

