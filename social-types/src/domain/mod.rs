//! Domain models for the social API.

pub mod claims;
pub mod invitation;
pub mod role;
pub mod user;

pub use claims::{Audience, Claims};
pub use invitation::Invitation;
pub use role::Role;
pub use user::{NewUser, PasswordHash, User, UserId};
