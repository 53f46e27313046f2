mod auth;
mod database;
mod user;

pub use auth::InMemoryAuth;
pub use database::InMemoryStorage;
pub use user::AuthenticatedUser;
