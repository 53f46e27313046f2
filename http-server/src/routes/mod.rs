pub mod accounts;
pub mod session;
pub mod users;
