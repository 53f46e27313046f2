pub mod accounts;
pub mod activity;
pub mod catalog;
pub mod countdown;
pub mod directory;
pub mod errors;
pub mod services;
pub mod session;
pub mod state;
pub mod types;
pub mod validation;
