use miner::types::User;
use serde::{Deserialize, Serialize};

// User as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub uid: String,
    pub email: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
        }
    }
}
