use hex;
use miner::errors::AuthError;
use miner::services::AuthService;
use miner::types::User;
use miner::validation::{MIN_PASSWORD_LEN, validate_email};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

const UID_LEN: usize = 28;
const MAX_FAILED_ATTEMPTS: u32 = 5;
const LOCKOUT: Duration = Duration::from_secs(60);

struct Account {
    uid: String,
    salt: String,
    password_hash: String,
}

#[derive(Default)]
struct FailedAttempts {
    count: u32,
    locked_until: Option<Instant>,
}

// In-memory authentication service with salted password hashes
#[derive(Clone)]
pub struct InMemoryAuth {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    failures: Arc<Mutex<HashMap<String, FailedAttempts>>>,
    current: Arc<watch::Sender<Option<User>>>,
}

impl Default for InMemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuth {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            current: Arc::new(current),
        }
    }

    // Hash the password together with the account's salt
    fn hash_password(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn random_string(len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }

    fn check_lockout(&self, email: &str) -> Result<(), AuthError> {
        let mut failures = self.failures.lock().unwrap();
        if let Some(attempts) = failures.get_mut(email) {
            match attempts.locked_until {
                Some(until) if Instant::now() < until => return Err(AuthError::TooManyRequests),
                Some(_) => *attempts = FailedAttempts::default(),
                None => {}
            }
        }
        Ok(())
    }

    fn record_failure(&self, email: &str) {
        let mut failures = self.failures.lock().unwrap();
        let attempts = failures.entry(email.to_string()).or_default();
        attempts.count += 1;
        if attempts.count >= MAX_FAILED_ATTEMPTS {
            tracing::warn!("Locking out {} after {} failed attempts", email, attempts.count);
            attempts.locked_until = Some(Instant::now() + LOCKOUT);
        }
    }
}

impl AuthService for InMemoryAuth {
    async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if validate_email(email).is_err() {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let email = Self::normalize_email(email);
        let user = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailInUse);
            }

            let salt = Self::random_string(16);
            let account = Account {
                uid: Self::random_string(UID_LEN),
                password_hash: Self::hash_password(&salt, password),
                salt,
            };
            let user = User {
                uid: account.uid.clone(),
                email: email.clone(),
            };
            accounts.insert(email, account);
            user
        };

        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Self::normalize_email(email);
        self.check_lockout(&email)?;

        let verified = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(&email) {
                None => return Err(AuthError::NotFound),
                Some(account) => (Self::hash_password(&account.salt, password)
                    == account.password_hash)
                    .then(|| account.uid.clone()),
            }
        };

        let Some(uid) = verified else {
            self.record_failure(&email);
            return Err(AuthError::WrongPassword);
        };

        self.failures.lock().unwrap().remove(&email);
        let user = User { uid, email };
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self, uid: &str) {
        self.current.send_if_modified(|current| {
            if current.as_ref().is_some_and(|user| user.uid == uid) {
                *current = None;
                return true;
            }
            false
        });
    }

    fn on_auth_state_changed(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }
}
