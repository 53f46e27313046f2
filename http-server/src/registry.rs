use hex;
use miner::session::MiningSession;
use miner::types::User;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::InMemoryStorage;
use crate::websocket::{NotificationManager, NotificationType, send_notification_to_user};

// One live session, mutated by a single task at a time
pub type SharedSession = Arc<tokio::sync::Mutex<MiningSession<InMemoryStorage>>>;

#[derive(Default)]
struct RegistryInner {
    tokens: HashMap<String, User>,
    sessions: HashMap<String, SharedSession>,
    tickers: HashMap<String, JoinHandle<()>>,
}

// Tracks bearer tokens, live sessions and their ticker tasks
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Create a bearer token by hashing the uid with random bytes
    pub fn issue_token(&self, user: &User) -> String {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut hasher = Sha256::new();
        hasher.update(user.uid.as_bytes());
        hasher.update(nonce);
        let token = hex::encode(hasher.finalize());

        let mut inner = self.inner.lock().unwrap();
        inner.tokens.insert(token.clone(), user.clone());
        token
    }

    pub fn user_for_token(&self, token: &str) -> Option<User> {
        let inner = self.inner.lock().unwrap();
        inner.tokens.get(token).cloned()
    }

    pub fn session(&self, uid: &str) -> Option<SharedSession> {
        let inner = self.inner.lock().unwrap();
        inner.sessions.get(uid).cloned()
    }

    // Keeps an existing session if another request loaded it first
    pub fn insert_session(&self, uid: &str, session: SharedSession) -> SharedSession {
        let mut inner = self.inner.lock().unwrap();
        inner
            .sessions
            .entry(uid.to_string())
            .or_insert(session)
            .clone()
    }

    pub fn is_armed(&self, uid: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .tickers
            .get(uid)
            .is_some_and(|ticker| !ticker.is_finished())
    }

    // Start the per-second ticker for a session, replacing any previous one
    pub fn arm(
        &self,
        uid: &str,
        session: SharedSession,
        manager: NotificationManager,
        interval: Duration,
    ) {
        let ticker = spawn_ticker(uid.to_string(), session, manager, interval);
        let mut inner = self.inner.lock().unwrap();
        if let Some(previous) = inner.tickers.insert(uid.to_string(), ticker) {
            previous.abort();
        }
        tracing::info!("Armed ticker for {}", uid);
    }

    pub fn disarm(&self, uid: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ticker) = inner.tickers.remove(uid) {
            ticker.abort();
            tracing::info!("Disarmed ticker for {}", uid);
        }
    }

    // Revoke a token. The session is dropped once its last token is gone.
    pub fn end(&self, token: &str) -> Option<User> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner.tokens.remove(token)?;

        if !inner.tokens.values().any(|u| u.uid == user.uid) {
            inner.sessions.remove(&user.uid);
            if let Some(ticker) = inner.tickers.remove(&user.uid) {
                ticker.abort();
            }
            tracing::info!("Closed session for {}", user.uid);
        }
        Some(user)
    }
}

// Drive one session's countdown until mining stops or the task is aborted
fn spawn_ticker(
    uid: String,
    session: SharedSession,
    manager: NotificationManager,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            let mut session = session.lock().await;
            if !session.state().is_mining() {
                break;
            }
            session.tick().await;

            let countdown = session.state().countdown();
            send_notification_to_user(
                &manager,
                &uid,
                NotificationType::Countdown {
                    countdown: countdown.to_string(),
                    remaining_secs: countdown.remaining_secs(),
                    balance: session.state().balance(),
                },
            );
        }

        tracing::debug!("Ticker for {} stopped", uid);
    })
}
