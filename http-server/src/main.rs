use axum::{
    Router,
    routing::{any, get, post},
};
use miner::accounts::AccountService;
use miner::directory::Directory;
use miner::services::{AuthService, Clock, SystemClock};
use miner::session::MiningSession;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod config;
mod middleware;
mod models;
mod registry;
mod routes;
mod websocket;

use config::Config;
use models::{InMemoryAuth, InMemoryStorage};
use registry::{SessionRegistry, SharedSession};
use routes::accounts::{login, logout, register};
use routes::session::{get_session, get_upgrades, purchase_upgrade, toggle_mining};
use routes::users::{add_user, get_profile, get_user, list_users, update_user};
use websocket::{NotificationManager, UserNotifier, create_notification_manager, websocket_handler};

// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub storage: InMemoryStorage,
    pub accounts: Arc<AccountService<InMemoryAuth, InMemoryStorage>>,
    pub directory: Arc<Directory<InMemoryStorage>>,
    pub notification_manager: NotificationManager,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, auth: InMemoryAuth, storage: InMemoryStorage) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            registry: SessionRegistry::new(),
            accounts: Arc::new(AccountService::new(auth, storage.clone(), clock.clone())),
            directory: Arc::new(Directory::new(storage.clone(), clock.clone())),
            storage,
            notification_manager: create_notification_manager(),
            clock,
            config: Arc::new(config),
        }
    }

    // Load the user's live session, resuming the ticker if it was mining
    pub async fn open_session(&self, uid: &str) -> SharedSession {
        if let Some(session) = self.registry.session(uid) {
            return session;
        }

        let notifier = Arc::new(UserNotifier::new(self.notification_manager.clone(), uid));
        let session = MiningSession::load(
            uid,
            self.storage.clone(),
            self.clock.clone(),
            notifier,
            self.config.accrual_period,
        )
        .await;
        let resume = session.state().is_mining();

        let session = self
            .registry
            .insert_session(uid, Arc::new(tokio::sync::Mutex::new(session)));
        if resume && !self.registry.is_armed(uid) {
            self.arm(uid, session.clone());
        }
        session
    }

    pub fn arm(&self, uid: &str, session: SharedSession) {
        self.registry.arm(
            uid,
            session,
            self.notification_manager.clone(),
            self.config.tick_interval,
        );
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(get_session))
        .route("/session/mining", post(toggle_mining))
        .route("/session/upgrades", post(purchase_upgrade))
        .route("/upgrades", get(get_upgrades))
        .route("/users", get(list_users).post(add_user))
        .route("/users/{id}", get(get_user).patch(update_user))
        .route("/profile", get(get_profile))
        .route("/health", get(health_check))
        .route("/notifications", any(websocket_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Loaded config: {:?}", config);

    let auth = InMemoryAuth::new();
    let storage = InMemoryStorage::new();
    tracing::info!("In-memory auth and storage initialized successfully");

    // Log auth state changes
    let mut auth_state = auth.on_auth_state_changed();
    tokio::spawn(async move {
        while auth_state.changed().await.is_ok() {
            match auth_state.borrow_and_update().as_ref() {
                Some(user) => tracing::info!("Auth state: {} signed in", user.uid),
                None => tracing::info!("Auth state: signed out"),
            }
        }
    });

    let addr = config.addr.clone();
    let app = app(AppState::new(config, auth, storage));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// Root endpoint
async fn root() -> &'static str {
    "MinePoint API - POST /register or /login to authenticate, GET /session for mining state, POST /session/mining to toggle mining, POST /session/upgrades to buy upgrades, WebSocket /notifications for real-time updates"
}
