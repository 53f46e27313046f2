//! Persistence-aware mining session.
//!
//! Local state is the source of truth for the lifetime of the session.
//! Every mutation is replicated to the document store on a best-effort
//! basis: failures are logged and surfaced as notices, never rolled back
//! and never retried.
//!
//! A session whose load failed is unsynced. It runs on defaults but writes
//! nothing until the stored document can be read again, at which point the
//! stored balance and rates replace the local ones.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};

use crate::activity::{ACTIVITY_LOG_CAPACITY, ActivityLog};
use crate::catalog;
use crate::errors::{ServiceError, SessionError};
use crate::services::{Clock, Document, DocumentStore, Notice, Notifier, to_document};
use crate::state::{SessionSnapshot, SessionState};
use crate::types::{AccrualPeriod, Activity, MiningStatus, SortDirection, UpgradeKind};

pub const USERS_COLLECTION: &str = "users";

/// Subcollection holding a user's activity entries
pub fn activity_collection(uid: &str) -> String {
    format!("{}/{}/activity", USERS_COLLECTION, uid)
}

/// Converts a `json!` object literal into document fields.
pub(crate) fn fields(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Render-ready view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub uid: String,
    pub balance: Decimal,
    pub hash_rate: Decimal,
    pub accrual_rate: Decimal,
    pub status: MiningStatus,
    pub countdown: String,
    pub remaining_secs: u32,
    pub period: AccrualPeriod,
    pub activity: Vec<Activity>,
}

enum Loaded {
    Found(SessionSnapshot),
    /// Document exists but carries no session fields yet
    Incomplete,
    Absent,
    Failed,
}

pub struct MiningSession<S> {
    uid: String,
    state: SessionState,
    store: S,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    /// False until the stored document has been read successfully
    synced: bool,
}

impl<S: DocumentStore> MiningSession<S> {
    /// Loads the persisted session for `uid`, initialising defaults when
    /// nothing usable is stored. Never fails: an unreachable store yields
    /// an unsynced default session and an error notice.
    pub async fn load(
        uid: &str,
        store: S,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        period: AccrualPeriod,
    ) -> Self {
        let mut session = MiningSession {
            uid: uid.to_string(),
            state: SessionState::new(period),
            store,
            clock,
            notifier,
            synced: false,
        };

        match session.fetch().await {
            Loaded::Found(snapshot) => {
                let activity = session.load_activity().await;
                session.state = SessionState::from_snapshot(snapshot, activity, period);
                session.synced = true;
                tracing::info!("Restored session for {}", uid);
            }
            Loaded::Absent => {
                session.synced = true;
                session.write_snapshot(true).await;
                tracing::info!("Initialised new session for {}", uid);
            }
            Loaded::Incomplete => {
                session.synced = true;
                session.write_snapshot(false).await;
                tracing::info!("Initialised session fields for {}", uid);
            }
            Loaded::Failed => {
                tracing::warn!("Session for {} is running unsynced on defaults", uid);
            }
        }

        session
    }

    async fn fetch(&self) -> Loaded {
        match self.store.get_document(USERS_COLLECTION, &self.uid).await {
            Ok(Some(doc)) => match serde_json::from_value::<SessionSnapshot>(Value::Object(doc)) {
                Ok(snapshot) => Loaded::Found(snapshot),
                Err(err) => {
                    tracing::debug!("Profile {} has no session fields: {}", self.uid, err);
                    Loaded::Incomplete
                }
            },
            Ok(None) => Loaded::Absent,
            Err(err) => {
                tracing::warn!("Failed to load session for {}: {}", self.uid, err);
                self.notifier
                    .notify(Notice::error(format!("Could not load your progress: {}", err)));
                Loaded::Failed
            }
        }
    }

    /// Retries the read of an unsynced session. A stored snapshot replaces
    /// the local balance, rates and activity; the local mining flag is kept
    /// and written back. Returns true once the session is synced.
    async fn sync(&mut self) -> bool {
        if self.synced {
            return true;
        }

        match self.fetch().await {
            Loaded::Failed => return false,
            Loaded::Found(mut snapshot) => {
                snapshot.is_mining = self.state.is_mining();
                let activity = self.load_activity().await;
                self.state = SessionState::from_snapshot(snapshot, activity, self.state.period());
                self.synced = true;
                self.write_snapshot(false).await;
                self.notifier
                    .notify(Notice::info("Your saved progress has been restored"));
            }
            Loaded::Incomplete => {
                self.synced = true;
                self.write_snapshot(false).await;
            }
            Loaded::Absent => {
                self.synced = true;
                self.write_snapshot(true).await;
            }
        }

        tracing::info!("Session for {} is back in sync", self.uid);
        true
    }

    /// Writes every session field. `create` replaces the whole document.
    async fn write_snapshot(&self, create: bool) {
        let result = match to_document(&self.snapshot()) {
            Ok(doc) if create => self.store.set_document(USERS_COLLECTION, &self.uid, doc).await,
            Ok(doc) => self.store.update_document(USERS_COLLECTION, &self.uid, doc).await,
            Err(err) => Err(err),
        };
        self.report(result);
    }

    async fn load_activity(&self) -> ActivityLog {
        let docs = self
            .store
            .query_ordered(
                &activity_collection(&self.uid),
                "timestamp",
                SortDirection::Desc,
                ACTIVITY_LOG_CAPACITY,
            )
            .await;

        match docs {
            Ok(docs) => docs
                .into_iter()
                .filter_map(|(_, doc)| match serde_json::from_value::<Activity>(Value::Object(doc)) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        tracing::warn!("Skipping malformed activity for {}: {}", self.uid, err);
                        None
                    }
                })
                .collect(),
            Err(err) => {
                tracing::warn!("Failed to load activity for {}: {}", self.uid, err);
                self.notifier
                    .notify(Notice::error(format!("Could not load recent activity: {}", err)));
                ActivityLog::new()
            }
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot(self.clock.now_millis())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            uid: self.uid.clone(),
            balance: self.state.balance(),
            hash_rate: self.state.hash_rate(),
            accrual_rate: self.state.accrual_rate(),
            status: self.state.status(),
            countdown: self.state.countdown().to_string(),
            remaining_secs: self.state.countdown().remaining_secs(),
            period: self.state.period(),
            activity: self.state.activity().to_vec(),
        }
    }

    /// Flips the mining flag and persists it.
    pub async fn toggle_mining(&mut self) -> MiningStatus {
        self.sync().await;
        let status = self.state.toggle_mining();
        tracing::info!("Mining for {} is now {:?}", self.uid, status);

        let update = fields(json!({
            "isMining": status.is_mining(),
            "lastUpdated": self.clock.now_millis(),
        }));
        self.persist(update).await;
        status
    }

    /// One-second timer callback. Accrues when the countdown crosses a
    /// period boundary while mining.
    ///
    /// A reward earned while unsynced is dropped once the stored snapshot
    /// is read.
    pub async fn tick(&mut self) -> Option<Activity> {
        let entry = self.state.tick(self.clock.now_millis())?;
        if !self.synced && self.sync().await {
            return None;
        }
        self.after_accrual(&entry).await;
        Some(entry)
    }

    async fn after_accrual(&mut self, entry: &Activity) {
        tracing::debug!("Credited {} to {}", entry.amount, self.uid);

        let update = fields(json!({
            "balance": self.state.balance(),
            "lastUpdated": entry.timestamp,
        }));
        self.persist(update).await;
        self.persist_activity(entry).await;

        self.notifier.notify(Notice::info(format!(
            "Mining reward +{} points",
            entry.amount.round_dp(4)
        )));
    }

    /// Buys a catalog upgrade. `cost` must equal the catalog price.
    pub async fn purchase_upgrade(
        &mut self,
        kind: UpgradeKind,
        cost: Decimal,
    ) -> Result<Activity, SessionError> {
        self.sync().await;
        let entry = match self
            .state
            .purchase_upgrade(kind, cost, self.clock.now_millis())
        {
            Ok(entry) => entry,
            Err(err) => {
                tracing::info!("Upgrade {:?} rejected for {}: {}", kind, self.uid, err);
                self.notifier.notify(Notice::error(err.to_string()));
                return Err(err);
            }
        };

        let update = fields(json!({
            "balance": self.state.balance(),
            "accrualRate": self.state.accrual_rate(),
            "hashRate": self.state.hash_rate(),
            "lastUpdated": entry.timestamp,
        }));
        self.persist(update).await;
        self.persist_activity(&entry).await;

        let upgrade = catalog::lookup(kind);
        tracing::info!("{} bought {} for {}", self.uid, upgrade.name, upgrade.cost);
        self.notifier
            .notify(Notice::success(format!("{} purchased!", upgrade.name)));
        Ok(entry)
    }

    /// Prepends `entry` to the activity log without persisting it.
    pub fn record_activity(&mut self, entry: Activity) {
        self.state.record_activity(entry);
    }

    async fn persist(&self, update: Document) {
        if !self.synced {
            tracing::debug!("Skipping write for unsynced session {}", self.uid);
            return;
        }
        let result = self
            .store
            .update_document(USERS_COLLECTION, &self.uid, update)
            .await;
        self.report(result);
    }

    async fn persist_activity(&self, entry: &Activity) {
        if !self.synced {
            return;
        }
        let result = match to_document(entry) {
            Ok(doc) => self
                .store
                .add_document(&activity_collection(&self.uid), doc)
                .await
                .map(|_| ()),
            Err(err) => Err(err),
        };
        self.report(result);
    }

    fn report(&self, result: Result<(), ServiceError>) {
        if let Err(err) = result {
            tracing::warn!("Failed to persist session for {}: {}", self.uid, err);
            self.notifier
                .notify(Notice::error(format!("Could not save your progress: {}", err)));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::NoticeLevel;
    use crate::types::ActivityKind;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Document store fake with switchable failure
    #[derive(Clone, Default)]
    pub(crate) struct FakeStore {
        pub docs: Arc<Mutex<HashMap<String, HashMap<String, Document>>>>,
        pub failing: Arc<AtomicBool>,
        next_id: Arc<AtomicU64>,
    }

    impl FakeStore {
        fn check(&self) -> Result<(), ServiceError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ServiceError::Unavailable("offline".to_string()));
            }
            Ok(())
        }

        pub fn doc(&self, collection: &str, id: &str) -> Option<Document> {
            let docs = self.docs.lock().unwrap();
            docs.get(collection).and_then(|c| c.get(id)).cloned()
        }

        pub fn count(&self, collection: &str) -> usize {
            let docs = self.docs.lock().unwrap();
            docs.get(collection).map(|c| c.len()).unwrap_or(0)
        }
    }

    impl DocumentStore for FakeStore {
        async fn get_document(
            &self,
            collection: &str,
            id: &str,
        ) -> Result<Option<Document>, ServiceError> {
            self.check()?;
            Ok(self.doc(collection, id))
        }

        async fn set_document(
            &self,
            collection: &str,
            id: &str,
            fields: Document,
        ) -> Result<(), ServiceError> {
            self.check()?;
            let mut docs = self.docs.lock().unwrap();
            docs.entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), fields);
            Ok(())
        }

        async fn update_document(
            &self,
            collection: &str,
            id: &str,
            fields: Document,
        ) -> Result<(), ServiceError> {
            self.check()?;
            let mut docs = self.docs.lock().unwrap();
            match docs.get_mut(collection).and_then(|c| c.get_mut(id)) {
                Some(doc) => {
                    doc.extend(fields);
                    Ok(())
                }
                None => Err(ServiceError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                }),
            }
        }

        async fn add_document(
            &self,
            collection: &str,
            fields: Document,
        ) -> Result<String, ServiceError> {
            self.check()?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            let mut docs = self.docs.lock().unwrap();
            docs.entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields);
            Ok(id)
        }

        async fn query_ordered(
            &self,
            collection: &str,
            field: &str,
            direction: SortDirection,
            limit: usize,
        ) -> Result<Vec<(String, Document)>, ServiceError> {
            self.check()?;
            let docs = self.docs.lock().unwrap();
            let mut found: Vec<(String, Document)> = docs
                .get(collection)
                .map(|c| c.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
                .unwrap_or_default();
            let key = |(_, doc): &(String, Document)| {
                doc.get(field).and_then(Value::as_u64).unwrap_or(0)
            };
            found.sort_by_key(key);
            if direction == SortDirection::Desc {
                found.reverse();
            }
            found.truncate(limit);
            Ok(found)
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub notices: Mutex<Vec<Notice>>,
    }

    impl RecordingNotifier {
        pub fn levels(&self) -> Vec<NoticeLevel> {
            self.notices.lock().unwrap().iter().map(|n| n.level).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    pub(crate) struct FixedClock(pub u64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.0
        }
    }

    async fn setup_session(
        store: &FakeStore,
        period: AccrualPeriod,
    ) -> (MiningSession<FakeStore>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let session = MiningSession::load(
            "uid-1",
            store.clone(),
            Arc::new(FixedClock(1_000)),
            notifier.clone(),
            period,
        )
        .await;
        (session, notifier)
    }

    async fn tick_until_reward(session: &mut MiningSession<FakeStore>) -> Option<Activity> {
        for _ in 0..crate::countdown::CYCLE_SECS {
            if let Some(entry) = session.tick().await {
                return Some(entry);
            }
        }
        None
    }

    #[tokio::test]
    async fn test_load_initialises_defaults() {
        let store = FakeStore::default();
        let (session, notifier) = setup_session(&store, AccrualPeriod::Cycle).await;

        assert_eq!(session.state().balance(), dec!(1250.75));
        assert_eq!(session.state().status(), MiningStatus::Idle);
        let doc = store.doc(USERS_COLLECTION, "uid-1").unwrap();
        assert_eq!(doc["balance"], "1250.75");
        assert_eq!(doc["isMining"], false);
        assert!(notifier.levels().is_empty());
    }

    #[tokio::test]
    async fn test_load_restores_snapshot_and_activity() {
        let store = FakeStore::default();
        let snapshot = SessionSnapshot {
            balance: dec!(10),
            hash_rate: dec!(200),
            accrual_rate: dec!(60),
            is_mining: true,
            last_updated: 5,
        };
        store
            .set_document(USERS_COLLECTION, "uid-1", to_document(&snapshot).unwrap())
            .await
            .unwrap();
        for ts in [3u64, 1, 2] {
            let entry = Activity::income("Mining Reward", String::new(), dec!(1), ts);
            store
                .add_document(&activity_collection("uid-1"), to_document(&entry).unwrap())
                .await
                .unwrap();
        }

        let (session, _) = setup_session(&store, AccrualPeriod::Minute).await;

        assert_eq!(session.state().balance(), dec!(10));
        assert_eq!(session.state().accrual_rate(), dec!(60));
        assert!(session.state().is_mining());
        let order: Vec<u64> = session.state().activity().iter().map(|a| a.timestamp).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_load_merges_into_existing_profile() {
        let store = FakeStore::default();
        store
            .set_document(
                USERS_COLLECTION,
                "uid-1",
                fields(json!({ "email": "miner@example.com", "createdAt": 1 })),
            )
            .await
            .unwrap();

        let (session, _) = setup_session(&store, AccrualPeriod::Cycle).await;

        assert_eq!(session.state().balance(), dec!(1250.75));
        let doc = store.doc(USERS_COLLECTION, "uid-1").unwrap();
        assert_eq!(doc["email"], "miner@example.com");
        assert_eq!(doc["accrualRate"], "42.5");
    }

    #[tokio::test]
    async fn test_load_with_store_down_stays_usable() {
        let store = FakeStore::default();
        store.failing.store(true, Ordering::SeqCst);

        let (mut session, notifier) = setup_session(&store, AccrualPeriod::Cycle).await;

        assert_eq!(session.state().balance(), dec!(1250.75));
        assert_eq!(notifier.levels(), vec![NoticeLevel::Error]);
        assert_eq!(session.toggle_mining().await, MiningStatus::Mining);
    }

    #[tokio::test]
    async fn test_unsynced_session_writes_nothing_while_store_is_down() {
        let store = FakeStore::default();
        store.failing.store(true, Ordering::SeqCst);
        let (mut session, _) = setup_session(&store, AccrualPeriod::Cycle).await;

        session.toggle_mining().await;
        session
            .purchase_upgrade(UpgradeKind::Software, dec!(200))
            .await
            .unwrap();
        store.failing.store(false, Ordering::SeqCst);

        assert!(store.doc(USERS_COLLECTION, "uid-1").is_none());
        assert_eq!(store.count(&activity_collection("uid-1")), 0);
    }

    #[tokio::test]
    async fn test_recovered_store_keeps_stored_progress() {
        let store = FakeStore::default();
        let stored = SessionSnapshot {
            balance: dec!(5000),
            hash_rate: dec!(300),
            accrual_rate: dec!(120),
            is_mining: false,
            last_updated: 5,
        };
        store
            .set_document(USERS_COLLECTION, "uid-1", to_document(&stored).unwrap())
            .await
            .unwrap();
        store.failing.store(true, Ordering::SeqCst);
        let (mut session, notifier) = setup_session(&store, AccrualPeriod::Minute).await;
        assert_eq!(session.state().balance(), dec!(1250.75));
        store.failing.store(false, Ordering::SeqCst);

        assert_eq!(session.toggle_mining().await, MiningStatus::Mining);

        assert_eq!(session.state().balance(), dec!(5000));
        assert_eq!(session.state().accrual_rate(), dec!(120));
        let doc = store.doc(USERS_COLLECTION, "uid-1").unwrap();
        assert_eq!(doc["balance"], "5000");
        assert_eq!(doc["accrualRate"], "120");
        assert_eq!(doc["isMining"], true);
        assert!(notifier.levels().contains(&NoticeLevel::Info));

        tick_until_reward(&mut session).await.unwrap();

        let doc = store.doc(USERS_COLLECTION, "uid-1").unwrap();
        let balance: Decimal = doc["balance"].as_str().unwrap().parse().unwrap();
        assert_eq!(balance, dec!(5002));
        assert_eq!(doc["accrualRate"], "120");
    }

    #[tokio::test]
    async fn test_reward_earned_unsynced_is_dropped_on_recovery() {
        let store = FakeStore::default();
        let stored = SessionSnapshot {
            balance: dec!(5000),
            hash_rate: dec!(300),
            accrual_rate: dec!(120),
            is_mining: true,
            last_updated: 5,
        };
        store
            .set_document(USERS_COLLECTION, "uid-1", to_document(&stored).unwrap())
            .await
            .unwrap();
        store.failing.store(true, Ordering::SeqCst);
        let (mut session, _) = setup_session(&store, AccrualPeriod::Minute).await;
        session.toggle_mining().await;
        store.failing.store(false, Ordering::SeqCst);

        let mut rewards = 0;
        for _ in 0..60 {
            if session.tick().await.is_some() {
                rewards += 1;
            }
        }

        assert_eq!(rewards, 0);
        assert_eq!(session.state().balance(), dec!(5000));
        assert!(session.state().is_mining());
        assert_eq!(store.doc(USERS_COLLECTION, "uid-1").unwrap()["balance"], "5000");
        assert_eq!(store.count(&activity_collection("uid-1")), 0);
    }

    #[tokio::test]
    async fn test_toggle_persists_flag() {
        let store = FakeStore::default();
        let (mut session, _) = setup_session(&store, AccrualPeriod::Cycle).await;

        assert_eq!(session.toggle_mining().await, MiningStatus::Mining);
        assert_eq!(store.doc(USERS_COLLECTION, "uid-1").unwrap()["isMining"], true);

        assert_eq!(session.toggle_mining().await, MiningStatus::Idle);
        assert_eq!(store.doc(USERS_COLLECTION, "uid-1").unwrap()["isMining"], false);
    }

    #[tokio::test]
    async fn test_accrual_tick_persists_and_notifies() {
        let store = FakeStore::default();
        let (mut session, notifier) = setup_session(&store, AccrualPeriod::Minute).await;

        assert!(session.tick().await.is_none());
        session.toggle_mining().await;
        let entry = tick_until_reward(&mut session).await.unwrap();

        let expected = dec!(1250.75) + dec!(42.5) / dec!(60);
        assert_eq!(entry.kind, ActivityKind::Income);
        assert_eq!(session.state().balance(), expected);
        let doc = store.doc(USERS_COLLECTION, "uid-1").unwrap();
        assert_eq!(doc["balance"], expected.to_string());
        assert_eq!(store.count(&activity_collection("uid-1")), 1);
        assert_eq!(notifier.levels(), vec![NoticeLevel::Info]);
    }

    #[tokio::test]
    async fn test_tick_accrues_on_wrap() {
        let store = FakeStore::default();
        let (mut session, _) = setup_session(&store, AccrualPeriod::Cycle).await;
        session.toggle_mining().await;

        let mut rewards = 0;
        for _ in 0..crate::countdown::CYCLE_SECS {
            if session.tick().await.is_some() {
                rewards += 1;
            }
        }

        assert_eq!(rewards, 1);
        assert_eq!(session.state().balance(), dec!(1250.75) + dec!(10.625));
    }

    #[tokio::test]
    async fn test_upgrade_persists_rates() {
        let store = FakeStore::default();
        let (mut session, notifier) = setup_session(&store, AccrualPeriod::Cycle).await;

        let entry = session
            .purchase_upgrade(UpgradeKind::Software, dec!(200))
            .await
            .unwrap();

        assert_eq!(entry.amount, dec!(-200));
        let doc = store.doc(USERS_COLLECTION, "uid-1").unwrap();
        assert_eq!(doc["balance"], "1050.75");
        assert_eq!(doc["accrualRate"], "52.5");
        assert_eq!(store.count(&activity_collection("uid-1")), 1);
        assert_eq!(notifier.levels(), vec![NoticeLevel::Success]);
    }

    #[tokio::test]
    async fn test_rejected_upgrade_writes_nothing() {
        let store = FakeStore::default();
        let (mut session, notifier) = setup_session(&store, AccrualPeriod::Cycle).await;
        for _ in 0..2 {
            session
                .purchase_upgrade(UpgradeKind::Equipment, dec!(500))
                .await
                .unwrap();
        }
        let before = store.doc(USERS_COLLECTION, "uid-1").unwrap();

        let result = session.purchase_upgrade(UpgradeKind::Equipment, dec!(500)).await;

        assert!(matches!(result, Err(SessionError::InsufficientBalance { .. })));
        assert_eq!(session.state().balance(), dec!(250.75));
        assert_eq!(store.doc(USERS_COLLECTION, "uid-1").unwrap(), before);
        assert_eq!(store.count(&activity_collection("uid-1")), 2);
        assert_eq!(notifier.levels().last(), Some(&NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_failed_persistence_keeps_local_state() {
        let store = FakeStore::default();
        let (mut session, notifier) = setup_session(&store, AccrualPeriod::Cycle).await;
        store.failing.store(true, Ordering::SeqCst);

        session
            .purchase_upgrade(UpgradeKind::Cooling, dec!(300))
            .await
            .unwrap();

        assert_eq!(session.state().balance(), dec!(950.75));
        assert_eq!(session.state().accrual_rate(), dec!(47.5));
        assert!(notifier.levels().contains(&NoticeLevel::Error));
        store.failing.store(false, Ordering::SeqCst);
        assert_eq!(
            store.doc(USERS_COLLECTION, "uid-1").unwrap()["balance"],
            "1250.75"
        );
    }
}
