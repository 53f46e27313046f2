use miner::errors::ServiceError;
use miner::services::{Document, DocumentStore};
use miner::types::SortDirection;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const DOCUMENT_ID_LEN: usize = 20;

type Collections = HashMap<String, HashMap<String, Document>>;

// Simple in-memory document store, collections keyed by path
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    collections: Arc<Mutex<Collections>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, ServiceError> {
        self.collections
            .lock()
            .map_err(|_| ServiceError::Unavailable("storage lock poisoned".to_string()))
    }

    // Random alphanumeric id for added documents
    fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(DOCUMENT_ID_LEN)
            .map(char::from)
            .collect()
    }

    #[cfg(test)]
    pub fn count(&self, collection: &str) -> usize {
        self.lock()
            .map(|c| c.get(collection).map(HashMap::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

// Missing fields sort first, then numbers, then strings
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl DocumentStore for InMemoryStorage {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, ServiceError> {
        let collections = self.lock()?;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), ServiceError> {
        let mut collections = self.lock()?;
        collections
            .entry(collection.to_string())
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
        let mut collections = self.lock()?;

        match collections.get_mut(collection).and_then(|c| c.get_mut(id)) {
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
        let id = Self::generate_id();
        let mut collections = self.lock()?;
        collections
            .entry(collection.to_string())
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
        let collections = self.lock()?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<(String, Document)> = docs
            .iter()
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect();
        found.sort_by(|(_, a), (_, b)| {
            let ordering = compare_values(a.get(field), b.get(field));
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        found.truncate(limit);
        Ok(found)
    }
}
