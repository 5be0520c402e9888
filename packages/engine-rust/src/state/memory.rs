//! In-memory state repositories backed by [`DashMap`].
//!
//! Concurrent read/write access without external locking: `DashMap` shards
//! its entries, so operations on different keys rarely contend and
//! operations on the same key are serialized by the shard lock
//! (last write wins).

use std::borrow::Borrow;
use std::hash::Hash;

use appbroker_core::{BindingKey, OperationState, ServiceInstanceState};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::{ServiceInstanceBindingStateRepository, ServiceInstanceStateRepository, StateError};

/// Sharded key -> state table shared by both reference repositories.
pub struct StateTable<K> {
    entries: DashMap<K, ServiceInstanceState>,
}

impl<K: Eq + Hash> StateTable<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Inserts or replaces the state for `key`, returning the stored value.
    pub fn put(&self, key: K, state: ServiceInstanceState) -> ServiceInstanceState {
        self.entries.insert(key, state.clone());
        state
    }

    /// Looks up by any borrowed form of the key, e.g. `&str` for `String`.
    pub fn get<Q>(&self, key: &Q) -> Option<ServiceInstanceState>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<ServiceInstanceState>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|(_, state)| state)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash> Default for StateTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Service instances
// ---------------------------------------------------------------------------

/// Reference [`ServiceInstanceStateRepository`]; state is lost on restart.
#[derive(Default)]
pub struct InMemoryServiceInstanceStateRepository {
    table: StateTable<String>,
}

impl InMemoryServiceInstanceStateRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn unknown(service_instance_id: &str) -> StateError {
        StateError::UnknownInstance {
            service_instance_id: service_instance_id.to_string(),
        }
    }
}

#[async_trait]
impl ServiceInstanceStateRepository for InMemoryServiceInstanceStateRepository {
    async fn save_state(
        &self,
        service_instance_id: &str,
        state: OperationState,
        description: &str,
    ) -> Result<ServiceInstanceState, StateError> {
        trace!(service_instance_id, %state, "saving service instance state");
        Ok(self.table.put(
            service_instance_id.to_string(),
            ServiceInstanceState::new(state, description),
        ))
    }

    async fn get_state(
        &self,
        service_instance_id: &str,
    ) -> Result<ServiceInstanceState, StateError> {
        self.table
            .get(service_instance_id)
            .ok_or_else(|| Self::unknown(service_instance_id))
    }

    async fn remove_state(
        &self,
        service_instance_id: &str,
    ) -> Result<ServiceInstanceState, StateError> {
        self.table
            .remove(service_instance_id)
            .ok_or_else(|| Self::unknown(service_instance_id))
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Reference [`ServiceInstanceBindingStateRepository`]; state is lost on restart.
#[derive(Default)]
pub struct InMemoryServiceInstanceBindingStateRepository {
    table: StateTable<BindingKey>,
}

impl InMemoryServiceInstanceBindingStateRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn unknown(key: &BindingKey) -> StateError {
        StateError::UnknownBinding {
            service_instance_id: key.service_instance_id.clone(),
            binding_id: key.binding_id.clone(),
        }
    }
}

#[async_trait]
impl ServiceInstanceBindingStateRepository for InMemoryServiceInstanceBindingStateRepository {
    async fn save_state(
        &self,
        service_instance_id: &str,
        binding_id: &str,
        state: OperationState,
        description: &str,
    ) -> Result<ServiceInstanceState, StateError> {
        trace!(service_instance_id, binding_id, %state, "saving binding state");
        Ok(self.table.put(
            BindingKey::new(service_instance_id, binding_id),
            ServiceInstanceState::new(state, description),
        ))
    }

    async fn get_state(
        &self,
        service_instance_id: &str,
        binding_id: &str,
    ) -> Result<ServiceInstanceState, StateError> {
        let key = BindingKey::new(service_instance_id, binding_id);
        self.table.get(&key).ok_or_else(|| Self::unknown(&key))
    }

    async fn remove_state(
        &self,
        service_instance_id: &str,
        binding_id: &str,
    ) -> Result<ServiceInstanceState, StateError> {
        let key = BindingKey::new(service_instance_id, binding_id);
        self.table.remove(&key).ok_or_else(|| Self::unknown(&key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn string_table_is_queried_by_str() {
        let table = StateTable::<String>::new();
        table.put(
            "svc-1".to_string(),
            ServiceInstanceState::new(OperationState::InProgress, "creating"),
        );

        let key: &str = "svc-1";
        assert_eq!(table.get(key).unwrap().description, "creating");
        assert!(table.get("svc-2").is_none());
        assert_eq!(
            table.remove(key).unwrap().operation_state,
            OperationState::InProgress
        );
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn save_then_get_round_trip() {
        let repo = InMemoryServiceInstanceStateRepository::new();

        let saved = repo
            .save_state("svc-1", OperationState::InProgress, "bar")
            .await
            .unwrap();
        assert_eq!(saved.operation_state, OperationState::InProgress);

        let state = repo.get_state("svc-1").await.unwrap();
        assert_eq!(state.operation_state, OperationState::InProgress);
        assert_eq!(state.description, "bar");
    }

    #[tokio::test]
    async fn later_save_replaces_earlier_one() {
        let repo = InMemoryServiceInstanceStateRepository::new();
        repo.save_state("svc-1", OperationState::InProgress, "bar")
            .await
            .unwrap();
        repo.save_state("svc-1", OperationState::Succeeded, "bar")
            .await
            .unwrap();

        let state = repo.get_state("svc-1").await.unwrap();
        assert_eq!(state.operation_state, OperationState::Succeeded);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn unknown_instance_fails_get_and_remove() {
        let repo = InMemoryServiceInstanceStateRepository::new();
        let expected = StateError::UnknownInstance {
            service_instance_id: "svc-x".to_string(),
        };

        assert_eq!(repo.get_state("svc-x").await.unwrap_err(), expected);
        assert_eq!(repo.remove_state("svc-x").await.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn remove_returns_prior_state_and_clears_entry() {
        let repo = InMemoryServiceInstanceStateRepository::new();
        repo.save_state("svc-1", OperationState::Failed, "boom")
            .await
            .unwrap();

        let removed = repo.remove_state("svc-1").await.unwrap();
        assert_eq!(removed.operation_state, OperationState::Failed);
        assert_eq!(removed.description, "boom");

        assert!(repo.get_state("svc-1").await.is_err());
        assert!(repo.remove_state("svc-1").await.is_err());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn binding_states_are_keyed_by_instance_and_binding() {
        let repo = InMemoryServiceInstanceBindingStateRepository::new();
        repo.save_state("svc-1", "b-1", OperationState::InProgress, "binding")
            .await
            .unwrap();
        repo.save_state("svc-1", "b-2", OperationState::Succeeded, "done")
            .await
            .unwrap();

        assert_eq!(
            repo.get_state("svc-1", "b-1").await.unwrap().operation_state,
            OperationState::InProgress
        );
        assert_eq!(
            repo.get_state("svc-1", "b-2").await.unwrap().operation_state,
            OperationState::Succeeded
        );
        assert_eq!(
            repo.get_state("svc-2", "b-1").await.unwrap_err(),
            StateError::UnknownBinding {
                service_instance_id: "svc-2".to_string(),
                binding_id: "b-1".to_string(),
            }
        );

        repo.remove_state("svc-1", "b-1").await.unwrap();
        assert!(repo.get_state("svc-1", "b-1").await.is_err());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_save_and_remove_loses_nothing() {
        const KEYS: usize = 100_000;
        const WORKERS: usize = 64;

        let repo = Arc::new(InMemoryServiceInstanceStateRepository::new());
        let mut handles = Vec::with_capacity(WORKERS);
        for worker in 0..WORKERS {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let mut removed = 0_usize;
                for i in (worker..KEYS).step_by(WORKERS) {
                    let id = format!("instance-{i}");
                    let description = format!("op-{i}");
                    repo.save_state(&id, OperationState::InProgress, &description)
                        .await
                        .unwrap();
                    let state = repo.remove_state(&id).await.unwrap();
                    assert_eq!(state.description, description, "cross-key corruption");
                    removed += 1;
                }
                removed
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }

        assert_eq!(total, KEYS);
        assert!(repo.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_on_distinct_keys_are_all_visible() {
        const KEYS: usize = 10_000;

        let repo = Arc::new(InMemoryServiceInstanceBindingStateRepository::new());
        let handles: Vec<_> = (0..KEYS)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.save_state("svc", &format!("b-{i}"), OperationState::Succeeded, "ok")
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.len(), KEYS);
        for i in (0..KEYS).step_by(997) {
            assert!(repo.get_state("svc", &format!("b-{i}")).await.is_ok());
        }
    }
}
