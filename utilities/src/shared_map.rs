use std::{borrow::Borrow, collections::HashMap, hash::Hash, sync::Arc};
use tokio::sync::Mutex;

/// Clonable handle over a mutex protected map, shared between the tcp
/// handlers and the background loops of a node.
pub struct SharedMap<K, V> {
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        SharedMap {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        SharedMap {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> SharedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V> SharedMap<K, V>
where
    K: Eq + Hash,
{
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().await.insert(key, value)
    }

    /// Inserts only when the key is vacant, returns whether the insert happened.
    pub async fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    pub async fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.remove(key)
    }

    pub async fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().await.contains_key(key)
    }

    /// Runs `f` on the value under `key`, inserting `default` first when the
    /// key is vacant. One lock acquisition, so concurrent upserts never lose
    /// each other's edits.
    pub async fn upsert<F>(&self, key: K, default: V, f: F)
    where
        F: FnOnce(&mut V),
    {
        let mut guard = self.inner.lock().await;
        let value = guard.entry(key).or_insert(default);
        f(value);
    }

    /// Runs `f` on the value under `key` while the lock is held, returns
    /// whether the key was present.
    pub async fn update<Q, F>(&self, key: &Q, f: F) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&mut V),
    {
        let mut guard = self.inner.lock().await;
        match guard.get_mut(key) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    pub async fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.lock().await.keys().cloned().collect()
    }

    pub async fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn insert_and_get_share_state_across_clones() {
        let map: SharedMap<String, u64> = SharedMap::new();
        let clone = map.clone();
        map.insert("a".to_string(), 1).await;
        assert_eq!(clone.get("a").await, Some(1));
        assert_eq!(clone.len().await, 1);
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_the_first_value() {
        let map: SharedMap<String, u64> = SharedMap::new();
        assert!(map.insert_if_absent("a".to_string(), 1).await);
        assert!(!map.insert_if_absent("a".to_string(), 2).await);
        assert_eq!(map.get("a").await, Some(1));
    }

    #[tokio::test]
    async fn update_mutates_in_place() {
        let map: SharedMap<String, Vec<u64>> = SharedMap::new();
        map.insert("a".to_string(), vec![1]).await;
        assert!(map.update("a", |v| v.push(2)).await);
        assert!(!map.update("missing", |v| v.push(3)).await);
        assert_eq!(map.get("a").await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn upsert_inserts_then_mutates() {
        let map: SharedMap<String, Vec<u64>> = SharedMap::new();
        map.upsert("a".to_string(), Vec::new(), |v| v.push(1)).await;
        map.upsert("a".to_string(), Vec::new(), |v| v.push(2)).await;
        assert_eq!(map.get("a").await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn remove_clears_the_entry() {
        let map: SharedMap<String, u64> = SharedMap::new();
        map.insert("a".to_string(), 1).await;
        assert_eq!(map.remove("a").await, Some(1));
        assert!(!map.contains("a").await);
        assert!(map.is_empty().await);
    }
}
