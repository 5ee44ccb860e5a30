use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Outcome of claiming a request id before executing its side effects.
pub enum Claim<R> {
    /// First time this id is seen, the caller must execute and then
    /// call [`RequestJournal::complete`].
    Fresh,
    /// The id already ran to completion, the recorded response is returned
    /// instead of executing again.
    Replayed(R),
    /// The id is currently executing on another connection.
    InFlight,
}

enum Entry<R> {
    Pending,
    Completed(R),
}

struct JournalInner<R> {
    entries: HashMap<String, Entry<R>>,
    arrival_order: VecDeque<String>,
    capacity: usize,
}

/// Bounded journal of request ids, oldest entries fall out first once
/// the capacity is crossed.
pub struct RequestJournal<R> {
    inner: Arc<Mutex<JournalInner<R>>>,
}

impl<R> Clone for RequestJournal<R> {
    fn clone(&self) -> Self {
        RequestJournal {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Clone> RequestJournal<R> {
    pub fn new(capacity: usize) -> Self {
        RequestJournal {
            inner: Arc::new(Mutex::new(JournalInner {
                entries: HashMap::new(),
                arrival_order: VecDeque::new(),
                capacity: capacity.max(1),
            })),
        }
    }

    /// Claims `request_id` with a single put-if-absent under the lock.
    pub async fn claim(&self, request_id: &str) -> Claim<R> {
        let mut inner = self.inner.lock().await;
        match inner.entries.get(request_id) {
            Some(Entry::Pending) => return Claim::InFlight,
            Some(Entry::Completed(response)) => {
                debug!(request_id = %request_id, "Replaying recorded response");
                return Claim::Replayed(response.clone());
            }
            None => {}
        }
        inner
            .entries
            .insert(request_id.to_string(), Entry::Pending);
        inner.arrival_order.push_back(request_id.to_string());
        while inner.arrival_order.len() > inner.capacity {
            if let Some(evicted) = inner.arrival_order.pop_front() {
                inner.entries.remove(&evicted);
                debug!(request_id = %evicted, "Evicted oldest journal entry");
            }
        }
        Claim::Fresh
    }

    /// Records the response produced for a previously claimed id.
    pub async fn complete(&self, request_id: &str, response: R) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.entries.get_mut(request_id) {
            *entry = Entry::Completed(response);
        }
    }
}
