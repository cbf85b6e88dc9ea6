// libs/consultation-cell/src/services/reconcile.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::services::tavus::ConversationProvider;

pub const RETRY_INTERVAL: Duration = Duration::from_secs(30);
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
struct Orphan {
    conversation_id: String,
    attempts: u32,
}

/// Retries remote ends for conversations that ended locally while the
/// provider was unreachable.
pub struct EndReconciler {
    provider: Arc<dyn ConversationProvider>,
    orphans: Arc<Mutex<Vec<Orphan>>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl EndReconciler {
    pub fn new(provider: Arc<dyn ConversationProvider>) -> Self {
        Self {
            provider,
            orphans: Arc::new(Mutex::new(Vec::new())),
            worker: std::sync::Mutex::new(None),
        }
    }

    /// Queues a conversation and makes sure the retry loop is running.
    pub async fn enqueue(&self, conversation_id: &str) {
        {
            let mut orphans = self.orphans.lock().await;
            if orphans.iter().any(|o| o.conversation_id == conversation_id) {
                return;
            }
            warn!("Queued conversation {} for remote end retry", conversation_id);
            orphans.push(Orphan {
                conversation_id: conversation_id.to_string(),
                attempts: 0,
            });
        }
        self.ensure_worker();
    }

    pub async fn pending(&self) -> Vec<String> {
        self.orphans
            .lock()
            .await
            .iter()
            .map(|o| o.conversation_id.clone())
            .collect()
    }

    /// One retry pass over every queued conversation.
    pub async fn run_once(&self) {
        retry_pass(self.provider.as_ref(), &self.orphans).await;
    }

    fn ensure_worker(&self) {
        let Ok(mut worker) = self.worker.lock() else {
            error!("Reconciler worker lock poisoned");
            return;
        };
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let provider = self.provider.clone();
        let orphans = self.orphans.clone();
        *worker = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + RETRY_INTERVAL, RETRY_INTERVAL);
            loop {
                ticks.tick().await;
                retry_pass(provider.as_ref(), &orphans).await;
            }
        }));
    }
}

async fn retry_pass(provider: &dyn ConversationProvider, orphans: &Mutex<Vec<Orphan>>) {
    let queued: Vec<Orphan> = orphans.lock().await.clone();
    if queued.is_empty() {
        return;
    }
    let mut remaining = Vec::new();

    for mut orphan in queued.iter().cloned() {
        match provider.end_conversation(&orphan.conversation_id).await {
            Ok(()) => info!("Reconciled conversation {}", orphan.conversation_id),
            Err(e) => {
                orphan.attempts += 1;
                if orphan.attempts >= MAX_ATTEMPTS {
                    error!(
                        "Giving up on ending conversation {} after {} attempts: {}",
                        orphan.conversation_id, orphan.attempts, e
                    );
                } else {
                    remaining.push(orphan);
                }
            }
        }
    }

    let mut current = orphans.lock().await;
    // Entries queued while this pass ran were not retried yet.
    let added: Vec<Orphan> = current
        .drain(..)
        .filter(|o| !queued.iter().any(|q| q.conversation_id == o.conversation_id))
        .collect();
    *current = remaining;
    current.extend(added);
}

impl Drop for EndReconciler {
    fn drop(&mut self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                handle.abort();
            }
        }
    }
}
