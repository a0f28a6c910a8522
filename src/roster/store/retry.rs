use super::RecordStore;
use crate::error::Result;
use crate::model::{Record, RecordDraft, RecordId};
use std::thread;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly afterwards.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Retries connectivity failures of the wrapped store. Any other error is
/// returned on the first attempt.
///
/// Writes are retried too. A create whose connection dropped after the row
/// was committed will come back as a duplicate email on the retry, which is
/// reported as such.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: RecordStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

fn with_retry<T>(
    policy: RetryPolicy,
    op: &str,
    mut f: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(op, attempt, error = %e, "store unreachable, retrying");
                thread::sleep(policy.delay(attempt));
                attempt += 1;
            }
            other => return other,
        }
    }
}

impl<S: RecordStore> RecordStore for RetryingStore<S> {
    fn ensure_schema(&mut self) -> Result<()> {
        // setup failures are not connectivity errors, so this never loops
        self.inner.ensure_schema()
    }

    fn fetch_all(&self) -> Result<Vec<Record>> {
        with_retry(self.policy, "fetch_all", || self.inner.fetch_all())
    }

    fn create(&mut self, draft: &RecordDraft) -> Result<RecordId> {
        let inner = &mut self.inner;
        with_retry(self.policy, "create", || inner.create(draft))
    }

    fn create_batch(&mut self, drafts: &[RecordDraft]) -> Result<Vec<RecordId>> {
        let inner = &mut self.inner;
        with_retry(self.policy, "create_batch", || inner.create_batch(drafts))
    }

    fn update(&mut self, id: RecordId, draft: &RecordDraft) -> Result<()> {
        let inner = &mut self.inner;
        with_retry(self.policy, "update", || inner.update(id, draft))
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        let inner = &mut self.inner;
        with_retry(self.policy, "delete", || inner.delete(id))
    }

    fn find_id_by_email(&self, email: &str) -> Result<Option<RecordId>> {
        with_retry(self.policy, "find_id_by_email", || {
            self.inner.find_id_by_email(email)
        })
    }
}
