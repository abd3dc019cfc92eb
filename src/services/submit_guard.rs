use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One write in flight per user. A second submit or delete that arrives
/// while the first is still awaiting the store is turned away, the same way
/// a form disables its button until the round trip completes.
#[derive(Clone, Default)]
pub struct SubmitGuard {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

/// Held for the duration of a write; releases the user on drop.
#[must_use]
pub struct SubmitPermit {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    user_id: Uuid,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, user_id: Uuid) -> AppResult<SubmitPermit> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("submit guard poisoned")))?;

        if !in_flight.insert(user_id) {
            tracing::debug!(user_id = %user_id, "Concurrent submission rejected");
            return Err(AppError::Conflict(
                "A submission is already in progress.".into(),
            ));
        }

        Ok(SubmitPermit {
            in_flight: Arc::clone(&self.in_flight),
            user_id,
        })
    }
}

impl Drop for SubmitPermit {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected_until_release() {
        let guard = SubmitGuard::new();
        let user = Uuid::new_v4();

        let permit = guard.acquire(user).unwrap();
        assert!(matches!(guard.acquire(user), Err(AppError::Conflict(_))));

        drop(permit);
        assert!(guard.acquire(user).is_ok());
    }

    #[test]
    fn test_users_do_not_block_each_other() {
        let guard = SubmitGuard::new();
        let _a = guard.acquire(Uuid::new_v4()).unwrap();
        assert!(guard.acquire(Uuid::new_v4()).is_ok());
    }
}
