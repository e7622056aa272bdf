use parking_lot::Mutex;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Returns a random alphanumeric token of the given length.
pub fn random_token(length: usize) -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// A handle to an upstream subscription.
///
/// Unsubscribing stops all further callback delivery, and is safe to call any
/// number of times. Dropping the handle unsubscribes as well.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Stops all further callback delivery.
    pub fn unsubscribe(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel()
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crossbeam::atomic::AtomicCell;

    use super::*;

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let cancels = Arc::new(AtomicCell::new(0i32));
        let counted = cancels.clone();

        let subscription = Subscription::new(move || {
            counted.fetch_add(1);
        });

        subscription.unsubscribe();
        subscription.unsubscribe();
        drop(subscription);

        assert_eq!(cancels.load(), 1, "cancel should run exactly once");
    }

    #[test]
    fn test_drop_unsubscribes() {
        let cancels = Arc::new(AtomicCell::new(0i32));
        let counted = cancels.clone();

        drop(Subscription::new(move || {
            counted.fetch_add(1);
        }));

        assert_eq!(cancels.load(), 1, "dropping should cancel");
    }

    #[test]
    fn test_random_token_length() {
        assert_eq!(random_token(12).len(), 12);
        assert_ne!(random_token(12), random_token(12), "tokens should differ");
    }
}
