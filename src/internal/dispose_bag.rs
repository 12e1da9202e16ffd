//! Internal disposal bag for managing cleanup hooks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::traits::Dispose;

/// Disposable instances owned by a provider or scope, in creation order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<Arc<dyn Dispose>>,
}

impl DisposeBag {
    pub(crate) fn extend(&mut self, entries: Vec<Arc<dyn Dispose>>) {
        self.entries.extend(entries);
    }

    /// Empties the bag; the caller releases the entries outside its lock.
    pub(crate) fn take(&mut self) -> Vec<Arc<dyn Dispose>> {
        std::mem::take(&mut self.entries)
    }
}

/// Disposes `entries` newest first. A panicking disposer is logged and
/// skipped so the rest still run. Returns the number of failures.
pub(crate) fn release_all(entries: Vec<Arc<dyn Dispose>>, owner: &'static str) -> usize {
    let total = entries.len();
    let mut failures = 0;
    for entry in entries.into_iter().rev() {
        if catch_unwind(AssertUnwindSafe(|| entry.dispose())).is_err() {
            failures += 1;
            warn!(owner, "disposer panicked; continuing with remaining instances");
        }
    }
    debug!(owner, total, failures, "released disposable instances");
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Dispose for Recorder {
        fn dispose(&self) {
            self.log.lock().push(self.name);
        }
    }

    struct Exploding;

    impl Dispose for Exploding {
        fn dispose(&self) {
            panic!("boom");
        }
    }

    #[test]
    fn releases_newest_first_and_survives_panics() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        bag.extend(vec![
            Arc::new(Recorder { name: "first", log: log.clone() }) as Arc<dyn Dispose>,
            Arc::new(Exploding),
            Arc::new(Recorder { name: "last", log: log.clone() }),
        ]);

        let entries = bag.take();
        assert_eq!(entries.len(), 3);
        let failures = release_all(entries, "test");

        assert_eq!(failures, 1);
        assert_eq!(*log.lock(), vec!["last", "first"]);
        assert!(bag.take().is_empty());
    }
}
