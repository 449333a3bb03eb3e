use std::sync::{Arc, Mutex, MutexGuard};

/// The UI-side loading indicator the tracker drives.
pub trait LoadingIndicator: Send + Sync {
    fn show_loading(&self);
    fn hide_loading(&self);
}

/// Default indicator that only records the transitions in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndicator;

impl LoadingIndicator for LogIndicator {
    fn show_loading(&self) {
        log::debug!("Loading indicator shown");
    }

    fn hide_loading(&self) {
        log::debug!("Loading indicator hidden");
    }
}

/// Tracks open requests by identifier and toggles the indicator when the
/// first one opens and the last one closes.
pub struct Loading {
    open_keys: Mutex<Vec<String>>,
    indicator: Arc<dyn LoadingIndicator>,
}

impl Loading {
    pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Self {
        Self {
            open_keys: Mutex::new(vec![]),
            indicator,
        }
    }

    // Indicator calls run under this lock.
    fn keys(&self) -> MutexGuard<'_, Vec<String>> {
        self.open_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open(&self, key: &str) {
        let mut keys = self.keys();
        if keys.is_empty() {
            self.indicator.show_loading();
        }
        keys.push(key.to_string());
    }

    pub fn close(&self, key: &str) {
        let mut keys = self.keys();
        let Some(index) = keys.iter().position(|open| open == key) else {
            log::debug!("Closing loading for {} which is not open", key);
            return;
        };
        keys.remove(index);
        if keys.is_empty() {
            self.indicator.hide_loading();
        }
    }

    pub fn is_loading(&self) -> bool {
        !self.keys().is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.keys().len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct CountingIndicator {
        pub shown: AtomicUsize,
        pub hidden: AtomicUsize,
    }

    impl LoadingIndicator for CountingIndicator {
        fn show_loading(&self) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }

        fn hide_loading(&self) {
            self.hidden.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted() -> (Loading, Arc<CountingIndicator>) {
        let indicator = Arc::new(CountingIndicator::default());
        (Loading::new(indicator.clone()), indicator)
    }

    #[test]
    fn test_show_once_hide_once_out_of_order() {
        let (loading, indicator) = counted();
        loading.open("/a");
        loading.open("/b");
        loading.open("/c");
        assert_eq!(indicator.shown.load(Ordering::SeqCst), 1);

        loading.close("/b");
        loading.close("/a");
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 0);
        assert!(loading.is_loading());

        loading.close("/c");
        assert_eq!(indicator.shown.load(Ordering::SeqCst), 1);
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 1);
        assert!(!loading.is_loading());
    }

    #[test]
    fn test_duplicate_ids_are_tracked_independently() {
        let (loading, indicator) = counted();
        loading.open("/items");
        loading.open("/items");
        assert_eq!(loading.open_count(), 2);

        loading.close("/items");
        assert_eq!(loading.open_count(), 1);
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 0);

        loading.close("/items");
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_unknown_id_is_noop() {
        let (loading, indicator) = counted();
        loading.close("/missing");
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 0);

        loading.open("/a");
        loading.close("/missing");
        assert!(loading.is_loading());
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reopen_after_idle_shows_again() {
        let (loading, indicator) = counted();
        loading.open("/a");
        loading.close("/a");
        loading.open("/a");
        assert_eq!(indicator.shown.load(Ordering::SeqCst), 2);
        assert_eq!(indicator.hidden.load(Ordering::SeqCst), 1);
    }
}
