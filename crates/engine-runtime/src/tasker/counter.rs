use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of file tasks submitted remotely but not yet confirmed complete.
///
/// Owned by a single tasker; never negative.
#[derive(Debug, Default)]
pub struct InFlightCounter(AtomicUsize);

impl InFlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the count after the increment.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the count after the decrement, or `None` if it is already zero.
    pub fn decrement(&self) -> Option<usize> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            })
            .ok()
            .map(|previous| previous - 1)
    }

    pub fn load(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn refuses_to_go_negative() {
        let counter = InFlightCounter::new();
        assert_eq!(counter.decrement(), None);

        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.decrement(), Some(0));
        assert_eq!(counter.decrement(), None);
        assert_eq!(counter.load(), 0);
    }

    #[test]
    fn balanced_updates_from_many_threads() {
        let counter = Arc::new(InFlightCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                        assert!(counter.decrement().is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(), 0);
    }
}
