//! Recently active window titles.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Bounded list of active window titles, oldest first.
#[derive(Debug, Clone)]
pub struct WindowHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl WindowHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Record a newly active window. Blank names are ignored.
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.trim().is_empty() || self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(name);
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// Sample the active window every `interval` and record each change.
///
/// Runs until the task is dropped.
pub async fn observe<F>(history: Arc<Mutex<WindowHistory>>, interval: Duration, mut source: F)
where
    F: FnMut() -> Option<String>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(name) = source() else {
            continue;
        };

        let mut entries = history.lock();
        if entries.last() != Some(name.as_str()) {
            tracing::debug!("Active window: {}", name);
            entries.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_drops_oldest() {
        let mut history = WindowHistory::new(3);
        for name in ["a", "b", "c", "d"] {
            history.push(name);
        }
        assert_eq!(history.snapshot(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_push_ignores_blank() {
        let mut history = WindowHistory::new(3);
        history.push("");
        history.push("   ");
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut history = WindowHistory::new(0);
        history.push("a");
        assert_eq!(history.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_records_changes_only() {
        let history = Arc::new(Mutex::new(WindowHistory::new(10)));
        let mut samples = vec![
            Some("Finder"),
            Some("Finder"),
            None,
            Some("Safari"),
            Some("Finder"),
        ]
        .into_iter();

        let observer = observe(history.clone(), Duration::from_secs(1), move || {
            samples.next().flatten().map(str::to_string)
        });
        // Five ticks: one immediately, then one per second
        let _ = tokio::time::timeout(Duration::from_millis(4_500), observer).await;

        assert_eq!(history.lock().snapshot(), vec!["Finder", "Safari", "Finder"]);
    }
}
