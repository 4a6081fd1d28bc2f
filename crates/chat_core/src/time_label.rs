use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};

/// Offset every label is rendered in (UTC+8).
const LABEL_OFFSET_SECS: i32 = 8 * 3600;

/// Source of "now" for first-time label computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Memoized display time per message key.
///
/// The first lookup of a key freezes the label; later lookups return it
/// unchanged no matter how far the clock has moved. Entries live for the
/// lifetime of the cache.
#[derive(Clone)]
pub struct TimeLabelCache {
    clock: Arc<dyn Clock>,
    labels: HashMap<String, String>,
}

impl TimeLabelCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            labels: HashMap::new(),
        }
    }

    pub fn label_for(&mut self, key: &str) -> &str {
        if !self.labels.contains_key(key) {
            let label = format_label(self.clock.now());
            self.labels.insert(key.to_string(), label);
        }
        &self.labels[key]
    }

    /// Read-only lookup; `None` when the key has never been labelled.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for TimeLabelCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for TimeLabelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeLabelCache")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

// The clock is an injected collaborator, not part of the cache's value.
impl PartialEq for TimeLabelCache {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for TimeLabelCache {}

/// `"<month>月<day>日 <hour>:<minute>"` in UTC+8; only the minute is padded.
pub fn format_label(now: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(LABEL_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    let local = now.with_timezone(&offset);
    format!(
        "{}月{}日 {}:{:02}",
        local.month(),
        local.day(),
        local.hour(),
        local.minute()
    )
}
