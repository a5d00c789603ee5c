//! Structured sync reports.
//!
//! The engine and queue never format log lines themselves for operator-facing
//! failures; they emit a [`SyncEvent`] with a message template and named
//! placeholders, and the host decides where it goes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Severity of a sync report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventLevel::Notice => "notice",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// A report with a `{name}`-style template and its placeholder values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub level: EventLevel,
    pub template: String,
    pub context: BTreeMap<String, String>,
}

impl SyncEvent {
    pub fn new(level: EventLevel, template: impl Into<String>) -> Self {
        Self {
            level,
            template: template.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn notice(template: impl Into<String>) -> Self {
        Self::new(EventLevel::Notice, template)
    }

    pub fn warning(template: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, template)
    }

    pub fn error(template: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, template)
    }

    /// Attach a placeholder value.
    pub fn with(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.context.insert(name.to_string(), value.to_string());
        self
    }

    /// Render the template in one pass. Unknown placeholders are left as-is
    /// and substituted values are never expanded again.
    pub fn message(&self) -> String {
        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let placeholder = after
                .find('}')
                .and_then(|close| self.context.get(&after[..close]).map(|value| (value, close)));
            match placeholder {
                Some((value, close)) => {
                    rendered.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

/// Sink for sync reports. Implementations must be cheap and non-blocking.
pub trait SyncEventSink: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventSink;

impl SyncEventSink for NoOpEventSink {
    fn report(&self, _event: SyncEvent) {}
}

/// Forwards reports to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl SyncEventSink for LogEventSink {
    fn report(&self, event: SyncEvent) {
        let message = event.message();
        match event.level {
            EventLevel::Notice => log::info!("[Salesforce] {}", message),
            EventLevel::Warning => log::warn!("[Salesforce] {}", message),
            EventLevel::Error => log::error!("[Salesforce] {}", message),
        }
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: EventLevel) -> usize {
        self.events().iter().filter(|e| e.level == level).count()
    }

    pub fn take(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl SyncEventSink for CollectingEventSink {
    fn report(&self, event: SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
