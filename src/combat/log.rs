//! Narrative combat log
//!
//! Player-facing messages ("Goblin hits Hero for 12"), kept apart from
//! diagnostics which go through `tracing`. The core never reads them back.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Info,
    Damage,
    Critical,
    Miss,
    Death,
    Heal,
    ActionPoints,
}

/// Receives narrative messages
pub trait LogSink: Send {
    fn record(&mut self, category: LogCategory, message: String);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub category: LogCategory,
    pub message: String,
}

/// In-memory log of one encounter
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    pub entries: Vec<LogEntry>,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, category: LogCategory) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }
}

impl LogSink for CombatLog {
    fn record(&mut self, category: LogCategory, message: String) {
        self.entries.push(LogEntry { category, message });
    }
}

/// Clonable handle to a `CombatLog`, for callers that hand the sink away but
/// still want to read it
#[derive(Debug, Clone, Default)]
pub struct SharedLog(Arc<Mutex<CombatLog>>);

impl SharedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CombatLog {
        match self.0.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for SharedLog {
    fn record(&mut self, category: LogCategory, message: String) {
        let mut log = match self.0.lock() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        };
        log.record(category, message);
    }
}

/// Forwards narrative messages to `tracing` under the `combat_log` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn record(&mut self, category: LogCategory, message: String) {
        tracing::info!(target: "combat_log", ?category, "{}", message);
    }
}
