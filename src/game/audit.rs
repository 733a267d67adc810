//! Audit log
//!
//! Human-readable lines recorded after each successful mutation.

use parking_lot::Mutex;
use tracing::info;

/// Sink for audit lines
pub trait AuditLog: Send + Sync {
    fn record(&self, message: &str);
}

/// Emits audit lines as `tracing` events under the `audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, message: &str) {
        info!(target: "audit", "{}", message);
    }
}

/// Keeps audit lines in memory (development mode and tests)
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, message: &str) {
        info!(target: "audit", "{}", message);
        self.lines.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_audit_log() {
        let log = MemoryAuditLog::new();
        assert!(log.is_empty());

        log.record("pingu joined room 'Town'");
        log.record("pingu earned stamp 'Igloo Party'");

        assert_eq!(log.len(), 2);
        assert_eq!(log.lines()[0], "pingu joined room 'Town'");
    }
}
