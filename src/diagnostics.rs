//! Diagnostics sink handed to the engine.
//!
//! The engine reports through whatever `Diagnostics` the caller passes in and
//! never reaches for a global logger itself. The binary plugs in
//! `TracingDiagnostics`; tests use `CollectingDiagnostics`.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Diagnostics: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);
}

impl dyn Diagnostics + '_ {
    pub fn debug(&self, message: impl AsRef<str>) {
        self.emit(Severity::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.emit(Severity::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(Severity::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(Severity::Error, message.as_ref());
    }
}

/// Forwards every event to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warn => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    events: Mutex<Vec<(Severity, String)>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages at `severity` or above.
    pub fn messages_at_least(&self, severity: Severity) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(s, _)| *s >= severity)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order_and_filters_by_severity() {
        let sink = CollectingDiagnostics::new();
        let diagnostics: &dyn Diagnostics = &sink;
        diagnostics.debug("walking");
        diagnostics.warn("cannot stat a.txt");
        diagnostics.error("git log died");

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.messages_at_least(Severity::Warn),
            vec!["cannot stat a.txt".to_string(), "git log died".to_string()]
        );
    }
}
