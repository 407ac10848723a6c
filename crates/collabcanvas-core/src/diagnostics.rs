//! Diagnostics: every engine event worth reporting goes through here.
//!
//! Diagnostics are always forwarded to the `log` facade. When enabled, they
//! are also handed to an injected sink so hosts and tests can inspect them.

use log::Level;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Receives diagnostics from the engine.
pub trait DiagnosticSink {
    fn record(&self, diagnostic: Diagnostic);
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RefCell<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics recorded so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    /// Diagnostics recorded at `level`.
    pub fn at_level(&self, level: Level) -> Vec<Diagnostic> {
        self.records
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .cloned()
            .collect()
    }

    /// Check whether a diagnostic at `level` mentions `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|d| d.level == level && d.message.contains(needle))
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        self.records.borrow_mut().push(diagnostic);
    }
}

/// Whether diagnostics are recorded, and where.
#[derive(Clone, Default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub sink: Option<Rc<dyn DiagnosticSink>>,
}

impl DiagnosticsConfig {
    /// Record into `sink`.
    pub fn with_sink(sink: Rc<dyn DiagnosticSink>) -> Self {
        Self {
            enabled: true,
            sink: Some(sink),
        }
    }

    /// Forward to `log` only.
    pub fn disabled() -> Self {
        Self::default()
    }
}

impl fmt::Debug for DiagnosticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsConfig")
            .field("enabled", &self.enabled)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Emits diagnostics to `log` and the configured sink.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    config: DiagnosticsConfig,
}

impl Diagnostics {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self { config }
    }

    pub fn emit(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: "collabcanvas", level, "{message}");
        if !self.config.enabled {
            return;
        }
        if let Some(sink) = &self.config.sink {
            sink.record(Diagnostic { level, message });
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Level::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_when_enabled() {
        let sink = Rc::new(MemorySink::new());
        let diagnostics = Diagnostics::new(DiagnosticsConfig::with_sink(sink.clone()));
        diagnostics.warn("unsupported command: selectShape");
        diagnostics.debug("blocked");

        assert_eq!(sink.records().len(), 2);
        assert!(sink.contains(Level::Warn, "selectShape"));
        assert_eq!(sink.at_level(Level::Debug).len(), 1);
    }

    #[test]
    fn test_disabled_skips_sink() {
        let sink = Rc::new(MemorySink::new());
        let config = DiagnosticsConfig {
            enabled: false,
            sink: Some(sink.clone()),
        };
        Diagnostics::new(config).error("dropped");
        assert!(sink.records().is_empty());
    }
}
