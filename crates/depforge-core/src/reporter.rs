//! Reporter trait for dependency injection
//!
//! Lets pipeline steps report progress without being coupled to a specific
//! terminal UI. Library code additionally emits `tracing` events; the reporter
//! carries the user-facing narrative.

/// A user-facing progress sink for pipeline and fetch steps.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "icu-data").
    fn section(&self, title: &str);

    /// A step is about to do work (e.g. "building icupkg").
    fn step(&self, name: &str, detail: &str);

    /// A step was skipped because its artifact already exists.
    fn skipped(&self, name: &str, detail: &str);

    /// A step finished successfully.
    fn done(&self, name: &str, detail: &str);

    /// A step failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);

    /// Captured output from an external tool, forwarded for the operator.
    fn tool_output(&self, tool: &str, text: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn step(&self, name: &str, detail: &str) {
        (**self).step(name, detail);
    }
    fn skipped(&self, name: &str, detail: &str) {
        (**self).skipped(name, detail);
    }
    fn done(&self, name: &str, detail: &str) {
        (**self).done(name, detail);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
    fn tool_output(&self, tool: &str, text: &str) {
        (**self).tool_output(tool, text);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn step(&self, _: &str, _: &str) {}
    fn skipped(&self, _: &str, _: &str) {}
    fn done(&self, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn tool_output(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
