//! Change tracking for the rewrite passes.
//!
//! Every edit a pass performs is recorded as an [`Event`] in the [`EventLog`] carried by the
//! [`TransformContext`](crate::transforms::TransformContext). Events can be inspected by tests
//! and tooling or safely ignored.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded edit or diagnostic
//! - [`EventLog`] - Append-only collection with query and summary helpers
//! - [`EventBuilder`] - Fluent API for creating events
//!
//! # Example
//!
//! ```rust
//! use iltransform::transforms::{EventKind, EventLog};
//! use iltransform::typesystem::Token;
//!
//! let log = EventLog::new();
//! log.record(EventKind::InstructionRemoved)
//!     .at(Token::new(0x0600_0001), 3)
//!     .pass("FixSelfReference")
//!     .message("stloc x(ldloc x)");
//! log.info("run finished");
//!
//! assert_eq!(log.count_kind(EventKind::InstructionRemoved), 1);
//! assert_eq!(log.summary(), "1 instruction removed");
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::typesystem::Token;

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A variable received a new declared type.
    VariableRetyped,
    /// A wrapper around a variable load was collapsed into the load itself.
    WrapperCollapsed,
    /// A reference to a forwarding field was rewritten to the forwarded value.
    FieldReferenceRewritten,
    /// A store was replaced by a simpler store.
    StoreReplaced,
    /// A load was replaced by a different value.
    LoadReplaced,
    /// An instruction was removed from a block.
    InstructionRemoved,
    /// The inlining engine folded definitions into a use site.
    ValueInlined,

    /// A pass started on a function.
    PassStarted,
    /// A pass completed on a function.
    PassCompleted,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::VariableRetyped => "variable retyped",
            Self::WrapperCollapsed => "wrapper collapsed",
            Self::FieldReferenceRewritten => "field reference rewritten",
            Self::StoreReplaced => "store replaced",
            Self::LoadReplaced => "load replaced",
            Self::InstructionRemoved => "instruction removed",
            Self::ValueInlined => "value inlined",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event represents an edit of the tree.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::VariableRetyped
                | Self::WrapperCollapsed
                | Self::FieldReferenceRewritten
                | Self::StoreReplaced
                | Self::LoadReplaced
                | Self::InstructionRemoved
                | Self::ValueInlined
        )
    }

    /// Returns true if this is a diagnostic event.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The function the event occurred in.
    pub method: Option<Token>,
    /// Instruction index within the block, when the edit has one.
    pub location: Option<usize>,
    /// Human-readable description.
    pub message: String,
    /// Name of the pass that produced the event.
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            method: None,
            location: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pass {
            Some(pass) => write!(f, "[{}] {}: {}", self.kind, pass, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    method: Option<Token>,
    location: Option<usize>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            method: None,
            location: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the function and instruction index where the event occurred.
    pub fn at(mut self, method: Token, location: usize) -> Self {
        self.method = Some(method);
        self.location = Some(location);
        self
    }

    /// Sets only the function.
    pub fn method(mut self, method: Token) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            method: self.method.take(),
            location: self.location.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Collection of events produced by the rewrite passes.
///
/// This type is thread-safe: events can be appended concurrently through shared references,
/// which is what [`run_parallel`](crate::transforms::run_parallel) relies on.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let log = Self::new();
        log.merge(self);
        log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Appends copies of all events of another log.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over events of a specific function.
    pub fn filter_method(&self, method: Token) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.method == Some(method))
    }

    /// Returns an iterator over events produced by a specific pass.
    pub fn filter_pass<'a>(&'a self, pass: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter().filter(move |e| e.pass.as_deref() == Some(pass))
    }

    /// Returns an iterator over tree edits only.
    pub fn transformations(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_transformation())
    }

    /// Returns the number of tree edits.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.transformations().count()
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of distinct functions with events.
    #[must_use]
    pub fn methods_affected(&self) -> usize {
        self.iter()
            .filter_map(|e| e.method)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Generates a human-readable summary of all tree edits.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = Box<dyn Iterator<Item = &'a Event> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(!log.has(EventKind::InstructionRemoved));
        assert_eq!(log.summary(), "no events");
    }

    #[test]
    fn test_record_event() {
        let log = EventLog::new();
        let method = Token::new(0x0600_0001);

        log.record(EventKind::InstructionRemoved)
            .at(method, 4)
            .pass("FixSelfReference")
            .message("stloc x(ldloc x)");

        assert_eq!(log.len(), 1);
        let event = log.iter().next().expect("event");
        assert_eq!(event.method, Some(method));
        assert_eq!(event.location, Some(4));
        assert_eq!(event.pass.as_deref(), Some("FixSelfReference"));
        assert_eq!(
            event.to_string(),
            "[instruction removed] FixSelfReference: stloc x(ldloc x)"
        );
    }

    #[test]
    fn test_default_message() {
        let log = EventLog::new();
        log.record(EventKind::VariableRetyped).method(Token::new(0x0600_0001));

        let event = log.iter().next().expect("event");
        assert_eq!(event.message, "variable retyped");
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_diagnostics_are_not_transformations() {
        let log = EventLog::new();
        log.info("starting");
        log.warn("odd");
        log.error("broken");
        log.record(EventKind::LoadReplaced);

        assert_eq!(log.transformation_count(), 1);
        assert_eq!(log.count_kind(EventKind::Warning), 1);
        assert!(EventKind::Error.is_diagnostic());
        assert!(!EventKind::PassStarted.is_transformation());
    }

    #[test]
    fn test_filters_and_summary() {
        let log = EventLog::new();
        let first = Token::new(0x0600_0001);
        let second = Token::new(0x0600_0002);

        log.record(EventKind::LoadReplaced).at(first, 0).pass("A");
        log.record(EventKind::LoadReplaced).at(first, 1).pass("A");
        log.record(EventKind::InstructionRemoved).at(second, 0).pass("B");
        log.record(EventKind::PassCompleted).method(second);

        assert_eq!(log.filter_method(first).count(), 2);
        assert_eq!(log.filter_pass("B").count(), 1);
        assert_eq!(log.filter_kind(EventKind::LoadReplaced).count(), 2);
        assert_eq!(log.methods_affected(), 2);
        assert_eq!(log.summary(), "1 instruction removed, 2 load replaced");

        let copy = log.clone();
        copy.merge(&log);
        assert_eq!(copy.len(), 8);
        assert_eq!((&copy).into_iter().count(), 8);
    }

    #[test]
    fn test_thread_safe_append() {
        let log = Arc::new(EventLog::new());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for j in 0..50u32 {
                        log.record(EventKind::ValueInlined)
                            .at(Token::new(0x0600_0000 + i * 100 + j), j as usize);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(log.len(), 200);
    }
}
