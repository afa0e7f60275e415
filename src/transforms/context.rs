//! Settings and shared services handed to every pass.
//!
//! The [`TransformContext`] is created once by the orchestrator and shared, by reference,
//! with every pass invocation. It is `Sync`: the event log accepts appends through `&self`
//! and the inliner is a thread-safe trait object, so one context can serve
//! [`run_parallel`](crate::transforms::run_parallel).

use std::fmt;

use crate::transforms::{EventLog, InliningEngine, InliningOptions, SingleUseInliner};

/// Name fragment the compiler puts into the names of its capture containers and receiver
/// aliases.
pub const DEFAULT_CAPTURE_MARKER: &str = "<>c__CompilerGenerated";

/// Configuration for the rewrite passes.
///
/// All passes are enabled by default. Individual rewrites can be switched off to compare
/// output or to isolate a misbehaving rule.
///
/// # Examples
///
/// ```rust
/// use iltransform::transforms::{InliningOptions, TransformSettings};
///
/// let settings = TransformSettings::default()
///     .with_local_self_copies(false)
///     .with_inlining(InliningOptions::AGGRESSIVE);
///
/// assert!(settings.remove_self_references);
/// assert!(!settings.remove_local_self_copies);
/// ```
#[derive(Debug, Clone)]
pub struct TransformSettings {
    /// Substring identifying compiler-generated capture types and alias names
    /// (default: `"<>c__CompilerGenerated"`).
    pub capture_marker: String,

    /// Canonicalize captured receivers (default: true).
    pub fix_captured_receiver: bool,

    /// Remove stores of a value into the location it was just loaded from (default: true).
    pub remove_self_references: bool,

    /// Also remove `stloc x(ldloc y)` for same-named, same-typed locals (default: true).
    ///
    /// Has no effect when `remove_self_references` is off.
    pub remove_local_self_copies: bool,

    /// Replace compiler-generated receiver aliases by the receiver (default: true).
    pub strip_receiver_aliases: bool,

    /// Options handed to the inliner after each removal (default: stack slots only).
    pub inlining: InliningOptions,

    /// Run [`IlFunction::verify`](crate::il::IlFunction::verify) after every pass
    /// (default: on in debug builds).
    pub verify_after_transform: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            capture_marker: DEFAULT_CAPTURE_MARKER.to_string(),
            fix_captured_receiver: true,
            remove_self_references: true,
            remove_local_self_copies: true,
            strip_receiver_aliases: true,
            inlining: InliningOptions::NONE,
            verify_after_transform: cfg!(debug_assertions),
        }
    }
}

impl TransformSettings {
    /// Sets the capture marker.
    #[must_use]
    pub fn with_capture_marker(mut self, marker: impl Into<String>) -> Self {
        self.capture_marker = marker.into();
        self
    }

    /// Enables or disables captured-receiver canonicalization.
    #[must_use]
    pub fn with_captured_receiver(mut self, enabled: bool) -> Self {
        self.fix_captured_receiver = enabled;
        self
    }

    /// Enables or disables redundant self-store removal.
    #[must_use]
    pub fn with_self_references(mut self, enabled: bool) -> Self {
        self.remove_self_references = enabled;
        self
    }

    /// Enables or disables the local-to-local form of self-store removal.
    #[must_use]
    pub fn with_local_self_copies(mut self, enabled: bool) -> Self {
        self.remove_local_self_copies = enabled;
        self
    }

    /// Enables or disables receiver alias stripping.
    #[must_use]
    pub fn with_receiver_aliases(mut self, enabled: bool) -> Self {
        self.strip_receiver_aliases = enabled;
        self
    }

    /// Sets the inliner options.
    #[must_use]
    pub fn with_inlining(mut self, options: InliningOptions) -> Self {
        self.inlining = options;
        self
    }

    /// Enables or disables verification after each pass.
    #[must_use]
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_after_transform = enabled;
        self
    }

    /// Returns true if `name` carries the capture marker.
    ///
    /// This is a plain substring test on a name. No compiler-emitted attribute is consulted.
    #[must_use]
    pub fn is_compiler_generated(&self, name: &str) -> bool {
        !self.capture_marker.is_empty() && name.contains(self.capture_marker.as_str())
    }
}

/// Shared state and services for one run of the passes.
pub struct TransformContext {
    /// Pass configuration.
    pub settings: TransformSettings,
    /// Accumulated events from all passes and the inliner.
    pub events: EventLog,
    /// Inliner invoked after every instruction removal.
    pub inliner: Box<dyn InliningEngine>,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self::new(TransformSettings::default())
    }
}

impl fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("settings", &self.settings)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl TransformContext {
    /// Creates a context using the [`SingleUseInliner`].
    #[must_use]
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            settings,
            events: EventLog::new(),
            inliner: Box::new(SingleUseInliner::new()),
        }
    }

    /// Replaces the inliner.
    #[must_use]
    pub fn with_inliner(mut self, inliner: Box<dyn InliningEngine>) -> Self {
        self.inliner = inliner;
        self
    }
}
