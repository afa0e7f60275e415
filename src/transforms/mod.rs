//! Rewrite passes over the instruction tree.
//!
//! Each pass folds one compiler-introduced indirection back into direct code. Passes are
//! independent units implementing [`IlTransform`]; the order they run in is decided by the
//! caller, one full pass completing before the next begins.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Rewrite Stage                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  TransformContext             Shared for all invocations         │
//! │    ├─ TransformSettings       (marker, enabled rewrites)         │
//! │    ├─ EventLog                (every edit, thread-safe)          │
//! │    └─ InliningEngine          (called after each removal)        │
//! │                                                                  │
//! │  IlTransform trait            Interface for all passes           │
//! │    └─ run()                   Per-function rewrite               │
//! │                                                                  │
//! │  Passes                                                          │
//! │    ├─ FixCompilerGeneratedThis      captured receiver            │
//! │    ├─ FixSelfReference              redundant self-stores        │
//! │    └─ RemoveCompilerGeneratedThis   receiver aliases             │
//! │                                                                  │
//! │  apply / run_parallel         Logging, events, verification      │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! Every pass is idempotent: running it on its own output performs no edit. Pattern
//! mismatches are never errors, the candidate is simply skipped. An `Err` from a pass means
//! the tree model's invariants were violated.

mod capturedthis;
mod context;
mod events;
mod inlining;
mod receiveralias;
mod selfreference;
mod utils;

use rayon::prelude::*;
use tracing::{debug, warn};

pub use capturedthis::FixCompilerGeneratedThis;
pub use context::{TransformContext, TransformSettings, DEFAULT_CAPTURE_MARKER};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use inlining::{InliningEngine, InliningOptions, SingleUseInliner};
pub use receiveralias::RemoveCompilerGeneratedThis;
pub use selfreference::FixSelfReference;

use crate::{il::IlFunction, Result};

/// A rewrite pass over one function.
///
/// Passes must be thread-safe (Send + Sync) so one instance can serve many functions in
/// parallel. They receive exclusive access to the function and shared access to the context.
pub trait IlTransform: Send + Sync {
    /// Unique name for logging and events.
    fn name(&self) -> &'static str;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Rewrite a single function in place.
    ///
    /// Events should be recorded directly to `ctx.events`.
    ///
    /// # Errors
    ///
    /// Returns an error only if a tree primitive fails, which means the function was
    /// already malformed or the pass broke an invariant.
    fn run(&self, function: &mut IlFunction, ctx: &TransformContext) -> Result<()>;
}

/// Runs one pass on one function with logging, pass events and optional verification.
///
/// # Errors
///
/// Propagates the pass's error, or returns [`crate::Error::Malformed`] if verification is
/// enabled and the tree is broken afterwards.
pub fn apply(
    transform: &dyn IlTransform,
    function: &mut IlFunction,
    ctx: &TransformContext,
) -> Result<()> {
    let token = function.token();
    debug!("{}: running {}", function.name(), transform.name());
    ctx.events
        .record(EventKind::PassStarted)
        .method(token)
        .pass(transform.name());

    transform.run(function, ctx)?;

    if ctx.settings.verify_after_transform {
        if let Err(error) = function.verify() {
            warn!(
                "{}: tree invalid after {}: {}",
                function.name(),
                transform.name(),
                error
            );
            ctx.events
                .record(EventKind::Error)
                .method(token)
                .pass(transform.name())
                .message(error.to_string());
            return Err(error);
        }
    }

    ctx.events
        .record(EventKind::PassCompleted)
        .method(token)
        .pass(transform.name());
    debug!("{}: {} done", function.name(), transform.name());
    Ok(())
}

/// Applies one pass to many functions in parallel.
///
/// Every function is owned by exactly one worker for the duration of the pass. Events of all
/// functions end up in `ctx.events`.
///
/// # Errors
///
/// Returns the error of one failing function; the others may or may not have been rewritten.
pub fn run_parallel(
    transform: &dyn IlTransform,
    functions: &mut [IlFunction],
    ctx: &TransformContext,
) -> Result<()> {
    functions
        .par_iter_mut()
        .try_for_each(|function| apply(transform, function, ctx))
}
