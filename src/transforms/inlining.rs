//! Single-use variable inlining.
//!
//! Passes that delete an instruction call the inliner at the vacated index right away. The
//! inliner looks at the definitions immediately preceding that index and folds each one whose
//! variable is used exactly once, inside the instruction at the index, into that use.
//!
//! # Contract
//!
//! [`InliningEngine::inline_into`] returns how many instructions it consumed from in front of
//! `pos`. Consumed instructions are removed from the block, so the instruction that was at
//! `pos` is afterwards at `pos - count`. Callers rewind their cursor by that amount to neither
//! skip nor revisit anything.
//!
//! # Algorithm of [`SingleUseInliner`]
//!
//! ```text
//! for i in (0..pos).rev():
//!     stloc v(value) = block[i]            otherwise stop
//!     v: 1 store, 1 load, 0 address-of     otherwise stop
//!     v is a stack slot, or AGGRESSIVE     otherwise stop
//!     the load sits inside block[pos], not inside a nested block
//!     everything evaluated before the load is side-effect free
//!     move value into the load's slot, remove block[i]
//! ```
//!
//! Definitions are tried from nearest to farthest so a chain of stack slots feeding one
//! expression folds completely; the walk stops at the first definition that can not be moved.

use bitflags::bitflags;
use tracing::trace;

use crate::{
    il::{IlFunction, NodeId, Op, VariableKind},
    transforms::{EventKind, TransformContext},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Options controlling which definitions the inliner may fold
    pub struct InliningOptions: u32 {
        /// Only compiler-introduced stack slots are inlined
        const NONE = 0x0000;
        /// Named locals with a single use are inlined too
        const AGGRESSIVE = 0x0001;
    }
}

impl Default for InliningOptions {
    fn default() -> Self {
        InliningOptions::NONE
    }
}

/// Substitutes single-use definitions into their use site.
pub trait InliningEngine: Send + Sync {
    /// Inlines definitions preceding `pos` in `block` into the instruction at `pos`.
    ///
    /// Returns the number of instructions consumed; 0 when nothing could be inlined or `pos`
    /// is past the end of the block.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tree violates its structural invariants.
    fn inline_into(
        &self,
        function: &mut IlFunction,
        block: NodeId,
        pos: usize,
        options: InliningOptions,
        ctx: &TransformContext,
    ) -> Result<usize>;
}

/// Default [`InliningEngine`]: folds single-store, single-load variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleUseInliner;

impl SingleUseInliner {
    /// Creates a new inliner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the value to move if `candidate` defines a variable that can be inlined into
    /// `target`.
    fn inlinable_value(
        function: &IlFunction,
        candidate: NodeId,
        target: NodeId,
        options: InliningOptions,
    ) -> Option<(NodeId, NodeId)> {
        let (var, value) = function.match_st_loc(candidate)?;
        let variable = function.variable(var)?;

        if variable.store_count() != 1
            || variable.load_count() != 1
            || variable.address_count() != 0
        {
            return None;
        }
        if variable.kind() != VariableKind::StackSlot
            && !options.contains(InliningOptions::AGGRESSIVE)
        {
            return None;
        }

        let load = variable.loads()[0];
        if Self::reorders_side_effects(function, load, target) {
            return None;
        }
        Some((value, load))
    }

    /// Returns true unless `load` is inside `target` outside any nested block and every
    /// operand evaluated before it is trivially pure.
    fn reorders_side_effects(function: &IlFunction, load: NodeId, target: NodeId) -> bool {
        let mut current = load;
        while current != target {
            let Some(parent) = function.parent(current) else {
                return true;
            };
            if matches!(
                function.op(parent),
                Some(Op::Block(_) | Op::BlockContainer) | None
            ) {
                return true;
            }

            let siblings = function.children(parent);
            let Some(index) = siblings.iter().position(|c| *c == current) else {
                return true;
            };
            if !siblings[..index]
                .iter()
                .all(|s| Self::is_pure_subtree(function, *s))
            {
                return true;
            }
            current = parent;
        }
        false
    }

    fn is_pure_subtree(function: &IlFunction, root: NodeId) -> bool {
        function
            .descendants(root)
            .all(|n| function.op(n).is_some_and(Op::is_trivially_pure))
    }
}

impl InliningEngine for SingleUseInliner {
    fn inline_into(
        &self,
        function: &mut IlFunction,
        block: NodeId,
        pos: usize,
        options: InliningOptions,
        ctx: &TransformContext,
    ) -> Result<usize> {
        let Some(&target) = function.instructions(block).get(pos) else {
            return Ok(0);
        };

        let mut count = 0;
        let mut index = pos;
        while index > 0 {
            let candidate = function.instructions(block)[index - 1];
            let Some((value, load)) = Self::inlinable_value(function, candidate, target, options)
            else {
                trace!(
                    "{}: stop inlining at {} ({})",
                    function.name(),
                    index - 1,
                    function.display(candidate)
                );
                break;
            };

            let value = function.take(value)?;
            function.replace(load, value)?;
            function.remove_at(block, index - 1)?;

            ctx.events
                .record(EventKind::ValueInlined)
                .at(function.token(), index - 1)
                .pass("inliner")
                .message(function.display(value).to_string());

            count += 1;
            index -= 1;
        }

        if count > 0 {
            trace!(
                "{}: inlined {} definition(s) into {}",
                function.name(),
                count,
                function.display(target)
            );
        }
        Ok(count)
    }
}
