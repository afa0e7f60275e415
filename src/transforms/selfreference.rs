//! Redundant self-store elimination.
//!
//! Removes stores that write a location with the value just read from that same location.
//! Earlier stages leave these behind when a compiler-generated temporary is renamed back to
//! the variable it was copied from.
//!
//! # Example
//!
//! Before:
//! ```text
//! stobj Int32(ldflda count(ldloc this), ldobj Int32(ldflda count(ldloc this)))
//! stloc value(ldloc value')     // value' : Int32 "value", value : Int32 "value"
//! call Use(ldloc value)
//! ```
//!
//! After:
//! ```text
//! call Use(ldloc value)
//! ```
//!
//! # Matched Shapes
//!
//! - Indirect: `stobj T(ldflda F(a), ldobj T(ldflda F(b)))` where both types are `T`, both
//!   fields are the same declaration and `a` and `b` are structurally identical
//! - Local: `stloc x(ldloc y)` where `x` and `y` have the same declared type and the same name
//!
//! Only blocks of kind [`BlockKind::ControlFlow`] are scanned. After each removal the inliner
//! runs at the vacated index and scanning resumes at the first instruction it may have
//! changed.

use tracing::{debug, trace};

use crate::{
    il::{BlockKind, IlFunction, NodeId, Op},
    transforms::{utils::remove_and_inline, EventKind, IlTransform, TransformContext},
    Result,
};

/// Redundant self-store elimination pass.
pub struct FixSelfReference;

impl Default for FixSelfReference {
    fn default() -> Self {
        Self::new()
    }
}

impl FixSelfReference {
    /// Creates a new self-store elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// `stobj T(ldflda F(a), ldobj T(ldflda F(b)))` with `a` ≡ `b`.
    fn is_indirect_self_store(function: &IlFunction, inst: NodeId) -> bool {
        let Some((target, value, store_type)) = function.match_st_obj(inst) else {
            return false;
        };
        let Some((source, load_type)) = function.match_ld_obj(value) else {
            return false;
        };
        if store_type != load_type {
            return false;
        }

        let (Some((target_base, target_field)), Some((source_base, source_field))) =
            (function.match_ld_flda(target), function.match_ld_flda(source))
        else {
            return false;
        };

        target_field == source_field && function.structural_match(target_base, source_base)
    }

    /// `stloc x(ldloc y)` with `x` and `y` agreeing in declared type and name.
    fn is_local_self_copy(function: &IlFunction, inst: NodeId) -> bool {
        let Some((target, value)) = function.match_st_loc(inst) else {
            return false;
        };
        let Some(source) = function.match_ld_loc(value) else {
            return false;
        };

        match (function.variable(target), function.variable(source)) {
            (Some(x), Some(y)) => x.var_type() == y.var_type() && x.name() == y.name(),
            _ => false,
        }
    }

    fn is_self_store(function: &IlFunction, inst: NodeId, ctx: &TransformContext) -> bool {
        Self::is_indirect_self_store(function, inst)
            || (ctx.settings.remove_local_self_copies && Self::is_local_self_copy(function, inst))
    }

    fn run_on_block(
        &self,
        function: &mut IlFunction,
        block: NodeId,
        ctx: &TransformContext,
    ) -> Result<()> {
        let mut index = 0;
        while let Some(&inst) = function.instructions(block).get(index) {
            if !Self::is_self_store(function, inst, ctx) {
                index += 1;
                continue;
            }

            debug!(
                "{}: removing self-store {} at {}",
                function.name(),
                function.display(inst),
                index
            );
            ctx.events
                .record(EventKind::InstructionRemoved)
                .at(function.token(), index)
                .pass(self.name())
                .message(function.display(inst).to_string());

            let inlined = remove_and_inline(function, block, index, ctx)?;
            index -= inlined;
        }
        Ok(())
    }
}

impl IlTransform for FixSelfReference {
    fn name(&self) -> &'static str {
        "FixSelfReference"
    }

    fn description(&self) -> &'static str {
        "Removes stores of a value into the location it was just loaded from"
    }

    fn run(&self, function: &mut IlFunction, ctx: &TransformContext) -> Result<()> {
        if !ctx.settings.remove_self_references {
            return Ok(());
        }

        let containers: Vec<NodeId> = function
            .descendants(function.body())
            .filter(|n| matches!(function.op(*n), Some(Op::BlockContainer)))
            .collect();

        for container in containers {
            let blocks = function.blocks(container).to_vec();
            for block in blocks {
                if !function.is_connected(block) {
                    continue;
                }
                if function.block_kind(block) != Some(BlockKind::ControlFlow) {
                    trace!("{}: skipping dispatch block {}", function.name(), block);
                    continue;
                }
                self.run_on_block(function, block, ctx)?;
            }
        }
        Ok(())
    }
}
