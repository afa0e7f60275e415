//! Receiver alias stripping.
//!
//! The compiler sometimes copies the receiver into a local whose name carries its
//! compiler-generated marker and then reads the receiver through that local. This pass
//! substitutes the receiver back in.
//!
//! # Example
//!
//! Before:
//! ```text
//! stloc <>c__CompilerGenerated_this(ldloc this)
//! call Draw(ldloc <>c__CompilerGenerated_this)
//! ret(ldloc <>c__CompilerGenerated_this)
//! ```
//!
//! After:
//! ```text
//! call Draw(ldloc this)
//! ret(ldloc this)
//! ```
//!
//! # Conditions
//!
//! - the stored variable's *name* contains the capture marker
//! - the stored value is a load of the receiver
//! - the variable has exactly this one store and its address is never taken
//!
//! Only blocks of kind [`BlockKind::ControlFlow`] are scanned.
//!
//! Unlike [`FixCompilerGeneratedThis`](crate::transforms::FixCompilerGeneratedThis) no variable
//! is retyped and no wrapped or forwarded uses are followed.

use tracing::{debug, trace};

use crate::{
    il::{BlockKind, IlFunction, NodeId, Op, VarId},
    transforms::{utils::remove_and_inline, EventKind, IlTransform, TransformContext},
    Result,
};

/// Receiver alias stripping pass.
pub struct RemoveCompilerGeneratedThis;

impl Default for RemoveCompilerGeneratedThis {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoveCompilerGeneratedThis {
    /// Creates a new receiver alias stripping pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the alias variable and the receiver load if `inst` defines a receiver alias.
    fn match_alias(
        function: &IlFunction,
        inst: NodeId,
        ctx: &TransformContext,
    ) -> Option<(VarId, NodeId)> {
        let (var, value) = function.match_st_loc(inst)?;
        let variable = function.variable(var)?;

        if variable.is_this()
            || !ctx.settings.is_compiler_generated(variable.name())
            || !function.match_ld_this(value)
            || variable.store_count() != 1
            || variable.address_count() != 0
        {
            return None;
        }
        Some((var, value))
    }

    fn run_on_block(
        &self,
        function: &mut IlFunction,
        block: NodeId,
        ctx: &TransformContext,
    ) -> Result<()> {
        let mut index = 0;
        while let Some(&inst) = function.instructions(block).get(index) {
            let Some((alias, receiver)) = Self::match_alias(function, inst, ctx) else {
                index += 1;
                continue;
            };

            let loads = function
                .variable(alias)
                .map(|v| v.loads().to_vec())
                .unwrap_or_default();
            debug!(
                "{}: replacing {} load(s) of receiver alias {}",
                function.name(),
                loads.len(),
                function.display(inst)
            );

            for load in loads {
                let copy = function.clone_node(receiver)?;
                function.replace(load, copy)?;
                ctx.events
                    .record(EventKind::LoadReplaced)
                    .at(function.token(), index)
                    .pass(self.name())
                    .message(function.display(copy).to_string());
            }

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

impl IlTransform for RemoveCompilerGeneratedThis {
    fn name(&self) -> &'static str {
        "RemoveCompilerGeneratedThis"
    }

    fn description(&self) -> &'static str {
        "Replaces compiler-generated aliases of the receiver with the receiver itself"
    }

    fn run(&self, function: &mut IlFunction, ctx: &TransformContext) -> Result<()> {
        if !ctx.settings.strip_receiver_aliases || function.this_variable().is_none() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        il::VariableKind,
        test::{widget_type, FunctionBuilder, ALIAS_NAME},
        transforms::TransformSettings,
    };

    #[test]
    fn test_strips_alias_with_two_uses() -> Result<()> {
        let mut b = FunctionBuilder::new("Alias");
        let this = b.this();
        let alias = b.local(ALIAS_NAME, widget_type());
        b.store_load(alias, this)?;
        let call = b.push_getter_call(alias)?;
        let ret = b.push_return_load(alias)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert_eq!(b.function.instructions(b.entry), &[call, ret]);
        assert!(b.function.variable(alias).is_some_and(|v| v.is_unused()));
        assert!(b.function.match_ld_this(b.function.children(call)[0]));
        assert!(b.function.match_ld_this(b.function.children(ret)[0]));
        assert_eq!(b.function.variable(this).map(|v| v.load_count()), Some(2));
        assert_eq!(ctx.events.count_kind(EventKind::LoadReplaced), 2);
        assert_eq!(ctx.events.count_kind(EventKind::InstructionRemoved), 1);
        b.function.verify()
    }

    #[test]
    fn test_requires_marker_in_name() -> Result<()> {
        let mut b = FunctionBuilder::new("Plain");
        let this = b.this();
        let copy = b.local("self", widget_type());
        let store = b.store_load(copy, this)?;
        b.push_return_load(copy)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(b.entry)[0], store);

        let ctx = TransformContext::new(TransformSettings::default().with_capture_marker("self"));
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(b.entry).len(), 1);
        b.function.verify()
    }

    #[test]
    fn test_requires_single_store_of_receiver() -> Result<()> {
        let mut b = FunctionBuilder::new("Reassigned");
        let this = b.this();
        let other = b.local("other", widget_type());
        let alias = b.local(ALIAS_NAME, widget_type());
        let first = b.store_load(alias, this)?;
        let second = b.store_load(alias, other)?;
        b.push_return_load(alias)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(&b.function.instructions(b.entry)[..2], &[first, second]);
        assert!(ctx.events.is_empty());
        b.function.verify()
    }

    #[test]
    fn test_address_taken_blocks_rewrite() -> Result<()> {
        let mut b = FunctionBuilder::new("Address");
        let this = b.this();
        let alias = b.local(ALIAS_NAME, widget_type());
        let store = b.store_load(alias, this)?;
        let address = b.function.ld_loca(alias);
        let ret = b.function.ret(Some(address))?;
        b.push(ret)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(b.entry), &[store, ret]);
        Ok(())
    }

    #[test]
    fn test_inlines_into_following_instruction_and_is_idempotent() -> Result<()> {
        let mut b = FunctionBuilder::new("Inline");
        let this = b.this();
        let alias = b.local(ALIAS_NAME, widget_type());
        let slot = b.function.add_variable(VariableKind::StackSlot, 0, "S_0", widget_type());

        let receiver = b.function.ld_loc(this);
        let define = b.function.st_loc(slot, receiver)?;
        b.push(define)?;
        b.store_load(alias, this)?;
        let ret = b.push_return_load(slot)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(b.entry), &[ret]);
        assert_eq!(ctx.events.count_kind(EventKind::ValueInlined), 1);

        let events = ctx.events.len();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(ctx.events.len(), events);
        b.function.verify()
    }

    #[test]
    fn test_static_function_is_untouched() -> Result<()> {
        let mut b = FunctionBuilder::new("Static");
        let alias = b.local(ALIAS_NAME, widget_type());
        let source = b.local("source", widget_type());
        let store = b.store_load(alias, source)?;
        let dispatch = b.function.add_block(b.function.body(), BlockKind::SwitchDispatch)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(b.entry), &[store]);
        assert!(b.function.instructions(dispatch).is_empty());
        Ok(())
    }

    #[test]
    fn test_skips_dispatch_blocks() -> Result<()> {
        let mut b = FunctionBuilder::new("Dispatch");
        let this = b.this();
        let alias = b.local(ALIAS_NAME, widget_type());
        let dispatch = b.function.add_block(b.function.body(), BlockKind::ExceptionDispatch)?;

        let receiver = b.function.ld_loc(this);
        let store = b.function.st_loc(alias, receiver)?;
        b.function.push_instruction(dispatch, store)?;
        let load = b.function.ld_loc(alias);
        let ret = b.function.ret(Some(load))?;
        b.function.push_instruction(dispatch, ret)?;

        let ctx = TransformContext::default();
        RemoveCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert_eq!(b.function.instructions(dispatch), &[store, ret]);
        assert_eq!(b.function.match_ld_loc(b.function.children(ret)[0]), Some(alias));
        assert!(ctx.events.is_empty());
        b.function.verify()
    }
}
