//! Captured receiver canonicalization.
//!
//! Closures over `this` make the compiler build a capture container: an object of a
//! compiler-generated type constructed from the receiver and stored into a local. Every later
//! use of the receiver goes through a field of that container. This pass folds the container
//! back into the receiver.
//!
//! # Example
//!
//! Before:
//! ```text
//! stloc cap(newobj <>c__CompilerGenerated0::.ctor(ldloc this))
//! stobj Int32(ldflda value(ldloc cap), ldloc x)
//! call Draw(ldobj Widget(ldflda this(ldloc cap)))
//! call Use(ldflda value(ldloc cap))
//! ```
//!
//! After (`cap` retyped to `Widget`):
//! ```text
//! stloc cap(ldloc this)
//! call Draw(ldloc cap)
//! call Use(ldloca x)
//! ```
//!
//! # Algorithm
//!
//! Runs over the entry block of every block container, left to right. A candidate is
//! `stloc v(newobj ctor(ldloc this))` where `v`'s type name contains the capture marker and
//! `ctor` is a constructor with exactly one argument.
//!
//! 1. Retype `v` to the receiver's type.
//! 2. Classify every load of `v` without mutating:
//!    - *wrapper*: `ldobj T(ldflda F(ldloc v))` with `T` equal to the new type of `v`. The
//!      middle node must be a field address; `ldobj T` over any other operand is left alone.
//!    - *forwarding store*: `stobj T(ldflda F(ldloc v), value)` directly in a block, where `F`
//!      is declared on the capture type and `value` is `ldloc x` or `unbox(...)`. The pair
//!      `(F, value)` is recorded. Fields written by more than one forwarding store are not
//!      forwarded.
//! 3. Replace each wrapper with `ldloc v`.
//! 4. Replace each remaining `ldflda F(ldloc v)` of a recorded field, outside the forwarding
//!    stores, with `ldloca x` or a clone of the `unbox` operand.
//! 5. Replace the candidate with `stloc v(ldloc this)`.
//! 6. Remove the forwarding stores, highest index first, running the inliner after each
//!    removal and adjusting the scan cursor.
//!
//! No placeholder instructions are inserted at any point. Detection of the capture type is a
//! plain substring test on the type name; no compiler-emitted attribute is consulted.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    il::{IlFunction, NodeId, Op, VarId},
    transforms::{
        utils::{remove_and_inline, rewind_cursor},
        EventKind, IlTransform, TransformContext,
    },
    typesystem::{IlFieldRc, IlTypeRc},
    Result,
};

/// A matched `stloc v(newobj ctor(ldloc this))`.
struct Candidate {
    variable: VarId,
    receiver: NodeId,
    receiver_type: IlTypeRc,
    capture_type: IlTypeRc,
}

/// Replacement source for references to a forwarded field.
#[derive(Clone, Copy)]
enum Forwarded {
    /// The field held a copy of this variable
    Variable(VarId),
    /// The field held the address produced by this `unbox`
    Unboxed(NodeId),
}

/// Edits collected for one candidate before any mutation.
#[derive(Default)]
struct Plan {
    wrappers: Vec<NodeId>,
    forwarding_stores: Vec<NodeId>,
    fields: HashMap<IlFieldRc, Forwarded>,
}

/// Captured receiver canonicalization pass.
pub struct FixCompilerGeneratedThis;

impl Default for FixCompilerGeneratedThis {
    fn default() -> Self {
        Self::new()
    }
}

impl FixCompilerGeneratedThis {
    /// Creates a new captured receiver canonicalization pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn match_candidate(
        function: &IlFunction,
        inst: NodeId,
        ctx: &TransformContext,
    ) -> Option<Candidate> {
        let (var, value) = function.match_st_loc(inst)?;
        let variable = function.variable(var)?;
        if !ctx
            .settings
            .is_compiler_generated(&variable.var_type().name)
        {
            return None;
        }

        let (method, args) = function.match_new_obj(value)?;
        let [receiver] = args else {
            return None;
        };
        if !method.is_constructor() || !function.match_ld_this(*receiver) {
            return None;
        }

        let this = function.variable(function.match_ld_loc(*receiver)?)?;
        Some(Candidate {
            variable: var,
            receiver: *receiver,
            receiver_type: this.var_type().clone(),
            capture_type: variable.var_type().clone(),
        })
    }

    /// `ldobj T(ldflda F(load))` with `T` equal to the receiver type.
    fn match_wrapper(
        function: &IlFunction,
        load: NodeId,
        receiver_type: &IlTypeRc,
    ) -> Option<NodeId> {
        let address = function.parent(load)?;
        function.match_ld_flda(address)?;
        let wrapper = function.parent(address)?;
        let (_, ty) = function.match_ld_obj(wrapper)?;
        (ty == receiver_type).then_some(wrapper)
    }

    /// `stobj T(ldflda F(load), ldloc x | unbox(...))` directly inside a block.
    fn match_forwarding_store(
        function: &IlFunction,
        load: NodeId,
        candidate: &Candidate,
    ) -> Option<(NodeId, IlFieldRc, Forwarded)> {
        let address = function.parent(load)?;
        let (_, field) = function.match_ld_flda(address)?;
        if field.declaring_type != candidate.capture_type {
            return None;
        }

        let store = function.parent(address)?;
        let (target, value, _) = function.match_st_obj(store)?;
        if target != address || function.block_kind(function.parent(store)?).is_none() {
            return None;
        }

        let forwarded = match function.match_ld_loc(value) {
            Some(var) if var != candidate.variable => Forwarded::Variable(var),
            Some(_) => return None,
            None => {
                function.match_unbox(value)?;
                Forwarded::Unboxed(value)
            }
        };
        Some((store, field.clone(), forwarded))
    }

    fn plan(function: &IlFunction, candidate: &Candidate) -> Plan {
        let loads = function
            .variable(candidate.variable)
            .map(|v| v.loads().to_vec())
            .unwrap_or_default();

        let mut plan = Plan::default();
        let mut writes: HashMap<IlFieldRc, usize> = HashMap::new();
        let mut forwards = Vec::new();

        for load in loads {
            if let Some(wrapper) = Self::match_wrapper(function, load, &candidate.receiver_type) {
                plan.wrappers.push(wrapper);
            } else if let Some(forward) = Self::match_forwarding_store(function, load, candidate) {
                *writes.entry(forward.1.clone()).or_insert(0) += 1;
                forwards.push(forward);
            } else {
                trace!(
                    "{}: leaving use {} of {} as is",
                    function.name(),
                    load,
                    candidate.variable
                );
            }
        }

        for (store, field, forwarded) in forwards {
            if writes.get(&field) == Some(&1) {
                plan.forwarding_stores.push(store);
                plan.fields.insert(field, forwarded);
            }
        }
        plan
    }

    /// Rewrites one candidate at `index` of `block` and returns the next index to scan.
    fn rewrite(
        &self,
        function: &mut IlFunction,
        block: NodeId,
        index: usize,
        candidate: Candidate,
        ctx: &TransformContext,
    ) -> Result<usize> {
        let token = function.token();
        let var = candidate.variable;
        debug!(
            "{}: canonicalizing captured receiver {}",
            function.name(),
            function.display(function.instructions(block)[index])
        );

        function.set_variable_type(var, candidate.receiver_type.clone())?;
        ctx.events
            .record(EventKind::VariableRetyped)
            .at(token, index)
            .pass(self.name())
            .message(format!(
                "{} -> {}",
                candidate.capture_type.full_name(),
                candidate.receiver_type.full_name()
            ));

        let plan = Self::plan(function, &candidate);

        for wrapper in plan.wrappers {
            if !function.is_connected(wrapper) {
                continue;
            }
            let load = function.ld_loc(var);
            function.replace(wrapper, load)?;
            ctx.events
                .record(EventKind::WrapperCollapsed)
                .at(token, index)
                .pass(self.name());
        }

        if !plan.fields.is_empty() {
            let loads = function
                .variable(var)
                .map(|v| v.loads().to_vec())
                .unwrap_or_default();
            for load in loads {
                if !function.is_connected(load)
                    || plan
                        .forwarding_stores
                        .iter()
                        .any(|store| function.is_ancestor(*store, load))
                {
                    continue;
                }
                let Some(address) = function.parent(load) else {
                    continue;
                };
                let Some(forwarded) = function
                    .match_ld_flda(address)
                    .and_then(|(_, field)| plan.fields.get(field))
                    .copied()
                else {
                    continue;
                };

                let replacement = match forwarded {
                    Forwarded::Variable(source) => function.ld_loca(source),
                    Forwarded::Unboxed(unbox) => function.clone_node(unbox)?,
                };
                function.replace(address, replacement)?;
                ctx.events
                    .record(EventKind::FieldReferenceRewritten)
                    .at(token, index)
                    .pass(self.name())
                    .message(function.display(replacement).to_string());
            }
        }

        let construct_store = function.instructions(block)[index];
        let receiver = function.clone_node(candidate.receiver)?;
        let store = function.st_loc(var, receiver)?;
        function.replace(construct_store, store)?;
        ctx.events
            .record(EventKind::StoreReplaced)
            .at(token, index)
            .pass(self.name())
            .message(function.display(store).to_string());

        let mut next = index + 1;
        let mut pending = plan.forwarding_stores;
        while !pending.is_empty() {
            let Some((slot, position, owner)) = pending
                .iter()
                .enumerate()
                .filter_map(|(slot, store)| {
                    let owner = function.parent(*store)?;
                    Some((slot, function.child_index(*store)?, owner))
                })
                .max_by_key(|(_, position, _)| *position)
            else {
                break;
            };
            let store = pending.swap_remove(slot);

            ctx.events
                .record(EventKind::InstructionRemoved)
                .at(token, position)
                .pass(self.name())
                .message(function.display(store).to_string());

            let inlined = remove_and_inline(function, owner, position, ctx)?;
            if owner == block {
                next = rewind_cursor(next, position, inlined);
            }
        }

        Ok(next)
    }

    fn run_on_block(
        &self,
        function: &mut IlFunction,
        block: NodeId,
        ctx: &TransformContext,
    ) -> Result<()> {
        let mut index = 0;
        while let Some(&inst) = function.instructions(block).get(index) {
            index = match Self::match_candidate(function, inst, ctx) {
                Some(candidate) => self.rewrite(function, block, index, candidate, ctx)?,
                None => index + 1,
            };
        }
        Ok(())
    }
}

impl IlTransform for FixCompilerGeneratedThis {
    fn name(&self) -> &'static str {
        "FixCompilerGeneratedThis"
    }

    fn description(&self) -> &'static str {
        "Folds compiler-generated receiver captures back into direct uses of the receiver"
    }

    fn run(&self, function: &mut IlFunction, ctx: &TransformContext) -> Result<()> {
        if !ctx.settings.fix_captured_receiver {
            return Ok(());
        }

        let containers: Vec<NodeId> = function
            .descendants(function.body())
            .filter(|n| matches!(function.op(*n), Some(Op::BlockContainer)))
            .collect();

        for container in containers {
            if !function.is_connected(container) {
                continue;
            }
            if let Some(entry) = function.entry_block(container) {
                self.run_on_block(function, entry, ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        il::{BlockKind, VariableKind},
        test::{
            capture_ctor, capture_field, capture_this_field, capture_type, int32_type, new_obj,
            widget_getter, widget_type, FunctionBuilder,
        },
    };

    /// `stloc cap(newobj capture::.ctor(ldloc this))`
    fn push_capture(b: &mut FunctionBuilder) -> Result<(VarId, VarId, NodeId)> {
        let this = b.this();
        let cap = b.local("cap", capture_type());
        let arg = b.function.ld_loc(this);
        let construct = b.function.call(new_obj(capture_ctor())?, vec![arg])?;
        let store = b.function.st_loc(cap, construct)?;
        b.push(store)?;
        Ok((this, cap, store))
    }

    /// `ldobj Widget(ldflda <>4__this(ldloc cap))`
    fn wrapper(b: &mut FunctionBuilder, cap: VarId) -> Result<NodeId> {
        let load = b.function.ld_loc(cap);
        let address = b.function.ld_flda(load, capture_this_field())?;
        b.function.ld_obj(address, widget_type())
    }

    /// `ldflda field(ldloc cap)`
    fn field_ref(b: &mut FunctionBuilder, cap: VarId, field: IlFieldRc) -> Result<NodeId> {
        let load = b.function.ld_loc(cap);
        b.function.ld_flda(load, field)
    }

    #[test]
    fn test_collapses_trivial_wrappers() -> Result<()> {
        let mut b = FunctionBuilder::new("Simple");
        let (this, cap, _) = push_capture(&mut b)?;
        let first = wrapper(&mut b, cap)?;
        let call = b.push_call(vec![first])?;
        let second = wrapper(&mut b, cap)?;
        let ret = b.function.ret(Some(second))?;
        b.push(ret)?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        let store = b.function.instructions(b.entry)[0];
        let (target, value) = b.function.match_st_loc(store).expect("stloc");
        assert_eq!(target, cap);
        assert!(b.function.match_ld_this(value));
        assert_eq!(b.function.variable(cap).map(|v| v.var_type().clone()), Some(widget_type()));

        assert_eq!(b.function.match_ld_loc(b.function.children(call)[0]), Some(cap));
        assert_eq!(b.function.match_ld_loc(b.function.children(ret)[0]), Some(cap));
        assert_eq!(b.function.variable(cap).map(|v| v.load_count()), Some(2));
        assert_eq!(b.function.variable(this).map(|v| v.load_count()), Some(1));
        assert_eq!(ctx.events.count_kind(EventKind::WrapperCollapsed), 2);
        assert_eq!(ctx.events.count_kind(EventKind::StoreReplaced), 1);
        b.function.verify()
    }

    #[test]
    fn test_wrapper_requires_field_address() -> Result<()> {
        let mut b = FunctionBuilder::new("Unboxed");
        let (_, cap, _) = push_capture(&mut b)?;
        let load = b.function.ld_loc(cap);
        let unboxed = b.function.unbox(load, widget_type())?;
        let other = b.function.ld_obj(unboxed, widget_type())?;
        let call = b.push_call(vec![other])?;
        let collapsed = wrapper(&mut b, cap)?;
        let ret = b.function.ret(Some(collapsed))?;
        b.push(ret)?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert_eq!(b.function.children(call), &[other]);
        assert_eq!(b.function.children(other), &[unboxed]);
        assert_eq!(b.function.children(unboxed), &[load]);
        assert_eq!(b.function.match_ld_loc(b.function.children(ret)[0]), Some(cap));
        assert_eq!(ctx.events.count_kind(EventKind::WrapperCollapsed), 1);
        assert_eq!(ctx.events.count_kind(EventKind::StoreReplaced), 1);
        b.function.verify()
    }

    #[test]
    fn test_nested_forwarding_of_variable() -> Result<()> {
        let mut b = FunctionBuilder::new("Nested");
        let (_, cap, _) = push_capture(&mut b)?;
        let x = b.local("x", int32_type());

        let target = field_ref(&mut b, cap, capture_field())?;
        let value = b.function.ld_loc(x);
        let forward = b.function.st_obj(target, value, int32_type())?;
        b.push(forward)?;

        let reference = field_ref(&mut b, cap, capture_field())?;
        let call = b.push_call(vec![reference])?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert!(!b.function.is_alive(forward));
        assert_eq!(b.function.instructions(b.entry).len(), 2);
        assert_eq!(b.function.instructions(b.entry)[1], call);
        assert_eq!(b.function.match_ld_loca(b.function.children(call)[0]), Some(x));
        assert!(b.function.variable(cap).is_some_and(|v| v.load_count() == 0));
        assert_eq!(
            b.function.variable(x).map(|v| (v.load_count(), v.address_count())),
            Some((0, 1)),
        );
        let any_field_left = b
            .function
            .descendants(b.function.body())
            .any(|n| b.function.match_ld_flda(n).is_some());
        assert!(!any_field_left);
        b.function.verify()
    }

    #[test]
    fn test_nested_forwarding_of_unbox() -> Result<()> {
        let mut b = FunctionBuilder::new("Unbox");
        let (_, cap, _) = push_capture(&mut b)?;
        let boxed = b.local("boxed", widget_type());

        let target = field_ref(&mut b, cap, capture_field())?;
        let inner = b.function.ld_loc(boxed);
        let unbox = b.function.unbox(inner, int32_type())?;
        let forward = b.function.st_obj(target, unbox, int32_type())?;
        b.push(forward)?;

        let first = field_ref(&mut b, cap, capture_field())?;
        let second = field_ref(&mut b, cap, capture_field())?;
        let call = b.push_call(vec![first, second])?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert!(!b.function.is_alive(forward));
        let args = b.function.children(call).to_vec();
        assert_eq!(args.len(), 2);
        for arg in &args {
            let (value, ty) = b.function.match_unbox(*arg).expect("unbox");
            assert_eq!(ty, &int32_type());
            assert_eq!(b.function.match_ld_loc(value), Some(boxed));
        }
        assert_ne!(args[0], args[1]);
        assert_eq!(ctx.events.count_kind(EventKind::FieldReferenceRewritten), 2);
        assert_eq!(b.function.variable(boxed).map(|v| v.load_count()), Some(2));
        b.function.verify()
    }

    #[test]
    fn test_field_forwarded_twice_is_left_alone() -> Result<()> {
        let mut b = FunctionBuilder::new("Twice");
        let (_, cap, _) = push_capture(&mut b)?;
        let x = b.local("x", int32_type());
        let y = b.local("y", int32_type());

        for source in [x, y] {
            let target = field_ref(&mut b, cap, capture_field())?;
            let value = b.function.ld_loc(source);
            let forward = b.function.st_obj(target, value, int32_type())?;
            b.push(forward)?;
        }

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert_eq!(b.function.instructions(b.entry).len(), 3);
        assert_eq!(ctx.events.count_kind(EventKind::InstructionRemoved), 0);
        b.function.verify()
    }

    #[test]
    fn test_requires_marker_constructor_and_receiver() -> Result<()> {
        let mut b = FunctionBuilder::new("Mismatch");
        let this = b.this();
        let plain = b.local("plain", widget_type());
        let cap = b.local("cap", capture_type());
        let other = b.local("other", widget_type());

        // wrong variable type
        let arg = b.function.ld_loc(this);
        let construct = b.function.call(new_obj(capture_ctor())?, vec![arg])?;
        let first = b.function.st_loc(plain, construct)?;
        b.push(first)?;

        // argument is not the receiver
        let arg = b.function.ld_loc(other);
        let construct = b.function.call(new_obj(capture_ctor())?, vec![arg])?;
        let second = b.function.st_loc(cap, construct)?;
        b.push(second)?;

        // not a constructor
        let arg = b.function.ld_loc(this);
        let construct = b.function.call(new_obj(widget_getter())?, vec![arg])?;
        let third = b.function.st_loc(cap, construct)?;
        b.push(third)?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        assert_eq!(b.function.instructions(b.entry), &[first, second, third]);
        assert_eq!(b.function.variable(cap).map(|v| v.var_type().clone()), Some(capture_type()));
        assert!(ctx.events.is_empty());
        b.function.verify()
    }

    #[test]
    fn test_only_entry_blocks_are_scanned() -> Result<()> {
        let mut b = FunctionBuilder::new("Entry");
        let this = b.this();
        let cap = b.local("cap", capture_type());
        let second = b.function.add_block(b.function.body(), BlockKind::ControlFlow)?;

        let arg = b.function.ld_loc(this);
        let construct = b.function.call(new_obj(capture_ctor())?, vec![arg])?;
        let store = b.function.st_loc(cap, construct)?;
        b.function.push_instruction(second, store)?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(second), &[store]);
        assert!(b.function.match_new_obj(b.function.children(store)[0]).is_some());
        b.function.verify()
    }

    #[test]
    fn test_nested_container_and_stack_slot_inlining() -> Result<()> {
        let mut b = FunctionBuilder::new("Inline");
        let (_, cap, _) = push_capture(&mut b)?;
        let x = b.local("x", int32_type());
        let slot = b.function.add_variable(VariableKind::StackSlot, 0, "S_0", int32_type());

        // stloc S_0(ldc.i4 7); stobj(ldflda value(ldloc cap), ldloc x); ret(ldloc S_0)
        let seven = b.function.ldc_i4(7);
        let define = b.function.st_loc(slot, seven)?;
        b.push(define)?;
        let target = field_ref(&mut b, cap, capture_field())?;
        let value = b.function.ld_loc(x);
        let forward = b.function.st_obj(target, value, int32_type())?;
        b.push(forward)?;
        let ret = b.push_return_load(slot)?;

        let nested = b.function.add_container();
        let inner = b.function.add_block(nested, BlockKind::ControlFlow)?;
        let reference = field_ref(&mut b, cap, capture_field())?;
        let use_site = b.function.ret(Some(reference))?;
        b.function.push_instruction(inner, use_site)?;
        b.push(nested)?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;

        let remaining = b.function.instructions(b.entry).to_vec();
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[1], ret);
        assert!(matches!(
            b.function.op(b.function.children(ret)[0]),
            Some(Op::LdcI4(7))
        ));
        assert_eq!(b.function.match_ld_loca(b.function.children(use_site)[0]), Some(x));
        assert_eq!(ctx.events.count_kind(EventKind::ValueInlined), 1);
        b.function.verify()
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let mut b = FunctionBuilder::new("Again");
        let (_, cap, _) = push_capture(&mut b)?;
        let first = wrapper(&mut b, cap)?;
        b.push_call(vec![first])?;

        let ctx = TransformContext::default();
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        let render = |f: &IlFunction, block: NodeId| -> Vec<String> {
            f.instructions(block)
                .iter()
                .map(|inst| f.display(*inst).to_string())
                .collect()
        };
        let before = render(&b.function, b.entry);
        let events = ctx.events.len();

        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(ctx.events.len(), events);
        assert_eq!(render(&b.function, b.entry), before);
        assert_eq!(before[0], "stloc cap(ldloc this)");
        b.function.verify()
    }

    #[test]
    fn test_can_be_disabled() -> Result<()> {
        let mut b = FunctionBuilder::new("Disabled");
        let (_, cap, store) = push_capture(&mut b)?;

        let ctx = TransformContext::new(
            crate::transforms::TransformSettings::default().with_captured_receiver(false),
        );
        FixCompilerGeneratedThis.run(&mut b.function, &ctx)?;
        assert_eq!(b.function.instructions(b.entry), &[store]);
        assert_eq!(b.function.variable(cap).map(|v| v.var_type().clone()), Some(capture_type()));
        Ok(())
    }
}
