//! The function root: node arena, variable table and all tree mutation primitives.
//!
//! # Structure
//!
//! ```text
//! IlFunction
//! ├── nodes: Vec<Option<Node>>      // arena, a slot becomes None when its node is destroyed
//! ├── variables: Vec<IlVariable>    // declarations with use-lists
//! └── body: NodeId                  // root BlockContainer
//!       └── Block*
//!             └── instruction trees (may nest further BlockContainers)
//! ```
//!
//! # Ownership
//!
//! A node owns its children; `parent` and the variable use-lists are the only back
//! references and are plain handles. Every primitive in this module keeps three things in
//! step within the same call: the parent's child slot, the child's parent link and the
//! use-lists of every variable referenced in the affected subtrees.
//!
//! A node is *connected* while it is reachable from [`IlFunction::body`]. Freshly built nodes
//! and subtrees returned by [`IlFunction::take`] are detached: they have no parent, are not
//! connected and do not appear in any use-list until they are inserted into the tree.
//! Nodes removed from the tree by [`IlFunction::replace`] or [`IlFunction::remove_at`] are
//! destroyed immediately and their handles become stale.

use std::collections::HashSet;

use crate::{
    il::{
        variable::UseKind, BlockKind, CallInstruction, IlVariable, Node, NodeId, Op, VarId,
        VariableKind,
    },
    typesystem::{IlFieldRc, IlTypeRc, Token},
    Error, Result,
};

/// A decompiled method as an instruction tree.
///
/// # Examples
///
/// ```rust
/// use iltransform::il::{BlockKind, IlFunction, VariableKind};
/// use iltransform::typesystem::{IlType, StackType, Token, TypeFlags};
///
/// let int32 = IlType::new(Token::new(0x0100_0008), "System", "Int32", TypeFlags::VALUE_TYPE, StackType::I4);
/// let mut function = IlFunction::new(Token::new(0x0600_0001), "Compute");
/// let x = function.add_variable(VariableKind::Local, 0, "x", int32);
///
/// let entry = function.add_block(function.body(), BlockKind::ControlFlow)?;
/// let value = function.ldc_i4(42);
/// let store = function.st_loc(x, value)?;
/// function.push_instruction(entry, store)?;
///
/// assert_eq!(function.variable(x).map(|v| v.store_count()), Some(1));
/// function.verify()?;
/// # Ok::<(), iltransform::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct IlFunction {
    token: Token,
    name: String,
    nodes: Vec<Option<Node>>,
    variables: Vec<IlVariable>,
    body: NodeId,
}

impl IlFunction {
    /// Creates a function with an empty root container.
    ///
    /// # Arguments
    ///
    /// * `token` - Token of the method this function was decompiled from
    /// * `name` - Method name, used in diagnostics
    #[must_use]
    pub fn new(token: Token, name: impl Into<String>) -> Self {
        let mut root = Node::new(Op::BlockContainer, Vec::new());
        root.connected = true;

        IlFunction {
            token,
            name: name.into(),
            nodes: vec![Some(root)],
            variables: Vec::new(),
            body: NodeId(0),
        }
    }

    /// Returns the method token.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root container.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    // ── Variables ───────────────────────────────────────────────────────

    /// Declares a new variable.
    pub fn add_variable(
        &mut self,
        kind: VariableKind,
        index: u16,
        name: impl Into<String>,
        var_type: IlTypeRc,
    ) -> VarId {
        let id = VarId::new(self.variables.len());
        self.variables
            .push(IlVariable::new(id, kind, index, name.into(), var_type));
        id
    }

    /// Returns the variable for a handle.
    #[must_use]
    pub fn variable(&self, var: VarId) -> Option<&IlVariable> {
        self.variables.get(var.index())
    }

    /// Returns all declared variables.
    #[must_use]
    pub fn variables(&self) -> &[IlVariable] {
        &self.variables
    }

    /// Returns the receiver parameter, if the function has one.
    #[must_use]
    pub fn this_variable(&self) -> Option<VarId> {
        self.variables.iter().find(|v| v.is_this()).map(IlVariable::id)
    }

    /// Changes the declared type of a variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VariableNotFound`] for an unknown handle.
    pub fn set_variable_type(&mut self, var: VarId, var_type: IlTypeRc) -> Result<()> {
        self.variables
            .get_mut(var.index())
            .ok_or(Error::VariableNotFound(var))?
            .set_type(var_type);
        Ok(())
    }

    // ── Node access ─────────────────────────────────────────────────────

    /// Returns the node for a handle, `None` when it was destroyed.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Returns the operation of a node.
    #[must_use]
    pub fn op(&self, id: NodeId) -> Option<&Op> {
        self.node(id).map(Node::op)
    }

    /// Returns the children of a node, empty for leaves and stale handles.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], Node::children)
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Returns the position of a node within its parent's children.
    #[must_use]
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Returns true if the handle still refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Returns true if the node is part of the function tree.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_connected)
    }

    /// Returns the number of live nodes, connected or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if `ancestor` is `node` or one of its transitive parents.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Pre-order traversal of `root` and all of its descendants.
    #[must_use]
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let stack = if self.is_alive(root) {
            vec![root]
        } else {
            Vec::new()
        };
        Descendants {
            function: self,
            stack,
        }
    }

    fn get(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(Error::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::NodeNotFound(id))
    }

    fn root_of(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    // ── Construction ────────────────────────────────────────────────────

    fn alloc(&mut self, op: Op, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        for child in &children {
            if let Some(Some(node)) = self.nodes.get_mut(child.0) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(Some(Node::new(op, children)));
        id
    }

    /// Ensures `id` is a live, detached subtree root that can be given a parent.
    fn ensure_detached(&self, id: NodeId) -> Result<()> {
        let node = self.get(id)?;
        if node.parent.is_some() || node.connected || id == self.body {
            return Err(Error::NodeOwned(id));
        }
        Ok(())
    }

    /// Creates a detached node owning the given children.
    ///
    /// Blocks and containers are created empty; fill them through [`Self::add_block`] and
    /// [`Self::push_instruction`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the child count does not fit the operation
    /// - [`Error::NodeOwned`] if a child already has a parent or is listed twice
    /// - [`Error::NodeNotFound`] if a child handle is stale
    pub fn create(&mut self, op: Op, children: Vec<NodeId>) -> Result<NodeId> {
        if let Some(arity) = op.fixed_arity() {
            if arity != children.len() {
                return Err(Error::InvalidArgument(format!(
                    "{} expects {} operands, got {}",
                    op.opcode(),
                    arity,
                    children.len()
                )));
            }
        }
        if matches!(op, Op::Return) && children.len() > 1 {
            return Err(Error::InvalidArgument(format!(
                "ret expects at most 1 operand, got {}",
                children.len()
            )));
        }

        let mut seen = HashSet::with_capacity(children.len());
        for child in &children {
            self.ensure_detached(*child)?;
            if !seen.insert(*child) {
                return Err(Error::NodeOwned(*child));
            }
        }

        Ok(self.alloc(op, children))
    }

    /// Builds `nop`.
    pub fn nop(&mut self) -> NodeId {
        self.alloc(Op::Nop, Vec::new())
    }

    /// Builds `ldc.i4 value`.
    pub fn ldc_i4(&mut self, value: i32) -> NodeId {
        self.alloc(Op::LdcI4(value), Vec::new())
    }

    /// Builds `ldnull`.
    pub fn ld_null(&mut self) -> NodeId {
        self.alloc(Op::LdNull, Vec::new())
    }

    /// Builds `ldloc var`.
    pub fn ld_loc(&mut self, var: VarId) -> NodeId {
        self.alloc(Op::LdLoc(var), Vec::new())
    }

    /// Builds `ldloca var`.
    pub fn ld_loca(&mut self, var: VarId) -> NodeId {
        self.alloc(Op::LdLoca(var), Vec::new())
    }

    /// Builds `stloc var(value)`.
    ///
    /// # Errors
    ///
    /// Fails if `value` is not a detached subtree.
    pub fn st_loc(&mut self, var: VarId, value: NodeId) -> Result<NodeId> {
        self.create(Op::StLoc(var), vec![value])
    }

    /// Builds `ldflda field(target)`.
    ///
    /// # Errors
    ///
    /// Fails if `target` is not a detached subtree.
    pub fn ld_flda(&mut self, target: NodeId, field: IlFieldRc) -> Result<NodeId> {
        self.create(Op::LdFlda(field), vec![target])
    }

    /// Builds `ldobj type(address)`.
    ///
    /// # Errors
    ///
    /// Fails if `address` is not a detached subtree.
    pub fn ld_obj(&mut self, address: NodeId, ty: IlTypeRc) -> Result<NodeId> {
        self.create(Op::LdObj(ty), vec![address])
    }

    /// Builds `stobj type(address, value)`.
    ///
    /// # Errors
    ///
    /// Fails if `address` or `value` is not a detached subtree.
    pub fn st_obj(&mut self, address: NodeId, value: NodeId, ty: IlTypeRc) -> Result<NodeId> {
        self.create(Op::StObj(ty), vec![address, value])
    }

    /// Builds `unbox type(value)`.
    ///
    /// # Errors
    ///
    /// Fails if `value` is not a detached subtree.
    pub fn unbox(&mut self, value: NodeId, ty: IlTypeRc) -> Result<NodeId> {
        self.create(Op::Unbox(ty), vec![value])
    }

    /// Builds a call, virtual call or object construction with the given arguments.
    ///
    /// # Errors
    ///
    /// Fails if any argument is not a detached subtree.
    pub fn call(&mut self, call: CallInstruction, args: Vec<NodeId>) -> Result<NodeId> {
        self.create(Op::Call(call), args)
    }

    /// Builds `ret` with an optional value.
    ///
    /// # Errors
    ///
    /// Fails if `value` is not a detached subtree.
    pub fn ret(&mut self, value: Option<NodeId>) -> Result<NodeId> {
        self.create(Op::Return, value.into_iter().collect())
    }

    /// Builds a detached, empty block container.
    ///
    /// Nested containers are inserted as instructions of an enclosing block.
    pub fn add_container(&mut self) -> NodeId {
        self.alloc(Op::BlockContainer, Vec::new())
    }

    /// Appends a new empty block to a container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedNode`] if `container` is not a block container.
    pub fn add_block(&mut self, container: NodeId, kind: BlockKind) -> Result<NodeId> {
        let connected = match self.get(container)? {
            Node {
                op: Op::BlockContainer,
                connected,
                ..
            } => *connected,
            _ => {
                return Err(Error::UnexpectedNode {
                    node: container,
                    expected: "block container",
                })
            }
        };

        let block = self.alloc(Op::Block(kind), Vec::new());
        let node = self.get_mut(block)?;
        node.parent = Some(container);
        node.connected = connected;
        self.get_mut(container)?.children.push(block);
        Ok(block)
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// Returns the blocks of a container, empty for other nodes.
    #[must_use]
    pub fn blocks(&self, container: NodeId) -> &[NodeId] {
        match self.node(container) {
            Some(node) if matches!(node.op, Op::BlockContainer) => &node.children,
            _ => &[],
        }
    }

    /// Returns the entry block of a container.
    #[must_use]
    pub fn entry_block(&self, container: NodeId) -> Option<NodeId> {
        self.blocks(container).first().copied()
    }

    /// Returns the instructions of a block, empty for other nodes.
    #[must_use]
    pub fn instructions(&self, block: NodeId) -> &[NodeId] {
        match self.node(block) {
            Some(node) if matches!(node.op, Op::Block(_)) => &node.children,
            _ => &[],
        }
    }

    /// Returns the kind of a block, `None` for other nodes.
    #[must_use]
    pub fn block_kind(&self, block: NodeId) -> Option<BlockKind> {
        match self.op(block) {
            Some(Op::Block(kind)) => Some(*kind),
            _ => None,
        }
    }

    fn ensure_block(&self, block: NodeId) -> Result<&Node> {
        let node = self.get(block)?;
        if matches!(node.op, Op::Block(_)) {
            Ok(node)
        } else {
            Err(Error::UnexpectedNode {
                node: block,
                expected: "block",
            })
        }
    }

    /// Appends a detached instruction to a block.
    ///
    /// # Errors
    ///
    /// Fails if `block` is not a block or `inst` is not a detached subtree.
    pub fn push_instruction(&mut self, block: NodeId, inst: NodeId) -> Result<()> {
        let len = self.ensure_block(block)?.children.len();
        self.insert_instruction(block, len, inst)
    }

    /// Inserts a detached instruction into a block at `index`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedNode`] if `block` is not a block or `inst` is a block
    /// - [`Error::InvalidIndex`] if `index` is past the end
    /// - [`Error::NodeOwned`] if `inst` already has a parent or encloses `block`
    pub fn insert_instruction(&mut self, block: NodeId, index: usize, inst: NodeId) -> Result<()> {
        let node = self.ensure_block(block)?;
        let len = node.children.len();
        let connected = node.connected;
        if index > len {
            return Err(Error::InvalidIndex { index, len });
        }
        self.ensure_detached(inst)?;
        if matches!(self.get(inst)?.op, Op::Block(_)) {
            return Err(Error::UnexpectedNode {
                node: inst,
                expected: "instruction",
            });
        }
        if self.root_of(block) == inst {
            return Err(Error::NodeOwned(inst));
        }

        self.get_mut(block)?.children.insert(index, inst);
        self.get_mut(inst)?.parent = Some(block);
        if connected {
            self.connect(inst);
        }
        Ok(())
    }

    /// Removes and destroys the instruction at `index` of a block.
    ///
    /// # Errors
    ///
    /// Fails if `block` is not a block or `index` is out of range.
    pub fn remove_at(&mut self, block: NodeId, index: usize) -> Result<()> {
        let node = self.ensure_block(block)?;
        let len = node.children.len();
        if index >= len {
            return Err(Error::InvalidIndex { index, len });
        }

        let inst = self.get_mut(block)?.children.remove(index);
        self.disconnect(inst);
        self.destroy(inst);
        Ok(())
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Splices `new` into the exact position of `node` and destroys `node`.
    ///
    /// The parent keeps the same child index. Every variable referenced inside `node` loses
    /// those references from its use-lists and every variable referenced inside `new` gains
    /// them, within this call.
    ///
    /// # Errors
    ///
    /// - [`Error::NodeDetached`] if `node` has no parent
    /// - [`Error::NodeOwned`] if `new` already has a parent or is an ancestor of `node`
    pub fn replace(&mut self, node: NodeId, new: NodeId) -> Result<()> {
        let parent = self.get(node)?.parent.ok_or(Error::NodeDetached(node))?;
        self.ensure_detached(new)?;
        if self.root_of(node) == new {
            return Err(Error::NodeOwned(new));
        }
        let is_block = matches!(self.get(new)?.op, Op::Block(_));
        let parent_is_container = matches!(self.get(parent)?.op, Op::BlockContainer);
        if is_block != parent_is_container {
            return Err(Error::UnexpectedNode {
                node: new,
                expected: if parent_is_container {
                    "block"
                } else {
                    "instruction"
                },
            });
        }

        let index = self
            .child_index(node)
            .ok_or_else(|| malformed_error!("{} is not among the children of {}", node, parent))?;
        let connected = self.get(parent)?.connected;

        self.disconnect(node);
        self.destroy(node);

        self.get_mut(parent)?.children[index] = new;
        self.get_mut(new)?.parent = Some(parent);
        if connected {
            self.connect(new);
        }
        Ok(())
    }

    /// Detaches `node` from its parent so it can be moved elsewhere.
    ///
    /// The vacated slot is filled with a fresh `nop`, keeping the parent's arity intact. The
    /// returned subtree is detached: no parent, not connected, not in any use-list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeDetached`] if `node` has no parent.
    pub fn take(&mut self, node: NodeId) -> Result<NodeId> {
        let parent = self.get(node)?.parent.ok_or(Error::NodeDetached(node))?;
        if matches!(self.get(parent)?.op, Op::Block(_) | Op::BlockContainer) {
            return Err(Error::UnexpectedNode {
                node,
                expected: "operand",
            });
        }
        let index = self
            .child_index(node)
            .ok_or_else(|| malformed_error!("{} is not among the children of {}", node, parent))?;
        let connected = self.get(parent)?.connected;

        self.disconnect(node);
        self.get_mut(node)?.parent = None;

        let placeholder = self.alloc(Op::Nop, Vec::new());
        self.get_mut(parent)?.children[index] = placeholder;
        let slot = self.get_mut(placeholder)?;
        slot.parent = Some(parent);
        slot.connected = connected;
        Ok(node)
    }

    /// Deep-copies a subtree into a new detached subtree.
    ///
    /// Operands that denote declarations (variables, fields, types, methods) are shared, not
    /// duplicated. The copy shares no node with the source and can be inserted anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] if `node` is stale.
    pub fn clone_node(&mut self, node: NodeId) -> Result<NodeId> {
        let source = self.get(node)?;
        let op = source.op.clone();
        let children = source.children.clone();

        let mut copies = Vec::with_capacity(children.len());
        for child in children {
            copies.push(self.clone_node(child)?);
        }
        Ok(self.alloc(op, copies))
    }

    fn register(&mut self, id: NodeId, add: bool) {
        let Some(Some(node)) = self.nodes.get(id.0) else {
            return;
        };
        let (var, kind) = match node.op {
            Op::LdLoc(var) => (var, UseKind::Load),
            Op::StLoc(var) => (var, UseKind::Store),
            Op::LdLoca(var) => (var, UseKind::Address),
            _ => return,
        };
        if let Some(variable) = self.variables.get_mut(var.index()) {
            if add {
                variable.add_use(kind, id);
            } else {
                variable.remove_use(kind, id);
            }
        }
    }

    fn set_connected(&mut self, root: NodeId, connected: bool) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(Some(node)) = self.nodes.get_mut(id.0) else {
                continue;
            };
            if node.connected == connected {
                continue;
            }
            node.connected = connected;
            stack.extend(node.children.iter().copied());
            self.register(id, connected);
        }
    }

    /// Marks a subtree as part of the tree and adds its variable references.
    fn connect(&mut self, root: NodeId) {
        self.set_connected(root, true);
    }

    /// Marks a subtree as outside the tree and drops its variable references.
    fn disconnect(&mut self, root: NodeId) {
        self.set_connected(root, false);
    }

    /// Frees the arena slots of a subtree. The subtree must already be disconnected.
    fn destroy(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(id.0) {
                if let Some(node) = slot.take() {
                    stack.extend(node.children);
                }
            }
        }
    }

    // ── Verification ────────────────────────────────────────────────────

    /// Checks every structural invariant of the tree.
    ///
    /// - the body is a live, parentless, connected container
    /// - every reachable node is live, connected and owned exactly once
    /// - every child points back at its parent
    /// - containers own only blocks, and blocks appear nowhere else
    /// - unreachable live nodes are not connected
    /// - every use-list equals the set of matching reachable nodes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] describing the first violation found.
    pub fn verify(&self) -> Result<()> {
        let body = self
            .node(self.body)
            .ok_or_else(|| malformed_error!("function body {} was destroyed", self.body))?;
        if body.parent.is_some() || !body.connected || !matches!(body.op, Op::BlockContainer) {
            return Err(malformed_error!(
                "function body {} is not a connected root container",
                self.body
            ));
        }

        let mut reachable = HashSet::new();
        let mut stack = vec![self.body];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                return Err(malformed_error!("{} is owned more than once", id));
            }
            let node = self
                .node(id)
                .ok_or_else(|| malformed_error!("{} is referenced but destroyed", id))?;
            if !node.connected {
                return Err(malformed_error!("{} is reachable but not connected", id));
            }

            for &child in &node.children {
                let child_node = self
                    .node(child)
                    .ok_or_else(|| malformed_error!("{} has destroyed child {}", id, child))?;
                if child_node.parent != Some(id) {
                    return Err(malformed_error!(
                        "{} lists child {} whose parent is {:?}",
                        id,
                        child,
                        child_node.parent
                    ));
                }
                let child_is_block = matches!(child_node.op, Op::Block(_));
                let in_container = matches!(node.op, Op::BlockContainer);
                if child_is_block != in_container {
                    return Err(malformed_error!(
                        "{} ({}) has misplaced child {} ({})",
                        id,
                        node.op.opcode(),
                        child,
                        child_node.op.opcode()
                    ));
                }
                stack.push(child);
            }
        }

        for (index, slot) in self.nodes.iter().enumerate() {
            if let Some(node) = slot {
                if node.connected && !reachable.contains(&NodeId(index)) {
                    return Err(malformed_error!(
                        "#{} is connected but unreachable from the body",
                        index
                    ));
                }
            }
        }

        for variable in &self.variables {
            let mut expected = [Vec::new(), Vec::new(), Vec::new()];
            for &id in &reachable {
                match self.op(id) {
                    Some(Op::LdLoc(v)) if *v == variable.id() => expected[0].push(id),
                    Some(Op::StLoc(v)) if *v == variable.id() => expected[1].push(id),
                    Some(Op::LdLoca(v)) if *v == variable.id() => expected[2].push(id),
                    _ => {}
                }
            }

            let actual = [
                variable.loads(),
                variable.stores(),
                variable.address_loads(),
            ];
            for (label, (mut want, have)) in ["load", "store", "address"]
                .iter()
                .zip(expected.into_iter().zip(actual))
            {
                let mut have = have.to_vec();
                want.sort_unstable();
                have.sort_unstable();
                if want != have {
                    return Err(malformed_error!(
                        "{} use-list of {} ({}) is {:?}, tree has {:?}",
                        label,
                        variable.id(),
                        variable.name(),
                        have,
                        want
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Pre-order iterator over a subtree, see [`IlFunction::descendants`].
pub struct Descendants<'a> {
    function: &'a IlFunction,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.function.children(id).iter().rev().copied());
        Some(id)
    }
}
