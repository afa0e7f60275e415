//! Variables and their use-lists.
//!
//! Every variable keeps three use-lists: the `ldloc` nodes reading it, the `stloc` nodes
//! writing it and the `ldloca` nodes taking its address. The lists are owned by the
//! [`IlFunction`](crate::il::IlFunction) and updated in the same step as the tree edit that
//! adds or removes such a node; they are never recomputed lazily. Only nodes that are part
//! of the function tree are listed; freshly built or detached subtrees are not.

use std::fmt;

use strum::Display;

use crate::{il::NodeId, typesystem::IlTypeRc};

/// Handle of a variable inside an [`IlFunction`](crate::il::IlFunction).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Creates a handle from a raw index into the variable table.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Where a variable comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum VariableKind {
    /// The receiver (`this`) of an instance method
    #[strum(serialize = "this")]
    This,
    /// A declared method parameter
    #[strum(serialize = "param")]
    Parameter,
    /// A declared local variable
    #[strum(serialize = "local")]
    Local,
    /// A temporary introduced for an evaluation stack slot
    #[strum(serialize = "stack")]
    StackSlot,
}

/// The three kinds of references a use-list tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UseKind {
    Load,
    Store,
    Address,
}

/// A local, parameter or stack slot of a function.
#[derive(Debug, Clone)]
pub struct IlVariable {
    id: VarId,
    kind: VariableKind,
    /// Declaration index (parameter or local slot); `0` for `this`.
    index: u16,
    name: String,
    var_type: IlTypeRc,
    loads: Vec<NodeId>,
    stores: Vec<NodeId>,
    address_loads: Vec<NodeId>,
}

impl IlVariable {
    pub(crate) fn new(
        id: VarId,
        kind: VariableKind,
        index: u16,
        name: String,
        var_type: IlTypeRc,
    ) -> Self {
        Self {
            id,
            kind,
            index,
            name,
            var_type,
            loads: Vec::new(),
            stores: Vec::new(),
            address_loads: Vec::new(),
        }
    }

    /// Returns the variable's handle.
    #[must_use]
    pub const fn id(&self) -> VarId {
        self.id
    }

    /// Returns where this variable comes from.
    #[must_use]
    pub const fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Returns the declaration index.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Returns the symbolic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub fn var_type(&self) -> &IlTypeRc {
        &self.var_type
    }

    /// Returns true for the receiver parameter.
    #[must_use]
    pub fn is_this(&self) -> bool {
        self.kind == VariableKind::This
    }

    /// `ldloc` nodes currently in the tree that read this variable.
    #[must_use]
    pub fn loads(&self) -> &[NodeId] {
        &self.loads
    }

    /// `stloc` nodes currently in the tree that write this variable.
    #[must_use]
    pub fn stores(&self) -> &[NodeId] {
        &self.stores
    }

    /// `ldloca` nodes currently in the tree that take this variable's address.
    #[must_use]
    pub fn address_loads(&self) -> &[NodeId] {
        &self.address_loads
    }

    /// Number of loads.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.len()
    }

    /// Number of stores.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Number of address loads.
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.address_loads.len()
    }

    /// Returns true if nothing in the tree references the variable.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.loads.is_empty() && self.stores.is_empty() && self.address_loads.is_empty()
    }

    pub(crate) fn set_type(&mut self, var_type: IlTypeRc) {
        self.var_type = var_type;
    }

    fn list_mut(&mut self, kind: UseKind) -> &mut Vec<NodeId> {
        match kind {
            UseKind::Load => &mut self.loads,
            UseKind::Store => &mut self.stores,
            UseKind::Address => &mut self.address_loads,
        }
    }

    pub(crate) fn add_use(&mut self, kind: UseKind, node: NodeId) {
        let list = self.list_mut(kind);
        if !list.contains(&node) {
            list.push(node);
        }
    }

    pub(crate) fn remove_use(&mut self, kind: UseKind, node: NodeId) {
        let list = self.list_mut(kind);
        if let Some(pos) = list.iter().position(|n| *n == node) {
            list.remove(pos);
        }
    }
}

impl fmt::Display for IlVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} : {}", self.kind, self.name, self.var_type.full_name())
    }
}
