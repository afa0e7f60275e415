//! Tree nodes and their typed operands.
//!
//! An [`IlFunction`](crate::il::IlFunction) stores its instructions in an arena. Each
//! [`Node`] owns its children through an ordered list of [`NodeId`] handles and points back at
//! its parent through a non-owning handle. Operand fields that are not sub-instructions
//! (variables, fields, types, call targets) live in the [`Op`] the node carries.
//!
//! # Child slots
//!
//! | Op | children |
//! |----|----------|
//! | `StLoc` | `[value]` |
//! | `LdFlda` | `[target]` |
//! | `LdObj` | `[address]` |
//! | `StObj` | `[address, value]` |
//! | `Unbox` | `[value]` |
//! | `Call` | arguments, starting at index 0 |
//! | `Return` | `[]` or `[value]` |
//! | `Block` | the block's instructions |
//! | `BlockContainer` | the container's blocks |
//! | everything else | `[]` |

use std::fmt;

use crate::{
    il::{CallInstruction, OpCode, VarId},
    typesystem::{IlFieldRc, IlTypeRc},
};

/// Handle of a node inside an [`IlFunction`](crate::il::IlFunction) arena.
///
/// Handles are never reused: once a node is destroyed every lookup through its handle fails,
/// so a stale handle can not silently alias a newer node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a handle from a raw arena index.
    ///
    /// Intended for tests and diagnostics; handles are normally obtained from the function.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Classification of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Ordinary sequence of statements
    ControlFlow,
    /// Dispatch block selecting an exception handler
    ExceptionDispatch,
    /// Dispatch block of a switch
    SwitchDispatch,
}

/// Operation of a node together with its non-instruction operands.
#[derive(Debug, Clone)]
pub enum Op {
    /// No operation
    Nop,
    /// 32-bit integer constant
    LdcI4(i32),
    /// Null reference
    LdNull,
    /// Value of a variable
    LdLoc(VarId),
    /// Address of a variable
    LdLoca(VarId),
    /// Store into a variable
    StLoc(VarId),
    /// Address of a field on the target object
    LdFlda(IlFieldRc),
    /// Load of the given type through an address
    LdObj(IlTypeRc),
    /// Store of the given type through an address
    StObj(IlTypeRc),
    /// Address of the value of the given type inside a boxed object
    Unbox(IlTypeRc),
    /// Member of the construct-call family
    Call(CallInstruction),
    /// Return from the function
    Return,
    /// Block of the given kind
    Block(BlockKind),
    /// Container of blocks
    BlockContainer,
}

impl Op {
    /// Returns the operation tag.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        match self {
            Op::Nop => OpCode::Nop,
            Op::LdcI4(_) => OpCode::LdcI4,
            Op::LdNull => OpCode::LdNull,
            Op::LdLoc(_) => OpCode::LdLoc,
            Op::LdLoca(_) => OpCode::LdLoca,
            Op::StLoc(_) => OpCode::StLoc,
            Op::LdFlda(_) => OpCode::LdFlda,
            Op::LdObj(_) => OpCode::LdObj,
            Op::StObj(_) => OpCode::StObj,
            Op::Unbox(_) => OpCode::Unbox,
            Op::Call(call) => call.kind(),
            Op::Return => OpCode::Return,
            Op::Block(_) => OpCode::Block,
            Op::BlockContainer => OpCode::BlockContainer,
        }
    }

    /// Returns the referenced variable for `ldloc`, `ldloca` and `stloc`.
    #[must_use]
    pub fn variable(&self) -> Option<VarId> {
        match self {
            Op::LdLoc(var) | Op::LdLoca(var) | Op::StLoc(var) => Some(*var),
            _ => None,
        }
    }

    /// Number of children the operation requires, `None` when the count is variable.
    #[must_use]
    pub fn fixed_arity(&self) -> Option<usize> {
        match self {
            Op::Nop
            | Op::LdcI4(_)
            | Op::LdNull
            | Op::LdLoc(_)
            | Op::LdLoca(_)
            | Op::Block(_)
            | Op::BlockContainer => Some(0),
            Op::StLoc(_) | Op::LdFlda(_) | Op::LdObj(_) | Op::Unbox(_) => Some(1),
            Op::StObj(_) => Some(2),
            Op::Call(_) | Op::Return => None,
        }
    }

    /// Returns true if evaluating the operation neither writes state nor depends on state
    /// another instruction could write in between.
    #[must_use]
    pub fn is_trivially_pure(&self) -> bool {
        matches!(
            self,
            Op::Nop | Op::LdcI4(_) | Op::LdNull | Op::LdLoc(_) | Op::LdLoca(_)
        )
    }

    /// Compares tag and operand identities, ignoring children.
    ///
    /// Declarations (variables, fields, types, methods) compare by identity.
    #[must_use]
    pub fn same_operands(&self, other: &Op) -> bool {
        match (self, other) {
            (Op::Nop, Op::Nop)
            | (Op::LdNull, Op::LdNull)
            | (Op::Return, Op::Return)
            | (Op::BlockContainer, Op::BlockContainer) => true,
            (Op::LdcI4(a), Op::LdcI4(b)) => a == b,
            (Op::LdLoc(a), Op::LdLoc(b))
            | (Op::LdLoca(a), Op::LdLoca(b))
            | (Op::StLoc(a), Op::StLoc(b)) => a == b,
            (Op::LdFlda(a), Op::LdFlda(b)) => a == b,
            (Op::LdObj(a), Op::LdObj(b))
            | (Op::StObj(a), Op::StObj(b))
            | (Op::Unbox(a), Op::Unbox(b)) => a == b,
            (Op::Call(a), Op::Call(b)) => a.same_target(b),
            (Op::Block(a), Op::Block(b)) => a == b,
            _ => false,
        }
    }
}

/// A node of the instruction tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) op: Op,
    pub(crate) children: Vec<NodeId>,
    /// Navigational back link, never used for ownership.
    pub(crate) parent: Option<NodeId>,
    /// Set while the node is reachable from the function body.
    pub(crate) connected: bool,
}

impl Node {
    pub(crate) fn new(op: Op, children: Vec<NodeId>) -> Self {
        Node {
            op,
            children,
            parent: None,
            connected: false,
        }
    }

    /// Returns the operation of this node.
    #[must_use]
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Returns the operation tag of this node.
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        self.op.opcode()
    }

    /// Returns the owned children in order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the parent, `None` for roots and detached subtrees.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns true while the node is part of the function tree.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
