//! The closed set of operation kinds an IL tree node can carry.

use strum::{Display, EnumCount, EnumIter};

/// Operation tag of an IL tree node.
///
/// Every [`crate::il::Op`] variant maps to exactly one tag, except the call family where one
/// variant carries three tags (`call`, `callvirt`, `newobj`) distinguished by the
/// [`crate::il::CallInstruction::kind`] sub-tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum OpCode {
    /// No operation
    #[strum(serialize = "nop")]
    Nop,
    /// Load a 32-bit integer constant
    #[strum(serialize = "ldc.i4")]
    LdcI4,
    /// Load the null reference
    #[strum(serialize = "ldnull")]
    LdNull,
    /// Load the value of a variable
    #[strum(serialize = "ldloc")]
    LdLoc,
    /// Load the address of a variable
    #[strum(serialize = "ldloca")]
    LdLoca,
    /// Store a value into a variable
    #[strum(serialize = "stloc")]
    StLoc,
    /// Compute the address of a field
    #[strum(serialize = "ldflda")]
    LdFlda,
    /// Load a value through an address
    #[strum(serialize = "ldobj")]
    LdObj,
    /// Store a value through an address
    #[strum(serialize = "stobj")]
    StObj,
    /// Obtain the address of the value inside a boxed object
    #[strum(serialize = "unbox")]
    Unbox,
    /// Non-virtual call
    #[strum(serialize = "call")]
    Call,
    /// Virtual call
    #[strum(serialize = "callvirt")]
    CallVirt,
    /// Allocate an object and run its constructor
    #[strum(serialize = "newobj")]
    NewObj,
    /// Return from the function
    #[strum(serialize = "ret")]
    Return,
    /// Ordered sequence of instructions
    #[strum(serialize = "block")]
    Block,
    /// Control region owning a set of blocks
    #[strum(serialize = "container")]
    BlockContainer,
}

impl OpCode {
    /// Returns true for the three tags of the construct-call family.
    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(self, OpCode::Call | OpCode::CallVirt | OpCode::NewObj)
    }

    /// Returns true for tags that reference a variable operand.
    #[must_use]
    pub const fn is_variable_access(self) -> bool {
        matches!(self, OpCode::LdLoc | OpCode::LdLoca | OpCode::StLoc)
    }
}
