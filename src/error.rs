use thiserror::Error;

use crate::il::{NodeId, VarId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Two classes of failure exist. Invalid construction requests (an unsupported call opcode
/// handed to [`crate::il::CallInstruction::create`]) fail immediately. Everything else is a
/// violation of the tree model's ownership rules, e.g. a stale [`NodeId`] or an attempt to give
/// a node a second parent. Pattern mismatches are never errors; the match predicates report
/// them through `Option`/`bool`.
///
/// # Examples
///
/// ```rust
/// use iltransform::{il::{CallInstruction, OpCode}, Error};
/// # use iltransform::typesystem::{IlMethod, IlType, MethodFlags, StackType, Token, TypeFlags};
/// # let object = IlType::new(Token::new(0x0100_0001), "System", "Object", TypeFlags::empty(), StackType::O);
/// # let ctor = IlMethod::new(Token::new(0x0A00_0001), ".ctor", object.clone(), IlType::void(),
/// #     0, MethodFlags::SPECIAL_NAME | MethodFlags::RT_SPECIAL_NAME);
///
/// match CallInstruction::create(OpCode::StLoc, ctor) {
///     Err(Error::InvalidArgument(message)) => println!("rejected: {message}"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An argument was outside the set of values an operation accepts.
    ///
    /// Raised by the construct-call factory when the requested opcode is not one of
    /// `call`, `callvirt` or `newobj`. This is never recovered internally.
    #[error("Invalid argument - {0}")]
    InvalidArgument(String),

    /// The instruction tree violates one of its structural invariants.
    ///
    /// Produced by [`crate::il::IlFunction::verify`]. The error includes the source
    /// location where the violation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the broken invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The handle refers to a node that no longer exists.
    ///
    /// Nodes are destroyed the moment they leave the tree; their handles are never reused,
    /// so a stale handle reliably ends up here.
    #[error("Node {0} does not exist")]
    NodeNotFound(NodeId),

    /// The operation requires the node to have a parent, but it has none.
    #[error("Node {0} is not attached to a parent")]
    NodeDetached(NodeId),

    /// The node already has a parent and can not be given a second one.
    ///
    /// Use [`crate::il::IlFunction::clone_node`] when the same value is needed at two
    /// positions, or [`crate::il::IlFunction::take`] to move it.
    #[error("Node {0} is already owned by another node")]
    NodeOwned(NodeId),

    /// An instruction index was out of range for a block.
    #[error("Index {index} is out of range for a block of {len} instructions")]
    InvalidIndex {
        /// The requested index
        index: usize,
        /// The number of instructions in the block
        len: usize,
    },

    /// A node of the wrong kind was passed to an operation.
    #[error("Node {node} is not a {expected}")]
    UnexpectedNode {
        /// The offending node
        node: NodeId,
        /// What the operation expected
        expected: &'static str,
    },

    /// The variable handle is not part of the function.
    #[error("Variable {0} does not exist")]
    VariableNotFound(VarId),
}
