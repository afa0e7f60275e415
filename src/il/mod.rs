//! Tree-shaped intermediate representation of a decompiled method.
//!
//! This module provides the instruction tree the rewrite passes in [`crate::transforms`]
//! operate on: a closed set of operations, typed operands, an arena owning every node, and
//! variables that track each load, store and address-of referencing them.
//!
//! # Architecture
//!
//! - [`IlFunction`] - Arena, variable table and all mutation primitives
//! - [`Node`] / [`Op`] - A tree node and its operation with typed operands
//! - [`OpCode`] - Closed set of operation tags
//! - [`IlVariable`] - Variable declaration with use-lists
//! - [`CallInstruction`] - Operands of the call / virtual call / construct family
//!
//! Ownership runs strictly downward through [`Node::children`]. Parent links and use-lists are
//! non-owning [`NodeId`] handles, so the graph has no reference cycles; the arena never reuses a
//! slot, which makes handles of destroyed nodes fail lookups instead of aliasing new nodes.
//!
//! # Key Components
//!
//! - Builders (`ld_loc`, `st_loc`, `call`, ...) create detached subtrees
//! - [`IlFunction::replace`], [`IlFunction::take`], [`IlFunction::clone_node`] and the block
//!   operations move subtrees in and out of the tree, updating use-lists in the same call
//! - The `match_*` predicates and [`IlFunction::structural_match`] inspect without mutating
//! - [`IlFunction::verify`] rechecks every invariant from scratch
//!
//! # Thread Safety
//!
//! All types are `Send + Sync`. A function is mutated through `&mut`, so exactly one pass owns it
//! at a time.

mod call;
mod display;
mod function;
mod instruction;
mod opcode;
mod patterns;
mod variable;

pub use call::CallInstruction;
pub use display::NodeDisplay;
pub use function::{Descendants, IlFunction};
pub use instruction::{BlockKind, Node, NodeId, Op};
pub use opcode::OpCode;
pub use variable::{IlVariable, VarId, VariableKind};
