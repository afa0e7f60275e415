//! # iltransform Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the iltransform library. Import it to build instruction trees and run the passes
//! without spelling out every module path.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all iltransform operations
pub use crate::Error;

/// The result type used throughout iltransform
pub use crate::Result;

// ================================================================================================
// Type System
// ================================================================================================

/// Declarations and identities the passes compare
pub use crate::typesystem::{
    IlField, IlFieldRc, IlMethod, IlMethodRc, IlType, IlTypeRc, MethodFlags, StackType, Token,
    TypeFlags,
};

// ================================================================================================
// Instruction Tree
// ================================================================================================

/// The function root, its nodes and variables
pub use crate::il::{
    BlockKind, CallInstruction, IlFunction, IlVariable, Node, NodeId, Op, OpCode, VarId,
    VariableKind,
};

// ================================================================================================
// Rewrite Passes
// ================================================================================================

/// Pass interface and drivers
pub use crate::transforms::{apply, run_parallel, IlTransform};

/// The passes
pub use crate::transforms::{
    FixCompilerGeneratedThis, FixSelfReference, RemoveCompilerGeneratedThis,
};

/// Shared context, settings and inlining
pub use crate::transforms::{
    InliningEngine, InliningOptions, SingleUseInliner, TransformContext, TransformSettings,
};

/// Event log
pub use crate::transforms::{Event, EventKind, EventLog};
