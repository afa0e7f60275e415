//! The construct-call instruction family.
//!
//! One operand type covers `call`, `callvirt` and `newobj`. The concrete sub-tag is chosen by
//! [`CallInstruction::create`] from an external opcode; the arguments are the owning node's
//! children, starting at index 0.

use crate::{
    il::OpCode,
    typesystem::{IlMethodRc, IlTypeRc, StackType},
    Error, Result,
};

/// Operands of a call, virtual call or object construction.
#[derive(Debug, Clone)]
pub struct CallInstruction {
    kind: OpCode,
    method: IlMethodRc,
    /// Whether the call has the `tail.` prefix.
    pub is_tail: bool,
    /// Type named by the `constrained.` prefix, `None` without the prefix.
    pub constrained_to: Option<IlTypeRc>,
    /// Whether the IL stack was empty at the point of this call, not counting the call's own
    /// arguments and result. Informational only, never part of matching.
    pub il_stack_was_empty: bool,
}

impl CallInstruction {
    /// Creates the call operands for the given opcode and target.
    ///
    /// # Arguments
    ///
    /// * `opcode` - One of [`OpCode::Call`], [`OpCode::CallVirt`], [`OpCode::NewObj`]
    /// * `method` - The call target
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for any other opcode.
    pub fn create(opcode: OpCode, method: IlMethodRc) -> Result<Self> {
        if !opcode.is_call() {
            return Err(Error::InvalidArgument(format!(
                "{opcode} is not a valid call opcode"
            )));
        }

        Ok(CallInstruction {
            kind: opcode,
            method,
            is_tail: false,
            constrained_to: None,
            il_stack_was_empty: false,
        })
    }

    /// Returns the sub-tag (`call`, `callvirt` or `newobj`).
    #[must_use]
    pub fn kind(&self) -> OpCode {
        self.kind
    }

    /// Returns the call target.
    #[must_use]
    pub fn method(&self) -> &IlMethodRc {
        &self.method
    }

    /// Returns true for object construction.
    #[must_use]
    pub fn is_new_obj(&self) -> bool {
        self.kind == OpCode::NewObj
    }

    /// Sets the `tail.` prefix.
    #[must_use]
    pub fn with_tail(mut self, is_tail: bool) -> Self {
        self.is_tail = is_tail;
        self
    }

    /// Sets the `constrained.` prefix type.
    #[must_use]
    pub fn with_constrained(mut self, constrained_to: Option<IlTypeRc>) -> Self {
        self.constrained_to = constrained_to;
        self
    }

    /// The type of the value the call produces.
    ///
    /// For `newobj` this is the constructed (declaring) type, otherwise the callee's declared
    /// return type.
    #[must_use]
    pub fn result_type(&self) -> &IlTypeRc {
        if self.kind == OpCode::NewObj {
            &self.method.declaring_type
        } else {
            &self.method.return_type
        }
    }

    /// Stack classification of [`Self::result_type`].
    #[must_use]
    pub fn stack_type(&self) -> StackType {
        self.result_type().stack_type
    }

    /// Compares everything except the arguments: sub-tag, target, tail flag and constrained
    /// type (both absent, or both present and equal).
    #[must_use]
    pub fn same_target(&self, other: &CallInstruction) -> bool {
        self.kind == other.kind
            && self.method == other.method
            && self.is_tail == other.is_tail
            && self.constrained_to == other.constrained_to
    }
}
