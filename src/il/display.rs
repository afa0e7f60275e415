//! Compact one-line rendering of instruction trees for log and event messages.
//!
//! ```text
//! stloc <>8__1(newobj Demo.<>c__CompilerGenerated0::.ctor(ldloc this))
//! stobj System.Int32(ldflda x(ldloc this), ldobj System.Int32(ldflda x(ldloc this)))
//! ```
//!
//! Blocks and containers only print their size; the rendering is a diagnostic aid, not a
//! disassembly format.

use std::fmt;

use crate::il::{IlFunction, NodeId, Op, VarId};

/// Display adapter returned by [`IlFunction::display`].
pub struct NodeDisplay<'a> {
    function: &'a IlFunction,
    node: NodeId,
}

impl IlFunction {
    /// Renders a subtree on one line.
    #[must_use]
    pub fn display(&self, node: NodeId) -> NodeDisplay<'_> {
        NodeDisplay {
            function: self,
            node,
        }
    }

    fn variable_name(&self, var: VarId) -> String {
        self.variable(var)
            .map_or_else(|| var.to_string(), |v| v.name().to_string())
    }
}

impl NodeDisplay<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, node: NodeId) -> fmt::Result {
        let Some(n) = self.function.node(node) else {
            return write!(f, "<destroyed {node}>");
        };

        match &n.op {
            Op::Block(kind) => return write!(f, "block {kind:?} [{} inst]", n.children.len()),
            Op::BlockContainer => return write!(f, "container [{} blocks]", n.children.len()),
            Op::Nop | Op::LdNull | Op::Return => write!(f, "{}", n.op.opcode())?,
            Op::LdcI4(value) => write!(f, "ldc.i4 {value}")?,
            Op::LdLoc(var) | Op::LdLoca(var) | Op::StLoc(var) => {
                write!(f, "{} {}", n.op.opcode(), self.function.variable_name(*var))?;
            }
            Op::LdFlda(field) => write!(f, "ldflda {}", field.name)?,
            Op::LdObj(ty) | Op::StObj(ty) | Op::Unbox(ty) => {
                write!(f, "{} {}", n.op.opcode(), ty.full_name())?;
            }
            Op::Call(call) => {
                if call.is_tail {
                    write!(f, "tail.")?;
                }
                if let Some(constrained) = &call.constrained_to {
                    write!(f, "constrained[{}].", constrained.full_name())?;
                }
                write!(f, "{} {}", call.kind(), call.method())?;
            }
        }

        if n.children.is_empty() && !matches!(n.op, Op::Call(_)) {
            return Ok(());
        }

        write!(f, "(")?;
        for (i, child) in n.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.write_node(f, *child)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.node)
    }
}
