//! Match predicates over instruction trees.
//!
//! Each predicate inspects one node and either binds its operands or reports that the node has
//! a different shape. They borrow the function immutably, never take ownership of anything and
//! never produce partial bindings: a mismatch is always `None` or `false`.
//!
//! # Examples
//!
//! ```rust
//! use iltransform::il::{BlockKind, IlFunction, VariableKind};
//! use iltransform::typesystem::{IlType, StackType, Token, TypeFlags};
//!
//! let object = IlType::new(Token::new(0x0100_0001), "System", "Object", TypeFlags::empty(), StackType::O);
//! let mut function = IlFunction::new(Token::new(0x0600_0001), "M");
//! let this = function.add_variable(VariableKind::This, 0, "this", object.clone());
//! let alias = function.add_variable(VariableKind::Local, 0, "alias", object);
//!
//! let load = function.ld_loc(this);
//! let store = function.st_loc(alias, load)?;
//!
//! let (target, value) = function.match_st_loc(store).expect("stloc");
//! assert_eq!(target, alias);
//! assert!(function.match_ld_this(value));
//! assert!(function.match_ld_obj(store).is_none());
//! # Ok::<(), iltransform::Error>(())
//! ```

use crate::{
    il::{IlFunction, NodeId, Op, VarId},
    typesystem::{IlFieldRc, IlMethodRc, IlTypeRc},
};

impl IlFunction {
    /// `stloc var(value)` → `(var, value)`
    #[must_use]
    pub fn match_st_loc(&self, node: NodeId) -> Option<(VarId, NodeId)> {
        let n = self.node(node)?;
        match (&n.op, n.children.as_slice()) {
            (Op::StLoc(var), [value]) => Some((*var, *value)),
            _ => None,
        }
    }

    /// `ldloc var` → `var`
    #[must_use]
    pub fn match_ld_loc(&self, node: NodeId) -> Option<VarId> {
        match self.op(node)? {
            Op::LdLoc(var) => Some(*var),
            _ => None,
        }
    }

    /// `ldloca var` → `var`
    #[must_use]
    pub fn match_ld_loca(&self, node: NodeId) -> Option<VarId> {
        match self.op(node)? {
            Op::LdLoca(var) => Some(*var),
            _ => None,
        }
    }

    /// Returns true for a load of the receiver parameter.
    #[must_use]
    pub fn match_ld_this(&self, node: NodeId) -> bool {
        self.match_ld_loc(node)
            .and_then(|var| self.variable(var))
            .is_some_and(|var| var.is_this())
    }

    /// `ldobj type(address)` → `(address, type)`
    #[must_use]
    pub fn match_ld_obj(&self, node: NodeId) -> Option<(NodeId, &IlTypeRc)> {
        let n = self.node(node)?;
        match (&n.op, n.children.as_slice()) {
            (Op::LdObj(ty), [address]) => Some((*address, ty)),
            _ => None,
        }
    }

    /// `stobj type(address, value)` → `(address, value, type)`
    #[must_use]
    pub fn match_st_obj(&self, node: NodeId) -> Option<(NodeId, NodeId, &IlTypeRc)> {
        let n = self.node(node)?;
        match (&n.op, n.children.as_slice()) {
            (Op::StObj(ty), [address, value]) => Some((*address, *value, ty)),
            _ => None,
        }
    }

    /// `ldflda field(target)` → `(target, field)`
    #[must_use]
    pub fn match_ld_flda(&self, node: NodeId) -> Option<(NodeId, &IlFieldRc)> {
        let n = self.node(node)?;
        match (&n.op, n.children.as_slice()) {
            (Op::LdFlda(field), [target]) => Some((*target, field)),
            _ => None,
        }
    }

    /// `newobj method(args...)` → `(method, args)`
    ///
    /// Plain and virtual calls do not match.
    #[must_use]
    pub fn match_new_obj(&self, node: NodeId) -> Option<(&IlMethodRc, &[NodeId])> {
        let n = self.node(node)?;
        match &n.op {
            Op::Call(call) if call.is_new_obj() => Some((call.method(), n.children.as_slice())),
            _ => None,
        }
    }

    /// Returns true for `nop`.
    #[must_use]
    pub fn match_nop(&self, node: NodeId) -> bool {
        matches!(self.op(node), Some(Op::Nop))
    }

    /// `unbox type(value)` → `(value, type)`
    #[must_use]
    pub fn match_unbox(&self, node: NodeId) -> Option<(NodeId, &IlTypeRc)> {
        let n = self.node(node)?;
        match (&n.op, n.children.as_slice()) {
            (Op::Unbox(ty), [value]) => Some((*value, ty)),
            _ => None,
        }
    }

    /// Deep structural equality of two subtrees.
    ///
    /// True iff both nodes carry the same operation tag with identical operands (declarations
    /// by identity, call sub-tag, tail flag and constrained type included) and their children
    /// match pairwise, in order, with equal counts. The two nodes may be the same node.
    #[must_use]
    pub fn structural_match(&self, a: NodeId, b: NodeId) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            if a == b {
                if self.is_alive(a) {
                    continue;
                }
                return false;
            }
            let (Some(left), Some(right)) = (self.node(a), self.node(b)) else {
                return false;
            };
            if !left.op.same_operands(&right.op) || left.children.len() != right.children.len() {
                return false;
            }
            pending.extend(left.children.iter().copied().zip(right.children.iter().copied()));
        }
        true
    }
}
