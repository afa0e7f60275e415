//! Type-system capability consumed by the rewrite passes.
//!
//! The transforms never resolve, load or lay out types. They only need to know whether two
//! references denote the same declaration, what a type is called, and which evaluation-stack
//! type a value of that type occupies. This module provides exactly that, modelled on the
//! shape of the metadata the upstream loader produces.
//!
//! # Key Components
//!
//! - [`Token`]: Metadata token used as declaration identity
//! - [`IlType`]: A type declaration (`IlTypeRc` is the shared handle)
//! - [`IlMethod`]: A method declaration, with constructor detection
//! - [`IlField`]: A field declaration
//! - [`StackType`]: The CLI evaluation-stack classification of a type
//!
//! # Identity
//!
//! All declarations compare and hash by token. Two `Arc`s that wrap different allocations
//! of the same token are equal; two declarations with different tokens are never equal even
//! if every name matches.
//!
//! # Examples
//!
//! ```rust
//! use iltransform::typesystem::{IlType, StackType, Token, TypeFlags};
//!
//! let display_class = IlType::new(
//!     Token::new(0x0200_0010),
//!     "Demo",
//!     "<>c__CompilerGenerated0",
//!     TypeFlags::SEALED | TypeFlags::COMPILER_GENERATED,
//!     StackType::O,
//! );
//! assert_eq!(display_class.full_name(), "Demo.<>c__CompilerGenerated0");
//! ```

mod member;
mod token;

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use bitflags::bitflags;
use strum::{Display, EnumCount, EnumIter};

pub use member::{IlField, IlFieldRc, IlMethod, IlMethodRc, MethodFlags};
pub use token::Token;

/// Reference to an `IlType`
pub type IlTypeRc = Arc<IlType>;

/// Evaluation-stack classification of a value, following ECMA-335 I.12.3.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum StackType {
    /// 32-bit integer
    #[strum(serialize = "i4")]
    I4,
    /// 64-bit integer
    #[strum(serialize = "i8")]
    I8,
    /// Native integer
    #[strum(serialize = "i")]
    I,
    /// Floating point
    #[strum(serialize = "f")]
    F,
    /// Object reference
    #[strum(serialize = "o")]
    O,
    /// Managed pointer
    #[strum(serialize = "ref")]
    Ref,
    /// No value
    #[strum(serialize = "void")]
    Void,
    /// Not yet known
    #[strum(serialize = "unknown")]
    Unknown,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Attributes of a type declaration relevant to the rewrite stage
    pub struct TypeFlags: u32 {
        /// The type is a value type (struct or enum)
        const VALUE_TYPE = 0x0001;
        /// The type is an interface
        const INTERFACE = 0x0002;
        /// The type is sealed
        const SEALED = 0x0004;
        /// The type carries `CompilerGeneratedAttribute`
        const COMPILER_GENERATED = 0x0008;
    }
}

/// A type declaration.
///
/// Only the information the transforms use is kept: identity, names, a handful of flags and
/// the stack classification. Equality and hashing use the token alone.
pub struct IlType {
    /// Token
    pub token: Token,
    /// `TypeNamespace` (can be empty)
    pub namespace: String,
    /// `TypeName`
    pub name: String,
    /// Type attributes
    pub flags: TypeFlags,
    /// Stack classification of a value of this type
    pub stack_type: StackType,
}

impl IlType {
    /// Creates a new type declaration.
    ///
    /// # Arguments
    ///
    /// * `token` - Declaration identity
    /// * `namespace` - Namespace, empty for the global namespace
    /// * `name` - Simple type name
    /// * `flags` - Type attributes
    /// * `stack_type` - Stack classification of values of this type
    #[must_use]
    pub fn new(
        token: Token,
        namespace: impl Into<String>,
        name: impl Into<String>,
        flags: TypeFlags,
        stack_type: StackType,
    ) -> IlTypeRc {
        Arc::new(IlType {
            token,
            namespace: namespace.into(),
            name: name.into(),
            flags,
            stack_type,
        })
    }

    /// The artificial `System.Void` type used as the return type of void methods.
    #[must_use]
    pub fn void() -> IlTypeRc {
        Self::new(
            Token::from_parts(Token::TABLE_TYPEREF, 0x00FF_FFFF),
            "System",
            "Void",
            TypeFlags::VALUE_TYPE,
            StackType::Void,
        )
    }

    /// Returns `Namespace.Name`, or just `Name` when the namespace is empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Returns true for structs and enums.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.flags.contains(TypeFlags::VALUE_TYPE)
    }

    /// Returns true for `System.Void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.stack_type == StackType::Void
    }
}

impl PartialEq for IlType {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for IlType {}

impl Hash for IlType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Debug for IlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IlType({} {})", self.token, self.full_name())
    }
}

impl fmt::Display for IlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
