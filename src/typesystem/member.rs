//! Method and field declarations.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use bitflags::bitflags;

use crate::typesystem::{IlTypeRc, Token};

/// Reference to an `IlMethod`
pub type IlMethodRc = Arc<IlMethod>;
/// Reference to an `IlField`
pub type IlFieldRc = Arc<IlField>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method attributes relevant to the rewrite stage, values as in ECMA-335 II.23.1.10
    pub struct MethodFlags: u16 {
        /// Method is static
        const STATIC = 0x0010;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RT_SPECIAL_NAME = 0x1000;
    }
}

/// A method declaration.
pub struct IlMethod {
    /// Token
    pub token: Token,
    /// Method name
    pub name: String,
    /// The type that declares this method
    pub declaring_type: IlTypeRc,
    /// The declared return type, `System.Void` for void methods
    pub return_type: IlTypeRc,
    /// Number of declared parameters, excluding `this`
    pub param_count: usize,
    /// Method attributes
    pub flags: MethodFlags,
}

impl IlMethod {
    /// Creates a new method declaration.
    ///
    /// # Arguments
    ///
    /// * `token` - Declaration identity
    /// * `name` - Method name (`.ctor` for instance constructors)
    /// * `declaring_type` - Type declaring the method
    /// * `return_type` - Declared return type
    /// * `param_count` - Number of parameters, excluding `this`
    /// * `flags` - Method attributes
    #[must_use]
    pub fn new(
        token: Token,
        name: impl Into<String>,
        declaring_type: IlTypeRc,
        return_type: IlTypeRc,
        param_count: usize,
        flags: MethodFlags,
    ) -> IlMethodRc {
        Arc::new(IlMethod {
            token,
            name: name.into(),
            declaring_type,
            return_type,
            param_count,
            flags,
        })
    }

    /// Returns true for instance and static constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::RT_SPECIAL_NAME)
            && (self.name == ".ctor" || self.name == ".cctor")
    }

    /// Returns true if the method has no `this` parameter.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }
}

impl PartialEq for IlMethod {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for IlMethod {}

impl Hash for IlMethod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Debug for IlMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IlMethod({} {})", self.token, self)
    }
}

impl fmt::Display for IlMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type.full_name(), self.name)
    }
}

/// A field declaration.
pub struct IlField {
    /// Token
    pub token: Token,
    /// Field name
    pub name: String,
    /// The type that declares this field
    pub declaring_type: IlTypeRc,
    /// The declared type of the field
    pub field_type: IlTypeRc,
}

impl IlField {
    /// Creates a new field declaration.
    #[must_use]
    pub fn new(
        token: Token,
        name: impl Into<String>,
        declaring_type: IlTypeRc,
        field_type: IlTypeRc,
    ) -> IlFieldRc {
        Arc::new(IlField {
            token,
            name: name.into(),
            declaring_type,
            field_type,
        })
    }
}

impl PartialEq for IlField {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for IlField {}

impl Hash for IlField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Debug for IlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IlField({} {})", self.token, self)
    }
}

impl fmt::Display for IlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type.full_name(), self.name)
    }
}
