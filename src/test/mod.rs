//! Shared fixtures for unit tests: a small type universe and a function builder.

use crate::{
    il::{BlockKind, CallInstruction, IlFunction, NodeId, OpCode, VarId, VariableKind},
    typesystem::{
        IlField, IlFieldRc, IlMethod, IlMethodRc, IlType, IlTypeRc, MethodFlags, StackType, Token,
        TypeFlags,
    },
    Result,
};

/// Name of a receiver alias local as the compiler emits it
pub const ALIAS_NAME: &str = "<>c__CompilerGenerated_this";

// Helper function to create System.Int32
pub fn int32_type() -> IlTypeRc {
    IlType::new(
        Token::new(0x0100_0008),
        "System",
        "Int32",
        TypeFlags::VALUE_TYPE,
        StackType::I4,
    )
}

// Helper function to create the class most tests operate on
pub fn widget_type() -> IlTypeRc {
    IlType::new(
        Token::new(0x0200_0001),
        "Demo",
        "Widget",
        TypeFlags::empty(),
        StackType::O,
    )
}

// Helper function to create a capture container type nested in Widget
pub fn capture_type() -> IlTypeRc {
    IlType::new(
        Token::new(0x0200_0002),
        "Demo",
        "<>c__CompilerGenerated0",
        TypeFlags::SEALED | TypeFlags::COMPILER_GENERATED,
        StackType::O,
    )
}

pub fn widget_ctor() -> IlMethodRc {
    IlMethod::new(
        Token::new(0x0600_0001),
        ".ctor",
        widget_type(),
        IlType::void(),
        0,
        MethodFlags::SPECIAL_NAME | MethodFlags::RT_SPECIAL_NAME,
    )
}

pub fn widget_getter() -> IlMethodRc {
    IlMethod::new(
        Token::new(0x0600_0002),
        "get_Size",
        widget_type(),
        int32_type(),
        0,
        MethodFlags::VIRTUAL,
    )
}

// Helper function to create the capture container's constructor, taking the receiver
pub fn capture_ctor() -> IlMethodRc {
    IlMethod::new(
        Token::new(0x0600_0003),
        ".ctor",
        capture_type(),
        IlType::void(),
        1,
        MethodFlags::SPECIAL_NAME | MethodFlags::RT_SPECIAL_NAME,
    )
}

pub fn widget_field() -> IlFieldRc {
    IlField::new(Token::new(0x0400_0001), "size", widget_type(), int32_type())
}

pub fn other_field() -> IlFieldRc {
    IlField::new(Token::new(0x0400_0002), "count", widget_type(), int32_type())
}

// Helper function to create the field holding the captured receiver
pub fn capture_this_field() -> IlFieldRc {
    IlField::new(
        Token::new(0x0400_0003),
        "<>4__this",
        capture_type(),
        widget_type(),
    )
}

// Helper function to create a captured value field
pub fn capture_field() -> IlFieldRc {
    IlField::new(Token::new(0x0400_0004), "value", capture_type(), int32_type())
}

pub fn new_obj(method: IlMethodRc) -> Result<CallInstruction> {
    CallInstruction::create(OpCode::NewObj, method)
}

/// Builds a function with a single control-flow entry block and appends instructions to it.
pub struct FunctionBuilder {
    pub function: IlFunction,
    pub entry: NodeId,
    this: Option<VarId>,
    locals: u16,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        let mut function = IlFunction::new(Token::new(0x0600_0100), name);
        let entry = function
            .add_block(function.body(), BlockKind::ControlFlow)
            .expect("root container accepts blocks");

        FunctionBuilder {
            function,
            entry,
            this: None,
            locals: 0,
        }
    }

    /// Returns the receiver, declaring it on first use.
    pub fn this(&mut self) -> VarId {
        if let Some(this) = self.this {
            return this;
        }
        let this = self
            .function
            .add_variable(VariableKind::This, 0, "this", widget_type());
        self.this = Some(this);
        this
    }

    pub fn local(&mut self, name: &str, ty: IlTypeRc) -> VarId {
        let index = self.locals;
        self.locals += 1;
        self.function
            .add_variable(VariableKind::Local, index, name, ty)
    }

    pub fn push(&mut self, inst: NodeId) -> Result<()> {
        self.function.push_instruction(self.entry, inst)
    }

    pub fn nop(&mut self) -> Result<NodeId> {
        let nop = self.function.nop();
        self.push(nop)?;
        Ok(nop)
    }

    /// `stloc x(ldloc y)`
    pub fn store_load(&mut self, x: VarId, y: VarId) -> Result<NodeId> {
        let load = self.function.ld_loc(y);
        let store = self.function.st_loc(x, load)?;
        self.push(store)?;
        Ok(store)
    }

    pub fn getter_call(&self) -> Result<CallInstruction> {
        CallInstruction::create(OpCode::Call, widget_getter())
    }

    /// `call get_Size(args...)`
    pub fn push_call(&mut self, args: Vec<NodeId>) -> Result<NodeId> {
        let call = self.getter_call()?;
        let call = self.function.call(call, args)?;
        self.push(call)?;
        Ok(call)
    }

    /// `call get_Size(ldloc var)`
    pub fn push_getter_call(&mut self, var: VarId) -> Result<NodeId> {
        let load = self.function.ld_loc(var);
        self.push_call(vec![load])
    }

    /// `ret(ldloc var)`
    pub fn push_return_load(&mut self, var: VarId) -> Result<NodeId> {
        let load = self.function.ld_loc(var);
        let ret = self.function.ret(Some(load))?;
        self.push(ret)?;
        Ok(ret)
    }
}
