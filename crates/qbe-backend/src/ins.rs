//! The backend's instruction record (spec §5.2): every instruction, no
//! matter its arity in source form, is normalized to three operand slots
//! (`dest`, `lhs`, `rhs`) plus an opcode - a two-operand `neg` leaves
//! `rhs` as `Operand::None`, and a zero-operand `ret` leaves both empty.
//! Keeping the shape uniform is what makes the MADD/FMADD peephole in
//! [`crate::isel::arm64`] a single pattern match instead of one match arm
//! per source instruction shape.

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Temp(String),
    Const(i64),
    FConst(f64),
    Global(String),
    Block(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegClass {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlType {
    W,
    L,
    S,
    D,
}

impl IlType {
    pub fn reg_class(self) -> RegClass {
        match self {
            IlType::W | IlType::L => RegClass::Int,
            IlType::S | IlType::D => RegClass::Float,
        }
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        Some(match letter {
            "w" => IlType::W,
            "l" => IlType::L,
            "s" => IlType::S,
            "d" => IlType::D,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Neg,
    Copy,
    Load,
    Store,
    Cmp(CmpKind),
    Jmp,
    Jnz,
    Call,
    Ret,
    Madd,
    Msub,
    Fmadd,
    Fmsub,
    /// Anything this backend doesn't special-case (conversions,
    /// comparisons by mnemonic, `hlt`, ...) - `mnemonic` is the original
    /// QBE opcode text, preserved so [`crate::emit`] can still lower it
    /// even though no pass rewrites it.
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One normalized instruction. `extra` carries operands a 3-slot shape
/// can't hold (call argument lists, multi-target jumps); nothing in the
/// isel peephole needs to look at it.
#[derive(Debug, Clone)]
pub struct Ins {
    pub op: Opcode,
    pub ty: IlType,
    pub dest: Operand,
    pub lhs: Operand,
    pub rhs: Operand,
    pub extra: Vec<Operand>,
    pub callee: Option<String>,
}

impl Ins {
    pub fn new(op: Opcode, ty: IlType) -> Self {
        Ins {
            op,
            ty,
            dest: Operand::None,
            lhs: Operand::None,
            rhs: Operand::None,
            extra: Vec::new(),
            callee: None,
        }
    }

    pub fn with_dest(mut self, dest: Operand) -> Self {
        self.dest = dest;
        self
    }

    pub fn with_operands(mut self, lhs: Operand, rhs: Operand) -> Self {
        self.lhs = lhs;
        self.rhs = rhs;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub label: String,
    pub ins: Vec<Ins>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<(IlType, String)>,
    pub ret_ty: Option<IlType>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
pub struct DataDef {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub data: Vec<DataDef>,
}
