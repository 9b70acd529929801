//! Abstract Syntax Tree for FasterBASIC (spec §3.2).
//!
//! The parser uniquely owns the tree; every downstream phase (semantic
//! analyzer, CFG builder, codegen) observes it through immutable
//! traversal only - no phase mutates a node in place. Every node carries
//! its source location.

use fbasic_core::SourceLocation;

pub type Program = Vec<Statement>;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub base: String,
    /// `AS arr(...) AS T` element type with dimensionality context is
    /// captured separately on `DimStatement`; this just names the type.
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        target: LValue,
        value: Expr,
        location: SourceLocation,
    },
    Dim {
        name: String,
        /// Array dimension expressions; empty for a scalar `DIM`.
        dims: Vec<Expr>,
        as_type: Option<TypeName>,
        location: SourceLocation,
    },
    Print {
        /// Each item paired with the separator that followed it in source
        /// (`;` suppresses the column advance `,` performs); `None` on the
        /// trailing item.
        items: Vec<(Expr, Option<PrintSeparator>)>,
        location: SourceLocation,
    },
    Input {
        prompt: Option<String>,
        targets: Vec<LValue>,
        location: SourceLocation,
    },
    If {
        branches: Vec<(Expr, Vec<Statement>)>,
        else_branch: Option<Vec<Statement>>,
        /// `true` for `IF ... THEN <stmt>` parsed on one line; CFG lowering
        /// does not otherwise distinguish single-line from multi-line.
        single_line: bool,
        location: SourceLocation,
    },
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Vec<Statement>,
        /// `NEXT var` name, when given, must match `var` (spec §4.3).
        next_var: Option<String>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Vec<Statement>,
        location: SourceLocation,
    },
    DoLoop {
        /// Head condition (`DO WHILE`/`DO UNTIL`), if any.
        head: Option<(LoopTest, Expr)>,
        body: Vec<Statement>,
        /// Tail condition (`LOOP WHILE`/`LOOP UNTIL`), if any.
        tail: Option<(LoopTest, Expr)>,
        location: SourceLocation,
    },
    Repeat {
        body: Vec<Statement>,
        until: Expr,
        location: SourceLocation,
    },
    SelectCase {
        selector: Expr,
        arms: Vec<CaseArm>,
        case_else: Option<Vec<Statement>>,
        location: SourceLocation,
    },
    Goto {
        label: String,
        location: SourceLocation,
    },
    Gosub {
        label: String,
        location: SourceLocation,
    },
    ReturnFromGosub {
        location: SourceLocation,
    },
    OnGoto {
        selector: Expr,
        labels: Vec<String>,
        is_gosub: bool,
        location: SourceLocation,
    },
    Exit {
        kind: ExitKind,
        location: SourceLocation,
    },
    TypeDef {
        name: String,
        fields: Vec<(String, TypeName)>,
        location: SourceLocation,
    },
    SubDef {
        name: String,
        params: Vec<Param>,
        body: Vec<Statement>,
        location: SourceLocation,
    },
    FunctionDef {
        name: String,
        params: Vec<Param>,
        return_type: Option<TypeName>,
        body: Vec<Statement>,
        location: SourceLocation,
    },
    DefFn {
        name: String,
        params: Vec<Param>,
        body: Expr,
        location: SourceLocation,
    },
    Local {
        name: String,
        as_type: TypeName,
        location: SourceLocation,
    },
    Try {
        body: Vec<Statement>,
        catch_var: Option<String>,
        catch_body: Vec<Statement>,
        finally_body: Option<Vec<Statement>>,
        location: SourceLocation,
    },
    Throw {
        value: Expr,
        location: SourceLocation,
    },
    End {
        location: SourceLocation,
    },
    Data {
        values: Vec<Expr>,
        location: SourceLocation,
    },
    Read {
        targets: Vec<LValue>,
        location: SourceLocation,
    },
    Restore {
        label_or_index: Option<String>,
        location: SourceLocation,
    },
    OptionStmt {
        option: OptionKind,
        location: SourceLocation,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    /// A bare label definition (`loopTop:`), a valid `GOTO`/`GOSUB` target.
    Label {
        name: String,
        location: SourceLocation,
    },
    /// A lone expression statement (rare in BASIC, but e.g. a bare sub call
    /// without `CALL`).
    ExprStatement {
        expr: Expr,
        location: SourceLocation,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintSeparator {
    Semicolon,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTest {
    While,
    Until,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    For,
    While,
    Do,
    Sub,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub as_type: TypeName,
    pub by_ref: bool,
}

/// One `SELECT CASE` arm: a set of `CASE` value tests and its body.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub tests: Vec<CaseTest>,
    pub body: Vec<Statement>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseTest {
    /// `CASE v1, v2, ...`
    Value(Expr),
    /// `CASE a TO b`
    Range(Expr, Expr),
    /// `CASE IS <op> v`
    Is(CompareOp, Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    BaseZero,
    BaseOne,
    Ascii,
    Unicode,
    DetectString,
}

/// Assignable places: a scalar variable, an array element, or a (possibly
/// chained) member access (spec §4.3: "the type of `P.Name` is the type of
/// the Name field, not the container's").
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Variable {
        name: String,
        location: SourceLocation,
    },
    ArrayElement {
        name: String,
        indices: Vec<Expr>,
        location: SourceLocation,
    },
    Member {
        base: Box<LValue>,
        field: String,
        location: SourceLocation,
    },
}

impl LValue {
    pub fn location(&self) -> &SourceLocation {
        match self {
            LValue::Variable { location, .. }
            | LValue::ArrayElement { location, .. }
            | LValue::Member { location, .. } => location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    And,
    Or,
    Concat,
    Compare(CompareOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral {
        value: i64,
        location: SourceLocation,
    },
    FloatLiteral {
        value: f64,
        location: SourceLocation,
    },
    StringLiteral {
        value: String,
        has_non_ascii: bool,
        location: SourceLocation,
    },
    Variable {
        name: String,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    /// A call to a user SUB/FUNCTION, an intrinsic, or a registry builtin;
    /// resolved during semantic analysis.
    Call {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    /// `FN name(args)` - a first-class call to a `DEF FN` function
    /// (spec §4.2).
    FnCall {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    ArrayAccess {
        name: String,
        indices: Vec<Expr>,
        location: SourceLocation,
    },
    Member {
        base: Box<Expr>,
        field: String,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Expr::IntLiteral { location, .. }
            | Expr::FloatLiteral { location, .. }
            | Expr::StringLiteral { location, .. }
            | Expr::Variable { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Call { location, .. }
            | Expr::FnCall { location, .. }
            | Expr::ArrayAccess { location, .. }
            | Expr::Member { location, .. } => location,
        }
    }
}
