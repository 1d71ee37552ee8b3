use std::fmt;
use std::ops::{Deref, Index};

use pyscope_index::{newtype_index, IndexVec};

newtype_index! {
    /// Identity of a statement within one [`Ast`].
    pub struct StmtId;
}

newtype_index! {
    /// Identity of an expression within one [`Ast`].
    pub struct ExprId;
}

/// Key identifying any node (statement or expression) of an [`Ast`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Stmt(StmtId),
    Expr(ExprId),
}

impl From<StmtId> for NodeKey {
    fn from(id: StmtId) -> Self {
        NodeKey::Stmt(id)
    }
}

impl From<ExprId> for NodeKey {
    fn from(id: ExprId) -> Self {
        NodeKey::Expr(id)
    }
}

/// A module's syntax tree: the statement/expression arenas plus the
/// module-level statement list.
#[derive(Debug, Default, Clone)]
pub struct Ast {
    /// The module body, in source order.
    pub body: Vec<StmtId>,
    stmts: IndexVec<StmtId, Stmt>,
    exprs: IndexVec<ExprId, Expr>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stmt(&mut self, stmt: impl Into<Stmt>) -> StmtId {
        self.stmts.push(stmt.into())
    }

    pub fn push_expr(&mut self, expr: impl Into<Expr>) -> ExprId {
        self.exprs.push(expr.into())
    }
}

impl Index<StmtId> for Ast {
    type Output = Stmt;

    fn index(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }
}

impl Index<ExprId> for Ast {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }
}

/// An identifier such as a variable, attribute, or parameter name.
///
/// Identifiers are not expressions; a name used as an expression is an
/// [`ExprName`] with an [`ExprContext`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub id: String,
}

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl Deref for Identifier {
    type Target = str;

    fn deref(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// The context in which a name-like expression occurs. This is the
/// classification signal consumed by scope analysis: `Store` marks a binding
/// occurrence, `Load` and `Del` mark reference occurrences.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExprContext {
    #[default]
    Load,
    Store,
    Del,
}

impl ExprContext {
    pub const fn is_load(self) -> bool {
        matches!(self, ExprContext::Load)
    }

    pub const fn is_store(self) -> bool {
        matches!(self, ExprContext::Store)
    }

    pub const fn is_del(self) -> bool {
        matches!(self, ExprContext::Del)
    }
}

#[derive(Clone, Debug, PartialEq, is_macro::Is)]
pub enum Stmt {
    FunctionDef(StmtFunctionDef),
    ClassDef(StmtClassDef),
    Assign(StmtAssign),
    AnnAssign(StmtAnnAssign),
    AugAssign(StmtAugAssign),
    #[is(name = "for_stmt")]
    For(StmtFor),
    #[is(name = "while_stmt")]
    While(StmtWhile),
    #[is(name = "if_stmt")]
    If(StmtIf),
    With(StmtWith),
    #[is(name = "try_stmt")]
    Try(StmtTry),
    Raise(StmtRaise),
    Import(StmtImport),
    ImportFrom(StmtImportFrom),
    Global(StmtGlobal),
    Nonlocal(StmtNonlocal),
    #[is(name = "return_stmt")]
    Return(StmtReturn),
    Delete(StmtDelete),
    TypeAlias(StmtTypeAlias),
    Expr(StmtExpr),
    Pass,
    Break,
    Continue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtFunctionDef {
    pub is_async: bool,
    pub name: Identifier,
    pub type_params: Option<TypeParams>,
    pub parameters: Parameters,
    pub returns: Option<ExprId>,
    pub body: Vec<StmtId>,
    pub decorator_list: Vec<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtClassDef {
    pub name: Identifier,
    pub type_params: Option<TypeParams>,
    pub bases: Vec<ExprId>,
    pub keywords: Vec<Keyword>,
    pub body: Vec<StmtId>,
    pub decorator_list: Vec<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtAssign {
    pub targets: Vec<ExprId>,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtAnnAssign {
    pub target: ExprId,
    pub annotation: ExprId,
    pub value: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtAugAssign {
    pub target: ExprId,
    pub op: Operator,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtFor {
    pub is_async: bool,
    pub target: ExprId,
    pub iter: ExprId,
    pub body: Vec<StmtId>,
    pub orelse: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtWhile {
    pub test: ExprId,
    pub body: Vec<StmtId>,
    pub orelse: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtIf {
    pub test: ExprId,
    pub body: Vec<StmtId>,
    pub orelse: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtWith {
    pub is_async: bool,
    pub items: Vec<WithItem>,
    pub body: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtTry {
    pub body: Vec<StmtId>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<StmtId>,
    pub finalbody: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtRaise {
    pub exc: Option<ExprId>,
    pub cause: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtImport {
    pub names: Vec<Alias>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtImportFrom {
    /// The dotted module path, e.g. `a.b` in `from a.b import c`. `None` for
    /// bare relative imports (`from . import c`).
    pub module: Option<Identifier>,
    pub names: Vec<Alias>,
    /// Number of leading dots for relative imports.
    pub level: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtGlobal {
    pub names: Vec<Identifier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtNonlocal {
    pub names: Vec<Identifier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtReturn {
    pub value: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtDelete {
    pub targets: Vec<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtTypeAlias {
    pub name: Identifier,
    pub type_params: Option<TypeParams>,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StmtExpr {
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq, is_macro::Is)]
pub enum Expr {
    Name(ExprName),
    Attribute(ExprAttribute),
    Call(ExprCall),
    StringLiteral(ExprStringLiteral),
    NumberLiteral(ExprNumberLiteral),
    BooleanLiteral(ExprBooleanLiteral),
    NoneLiteral,
    Tuple(ExprTuple),
    List(ExprList),
    Set(ExprSet),
    Dict(ExprDict),
    Subscript(ExprSubscript),
    Starred(ExprStarred),
    Lambda(ExprLambda),
    ListComp(ExprListComp),
    SetComp(ExprSetComp),
    DictComp(ExprDictComp),
    Generator(ExprGenerator),
    Named(ExprNamed),
    BinOp(ExprBinOp),
    UnaryOp(ExprUnaryOp),
    BoolOp(ExprBoolOp),
    Compare(ExprCompare),
    #[is(name = "if_expr")]
    If(ExprIf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprName {
    pub id: Identifier,
    pub ctx: ExprContext,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprAttribute {
    pub value: ExprId,
    pub attr: Identifier,
    pub ctx: ExprContext,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprCall {
    pub func: ExprId,
    pub args: Vec<ExprId>,
    pub keywords: Vec<Keyword>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprStringLiteral {
    pub value: String,
    /// The embedded expression this literal parses to, when the producing
    /// parser recognized the text as a forward-reference annotation.
    /// `None` when the text is not valid syntax; scope analysis silently
    /// extracts nothing from such literals.
    pub parsed_annotation: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprNumberLiteral {
    pub value: Number,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprBooleanLiteral {
    pub value: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprTuple {
    pub elts: Vec<ExprId>,
    pub ctx: ExprContext,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprList {
    pub elts: Vec<ExprId>,
    pub ctx: ExprContext,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprSet {
    pub elts: Vec<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprDict {
    pub items: Vec<DictItem>,
}

/// A `key: value` dict entry; `key` is `None` for `**expansion` entries.
#[derive(Clone, Debug, PartialEq)]
pub struct DictItem {
    pub key: Option<ExprId>,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprSubscript {
    pub value: ExprId,
    pub slice: ExprId,
    pub ctx: ExprContext,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprStarred {
    pub value: ExprId,
    pub ctx: ExprContext,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprLambda {
    pub parameters: Parameters,
    pub body: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprListComp {
    pub elt: ExprId,
    pub generators: Vec<Comprehension>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprSetComp {
    pub elt: ExprId,
    pub generators: Vec<Comprehension>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprDictComp {
    pub key: ExprId,
    pub value: ExprId,
    pub generators: Vec<Comprehension>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprGenerator {
    pub elt: ExprId,
    pub generators: Vec<Comprehension>,
}

/// A named expression (`target := value`).
#[derive(Clone, Debug, PartialEq)]
pub struct ExprNamed {
    pub target: ExprId,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprBinOp {
    pub left: ExprId,
    pub op: Operator,
    pub right: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprUnaryOp {
    pub op: UnaryOperator,
    pub operand: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprBoolOp {
    pub op: BoolOperator,
    pub values: Vec<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprCompare {
    pub left: ExprId,
    pub ops: Vec<CmpOp>,
    pub comparators: Vec<ExprId>,
}

/// A conditional expression (`body if test else orelse`).
#[derive(Clone, Debug, PartialEq)]
pub struct ExprIf {
    pub test: ExprId,
    pub body: ExprId,
    pub orelse: ExprId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Pow,
    BitOr,
    BitAnd,
    BitXor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Invert,
    Not,
    UAdd,
    USub,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

/// One `for target in iter if ...` clause of a comprehension or generator.
#[derive(Clone, Debug, PartialEq)]
pub struct Comprehension {
    pub target: ExprId,
    pub iter: ExprId,
    pub ifs: Vec<ExprId>,
    pub is_async: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parameters {
    pub args: Vec<Parameter>,
    pub vararg: Option<Parameter>,
    pub kwarg: Option<Parameter>,
}

impl Parameters {
    /// All parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.args
            .iter()
            .chain(self.vararg.as_ref())
            .chain(self.kwarg.as_ref())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: Identifier,
    pub annotation: Option<ExprId>,
    pub default: Option<ExprId>,
}

impl Parameter {
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }
}

/// A `name` or `name as asname` clause of an import statement. `name` may be
/// dotted (`import a.b`).
#[derive(Clone, Debug, PartialEq)]
pub struct Alias {
    pub name: Identifier,
    pub asname: Option<Identifier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Keyword {
    pub arg: Option<Identifier>,
    pub value: ExprId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithItem {
    pub context_expr: ExprId,
    pub optional_vars: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExceptHandler {
    pub type_: Option<ExprId>,
    /// The `as name` target, a Store-context [`ExprName`].
    pub name: Option<ExprId>,
    pub body: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParams {
    pub params: Vec<TypeParam>,
}

#[derive(Clone, Debug, PartialEq, is_macro::Is)]
pub enum TypeParam {
    TypeVar(TypeParamTypeVar),
    TypeVarTuple(TypeParamTypeVarTuple),
    ParamSpec(TypeParamParamSpec),
}

impl TypeParam {
    pub fn name(&self) -> &Identifier {
        match self {
            TypeParam::TypeVar(param) => &param.name,
            TypeParam::TypeVarTuple(param) => &param.name,
            TypeParam::ParamSpec(param) => &param.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParamTypeVar {
    pub name: Identifier,
    pub bound: Option<ExprId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParamTypeVarTuple {
    pub name: Identifier,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParamParamSpec {
    pub name: Identifier,
}

macro_rules! impl_from {
    ($($node:ident => $enum:ident::$variant:ident,)*) => {
        $(
            impl From<$node> for $enum {
                fn from(node: $node) -> Self {
                    $enum::$variant(node)
                }
            }
        )*
    };
}

impl_from! {
    StmtFunctionDef => Stmt::FunctionDef,
    StmtClassDef => Stmt::ClassDef,
    StmtAssign => Stmt::Assign,
    StmtAnnAssign => Stmt::AnnAssign,
    StmtAugAssign => Stmt::AugAssign,
    StmtFor => Stmt::For,
    StmtWhile => Stmt::While,
    StmtIf => Stmt::If,
    StmtWith => Stmt::With,
    StmtTry => Stmt::Try,
    StmtRaise => Stmt::Raise,
    StmtImport => Stmt::Import,
    StmtImportFrom => Stmt::ImportFrom,
    StmtGlobal => Stmt::Global,
    StmtNonlocal => Stmt::Nonlocal,
    StmtReturn => Stmt::Return,
    StmtDelete => Stmt::Delete,
    StmtTypeAlias => Stmt::TypeAlias,
    StmtExpr => Stmt::Expr,
    ExprName => Expr::Name,
    ExprAttribute => Expr::Attribute,
    ExprCall => Expr::Call,
    ExprStringLiteral => Expr::StringLiteral,
    ExprNumberLiteral => Expr::NumberLiteral,
    ExprBooleanLiteral => Expr::BooleanLiteral,
    ExprTuple => Expr::Tuple,
    ExprList => Expr::List,
    ExprSet => Expr::Set,
    ExprDict => Expr::Dict,
    ExprSubscript => Expr::Subscript,
    ExprStarred => Expr::Starred,
    ExprLambda => Expr::Lambda,
    ExprListComp => Expr::ListComp,
    ExprSetComp => Expr::SetComp,
    ExprDictComp => Expr::DictComp,
    ExprGenerator => Expr::Generator,
    ExprNamed => Expr::Named,
    ExprBinOp => Expr::BinOp,
    ExprUnaryOp => Expr::UnaryOp,
    ExprBoolOp => Expr::BoolOp,
    ExprCompare => Expr::Compare,
    ExprIf => Expr::If,
}

/// Construction helpers. With no parser in this crate, callers (and tests)
/// assemble trees through these.
impl Ast {
    pub fn name(&mut self, id: &str, ctx: ExprContext) -> ExprId {
        self.push_expr(ExprName {
            id: id.into(),
            ctx,
        })
    }

    pub fn name_load(&mut self, id: &str) -> ExprId {
        self.name(id, ExprContext::Load)
    }

    pub fn name_store(&mut self, id: &str) -> ExprId {
        self.name(id, ExprContext::Store)
    }

    pub fn name_del(&mut self, id: &str) -> ExprId {
        self.name(id, ExprContext::Del)
    }

    pub fn attribute(&mut self, value: ExprId, attr: &str, ctx: ExprContext) -> ExprId {
        self.push_expr(ExprAttribute {
            value,
            attr: attr.into(),
            ctx,
        })
    }

    pub fn call(&mut self, func: ExprId, args: Vec<ExprId>) -> ExprId {
        self.push_expr(ExprCall {
            func,
            args,
            keywords: Vec::new(),
        })
    }

    pub fn string_literal(&mut self, value: &str) -> ExprId {
        self.push_expr(ExprStringLiteral {
            value: value.to_string(),
            parsed_annotation: None,
        })
    }

    pub fn string_annotation(&mut self, value: &str, parsed: Option<ExprId>) -> ExprId {
        self.push_expr(ExprStringLiteral {
            value: value.to_string(),
            parsed_annotation: parsed,
        })
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.push_expr(ExprNumberLiteral {
            value: Number::Int(value),
        })
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> StmtId {
        self.push_stmt(StmtAssign {
            targets: vec![target],
            value,
        })
    }

    pub fn ann_assign(&mut self, target: ExprId, annotation: ExprId, value: Option<ExprId>) -> StmtId {
        self.push_stmt(StmtAnnAssign {
            target,
            annotation,
            value,
        })
    }

    pub fn expr_stmt(&mut self, value: ExprId) -> StmtId {
        self.push_stmt(StmtExpr { value })
    }

    pub fn return_stmt(&mut self, value: Option<ExprId>) -> StmtId {
        self.push_stmt(StmtReturn { value })
    }

    pub fn import(&mut self, names: &[(&str, Option<&str>)]) -> StmtId {
        self.push_stmt(StmtImport {
            names: aliases(names),
        })
    }

    pub fn import_from(
        &mut self,
        module: Option<&str>,
        names: &[(&str, Option<&str>)],
        level: u32,
    ) -> StmtId {
        self.push_stmt(StmtImportFrom {
            module: module.map(Identifier::new),
            names: aliases(names),
            level,
        })
    }

    pub fn function_def(&mut self, name: &str, parameters: Parameters, body: Vec<StmtId>) -> StmtId {
        self.push_stmt(StmtFunctionDef {
            is_async: false,
            name: name.into(),
            type_params: None,
            parameters,
            returns: None,
            body,
            decorator_list: Vec::new(),
        })
    }

    pub fn class_def(&mut self, name: &str, bases: Vec<ExprId>, body: Vec<StmtId>) -> StmtId {
        self.push_stmt(StmtClassDef {
            name: name.into(),
            type_params: None,
            bases,
            keywords: Vec::new(),
            body,
            decorator_list: Vec::new(),
        })
    }

    pub fn lambda(&mut self, parameters: Parameters, body: ExprId) -> ExprId {
        self.push_expr(ExprLambda { parameters, body })
    }

    pub fn for_stmt(&mut self, target: ExprId, iter: ExprId, body: Vec<StmtId>) -> StmtId {
        self.push_stmt(StmtFor {
            is_async: false,
            target,
            iter,
            body,
            orelse: Vec::new(),
        })
    }

    pub fn global_stmt(&mut self, names: &[&str]) -> StmtId {
        self.push_stmt(StmtGlobal {
            names: names.iter().copied().map(Identifier::new).collect(),
        })
    }

    pub fn nonlocal_stmt(&mut self, names: &[&str]) -> StmtId {
        self.push_stmt(StmtNonlocal {
            names: names.iter().copied().map(Identifier::new).collect(),
        })
    }

    pub fn list_comp(&mut self, elt: ExprId, generators: Vec<Comprehension>) -> ExprId {
        self.push_expr(ExprListComp { elt, generators })
    }

    pub fn subscript(&mut self, value: ExprId, slice: ExprId) -> ExprId {
        self.push_expr(ExprSubscript {
            value,
            slice,
            ctx: ExprContext::Load,
        })
    }
}

/// A `for target in iter if ...` clause with no `async` marker.
pub fn comprehension(target: ExprId, iter: ExprId, ifs: Vec<ExprId>) -> Comprehension {
    Comprehension {
        target,
        iter,
        ifs,
        is_async: false,
    }
}

/// A positional-only parameter list, one parameter per name.
pub fn parameters(names: &[&str]) -> Parameters {
    Parameters {
        args: names.iter().map(|name| Parameter::new(*name)).collect(),
        vararg: None,
        kwarg: None,
    }
}

fn aliases(names: &[(&str, Option<&str>)]) -> Vec<Alias> {
    names
        .iter()
        .map(|(name, asname)| Alias {
            name: Identifier::new(*name),
            asname: asname.map(Identifier::new),
        })
        .collect()
}
