//! A small C/C++ syntax tree for the emitted inspector and executor.
//!
//! Emitters build [`Stmt`]s instead of formatting strings; the printer in
//! [`super::printer`] owns layout and string escaping.

/// A C/C++ expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier or enumerator
    Ident(String),
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// `true` / `false`
    Bool(bool),
    /// String literal (escaped by the printer)
    Str(String),
    /// `NULL`
    Null,
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `base.field`
    Field { base: Box<Expr>, field: String },
    /// `base->field`
    Arrow { base: Box<Expr>, field: String },
    /// `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `&expr`
    AddrOf(Box<Expr>),
    /// `!expr`
    Not(Box<Expr>),
    /// `(ty)expr`
    Cast { ty: String, expr: Box<Expr> },
    /// `left op right`
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    /// `new ty()`
    New(String),
    /// `{a, b, ...}`
    InitList(Vec<Expr>),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `-`
    Sub,
    /// `==`
    Eq,
    /// `<<`, used for stream output
    Shl,
}

impl BinOp {
    /// C spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Sub => "-",
            BinOp::Eq => "==",
            BinOp::Shl => "<<",
        }
    }
}

impl Expr {
    /// A bare identifier.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// An integer literal.
    pub fn int(v: i64) -> Self {
        Self::Int(v)
    }

    /// A string literal; escaped when printed.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// `name(args...)`
    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::Call { callee: Box::new(Self::ident(name)), args }
    }

    /// `self(args...)`, for method calls built with [`dot`](Self::dot) / [`arrow`](Self::arrow).
    pub fn invoke(self, args: Vec<Expr>) -> Self {
        Self::Call { callee: Box::new(self), args }
    }

    /// `self.field`
    pub fn dot(self, field: &str) -> Self {
        Self::Field { base: Box::new(self), field: field.to_string() }
    }

    /// `self->field`
    pub fn arrow(self, field: &str) -> Self {
        Self::Arrow { base: Box::new(self), field: field.to_string() }
    }

    /// `self[index]`
    pub fn at(self, index: Expr) -> Self {
        Self::Index { base: Box::new(self), index: Box::new(index) }
    }

    /// `&self`
    pub fn addr_of(self) -> Self {
        Self::AddrOf(Box::new(self))
    }

    /// `!self`
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `(ty)expr`
    pub fn cast(ty: &str, expr: Expr) -> Self {
        Self::Cast { ty: ty.to_string(), expr: Box::new(expr) }
    }

    /// `left op right`
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Self::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    /// `self == right`
    pub fn equals(self, right: Expr) -> Self {
        Self::binary(BinOp::Eq, self, right)
    }

    /// `self - right`
    pub fn sub(self, right: Expr) -> Self {
        Self::binary(BinOp::Sub, self, right)
    }

    /// `a << b << c ...`, left associative.
    pub fn stream(parts: Vec<Expr>) -> Self {
        let mut iter = parts.into_iter();
        let first = iter.next().unwrap_or(Expr::Ident(String::new()));
        iter.fold(first, |acc, e| Self::binary(BinOp::Shl, acc, e))
    }

    /// `table[row].field`, the shape of every entry-point argument access.
    pub fn table(table: &str, row: usize, field: &str) -> Self {
        Self::ident(table).at(Self::int(row as i64)).dot(field)
    }

    /// `NULL` when `name` is absent.
    pub fn ident_or_null(name: Option<&str>) -> Self {
        match name {
            Some(n) => Self::ident(n),
            None => Self::Null,
        }
    }
}

/// Kind of `#include`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Include {
    /// `#include <header>`
    System(String),
    /// `#include "header"`
    Local(String),
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter type
    pub ty: String,
    /// Parameter name
    pub name: String,
    /// Fixed array extent, e.g. `slope_set sets[3]`
    pub extent: Option<usize>,
}

impl Param {
    /// A scalar parameter `ty name`.
    pub fn new(ty: &str, name: &str) -> Self {
        Self { ty: ty.to_string(), name: name.to_string(), extent: None }
    }

    /// An array parameter; zero-length arrays decay to a pointer.
    pub fn array(ty: &str, name: &str, extent: usize) -> Self {
        if extent == 0 {
            Self { ty: format!("{}*", ty), name: name.to_string(), extent: None }
        } else {
            Self { ty: ty.to_string(), name: name.to_string(), extent: Some(extent) }
        }
    }
}

/// A C/C++ statement or top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `#include`
    Include(Include),
    /// `// text`
    Comment(String),
    /// Empty line
    Blank,
    /// `ty name = init;` or `ty name;`
    Decl { ty: String, name: String, init: Option<Expr> },
    /// `ty name (args...);`
    CtorDecl { ty: String, name: String, args: Vec<Expr> },
    /// `target = value;`
    Assign { target: Expr, value: Expr },
    /// `target += value;`
    AddAssign { target: Expr, value: Expr },
    /// `expr;`
    Expr(Expr),
    /// `if (cond) { ... }`
    If { cond: Expr, then_body: Vec<Stmt> },
    /// `for (int var = 0; var < bound; var++)`
    For { var: String, bound: Expr, body: Vec<Stmt> },
    /// `#pragma text`
    Pragma(String),
    /// `{ ... }`
    Scope(Vec<Stmt>),
    /// `continue;`
    Continue,
    /// `return expr;`
    Return(Expr),
    /// `delete expr;`
    Delete(Expr),
    /// Caller-supplied code, emitted line by line at the current indentation
    Verbatim(String),
    /// `typedef struct { ... } name;`
    Typedef { name: String, fields: Vec<(String, String)> },
    /// A prototype (`body == None`) or a definition
    Function {
        ret: String,
        name: String,
        params: Vec<Param>,
        body: Option<Vec<Stmt>>,
        extern_c: bool,
    },
}

impl Stmt {
    /// `ty name = init;`
    pub fn decl(ty: &str, name: &str, init: Expr) -> Self {
        Self::Decl { ty: ty.to_string(), name: name.to_string(), init: Some(init) }
    }

    /// `ty name;`
    pub fn decl_uninit(ty: &str, name: &str) -> Self {
        Self::Decl { ty: ty.to_string(), name: name.to_string(), init: None }
    }

    /// `target = value;`
    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign { target, value }
    }

    /// `target += value;`
    pub fn add_assign(target: Expr, value: Expr) -> Self {
        Self::AddAssign { target, value }
    }

    /// `// text`
    pub fn comment(text: &str) -> Self {
        Self::Comment(text.to_string())
    }

    /// `#pragma text`
    pub fn pragma(text: &str) -> Self {
        Self::Pragma(text.to_string())
    }

    /// `for (int var = 0; var < bound; var++) { body }`
    pub fn for_range(var: &str, bound: Expr, body: Vec<Stmt>) -> Self {
        Self::For { var: var.to_string(), bound, body }
    }

    /// `#include "header"`
    pub fn include_local(header: &str) -> Self {
        Self::Include(Include::Local(header.to_string()))
    }

    /// `#include <header>`
    pub fn include_system(header: &str) -> Self {
        Self::Include(Include::System(header.to_string()))
    }
}

/// Depth-first visit of every statement, including nested bodies.
pub fn walk<'s>(stmts: &'s [Stmt], visit: &mut dyn FnMut(&'s Stmt)) {
    for stmt in stmts {
        visit(stmt);
        match stmt {
            Stmt::If { then_body: body, .. }
            | Stmt::For { body, .. }
            | Stmt::Scope(body)
            | Stmt::Function { body: Some(body), .. } => walk(body, visit),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_access() {
        let e = Expr::table("sets", 2, "core");
        assert!(matches!(e, Expr::Field { ref field, .. } if field == "core"));
    }

    #[test]
    fn test_stream_left_assoc() {
        let e = Expr::stream(vec![Expr::ident("out"), Expr::str("a"), Expr::ident("b")]);
        match e {
            Expr::Binary { op: BinOp::Shl, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Shl, .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_extent_decays() {
        assert_eq!(Param::array("slope_map", "maps", 0).ty, "slope_map*");
        assert_eq!(Param::array("slope_map", "maps", 2).extent, Some(2));
    }

    #[test]
    fn test_walk_counts_nested() {
        let body = vec![Stmt::for_range(
            "i",
            Expr::ident("n"),
            vec![Stmt::Continue, Stmt::Scope(vec![Stmt::Continue])],
        )];
        let mut n = 0;
        walk(&body, &mut |_| n += 1);
        assert_eq!(n, 4);
    }
}
