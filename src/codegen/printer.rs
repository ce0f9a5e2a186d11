//! Renders the C/C++ tree to source text.
//!
//! Statements are laid out with [`CodeFormatter`]; expressions are turned
//! into `pretty` documents so long argument lists wrap with a fixed
//! continuation indent. Rendering is deterministic: the same tree always
//! yields byte-identical text.

use super::cir::{BinOp, Expr, Include, Param, Stmt};
use crate::utils::errors::SlopeResult;
use crate::utils::pretty::{CodeFormatter, PrettyPrint, DEFAULT_WIDTH};
use pretty::RcDoc;

/// Extra indentation of wrapped argument lists.
const CONTINUATION: isize = 4;
/// Never squeeze expressions narrower than this.
const MIN_WIDTH: usize = 40;

impl PrettyPrint for Expr {
    fn to_doc(&self) -> RcDoc<'_, ()> {
        match self {
            Expr::Ident(name) => RcDoc::text(name.as_str()),
            Expr::Int(v) => RcDoc::text(v.to_string()),
            Expr::Float(v) => RcDoc::text(format!("{:?}", v)),
            Expr::Bool(b) => RcDoc::text(if *b { "true" } else { "false" }),
            Expr::Str(s) => RcDoc::text(quote(s)),
            Expr::Null => RcDoc::text("NULL"),
            Expr::Call { callee, args } => callee.to_doc().append(list("(", args, ")")),
            Expr::Field { base, field } => base
                .to_doc()
                .append(RcDoc::text("."))
                .append(RcDoc::text(field.as_str())),
            Expr::Arrow { base, field } => base
                .to_doc()
                .append(RcDoc::text("->"))
                .append(RcDoc::text(field.as_str())),
            Expr::Index { base, index } => base
                .to_doc()
                .append(RcDoc::text("["))
                .append(index.to_doc())
                .append(RcDoc::text("]")),
            Expr::AddrOf(e) => RcDoc::text("&").append(e.to_doc()),
            Expr::Not(e) => RcDoc::text("!").append(e.to_doc()),
            Expr::Cast { ty, expr } => RcDoc::text(format!("({})", ty)).append(expr.to_doc()),
            Expr::Binary { op, left, right } => operand(left, *op, false)
                .append(RcDoc::text(format!(" {} ", op.as_str())))
                .append(operand(right, *op, true)),
            Expr::New(ty) => RcDoc::text(format!("new {}()", ty)),
            Expr::InitList(items) => list("{", items, "}"),
        }
    }
}

fn list<'a>(open: &'a str, items: &'a [Expr], close: &'a str) -> RcDoc<'a, ()> {
    RcDoc::text(open)
        .append(
            RcDoc::intersperse(
                items.iter().map(|e| e.to_doc()),
                RcDoc::text(",").append(RcDoc::softline()),
            )
            .nest(CONTINUATION),
        )
        .append(RcDoc::text(close))
        .group()
}

fn operand(e: &Expr, parent: BinOp, right: bool) -> RcDoc<'_, ()> {
    match e {
        Expr::Binary { op, .. } if right || *op != parent => {
            RcDoc::text("(").append(e.to_doc()).append(RcDoc::text(")"))
        }
        _ => e.to_doc(),
    }
}

/// Quote and escape a string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            // Octal escapes stop after three digits, unlike `\x`.
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn param_doc(p: &Param) -> RcDoc<'_, ()> {
    match p.extent {
        Some(n) => RcDoc::text(format!("{} {}[{}]", p.ty, p.name, n)),
        None => RcDoc::text(format!("{} {}", p.ty, p.name)),
    }
}

fn signature_doc<'a>(ret: &'a str, name: &'a str, params: &'a [Param], extern_c: bool) -> RcDoc<'a, ()> {
    let prefix = if extern_c { "extern \"C\" " } else { "" };
    RcDoc::text(format!("{}{} {}", prefix, ret, name))
        .append(RcDoc::text("("))
        .append(
            RcDoc::intersperse(params.iter().map(param_doc), RcDoc::text(",").append(RcDoc::softline()))
                .nest(CONTINUATION),
        )
        .append(RcDoc::text(")"))
        .group()
}

/// Render an expression on its own, at the default width.
pub fn render_expr(expr: &Expr) -> SlopeResult<String> {
    Ok(expr.pretty()?)
}

/// Render a sequence of statements.
pub fn render(stmts: &[Stmt]) -> SlopeResult<String> {
    let mut f = CodeFormatter::default_indent();
    emit_block(&mut f, stmts)?;
    Ok(f.finish())
}

fn emit_block(f: &mut CodeFormatter, stmts: &[Stmt]) -> SlopeResult<()> {
    for stmt in stmts {
        emit(f, stmt)?;
    }
    Ok(())
}

fn emit_doc(f: &mut CodeFormatter, doc: RcDoc<'_, ()>) -> SlopeResult<()> {
    let width = DEFAULT_WIDTH.saturating_sub(f.indent_width()).max(MIN_WIDTH);
    let mut text = String::new();
    doc.render_fmt(width, &mut text)?;
    f.writeln(&text);
    Ok(())
}

fn emit_nested(f: &mut CodeFormatter, header: RcDoc<'_, ()>, body: &[Stmt]) -> SlopeResult<()> {
    emit_doc(f, header.append(RcDoc::text(" {")))?;
    f.indent();
    emit_block(f, body)?;
    f.dedent();
    f.writeln("}");
    Ok(())
}

fn semi(doc: RcDoc<'_, ()>) -> RcDoc<'_, ()> {
    doc.append(RcDoc::text(";"))
}

fn emit(f: &mut CodeFormatter, stmt: &Stmt) -> SlopeResult<()> {
    match stmt {
        Stmt::Include(Include::System(h)) => f.writeln(&format!("#include <{}>", h)),
        Stmt::Include(Include::Local(h)) => f.writeln(&format!("#include \"{}\"", h)),
        Stmt::Comment(text) => f.writeln(&format!("// {}", text)),
        Stmt::Blank => f.newline(),
        Stmt::Decl { ty, name, init } => {
            let head = RcDoc::text(format!("{} {}", ty, name));
            let doc = match init {
                Some(e) => head.append(RcDoc::text(" = ")).append(e.to_doc()),
                None => head,
            };
            emit_doc(f, semi(doc))?;
        }
        Stmt::CtorDecl { ty, name, args } => {
            let doc = RcDoc::text(format!("{} {} ", ty, name)).append(list("(", args, ")"));
            emit_doc(f, semi(doc))?;
        }
        Stmt::Assign { target, value } => {
            let doc = target.to_doc().append(RcDoc::text(" = ")).append(value.to_doc());
            emit_doc(f, semi(doc))?;
        }
        Stmt::AddAssign { target, value } => {
            let doc = target.to_doc().append(RcDoc::text(" += ")).append(value.to_doc());
            emit_doc(f, semi(doc))?;
        }
        Stmt::Expr(e) => emit_doc(f, semi(e.to_doc()))?,
        Stmt::If { cond, then_body } => {
            let header = RcDoc::text("if (").append(cond.to_doc()).append(RcDoc::text(")"));
            emit_nested(f, header, then_body)?;
        }
        Stmt::For { var, bound, body } => {
            let header = RcDoc::text(format!("for (int {v} = 0; {v} < ", v = var))
                .append(bound.to_doc())
                .append(RcDoc::text(format!("; {}++)", var)));
            emit_nested(f, header, body)?;
        }
        Stmt::Pragma(text) => f.writeln(&format!("#pragma {}", text)),
        Stmt::Scope(body) => {
            f.writeln("{");
            f.indent();
            emit_block(f, body)?;
            f.dedent();
            f.writeln("}");
        }
        Stmt::Continue => f.writeln("continue;"),
        Stmt::Return(e) => emit_doc(f, semi(RcDoc::text("return ").append(e.to_doc())))?,
        Stmt::Delete(e) => emit_doc(f, semi(RcDoc::text("delete ").append(e.to_doc())))?,
        Stmt::Verbatim(code) => {
            for line in code.trim_matches('\n').lines() {
                if line.trim().is_empty() {
                    f.newline();
                } else {
                    f.writeln(line.trim_end());
                }
            }
        }
        Stmt::Typedef { name, fields } => {
            f.writeln("typedef struct {");
            f.indent();
            for (ty, field) in fields {
                f.writeln(&format!("{} {};", ty, field));
            }
            f.dedent();
            f.writeln(&format!("}} {};", name));
        }
        Stmt::Function { ret, name, params, body, extern_c } => {
            let sig = signature_doc(ret, name, params, *extern_c);
            match body {
                None => emit_doc(f, semi(sig))?,
                Some(body) => emit_nested(f, sig, body)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_flat() {
        let e = Expr::call("insp_run", vec![Expr::ident("insp"), Expr::ident("seedTilePoint")]);
        assert_eq!(render_expr(&e).unwrap(), "insp_run(insp, seedTilePoint)");
    }

    #[test]
    fn test_long_call_wraps() {
        let args = (0..20).map(|i| Expr::ident(format!("argument_{}", i))).collect();
        let text = render_expr(&Expr::call("f", args)).unwrap();
        assert!(text.contains('\n'));
        assert!(text.lines().skip(1).all(|l| l.starts_with("    ")));
    }

    #[test]
    fn test_string_escaping() {
        let e = Expr::str("a\"b\\c\n");
        assert_eq!(render_expr(&e).unwrap(), r#""a\"b\\c\n""#);
        assert_eq!(render_expr(&Expr::str("\u{1}9")).unwrap(), "\"\\0019\"");
    }

    #[test]
    fn test_binary_parens() {
        let e = Expr::ident("a").sub(Expr::ident("b").sub(Expr::ident("c")));
        assert_eq!(render_expr(&e).unwrap(), "a - (b - c)");
        let s = Expr::stream(vec![Expr::ident("out"), Expr::str("x"), Expr::ident("y")]);
        assert_eq!(render_expr(&s).unwrap(), "out << \"x\" << y");
    }

    #[test]
    fn test_nested_blocks() {
        let prog = vec![Stmt::for_range(
            "i",
            Expr::ident("nColors"),
            vec![
                Stmt::If { cond: Expr::ident("tile").not(), then_body: vec![Stmt::Continue] },
                Stmt::Verbatim("\nkernel(a);\n  more(b);\n".into()),
            ],
        )];
        let text = render(&prog).unwrap();
        assert_eq!(
            text,
            "for (int i = 0; i < nColors; i++) {\n  if (!tile) {\n    continue;\n  }\n  kernel(a);\n    more(b);\n}\n"
        );
    }

    #[test]
    fn test_ctor_decl_and_function() {
        let prog = vec![
            Stmt::CtorDecl {
                ty: "desc_list".into(),
                name: "flux_Desc_0".into(),
                args: vec![Expr::InitList(vec![Expr::call(
                    "desc",
                    vec![Expr::ident("cell2node"), Expr::ident("RW")],
                )])],
            },
            Stmt::Function {
                ret: "void*".into(),
                name: "inspector".into(),
                params: vec![Param::array("slope_set", "sets", 2), Param::new("int", "rank")],
                body: None,
                extern_c: true,
            },
        ];
        let text = render(&prog).unwrap();
        assert!(text.contains("desc_list flux_Desc_0 ({desc(cell2node, RW)});"));
        assert!(text.contains("extern \"C\" void* inspector(slope_set sets[2], int rank);"));
    }
}
