use std::io::Write;

use crate::{ast::*, util::intern::Interner};

const INDENT_WIDTH: usize = 2;

pub fn print_file_string(idents: &Interner<str>, file: &File) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_file(&mut buf, idents, file).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string(idents: &Interner<str>, expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, idents, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_file(w: &mut impl Write, idents: &Interner<str>, file: &File) -> std::io::Result<()> {
    for node in &file.nodes {
        print_node(w, idents, 0, node)?;
    }
    Ok(())
}

fn print_node(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    node: &Node,
) -> std::io::Result<()> {
    sp(w, i)?;
    writeln!(w, "node {} ({})", idents.get(node.name), node.name.span)?;

    let lists = [
        ("inputs", &node.inputs),
        ("outputs", &node.outputs),
        ("locals", &node.locals),
    ];
    for (header, params) in lists {
        if params.is_empty() {
            continue;
        }
        sp(w, i + 1)?;
        writeln!(w, "{header}")?;
        for param in params {
            sp(w, i + 2)?;
            let name = idents.get(param.name);
            writeln!(w, "{name}: {} ({})", param.ty, param.name.span)?;
        }
    }

    for assign in &node.body {
        sp(w, i + 1)?;
        write!(w, "assign ")?;
        for (idx, dst) in assign.destinations.iter().enumerate() {
            if idx > 0 {
                write!(w, ", ")?;
            }
            write!(w, "{}", idents.get(dst))?;
        }
        writeln!(w)?;
        print_expr(w, idents, i + 2, &assign.body)?;
    }
    Ok(())
}

/// Subexpressions are printed from an explicit stack, so deep expressions
/// don't grow the call stack.
pub fn print_expr(
    w: &mut impl Write,
    idents: &Interner<str>,
    i: usize,
    expr: &Expr,
) -> std::io::Result<()> {
    let mut stack = vec![(i, expr)];
    while let Some((i, expr)) = stack.pop() {
        sp(w, i)?;
        let span = expr.span;
        let first_child = stack.len();
        match &expr.kind {
            ExprKind::Call { node, args } => {
                writeln!(w, "call {} ({span})", idents.get(node))?;
                stack.extend(args.iter().map(|arg| (i + 1, arg)));
            }
            ExprKind::Const(Const::Int(int)) => writeln!(w, "int {int} ({span})")?,
            ExprKind::Const(Const::Bool(bool)) => writeln!(w, "bool {bool} ({span})")?,
            ExprKind::Const(Const::String(string)) => writeln!(w, "string {string:?} ({span})")?,
            ExprKind::Var(ident) => writeln!(w, "var {} ({span})", idents.get(ident))?,
            ExprKind::Tuple(items) => {
                writeln!(w, "tuple ({span})")?;
                stack.extend(items.iter().map(|item| (i + 1, item)));
            }
            ExprKind::Binary { op, lhs, rhs } => {
                writeln!(w, "binary {op:?} ({span})")?;
                stack.extend([(i + 1, &**lhs), (i + 1, &**rhs)]);
            }
            ExprKind::If {
                predicate,
                then_arm,
                else_arm,
            } => {
                writeln!(w, "if ({span})")?;
                stack.extend([(i + 1, &**predicate), (i + 1, &**then_arm), (i + 1, &**else_arm)]);
            }
        }
        // Children come out of the stack in source order.
        stack[first_child..].reverse();
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
