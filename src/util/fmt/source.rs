//! Canonical source rendering.
//!
//! Rendering a parsed file and parsing the result again yields the same tree,
//! up to spans.

use std::fmt::{self, Formatter};

use crate::{
    ast::*,
    util::fmt::{Context, Show},
};

impl Show for File {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        for (idx, node) in self.nodes.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            node.show(f, ctx)?;
        }
        Ok(())
    }
}

impl Show for Node {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        let i = ctx.ident_interner;
        write!(f, "node {} (", i.get(self.name))?;
        show_params(f, ctx, &self.inputs)?;
        write!(f, ") returns (")?;
        show_params(f, ctx, &self.outputs)?;
        writeln!(f, ");")?;

        if !self.locals.is_empty() {
            write!(f, "var ")?;
            show_params(f, ctx, &self.locals)?;
            writeln!(f, ";")?;
        }

        writeln!(f, "let")?;
        for assign in &self.body {
            write!(f, "  ")?;
            match assign.destinations.as_slice() {
                [single] => write!(f, "{}", i.get(single))?,
                many => {
                    write!(f, "(")?;
                    for (idx, dst) in many.iter().enumerate() {
                        if idx > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", i.get(dst))?;
                    }
                    write!(f, ")")?;
                }
            }
            writeln!(f, " = {};", assign.body.display(ctx))?;
        }
        writeln!(f, "tel")
    }
}

fn show_params(f: &mut Formatter<'_>, ctx: &Context<'_>, params: &[Param]) -> fmt::Result {
    for (idx, param) in params.iter().enumerate() {
        if idx > 0 {
            write!(f, "; ")?;
        }
        write!(f, "{}: {}", ctx.ident_interner.get(param.name), param.ty)?;
    }
    Ok(())
}

impl Show for Expr {
    fn show(&self, f: &mut Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        let i = ctx.ident_interner;
        match &self.kind {
            ExprKind::Call { node, args } => {
                write!(f, "{}(", i.get(node))?;
                show_list(f, ctx, args)?;
                write!(f, ")")
            }
            ExprKind::Const(Const::Int(int)) => write!(f, "{int}"),
            ExprKind::Const(Const::Bool(bool)) => write!(f, "{bool}"),
            ExprKind::Const(Const::String(string)) => write!(f, "\"{string}\""),
            ExprKind::Var(ident) => write!(f, "{}", i.get(ident)),
            ExprKind::Tuple(items) => {
                write!(f, "(")?;
                show_list(f, ctx, items)?;
                write!(f, ")")
            }
            ExprKind::Binary { .. } => {
                let mut current = self;
                while let ExprKind::Binary { op, lhs, rhs } = &current.kind {
                    // Operators nest to the right, so a compound left operand
                    // needs explicit grouping.
                    if matches!(lhs.kind, ExprKind::Binary { .. } | ExprKind::If { .. }) {
                        write!(f, "({})", lhs.display(ctx))?;
                    } else {
                        lhs.show(f, ctx)?;
                    }
                    write!(f, " {} ", op.symbol())?;
                    current = &**rhs;
                }
                current.show(f, ctx)
            }
            ExprKind::If {
                predicate,
                then_arm,
                else_arm,
            } => write!(
                f,
                "if {} then {} else {}",
                predicate.display(ctx),
                then_arm.display(ctx),
                else_arm.display(ctx)
            ),
        }
    }
}

fn show_list(f: &mut Formatter<'_>, ctx: &Context<'_>, exprs: &[Expr]) -> fmt::Result {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        expr.show(f, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use crate::{
        parser,
        util::{
            fmt::{tree, Context, Show},
            intern::Interner,
        },
    };

    fn render(src: &str) -> (String, String) {
        let i = &mut Interner::with_capacity(32);
        let file = parser::parse_file(src, i).unwrap();
        let ctx = Context { ident_interner: i };
        let source = file.display(&ctx).to_string();
        let tree = tree::print_file_string(i, &file);
        (source, tree)
    }

    #[test]
    fn test_canonical_form() {
        let src = "node add(a, b: int) returns (c: int); let c = a + b; tel";
        let (source, _) = render(src);
        assert_eq!(
            source,
            indoc! {"
                node add (a: int; b: int) returns (c: int);
                let
                  c = a + b;
                tel
            "}
        );
    }

    #[test]
    fn test_canonical_form_of_every_construct() {
        let src = r#"
            node main() returns (u: unit);
            var n: int; t: string; ok: bool;
            let
                n = 0 fby (n + 1) - 2;
                (t, ok) = (if n > 10 then "big" else "small", n < 3);
                u = print(t);
            tel
            node nop(x: float) returns (y: float); let y = x; tel
        "#;
        let (source, _) = render(src);
        assert_eq!(
            source,
            indoc! {r#"
                node main () returns (u: unit);
                var n: int; t: string; ok: bool;
                let
                  n = 0 fby (n + 1) - 2;
                  (t, ok) = (if n > 10 then "big" else "small", n < 3);
                  u = print(t);
                tel

                node nop (x: float) returns (y: float);
                let
                  y = x;
                tel
            "#}
        );
    }

    #[test]
    fn test_rendered_source_parses_to_the_same_tree() {
        let sources = [
            "node f(a: int) returns (b: int); let b = (a - 1) - (a + 2); tel",
            "node g() returns (x: bool); let x = (if true then 1 else 2) > 0; tel",
            "node h() returns (x, y: int); let (x, y) = ((1, 2)); tel",
            r#"node k() returns (u: unit); let u = print("a b"); tel"#,
        ];
        for src in sources {
            let (source, tree) = render(src);
            let (again, tree_again) = render(&source);
            assert_eq!(source, again);
            // Spans differ, so only compare the tree shape.
            assert_eq!(strip_spans(&tree), strip_spans(&tree_again));
        }
    }

    fn strip_spans(tree: &str) -> String {
        tree.lines()
            .map(|line| match line.rfind(" (") {
                Some(at) if line.ends_with(')') => &line[..at],
                _ => line,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
