use crate::{
    codegen::{self, Target},
    lower, parser,
    util::{
        fmt::{diagnostic, tree},
        intern::Interner,
    },
};

/// Each variant contains the input.
pub enum Test {
    ParserFile(&'static str),
    ParserExpr(&'static str),
    LowerFile(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    ExpectedErrors(&'static [&'static str]),
    /// Lines which must appear, trimmed, in the emitted module.
    IrContains(&'static [&'static str]),
}

/// Runs the test input through the pipeline, returning the rendered output
/// (a tree or an emitted module) and the rendered errors.
#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let interner = &mut Interner::with_capacity(128);

    match test {
        Test::ParserFile(input) => match parser::parse_file(input, interner) {
            Ok(file) => (tree::print_file_string(interner, &file), vec![]),
            Err(error) => (String::new(), vec![diagnostic(interner, &error)]),
        },
        Test::ParserExpr(input) => match parser::parse_expr(input, interner) {
            Ok(expr) => (tree::print_expr_string(interner, &expr), vec![]),
            Err(error) => (String::new(), vec![diagnostic(interner, &error)]),
        },
        Test::LowerFile(input) => {
            let file = match parser::parse_file(input, interner) {
                Ok(file) => file,
                Err(error) => return (String::new(), vec![diagnostic(interner, &error)]),
            };
            match lower::lower_file(&file, interner) {
                Ok(module) => {
                    let mut buf = Vec::with_capacity(1024);
                    codegen::generate(&mut buf, &module, Target::x86_64_linux).unwrap();
                    (String::from_utf8(buf).unwrap(), vec![])
                }
                Err(error) => (String::new(), vec![diagnostic(interner, &error)]),
            }
        }
    }
}

#[track_caller]
pub fn run_assertion(assertion: Assertion, formatted_output: &str, formatted_errors: &[String]) {
    let no_errors: &[&str] = &[];
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_errors, no_errors);
            ::pretty_assertions::assert_eq!(formatted_output.trim(), expected_tree.trim());
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_errors, expected_errors);
        }
        Assertion::IrContains(expected_lines) => {
            ::pretty_assertions::assert_eq!(formatted_errors, no_errors);
            let lines: Vec<&str> = formatted_output.lines().map(str::trim).collect();
            for expected in expected_lines {
                assert!(
                    lines.contains(expected),
                    "missing line `{expected}` in module:\n{formatted_output}"
                );
            }
        }
    }
}

macro_rules! tree_tests {
    (
        use $test_kind:ident;

        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($test_kind, $source_kind), $source);
                let (formatted_output, formatted_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_output, &formatted_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };
    (@@assertion, ir_contains, $expected:expr) => {
        crate::util::test_utils::Assertion::IrContains($expected)
    };

    (@@get_test(parser, file), $source:expr) => {
        crate::util::test_utils::Test::ParserFile($source)
    };
    (@@get_test(parser, expr), $source:expr) => {
        crate::util::test_utils::Test::ParserExpr($source)
    };
    (@@get_test(lower, file), $source:expr) => {
        crate::util::test_utils::Test::LowerFile($source)
    };
}
pub(crate) use tree_tests;
