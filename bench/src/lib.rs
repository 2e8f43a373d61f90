//! Shared inputs for the benchmarks.

use std::fmt::Write;

/// Builds a file of `nodes` counter nodes, each calling the previous one.
pub fn big_input(nodes: usize) -> String {
    let mut src = String::with_capacity(nodes * 160);
    src.push_str("node n0(reset: bool) returns (c: int); let c = if reset then 0 else 0 fby c + 1; tel\n");
    for i in 1..nodes {
        let prev = i - 1;
        writeln!(
            src,
            "node n{i}(reset: bool) returns (c: int);\n\
             var t: int; s: string;\n\
             let\n  \
               t = n{prev}(reset);\n  \
               (c, s) = (t - {i} fby c + 1, \"node {i}\");\n\
             tel"
        )
        .unwrap();
    }
    src
}

#[cfg(test)]
mod tests {
    use minilustre::{compile, Options};

    #[test]
    fn big_input_compiles() {
        let ir = compile(&super::big_input(20), &Options::default()).unwrap();
        assert!(ir.contains("define i32 @n19(ptr %self.state, i1 %reset)"));
    }
}
