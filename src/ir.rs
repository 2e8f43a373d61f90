//! A small model of the LLVM assembly subset emitted by lowering.
//!
//! Every instruction and operand renders itself in LLVM syntax through
//! [`Display`](std::fmt::Display). Module level layout (header, target and
//! section ordering) is the business of [`crate::codegen`].

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Default)]
pub struct Module {
    pub state_types: Vec<StateType>,
    pub strings: Vec<StringConst>,
    pub declarations: Vec<Declaration>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// The instance state of a node, `%<name> = type { ... }`.
#[derive(Debug)]
pub struct StateType {
    pub name: String,
    pub fields: Vec<Type>,
}

impl Display for StateType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = type {{ ", local(&self.name))?;
        comma_separated(f, &self.fields)?;
        write!(f, " }}")
    }
}

/// A private, immutable and NUL terminated byte array.
#[derive(Debug)]
pub struct StringConst {
    pub name: String,
    pub value: Box<str>,
}

impl StringConst {
    pub fn array_ty(&self) -> Type {
        Type::Array(self.value.len() + 1, Box::new(Type::I8))
    }
}

impl Display for StringConst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ty = self.array_ty();
        write!(f, "{} = private unnamed_addr constant {ty} c\"", global(&self.name))?;
        for byte in self.value.bytes() {
            match byte {
                b'"' | b'\\' => write!(f, "\\{byte:02X}")?,
                b' '..=b'~' => write!(f, "{}", char::from(byte))?,
                _ => write!(f, "\\{byte:02X}")?,
            }
        }
        write!(f, "\\00\"")
    }
}

/// An external function.
#[derive(Debug)]
pub struct Declaration {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
}

impl Display for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "declare {} {}(", self.ret, global(&self.name))?;
        comma_separated(f, &self.params)?;
        write!(f, ")")
    }
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    pub params: Vec<(Type, String)>,
    /// The first block is the entry block.
    pub blocks: Vec<Block>,
}

impl Function {
    /// The `define` line, without the opening brace.
    pub fn header(&self) -> impl Display + '_ {
        FunctionHeader(self)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|block| &block.insts)
    }
}

struct FunctionHeader<'a>(&'a Function);

impl Display for FunctionHeader<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let function = self.0;
        write!(f, "define {} {}(", function.ret, global(&function.name))?;
        for (idx, (ty, name)) in function.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty} {}", local(name))?;
        }
        write!(f, ")")
    }
}

#[derive(Debug)]
pub struct Block {
    pub label: String,
    pub insts: Vec<Inst>,
    pub terminator: Terminator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Void,
    I1,
    I8,
    I32,
    I64,
    Float,
    Ptr,
    Array(usize, Box<Type>),
    Struct(Vec<Type>),
    /// A named type, such as a node state.
    Named(String),
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::I1 => f.write_str("i1"),
            Type::I8 => f.write_str("i8"),
            Type::I32 => f.write_str("i32"),
            Type::I64 => f.write_str("i64"),
            Type::Float => f.write_str("float"),
            Type::Ptr => f.write_str("ptr"),
            Type::Array(len, elem) => write!(f, "[{len} x {elem}]"),
            Type::Struct(fields) => {
                write!(f, "{{ ")?;
                comma_separated(f, fields)?;
                write!(f, " }}")
            }
            Type::Named(name) => write!(f, "{}", local(name)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Local(String),
    Global(String),
    Int(i64),
    Bool(bool),
    Undef,
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(name) => write!(f, "{}", local(name)),
            Operand::Global(name) => write!(f, "{}", global(name)),
            Operand::Int(int) => write!(f, "{int}"),
            Operand::Bool(bool) => write!(f, "{bool}"),
            Operand::Undef => f.write_str("undef"),
        }
    }
}

/// An operand along with its type, rendered as `<ty> <operand>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typed(pub Type, pub Operand);

impl Display for Typed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    FAdd,
    FSub,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cmp {
    ICmp(&'static str),
    FCmp(&'static str),
}

pub mod cmp {
    use super::Cmp;

    pub const SLT: Cmp = Cmp::ICmp("slt");
    pub const SGT: Cmp = Cmp::ICmp("sgt");
    pub const OLT: Cmp = Cmp::FCmp("olt");
    pub const OGT: Cmp = Cmp::FCmp("ogt");
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    Binary {
        dst: String,
        op: BinOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp {
        dst: String,
        cmp: Cmp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        dst: Option<String>,
        ret: Type,
        callee: String,
        args: Vec<Typed>,
    },
    Load {
        dst: String,
        ty: Type,
        ptr: Operand,
    },
    Store {
        value: Typed,
        ptr: Operand,
    },
    /// `getelementptr inbounds` with constant indices.
    ElementPtr {
        dst: String,
        ty: Type,
        base: Operand,
        indices: Vec<Typed>,
    },
    InsertValue {
        dst: String,
        aggregate: Typed,
        value: Typed,
        index: usize,
    },
    ExtractValue {
        dst: String,
        aggregate: Typed,
        index: usize,
    },
    Phi {
        dst: String,
        ty: Type,
        incoming: Vec<(Operand, String)>,
    },
}

impl Display for Inst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Binary {
                dst,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let op = match op {
                    BinOp::Add => "add",
                    BinOp::Sub => "sub",
                    BinOp::FAdd => "fadd",
                    BinOp::FSub => "fsub",
                };
                write!(f, "%{dst} = {op} {ty} {lhs}, {rhs}")
            }
            Inst::Cmp {
                dst,
                cmp,
                ty,
                lhs,
                rhs,
            } => {
                let (inst, cond) = match cmp {
                    Cmp::ICmp(cond) => ("icmp", cond),
                    Cmp::FCmp(cond) => ("fcmp", cond),
                };
                write!(f, "%{dst} = {inst} {cond} {ty} {lhs}, {rhs}")
            }
            Inst::Call {
                dst,
                ret,
                callee,
                args,
            } => {
                if let Some(dst) = dst {
                    write!(f, "%{dst} = ")?;
                }
                write!(f, "call {ret} {}(", global(callee))?;
                comma_separated(f, args)?;
                write!(f, ")")
            }
            Inst::Load { dst, ty, ptr } => write!(f, "%{dst} = load {ty}, ptr {ptr}"),
            Inst::Store { value, ptr } => write!(f, "store {value}, ptr {ptr}"),
            Inst::ElementPtr {
                dst,
                ty,
                base,
                indices,
            } => {
                write!(f, "%{dst} = getelementptr inbounds {ty}, ptr {base}")?;
                for index in indices {
                    write!(f, ", {index}")?;
                }
                Ok(())
            }
            Inst::InsertValue {
                dst,
                aggregate,
                value,
                index,
            } => write!(f, "%{dst} = insertvalue {aggregate}, {value}, {index}"),
            Inst::ExtractValue {
                dst,
                aggregate,
                index,
            } => write!(f, "%{dst} = extractvalue {aggregate}, {index}"),
            Inst::Phi { dst, ty, incoming } => {
                write!(f, "%{dst} = phi {ty} ")?;
                for (idx, (value, label)) in incoming.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[ {value}, %{label} ]")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Terminator {
    Ret(Option<Typed>),
    Br(String),
    CondBr {
        cond: Operand,
        then_label: String,
        else_label: String,
    },
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret(None) => f.write_str("ret void"),
            Terminator::Ret(Some(value)) => write!(f, "ret {value}"),
            Terminator::Br(label) => write!(f, "br label %{label}"),
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
            } => write!(f, "br i1 {cond}, label %{then_label}, label %{else_label}"),
        }
    }
}

/// A local or global name along with its sigil. Names holding characters
/// outside of `[-a-zA-Z$._0-9]` are quoted.
struct Name<'a> {
    sigil: char,
    name: &'a str,
}

fn local(name: &str) -> Name<'_> {
    Name { sigil: '%', name }
}

fn global(name: &str) -> Name<'_> {
    Name { sigil: '@', name }
}

impl Display for Name<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let is_plain = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | '.' | '_');
        let starts_with_digit = self.name.starts_with(|c: char| c.is_ascii_digit());
        if !self.name.is_empty() && !starts_with_digit && self.name.chars().all(is_plain) {
            return write!(f, "{}{}", self.sigil, self.name);
        }
        write!(f, "{}\"", self.sigil)?;
        for c in self.name.chars() {
            match c {
                '"' | '\\' => write!(f, "\\{:02X}", u32::from(c))?,
                c if c.is_control() => {
                    let mut buf = [0; 4];
                    for byte in c.encode_utf8(&mut buf).bytes() {
                        write!(f, "\\{byte:02X}")?;
                    }
                }
                c => write!(f, "{c}")?,
            }
        }
        write!(f, "\"")
    }
}

fn comma_separated<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_const_escapes() {
        let s = StringConst {
            name: ".str.0".into(),
            value: "say \"hi\"\n".into(),
        };
        assert_eq!(
            s.to_string(),
            r#"@.str.0 = private unnamed_addr constant [10 x i8] c"say \22hi\22\0A\00""#
        );
    }

    #[test]
    fn test_instructions() {
        let cases = [
            (
                Inst::Binary {
                    dst: "t.0".into(),
                    op: BinOp::Add,
                    ty: Type::I32,
                    lhs: Operand::Local("a".into()),
                    rhs: Operand::Int(1),
                },
                "%t.0 = add i32 %a, 1",
            ),
            (
                Inst::Cmp {
                    dst: "t.1".into(),
                    cmp: cmp::OGT,
                    ty: Type::Float,
                    lhs: Operand::Local("x".into()),
                    rhs: Operand::Local("y".into()),
                },
                "%t.1 = fcmp ogt float %x, %y",
            ),
            (
                Inst::Call {
                    dst: None,
                    ret: Type::Void,
                    callee: "print".into(),
                    args: vec![Typed(Type::Ptr, Operand::Local("t.2".into()))],
                },
                "call void @print(ptr %t.2)",
            ),
            (
                Inst::ElementPtr {
                    dst: "t.3".into(),
                    ty: Type::Named("f.state".into()),
                    base: Operand::Local("self.state".into()),
                    indices: vec![
                        Typed(Type::I32, Operand::Int(0)),
                        Typed(Type::I32, Operand::Int(2)),
                    ],
                },
                "%t.3 = getelementptr inbounds %f.state, ptr %self.state, i32 0, i32 2",
            ),
            (
                Inst::InsertValue {
                    dst: "t.4".into(),
                    aggregate: Typed(Type::Struct(vec![Type::I32, Type::I1]), Operand::Undef),
                    value: Typed(Type::I1, Operand::Bool(true)),
                    index: 1,
                },
                "%t.4 = insertvalue { i32, i1 } undef, i1 true, 1",
            ),
            (
                Inst::Phi {
                    dst: "t.5".into(),
                    ty: Type::I32,
                    incoming: vec![
                        (Operand::Int(0), "then.0".into()),
                        (Operand::Local("n".into()), "else.0".into()),
                    ],
                },
                "%t.5 = phi i32 [ 0, %then.0 ], [ %n, %else.0 ]",
            ),
        ];
        for (inst, expected) in cases {
            assert_eq!(inst.to_string(), expected);
        }
    }

    #[test]
    fn test_names_are_quoted_when_needed() {
        assert_eq!(Operand::Local("t.0".into()).to_string(), "%t.0");
        assert_eq!(Operand::Global(".str.1".into()).to_string(), "@.str.1");
        assert_eq!(Operand::Local("café".into()).to_string(), "%\"café\"");
        assert_eq!(Type::Named("café.state".into()).to_string(), "%\"café.state\"");
        let call = Inst::Call {
            dst: Some("t.1".into()),
            ret: Type::I32,
            callee: "δ".into(),
            args: vec![Typed(Type::I32, Operand::Local("x٣".into()))],
        };
        assert_eq!(call.to_string(), "%t.1 = call i32 @\"δ\"(i32 %\"x٣\")");
    }

    #[test]
    fn test_terminators() {
        let ret = Terminator::Ret(Some(Typed(Type::I32, Operand::Local("c".into()))));
        assert_eq!(ret.to_string(), "ret i32 %c");
        assert_eq!(Terminator::Ret(None).to_string(), "ret void");
        let br = Terminator::CondBr {
            cond: Operand::Local("t.0".into()),
            then_label: "then.0".into(),
            else_label: "else.0".into(),
        };
        assert_eq!(br.to_string(), "br i1 %t.0, label %then.0, label %else.0");
    }
}
