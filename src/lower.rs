use std::{
    collections::{HashMap, HashSet},
    fmt, mem,
};

use crate::{
    ast::{self, BinaryOperator, Const, Expr, ExprKind},
    ir::{self, cmp, BinOp, Inst, Operand, Terminator, Typed},
    token::{Span, Spanned},
    types::{builtins, Signature, SignatureKind, SignatureRegistry},
    util::intern::{Interned, Interner},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

pub type LowerResult<T> = std::result::Result<T, LowerError>;

/// Name of the instance state parameter of every node function. User names
/// can't contain dots, so this never clashes with a parameter.
pub const STATE_PARAM: &str = "self.state";

/// Label of the first block. Labels share a namespace with parameters, so
/// every label holds a dot.
pub const ENTRY_LABEL: &str = "entry.block";

/// Lowers a parsed file into a module with one function per node.
///
/// Every node signature is registered before any body is lowered, so a node
/// may call nodes declared after it.
pub fn lower_file(file: &ast::File, ident_interner: &Interner<str>) -> LowerResult<ir::Module> {
    let mut registry = SignatureRegistry::with_builtins(file.nodes.len());
    for node in &file.nodes {
        register(&mut registry, node).map_err(|error| LowerError {
            node: Some(node.name.name),
            error,
        })?;
    }
    log::debug!("registered {} node signatures", file.nodes.len());

    let calls = CallGraph::of_file(file);
    let mut module = ir::Module {
        declarations: builtins::ALL.iter().map(declaration).collect(),
        ..ir::Module::default()
    };

    for node in &file.nodes {
        let lowerer = NodeLowerer::new(ident_interner, &registry, &calls, &mut module.strings, node);
        let (state, function) = lowerer.lower().map_err(|error| LowerError {
            node: Some(node.name.name),
            error,
        })?;
        log::debug!(
            "lowered node `{}` into {} blocks",
            function.name,
            function.blocks.len()
        );
        module.state_types.push(state);
        module.functions.push(function);
    }
    Ok(module)
}

fn register(registry: &mut SignatureRegistry, node: &ast::Node) -> Result<()> {
    let name = node.name.name;
    if node.outputs.len() > 1 {
        if let Some(unit) = node.outputs.iter().find(|p| p.ty == ast::Type::Unit) {
            return Err(unit.name.span.wrap(Error::MixedUnitOutputs(unit.name.name)));
        }
    }

    registry
        .define(Signature::of_node(node))
        .map_err(|other_definition_span| {
            let error = if other_definition_span == builtins::SPAN {
                Error::RedefinedBuiltin(name)
            } else {
                Error::DuplicateNode {
                    name,
                    other_definition_span,
                }
            };
            node.name.span.wrap(error)
        })
}

fn declaration(builtin: &builtins::Builtin) -> ir::Declaration {
    let signature = builtin.signature();
    ir::Declaration {
        name: builtin.name.to_owned(),
        ret: return_ty(&signature),
        params: value_params(&signature.inputs).collect(),
    }
}

/// Machine types of the parameters which carry a value.
fn value_params(types: &[ast::Type]) -> impl Iterator<Item = ir::Type> + '_ {
    types
        .iter()
        .filter(|ty| **ty != ast::Type::Unit)
        .map(|ty| ValueTy::Scalar(*ty).ir())
}

/// The value type produced by a call to the given signature.
fn call_ty(signature: &Signature) -> ValueTy {
    let mut valued: Vec<_> = signature.valued_outputs().map(ValueTy::Scalar).collect();
    match valued.len() {
        0 => ValueTy::UNIT,
        1 => valued.remove(0),
        _ => ValueTy::Tuple(valued),
    }
}

fn return_ty(signature: &Signature) -> ir::Type {
    call_ty(signature).ir()
}

fn state_type_name(node: &str) -> String {
    format!("{node}.state")
}

/// The type of a lowered value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueTy {
    Scalar(ast::Type),
    /// At least two non unit elements.
    Tuple(Vec<ValueTy>),
}

impl ValueTy {
    pub const UNIT: ValueTy = ValueTy::Scalar(ast::Type::Unit);

    pub fn is_unit(&self) -> bool {
        *self == ValueTy::UNIT
    }

    pub fn ir(&self) -> ir::Type {
        match self {
            ValueTy::Scalar(ast::Type::Unit) => ir::Type::Void,
            ValueTy::Scalar(ast::Type::Bool) => ir::Type::I1,
            ValueTy::Scalar(ast::Type::Int) => ir::Type::I32,
            ValueTy::Scalar(ast::Type::Float) => ir::Type::Float,
            ValueTy::Scalar(ast::Type::String) => ir::Type::Ptr,
            ValueTy::Tuple(items) => ir::Type::Struct(items.iter().map(ValueTy::ir).collect()),
        }
    }
}

impl fmt::Display for ValueTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTy::Scalar(ty) => write!(f, "{ty}"),
            ValueTy::Tuple(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Value {
    ty: ValueTy,
    operand: Operand,
}

impl Value {
    /// Unit values have no runtime representation.
    fn unit() -> Value {
        Value {
            ty: ValueTy::UNIT,
            operand: Operand::Undef,
        }
    }

    fn typed(&self) -> Typed {
        Typed(self.ty.ir(), self.operand.clone())
    }
}

/// Which node calls which, used to reject recursion.
struct CallGraph {
    edges: HashMap<Interned<str>, Vec<Interned<str>>>,
}

impl CallGraph {
    fn of_file(file: &ast::File) -> CallGraph {
        fn callees<'e>(root: &'e Expr, stack: &mut Vec<&'e Expr>, out: &mut Vec<Interned<str>>) {
            stack.push(root);
            while let Some(expr) = stack.pop() {
                match &expr.kind {
                    ExprKind::Call { node, args } => {
                        out.push(node.name);
                        stack.extend(args);
                    }
                    ExprKind::Const(_) | ExprKind::Var(_) => {}
                    ExprKind::Tuple(items) => stack.extend(items),
                    ExprKind::Binary { lhs, rhs, .. } => stack.extend([&**lhs, &**rhs]),
                    ExprKind::If {
                        predicate,
                        then_arm,
                        else_arm,
                    } => stack.extend([&**predicate, &**then_arm, &**else_arm]),
                }
            }
        }

        let edges = file
            .nodes
            .iter()
            .map(|node| {
                let mut stack = Vec::new();
                let mut out = Vec::new();
                for assign in &node.body {
                    callees(&assign.body, &mut stack, &mut out);
                }
                (node.name.name, out)
            })
            .collect();
        CallGraph { edges }
    }

    /// Whether `from` eventually calls `to`, or is `to` itself.
    fn reaches(&self, from: Interned<str>, to: Interned<str>) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(callees) = self.edges.get(&current) {
                stack.extend(callees);
            }
        }
        false
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ParamKind {
    Input,
    Output,
    Local,
}

/// A followed-by whose right operand is lowered once every equation ran.
struct PendingFby<'a> {
    next: &'a Expr,
    /// `None` for unit values, which don't need a cell.
    field: Option<usize>,
    ty: ValueTy,
}

struct NodeLowerer<'a> {
    idents: &'a Interner<str>,
    registry: &'a SignatureRegistry,
    calls: &'a CallGraph,
    strings: &'a mut Vec<ir::StringConst>,
    node: &'a ast::Node,
    state_name: String,
    /// Field zero is the activation flag.
    state_fields: Vec<ir::Type>,
    params: HashMap<Interned<str>, (ParamKind, ast::Type)>,
    env: HashMap<Interned<str>, Value>,
    assigned: HashMap<Interned<str>, Span>,
    pending: Vec<PendingFby<'a>>,
    blocks: Vec<ir::Block>,
    label: String,
    insts: Vec<Inst>,
    next_temp: usize,
    next_label: usize,
}

impl<'a> NodeLowerer<'a> {
    fn new(
        idents: &'a Interner<str>,
        registry: &'a SignatureRegistry,
        calls: &'a CallGraph,
        strings: &'a mut Vec<ir::StringConst>,
        node: &'a ast::Node,
    ) -> NodeLowerer<'a> {
        let params = [
            (ParamKind::Input, &node.inputs),
            (ParamKind::Output, &node.outputs),
            (ParamKind::Local, &node.locals),
        ]
        .into_iter()
        .flat_map(|(kind, params)| params.iter().map(move |p| (p.name.name, (kind, p.ty))))
        .collect();

        NodeLowerer {
            idents,
            registry,
            calls,
            strings,
            node,
            state_name: state_type_name(idents.get(node.name)),
            state_fields: vec![ir::Type::I1],
            params,
            env: HashMap::with_capacity(node.inputs.len() + node.outputs.len() + node.locals.len()),
            assigned: HashMap::new(),
            pending: Vec::new(),
            blocks: Vec::with_capacity(1),
            label: ENTRY_LABEL.to_owned(),
            insts: Vec::with_capacity(16),
            next_temp: 0,
            next_label: 0,
        }
    }

    fn lower(mut self) -> Result<(ir::StateType, ir::Function)> {
        let node = self.node;
        let mut params = vec![(ir::Type::Ptr, STATE_PARAM.to_owned())];
        for input in &node.inputs {
            let value = if input.ty == ast::Type::Unit {
                Value::unit()
            } else {
                let name = self.idents.get(input.name).to_owned();
                let ty = ValueTy::Scalar(input.ty);
                params.push((ty.ir(), name.clone()));
                Value {
                    ty,
                    operand: Operand::Local(name),
                }
            };
            self.env.insert(input.name.name, value);
        }

        for assign in &node.body {
            self.lower_assign(assign)?;
        }
        for output in &node.outputs {
            if !self.assigned.contains_key(&output.name.name) {
                let error = Error::UnassignedOutput(output.name.name);
                return Err(output.name.span.wrap(error));
            }
        }

        // Lowering a pending operand may queue nested ones.
        let mut idx = 0;
        while let Some(pending) = self.pending.get(idx) {
            let (next, field, ty) = (pending.next, pending.field, pending.ty.clone());
            let value = self.lower_expr(next)?;
            expect_ty(&ty, &value, next.span)?;
            if let Some(field) = field {
                let ptr = self.field_ptr(field);
                self.push(Inst::Store {
                    value: value.typed(),
                    ptr,
                });
            }
            idx += 1;
        }

        let flag = self.field_ptr(0);
        self.push(Inst::Store {
            value: Typed(ir::Type::I1, Operand::Bool(true)),
            ptr: flag,
        });

        let ret = self.return_value();
        let ret_ty = ret.as_ref().map_or(ir::Type::Void, |r| r.0.clone());
        self.finish_block(Terminator::Ret(ret));

        let state = ir::StateType {
            name: self.state_name,
            fields: self.state_fields,
        };
        let function = ir::Function {
            name: self.idents.get(node.name).to_owned(),
            ret: ret_ty,
            params,
            blocks: self.blocks,
        };
        Ok((state, function))
    }

    /// Packs the valued outputs, in declaration order.
    fn return_value(&mut self) -> Option<Typed> {
        let outputs: Vec<Value> = self
            .node
            .outputs
            .iter()
            .filter(|p| p.ty != ast::Type::Unit)
            .map(|p| self.env[&p.name.name].clone())
            .collect();
        match outputs.as_slice() {
            [] => None,
            [single] => Some(single.typed()),
            _ => {
                let ty = ValueTy::Tuple(outputs.iter().map(|v| v.ty.clone()).collect());
                Some(self.build_struct(&ty, &outputs).typed())
            }
        }
    }

    fn lower_assign(&mut self, assign: &'a ast::Assign) -> Result<()> {
        let mut declared = Vec::with_capacity(assign.destinations.len());
        for dst in &assign.destinations {
            let name = dst.name;
            let ty = match self.params.get(&name) {
                None => return Err(dst.span.wrap(Error::UnknownAssignTarget(name))),
                Some((ParamKind::Input, _)) => return Err(dst.span.wrap(Error::AssignToInput(name))),
                Some((ParamKind::Output | ParamKind::Local, ty)) => *ty,
            };
            if let Some(&other_assignment_span) = self.assigned.get(&name) {
                let error = Error::Reassigned {
                    name,
                    other_assignment_span,
                };
                return Err(dst.span.wrap(error));
            }
            self.assigned.insert(name, dst.span);
            declared.push(ValueTy::Scalar(ty));
        }

        let body = &assign.body;
        let value = self.lower_expr(body)?;

        if let [dst] = assign.destinations.as_slice() {
            expect_ty(&declared[0], &value, body.span)?;
            self.env.insert(dst.name, value);
            return Ok(());
        }

        let items = match &value.ty {
            ValueTy::Tuple(items) if items.len() == declared.len() => items.clone(),
            ValueTy::Tuple(items) => {
                let error = Error::ArityMismatch {
                    expected: declared.len(),
                    actual: items.len(),
                };
                return Err(body.span.wrap(error));
            }
            ValueTy::Scalar(_) => {
                let error = Error::ArityMismatch {
                    expected: declared.len(),
                    actual: 1,
                };
                return Err(body.span.wrap(error));
            }
        };
        for (index, ((dst, expected), actual)) in
            assign.destinations.iter().zip(&declared).zip(items).enumerate()
        {
            if *expected != actual {
                let error = Error::Mismatch {
                    expected: expected.clone(),
                    actual,
                };
                return Err(body.span.wrap(error));
            }
            let dst_temp = self.temp();
            self.push(Inst::ExtractValue {
                dst: dst_temp.clone(),
                aggregate: value.typed(),
                index,
            });
            let item = Value {
                ty: actual,
                operand: Operand::Local(dst_temp),
            };
            self.env.insert(dst.name, item);
        }
        Ok(())
    }

    fn lower_expr(&mut self, expr: &'a Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Const(Const::Int(int)) => Ok(Value {
                ty: ValueTy::Scalar(ast::Type::Int),
                operand: Operand::Int(i64::from(*int)),
            }),
            ExprKind::Const(Const::Bool(bool)) => Ok(Value {
                ty: ValueTy::Scalar(ast::Type::Bool),
                operand: Operand::Bool(*bool),
            }),
            ExprKind::Const(Const::String(string)) => Ok(self.lower_string(string)),
            ExprKind::Var(ident) => self
                .env
                .get(&ident.name)
                .cloned()
                .ok_or_else(|| expr.span.wrap(Error::UndefinedVariable(ident.name))),
            ExprKind::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.lower_expr(item)?;
                    if value.ty.is_unit() {
                        return Err(item.span.wrap(Error::UnitInTuple));
                    }
                    values.push(value);
                }
                let ty = ValueTy::Tuple(values.iter().map(|v| v.ty.clone()).collect());
                Ok(self.build_struct(&ty, &values))
            }
            ExprKind::Call { node, args } => self.lower_call(expr.span, *node, args),
            ExprKind::Binary { .. } => self.lower_chain(expr),
            ExprKind::If {
                predicate,
                then_arm,
                else_arm,
            } => self.lower_if(predicate, then_arm, else_arm),
        }
    }

    fn lower_string(&mut self, string: &str) -> Value {
        let global = ir::StringConst {
            name: format!(".str.{}", self.strings.len()),
            value: string.into(),
        };
        let dst = self.temp();
        let zero = Typed(ir::Type::I64, Operand::Int(0));
        self.push(Inst::ElementPtr {
            dst: dst.clone(),
            ty: global.array_ty(),
            base: Operand::Global(global.name.clone()),
            indices: vec![zero.clone(), zero],
        });
        self.strings.push(global);
        Value {
            ty: ValueTy::Scalar(ast::Type::String),
            operand: Operand::Local(dst),
        }
    }

    fn lower_call(&mut self, span: Span, callee: ast::Ident, args: &'a [Expr]) -> Result<Value> {
        let registry = self.registry;
        let Some(signature) = registry.get(callee.name) else {
            return Err(callee.span.wrap(Error::UndefinedNode(callee.name)));
        };
        if signature.kind == SignatureKind::Node && self.calls.reaches(callee.name, self.node.name.name) {
            return Err(span.wrap(Error::RecursiveNode(callee.name)));
        }
        if args.len() != signature.inputs.len() {
            let error = Error::ArgumentCount {
                node: callee.name,
                expected: signature.inputs.len(),
                actual: args.len(),
            };
            return Err(span.wrap(error));
        }

        let mut typed_args = Vec::with_capacity(args.len() + 1);
        for (arg, ty) in args.iter().zip(&signature.inputs) {
            let value = self.lower_expr(arg)?;
            expect_ty(&ValueTy::Scalar(*ty), &value, arg.span)?;
            if !value.ty.is_unit() {
                typed_args.push(value.typed());
            }
        }

        let callee_name = self.idents.get(callee.name);
        if signature.is_stateful() {
            let field = self.state_fields.len();
            self.state_fields
                .push(ir::Type::Named(state_type_name(callee_name)));
            let state = self.field_ptr(field);
            typed_args.insert(0, Typed(ir::Type::Ptr, state));
        }

        let ty = call_ty(signature);
        let ret = ty.ir();
        let dst = (!ty.is_unit()).then(|| self.temp());
        self.push(Inst::Call {
            dst: dst.clone(),
            ret,
            callee: callee_name.to_owned(),
            args: typed_args,
        });
        Ok(match dst {
            Some(dst) => Value {
                ty,
                operand: Operand::Local(dst),
            },
            None => Value::unit(),
        })
    }

    /// Lowers a right nested operator chain without recursing along it.
    ///
    /// Operands are lowered left to right, then the operators are applied
    /// from the right. A followed-by ends the chain, since its right
    /// operand is lowered once every equation ran.
    fn lower_chain(&mut self, expr: &'a Expr) -> Result<Value> {
        let mut pending = Vec::new();
        let mut current = expr;
        let mut value = loop {
            match &current.kind {
                ExprKind::Binary {
                    op: BinaryOperator::Fby,
                    lhs,
                    rhs,
                } => break self.lower_fby(lhs, rhs)?,
                ExprKind::Binary { op, lhs, rhs } => {
                    let l = self.lower_expr(lhs)?;
                    pending.push((*op, l, lhs.span, rhs.span));
                    current = &**rhs;
                }
                _ => break self.lower_expr(current)?,
            }
        };
        while let Some((op, l, lhs_span, rhs_span)) = pending.pop() {
            value = self.lower_arithmetic(op, l, lhs_span, value, rhs_span)?;
        }
        Ok(value)
    }

    fn lower_arithmetic(
        &mut self,
        op: BinaryOperator,
        l: Value,
        lhs_span: Span,
        r: Value,
        rhs_span: Span,
    ) -> Result<Value> {
        let is_float = match l.ty {
            ValueTy::Scalar(ast::Type::Int) => false,
            ValueTy::Scalar(ast::Type::Float) => true,
            _ => {
                let error = Error::Mismatch {
                    expected: ValueTy::Scalar(ast::Type::Int),
                    actual: l.ty,
                };
                return Err(lhs_span.wrap(error));
            }
        };
        expect_ty(&l.ty, &r, rhs_span)?;

        let dst = self.temp();
        let (inst, ty) = match (op, is_float) {
            (BinaryOperator::Plus | BinaryOperator::Minus, _) => {
                let bin = match (op, is_float) {
                    (BinaryOperator::Plus, false) => BinOp::Add,
                    (BinaryOperator::Plus, true) => BinOp::FAdd,
                    (_, false) => BinOp::Sub,
                    (_, true) => BinOp::FSub,
                };
                let inst = Inst::Binary {
                    dst: dst.clone(),
                    op: bin,
                    ty: l.ty.ir(),
                    lhs: l.operand,
                    rhs: r.operand,
                };
                (inst, l.ty)
            }
            (BinaryOperator::Lt | BinaryOperator::Gt, _) => {
                let cmp = match (op, is_float) {
                    (BinaryOperator::Lt, false) => cmp::SLT,
                    (BinaryOperator::Lt, true) => cmp::OLT,
                    (_, false) => cmp::SGT,
                    (_, true) => cmp::OGT,
                };
                let inst = Inst::Cmp {
                    dst: dst.clone(),
                    cmp,
                    ty: l.ty.ir(),
                    lhs: l.operand,
                    rhs: r.operand,
                };
                (inst, ValueTy::Scalar(ast::Type::Bool))
            }
            (BinaryOperator::Fby, _) => unreachable!("fby is lowered apart"),
        };
        self.push(inst);
        Ok(Value {
            ty,
            operand: Operand::Local(dst),
        })
    }

    /// On the first activation the value is `init`. Later it is the cell
    /// written by the previous activation.
    fn lower_fby(&mut self, init: &'a Expr, next: &'a Expr) -> Result<Value> {
        let n = self.label_id();
        let first_label = format!("fby.first.{n}");
        let later_label = format!("fby.later.{n}");
        let join_label = format!("fby.join.{n}");

        let flag_ptr = self.field_ptr(0);
        let flag = self.temp();
        self.push(Inst::Load {
            dst: flag.clone(),
            ty: ir::Type::I1,
            ptr: flag_ptr,
        });
        let branch = Terminator::CondBr {
            cond: Operand::Local(flag),
            then_label: later_label.clone(),
            else_label: first_label.clone(),
        };
        self.start_block(branch, first_label);

        let first = self.lower_expr(init)?;
        let first_end = self.start_block(Terminator::Br(join_label.clone()), later_label.clone());

        let field = (!first.ty.is_unit()).then(|| {
            self.state_fields.push(first.ty.ir());
            self.state_fields.len() - 1
        });
        let previous = field.map(|field| {
            let ptr = self.field_ptr(field);
            let dst = self.temp();
            self.push(Inst::Load {
                dst: dst.clone(),
                ty: first.ty.ir(),
                ptr,
            });
            dst
        });
        self.start_block(Terminator::Br(join_label.clone()), join_label);

        self.pending.push(PendingFby {
            next,
            field,
            ty: first.ty.clone(),
        });

        let Some(previous) = previous else {
            return Ok(Value::unit());
        };
        let dst = self.temp();
        self.push(Inst::Phi {
            dst: dst.clone(),
            ty: first.ty.ir(),
            incoming: vec![
                (first.operand, first_end),
                (Operand::Local(previous), later_label),
            ],
        });
        Ok(Value {
            ty: first.ty,
            operand: Operand::Local(dst),
        })
    }

    fn lower_if(&mut self, predicate: &'a Expr, then_arm: &'a Expr, else_arm: &'a Expr) -> Result<Value> {
        let cond = self.lower_expr(predicate)?;
        expect_ty(&ValueTy::Scalar(ast::Type::Bool), &cond, predicate.span)?;

        let n = self.label_id();
        let then_label = format!("then.{n}");
        let else_label = format!("else.{n}");
        let join_label = format!("join.{n}");

        let branch = Terminator::CondBr {
            cond: cond.operand,
            then_label: then_label.clone(),
            else_label: else_label.clone(),
        };
        self.start_block(branch, then_label);
        let then_value = self.lower_expr(then_arm)?;
        let then_end = self.start_block(Terminator::Br(join_label.clone()), else_label);
        let else_value = self.lower_expr(else_arm)?;
        expect_ty(&then_value.ty, &else_value, else_arm.span)?;
        let else_end = self.start_block(Terminator::Br(join_label.clone()), join_label);

        if then_value.ty.is_unit() {
            return Ok(Value::unit());
        }
        let dst = self.temp();
        self.push(Inst::Phi {
            dst: dst.clone(),
            ty: then_value.ty.ir(),
            incoming: vec![
                (then_value.operand, then_end),
                (else_value.operand, else_end),
            ],
        });
        Ok(Value {
            ty: then_value.ty,
            operand: Operand::Local(dst),
        })
    }

    /// Builds a literal struct of the given tuple type, left to right.
    fn build_struct(&mut self, ty: &ValueTy, values: &[Value]) -> Value {
        let ir_ty = ty.ir();
        let mut aggregate = Operand::Undef;
        for (index, value) in values.iter().enumerate() {
            let dst = self.temp();
            self.push(Inst::InsertValue {
                dst: dst.clone(),
                aggregate: Typed(ir_ty.clone(), aggregate),
                value: value.typed(),
                index,
            });
            aggregate = Operand::Local(dst);
        }
        Value {
            ty: ty.clone(),
            operand: aggregate,
        }
    }

    /// Emits the address of a field of the instance state.
    fn field_ptr(&mut self, field: usize) -> Operand {
        let dst = self.temp();
        let index = i64::try_from(field).unwrap_or(i64::MAX);
        self.push(Inst::ElementPtr {
            dst: dst.clone(),
            ty: ir::Type::Named(self.state_name.clone()),
            base: Operand::Local(STATE_PARAM.to_owned()),
            indices: vec![
                Typed(ir::Type::I32, Operand::Int(0)),
                Typed(ir::Type::I32, Operand::Int(index)),
            ],
        });
        Operand::Local(dst)
    }

    fn push(&mut self, inst: Inst) {
        self.insts.push(inst);
    }

    /// Terminates the current block and starts a new one with the given
    /// label. Returns the label of the terminated block.
    fn start_block(&mut self, terminator: Terminator, label: String) -> String {
        let ended = mem::replace(&mut self.label, label);
        self.blocks.push(ir::Block {
            label: ended.clone(),
            insts: mem::take(&mut self.insts),
            terminator,
        });
        ended
    }

    fn finish_block(&mut self, terminator: Terminator) {
        let label = mem::take(&mut self.label);
        self.blocks.push(ir::Block {
            label,
            insts: mem::take(&mut self.insts),
            terminator,
        });
    }

    fn temp(&mut self) -> String {
        let n = self.next_temp;
        self.next_temp += 1;
        format!("t.{n}")
    }

    fn label_id(&mut self) -> usize {
        let n = self.next_label;
        self.next_label += 1;
        n
    }
}

fn expect_ty(expected: &ValueTy, value: &Value, span: Span) -> Result<()> {
    if *expected == value.ty {
        return Ok(());
    }
    let error = Error::Mismatch {
        expected: expected.clone(),
        actual: value.ty.clone(),
    };
    Err(span.wrap(error))
}

/// A lowering error, along with the node where it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowerError {
    pub node: Option<Interned<str>>,
    pub error: Spanned<Error>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    DuplicateNode {
        name: Interned<str>,
        other_definition_span: Span,
    },
    RedefinedBuiltin(Interned<str>),
    UndefinedNode(Interned<str>),
    UndefinedVariable(Interned<str>),
    AssignToInput(Interned<str>),
    UnknownAssignTarget(Interned<str>),
    Reassigned {
        name: Interned<str>,
        other_assignment_span: Span,
    },
    UnassignedOutput(Interned<str>),
    ArityMismatch {
        expected: usize,
        actual: usize,
    },
    ArgumentCount {
        node: Interned<str>,
        expected: usize,
        actual: usize,
    },
    Mismatch {
        expected: ValueTy,
        actual: ValueTy,
    },
    UnitInTuple,
    MixedUnitOutputs(Interned<str>),
    RecursiveNode(Interned<str>),
}
