use std::collections::HashMap;

use crate::{ast, token::Span, util::intern::Interned};

/// Maps node names to their signatures.
///
/// Every signature is registered before any node body is lowered, so calls
/// may refer to nodes declared later in the file.
pub struct SignatureRegistry {
    map: HashMap<Interned<str>, Signature>,
}

impl SignatureRegistry {
    pub fn with_capacity(capacity: usize) -> SignatureRegistry {
        SignatureRegistry {
            map: HashMap::with_capacity(capacity),
        }
    }

    /// A registry which already holds every builtin.
    pub fn with_builtins(capacity: usize) -> SignatureRegistry {
        let mut registry = SignatureRegistry::with_capacity(capacity + builtins::ALL.len());
        for builtin in builtins::ALL {
            registry
                .define(builtin.signature())
                .unwrap_or_else(|_| unreachable!("builtins are unique"));
        }
        registry
    }

    pub fn get(&self, name: Interned<str>) -> Option<&Signature> {
        self.map.get(&name)
    }

    /// Attempts to define the provided signature.
    ///
    /// Fails with the span of the previous definition if the name is taken.
    pub fn define(&mut self, signature: Signature) -> Result<(), Span> {
        if let Some(other) = self.map.get(&signature.name) {
            return Err(other.span);
        }
        self.map.insert(signature.name, signature);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub name: Interned<str>,
    /// Definition site.
    pub span: Span,
    pub inputs: Vec<ast::Type>,
    pub outputs: Vec<ast::Type>,
    pub kind: SignatureKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignatureKind {
    /// Provided by the runtime library. Has no instance state.
    Builtin,
    /// Defined in the source file. Takes an instance state pointer.
    Node,
}

impl Signature {
    pub fn of_node(node: &ast::Node) -> Signature {
        let types = |params: &[ast::Param]| -> Vec<ast::Type> { params.iter().map(|p| p.ty).collect() };
        Signature {
            name: node.name.name,
            span: node.name.span,
            inputs: types(&node.inputs),
            outputs: types(&node.outputs),
            kind: SignatureKind::Node,
        }
    }

    pub fn is_stateful(&self) -> bool {
        self.kind == SignatureKind::Node
    }

    /// The outputs that carry a value, that is, all but the unit ones.
    pub fn valued_outputs(&self) -> impl Iterator<Item = ast::Type> + '_ {
        self.outputs
            .iter()
            .copied()
            .filter(|ty| *ty != ast::Type::Unit)
    }
}

pub mod builtins {
    use super::*;

    pub struct Builtin {
        pub id: Interned<str>,
        pub name: &'static str,
        pub inputs: &'static [ast::Type],
        pub outputs: &'static [ast::Type],
    }

    impl Builtin {
        pub fn signature(&self) -> Signature {
            Signature {
                name: self.id,
                span: SPAN,
                inputs: self.inputs.to_vec(),
                outputs: self.outputs.to_vec(),
                kind: SignatureKind::Builtin,
            }
        }
    }

    /// Builtins have no definition site.
    pub const SPAN: Span = Span::new_of_length(0, 0);

    pub const PRINT: Interned<str> = Interned::from_raw(1);

    /// Pre-interned, in handle order.
    pub const ALL: &[Builtin] = &[Builtin {
        id: PRINT,
        name: "print",
        inputs: &[ast::Type::String],
        outputs: &[ast::Type::Unit],
    }];
}
