use crate::errors::{OpalError, Result};

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f64),
    Bool(bool),
    String(String),
}

impl Value {
    /// The node name used by [`Node::dump`].
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Float(_)   => "Float",
            Value::Bool(_)    => "Boolean",
            Value::String(_)  => "String",
        }
    }

    /// The type name a literal contributes when it is returned from an
    /// untyped method, e.g. `return 10` makes the method return `Cint32`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Cint32",
            Value::Float(_)   => "Float",
            Value::Bool(_)    => "Bool",
            Value::String(_)  => "String",
        }
    }

    /// Bare rendering used when a literal is an operand of a binary op.
    fn raw(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Float(v)   => format!("{v:?}"),
            Value::Bool(v)    => v.to_string(),
            Value::String(s)  => format!("\"{s}\""),
        }
    }

    fn dump(&self) -> String {
        match self {
            Value::Integer(v) => format!("(Integer {v})"),
            Value::Float(v)   => format!("(Float {v:?})"),
            Value::Bool(v)    => format!("(Boolean {v})"),
            Value::String(s)  => format!("(String {s})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq  => "==",
            Comparison::Neq => "!=",
            Comparison::Gt  => ">",
            Comparison::Gte => ">=",
            Comparison::Lt  => "<",
            Comparison::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOperator {
    Add,
    Sub,
    Mul,
    Div,
    Assign,
    Comparison(Comparison),
}

impl BinOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOperator::Add => "+",
            BinOperator::Sub => "-",
            BinOperator::Mul => "*",
            BinOperator::Div => "/",
            BinOperator::Assign => "=",
            BinOperator::Comparison(cmp) => cmp.symbol(),
        }
    }

    fn kind_name(self) -> &'static str {
        match self {
            BinOperator::Add => "Add",
            BinOperator::Sub => "Sub",
            BinOperator::Mul => "Mul",
            BinOperator::Div => "Div",
            BinOperator::Assign => "Assign",
            BinOperator::Comparison(Comparison::Eq)  => "Equals",
            BinOperator::Comparison(Comparison::Neq) => "Unequals",
            BinOperator::Comparison(Comparison::Gt)  => "GreaterThan",
            BinOperator::Comparison(Comparison::Gte) => "GreaterThanEqual",
            BinOperator::Comparison(Comparison::Lt)  => "LessThan",
            BinOperator::Comparison(Comparison::Lte) => "LessThanEqual",
        }
    }
}

/// An ordered statement sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Node>,
}

impl Block {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }

    pub fn dump(&self) -> String {
        let stmts: Vec<String> = self.statements.iter().map(Node::dump).collect();
        format!("(Block\n  {})", stmts.join("\n"))
    }
}

/// A single method parameter: `name` or `name::Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
}

impl Param {
    pub fn dump(&self) -> String {
        match &self.type_name {
            Some(ty) => format!("{}::{ty}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A method or constructor declared inside a class.
#[derive(Debug, Clone, PartialEq)]
pub struct Funktion {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub ret_type: Option<String>,
    pub is_constructor: bool,
}

impl Funktion {
    /// The zero-argument `init` given to classes that declare none.
    pub fn default_constructor() -> Self {
        Self {
            name: "init".to_string(),
            params: Vec::new(),
            body: Block::default(),
            ret_type: None,
            is_constructor: true,
        }
    }

    pub fn dump(&self) -> String {
        let params: Vec<String> = self.params.iter().map(Param::dump).collect();
        let ret = self.ret_type.as_ref().map(|t| format!("{t} ")).unwrap_or_default();
        let marker = if self.is_constructor { ":" } else { "" };
        format!("({ret}{marker}{}({}) {})", self.name, params.join(","), self.body.dump())
    }
}

/// A class declaration. Methods live in the body as [`Node::Funktion`]
/// statements, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Klass {
    pub name: String,
    pub body: Block,
    /// `None` only for the root class `Object`.
    pub parent: Option<String>,
}

impl Klass {
    pub fn functions(&self) -> impl Iterator<Item = &Funktion> {
        self.body.statements.iter().filter_map(|stmt| match stmt {
            Node::Funktion(f) => Some(f),
            _ => None,
        })
    }

    pub fn has_constructor(&self) -> bool {
        self.functions().any(|f| f.is_constructor)
    }

    pub fn dump(&self) -> String {
        format!("(class {}{})", self.name, self.body.dump())
    }
}

/// An AST node. Immutable once the parser has built it.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Value(Value),
    /// Assignment target.
    Var(String),
    /// Variable load.
    VarValue(String),
    BinaryOp {
        op: BinOperator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    If {
        cond: Box<Node>,
        then_: Block,
        else_: Option<Block>,
    },
    While {
        cond: Box<Node>,
        body: Block,
    },
    For {
        var: String,
        iterable: Box<Node>,
        body: Block,
    },
    Break,
    Continue,
    Return(Box<Node>),
    Print(Box<Node>),
    List(Vec<Node>),
    IndexOf {
        list: Box<Node>,
        index: Box<Node>,
    },
    Klass(Klass),
    Funktion(Funktion),
    /// Instantiation: `Foo(args)`.
    Call {
        class_name: String,
        args: Vec<Node>,
    },
    /// `instance.method(args)`.
    MethodCall {
        instance: String,
        method: String,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn binary(op: BinOperator, lhs: Node, rhs: Node) -> Self {
        Node::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn assign(name: impl Into<String>, rhs: Node) -> Self {
        Node::binary(BinOperator::Assign, Node::Var(name.into()), rhs)
    }

    /// Literals and variable references.
    pub fn is_value(&self) -> bool {
        matches!(self, Node::Value(_) | Node::Var(_) | Node::VarValue(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Block(_) => "Block",
            Node::Value(v) => v.kind_name(),
            Node::Var(_) => "Var",
            Node::VarValue(_) => "VarValue",
            Node::BinaryOp { op, .. } => op.kind_name(),
            Node::If { .. } => "If",
            Node::While { .. } => "While",
            Node::For { .. } => "For",
            Node::Break => "Break",
            Node::Continue => "Continue",
            Node::Return(_) => "Return",
            Node::Print(_) => "Print",
            Node::List(_) => "List",
            Node::IndexOf { .. } => "IndexOf",
            Node::Klass(_) => "Klass",
            Node::Funktion(_) => "Funktion",
            Node::Call { .. } => "Call",
            Node::MethodCall { .. } => "MethodCall",
        }
    }

    /// Structural debug rendering.
    pub fn dump(&self) -> String {
        match self {
            Node::Block(block) => block.dump(),
            Node::Value(v) => v.dump(),
            Node::Var(name) => format!("(Var {name})"),
            Node::VarValue(name) => format!("(VarValue {name})"),
            Node::BinaryOp { op, lhs, rhs } => {
                format!("({} {} {})", op.symbol(), lhs.operand_dump(), rhs.operand_dump())
            }
            Node::If { cond, then_, else_ } => {
                let else_ = else_.as_ref().map(|b| format!(" Else({})", b.dump())).unwrap_or_default();
                format!("If({}) Then({})){else_}", cond.dump(), then_.dump())
            }
            Node::While { cond, body } => format!("While({}) {}", cond.dump(), body.dump()),
            Node::For { var, iterable, body } => {
                format!("For((Var {var}) in {}) {}", iterable.dump(), body.dump())
            }
            Node::Break => "Break".to_string(),
            Node::Continue => "Continue".to_string(),
            Node::Return(val) => format!("(Return {})", val.dump()),
            Node::Print(val) => format!("(Print {})", val.dump()),
            Node::List(items) => {
                let items: Vec<String> = items.iter().map(Node::dump).collect();
                format!("[{}]", items.join(", "))
            }
            Node::IndexOf { list, index } => {
                format!("(position {} {})", index.operand_dump(), list.dump())
            }
            Node::Klass(klass) => klass.dump(),
            Node::Funktion(func) => func.dump(),
            Node::Call { class_name, args } => {
                let args: Vec<String> = args.iter().map(Node::dump).collect();
                format!("{class_name}({})", args.join(", "))
            }
            Node::MethodCall { instance, method, args } => {
                let args: Vec<String> = args.iter().map(Node::dump).collect();
                format!("({instance}.{method} {})", args.join(", "))
            }
        }
    }

    fn operand_dump(&self) -> String {
        match self {
            Node::Value(v) => v.raw(),
            Node::Var(name) | Node::VarValue(name) => name.clone(),
            other => other.dump(),
        }
    }

    /// Structural equality that refuses to compare unrelated node families.
    pub fn try_eq(&self, other: &Node) -> Result<bool> {
        let family = if self.is_value() && !other.is_value() {
            Some("Value")
        } else if matches!(self, Node::BinaryOp { .. }) && !matches!(other, Node::BinaryOp { .. }) {
            Some("BinaryOp")
        } else {
            None
        };

        if let Some(family) = family {
            return Err(OpalError::Logic(format!(
                "You can't compare a {family} and {}.\nTokens being compared:\n{}\n{}",
                other.kind_name(),
                self.dump(),
                other.dump(),
            )));
        }
        Ok(self == other)
    }
}

/// The root node: the implicit entry function's statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub block: Block,
}

impl Program {
    pub fn new(block: Block) -> Self {
        Self { block }
    }

    /// Class declarations in source order.
    pub fn classes(&self) -> Vec<&Klass> {
        self.block
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Node::Klass(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn dump(&self) -> String {
        format!("(Program\n  {})", self.block.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i32) -> Node {
        Node::Value(Value::Integer(v))
    }

    #[test]
    fn dumps_programs_and_binops() {
        let program = Program::new(Block::new(vec![Node::binary(BinOperator::Add, int(1), int(10))]));
        assert_eq!(program.dump(), "(Program\n  (Block\n  (+ 1 10)))");
    }

    #[test]
    fn dumps_nested_operands() {
        let node = Node::binary(
            BinOperator::Add,
            int(1),
            Node::binary(BinOperator::Mul, int(2), int(3)),
        );
        assert_eq!(node.dump(), "(+ 1 (* 2 3))");
    }

    #[test]
    fn dumps_literals() {
        assert_eq!(Node::Value(Value::Float(1.0)).dump(), "(Float 1.0)");
        assert_eq!(Node::Value(Value::String("andrea".into())).dump(), "(String andrea)");
        assert_eq!(Node::Value(Value::Bool(true)).dump(), "(Boolean true)");
    }

    #[test]
    fn dumps_assignment_of_instance() {
        let node = Node::assign(
            "item",
            Node::Call {
                class_name: "Foo".into(),
                args: vec![int(1), Node::Value(Value::String("bee".into())), Node::VarValue("c".into())],
            },
        );
        assert_eq!(node.dump(), "(= item Foo((Integer 1), (String bee), (VarValue c)))");
    }

    #[test]
    fn dumps_methods_inside_classes() {
        let method = Funktion {
            name: "do_it".into(),
            params: vec![Param { name: "val".into(), type_name: Some("Cint32".into()) }],
            body: Block::new(vec![Node::Value(Value::Bool(true))]),
            ret_type: Some("Cint32".into()),
            is_constructor: false,
        };
        let klass = Klass {
            name: "Integer".into(),
            body: Block::new(vec![Node::Funktion(method)]),
            parent: Some("Object".into()),
        };
        assert_eq!(
            klass.dump(),
            "(class Integer(Block\n  (Cint32 do_it(val::Cint32) (Block\n  (Boolean true)))))"
        );
    }

    #[test]
    fn values_compare_by_kind_and_payload() {
        assert!(int(1).try_eq(&int(1)).unwrap());
        assert!(!int(1).try_eq(&int(2)).unwrap());
        assert!(!int(1).try_eq(&Node::Value(Value::Float(1.0))).unwrap());
    }

    #[test]
    fn comparing_value_with_binop_is_a_logic_error() {
        let add = Node::binary(BinOperator::Add, int(81), int(14));
        let err = int(1).try_eq(&add).unwrap_err();
        assert!(matches!(err, OpalError::Logic(_)));
        assert_eq!(
            err.to_string(),
            "You can't compare a Value and Add.\nTokens being compared:\n(Integer 1)\n(+ 81 14)"
        );
    }

    #[test]
    fn comparing_binop_with_value_is_a_logic_error() {
        let add = Node::binary(BinOperator::Add, int(18), int(120));
        let err = add.try_eq(&int(1)).unwrap_err();
        assert!(err.to_string().starts_with("You can't compare a BinaryOp and Integer."));
    }

    #[test]
    fn synthesized_constructor_is_marked() {
        assert_eq!(Funktion::default_constructor().dump(), "(:init() (Block\n  ))");
    }
}
