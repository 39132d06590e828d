//! The shape in which a front-end hands methods to the engine.
//!
//! Overloads are resolved by the front-end: every method gets its own key, and static or
//! non-virtual calls name the callee by that key.

use crate::analysis::analysis_result::{AnalysisError, Result};
use crate::analysis::memory::expression::ExpressionType;
use crate::analysis::memory::symbolic_value::SymbolicValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclaredType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Class(Rc<String>),
}

impl DeclaredType {
    pub fn class(name: &str) -> Self {
        DeclaredType::Class(Rc::new(name.to_string()))
    }

    pub fn expression_type(&self) -> ExpressionType {
        match self {
            DeclaredType::Boolean => ExpressionType::Bool,
            DeclaredType::Byte => ExpressionType::I8,
            DeclaredType::Short => ExpressionType::I16,
            DeclaredType::Char => ExpressionType::Char,
            DeclaredType::Int => ExpressionType::I32,
            DeclaredType::Long => ExpressionType::I64,
            DeclaredType::Class(..) => ExpressionType::Reference,
        }
    }

    pub fn class_name(&self) -> Option<&Rc<String>> {
        match self {
            DeclaredType::Class(name) => Some(name),
            _ => None,
        }
    }

    /// The value a field of this type holds before any initializer runs.
    pub fn default_value(&self) -> Rc<SymbolicValue> {
        match self {
            DeclaredType::Boolean => SymbolicValue::make_false(),
            DeclaredType::Class(..) => SymbolicValue::make_null(),
            other => SymbolicValue::make_int(0, other.expression_type()),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Class(name) => f.write_str(name),
            other => other.expression_type().fmt(f),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: Rc<String>,
    pub declared_type: DeclaredType,
    pub initializer: Option<Expr>,
}

impl FieldDecl {
    pub fn new(name: &str, declared_type: DeclaredType) -> Self {
        FieldDecl {
            name: Rc::new(name.to_string()),
            declared_type,
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, initializer: Expr) -> Self {
        self.initializer = Some(initializer);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClassDecl {
    pub name: Rc<String>,
    pub superclass: Option<Rc<String>>,
    pub interfaces: Vec<Rc<String>>,
    pub is_interface: bool,
    pub fields: Vec<FieldDecl>,
    pub static_fields: Vec<FieldDecl>,
}

impl ClassDecl {
    pub fn new(name: &str) -> Self {
        ClassDecl {
            name: Rc::new(name.to_string()),
            ..ClassDecl::default()
        }
    }

    pub fn interface(name: &str) -> Self {
        ClassDecl {
            is_interface: true,
            ..ClassDecl::new(name)
        }
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(Rc::new(superclass.to_string()));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(Rc::new(interface.to_string()));
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn static_field(mut self, field: FieldDecl) -> Self {
        self.static_fields.push(field);
        self
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: Rc<String>,
    pub declared_type: DeclaredType,
}

impl Parameter {
    pub fn new(name: &str, declared_type: DeclaredType) -> Self {
        Parameter {
            name: Rc::new(name.to_string()),
            declared_type,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MethodDecl {
    pub key: Rc<String>,
    pub class_name: Rc<String>,
    pub name: Rc<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<DeclaredType>,
    pub is_static: bool,
    pub is_constructor: bool,
    pub body: Vec<Statement>,
}

impl MethodDecl {
    fn build(
        class_name: &str,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: Option<DeclaredType>,
        body: Vec<Statement>,
    ) -> Self {
        MethodDecl {
            key: Rc::new(format!("{}.{}", class_name, name)),
            class_name: Rc::new(class_name.to_string()),
            name: Rc::new(name.to_string()),
            parameters,
            return_type,
            is_static: false,
            is_constructor: false,
            body,
        }
    }

    pub fn new_static(
        class_name: &str,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: Option<DeclaredType>,
        body: Vec<Statement>,
    ) -> Self {
        MethodDecl {
            is_static: true,
            ..Self::build(class_name, name, parameters, return_type, body)
        }
    }

    pub fn new_instance(
        class_name: &str,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: Option<DeclaredType>,
        body: Vec<Statement>,
    ) -> Self {
        Self::build(class_name, name, parameters, return_type, body)
    }

    pub fn new_constructor(class_name: &str, parameters: Vec<Parameter>, body: Vec<Statement>) -> Self {
        MethodDecl {
            is_constructor: true,
            ..Self::build(class_name, "<init>", parameters, None, body)
        }
    }

    /// Replaces the default `Class.name` key, e.g. to tell overloads apart.
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Rc::new(key.to_string());
        self
    }
}

#[derive(Clone, Debug)]
pub enum Statement {
    LocalDecl {
        name: Rc<String>,
        declared_type: DeclaredType,
        initializer: Option<Expr>,
    },
    Expression(Expr),
    If {
        condition: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expr,
        body: Box<Statement>,
    },
    For {
        init: Vec<Statement>,
        condition: Option<Expr>,
        updates: Vec<Expr>,
        body: Box<Statement>,
    },
    Return(Option<Expr>),
    Block(Vec<Statement>),
}

impl Statement {
    pub fn declare(name: &str, declared_type: DeclaredType, initializer: Expr) -> Self {
        Statement::LocalDecl {
            name: Rc::new(name.to_string()),
            declared_type,
            initializer: Some(initializer),
        }
    }

    pub fn declare_uninit(name: &str, declared_type: DeclaredType) -> Self {
        Statement::LocalDecl {
            name: Rc::new(name.to_string()),
            declared_type,
            initializer: None,
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Statement::Expression(expr)
    }

    pub fn if_then(condition: Expr, then_branch: Vec<Statement>) -> Self {
        Statement::If {
            condition,
            then_branch: Box::new(Statement::Block(then_branch)),
            else_branch: None,
        }
    }

    pub fn if_else(condition: Expr, then_branch: Vec<Statement>, else_branch: Vec<Statement>) -> Self {
        Statement::If {
            condition,
            then_branch: Box::new(Statement::Block(then_branch)),
            else_branch: Some(Box::new(Statement::Block(else_branch))),
        }
    }

    pub fn while_loop(condition: Expr, body: Vec<Statement>) -> Self {
        Statement::While {
            condition,
            body: Box::new(Statement::Block(body)),
        }
    }

    pub fn for_loop(
        init: Vec<Statement>,
        condition: Option<Expr>,
        updates: Vec<Expr>,
        body: Vec<Statement>,
    ) -> Self {
        Statement::For {
            init,
            condition,
            updates,
            body: Box::new(Statement::Block(body)),
        }
    }

    pub fn ret(value: Expr) -> Self {
        Statement::Return(Some(value))
    }

    pub fn ret_void() -> Self {
        Statement::Return(None)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    BitNot,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(symbol)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncDec {
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallTarget {
    /// A statically bound method, identified by its key.
    Static(Rc<String>),
    /// A method dispatched on the receiver's runtime class.
    Virtual {
        class_name: Rc<String>,
        method_name: Rc<String>,
    },
    /// A well known library method such as `Math.max`.
    Library(Rc<String>),
}

#[derive(Clone, Debug)]
pub enum Expr {
    BoolLiteral(bool),
    IntLiteral(i64),
    LongLiteral(i64),
    CharLiteral(u16),
    Null,
    Local(Rc<String>),
    This,
    /// An instance field, the receiver is `this` when absent.
    Field {
        receiver: Option<Box<Expr>>,
        name: Rc<String>,
    },
    StaticField {
        class_name: Rc<String>,
        name: Rc<String>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target = value` or, with an operator, `target op= value`.
    Assign {
        target: Box<Expr>,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
    IncDec {
        op: IncDec,
        target: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Cast {
        target: DeclaredType,
        operand: Box<Expr>,
    },
    Call {
        target: CallTarget,
        receiver: Option<Box<Expr>>,
        arguments: Vec<Expr>,
    },
    New {
        class_name: Rc<String>,
        constructor: Option<Rc<String>>,
        arguments: Vec<Expr>,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::IntLiteral(value)
    }

    pub fn long(value: i64) -> Self {
        Expr::LongLiteral(value)
    }

    pub fn bool(value: bool) -> Self {
        Expr::BoolLiteral(value)
    }

    pub fn local(name: &str) -> Self {
        Expr::Local(Rc::new(name.to_string()))
    }

    pub fn field(receiver: Expr, name: &str) -> Self {
        Expr::Field {
            receiver: Some(Box::new(receiver)),
            name: Rc::new(name.to_string()),
        }
    }

    pub fn this_field(name: &str) -> Self {
        Expr::Field {
            receiver: None,
            name: Rc::new(name.to_string()),
        }
    }

    pub fn static_field(class_name: &str, name: &str) -> Self {
        Expr::StaticField {
            class_name: Rc::new(class_name.to_string()),
            name: Rc::new(name.to_string()),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            op: None,
            value: Box::new(value),
        }
    }

    pub fn compound_assign(target: Expr, op: BinaryOp, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            op: Some(op),
            value: Box::new(value),
        }
    }

    pub fn inc_dec(op: IncDec, target: Expr) -> Self {
        Expr::IncDec {
            op,
            target: Box::new(target),
        }
    }

    pub fn conditional(condition: Expr, then_value: Expr, else_value: Expr) -> Self {
        Expr::Conditional {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        }
    }

    pub fn cast(target: DeclaredType, operand: Expr) -> Self {
        Expr::Cast {
            target,
            operand: Box::new(operand),
        }
    }

    pub fn call_static(key: &str, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::Static(Rc::new(key.to_string())),
            receiver: None,
            arguments,
        }
    }

    /// A call bound at compile time to the method with this key, on a receiver.
    pub fn call_direct(receiver: Expr, key: &str, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::Static(Rc::new(key.to_string())),
            receiver: Some(Box::new(receiver)),
            arguments,
        }
    }

    pub fn call_virtual(receiver: Expr, class_name: &str, method_name: &str, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::Virtual {
                class_name: Rc::new(class_name.to_string()),
                method_name: Rc::new(method_name.to_string()),
            },
            receiver: Some(Box::new(receiver)),
            arguments,
        }
    }

    pub fn call_library(name: &str, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            target: CallTarget::Library(Rc::new(name.to_string())),
            receiver: None,
            arguments,
        }
    }

    pub fn new_object(class_name: &str, constructor: Option<&str>, arguments: Vec<Expr>) -> Self {
        Expr::New {
            class_name: Rc::new(class_name.to_string()),
            constructor: constructor.map(|key| Rc::new(key.to_string())),
            arguments,
        }
    }

    /// True if evaluating this expression can change a variable, a field or the heap.
    pub fn has_side_effects(&self) -> bool {
        match self {
            Expr::Assign { .. } | Expr::IncDec { .. } | Expr::Call { .. } | Expr::New { .. } => true,
            Expr::Field { receiver, .. } => receiver.as_ref().map_or(false, |r| r.has_side_effects()),
            Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => operand.has_side_effects(),
            Expr::Binary { left, right, .. } => left.has_side_effects() || right.has_side_effects(),
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                condition.has_side_effects()
                    || then_value.has_side_effects()
                    || else_value.has_side_effects()
            }
            _ => false,
        }
    }

    /// True if the value of this expression depends on the local `name`.
    pub fn mentions_local(&self, name: &str) -> bool {
        match self {
            Expr::Local(n) => n.as_str() == name,
            Expr::Field { receiver, .. } => receiver.as_ref().map_or(false, |r| r.mentions_local(name)),
            Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => operand.mentions_local(name),
            Expr::IncDec { target, .. } => target.mentions_local(name),
            Expr::Binary { left, right, .. } => left.mentions_local(name) || right.mentions_local(name),
            Expr::Assign { target, value, .. } => target.mentions_local(name) || value.mentions_local(name),
            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                condition.mentions_local(name)
                    || then_value.mentions_local(name)
                    || else_value.mentions_local(name)
            }
            Expr::Call {
                receiver, arguments, ..
            } => {
                receiver.as_ref().map_or(false, |r| r.mentions_local(name))
                    || arguments.iter().any(|a| a.mentions_local(name))
            }
            Expr::New { arguments, .. } => arguments.iter().any(|a| a.mentions_local(name)),
            _ => false,
        }
    }
}

/// Every class and method the analysis may look at.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub classes: BTreeMap<Rc<String>, ClassDecl>,
    pub methods: BTreeMap<Rc<String>, Rc<MethodDecl>>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn add_class(&mut self, class: ClassDecl) -> &mut Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    pub fn add_method(&mut self, method: MethodDecl) -> &mut Self {
        self.methods.insert(method.key.clone(), Rc::new(method));
        self
    }

    pub fn class(&self, name: &str) -> Result<&ClassDecl> {
        self.classes
            .get(&Rc::new(name.to_string()))
            .ok_or_else(|| AnalysisError::UnknownClass(name.to_string()))
    }

    pub fn method(&self, key: &str) -> Option<Rc<MethodDecl>> {
        self.methods.get(&Rc::new(key.to_string())).cloned()
    }

    /// The class followed by its superclasses, nearest first. Stops at classes that are not
    /// part of the program.
    pub fn superclass_chain(&self, name: &str) -> Vec<&ClassDecl> {
        let mut chain = Vec::new();
        let mut current = self.class(name).ok();
        while let Some(class) = current {
            if chain.iter().any(|c: &&ClassDecl| c.name == class.name) {
                break;
            }
            chain.push(class);
            current = class
                .superclass
                .as_ref()
                .and_then(|s| self.class(s).ok());
        }
        chain
    }

    /// Every instance field of the class, inherited ones first.
    pub fn instance_fields(&self, name: &str) -> Vec<&FieldDecl> {
        self.superclass_chain(name)
            .into_iter()
            .rev()
            .flat_map(|c| c.fields.iter())
            .collect()
    }

    pub fn field_type(&self, class_name: &str, field_name: &str) -> Option<DeclaredType> {
        self.superclass_chain(class_name).into_iter().find_map(|c| {
            c.fields
                .iter()
                .find(|f| f.name.as_str() == field_name)
                .map(|f| f.declared_type.clone())
        })
    }

    /// The type of a static field and the class that declares it.
    pub fn static_field_type(&self, class_name: &str, field_name: &str) -> Option<(Rc<String>, DeclaredType)> {
        self.superclass_chain(class_name).into_iter().find_map(|c| {
            c.static_fields
                .iter()
                .find(|f| f.name.as_str() == field_name)
                .map(|f| (c.name.clone(), f.declared_type.clone()))
        })
    }

    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let mut visited = BTreeSet::new();
        self.is_subtype_inner(sub, sup, &mut visited)
    }

    fn is_subtype_inner(&self, sub: &str, sup: &str, visited: &mut BTreeSet<String>) -> bool {
        if sub == sup {
            return true;
        }
        if !visited.insert(sub.to_string()) {
            return false;
        }
        match self.class(sub) {
            Ok(class) => class
                .superclass
                .iter()
                .chain(class.interfaces.iter())
                .any(|parent| self.is_subtype_inner(parent, sup, visited)),
            Err(..) => false,
        }
    }

    /// The instance method named `method_name` that an object of class `class_name` runs,
    /// if there is exactly one candidate in the nearest class that declares one.
    pub fn resolve_virtual(&self, class_name: &str, method_name: &str) -> Option<Rc<MethodDecl>> {
        for class in self.superclass_chain(class_name) {
            let candidates: Vec<&Rc<MethodDecl>> = self
                .methods
                .values()
                .filter(|m| {
                    m.class_name == class.name
                        && m.name.as_str() == method_name
                        && !m.is_static
                        && !m.is_constructor
                })
                .collect();
            match candidates.len() {
                0 => continue,
                1 => return Some(candidates[0].clone()),
                _ => return None,
            }
        }
        None
    }

    /// The distinct implementations a call through the declared class may reach.
    pub fn implementations(&self, class_name: &str, method_name: &str) -> Vec<Rc<MethodDecl>> {
        let mut result: Vec<Rc<MethodDecl>> = Vec::new();
        for class in self.classes.values() {
            if class.is_interface || !self.is_subtype(&class.name, class_name) {
                continue;
            }
            match self.resolve_virtual(&class.name, method_name) {
                Some(method) => {
                    if !result.iter().any(|m| m.key == method.key) {
                        result.push(method);
                    }
                }
                None => {
                    // a concrete class without a unique implementation makes the call ambiguous
                    return Vec::new();
                }
            }
        }
        result
    }

    /// The constructor run by `new C()` when the class declares none.
    pub fn default_constructor(&self, class_name: &Rc<String>) -> Rc<MethodDecl> {
        let mut method = MethodDecl::new_constructor(class_name, vec![], vec![]);
        method.key = Rc::new(format!("{}.<default-init>", class_name));
        Rc::new(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Program {
        let mut program = Program::new();
        program
            .add_class(ClassDecl::interface("Shape"))
            .add_class(
                ClassDecl::new("Square")
                    .implements("Shape")
                    .field(FieldDecl::new("side", DeclaredType::Int)),
            )
            .add_class(
                ClassDecl::new("Cube")
                    .extends("Square")
                    .field(FieldDecl::new("depth", DeclaredType::Short)),
            )
            .add_method(MethodDecl::new_instance(
                "Square",
                "area",
                vec![],
                Some(DeclaredType::Int),
                vec![Statement::ret(Expr::int(1))],
            ));
        program
    }

    #[test]
    fn test_field_lookup_walks_superclasses() {
        let program = shapes();
        assert_eq!(program.field_type("Cube", "side"), Some(DeclaredType::Int));
        assert_eq!(program.field_type("Cube", "depth"), Some(DeclaredType::Short));
        assert_eq!(program.field_type("Square", "depth"), None);
        let names: Vec<&str> = program
            .instance_fields("Cube")
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["side", "depth"]);
    }

    #[test]
    fn test_dispatch() {
        let program = shapes();
        assert!(program.is_subtype("Cube", "Shape"));
        let inherited = program.resolve_virtual("Cube", "area").expect("inherited");
        assert_eq!(inherited.key.as_str(), "Square.area");
        assert_eq!(program.implementations("Shape", "area").len(), 1);

        let mut program = program;
        program.add_method(MethodDecl::new_instance(
            "Cube",
            "area",
            vec![],
            Some(DeclaredType::Int),
            vec![Statement::ret(Expr::int(6))],
        ));
        assert_eq!(program.implementations("Shape", "area").len(), 2);
        assert_eq!(program.implementations("Cube", "area").len(), 1);
    }

    #[test]
    fn test_side_effects() {
        let pure = Expr::binary(BinaryOp::Add, Expr::local("a"), Expr::this_field("f"));
        assert!(!pure.has_side_effects());
        assert!(pure.mentions_local("a"));
        let impure = Expr::binary(
            BinaryOp::And,
            Expr::local("b"),
            Expr::inc_dec(IncDec::PostIncrement, Expr::local("a")),
        );
        assert!(impure.has_side_effects());
    }
}
