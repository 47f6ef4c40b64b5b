//! Abstract syntax tree for Quill programs

use core_types::SourcePosition;

/// A parsed program: a list of top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration: `let name = value;`
    Let {
        /// Variable name
        name: String,
        /// Initializer expression
        value: Expression,
        /// Source position of the `let` keyword
        position: SourcePosition,
    },
    /// Expression statement: `expr;`
    Expression {
        /// The expression
        expression: Expression,
        /// Source position of the expression
        position: SourcePosition,
    },
    /// Conditional: `if (cond) { ... } else { ... }`
    If {
        /// Condition expression
        condition: Expression,
        /// Statements run when the condition is truthy
        then_branch: Vec<Statement>,
        /// Statements run otherwise (empty when there is no `else`)
        else_branch: Vec<Statement>,
        /// Source position of the `if` keyword
        position: SourcePosition,
    },
    /// Loop: `while (cond) { ... }`
    While {
        /// Condition expression
        condition: Expression,
        /// Loop body
        body: Vec<Statement>,
        /// Source position of the `while` keyword
        position: SourcePosition,
    },
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal {
        /// The literal
        value: Literal,
        /// Source position
        position: SourcePosition,
    },
    /// Variable reference
    Variable {
        /// Variable name
        name: String,
        /// Source position
        position: SourcePosition,
    },
    /// Assignment to a variable: `name = value`
    Assign {
        /// Variable name
        name: String,
        /// Assigned expression
        value: Box<Expression>,
        /// Source position of the target
        position: SourcePosition,
    },
    /// Unary operation
    Unary {
        /// Operator
        operator: UnaryOp,
        /// Operand
        operand: Box<Expression>,
        /// Source position of the operator
        position: SourcePosition,
    },
    /// Binary operation
    Binary {
        /// Operator
        operator: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
        /// Source position of the operator
        position: SourcePosition,
    },
    /// Call: `callee(args)`
    Call {
        /// Called expression
        callee: Box<Expression>,
        /// Argument expressions
        arguments: Vec<Expression>,
        /// Source position of the opening parenthesis
        position: SourcePosition,
    },
    /// Property read: `object.name`
    Property {
        /// Object expression
        object: Box<Expression>,
        /// Property name
        name: String,
        /// Source position of the property name
        position: SourcePosition,
    },
    /// Property write: `object.name = value`
    SetProperty {
        /// Object expression
        object: Box<Expression>,
        /// Property name
        name: String,
        /// Assigned expression
        value: Box<Expression>,
        /// Source position of the property name
        position: SourcePosition,
    },
    /// Method call: `object.name(args)`
    Invoke {
        /// Receiver expression
        object: Box<Expression>,
        /// Method name
        name: String,
        /// Argument expressions
        arguments: Vec<Expression>,
        /// Source position of the method name
        position: SourcePosition,
    },
}

impl Expression {
    /// Source position of the expression.
    pub fn position(&self) -> SourcePosition {
        match self {
            Expression::Literal { position, .. }
            | Expression::Variable { position, .. }
            | Expression::Assign { position, .. }
            | Expression::Unary { position, .. }
            | Expression::Binary { position, .. }
            | Expression::Call { position, .. }
            | Expression::Property { position, .. }
            | Expression::SetProperty { position, .. }
            | Expression::Invoke { position, .. } => *position,
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// Number literal
    Num(f64),
    /// String literal
    Str(String),
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation `-x`
    Neg,
    /// Logical NOT `!x`
    Not,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Remainder
    Rem,
    /// Equality
    Eq,
    /// Inequality
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}
