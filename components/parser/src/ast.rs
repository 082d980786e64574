//! Abstract Syntax Tree node definitions
//!
//! Every node carries a [`Span`] into the source it was parsed from. Nodes
//! own their children; the tree has no back-references.

use core_types::{LineIndex, Span};

/// A parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements
    pub body: Vec<Statement>,
    /// Names hoisted to the top-level scope
    pub hoisting: HoistingSet,
    /// Whether the script starts with a `"use strict"` directive (or was
    /// parsed in strict mode)
    pub strict: bool,
    /// Span of the whole source
    pub span: Span,
    /// Offset to line/column mapping for the source
    pub lines: LineIndex,
    /// Name of the source, used in stack traces
    pub source_name: Option<String>,
}

/// Declarations that must exist before the first statement of a scope runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoistingSet {
    /// `var` names declared anywhere in the function body, including nested
    /// blocks, in order of first appearance
    pub var_names: Vec<String>,
    /// Function declarations directly in this scope, hoisted with their
    /// definitions, in source order
    pub functions: Vec<String>,
    /// `let`, `const` and `class` declarations directly in this scope
    pub lexical: Vec<LexicalBinding>,
}

impl HoistingSet {
    /// Whether `name` is declared in this scope by any kind of declaration
    pub fn declares(&self, name: &str) -> bool {
        self.var_names.iter().any(|n| n == name)
            || self.functions.iter().any(|n| n == name)
            || self.lexical.iter().any(|b| b.name == name)
    }

    /// Record a `var` name, keeping the first occurrence only
    pub fn add_var(&mut self, name: &str) {
        if !self.var_names.iter().any(|n| n == name) {
            self.var_names.push(name.to_string());
        }
    }
}

/// A block-scoped binding
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalBinding {
    /// Bound name
    pub name: String,
    /// Whether the binding is `const`
    pub is_const: bool,
}

/// A `{ ... }` statement list with its own lexical scope
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Statements in the block
    pub body: Vec<Statement>,
    /// Lexical declarations and block-level functions
    pub scope: HoistingSet,
    /// Source location
    pub span: Span,
}

/// JavaScript statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (let, const, var)
    VariableDeclaration {
        /// Declaration kind (let, const, var)
        kind: VariableKind,
        /// List of declarators
        declarations: Vec<VariableDeclarator>,
        /// Source location
        span: Span,
    },

    /// Function declaration
    FunctionDeclaration {
        /// The function
        function: Box<Function>,
        /// Source location
        span: Span,
    },

    /// Class declaration
    ClassDeclaration {
        /// The class
        class: Box<Class>,
        /// Source location
        span: Span,
    },

    /// Expression statement
    ExpressionStatement {
        /// The expression
        expression: Expression,
        /// Source location
        span: Span,
    },

    /// Return statement
    ReturnStatement {
        /// Return value
        argument: Option<Expression>,
        /// Source location
        span: Span,
    },

    /// If statement
    IfStatement {
        /// Condition
        test: Expression,
        /// Then branch
        consequent: Box<Statement>,
        /// Else branch
        alternate: Option<Box<Statement>>,
        /// Source location
        span: Span,
    },

    /// While loop
    WhileStatement {
        /// Condition
        test: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        span: Span,
    },

    /// Do-while loop
    DoWhileStatement {
        /// Loop body
        body: Box<Statement>,
        /// Condition
        test: Expression,
        /// Source location
        span: Span,
    },

    /// For loop
    ForStatement {
        /// Initialization
        init: Option<ForInit>,
        /// Condition
        test: Option<Expression>,
        /// Update expression
        update: Option<Expression>,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        span: Span,
    },

    /// For-in loop
    ForInStatement {
        /// Loop variable
        left: ForInOfLeft,
        /// Object to iterate
        right: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        span: Span,
    },

    /// For-of loop
    ForOfStatement {
        /// Loop variable
        left: ForInOfLeft,
        /// Iterable
        right: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Source location
        span: Span,
    },

    /// Block statement
    BlockStatement(Block),

    /// Empty statement
    EmptyStatement {
        /// Source location
        span: Span,
    },

    /// Break statement
    BreakStatement {
        /// Optional label
        label: Option<String>,
        /// Source location
        span: Span,
    },

    /// Continue statement
    ContinueStatement {
        /// Optional label
        label: Option<String>,
        /// Source location
        span: Span,
    },

    /// Throw statement
    ThrowStatement {
        /// Exception value
        argument: Expression,
        /// Source location
        span: Span,
    },

    /// Try statement
    TryStatement {
        /// Protected block
        block: Block,
        /// Catch clause
        handler: Option<CatchClause>,
        /// Finally block
        finalizer: Option<Block>,
        /// Source location
        span: Span,
    },

    /// Switch statement
    SwitchStatement {
        /// Value switched on
        discriminant: Expression,
        /// Case clauses
        cases: Vec<SwitchCase>,
        /// Lexical declarations shared by all clauses
        scope: HoistingSet,
        /// Source location
        span: Span,
    },

    /// Labeled statement
    LabeledStatement {
        /// Label name
        label: String,
        /// Labeled statement
        body: Box<Statement>,
        /// Source location
        span: Span,
    },

    /// Debugger statement
    DebuggerStatement {
        /// Source location
        span: Span,
    },

    /// Import declaration
    ImportDeclaration {
        /// Imported bindings
        specifiers: Vec<ImportSpecifier>,
        /// Module specifier
        source: String,
        /// Source location
        span: Span,
    },

    /// Export declaration
    ExportDeclaration {
        /// What is exported
        export: Export,
        /// Source location
        span: Span,
    },
}

impl Statement {
    /// Source span of the statement
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableDeclaration { span, .. }
            | Statement::FunctionDeclaration { span, .. }
            | Statement::ClassDeclaration { span, .. }
            | Statement::ExpressionStatement { span, .. }
            | Statement::ReturnStatement { span, .. }
            | Statement::IfStatement { span, .. }
            | Statement::WhileStatement { span, .. }
            | Statement::DoWhileStatement { span, .. }
            | Statement::ForStatement { span, .. }
            | Statement::ForInStatement { span, .. }
            | Statement::ForOfStatement { span, .. }
            | Statement::EmptyStatement { span }
            | Statement::BreakStatement { span, .. }
            | Statement::ContinueStatement { span, .. }
            | Statement::ThrowStatement { span, .. }
            | Statement::TryStatement { span, .. }
            | Statement::SwitchStatement { span, .. }
            | Statement::LabeledStatement { span, .. }
            | Statement::DebuggerStatement { span }
            | Statement::ImportDeclaration { span, .. }
            | Statement::ExportDeclaration { span, .. } => *span,
            Statement::BlockStatement(block) => block.span,
        }
    }
}

/// Switch case
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Test expression (None for default)
    pub test: Option<Expression>,
    /// Case body
    pub consequent: Vec<Statement>,
    /// Source location
    pub span: Span,
}

/// A single `name` or `name as alias` import binding
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    /// Exported name in the module (`default` or `*` for default/namespace)
    pub imported: String,
    /// Local binding name
    pub local: String,
}

/// The different forms of `export`
#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    /// `export var/let/const/function/class ...`
    Declaration(Box<Statement>),
    /// `export default expression`
    Default(Expression),
    /// `export { a, b as c } [from "m"]`
    Named {
        /// (local, exported) pairs
        specifiers: Vec<(String, String)>,
        /// Re-export source
        source: Option<String>,
    },
    /// `export * from "m"`
    All {
        /// Re-export source
        source: String,
    },
}

/// JavaScript expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference
    Identifier {
        /// Variable name
        name: String,
        /// Source location
        span: Span,
    },

    /// Literal value
    Literal {
        /// The literal value
        value: Literal,
        /// Source location
        span: Span,
    },

    /// Template literal
    TemplateLiteral {
        /// Text pieces (one more than expressions)
        quasis: Vec<TemplateElement>,
        /// Substitutions
        expressions: Vec<Expression>,
        /// Source location
        span: Span,
    },

    /// Tagged template
    TaggedTemplate {
        /// Tag function
        tag: Box<Expression>,
        /// Text pieces
        quasis: Vec<TemplateElement>,
        /// Substitutions
        expressions: Vec<Expression>,
        /// Source location
        span: Span,
    },

    /// Regular expression literal
    RegExpLiteral {
        /// Pattern text
        pattern: String,
        /// Flags
        flags: String,
        /// Source location
        span: Span,
    },

    /// Array literal; None elements are holes
    ArrayExpression {
        /// Elements (may contain SpreadElement)
        elements: Vec<Option<Expression>>,
        /// Source location
        span: Span,
    },

    /// Object literal
    ObjectExpression {
        /// Properties
        properties: Vec<ObjectProperty>,
        /// Source location
        span: Span,
    },

    /// Function expression
    FunctionExpression {
        /// The function
        function: Box<Function>,
        /// Source location
        span: Span,
    },

    /// Arrow function
    ArrowFunctionExpression {
        /// The function
        function: Box<Function>,
        /// Source location
        span: Span,
    },

    /// Class expression
    ClassExpression {
        /// The class
        class: Box<Class>,
        /// Source location
        span: Span,
    },

    /// Unary operation
    UnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Update expression (++/--)
    UpdateExpression {
        /// Operator
        operator: UpdateOperator,
        /// Prefix or postfix
        prefix: bool,
        /// Operand
        argument: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Binary operation
    BinaryExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: BinaryOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Logical operation (&&, ||, ??)
    LogicalExpression {
        /// Left operand
        left: Box<Expression>,
        /// Operator
        operator: LogicalOperator,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Assignment
    AssignmentExpression {
        /// Assignment target
        left: Box<Pattern>,
        /// Operator
        operator: AssignmentOperator,
        /// Value
        right: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Conditional (ternary) expression
    ConditionalExpression {
        /// Condition
        test: Box<Expression>,
        /// Value if true
        consequent: Box<Expression>,
        /// Value if false
        alternate: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Function call
    CallExpression {
        /// Function being called
        callee: Box<Expression>,
        /// Arguments (may contain SpreadElement)
        arguments: Vec<Expression>,
        /// Whether this is `callee?.(...)`
        optional: bool,
        /// Source location
        span: Span,
    },

    /// Constructor call
    NewExpression {
        /// Constructor
        callee: Box<Expression>,
        /// Arguments (may contain SpreadElement)
        arguments: Vec<Expression>,
        /// Source location
        span: Span,
    },

    /// Member access
    MemberExpression {
        /// Object
        object: Box<Expression>,
        /// Property
        property: MemberProperty,
        /// Whether this is `object?.property`
        optional: bool,
        /// Source location
        span: Span,
    },

    /// Boundary of an optional chain: a nullish short-circuit anywhere inside
    /// makes the whole chain evaluate to undefined
    OptionalChain {
        /// The chain
        expression: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// Comma-separated expressions
    SequenceExpression {
        /// Expressions, evaluated left to right
        expressions: Vec<Expression>,
        /// Source location
        span: Span,
    },

    /// Spread element (only valid in arguments and array literals)
    SpreadElement {
        /// Spread value
        argument: Box<Expression>,
        /// Source location
        span: Span,
    },

    /// `this`
    ThisExpression {
        /// Source location
        span: Span,
    },

    /// `super` (only valid as a callee or member object)
    SuperExpression {
        /// Source location
        span: Span,
    },

    /// `new.target`
    NewTarget {
        /// Source location
        span: Span,
    },

    /// Yield expression
    YieldExpression {
        /// Yielded value
        argument: Option<Box<Expression>>,
        /// `yield*`
        delegate: bool,
        /// Source location
        span: Span,
    },

    /// Await expression
    AwaitExpression {
        /// Awaited value
        argument: Box<Expression>,
        /// Source location
        span: Span,
    },
}

impl Expression {
    /// Source span of the expression
    pub fn span(&self) -> Span {
        match self {
            Expression::Identifier { span, .. }
            | Expression::Literal { span, .. }
            | Expression::TemplateLiteral { span, .. }
            | Expression::TaggedTemplate { span, .. }
            | Expression::RegExpLiteral { span, .. }
            | Expression::ArrayExpression { span, .. }
            | Expression::ObjectExpression { span, .. }
            | Expression::FunctionExpression { span, .. }
            | Expression::ArrowFunctionExpression { span, .. }
            | Expression::ClassExpression { span, .. }
            | Expression::UnaryExpression { span, .. }
            | Expression::UpdateExpression { span, .. }
            | Expression::BinaryExpression { span, .. }
            | Expression::LogicalExpression { span, .. }
            | Expression::AssignmentExpression { span, .. }
            | Expression::ConditionalExpression { span, .. }
            | Expression::CallExpression { span, .. }
            | Expression::NewExpression { span, .. }
            | Expression::MemberExpression { span, .. }
            | Expression::OptionalChain { span, .. }
            | Expression::SequenceExpression { span, .. }
            | Expression::SpreadElement { span, .. }
            | Expression::ThisExpression { span }
            | Expression::SuperExpression { span }
            | Expression::NewTarget { span }
            | Expression::YieldExpression { span, .. }
            | Expression::AwaitExpression { span, .. } => *span,
        }
    }
}

/// Property of a member expression
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// `object.name`
    Identifier(String),
    /// `object[expression]`
    Computed(Box<Expression>),
}

/// Variable declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// Variable declarator
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// Variable pattern
    pub id: Pattern,
    /// Initial value
    pub init: Option<Expression>,
    /// Source location
    pub span: Span,
}

/// Binding and assignment patterns
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Simple identifier
    Identifier {
        /// Bound name
        name: String,
        /// Source location
        span: Span,
    },
    /// Object destructuring
    ObjectPattern {
        /// Properties
        properties: Vec<ObjectPatternProperty>,
        /// `...rest` target
        rest: Option<Box<Pattern>>,
        /// Source location
        span: Span,
    },
    /// Array destructuring; None elements are elisions
    ArrayPattern {
        /// Elements
        elements: Vec<Option<Pattern>>,
        /// `...rest` target
        rest: Option<Box<Pattern>>,
        /// Source location
        span: Span,
    },
    /// Assignment pattern (with default value)
    AssignmentPattern {
        /// Target
        left: Box<Pattern>,
        /// Default value
        right: Box<Expression>,
        /// Source location
        span: Span,
    },
    /// Rest parameter (`...args`)
    RestElement {
        /// Target
        argument: Box<Pattern>,
        /// Source location
        span: Span,
    },
    /// Member expression target (for destructuring assignment, not parameters)
    /// Example: [obj.prop] = [1] or [arr[0]] = [1]
    MemberExpression(Box<Expression>),
}

impl Pattern {
    /// Source span of the pattern
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier { span, .. }
            | Pattern::ObjectPattern { span, .. }
            | Pattern::ArrayPattern { span, .. }
            | Pattern::AssignmentPattern { span, .. }
            | Pattern::RestElement { span, .. } => *span,
            Pattern::MemberExpression(expr) => expr.span(),
        }
    }

    /// Appends every name bound by the pattern to `names`
    pub fn bound_names(&self, names: &mut Vec<String>) {
        match self {
            Pattern::Identifier { name, .. } => names.push(name.clone()),
            Pattern::ObjectPattern {
                properties, rest, ..
            } => {
                for prop in properties {
                    prop.value.bound_names(names);
                }
                if let Some(rest) = rest {
                    rest.bound_names(names);
                }
            }
            Pattern::ArrayPattern { elements, rest, .. } => {
                for element in elements.iter().flatten() {
                    element.bound_names(names);
                }
                if let Some(rest) = rest {
                    rest.bound_names(names);
                }
            }
            Pattern::AssignmentPattern { left, .. } => left.bound_names(names),
            Pattern::RestElement { argument, .. } => argument.bound_names(names),
            Pattern::MemberExpression(_) => {}
        }
    }

    /// The name of a plain identifier pattern
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Pattern::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Object pattern property
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    /// Property key
    pub key: PropertyKey,
    /// Target pattern
    pub value: Pattern,
    /// `{ a }` rather than `{ a: a }`
    pub shorthand: bool,
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Null literal
    Null,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// **
    Exp,
    /// ==
    Eq,
    /// !=
    NotEq,
    /// ===
    StrictEq,
    /// !==
    StrictNotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// &
    BitwiseAnd,
    /// |
    BitwiseOr,
    /// ^
    BitwiseXor,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// instanceof
    Instanceof,
    /// in
    In,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    Not,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// Update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    NullishCoalesce,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubAssign,
    /// *=
    MulAssign,
    /// /=
    DivAssign,
    /// %=
    ModAssign,
    /// **=
    ExpAssign,
    /// &=
    BitAndAssign,
    /// |=
    BitOrAssign,
    /// ^=
    BitXorAssign,
    /// <<=
    LeftShiftAssign,
    /// >>=
    RightShiftAssign,
    /// >>>=
    UnsignedRightShiftAssign,
    /// &&=
    LogicalAndAssign,
    /// ||=
    LogicalOrAssign,
    /// ??=
    NullishCoalesceAssign,
}

impl AssignmentOperator {
    /// The binary operator applied by a compound assignment
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        let op = match self {
            AssignmentOperator::AddAssign => BinaryOperator::Add,
            AssignmentOperator::SubAssign => BinaryOperator::Sub,
            AssignmentOperator::MulAssign => BinaryOperator::Mul,
            AssignmentOperator::DivAssign => BinaryOperator::Div,
            AssignmentOperator::ModAssign => BinaryOperator::Mod,
            AssignmentOperator::ExpAssign => BinaryOperator::Exp,
            AssignmentOperator::BitAndAssign => BinaryOperator::BitwiseAnd,
            AssignmentOperator::BitOrAssign => BinaryOperator::BitwiseOr,
            AssignmentOperator::BitXorAssign => BinaryOperator::BitwiseXor,
            AssignmentOperator::LeftShiftAssign => BinaryOperator::LeftShift,
            AssignmentOperator::RightShiftAssign => BinaryOperator::RightShift,
            AssignmentOperator::UnsignedRightShiftAssign => BinaryOperator::UnsignedRightShift,
            _ => return None,
        };
        Some(op)
    }

    /// The logical operator applied by a logical assignment
    pub fn logical_operator(&self) -> Option<LogicalOperator> {
        match self {
            AssignmentOperator::LogicalAndAssign => Some(LogicalOperator::And),
            AssignmentOperator::LogicalOrAssign => Some(LogicalOperator::Or),
            AssignmentOperator::NullishCoalesceAssign => Some(LogicalOperator::NullishCoalesce),
            _ => None,
        }
    }
}

/// For loop initialization
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    VariableDeclaration {
        /// Kind
        kind: VariableKind,
        /// Declarations
        declarations: Vec<VariableDeclarator>,
    },
    /// Expression
    Expression(Expression),
}

/// Left side of for-in/for-of loop
#[derive(Debug, Clone, PartialEq)]
pub enum ForInOfLeft {
    /// Variable declaration (let x, const x, var x)
    VariableDeclaration {
        /// Kind
        kind: VariableKind,
        /// Binding pattern
        id: Pattern,
    },
    /// Existing variable, member expression or destructuring pattern
    Pattern(Pattern),
}

/// Catch clause
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// Parameter
    pub param: Option<Pattern>,
    /// Body
    pub body: Block,
    /// Source location
    pub span: Span,
}

/// What kind of function a [`Function`] node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `function` declaration or expression
    Normal,
    /// Arrow function
    Arrow,
    /// Object literal or class method (including accessors)
    Method,
    /// Class constructor
    ClassConstructor {
        /// Whether the class has an `extends` clause
        derived: bool,
    },
}

/// A function of any kind
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name
    pub name: Option<String>,
    /// Parameters (a trailing RestElement for `...rest`)
    pub params: Vec<Pattern>,
    /// Function body
    pub body: FunctionBody,
    /// Kind of function
    pub kind: FunctionKind,
    /// Is generator function
    pub is_generator: bool,
    /// Is async function
    pub is_async: bool,
    /// Whether the body is strict mode code
    pub strict: bool,
    /// Names hoisted to the function scope
    pub hoisting: HoistingSet,
    /// Source location
    pub span: Span,
}

impl Function {
    /// Number of parameters before the first default or rest parameter
    pub fn length(&self) -> u32 {
        self.params
            .iter()
            .take_while(|p| {
                !matches!(
                    p,
                    Pattern::AssignmentPattern { .. } | Pattern::RestElement { .. }
                )
            })
            .count() as u32
    }

    /// Whether every parameter is a plain identifier
    pub fn has_simple_params(&self) -> bool {
        self.params
            .iter()
            .all(|p| matches!(p, Pattern::Identifier { .. }))
    }
}

/// Function body
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Block body
    Block(Vec<Statement>),
    /// Expression body (arrow functions)
    Expression(Box<Expression>),
}

/// A class definition
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// Class name
    pub name: Option<String>,
    /// Superclass expression
    pub super_class: Option<Box<Expression>>,
    /// Constructor; synthesized when the class body has none
    pub constructor: Box<Function>,
    /// Methods and fields
    pub elements: Vec<ClassElement>,
    /// Source location
    pub span: Span,
}

/// Class element
#[derive(Debug, Clone, PartialEq)]
pub enum ClassElement {
    /// Method definition
    MethodDefinition {
        /// Method name
        key: PropertyKey,
        /// Method kind
        kind: MethodKind,
        /// The method
        function: Box<Function>,
        /// Is static
        is_static: bool,
        /// Source location
        span: Span,
    },
    /// Field definition
    PropertyDefinition {
        /// Property key
        key: PropertyKey,
        /// Initial value
        value: Option<Expression>,
        /// Is static
        is_static: bool,
        /// Source location
        span: Span,
    },
}

/// Method kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Regular method
    Method,
    /// Getter
    Get,
    /// Setter
    Set,
}

/// Object property
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    /// Property with key and value
    Property {
        /// Key
        key: PropertyKey,
        /// Value
        value: Expression,
        /// Is shorthand
        shorthand: bool,
        /// Source location
        span: Span,
    },
    /// Method, getter or setter
    Method {
        /// Key
        key: PropertyKey,
        /// Method kind
        kind: MethodKind,
        /// The method
        function: Box<Function>,
        /// Source location
        span: Span,
    },
    /// Spread property
    SpreadElement(Expression),
}

/// Property key
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier key
    Identifier(String),
    /// String literal key
    String(String),
    /// Number literal key
    Number(f64),
    /// Computed key
    Computed(Box<Expression>),
}

impl PropertyKey {
    /// The key as a static property name, if it is not computed
    pub fn static_name(&self) -> Option<String> {
        match self {
            PropertyKey::Identifier(name) | PropertyKey::String(name) => Some(name.clone()),
            PropertyKey::Number(n) => Some(format_number_key(*n)),
            PropertyKey::Computed(_) => None,
        }
    }
}

/// Formats a numeric literal key the way it becomes a property name for
/// the common integral cases; other values keep Rust's shortest form
fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Template literal element
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateElement {
    /// Raw string value
    pub raw: String,
    /// Cooked string value (None if it contains an invalid escape, which is
    /// only allowed in tagged templates)
    pub cooked: Option<String>,
    /// Source location
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Pattern {
        Pattern::Identifier {
            name: name.to_string(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_bound_names_of_nested_pattern() {
        let pattern = Pattern::ObjectPattern {
            properties: vec![ObjectPatternProperty {
                key: PropertyKey::Identifier("a".to_string()),
                value: Pattern::ArrayPattern {
                    elements: vec![Some(ident("b")), None],
                    rest: Some(Box::new(ident("c"))),
                    span: Span::default(),
                },
                shorthand: false,
            }],
            rest: Some(Box::new(ident("d"))),
            span: Span::default(),
        };
        let mut names = Vec::new();
        pattern.bound_names(&mut names);
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_function_length_stops_at_default() {
        let function = Function {
            name: None,
            params: vec![
                ident("a"),
                Pattern::AssignmentPattern {
                    left: Box::new(ident("b")),
                    right: Box::new(Expression::Literal {
                        value: Literal::Number(1.0),
                        span: Span::default(),
                    }),
                    span: Span::default(),
                },
                ident("c"),
            ],
            body: FunctionBody::Block(vec![]),
            kind: FunctionKind::Normal,
            is_generator: false,
            is_async: false,
            strict: false,
            hoisting: HoistingSet::default(),
            span: Span::default(),
        };
        assert_eq!(function.length(), 1);
        assert!(!function.has_simple_params());
    }

    #[test]
    fn test_numeric_key_names() {
        assert_eq!(PropertyKey::Number(1.0).static_name().as_deref(), Some("1"));
        assert_eq!(PropertyKey::Number(1.5).static_name().as_deref(), Some("1.5"));
        assert_eq!(PropertyKey::Computed(Box::new(Expression::ThisExpression {
            span: Span::default()
        }))
        .static_name(), None);
    }

    #[test]
    fn test_hoisting_set_dedups_vars() {
        let mut set = HoistingSet::default();
        set.add_var("x");
        set.add_var("x");
        assert_eq!(set.var_names, vec!["x"]);
        assert!(set.declares("x"));
    }
}
