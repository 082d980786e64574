//! Recursive descent parser for JavaScript
//!
//! The parser pulls tokens from the [`Lexer`] on demand, keeping one token
//! of lookahead plus an explicit peek. Ambiguous constructs (arrow
//! parameters versus a parenthesized expression, destructuring targets
//! versus array and object literals) are parsed speculatively from a
//! [`Checkpoint`] and rewound when the guess turns out wrong.
//!
//! In tolerant mode a syntax error inside a statement list is recorded as a
//! [`Diagnostic`] and parsing resumes at the next statement boundary.

mod expressions;
mod functions;
mod patterns;
mod statements;

use core_types::{Diagnostic, JsError, LineIndex, SourcePosition, Span};

use crate::ast::{Expression, HoistingSet, Literal, Program, Statement};
use crate::error::{syntax_error, unexpected_eof, unexpected_token};
use crate::hoisting;
use crate::lexer::{Keyword, LexPosition, Lexer, Punctuator, Token, TokenKind, TokenValue};

/// Parser configuration
///
/// # Examples
///
/// ```
/// use parser::ParseOptions;
///
/// let options = ParseOptions::new().with_tolerant(true).with_source_name("app.js");
/// assert!(options.tolerant);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Record syntax errors as diagnostics instead of failing on the first
    pub tolerant: bool,
    /// Treat the whole source as strict mode code
    pub strict: bool,
    /// Name of the source, carried into positions and stack traces
    pub source_name: Option<String>,
}

impl ParseOptions {
    /// Default options: strict failure on errors, sloppy mode code
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable tolerant parsing
    pub fn with_tolerant(mut self, tolerant: bool) -> Self {
        self.tolerant = tolerant;
        self
    }

    /// Parse as strict mode code
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the source name
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

/// A parsed program together with the errors tolerant mode recovered from
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    /// The program
    pub program: Program,
    /// Recovered syntax errors (always empty unless parsing was tolerant)
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    /// Whether any syntax error was recovered from
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parse `source` into a [`Program`]
///
/// # Examples
///
/// ```
/// use parser::{parse, ParseOptions};
///
/// let output = parse("let x = 1 + 2;", &ParseOptions::default()).unwrap();
/// assert_eq!(output.program.body.len(), 1);
///
/// let output = parse("let = ;\nlet y = 1;", &ParseOptions::new().with_tolerant(true)).unwrap();
/// assert_eq!(output.diagnostics.len(), 1);
/// assert_eq!(output.program.body.len(), 1);
/// ```
pub fn parse(source: &str, options: &ParseOptions) -> Result<ParseOutput, JsError> {
    Parser::new(source, options).parse()
}

/// Syntactic context that changes at function, class and loop boundaries
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    strict: bool,
    at_top_level: bool,
    in_function: bool,
    in_generator: bool,
    in_async: bool,
    allow_super_property: bool,
    allow_super_call: bool,
    allow_new_target: bool,
    loop_depth: u32,
    breakable_depth: u32,
    /// `in` is not a binary operator here (for-statement heads)
    no_in: bool,
}

#[derive(Debug, Clone)]
struct Label {
    name: String,
    is_loop: bool,
}

/// Saved parser state for speculative parsing
struct Checkpoint<'a> {
    current: Token<'a>,
    next_pos: LexPosition,
    prev_end: usize,
    ctx: Context,
    labels: usize,
    pending_labels: usize,
    diagnostics: usize,
}

/// JavaScript parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    source: &'a str,
    source_name: Option<String>,
    current: Token<'a>,
    /// Lexer position just past `current`
    next_pos: LexPosition,
    /// End offset of the most recently consumed token
    prev_end: usize,
    tolerant: bool,
    ctx: Context,
    labels: Vec<Label>,
    /// Number of labels directly attached to the statement being parsed
    pending_labels: usize,
    diagnostics: Vec<Diagnostic>,
    lines: LineIndex,
    /// Current nesting of guarded grammar productions
    depth: u32,
}

/// Deepest nesting of statements, expressions and patterns accepted
pub const MAX_NESTING_DEPTH: u32 = 512;

/// Remaining native stack below which a nesting level moves to a new segment
pub(crate) const STACK_RED_ZONE: usize = 256 * 1024;
pub(crate) const STACK_SEGMENT: usize = 2 * 1024 * 1024;

const STRICT_RESERVED: &[&str] = &[
    "implements",
    "interface",
    "let",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
];

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code
    pub fn new(source: &'a str, options: &ParseOptions) -> Self {
        let lexer = Lexer::new(source);
        let start = lexer.start();
        Self {
            lexer,
            source,
            source_name: options.source_name.clone(),
            current: Token {
                kind: TokenKind::EOF,
                value: TokenValue::None,
                text: "",
                span: Span::empty(0),
                line: 1,
                column: 1,
                newline_before: false,
            },
            next_pos: start,
            prev_end: 0,
            tolerant: options.tolerant,
            ctx: Context {
                strict: options.strict,
                at_top_level: true,
                ..Context::default()
            },
            labels: Vec::new(),
            pending_labels: 0,
            diagnostics: Vec::new(),
            lines: LineIndex::new(source),
            depth: 0,
        }
    }

    /// Parse the whole source
    pub fn parse(mut self) -> Result<ParseOutput, JsError> {
        log::debug!(
            "parsing {} ({} bytes, tolerant: {})",
            self.source_name.as_deref().unwrap_or("<script>"),
            self.source.len(),
            self.tolerant
        );
        self.advance()?;

        let body = self.parse_body(true)?;
        let hoisting = hoisting::function_scope(&body);
        if let Err(error) = self.check_scope(&hoisting, 0) {
            if !self.tolerant {
                return Err(error);
            }
            self.record(&error);
        }

        let program = Program {
            body,
            hoisting,
            strict: self.ctx.strict,
            span: Span::new(0, self.source.len()),
            lines: self.lines,
            source_name: self.source_name,
        };
        log::debug!(
            "parsed {} top-level statements with {} diagnostics",
            program.body.len(),
            self.diagnostics.len()
        );
        Ok(ParseOutput {
            program,
            diagnostics: self.diagnostics,
        })
    }

    // ---------------------------------------------------------------------
    // Statement lists and recovery
    // ---------------------------------------------------------------------

    /// Parse a script or function body: a directive prologue followed by
    /// statements, up to end of input (`top_level`) or a closing brace
    fn parse_body(&mut self, top_level: bool) -> Result<Vec<Statement>, JsError> {
        let mut body = Vec::new();
        let mut in_prologue = true;
        loop {
            if self.current.is_eof() || (!top_level && self.at(Punctuator::RBrace)) {
                return Ok(body);
            }
            let directive = (in_prologue && self.current.kind == TokenKind::String)
                .then_some(self.current.text);
            match self.parse_list_item() {
                Some(Ok(statement)) => {
                    if in_prologue {
                        match (directive, is_string_statement(&statement)) {
                            (Some(text), true) => {
                                if text == "\"use strict\"" || text == "'use strict'" {
                                    self.ctx.strict = true;
                                }
                            }
                            _ => in_prologue = false,
                        }
                    }
                    body.push(statement);
                }
                Some(Err(error)) => return Err(error),
                None => in_prologue = false,
            }
        }
    }

    /// Parse statements up to a closing brace or end of input
    fn parse_statement_list(&mut self) -> Result<Vec<Statement>, JsError> {
        let mut body = Vec::new();
        while !self.current.is_eof() && !self.at(Punctuator::RBrace) {
            match self.parse_list_item() {
                Some(Ok(statement)) => body.push(statement),
                Some(Err(error)) => return Err(error),
                None => {}
            }
        }
        Ok(body)
    }

    /// Parse one statement list item. Returns None when tolerant mode
    /// recovered from an error in it.
    fn parse_list_item(&mut self) -> Option<Result<Statement, JsError>> {
        let start = self.current.span.start;
        let ctx = self.ctx;
        let labels = self.labels.len();
        match self.nested(Self::parse_statement_list_item) {
            Ok(statement) => Some(Ok(statement)),
            Err(error) if self.tolerant => {
                self.ctx = ctx;
                self.labels.truncate(labels);
                self.pending_labels = 0;
                self.record(&error);
                self.synchronize(start);
                None
            }
            Err(error) => Some(Err(error)),
        }
    }

    /// Run `parse` one nesting level deeper. Input nested past
    /// [`MAX_NESTING_DEPTH`] is a syntax error; the native stack grows on
    /// demand below that.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, JsError>,
    ) -> Result<T, JsError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here("Maximum nesting depth exceeded"));
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || parse(self));
        self.depth -= 1;
        result
    }

    fn record(&mut self, error: &JsError) {
        let position = error
            .source_position
            .unwrap_or_else(|| self.current.position());
        log::debug!("recovering from syntax error at {}: {}", position, error.message);
        let end = self.current.span.end.max(position.offset);
        self.diagnostics.push(Diagnostic::error(
            error.message.clone(),
            Span::new(position.offset, end),
            position,
        ));
    }

    /// Skip to the next statement boundary: past a `;`, or up to a `}`, a
    /// statement keyword or the first token on a new line
    fn synchronize(&mut self, statement_start: usize) {
        let mut skipped = false;
        loop {
            if self.current.is_eof() || self.at(Punctuator::RBrace) {
                break;
            }
            if self.at(Punctuator::Semicolon) {
                self.advance_recovering();
                return;
            }
            if skipped && (self.current.newline_before || starts_statement(&self.current)) {
                break;
            }
            self.advance_recovering();
            skipped = true;
        }
        if self.current.span.start == statement_start && !self.current.is_eof() {
            self.advance_recovering();
        }
    }

    /// Advance, skipping characters the lexer cannot make sense of
    fn advance_recovering(&mut self) {
        loop {
            match self.lexer.token_at(self.next_pos) {
                Ok((token, next)) => {
                    self.prev_end = self.current.span.end;
                    self.current = token;
                    self.next_pos = next;
                    return;
                }
                Err(error) => self.next_pos = self.skip_lex_error(&error),
            }
        }
    }

    /// Lexer position just past the character a lex error points at
    fn skip_lex_error(&self, error: &JsError) -> LexPosition {
        let at = match error.source_position {
            Some(p) if p.offset > self.next_pos.offset => LexPosition {
                offset: p.offset,
                line: p.line,
                column: p.column,
            },
            _ => self.next_pos,
        };
        self.lexer.skip_char(at)
    }

    /// Fail with a redeclaration error if `scope` declares a name twice
    fn check_scope(&self, scope: &HoistingSet, offset: usize) -> Result<(), JsError> {
        match scope.conflicting_name() {
            Some(name) => Err(syntax_error(
                format!("Identifier '{}' has already been declared", name),
                Some(self.position_at(offset)),
            )),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    /// Consume the current token and return it. Tolerant parsing records a
    /// lex error in the token that follows and skips past it, so the
    /// statement being finished is kept.
    fn advance(&mut self) -> Result<Token<'a>, JsError> {
        let (token, next) = loop {
            match self.lexer.token_at(self.next_pos) {
                Ok(found) => break found,
                Err(error) if self.tolerant => {
                    self.record(&error);
                    self.next_pos = self.skip_lex_error(&error);
                }
                Err(error) => return Err(error),
            }
        };
        self.prev_end = self.current.span.end;
        self.next_pos = next;
        Ok(std::mem::replace(&mut self.current, token))
    }

    /// The token after the current one
    fn peek(&self) -> Result<Token<'a>, JsError> {
        self.lexer.token_at(self.next_pos).map(|(token, _)| token)
    }

    fn at(&self, punctuator: Punctuator) -> bool {
        self.current.is_punctuator(punctuator)
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.current.is_keyword(keyword)
    }

    fn eat(&mut self, punctuator: Punctuator) -> Result<bool, JsError> {
        if self.at(punctuator) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> Result<bool, JsError> {
        if self.at_keyword(keyword) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, punctuator: Punctuator) -> Result<Token<'a>, JsError> {
        if self.at(punctuator) {
            self.advance()
        } else {
            Err(self.expected(&format!("'{}'", punctuator.as_str())))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token<'a>, JsError> {
        if self.at_keyword(keyword) {
            self.advance()
        } else {
            Err(self.expected(&format!("'{:?}'", keyword).to_lowercase()))
        }
    }

    /// Error for a missing `what` at the current token
    fn expected(&self, what: &str) -> JsError {
        if self.current.is_eof() {
            unexpected_eof(Some(self.current.position()))
        } else {
            unexpected_token(what, &self.current.describe(), Some(self.current.position()))
        }
    }

    /// Error for a current token that cannot appear here
    fn unexpected(&self) -> JsError {
        if self.current.is_eof() {
            unexpected_eof(Some(self.current.position()))
        } else {
            syntax_error(
                format!("Unexpected token {}", self.current.describe()),
                Some(self.current.position()),
            )
        }
    }

    /// Syntax error at the current token
    fn error_here(&self, message: impl Into<String>) -> JsError {
        syntax_error(message, Some(self.current.position()))
    }

    /// Syntax error at a byte offset
    fn error_at(&self, offset: usize, message: impl Into<String>) -> JsError {
        syntax_error(message, Some(self.position_at(offset)))
    }

    fn position_at(&self, offset: usize) -> SourcePosition {
        self.lines.position(offset)
    }

    /// Start offset of the current token
    fn start(&self) -> usize {
        self.current.span.start
    }

    /// Span from `start` to the end of the last consumed token
    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    /// Accept a statement terminator: `;`, or nothing before a line break,
    /// a `}` or the end of input
    fn consume_semicolon(&mut self) -> Result<(), JsError> {
        if self.eat(Punctuator::Semicolon)? {
            return Ok(());
        }
        if self.at(Punctuator::RBrace) || self.current.is_eof() || self.current.newline_before {
            return Ok(());
        }
        Err(self.expected("';'"))
    }

    fn checkpoint(&self) -> Checkpoint<'a> {
        Checkpoint {
            current: self.current.clone(),
            next_pos: self.next_pos,
            prev_end: self.prev_end,
            ctx: self.ctx,
            labels: self.labels.len(),
            pending_labels: self.pending_labels,
            diagnostics: self.diagnostics.len(),
        }
    }

    fn rewind(&mut self, checkpoint: Checkpoint<'a>) {
        self.current = checkpoint.current;
        self.next_pos = checkpoint.next_pos;
        self.prev_end = checkpoint.prev_end;
        self.ctx = checkpoint.ctx;
        self.labels.truncate(checkpoint.labels);
        self.pending_labels = checkpoint.pending_labels;
        self.diagnostics.truncate(checkpoint.diagnostics);
    }

    /// Run `f` with `in` allowed as a binary operator
    fn allow_in<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, JsError>,
    ) -> Result<T, JsError> {
        let saved = self.ctx.no_in;
        self.ctx.no_in = false;
        let result = f(self);
        self.ctx.no_in = saved;
        result
    }

    // ---------------------------------------------------------------------
    // Identifiers
    // ---------------------------------------------------------------------

    /// Parse an identifier that introduces a binding
    fn parse_binding_identifier(&mut self) -> Result<String, JsError> {
        let Some(name) = self.current.identifier() else {
            return Err(self.expected("identifier"));
        };
        let name = name.to_string();
        self.validate_binding_name(&name)?;
        self.advance()?;
        Ok(name)
    }

    fn validate_binding_name(&self, name: &str) -> Result<(), JsError> {
        if self.ctx.strict && (name == "eval" || name == "arguments") {
            return Err(self.error_here("Unexpected eval or arguments in strict mode"));
        }
        self.validate_reference_name(name)
    }

    fn validate_reference_name(&self, name: &str) -> Result<(), JsError> {
        if self.ctx.strict && STRICT_RESERVED.contains(&name) {
            return Err(self.error_here(format!("Unexpected strict mode reserved word '{}'", name)));
        }
        if (self.ctx.in_generator && name == "yield") || (self.ctx.in_async && name == "await") {
            return Err(self.error_here(format!("Unexpected identifier '{}'", name)));
        }
        Ok(())
    }

    /// Parse a property name after `.` (any identifier name, including
    /// reserved words)
    fn parse_property_name(&mut self) -> Result<String, JsError> {
        if self.current.kind == TokenKind::PrivateIdentifier {
            return Err(crate::error::unsupported(
                "private class members",
                Some(self.current.position()),
            ));
        }
        match self.current.property_name() {
            Some(name) => {
                let name = name.to_string();
                self.advance()?;
                Ok(name)
            }
            None => Err(self.expected("property name")),
        }
    }

    /// Cooked value of the current string literal token
    fn string_value(&self) -> String {
        match &self.current.value {
            TokenValue::String(value) => value.clone(),
            _ => String::new(),
        }
    }
}

fn is_string_statement(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::ExpressionStatement {
            expression: Expression::Literal {
                value: Literal::String(_),
                ..
            },
            ..
        }
    )
}

/// Whether `token` begins a statement that recovery can resume at
fn starts_statement(token: &Token<'_>) -> bool {
    matches!(
        token.kind,
        TokenKind::Keyword(
            Keyword::Var
                | Keyword::Const
                | Keyword::Function
                | Keyword::Class
                | Keyword::If
                | Keyword::For
                | Keyword::While
                | Keyword::Do
                | Keyword::Return
                | Keyword::Try
                | Keyword::Throw
                | Keyword::Switch
                | Keyword::Break
                | Keyword::Continue
        )
    ) || token.is_contextual("let")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn parse_ok(source: &str) -> Program {
        parse(source, &ParseOptions::default())
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", source, e))
            .program
    }

    fn parse_err(source: &str) -> JsError {
        match parse(source, &ParseOptions::default()) {
            Ok(_) => panic!("expected {:?} to fail", source),
            Err(e) => e,
        }
    }

    #[test]
    fn test_parse_empty_program() {
        let program = parse_ok("");
        assert!(program.body.is_empty());
    }

    #[test]
    fn test_asi_at_end_of_file() {
        assert_eq!(parse_ok("let x = 1").body.len(), 1);
    }

    #[test]
    fn test_asi_before_closing_brace() {
        assert_eq!(parse_ok("function f() { return 1 }").body.len(), 1);
    }

    #[test]
    fn test_asi_after_newline() {
        assert_eq!(parse_ok("let x = 1\nlet y = 2").body.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_on_one_line_fails() {
        let err = parse_err("let x = 1 let y = 2");
        assert_eq!(err.kind, core_types::ErrorKind::SyntaxError);
        assert_eq!(err.source_position.map(|p| p.column), Some(11));
    }

    #[test]
    fn test_asi_return_with_newline() {
        let program = parse_ok("function f() { return\n42 }");
        let Statement::FunctionDeclaration { function, .. } = &program.body[0] else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &function.body else {
            panic!("expected block body");
        };
        assert!(matches!(
            body[0],
            Statement::ReturnStatement { argument: None, .. }
        ));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_asi_throw_newline_error() {
        parse_err("throw\nnew Error()");
    }

    #[test]
    fn test_use_strict_directive() {
        assert!(parse_ok("'use strict'; var x;").strict);
        assert!(!parse_ok("var x; 'use strict';").strict);
        parse_err("'use strict'; var eval = 1;");
    }

    #[test]
    fn test_tolerant_mode_collects_errors() {
        let options = ParseOptions::new().with_tolerant(true);
        let output = parse("var a = ;\nvar b = 2;\nvar c = );\nvar d = 4;", &options).unwrap();
        assert_eq!(output.diagnostics.len(), 2);
        assert_eq!(output.program.body.len(), 2);
        assert_eq!(output.diagnostics[0].position.line, 1);
        assert_eq!(output.diagnostics[1].position.line, 3);
    }

    #[test]
    fn test_tolerant_mode_recovers_inside_function() {
        let options = ParseOptions::new().with_tolerant(true);
        let output = parse("function f() { let = ; return 1; }\nf();", &options).unwrap();
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.program.body.len(), 2);
    }

    #[test]
    fn test_tolerant_mode_skips_stray_braces_and_bad_characters() {
        let options = ParseOptions::new().with_tolerant(true);
        let output = parse("} @ x = 1;\ny = 2;", &options).unwrap();
        assert!(output.has_errors());
        assert!(!output.program.body.is_empty());
    }

    #[test]
    fn test_tolerant_mode_keeps_statement_before_bad_token() {
        let options = ParseOptions::new().with_tolerant(true);
        let source = "var a = 1; 'unterminated\nvar b = 2;";
        let output = parse(source, &options).unwrap();
        assert_eq!(output.diagnostics.len(), 1);
        let texts: Vec<&str> = output
            .program
            .body
            .iter()
            .map(|statement| statement.span().slice(source))
            .collect();
        assert_eq!(texts.first(), Some(&"var a = 1;"));
        assert_eq!(texts.last(), Some(&"var b = 2;"));
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let depth = 5000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let err = parse_err(&source);
        assert_eq!(err.kind, core_types::ErrorKind::SyntaxError);
        assert!(err.message.contains("nesting"));

        let blocks = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        assert_eq!(parse_err(&blocks).kind, core_types::ErrorKind::SyntaxError);

        let unary = format!("{}x", "!".repeat(depth));
        assert_eq!(parse_err(&unary).kind, core_types::ErrorKind::SyntaxError);

        let pattern = format!("var {}a{} = 0;", "[".repeat(depth), "]".repeat(depth));
        assert_eq!(parse_err(&pattern).kind, core_types::ErrorKind::SyntaxError);
    }

    #[test]
    fn test_nesting_below_the_limit_parses() {
        let depth = 200;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_ok(&source).body.len(), 1);
        let blocks = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        assert_eq!(parse_ok(&blocks).body.len(), 1);
    }

    #[test]
    fn test_redeclaration_is_rejected() {
        parse_err("let a; let a;");
        parse_err("let a; var a;");
        parse_ok("var a; var a;");
        parse_ok("let a; { let a; }");
    }
}
