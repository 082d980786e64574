//! JavaScript Lexer - tokenizes source code into tokens
//!
//! The lexer is a pure function of the source buffer and a position:
//! [`Lexer::token_at`] scans one token starting at a [`LexPosition`] and
//! returns it together with the position just past it. Tokens borrow their
//! text from the source buffer; only literal payloads that need cooking
//! (escapes, numeric values) are materialized.
//!
//! Regular expressions and template continuations depend on syntactic
//! context, so the parser asks for them explicitly through
//! [`Lexer::regexp_at`] and [`Lexer::template_continuation_at`].

use core_types::{JsError, SourcePosition, Span};

use crate::error::syntax_error;

/// JavaScript keyword types
///
/// Contextual words (`let`, `yield`, `async`, `await`, `static`, `of`,
/// `get`, `set`) are scanned as identifiers and recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// break keyword
    Break,
    /// case keyword
    Case,
    /// catch keyword
    Catch,
    /// class keyword
    Class,
    /// const keyword
    Const,
    /// continue keyword
    Continue,
    /// debugger keyword
    Debugger,
    /// default keyword
    Default,
    /// delete keyword
    Delete,
    /// do keyword
    Do,
    /// else keyword
    Else,
    /// export keyword
    Export,
    /// extends keyword
    Extends,
    /// false keyword
    False,
    /// finally keyword
    Finally,
    /// for keyword
    For,
    /// function keyword
    Function,
    /// if keyword
    If,
    /// import keyword
    Import,
    /// in keyword
    In,
    /// instanceof keyword
    Instanceof,
    /// new keyword
    New,
    /// null keyword
    Null,
    /// return keyword
    Return,
    /// super keyword
    Super,
    /// switch keyword
    Switch,
    /// this keyword
    This,
    /// throw keyword
    Throw,
    /// true keyword
    True,
    /// try keyword
    Try,
    /// typeof keyword
    Typeof,
    /// var keyword
    Var,
    /// void keyword
    Void,
    /// while keyword
    While,
    /// with keyword
    With,
}

impl Keyword {
    /// Looks up a reserved word.
    pub fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "false" => Keyword::False,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "new" => Keyword::New,
            "null" => Keyword::Null,
            "return" => Keyword::Return,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "true" => Keyword::True,
            "try" => Keyword::Try,
            "typeof" => Keyword::Typeof,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "with" => Keyword::With,
            _ => return None,
        };
        Some(keyword)
    }
}

/// JavaScript punctuators (operators and delimiters)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Spread operator
    Spread,
    /// Optional chaining
    OptionalChain,
    /// Colon
    Colon,
    /// Question mark
    Question,
    /// Assignment
    Assign,
    /// Arrow function
    Arrow,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Exponentiation
    StarStar,
    /// Equality
    EqEq,
    /// Strict equality
    EqEqEq,
    /// Inequality
    NotEq,
    /// Strict inequality
    NotEqEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Logical AND
    AndAnd,
    /// Logical OR
    OrOr,
    /// Nullish coalescing
    NullishCoalesce,
    /// Logical NOT
    Bang,
    /// Bitwise AND
    And,
    /// Bitwise OR
    Or,
    /// Bitwise XOR
    Xor,
    /// Bitwise NOT
    Tilde,
    /// Left shift
    LtLt,
    /// Right shift
    GtGt,
    /// Unsigned right shift
    GtGtGt,
    /// Plus equals
    PlusEq,
    /// Minus equals
    MinusEq,
    /// Multiply equals
    StarEq,
    /// Divide equals
    SlashEq,
    /// Modulo equals
    PercentEq,
    /// Exponentiation equals
    StarStarEq,
    /// Bitwise AND equals
    AndEq,
    /// Bitwise OR equals
    OrEq,
    /// Bitwise XOR equals
    XorEq,
    /// Left shift equals
    LtLtEq,
    /// Right shift equals
    GtGtEq,
    /// Unsigned right shift equals
    GtGtGtEq,
    /// Logical AND equals
    AndAndEq,
    /// Logical OR equals
    OrOrEq,
    /// Nullish coalescing equals
    NullishCoalesceEq,
    /// Increment
    PlusPlus,
    /// Decrement
    MinusMinus,
}

impl Punctuator {
    /// Source text of the punctuator
    pub fn as_str(&self) -> &'static str {
        match self {
            Punctuator::LParen => "(",
            Punctuator::RParen => ")",
            Punctuator::LBrace => "{",
            Punctuator::RBrace => "}",
            Punctuator::LBracket => "[",
            Punctuator::RBracket => "]",
            Punctuator::Semicolon => ";",
            Punctuator::Comma => ",",
            Punctuator::Dot => ".",
            Punctuator::Spread => "...",
            Punctuator::OptionalChain => "?.",
            Punctuator::Colon => ":",
            Punctuator::Question => "?",
            Punctuator::Assign => "=",
            Punctuator::Arrow => "=>",
            Punctuator::Plus => "+",
            Punctuator::Minus => "-",
            Punctuator::Star => "*",
            Punctuator::Slash => "/",
            Punctuator::Percent => "%",
            Punctuator::StarStar => "**",
            Punctuator::EqEq => "==",
            Punctuator::EqEqEq => "===",
            Punctuator::NotEq => "!=",
            Punctuator::NotEqEq => "!==",
            Punctuator::Lt => "<",
            Punctuator::LtEq => "<=",
            Punctuator::Gt => ">",
            Punctuator::GtEq => ">=",
            Punctuator::AndAnd => "&&",
            Punctuator::OrOr => "||",
            Punctuator::NullishCoalesce => "??",
            Punctuator::Bang => "!",
            Punctuator::And => "&",
            Punctuator::Or => "|",
            Punctuator::Xor => "^",
            Punctuator::Tilde => "~",
            Punctuator::LtLt => "<<",
            Punctuator::GtGt => ">>",
            Punctuator::GtGtGt => ">>>",
            Punctuator::PlusEq => "+=",
            Punctuator::MinusEq => "-=",
            Punctuator::StarEq => "*=",
            Punctuator::SlashEq => "/=",
            Punctuator::PercentEq => "%=",
            Punctuator::StarStarEq => "**=",
            Punctuator::AndEq => "&=",
            Punctuator::OrEq => "|=",
            Punctuator::XorEq => "^=",
            Punctuator::LtLtEq => "<<=",
            Punctuator::GtGtEq => ">>=",
            Punctuator::GtGtGtEq => ">>>=",
            Punctuator::AndAndEq => "&&=",
            Punctuator::OrOrEq => "||=",
            Punctuator::NullishCoalesceEq => "??=",
            Punctuator::PlusPlus => "++",
            Punctuator::MinusMinus => "--",
        }
    }
}

/// Which piece of a template literal a template token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePart {
    /// `` `text` `` with no substitutions
    NoSubstitution,
    /// `` `text${ ``
    Head,
    /// `}text${`
    Middle,
    /// `` }text` ``
    Tail,
}

/// The kind of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, including contextual keywords
    Identifier,
    /// Private identifier (`#name`)
    PrivateIdentifier,
    /// Reserved word
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// Number literal
    Number,
    /// String literal
    String,
    /// Template literal piece
    Template(TemplatePart),
    /// Regular expression literal
    RegExp,
    /// End of input
    EOF,
}

/// Literal payload carried by a token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// No payload; the token text is the whole story
    None,
    /// Cooked identifier name, present only when the source used escapes
    Identifier(String),
    /// Numeric value
    Number(f64),
    /// Cooked string literal contents
    String(String),
    /// Template piece; `cooked` is None when it contains an invalid escape
    Template {
        /// Cooked text
        cooked: Option<String>,
        /// Raw text between the delimiters
        raw: String,
    },
    /// Regular expression literal
    RegExp {
        /// Pattern between the slashes
        pattern: String,
        /// Flags after the closing slash
        flags: String,
    },
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    /// What kind of token this is
    pub kind: TokenKind,
    /// Literal payload
    pub value: TokenValue,
    /// Source text of the token (borrowed from the buffer)
    pub text: &'a str,
    /// Byte range of the token
    pub span: Span,
    /// Line of the first character (1-based)
    pub line: u32,
    /// Column of the first character (1-based)
    pub column: u32,
    /// Whether a line terminator appeared between the previous token and
    /// this one
    pub newline_before: bool,
}

impl<'a> Token<'a> {
    /// Source position of the start of the token
    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.column, self.span.start)
    }

    /// Lexer position of the start of the token
    pub fn start(&self) -> LexPosition {
        LexPosition {
            offset: self.span.start,
            line: self.line,
            column: self.column,
        }
    }

    /// Returns the token's text from `source` (the buffer it was lexed from)
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.span.slice(source)
    }

    /// Whether the token is the given punctuator
    pub fn is_punctuator(&self, punctuator: Punctuator) -> bool {
        self.kind == TokenKind::Punctuator(punctuator)
    }

    /// Whether the token is the given keyword
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Whether the token is the identifier `name` written without escapes
    pub fn is_contextual(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == name
    }

    /// The identifier name of an identifier token (escapes resolved)
    pub fn identifier(&self) -> Option<&str> {
        match (&self.kind, &self.value) {
            (TokenKind::Identifier, TokenValue::Identifier(name)) => Some(name),
            (TokenKind::Identifier, _) => Some(self.text),
            _ => None,
        }
    }

    /// The name of a token usable as a property name: identifiers and all
    /// reserved words
    pub fn property_name(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Keyword(_) => Some(self.text),
            _ => self.identifier(),
        }
    }

    /// Whether this is the end-of-input token
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EOF
    }

    /// Human readable description for error messages
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::EOF => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// A resumable position in the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexPosition {
    /// Byte offset
    pub offset: usize,
    /// Line (1-based)
    pub line: u32,
    /// Column (1-based, in characters)
    pub column: u32,
}

impl LexPosition {
    fn source_position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.column, self.offset)
    }
}

/// Lexer for JavaScript source code
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    start: LexPosition,
    position: LexPosition,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    ///
    /// A leading hashbang line (`#!...`) is skipped.
    pub fn new(source: &'a str) -> Self {
        let mut cursor = Cursor::new(
            source,
            LexPosition {
                offset: 0,
                line: 1,
                column: 1,
            },
        );
        if source.starts_with("#!") {
            while let Some(ch) = cursor.peek() {
                if is_line_terminator(ch) {
                    break;
                }
                cursor.advance();
            }
        }
        let start = cursor.position();
        Self {
            source,
            start,
            position: start,
        }
    }

    /// The source buffer
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Position of the first token
    pub fn start(&self) -> LexPosition {
        self.start
    }

    /// Scan the token starting at `at` (after skipping trivia) and return it
    /// with the position just past it
    pub fn token_at(&self, at: LexPosition) -> Result<(Token<'a>, LexPosition), JsError> {
        let mut cursor = Cursor::new(self.source, at);
        let newline_before = cursor.skip_trivia()?;
        let token = cursor.scan_token(newline_before)?;
        Ok((token, cursor.position()))
    }

    /// Re-scan a `/` or `/=` token starting at `at` as a regular expression
    /// literal
    pub fn regexp_at(
        &self,
        at: LexPosition,
        newline_before: bool,
    ) -> Result<(Token<'a>, LexPosition), JsError> {
        let mut cursor = Cursor::new(self.source, at);
        let token = cursor.scan_regexp(newline_before)?;
        Ok((token, cursor.position()))
    }

    /// Scan the template piece that continues after the `}` closing a
    /// substitution; `at` is the position of that `}`
    pub fn template_continuation_at(
        &self,
        at: LexPosition,
    ) -> Result<(Token<'a>, LexPosition), JsError> {
        let mut cursor = Cursor::new(self.source, at);
        cursor.advance();
        let token = cursor.scan_template(at, false)?;
        Ok((token, cursor.position()))
    }

    /// The position just past the character at `at`, used to skip an
    /// unlexable character during error recovery
    pub fn skip_char(&self, at: LexPosition) -> LexPosition {
        let mut cursor = Cursor::new(self.source, at);
        cursor.advance_terminator_aware();
        cursor.position()
    }

    /// Scan the next token and advance
    pub fn next_token(&mut self) -> Result<Token<'a>, JsError> {
        let (token, next) = self.token_at(self.position)?;
        self.position = next;
        Ok(token)
    }

    /// Scan the next token without advancing
    pub fn peek_token(&self) -> Result<Token<'a>, JsError> {
        self.token_at(self.position).map(|(token, _)| token)
    }

    /// Tokenize the whole buffer (regular expressions are not recognized in
    /// this context-free mode)
    pub fn tokenize(source: &'a str) -> Result<Vec<Token<'a>>, JsError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

struct Cursor<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, at: LexPosition) -> Self {
        let offset = if source.is_char_boundary(at.offset.min(source.len())) {
            at.offset.min(source.len())
        } else {
            source.len()
        };
        Self {
            source,
            offset,
            line: at.line,
            column: at.column,
        }
    }

    fn position(&self) -> LexPosition {
        LexPosition {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn current_position(&self) -> SourcePosition {
        self.position().source_position()
    }

    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.offset..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        self.column += 1;
        Some(ch)
    }

    /// Advance one character, updating line tracking for terminators
    fn advance_terminator_aware(&mut self) -> Option<char> {
        let ch = self.advance()?;
        if ch == '\r' {
            if self.peek() == Some('\n') {
                self.offset += 1;
            }
            self.new_line();
        } else if is_line_terminator(ch) {
            self.new_line();
        }
        Some(ch)
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and comments, reporting whether a line terminator was
    /// crossed
    fn skip_trivia(&mut self) -> Result<bool, JsError> {
        let mut newline = false;
        while let Some(ch) = self.peek() {
            if is_line_terminator(ch) {
                self.advance_terminator_aware();
                newline = true;
            } else if is_whitespace(ch) {
                self.advance();
            } else if ch == '/' && self.peek_next() == Some('/') {
                while let Some(ch) = self.peek() {
                    if is_line_terminator(ch) {
                        break;
                    }
                    self.advance();
                }
            } else if ch == '/' && self.peek_next() == Some('*') {
                let start = self.current_position();
                self.advance();
                self.advance();
                let mut closed = false;
                while let Some(ch) = self.peek() {
                    if ch == '*' && self.peek_next() == Some('/') {
                        self.advance();
                        self.advance();
                        closed = true;
                        break;
                    }
                    if is_line_terminator(ch) {
                        newline = true;
                    }
                    self.advance_terminator_aware();
                }
                if !closed {
                    return Err(syntax_error("Unterminated multi-line comment", Some(start)));
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn token(
        &self,
        kind: TokenKind,
        value: TokenValue,
        start: LexPosition,
        newline_before: bool,
    ) -> Token<'a> {
        Token {
            kind,
            value,
            text: &self.source[start.offset..self.offset],
            span: Span::new(start.offset, self.offset),
            line: start.line,
            column: start.column,
            newline_before,
        }
    }

    fn scan_token(&mut self, newline_before: bool) -> Result<Token<'a>, JsError> {
        let start = self.position();
        let Some(ch) = self.advance() else {
            return Ok(self.token(TokenKind::EOF, TokenValue::None, start, newline_before));
        };

        let punct = match ch {
            '(' => Punctuator::LParen,
            ')' => Punctuator::RParen,
            '{' => Punctuator::LBrace,
            '}' => Punctuator::RBrace,
            '[' => Punctuator::LBracket,
            ']' => Punctuator::RBracket,
            ';' => Punctuator::Semicolon,
            ',' => Punctuator::Comma,
            ':' => Punctuator::Colon,
            '~' => Punctuator::Tilde,
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    Punctuator::Spread
                } else if self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    return self.scan_number(start, '.', newline_before);
                } else {
                    Punctuator::Dot
                }
            }
            '?' => {
                if self.match_char('?') {
                    if self.match_char('=') {
                        Punctuator::NullishCoalesceEq
                    } else {
                        Punctuator::NullishCoalesce
                    }
                } else if self.peek() == Some('.')
                    && !self.peek_next().map_or(false, |c| c.is_ascii_digit())
                {
                    self.advance();
                    Punctuator::OptionalChain
                } else {
                    Punctuator::Question
                }
            }
            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        Punctuator::EqEqEq
                    } else {
                        Punctuator::EqEq
                    }
                } else if self.match_char('>') {
                    Punctuator::Arrow
                } else {
                    Punctuator::Assign
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        Punctuator::NotEqEq
                    } else {
                        Punctuator::NotEq
                    }
                } else {
                    Punctuator::Bang
                }
            }
            '+' => {
                if self.match_char('+') {
                    Punctuator::PlusPlus
                } else if self.match_char('=') {
                    Punctuator::PlusEq
                } else {
                    Punctuator::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    Punctuator::MinusMinus
                } else if self.match_char('=') {
                    Punctuator::MinusEq
                } else {
                    Punctuator::Minus
                }
            }
            '*' => {
                if self.match_char('*') {
                    if self.match_char('=') {
                        Punctuator::StarStarEq
                    } else {
                        Punctuator::StarStar
                    }
                } else if self.match_char('=') {
                    Punctuator::StarEq
                } else {
                    Punctuator::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    Punctuator::SlashEq
                } else {
                    Punctuator::Slash
                }
            }
            '%' => {
                if self.match_char('=') {
                    Punctuator::PercentEq
                } else {
                    Punctuator::Percent
                }
            }
            '<' => {
                if self.match_char('<') {
                    if self.match_char('=') {
                        Punctuator::LtLtEq
                    } else {
                        Punctuator::LtLt
                    }
                } else if self.match_char('=') {
                    Punctuator::LtEq
                } else {
                    Punctuator::Lt
                }
            }
            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        if self.match_char('=') {
                            Punctuator::GtGtGtEq
                        } else {
                            Punctuator::GtGtGt
                        }
                    } else if self.match_char('=') {
                        Punctuator::GtGtEq
                    } else {
                        Punctuator::GtGt
                    }
                } else if self.match_char('=') {
                    Punctuator::GtEq
                } else {
                    Punctuator::Gt
                }
            }
            '&' => {
                if self.match_char('&') {
                    if self.match_char('=') {
                        Punctuator::AndAndEq
                    } else {
                        Punctuator::AndAnd
                    }
                } else if self.match_char('=') {
                    Punctuator::AndEq
                } else {
                    Punctuator::And
                }
            }
            '|' => {
                if self.match_char('|') {
                    if self.match_char('=') {
                        Punctuator::OrOrEq
                    } else {
                        Punctuator::OrOr
                    }
                } else if self.match_char('=') {
                    Punctuator::OrEq
                } else {
                    Punctuator::Or
                }
            }
            '^' => {
                if self.match_char('=') {
                    Punctuator::XorEq
                } else {
                    Punctuator::Xor
                }
            }
            '"' | '\'' => return self.scan_string(ch, start, newline_before),
            '`' => {
                let token = self.scan_template(start, true)?;
                return Ok(Token {
                    newline_before,
                    ..token
                });
            }
            '#' => {
                let name_start = self.position();
                match self.peek() {
                    Some(c) if is_id_start(c) || c == '\\' => {
                        self.scan_identifier_name(name_start)?;
                        return Ok(self.token(
                            TokenKind::PrivateIdentifier,
                            TokenValue::None,
                            start,
                            newline_before,
                        ));
                    }
                    _ => {
                        return Err(syntax_error(
                            "Invalid or unexpected token '#'",
                            Some(start.source_position()),
                        ))
                    }
                }
            }
            c if c.is_ascii_digit() => return self.scan_number(start, c, newline_before),
            c if is_id_start(c) || c == '\\' => {
                return self.scan_identifier(start, newline_before);
            }
            c => {
                return Err(syntax_error(
                    format!("Invalid or unexpected token '{}'", c.escape_debug()),
                    Some(start.source_position()),
                ))
            }
        };
        Ok(self.token(
            TokenKind::Punctuator(punct),
            TokenValue::None,
            start,
            newline_before,
        ))
    }

    fn scan_identifier(
        &mut self,
        start: LexPosition,
        newline_before: bool,
    ) -> Result<Token<'a>, JsError> {
        // Rewind so the name scanner sees the first character (it may be an
        // escape sequence).
        self.offset = start.offset;
        self.line = start.line;
        self.column = start.column;
        let (name, escaped) = self.scan_identifier_name(start)?;
        if escaped {
            return Ok(self.token(
                TokenKind::Identifier,
                TokenValue::Identifier(name),
                start,
                newline_before,
            ));
        }
        let kind = match Keyword::lookup(&name) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        };
        Ok(self.token(kind, TokenValue::None, start, newline_before))
    }

    /// Scan an IdentifierName starting at the cursor; returns the cooked
    /// name and whether it contained escapes
    fn scan_identifier_name(&mut self, start: LexPosition) -> Result<(String, bool), JsError> {
        let mut name = String::new();
        let mut escaped = false;
        let mut first = true;
        while let Some(ch) = self.peek() {
            let ch = if ch == '\\' {
                let escape_pos = self.current_position();
                self.advance();
                if !self.match_char('u') {
                    return Err(syntax_error(
                        "Invalid Unicode escape sequence",
                        Some(escape_pos),
                    ));
                }
                escaped = true;
                let cooked = self.scan_unicode_escape_body(escape_pos)?;
                let valid = if first {
                    is_id_start(cooked)
                } else {
                    is_id_continue(cooked)
                };
                if !valid {
                    return Err(syntax_error(
                        "Invalid Unicode escape sequence",
                        Some(escape_pos),
                    ));
                }
                cooked
            } else if (first && is_id_start(ch)) || (!first && is_id_continue(ch)) {
                self.advance();
                ch
            } else {
                break;
            };
            name.push(ch);
            first = false;
        }
        if name.is_empty() {
            return Err(syntax_error(
                "Invalid or unexpected token",
                Some(start.source_position()),
            ));
        }
        Ok((name, escaped))
    }

    /// Scan the part of `\u` escape after the `u`: `XXXX` or `{X...}`
    fn scan_unicode_escape_body(&mut self, escape_pos: SourcePosition) -> Result<char, JsError> {
        let invalid = || syntax_error("Invalid Unicode escape sequence", Some(escape_pos));
        let code = if self.match_char('{') {
            let mut code: u32 = 0;
            let mut digits = 0;
            // Stops before a character that cannot continue the escape, so
            // a template can still find its closing `` ` `` or `${`
            loop {
                match self.peek() {
                    Some('}') if digits > 0 => {
                        self.advance();
                        break;
                    }
                    Some(c) if c.is_ascii_hexdigit() => {
                        self.advance();
                        code = code
                            .checked_mul(16)
                            .and_then(|v| v.checked_add(c.to_digit(16).unwrap_or(0)))
                            .filter(|v| *v <= 0x10FFFF)
                            .ok_or_else(invalid)?;
                        digits += 1;
                    }
                    _ => return Err(invalid()),
                }
            }
            code
        } else {
            self.scan_hex_digits(4).ok_or_else(invalid)?
        };
        // Lone surrogates cannot be represented in a Rust string; they are
        // replaced with U+FFFD.
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
    }

    fn scan_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self.peek()?.to_digit(16)?;
            self.advance();
            code = code * 16 + digit;
        }
        Some(code)
    }

    fn scan_string(
        &mut self,
        quote: char,
        start: LexPosition,
        newline_before: bool,
    ) -> Result<Token<'a>, JsError> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(syntax_error(
                        "Unterminated string literal",
                        Some(start.source_position()),
                    ))
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let escape_pos = self.current_position();
                    self.advance();
                    if let Some(cooked) = self.scan_escape(escape_pos, false)? {
                        value.push(cooked);
                    }
                }
                Some('\n') | Some('\r') => {
                    return Err(syntax_error(
                        "Unterminated string literal",
                        Some(start.source_position()),
                    ))
                }
                Some(c) => {
                    self.advance_terminator_aware();
                    value.push(c);
                }
            }
        }
        Ok(self.token(
            TokenKind::String,
            TokenValue::String(value),
            start,
            newline_before,
        ))
    }

    /// Scan an escape sequence after the backslash. Returns None for line
    /// continuations.
    fn scan_escape(
        &mut self,
        escape_pos: SourcePosition,
        in_template: bool,
    ) -> Result<Option<char>, JsError> {
        let invalid = |message: &str| syntax_error(message.to_string(), Some(escape_pos));
        let Some(ch) = self.peek() else {
            return Err(invalid("Invalid escape sequence"));
        };
        if is_line_terminator(ch) {
            self.advance_terminator_aware();
            return Ok(None);
        }
        self.advance();
        let cooked = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{0008}',
            'f' => '\u{000C}',
            'v' => '\u{000B}',
            '0' if !self.peek().map_or(false, |c| c.is_ascii_digit()) => '\0',
            '8' | '9' if !in_template => ch,
            '0'..='9' => {
                if in_template {
                    return Err(invalid("Octal escape sequences are not allowed in templates"));
                }
                // Legacy octal escape
                let mut code = ch.to_digit(8).ok_or_else(|| invalid("Invalid escape sequence"))?;
                let max_len = if ch <= '3' { 3 } else { 2 };
                let mut len = 1;
                while len < max_len {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            self.advance();
                            code = code * 8 + d;
                            len += 1;
                        }
                        None => break,
                    }
                }
                char::from_u32(code).unwrap_or('\u{FFFD}')
            }
            'x' => {
                let code = self
                    .scan_hex_digits(2)
                    .ok_or_else(|| invalid("Invalid hexadecimal escape sequence"))?;
                char::from_u32(code).unwrap_or('\u{FFFD}')
            }
            'u' => self.scan_unicode_escape_body(escape_pos)?,
            other => other,
        };
        Ok(Some(cooked))
    }

    /// Scan a template piece; the opening `` ` `` or `}` has been consumed
    fn scan_template(&mut self, start: LexPosition, opening: bool) -> Result<Token<'a>, JsError> {
        let raw_start = self.offset;
        let mut cooked = Some(String::new());
        let ends_with_substitution;
        loop {
            match self.peek() {
                None => {
                    return Err(syntax_error(
                        "Unterminated template literal",
                        Some(start.source_position()),
                    ))
                }
                Some('`') => {
                    ends_with_substitution = false;
                    break;
                }
                Some('$') if self.peek_next() == Some('{') => {
                    ends_with_substitution = true;
                    break;
                }
                Some('\\') => {
                    let escape_pos = self.current_position();
                    self.advance();
                    match self.scan_escape(escape_pos, true) {
                        Ok(Some(c)) => {
                            if let Some(text) = cooked.as_mut() {
                                text.push(c);
                            }
                        }
                        Ok(None) => {}
                        // Invalid escapes are only an error for untagged
                        // templates; the parser decides.
                        Err(_) => cooked = None,
                    }
                }
                Some('\r') => {
                    // Raw and cooked text normalize CRLF and CR to LF.
                    self.advance_terminator_aware();
                    if let Some(text) = cooked.as_mut() {
                        text.push('\n');
                    }
                }
                Some(c) => {
                    self.advance_terminator_aware();
                    if let Some(text) = cooked.as_mut() {
                        text.push(c);
                    }
                }
            }
        }
        let raw = self.source[raw_start..self.offset]
            .replace("\r\n", "\n")
            .replace('\r', "\n");
        self.advance();
        if ends_with_substitution {
            self.advance();
        }
        let part = match (opening, ends_with_substitution) {
            (true, false) => TemplatePart::NoSubstitution,
            (true, true) => TemplatePart::Head,
            (false, true) => TemplatePart::Middle,
            (false, false) => TemplatePart::Tail,
        };
        Ok(self.token(
            TokenKind::Template(part),
            TokenValue::Template { cooked, raw },
            start,
            false,
        ))
    }

    fn scan_regexp(&mut self, newline_before: bool) -> Result<Token<'a>, JsError> {
        let start = self.position();
        let unterminated = || {
            syntax_error(
                "Invalid regular expression: missing /",
                Some(start.source_position()),
            )
        };
        if !self.match_char('/') {
            return Err(unterminated());
        }
        let pattern_start = self.offset;
        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(unterminated()),
                Some(c) if is_line_terminator(c) => return Err(unterminated()),
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some(c) if !is_line_terminator(c) => {
                            self.advance();
                        }
                        _ => return Err(unterminated()),
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => break,
                Some(_) => {
                    self.advance();
                }
            }
        }
        let pattern = self.source[pattern_start..self.offset].to_string();
        self.advance();
        let flags_start = self.offset;
        while let Some(c) = self.peek() {
            if is_id_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let flags = self.source[flags_start..self.offset].to_string();
        Ok(self.token(
            TokenKind::RegExp,
            TokenValue::RegExp { pattern, flags },
            start,
            newline_before,
        ))
    }

    fn scan_number(
        &mut self,
        start: LexPosition,
        first: char,
        newline_before: bool,
    ) -> Result<Token<'a>, JsError> {
        let malformed = |message: &str| syntax_error(message.to_string(), Some(start.source_position()));
        let value = if first == '0' && matches!(self.peek(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
            let radix = match self.advance() {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                _ => 2,
            };
            let digits = self.scan_digits(radix, false, &malformed)?;
            if digits.is_empty() {
                return Err(malformed("Invalid or unexpected token"));
            }
            digits
                .chars()
                .fold(0f64, |acc, c| acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64)
        } else if first == '0' && self.peek().map_or(false, |c| c.is_ascii_digit()) {
            // Legacy octal (0777) or decimal with a leading zero (089)
            let digits = self.scan_digits(10, false, &malformed)?;
            if digits.chars().all(|c| c < '8') {
                digits
                    .chars()
                    .fold(0f64, |acc, c| acc * 8.0 + c.to_digit(8).unwrap_or(0) as f64)
            } else {
                digits.parse::<f64>().map_err(|_| malformed("Invalid number"))?
            }
        } else {
            let mut literal = String::new();
            if first == '.' {
                literal.push_str("0.");
                literal.push_str(&self.scan_digits(10, true, &malformed)?);
            } else {
                literal.push(first);
                literal.push_str(&self.scan_digits(10, true, &malformed)?);
                if self.peek() == Some('.') {
                    self.advance();
                    literal.push('.');
                    literal.push_str(&self.scan_digits(10, false, &malformed)?);
                }
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                self.advance();
                literal.push('e');
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    self.advance();
                    literal.push(sign);
                }
                let exponent = self.scan_digits(10, false, &malformed)?;
                if exponent.is_empty() {
                    return Err(malformed("Invalid or unexpected token"));
                }
                literal.push_str(&exponent);
            }
            if literal.ends_with('.') {
                literal.push('0');
            }
            literal.parse::<f64>().map_err(|_| malformed("Invalid number"))?
        };
        if self.peek() == Some('n') {
            return Err(malformed("BigInt literals are not supported"));
        }
        if self.peek().map_or(false, |c| is_id_start(c) || c.is_ascii_digit()) {
            return Err(malformed("Invalid or unexpected token"));
        }
        Ok(self.token(
            TokenKind::Number,
            TokenValue::Number(value),
            start,
            newline_before,
        ))
    }

    /// Scan digits of the given radix, allowing `_` separators between digits
    fn scan_digits(
        &mut self,
        radix: u32,
        after_digit: bool,
        malformed: &dyn Fn(&str) -> JsError,
    ) -> Result<String, JsError> {
        let mut digits = String::new();
        let mut last_was_separator = false;
        while let Some(c) = self.peek() {
            if c == '_' {
                if (digits.is_empty() && !after_digit) || last_was_separator {
                    return Err(malformed("Numeric separators are not allowed here"));
                }
                last_was_separator = true;
                self.advance();
            } else if c.is_digit(radix) {
                digits.push(c);
                last_was_separator = false;
                self.advance();
            } else {
                break;
            }
        }
        if last_was_separator {
            return Err(malformed("Numeric separators are not allowed at the end of numeric literals"));
        }
        Ok(digits)
    }
}

/// Line terminators: LF, CR, LS, PS
fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// ECMAScript WhiteSpace: TAB, VT, FF, SP, NBSP, ZWNBSP and the Zs category
fn is_whitespace(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '\t'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Check if a character can start an identifier
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

/// Check if a character can continue an identifier
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || ch == '\u{200C}' || ch == '\u{200D}' || ch.is_alphanumeric()
}
