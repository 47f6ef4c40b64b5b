//! Quill lexer - tokenizes source code into tokens

use core_types::{ScriptError, SourcePosition};

/// Quill keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `let`
    Let,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

/// Quill punctuators (operators and delimiters)
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
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Assignment
    Assign,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Remainder
    Percent,
    /// Logical NOT
    Not,
    /// Equality
    EqEq,
    /// Inequality
    NotEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier (variable, property, or class name)
    Identifier(String),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of file
    EOF,
}

impl Token {
    /// Short human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::Number(n) => format!("number {n}"),
            Token::String(_) => "string literal".to_string(),
            Token::Keyword(k) => format!("'{}'", k.text()),
            Token::Punctuator(p) => format!("'{}'", p.text()),
            Token::EOF => "end of input".to_string(),
        }
    }
}

impl Keyword {
    /// The source spelling of the keyword.
    pub fn text(&self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

impl Punctuator {
    /// The source spelling of the punctuator.
    pub fn text(&self) -> &'static str {
        match self {
            Punctuator::LParen => "(",
            Punctuator::RParen => ")",
            Punctuator::LBrace => "{",
            Punctuator::RBrace => "}",
            Punctuator::Semicolon => ";",
            Punctuator::Comma => ",",
            Punctuator::Dot => ".",
            Punctuator::Assign => "=",
            Punctuator::Plus => "+",
            Punctuator::Minus => "-",
            Punctuator::Star => "*",
            Punctuator::Slash => "/",
            Punctuator::Percent => "%",
            Punctuator::Not => "!",
            Punctuator::EqEq => "==",
            Punctuator::NotEq => "!=",
            Punctuator::Lt => "<",
            Punctuator::LtEq => "<=",
            Punctuator::Gt => ">",
            Punctuator::GtEq => ">=",
        }
    }
}

/// Lexer for Quill source code
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    current_token: Option<Token>,
    token_start: SourcePosition,
}

impl Lexer {
    /// Create a new lexer for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            current_token: None,
            token_start: SourcePosition::new(1, 1, 0),
        }
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Result<Token, ScriptError> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token, ScriptError> {
        if self.current_token.is_none() {
            let token = self.scan_token()?;
            self.current_token = Some(token);
        }
        Ok(self.current_token.as_ref().expect("token was just cached"))
    }

    /// Start position of the most recently scanned or peeked token.
    pub fn token_position(&self) -> SourcePosition {
        self.token_start
    }

    fn scan_token(&mut self) -> Result<Token, ScriptError> {
        self.skip_whitespace_and_comments()?;
        self.token_start = self.current_position();

        if self.is_at_end() {
            return Ok(Token::EOF);
        }

        let start_pos = self.token_start;
        let ch = self.advance();

        match ch {
            '(' => Ok(Token::Punctuator(Punctuator::LParen)),
            ')' => Ok(Token::Punctuator(Punctuator::RParen)),
            '{' => Ok(Token::Punctuator(Punctuator::LBrace)),
            '}' => Ok(Token::Punctuator(Punctuator::RBrace)),
            ';' => Ok(Token::Punctuator(Punctuator::Semicolon)),
            ',' => Ok(Token::Punctuator(Punctuator::Comma)),
            '.' => Ok(Token::Punctuator(Punctuator::Dot)),
            '+' => Ok(Token::Punctuator(Punctuator::Plus)),
            '-' => Ok(Token::Punctuator(Punctuator::Minus)),
            '*' => Ok(Token::Punctuator(Punctuator::Star)),
            '/' => Ok(Token::Punctuator(Punctuator::Slash)),
            '%' => Ok(Token::Punctuator(Punctuator::Percent)),

            '=' => {
                if self.match_char('=') {
                    Ok(Token::Punctuator(Punctuator::EqEq))
                } else {
                    Ok(Token::Punctuator(Punctuator::Assign))
                }
            }
            '!' => {
                if self.match_char('=') {
                    Ok(Token::Punctuator(Punctuator::NotEq))
                } else {
                    Ok(Token::Punctuator(Punctuator::Not))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(Token::Punctuator(Punctuator::LtEq))
                } else {
                    Ok(Token::Punctuator(Punctuator::Lt))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(Token::Punctuator(Punctuator::GtEq))
                } else {
                    Ok(Token::Punctuator(Punctuator::Gt))
                }
            }

            '"' => self.scan_string(start_pos),

            _ if ch.is_ascii_digit() => self.scan_number(ch, start_pos),

            _ if is_identifier_start(ch) => Ok(self.scan_identifier(ch)),

            _ => Err(ScriptError::syntax(
                format!("unexpected character '{ch}'"),
                start_pos,
            )),
        }
    }

    fn scan_string(&mut self, start_pos: SourcePosition) -> Result<Token, ScriptError> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                return Err(ScriptError::syntax("unterminated string", start_pos));
            }
            if self.peek() == '\\' {
                self.advance();
                if self.is_at_end() {
                    return Err(ScriptError::syntax("unterminated string", start_pos));
                }
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '0' => value.push('\0'),
                    _ => value.push(escaped),
                }
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() {
            return Err(ScriptError::syntax("unterminated string", start_pos));
        }

        self.advance(); // closing quote
        Ok(Token::String(value))
    }

    fn scan_number(&mut self, first: char, start_pos: SourcePosition) -> Result<Token, ScriptError> {
        let mut num_str = first.to_string();

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            num_str.push(self.advance());
        }

        // Fractional part only when a digit follows the dot, so `1.x`
        // still lexes as a property access on the number 1.
        if !self.is_at_end() && self.peek() == '.' {
            if let Some(after_dot) = self.peek_next() {
                if after_dot.is_ascii_digit() {
                    num_str.push(self.advance());
                    while !self.is_at_end() && self.peek().is_ascii_digit() {
                        num_str.push(self.advance());
                    }
                }
            }
        }

        if !self.is_at_end() && (self.peek() == 'e' || self.peek() == 'E') {
            num_str.push(self.advance());
            if !self.is_at_end() && (self.peek() == '+' || self.peek() == '-') {
                num_str.push(self.advance());
            }
            if self.is_at_end() || !self.peek().is_ascii_digit() {
                return Err(ScriptError::syntax(
                    format!("invalid number '{num_str}'"),
                    start_pos,
                ));
            }
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                num_str.push(self.advance());
            }
        }

        let value = num_str.parse::<f64>().map_err(|_| {
            ScriptError::syntax(format!("invalid number '{num_str}'"), start_pos)
        })?;
        Ok(Token::Number(value))
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut name = first.to_string();
        while !self.is_at_end() && is_identifier_part(self.peek()) {
            name.push(self.advance());
        }

        match name.as_str() {
            "let" => Token::Keyword(Keyword::Let),
            "if" => Token::Keyword(Keyword::If),
            "else" => Token::Keyword(Keyword::Else),
            "while" => Token::Keyword(Keyword::While),
            "true" => Token::Keyword(Keyword::True),
            "false" => Token::Keyword(Keyword::False),
            "null" => Token::Keyword(Keyword::Null),
            _ => Token::Identifier(name),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ScriptError> {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                '\r' => {
                    self.advance();
                    if !self.is_at_end() && self.peek() == '\n' {
                        self.advance();
                    }
                    self.line += 1;
                    self.column = 1;
                }
                '/' => {
                    if self.peek_next() == Some('/') {
                        while !self.is_at_end() && self.peek() != '\n' && self.peek() != '\r' {
                            self.advance();
                        }
                    } else if self.peek_next() == Some('*') {
                        let start_pos = self.current_position();
                        self.advance(); // /
                        self.advance(); // *
                        let mut found_end = false;
                        while !self.is_at_end() {
                            if self.peek() == '*' && self.peek_next() == Some('/') {
                                self.advance();
                                self.advance();
                                found_end = true;
                                break;
                            }
                            let ch = self.advance();
                            if ch == '\n' {
                                self.line += 1;
                                self.column = 1;
                            }
                        }
                        if !found_end {
                            return Err(ScriptError::syntax(
                                "unterminated block comment",
                                start_pos,
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn peek_next(&self) -> Option<char> {
        if self.position + 1 < self.chars.len() {
            Some(self.chars[self.position + 1])
        } else {
            None
        }
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        self.column += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.position] != expected {
            false
        } else {
            self.position += 1;
            self.column += 1;
            true
        }
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::EOF {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn scans_a_let_statement() {
        let tokens = all_tokens("let speed = 42;");
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Let),
                Token::Identifier("speed".to_string()),
                Token::Punctuator(Punctuator::Assign),
                Token::Number(42.0),
                Token::Punctuator(Punctuator::Semicolon),
            ]
        );
    }

    #[test]
    fn maximal_munch_on_comparison_operators() {
        let tokens = all_tokens("< <= > >= == != = !");
        assert_eq!(
            tokens,
            vec![
                Token::Punctuator(Punctuator::Lt),
                Token::Punctuator(Punctuator::LtEq),
                Token::Punctuator(Punctuator::Gt),
                Token::Punctuator(Punctuator::GtEq),
                Token::Punctuator(Punctuator::EqEq),
                Token::Punctuator(Punctuator::NotEq),
                Token::Punctuator(Punctuator::Assign),
                Token::Punctuator(Punctuator::Not),
            ]
        );
    }

    #[test]
    fn scans_number_forms() {
        assert_eq!(all_tokens("7"), vec![Token::Number(7.0)]);
        assert_eq!(all_tokens("3.25"), vec![Token::Number(3.25)]);
        assert_eq!(all_tokens("1e3"), vec![Token::Number(1000.0)]);
        assert_eq!(all_tokens("2.5e-2"), vec![Token::Number(0.025)]);
    }

    #[test]
    fn dot_after_number_is_property_access() {
        let tokens = all_tokens("1.x");
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.0),
                Token::Punctuator(Punctuator::Dot),
                Token::Identifier("x".to_string()),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = all_tokens(r#""a\nb\t\"c\"""#);
        assert_eq!(tokens, vec![Token::String("a\nb\t\"c\"".to_string())]);
    }

    #[test]
    fn unterminated_string_is_a_syntax_error() {
        let mut lexer = Lexer::new("\"oops");
        let error = lexer.next_token().unwrap_err();
        assert!(error.message.contains("unterminated string"));
        assert_eq!(error.position.map(|p| p.line), Some(1));
    }

    #[test]
    fn comments_are_skipped_and_lines_tracked() {
        let source = "// header\n/* block\n comment */ let";
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.next_token().unwrap(), Token::Keyword(Keyword::Let));
        assert_eq!(lexer.token_position().line, 3);
    }

    #[test]
    fn unterminated_block_comment_is_a_syntax_error() {
        let mut lexer = Lexer::new("/* never ends");
        let error = lexer.next_token().unwrap_err();
        assert!(error.message.contains("unterminated block comment"));
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        let tokens = all_tokens("letter whiled if_");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("letter".to_string()),
                Token::Identifier("whiled".to_string()),
                Token::Identifier("if_".to_string()),
            ]
        );
    }

    #[test]
    fn unexpected_character_reports_position() {
        let mut lexer = Lexer::new("let @");
        lexer.next_token().unwrap();
        let error = lexer.next_token().unwrap_err();
        assert!(error.message.contains("unexpected character '@'"));
        assert_eq!(error.position.map(|p| p.column), Some(5));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("a b");
        assert_eq!(
            lexer.peek_token().unwrap(),
            &Token::Identifier("a".to_string())
        );
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("a".to_string())
        );
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("b".to_string())
        );
    }
}
