//! Recursive descent parser for Quill

use core_types::{ScriptError, SourcePosition};

use crate::ast::{BinaryOp, Expression, Literal, Program, Statement, UnaryOp};
use crate::error::{unexpected_eof, unexpected_token};
use crate::lexer::{Keyword, Lexer, Punctuator, Token};

/// Most arguments a single call may pass.
///
/// Calls encode their argument count in one byte of bytecode.
pub const MAX_ARGUMENTS: usize = 255;

/// Quill parser
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    /// Create a new parser for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse the source into a program.
    pub fn parse(&mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();
        while !self.is_at_end()? {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ScriptError> {
        if self.check_keyword(Keyword::Let)? {
            return self.parse_let_statement();
        }
        if self.check_keyword(Keyword::If)? {
            return self.parse_if_statement();
        }
        if self.check_keyword(Keyword::While)? {
            return self.parse_while_statement();
        }
        self.parse_expression_statement()
    }

    fn parse_let_statement(&mut self) -> Result<Statement, ScriptError> {
        self.lexer.next_token()?; // let
        let position = self.lexer.token_position();
        let name = self.expect_identifier("a variable name")?;
        self.expect_punctuator(Punctuator::Assign)?;
        let value = self.parse_expression()?;
        self.expect_punctuator(Punctuator::Semicolon)?;
        Ok(Statement::Let {
            name,
            value,
            position,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ScriptError> {
        self.lexer.next_token()?; // if
        let position = self.lexer.token_position();
        self.expect_punctuator(Punctuator::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.check_keyword(Keyword::Else)? {
            self.lexer.next_token()?;
            if self.check_keyword(Keyword::If)? {
                vec![self.parse_if_statement()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ScriptError> {
        self.lexer.next_token()?; // while
        let position = self.lexer.token_position();
        self.expect_punctuator(Punctuator::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = self.parse_block()?;
        Ok(Statement::While {
            condition,
            body,
            position,
        })
    }

    /// Expression statements end with `;`, except that the last
    /// statement of the program may leave it off. That final value is
    /// what a program evaluates to.
    fn parse_expression_statement(&mut self) -> Result<Statement, ScriptError> {
        let expression = self.parse_expression()?;
        let position = expression.position();
        if !self.match_punctuator(Punctuator::Semicolon)? && !self.is_at_end()? {
            let token = self.lexer.peek_token()?.clone();
            return Err(unexpected_token(
                "';'",
                &token,
                self.lexer.token_position(),
            ));
        }
        Ok(Statement::Expression {
            expression,
            position,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ScriptError> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut statements = Vec::new();
        while !self.check_punctuator(Punctuator::RBrace)? {
            if self.is_at_end()? {
                return Err(unexpected_eof(self.lexer.token_position()));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect_punctuator(Punctuator::RBrace)?;
        Ok(statements)
    }

    fn parse_expression(&mut self) -> Result<Expression, ScriptError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, ScriptError> {
        let target = self.parse_equality()?;

        if self.check_punctuator(Punctuator::Assign)? {
            self.lexer.next_token()?;
            let value = Box::new(self.parse_assignment()?);
            return match target {
                Expression::Variable { name, position } => Ok(Expression::Assign {
                    name,
                    value,
                    position,
                }),
                Expression::Property {
                    object,
                    name,
                    position,
                } => Ok(Expression::SetProperty {
                    object,
                    name,
                    value,
                    position,
                }),
                other => Err(ScriptError::syntax(
                    "invalid assignment target",
                    other.position(),
                )),
            };
        }

        Ok(target)
    }

    fn parse_equality(&mut self) -> Result<Expression, ScriptError> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = if self.check_punctuator(Punctuator::EqEq)? {
                BinaryOp::Eq
            } else if self.check_punctuator(Punctuator::NotEq)? {
                BinaryOp::Ne
            } else {
                break;
            };
            self.lexer.next_token()?;
            let position = self.lexer.token_position();
            let right = self.parse_comparison()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, ScriptError> {
        let mut left = self.parse_term()?;
        loop {
            let operator = if self.check_punctuator(Punctuator::Lt)? {
                BinaryOp::Lt
            } else if self.check_punctuator(Punctuator::LtEq)? {
                BinaryOp::Le
            } else if self.check_punctuator(Punctuator::Gt)? {
                BinaryOp::Gt
            } else if self.check_punctuator(Punctuator::GtEq)? {
                BinaryOp::Ge
            } else {
                break;
            };
            self.lexer.next_token()?;
            let position = self.lexer.token_position();
            let right = self.parse_term()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expression, ScriptError> {
        let mut left = self.parse_factor()?;
        loop {
            let operator = if self.check_punctuator(Punctuator::Plus)? {
                BinaryOp::Add
            } else if self.check_punctuator(Punctuator::Minus)? {
                BinaryOp::Sub
            } else {
                break;
            };
            self.lexer.next_token()?;
            let position = self.lexer.token_position();
            let right = self.parse_factor()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expression, ScriptError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = if self.check_punctuator(Punctuator::Star)? {
                BinaryOp::Mul
            } else if self.check_punctuator(Punctuator::Slash)? {
                BinaryOp::Div
            } else if self.check_punctuator(Punctuator::Percent)? {
                BinaryOp::Rem
            } else {
                break;
            };
            self.lexer.next_token()?;
            let position = self.lexer.token_position();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ScriptError> {
        let operator = if self.check_punctuator(Punctuator::Minus)? {
            Some(UnaryOp::Neg)
        } else if self.check_punctuator(Punctuator::Not)? {
            Some(UnaryOp::Not)
        } else {
            None
        };

        if let Some(operator) = operator {
            self.lexer.next_token()?;
            let position = self.lexer.token_position();
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expression::Unary {
                operator,
                operand,
                position,
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, ScriptError> {
        let mut expression = self.parse_primary()?;
        loop {
            if self.check_punctuator(Punctuator::LParen)? {
                self.lexer.next_token()?;
                let open = self.lexer.token_position();
                let arguments = self.parse_arguments(open)?;
                expression = match expression {
                    // A call through a property is a method invocation
                    // on the object, not a read of the property value.
                    Expression::Property {
                        object,
                        name,
                        position,
                    } => Expression::Invoke {
                        object,
                        name,
                        arguments,
                        position,
                    },
                    callee => Expression::Call {
                        callee: Box::new(callee),
                        arguments,
                        position: open,
                    },
                };
            } else if self.check_punctuator(Punctuator::Dot)? {
                self.lexer.next_token()?;
                let name = self.expect_identifier("a property name")?;
                let position = self.lexer.token_position();
                expression = Expression::Property {
                    object: Box::new(expression),
                    name,
                    position,
                };
            } else {
                break;
            }
        }
        Ok(expression)
    }

    fn parse_primary(&mut self) -> Result<Expression, ScriptError> {
        let token = self.lexer.next_token()?;
        let position = self.lexer.token_position();
        match token {
            Token::Number(value) => Ok(Expression::Literal {
                value: Literal::Num(value),
                position,
            }),
            Token::String(value) => Ok(Expression::Literal {
                value: Literal::Str(value),
                position,
            }),
            Token::Keyword(Keyword::True) => Ok(Expression::Literal {
                value: Literal::Bool(true),
                position,
            }),
            Token::Keyword(Keyword::False) => Ok(Expression::Literal {
                value: Literal::Bool(false),
                position,
            }),
            Token::Keyword(Keyword::Null) => Ok(Expression::Literal {
                value: Literal::Null,
                position,
            }),
            Token::Identifier(name) => Ok(Expression::Variable { name, position }),
            Token::Punctuator(Punctuator::LParen) => {
                let expression = self.parse_expression()?;
                self.expect_punctuator(Punctuator::RParen)?;
                Ok(expression)
            }
            Token::EOF => Err(unexpected_eof(position)),
            other => Err(unexpected_token("an expression", &other, position)),
        }
    }

    /// Parse a call's argument list. The opening parenthesis has
    /// already been consumed.
    fn parse_arguments(&mut self, open: SourcePosition) -> Result<Vec<Expression>, ScriptError> {
        let mut arguments = Vec::new();
        if !self.check_punctuator(Punctuator::RParen)? {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.match_punctuator(Punctuator::Comma)? {
                    break;
                }
            }
        }
        self.expect_punctuator(Punctuator::RParen)?;
        if arguments.len() > MAX_ARGUMENTS {
            return Err(ScriptError::syntax(
                format!("call has more than {MAX_ARGUMENTS} arguments"),
                open,
            ));
        }
        Ok(arguments)
    }

    fn is_at_end(&mut self) -> Result<bool, ScriptError> {
        Ok(matches!(self.lexer.peek_token()?, Token::EOF))
    }

    fn check_punctuator(&mut self, p: Punctuator) -> Result<bool, ScriptError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Punctuator(x) if *x == p))
    }

    fn check_keyword(&mut self, k: Keyword) -> Result<bool, ScriptError> {
        Ok(matches!(self.lexer.peek_token()?, Token::Keyword(x) if *x == k))
    }

    fn match_punctuator(&mut self, p: Punctuator) -> Result<bool, ScriptError> {
        if self.check_punctuator(p)? {
            self.lexer.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punctuator(&mut self, p: Punctuator) -> Result<(), ScriptError> {
        let token = self.lexer.next_token()?;
        if matches!(token, Token::Punctuator(x) if x == p) {
            return Ok(());
        }
        Err(unexpected_token(
            &format!("'{}'", p.text()),
            &token,
            self.lexer.token_position(),
        ))
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ScriptError> {
        let token = self.lexer.next_token()?;
        if let Token::Identifier(name) = token {
            return Ok(name);
        }
        Err(unexpected_token(
            what,
            &token,
            self.lexer.token_position(),
        ))
    }
}
