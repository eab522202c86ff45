//! Numeric expression evaluation for parenthesized Geneia expressions.
//!
//! Supports `+ - * /`, unary minus, grouping parentheses, number literals,
//! and bare variable names. Variables holding text are used when the text
//! is itself a number. There is no general evaluator behind this: anything
//! outside that grammar is an error, which the interpreter turns into `0`.

use thiserror::Error;

use crate::environment::Environment;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected character {0:?}")]
    Unexpected(char),
    #[error("unexpected trailing input: {0:?}")]
    Trailing(String),
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("variable `{0}` is not a number")]
    NotANumber(String),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Evaluate the interior of a parenthesized expression against `env`.
pub fn eval_arithmetic(expr: &str, env: &Environment) -> Result<f64, ArithError> {
    let mut parser = ArithParser::new(expr, env);
    let result = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(result)
}

/// Simple recursive descent parser for arithmetic expressions.
struct ArithParser<'a> {
    input: &'a str,
    pos: usize,
    env: &'a Environment,
}

impl<'a> ArithParser<'a> {
    fn new(input: &'a str, env: &'a Environment) -> Self {
        Self { input, pos: 0, env }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.input[self.pos..].chars().next() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        self.skip_whitespace();
        let ch = self.input[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn expect_end(&mut self) -> Result<(), ArithError> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ArithError::Trailing(self.input[self.pos..].to_string()));
        }
        Ok(())
    }

    /// expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, ArithError> {
        let mut left = self.parse_term()?;
        loop {
            match self.peek() {
                Some('+') => {
                    self.advance();
                    left += self.parse_term()?;
                }
                Some('-') => {
                    self.advance();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    /// term := unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<f64, ArithError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some('*') => {
                    self.advance();
                    left *= self.parse_unary()?;
                }
                Some('/') => {
                    self.advance();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(ArithError::DivisionByZero);
                    }
                    left /= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<f64, ArithError> {
        match self.peek() {
            Some('-') => {
                self.advance();
                Ok(-self.parse_unary()?)
            }
            Some('+') => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<f64, ArithError> {
        match self.peek() {
            Some('(') => {
                self.advance();
                let value = self.parse_expr()?;
                match self.advance() {
                    Some(')') => Ok(value),
                    Some(other) => Err(ArithError::Unexpected(other)),
                    None => Err(ArithError::UnexpectedEnd),
                }
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.parse_number(),
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.parse_variable(),
            Some(other) => Err(ArithError::Unexpected(other)),
            None => Err(ArithError::UnexpectedEnd),
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while let Some(ch) = input[self.pos..].chars().next() {
            if predicate(ch) {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        &input[start..self.pos]
    }

    fn parse_number(&mut self) -> Result<f64, ArithError> {
        let literal = self.take_while(|c| c.is_ascii_digit() || c == '.');
        literal
            .parse::<f64>()
            .map_err(|_| ArithError::InvalidNumber(literal.to_string()))
    }

    fn parse_variable(&mut self) -> Result<f64, ArithError> {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let value = self
            .env
            .variable(name)
            .ok_or_else(|| ArithError::UnknownVariable(name.to_string()))?;
        value
            .as_number()
            .ok_or_else(|| ArithError::NotANumber(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn eval(expr: &str) -> Result<f64, ArithError> {
        eval_arithmetic(expr, &Environment::new())
    }

    #[test]
    fn respects_precedence_and_grouping() {
        assert_eq!(eval("2 + 3 * 4"), Ok(14.0));
        assert_eq!(eval("(2 + 3) * 4"), Ok(20.0));
        assert_eq!(eval("10 - 4 - 3"), Ok(3.0));
        assert_eq!(eval("7 / 2"), Ok(3.5));
        assert_eq!(eval("-(2 + 1)"), Ok(-3.0));
    }

    #[test]
    fn resolves_variables() {
        let mut env = Environment::new();
        env.set_variable("x", Value::Number(5.0));
        env.set_variable("label", Value::text("12"));
        env.set_variable("word", Value::text("twelve"));
        assert_eq!(eval_arithmetic("x * 2 + label", &env), Ok(22.0));
        assert_eq!(
            eval_arithmetic("word + 1", &env),
            Err(ArithError::NotANumber("word".to_string()))
        );
        assert_eq!(
            eval_arithmetic("y", &env),
            Err(ArithError::UnknownVariable("y".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(eval(""), Err(ArithError::UnexpectedEnd));
        assert_eq!(eval("1 +"), Err(ArithError::UnexpectedEnd));
        assert_eq!(eval("(1 + 2"), Err(ArithError::UnexpectedEnd));
        assert_eq!(eval("1 2"), Err(ArithError::Trailing("2".to_string())));
        assert_eq!(eval("1 % 2"), Err(ArithError::Trailing("% 2".to_string())));
        assert_eq!(eval("1.2.3"), Err(ArithError::InvalidNumber("1.2.3".to_string())));
        assert_eq!(eval("4 / (2 - 2)"), Err(ArithError::DivisionByZero));
    }
}
