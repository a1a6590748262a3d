//! Expression Evaluator
//!
//! Operator-precedence parser for the arithmetic/logical mini-language
//! behind `Evaluate`, `If`, and the loop-control conditions. The caller
//! pre-reverses the token vector (and pops its leading keywords); the
//! parser consumes from the back.
//!
//! Numeric operators coerce both operands to 32-bit signed integers.
//! Equality compares the *string* values, with one MPW quirk: the empty
//! string and `"0"` are equal. The logical
//! operators treat non-numeric operands as 1, so any non-empty,
//! non-numeric string is truthy.

use thiserror::Error;

use crate::interpreter::value::Value;
use crate::interpreter::words::{Word, WordKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("### {name} - Expected a binary operator when \"{text}\" was encountered.")]
    ExpectedBinaryOperator { name: String, text: String },
    #[error("### {name} - Expected a number when \"{text}\" was encountered.")]
    ExpectedNumber { name: String, text: String },
    #[error("### {name} - Unexpected end of expression.")]
    UnexpectedEnd { name: String },
    #[error("### {name} - Attempt to divide by zero.")]
    DivideByZero { name: String },
    #[error("### MPW Shell - Extra ) command.")]
    ExtraRParen,
    #[error("### {name} - Expression stack error.")]
    StackError { name: String },
}

/// Binding strength; smaller binds tighter.
fn precedence(kind: WordKind) -> Option<u8> {
    use WordKind::*;
    Some(match kind {
        Star | Slash | Percent => 3,
        Plus | Minus => 4,
        ShiftRight | ShiftLeft => 5,
        Less | LessEqual | Greater | GreaterEqual => 6,
        Equal | NotEqual | Equivalent | NotEquivalent => 7,
        BitAnd => 8,
        BitXor => 9,
        BitOr => 10,
        AndAnd => 11,
        OrOr => 12,
        _ => return None,
    })
}

/// Evaluate a pre-reversed token stack. `name` is the command reporting
/// any error (`If`, `Evaluate`, `Break`, …).
pub fn evaluate_expression(name: &str, tokens: Vec<Word>) -> Result<i32, ExprError> {
    ExpressionParser { name, tokens }.evaluate()
}

struct ExpressionParser<'a> {
    name: &'a str,
    /// reversed: the next token is the last element
    tokens: Vec<Word>,
}

impl<'a> ExpressionParser<'a> {
    fn evaluate(mut self) -> Result<i32, ExprError> {
        if self.tokens.is_empty() {
            return Ok(0);
        }
        let mut value = self.binary()?;
        if let Some(token) = self.tokens.last() {
            if token.kind == WordKind::RParen {
                return Err(ExprError::ExtraRParen);
            }
            return Err(self.stack_error());
        }
        Ok(value.to_number_or(1))
    }

    fn peek_kind(&self) -> Option<WordKind> {
        self.tokens.last().map(|t| t.kind)
    }

    fn next(&mut self) -> Option<Word> {
        self.tokens.pop()
    }

    fn skip(&mut self) {
        self.tokens.pop();
    }

    fn binary(&mut self) -> Result<Value, ExprError> {
        let mut output: Vec<Value> = Vec::new();
        let mut operators: Vec<(WordKind, u8)> = Vec::new();

        output.push(self.unary()?);

        loop {
            let kind = match self.peek_kind() {
                None | Some(WordKind::RParen) => break,
                Some(kind) => kind,
            };
            let prec = match precedence(kind) {
                Some(p) => p,
                None => return Err(self.expected_binary_operator()),
            };
            self.skip();

            // reduce anything that binds at least as tightly first
            while let Some(&(op, op_prec)) = operators.last() {
                if op_prec > prec {
                    break;
                }
                operators.pop();
                self.reduce(op, &mut output)?;
            }

            operators.push((kind, prec));
            output.push(self.unary()?);
        }

        while let Some((op, _)) = operators.pop() {
            self.reduce(op, &mut output)?;
        }

        if output.len() != 1 {
            return Err(self.stack_error());
        }
        Ok(output.pop().unwrap_or_else(Value::empty))
    }

    fn reduce(&self, op: WordKind, output: &mut Vec<Value>) -> Result<(), ExprError> {
        let mut rhs = output.pop().unwrap_or_else(Value::empty);
        let mut lhs = output.pop().unwrap_or_else(Value::empty);
        output.push(self.eval(op, &mut lhs, &mut rhs)?);
        Ok(())
    }

    fn eval(&self, op: WordKind, lhs: &mut Value, rhs: &mut Value) -> Result<Value, ExprError> {
        use WordKind::*;
        let v = match op {
            Star => self.num(lhs)?.wrapping_mul(self.num(rhs)?),
            Slash => {
                let divisor = self.num(rhs)?;
                if divisor == 0 {
                    return Err(self.divide_by_zero());
                }
                self.num(lhs)?.wrapping_div(divisor)
            }
            Percent => {
                let divisor = self.num(rhs)?;
                if divisor == 0 {
                    return Err(self.divide_by_zero());
                }
                self.num(lhs)?.wrapping_rem(divisor)
            }
            Plus => self.num(lhs)?.wrapping_add(self.num(rhs)?),
            Minus => self.num(lhs)?.wrapping_sub(self.num(rhs)?),
            ShiftRight => self.num(lhs)?.wrapping_shr(self.num(rhs)? as u32),
            ShiftLeft => self.num(lhs)?.wrapping_shl(self.num(rhs)? as u32),
            Less => (self.num(lhs)? < self.num(rhs)?) as i32,
            LessEqual => (self.num(lhs)? <= self.num(rhs)?) as i32,
            Greater => (self.num(lhs)? > self.num(rhs)?) as i32,
            GreaterEqual => (self.num(lhs)? >= self.num(rhs)?) as i32,
            BitAnd => self.num(lhs)? & self.num(rhs)?,
            BitXor => self.num(lhs)? ^ self.num(rhs)?,
            BitOr => self.num(lhs)? | self.num(rhs)?,
            // logical operators are NaN-tolerant
            AndAnd => (lhs.to_number_or(1) != 0 && rhs.to_number_or(1) != 0) as i32,
            OrOr => (lhs.to_number_or(1) != 0 || rhs.to_number_or(1) != 0) as i32,
            Equal | Equivalent => string_equal(lhs.text(), rhs.text()) as i32,
            NotEqual | NotEquivalent => (!string_equal(lhs.text(), rhs.text())) as i32,
            _ => return Err(self.stack_error()),
        };
        Ok(Value::number(v))
    }

    fn unary(&mut self) -> Result<Value, ExprError> {
        use WordKind::*;
        match self.peek_kind() {
            Some(kind @ (Minus | Plus | Not | Tilde)) => {
                self.skip();
                let mut v = self.unary()?;
                let v = match kind {
                    Minus => Value::number(self.num(&mut v)?.wrapping_neg()),
                    Tilde => Value::number(!self.num(&mut v)?),
                    // logical not is NaN-tolerant
                    Not => Value::number((v.to_number_or(1) == 0) as i32),
                    // unary plus doesn't even check for a number
                    _ => v,
                };
                Ok(v)
            }
            _ => self.terminal(),
        }
    }

    fn terminal(&mut self) -> Result<Value, ExprError> {
        match self.peek_kind() {
            Some(WordKind::Text) => {
                let token = self.next().unwrap_or_else(|| Word::text(""));
                Ok(Value::new(token.text))
            }
            Some(WordKind::LParen) => {
                self.skip();
                let v = self.binary()?;
                if self.peek_kind() != Some(WordKind::RParen) {
                    return Err(ExprError::UnexpectedEnd {
                        name: self.name.to_string(),
                    });
                }
                self.skip();
                Ok(v)
            }
            // missing operand: act as if an empty token were present
            _ => Ok(Value::empty()),
        }
    }

    fn num(&self, v: &mut Value) -> Result<i32, ExprError> {
        v.to_number().ok_or_else(|| ExprError::ExpectedNumber {
            name: self.name.to_string(),
            text: v.text().to_string(),
        })
    }

    fn expected_binary_operator(&mut self) -> ExprError {
        let token = self.next().unwrap_or_else(|| Word::text(""));
        ExprError::ExpectedBinaryOperator {
            name: self.name.to_string(),
            text: token.text,
        }
    }

    fn divide_by_zero(&self) -> ExprError {
        ExprError::DivideByZero {
            name: self.name.to_string(),
        }
    }

    fn stack_error(&self) -> ExprError {
        ExprError::StackError {
            name: self.name.to_string(),
        }
    }
}

/// String equality with the MPW quirk: `""` and `"0"` are equal.
fn string_equal(lhs: &str, rhs: &str) -> bool {
    if lhs.is_empty() && rhs == "0" {
        return true;
    }
    if lhs == "0" && rhs.is_empty() {
        return true;
    }
    lhs == rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::words::tokenize;

    fn eval(input: &str) -> Result<i32, ExprError> {
        let mut tokens = tokenize(input, true).unwrap();
        tokens.reverse();
        evaluate_expression("Evaluate", tokens)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2 + 3 * 4"), Ok(14));
        assert_eq!(eval("(2 + 3) * 4"), Ok(20));
        assert_eq!(eval("20 - 2 * 3"), Ok(14));
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(eval("20 - 5 - 3"), Ok(12));
        assert_eq!(eval("100 / 10 / 2"), Ok(5));
    }

    #[test]
    fn test_relational_and_equality() {
        assert_eq!(eval("3 < 4"), Ok(1));
        assert_eq!(eval("4 <= 3"), Ok(0));
        assert_eq!(eval("1 < 2 == 1"), Ok(1));
        assert_eq!(eval("abc == abc"), Ok(1));
        assert_eq!(eval("abc != abd"), Ok(1));
    }

    #[test]
    fn test_string_equality_compares_text() {
        // equality is a string comparison: numerically equal spellings differ
        assert_eq!(eval("007 == 7"), Ok(0));
        assert_eq!(eval("007 != 7"), Ok(1));
    }

    #[test]
    fn test_empty_equals_zero_string() {
        assert_eq!(eval("\"\" == \"0\""), Ok(1));
        assert_eq!(eval("\"0\" == \"\""), Ok(1));
        assert_eq!(eval("\"\" != \"0\""), Ok(0));
        assert_eq!(eval("\"\" == \"1\""), Ok(0));
    }

    #[test]
    fn test_equivalence_operators() {
        assert_eq!(eval("abc ≡ abc"), Ok(1));
        assert_eq!(eval("abc ≢ abd"), Ok(1));
    }

    #[test]
    fn test_divide_by_zero() {
        assert!(matches!(eval("1 / 0"), Err(ExprError::DivideByZero { .. })));
        assert!(matches!(eval("1 % 0"), Err(ExprError::DivideByZero { .. })));
    }

    #[test]
    fn test_shifts() {
        assert_eq!(eval("1 << 4"), Ok(16));
        assert_eq!(eval("16 >> 2"), Ok(4));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(eval("12 & 10"), Ok(8));
        assert_eq!(eval("12 | 10"), Ok(14));
        assert_eq!(eval("12 ^ 10"), Ok(6));
        assert_eq!(eval("~0"), Ok(-1));
    }

    #[test]
    fn test_logical_nan_tolerant() {
        assert_eq!(eval("abc && 1"), Ok(1));
        assert_eq!(eval("abc || 0"), Ok(1));
        assert_eq!(eval("0 && abc"), Ok(0));
        assert_eq!(eval("!abc"), Ok(0));
        assert_eq!(eval("!0"), Ok(1));
    }

    #[test]
    fn test_arithmetic_requires_numbers() {
        assert!(matches!(
            eval("abc + 1"),
            Err(ExprError::ExpectedNumber { .. })
        ));
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval("-3 + 5"), Ok(2));
        assert_eq!(eval("- - 3"), Ok(3));
        assert_eq!(eval("+abc") // unary plus never checks
            .is_ok(), true);
    }

    #[test]
    fn test_empty_expression_is_zero() {
        assert_eq!(eval(""), Ok(0));
    }

    #[test]
    fn test_non_numeric_result_is_one() {
        assert_eq!(eval("abc"), Ok(1));
    }

    #[test]
    fn test_missing_operand_is_empty_token() {
        // `1 +` parses with a phantom empty operand, which is not a number
        assert!(matches!(eval("1 +"), Err(ExprError::ExpectedNumber { .. })));
        // but `1 ==` compares against the empty string
        assert_eq!(eval("0 =="), Ok(1));
    }

    #[test]
    fn test_missing_binary_operator() {
        assert!(matches!(
            eval("1 2"),
            Err(ExprError::ExpectedBinaryOperator { .. })
        ));
    }

    #[test]
    fn test_extra_rparen() {
        assert_eq!(eval("(1 + 2))"), Err(ExprError::ExtraRParen));
    }

    #[test]
    fn test_unterminated_paren() {
        assert!(matches!(eval("(1 + 2"), Err(ExprError::UnexpectedEnd { .. })));
    }
}
