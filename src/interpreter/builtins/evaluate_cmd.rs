//! Evaluate — expression evaluation and variable arithmetic.
//!
//! Unlike the other builtins this one works on expression tokens, not
//! words, so the engine calls it directly:
//!
//! ```text
//! Evaluate [-h | -o | -b] expression
//! Evaluate name = expression
//! Evaluate name += expression
//! Evaluate name -= expression
//! ```

use crate::interpreter::builtins::fd_write;
use crate::interpreter::environment::Environment;
use crate::interpreter::expression::{evaluate_expression, ExprError};
use crate::interpreter::fdset::FdMask;
use crate::interpreter::value::Value;
use crate::interpreter::words::{Word, WordKind};

/// Run an Evaluate command. `tokens` is the expression-mode token stream
/// of the whole line, `Evaluate` keyword included.
pub fn builtin_evaluate(
    env: &mut Environment,
    mut tokens: Vec<Word>,
    fds: &FdMask,
) -> Result<i32, ExprError> {
    let mut output = 'd';

    tokens.reverse();
    tokens.pop(); // the Evaluate keyword

    // -h / -o / -b select the output radix
    if tokens.len() >= 2 && tokens.last().map(|t| t.kind) == Some(WordKind::Minus) {
        let flag = &tokens[tokens.len() - 2];
        if flag.kind == WordKind::Text && flag.text.chars().count() == 1 {
            let c = flag
                .text
                .chars()
                .next()
                .unwrap_or('d')
                .to_ascii_lowercase();
            if matches!(c, 'h' | 'o' | 'b') {
                output = c;
                tokens.pop();
                tokens.pop();
            }
        }
    }

    // name (= | += | -=) expression
    if tokens.len() >= 2 && tokens.last().map(|t| t.kind) == Some(WordKind::Text) {
        let op = tokens[tokens.len() - 2].kind;
        if matches!(
            op,
            WordKind::Assign | WordKind::PlusAssign | WordKind::MinusAssign
        ) {
            let name = tokens.pop().map(|t| t.text).unwrap_or_default();
            tokens.pop();

            let mut result = evaluate_expression("Evaluate", tokens)?;
            if op != WordKind::Assign {
                let mut old = env
                    .get(&name)
                    .map(Value::new)
                    .unwrap_or_else(Value::empty);
                let old = old.to_number().ok_or_else(|| ExprError::ExpectedNumber {
                    name: "Evaluate".to_string(),
                    text: old.text().to_string(),
                })?;
                result = if op == WordKind::PlusAssign {
                    old.wrapping_add(result)
                } else {
                    old.wrapping_sub(result)
                };
            }
            env.set(&name, &result.to_string(), false);
            return Ok(0);
        }
    }

    let value = evaluate_expression("Evaluate", tokens)?;
    let text = match output {
        'h' => format!("0x{:08x}\n", value),
        'o' => format!("0{:o}\n", value),
        'b' => {
            let mut bits = String::from("0b");
            let mut n = value as u32;
            for _ in 0..32 {
                bits.push(if n & 0x8000_0000 != 0 { '1' } else { '0' });
                n <<= 1;
            }
            bits.push('\n');
            bits
        }
        _ => format!("{}\n", value),
    };
    fd_write(fds.stdout(), &text);
    Ok(0)
}
