//! Boolean conditions for `if`, `elseif` and `loop condition`.
//!
//! Deliberately small: operands are variables, literals and `#name#`
//! references; operators are comparisons, `contains`, `and`/`or`/`not` and
//! parentheses. There is no arithmetic and no function calls.
//!
//! ```text
//! or      := and (("or" | "||") and)*
//! and     := not (("and" | "&&") not)*
//! not     := ("not" | "!") not | compare
//! compare := operand (op operand)?
//! operand := number | string | "true" | "false" | name | "#" name "#" | "(" or ")"
//! ```

use crate::scope::Scope;
use crate::value::Value;
use std::cmp::Ordering;

/// Cap on `not` and parenthesis nesting; evaluation recurses per level.
const MAX_NESTING: usize = 64;

/// Why a condition could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("{0}")]
    Syntax(String),
    #[error("undefined variable '{0}'")]
    Undefined(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Name(String),
    Op(Op),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

/// Evaluate `source` against `scope`.
pub fn evaluate(source: &str, scope: &Scope) -> Result<bool, ConditionError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ConditionError::Syntax("empty condition".into()));
    }

    let mut eval = Evaluator {
        tokens,
        pos: 0,
        depth: 0,
        scope,
    };
    let value = eval.or()?;
    if let Some(extra) = eval.tokens.get(eval.pos) {
        return Err(ConditionError::Syntax(format!("unexpected {extra:?}")));
    }
    Ok(value.is_truthy())
}

fn tokenize(source: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied().unwrap_or('\0');
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' | '\'' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ConditionError::Syntax("unterminated string".into())),
                        Some(&q) if q == c && chars.get(i + 1) == Some(&c) => {
                            value.push(c);
                            i += 2;
                        }
                        Some(&q) if q == c => {
                            i += 1;
                            break;
                        }
                        Some(&other) => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            '#' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '#')
                    .ok_or_else(|| ConditionError::Syntax("unmatched '#'".into()))?;
                let name: String = chars[i + 1..i + 1 + close].iter().collect();
                tokens.push(Token::Name(name.trim().to_string()));
                i += close + 2;
            }
            '=' if next == '=' => {
                tokens.push(Token::Op(Op::Eq));
                i += 2;
            }
            '!' if next == '=' => {
                tokens.push(Token::Op(Op::Neq));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' if next == '>' => {
                tokens.push(Token::Op(Op::Neq));
                i += 2;
            }
            '<' if next == '=' => {
                tokens.push(Token::Op(Op::Lte));
                i += 2;
            }
            '>' if next == '=' => {
                tokens.push(Token::Op(Op::Gte));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Op(Op::Lt));
                i += 1;
            }
            '>' => {
                tokens.push(Token::Op(Op::Gt));
                i += 1;
            }
            '&' if next == '&' => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == '|' => {
                tokens.push(Token::Or);
                i += 2;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_ascii_digit()) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse()
                    .map_err(|_| ConditionError::Syntax(format!("invalid number '{text}'")))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = keyword_or_name(word, &mut tokens);
                tokens.push(token);
            }
            other => return Err(ConditionError::Syntax(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

/// Classify a word. `is not` folds into a single inequality.
fn keyword_or_name(word: String, tokens: &mut Vec<Token>) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" if tokens.last() == Some(&Token::Op(Op::Eq)) => {
            tokens.pop();
            Token::Op(Op::Neq)
        }
        "not" => Token::Not,
        "eq" | "is" | "equal" => Token::Op(Op::Eq),
        "neq" | "nequal" => Token::Op(Op::Neq),
        "gt" => Token::Op(Op::Gt),
        "gte" | "ge" => Token::Op(Op::Gte),
        "lt" => Token::Op(Op::Lt),
        "lte" | "le" => Token::Op(Op::Lte),
        "contains" => Token::Op(Op::Contains),
        _ => Token::Name(word),
    }
}

struct Evaluator<'s> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    scope: &'s Scope,
}

impl Evaluator<'_> {
    fn or(&mut self) -> Result<Value, ConditionError> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = Value::Bool(left.is_truthy() || right.is_truthy());
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Value, ConditionError> {
        let mut left = self.not()?;
        while self.eat(&Token::And) {
            let right = self.not()?;
            left = Value::Bool(left.is_truthy() && right.is_truthy());
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Value, ConditionError> {
        if self.eat(&Token::Not) {
            let inner = self.nested(Self::not)?;
            return Ok(Value::Bool(!inner.is_truthy()));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Value, ConditionError> {
        let left = self.operand()?;
        let Some(Token::Op(op)) = self.tokens.get(self.pos).cloned() else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.operand()?;
        Ok(Value::Bool(apply(op, &left, &right)))
    }

    fn operand(&mut self) -> Result<Value, ConditionError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ConditionError::Syntax("unexpected end of condition".into()))?;
        self.pos += 1;

        match token {
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Str(s) => Ok(Value::String(s)),
            Token::Name(name) => match name.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => self
                    .scope
                    .get(&name)
                    .cloned()
                    .ok_or(ConditionError::Undefined(name)),
            },
            Token::LParen => {
                let value = self.nested(Self::or)?;
                if !self.eat(&Token::RParen) {
                    return Err(ConditionError::Syntax("expected ')'".into()));
                }
                Ok(value)
            }
            other => Err(ConditionError::Syntax(format!("unexpected {other:?}"))),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, ConditionError>,
    ) -> Result<Value, ConditionError> {
        if self.depth >= MAX_NESTING {
            return Err(ConditionError::Syntax("condition nested too deeply".into()));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// Numeric comparison when both sides are numbers, otherwise
/// case-insensitive string comparison.
fn apply(op: Op, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => left.is_truthy().cmp(&right.is_truthy()),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => left
                .to_string()
                .to_lowercase()
                .cmp(&right.to_string().to_lowercase()),
        },
    };

    match op {
        Op::Eq => ordering == Ordering::Equal,
        Op::Neq => ordering != Ordering::Equal,
        Op::Gt => ordering == Ordering::Greater,
        Op::Gte => ordering != Ordering::Less,
        Op::Lt => ordering == Ordering::Less,
        Op::Lte => ordering != Ordering::Greater,
        Op::Contains => left
            .to_string()
            .to_lowercase()
            .contains(&right.to_string().to_lowercase()),
    }
}
