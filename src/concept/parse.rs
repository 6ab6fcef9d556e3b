//! Parser for the textual concept syntax.
//!
//! ```text
//! concept := unary (("⊓" | "&" | "and") unary)*
//! unary   := ("¬" | "!" | "not") unary
//!          | ("∃" | "some") NAME "." unary
//!          | ("∀" | "all") NAME "." unary
//!          | "(" concept ")"
//!          | "⊤" | "Top" | "Thing" | "⊥" | "Bottom" | "Nothing"
//!          | NAME
//! ```
//!
//! Names are NFC-normalized so composed and decomposed spellings coincide.

use std::str::FromStr;

use unicode_normalization::UnicodeNormalization;

use super::{Concept, Role};
use crate::error::ConceptError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Dot,
    Not,
    And,
    Exists,
    ForAll,
    Top,
    Bottom,
    Name(String),
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric()
        || unicode_normalization::char::is_combining_mark(c)
        || matches!(c, '_' | '-' | ':' | '#' | '/' | '\'' | '<' | '>')
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ConceptError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(offset, c)) = chars.peek() {
        let single = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            '.' => Some(Token::Dot),
            '¬' | '!' => Some(Token::Not),
            '⊓' | '&' => Some(Token::And),
            '∃' => Some(Token::Exists),
            '∀' => Some(Token::ForAll),
            '⊤' => Some(Token::Top),
            '⊥' => Some(Token::Bottom),
            _ => None,
        };
        if let Some(token) = single {
            chars.next();
            tokens.push((offset, token));
            continue;
        }
        if !is_name_char(c) {
            return Err(ConceptError::Syntax {
                offset,
                message: format!("unexpected character `{c}`"),
            });
        }
        let mut word = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if !is_name_char(c) {
                break;
            }
            word.push(c);
            chars.next();
        }
        let token = match word.as_str() {
            "not" => Token::Not,
            "and" => Token::And,
            "some" => Token::Exists,
            "all" => Token::ForAll,
            "Top" | "Thing" => Token::Top,
            "Bottom" | "Nothing" => Token::Bottom,
            _ => Token::Name(word.nfc().collect()),
        };
        tokens.push((offset, token));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> ConceptError {
        ConceptError::Syntax {
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn concept(&mut self) -> Result<Concept, ConceptError> {
        let mut operands = vec![self.unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            operands.push(self.unary()?);
        }
        Ok(Concept::and(operands))
    }

    fn restriction(&mut self) -> Result<(Role, Concept), ConceptError> {
        let role = match self.peek() {
            Some(Token::Name(name)) => Role::new(name.clone()),
            _ => return Err(self.error("expected a role name")),
        };
        self.pos += 1;
        if self.peek() != Some(&Token::Dot) {
            return Err(self.error("expected `.` after role name"));
        }
        self.pos += 1;
        Ok((role, self.unary()?))
    }

    fn unary(&mut self) -> Result<Concept, ConceptError> {
        let start = self.offset();
        match self.next() {
            Some(Token::Not) => Ok(Concept::not(self.unary()?)),
            Some(Token::Exists) => {
                let (role, filler) = self.restriction()?;
                Ok(Concept::exists(role, filler))
            }
            Some(Token::ForAll) => {
                let (role, filler) = self.restriction()?;
                Ok(Concept::for_all(role, filler))
            }
            Some(Token::Open) => {
                let inner = self.concept()?;
                if self.next() != Some(Token::Close) {
                    self.pos -= 1;
                    return Err(self.error("expected `)`"));
                }
                Ok(inner)
            }
            Some(Token::Top) => Ok(Concept::Top),
            Some(Token::Bottom) => Ok(Concept::Bottom),
            Some(Token::Name(name)) => Ok(Concept::Atomic(name)),
            Some(other) => Err(ConceptError::Syntax {
                offset: start,
                message: format!("unexpected {other:?}"),
            }),
            None => Err(ConceptError::Syntax {
                offset: start,
                message: "unexpected end of input".into(),
            }),
        }
    }
}

impl FromStr for Concept {
    type Err = ConceptError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            tokens: tokenize(input)?,
            pos: 0,
            end: input.len(),
        };
        let concept = parser.concept()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(concept)
    }
}
