//! Native source syntax for terms

use super::{Compound, Term};
use crate::error::{Result, RubbleError};
use std::fmt::{self, Write};

pub(super) fn write_term(f: &mut fmt::Formatter<'_>, term: &Term) -> fmt::Result {
    match term {
        Term::Atom(name) => write_atom(f, name),
        Term::Number(n) => write!(f, "{}", n),
        Term::Compound(c) => {
            write_atom(f, &c.functor)?;
            if c.args.is_empty() {
                return Ok(());
            }
            f.write_char('(')?;
            for (i, arg) in c.args.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write_term(f, arg)?;
            }
            f.write_char(')')
        }
    }
}

fn write_atom(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_identifier(name) || is_numeral(name) {
        return f.write_str(name);
    }
    f.write_char('"')?;
    for ch in name.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('"')
}

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_numeral(name: &str) -> bool {
    let digits = name.strip_prefix('-').unwrap_or(name);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// Render terms as native facts: one clause per term, `;`-terminated
pub fn encode_facts_source(terms: &[Term]) -> String {
    terms
        .iter()
        .map(Term::to_source)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse `;`-separated native clauses into terms
///
/// Accepts identifiers, quoted strings, numbers and nested compounds.
/// `%` starts a comment running to the end of the line.
pub fn parse_source(input: &str) -> Result<Vec<Term>> {
    let mut parser = Parser {
        src: input.as_bytes(),
        input,
        pos: 0,
    };
    let mut terms = Vec::new();
    loop {
        parser.skip_trivia();
        if parser.at_end() {
            break;
        }
        terms.push(parser.term()?);
        parser.skip_trivia();
        if parser.at_end() {
            break;
        }
        parser.expect(b';')?;
    }
    Ok(terms)
}

struct Parser<'a> {
    src: &'a [u8],
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn error(&self, what: &str) -> RubbleError {
        RubbleError::MalformedTerm(format!("{} at offset {}", what, self.pos))
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn term(&mut self) -> Result<Term> {
        self.skip_trivia();
        let name = match self.peek() {
            Some(b'"') | Some(b'\'') => self.quoted()?,
            Some(b) if b == b'-' || b.is_ascii_digit() => return self.number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.identifier(),
            Some(_) => return Err(self.error("unexpected character")),
            None => return Err(self.error("unexpected end of input")),
        };

        self.skip_trivia();
        if self.peek() != Some(b'(') {
            return Ok(Term::Atom(name));
        }
        self.pos += 1;

        let mut args = vec![self.term()?];
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    args.push(self.term()?);
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
        if name.is_empty() {
            return Err(self.error("empty functor name"));
        }
        Ok(Term::Compound(Compound {
            functor: name,
            args,
        }))
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn quoted(&mut self) -> Result<String> {
        let quote = self.src[self.pos];
        self.pos += 1;
        let mut out = String::new();
        let input = self.input;
        let mut chars = input[self.pos..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                c if c as u32 == quote as u32 => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c => out.push(c),
            }
        }
        self.pos = self.src.len();
        Err(self.error("unterminated quoted atom"))
    }

    fn number(&mut self) -> Result<Term> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.error("expected digits"));
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.src.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.src.get(self.pos + 1), Some(b'+' | b'-')));
            if self.src.get(self.pos + 1 + sign).is_some_and(u8::is_ascii_digit) {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let text = &self.input[start..self.pos];
        let number = if is_float {
            text.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
        } else {
            text.parse::<i64>()
                .map(serde_json::Number::from)
                .ok()
                .or_else(|| text.parse::<u64>().ok().map(serde_json::Number::from))
        };
        number
            .map(Term::Number)
            .ok_or_else(|| self.error("number out of range"))
    }
}
