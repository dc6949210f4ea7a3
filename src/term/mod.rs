//! Herbrand terms exchanged with Rubble processes
//!
//! Terms have two serializations:
//! - **Structured** (JSON): atoms are strings, numbers are numbers, a
//!   compound is an array whose first element is the functor name.
//! - **Source** (native Rubble syntax): `f(g(h),i(j,k));`
//!
//! ```text
//! [["completed","task23"],        completed(task23);
//!  ["device_category","1",        device_category(1,"Mobile device");
//!   "Mobile device"],
//!  ["leap_year"],                 leap_year;
//!  "daylight_saving",             daylight_saving;
//!  ["f",["g","h"],["i","j","k"]]] f(g(h),i(j,k));
//! ```

mod source;
mod structured;

pub use source::{encode_facts_source, parse_source};
pub use structured::{decode_structured, encode_structured};

use crate::error::{Result, RubbleError};
use std::fmt;

/// A Herbrand term
///
/// String literals are atoms; the source encoder quotes them when they
/// are not bare identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// An atom or string literal
    Atom(String),
    /// A numeric literal
    Number(serde_json::Number),
    /// A functor applied to arguments
    Compound(Compound),
}

/// A functor with a fixed, ordered argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    functor: String,
    args: Vec<Term>,
}

impl Compound {
    /// Functor name, never empty
    pub fn functor(&self) -> &str {
        &self.functor
    }

    /// Arguments in order
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl Term {
    /// An atom
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    /// An integer literal
    pub fn int(value: i64) -> Self {
        Term::Number(value.into())
    }

    /// A compound term; fails when `functor` is empty
    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Result<Self> {
        let functor = functor.into();
        if functor.is_empty() {
            return Err(RubbleError::MalformedTerm(
                "compound functor name is empty".to_string(),
            ));
        }
        Ok(Term::Compound(Compound { functor, args }))
    }

    /// `input(from, term)`, the wrapper applied to messages carrying a sender tag
    pub fn input(from: impl Into<String>, term: Term) -> Self {
        Term::Compound(Compound {
            functor: "input".to_string(),
            args: vec![Term::atom(from), term],
        })
    }

    /// The atom text, if this is an atom
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(name) => Some(name),
            _ => None,
        }
    }

    /// The compound, if this is one
    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Term::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    /// Functor name of a compound or the name of an atom
    pub fn name(&self) -> Option<&str> {
        match self {
            Term::Atom(name) => Some(name),
            Term::Compound(compound) => Some(&compound.functor),
            Term::Number(_) => None,
        }
    }

    /// Structured JSON form
    pub fn to_structured(&self) -> serde_json::Value {
        structured::encode(self)
    }

    /// Decode from structured JSON form
    pub fn from_structured(value: &serde_json::Value) -> Result<Self> {
        structured::decode(value)
    }

    /// Source form as a clause, e.g. `functor(arg1,arg2);`
    pub fn to_source(&self) -> String {
        format!("{};", self)
    }
}

/// Source form without the clause terminator
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        source::write_term(f, self)
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Term::atom(name)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::int(value)
    }
}

/// Build a compound term, panicking on an empty functor.
///
/// Meant for literals in code and tests: `term!("f", "a", term!("g", "b"))`.
#[macro_export]
macro_rules! term {
    ($functor:expr) => {
        $crate::Term::compound($functor, Vec::new()).expect("non-empty functor")
    };
    ($functor:expr, $($arg:expr),+ $(,)?) => {
        $crate::Term::compound($functor, vec![$($crate::Term::from($arg)),+])
            .expect("non-empty functor")
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_functor_rejected() {
        let err = Term::compound("", vec![Term::atom("a")]).unwrap_err();
        assert!(matches!(err, RubbleError::MalformedTerm(_)));
    }

    #[test]
    fn test_compound_accessors() {
        let t = term!("completed", "task23");
        let c = t.as_compound().unwrap();
        assert_eq!(c.functor(), "completed");
        assert_eq!(c.arity(), 1);
        assert_eq!(c.args()[0].as_atom(), Some("task23"));
        assert_eq!(t.name(), Some("completed"));
    }

    #[test]
    fn test_input_wrapper() {
        let wrapped = Term::input("alice", Term::atom("ping"));
        assert_eq!(wrapped, term!("input", "alice", "ping"));
    }

    #[test]
    fn test_to_source() {
        assert_eq!(term!("f", term!("g", "h"), term!("i", "j", "k")).to_source(), "f(g(h),i(j,k));");
        assert_eq!(Term::atom("daylight_saving").to_source(), "daylight_saving;");
    }
}
