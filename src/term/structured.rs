//! Structured (JSON array) encoding of terms

use super::{Compound, Term};
use crate::error::{Result, RubbleError};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

pub(super) fn encode(term: &Term) -> Value {
    match term {
        Term::Atom(name) => Value::String(name.clone()),
        Term::Number(n) => Value::Number(n.clone()),
        Term::Compound(c) => {
            let mut items = Vec::with_capacity(c.args.len() + 1);
            items.push(Value::String(c.functor.clone()));
            items.extend(c.args.iter().map(encode));
            Value::Array(items)
        }
    }
}

pub(super) fn decode(value: &Value) -> Result<Term> {
    match value {
        Value::String(name) => Ok(Term::Atom(name.clone())),
        Value::Number(n) => Ok(Term::Number(n.clone())),
        Value::Array(items) => {
            let (head, rest) = items.split_first().ok_or_else(|| {
                RubbleError::MalformedTerm("empty array is not a term".to_string())
            })?;
            let functor = match head {
                Value::String(f) if !f.is_empty() => f.clone(),
                Value::String(_) => {
                    return Err(RubbleError::MalformedTerm(
                        "compound functor name is empty".to_string(),
                    ))
                }
                other => {
                    return Err(RubbleError::MalformedTerm(format!(
                        "compound functor must be a string, got {}",
                        other
                    )))
                }
            };
            let args = rest.iter().map(decode).collect::<Result<Vec<_>>>()?;
            Ok(Term::Compound(Compound { functor, args }))
        }
        other => Err(RubbleError::MalformedTerm(format!(
            "unexpected JSON value {}",
            other
        ))),
    }
}

/// Encode a sequence of terms as a JSON array
pub fn encode_structured(terms: &[Term]) -> Value {
    Value::Array(terms.iter().map(encode).collect())
}

/// Decode a JSON array of terms
pub fn decode_structured(value: &Value) -> Result<Vec<Term>> {
    match value {
        Value::Array(items) => items.iter().map(decode).collect(),
        other => Err(RubbleError::MalformedTerm(format!(
            "expected an array of terms, got {}",
            other
        ))),
    }
}

impl Serialize for Term {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term;
    use serde_json::json;

    #[test]
    fn test_decode_appendix_facts() {
        let value = json!([
            ["completed", "task23"],
            ["device_category", "1", "Mobile device"],
            ["leap_year"],
            "daylight_saving",
            ["f", ["g", "h"], ["i", "j", "k"]]
        ]);
        let terms = decode_structured(&value).unwrap();
        assert_eq!(terms.len(), 5);
        assert_eq!(terms[0], term!("completed", "task23"));
        assert_eq!(terms[2].as_compound().unwrap().arity(), 0);
        assert_eq!(terms[3], Term::atom("daylight_saving"));
        assert_eq!(terms[4], term!("f", term!("g", "h"), term!("i", "j", "k")));
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let terms = vec![
            term!("leap_year"),
            Term::atom("leap_year"),
            Term::int(-7),
            Term::Number(serde_json::Number::from_f64(2.5).unwrap()),
            term!("input", "alice", term!("deep", term!("deeper", "x"))),
        ];
        let decoded = decode_structured(&encode_structured(&terms)).unwrap();
        assert_eq!(decoded, terms);
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in [json!([]), json!([""]), json!([1, "a"]), json!(null), json!({"f": 1}), json!(true)] {
            let err = Term::from_structured(&bad).unwrap_err();
            assert!(matches!(err, RubbleError::MalformedTerm(_)), "{bad}");
        }
        assert!(decode_structured(&json!("not-an-array")).is_err());
        assert!(decode_structured(&json!([["ok"], [[]]])).is_err());
    }

    #[test]
    fn test_serde_impls_use_structured_form() {
        let t = term!("completed", "task23");
        assert_eq!(serde_json::to_value(&t).unwrap(), json!(["completed", "task23"]));
        let back: Vec<Term> = serde_json::from_str(r#"[["a","b"],"c",3]"#).unwrap();
        assert_eq!(back, vec![term!("a", "b"), Term::atom("c"), Term::int(3)]);
        assert!(serde_json::from_str::<Term>("[]").is_err());
    }
}
