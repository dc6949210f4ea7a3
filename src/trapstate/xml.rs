//! Trapstate XML document
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8" standalone="yes"?>
//! <trapstate>
//!     <timestamp>1368101400107</timestamp>
//!     <cause>ERROR</cause>
//!     <description>Inference failure: CONTRADICTION crazy_fact</description>
//!     <triggering-message>input(pid(42),crazy_fact);</triggering-message>
//!     <reschedule-delay>60000</reschedule-delay>
//!     <discard-after>172800000</discard-after>
//! </trapstate>
//! ```

use super::{Cause, Trapstate};
use crate::error::{Result, RubbleError};
use serde::{Deserialize, Deserializer};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

impl Trapstate {
    /// Serialize to the trapstate XML document
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(DECLARATION);
        out.push_str("\n<trapstate>\n");
        push_element(&mut out, "timestamp", &self.timestamp.to_string());
        push_element(&mut out, "cause", self.cause.as_str());
        push_element(&mut out, "description", &self.description);
        push_element(&mut out, "triggering-message", &self.triggering_message);
        push_element(&mut out, "reschedule-delay", &self.reschedule_delay_ms.to_string());
        push_element(&mut out, "discard-after", &self.discard_after_ms.to_string());
        if let Some(ref condition) = self.pause_condition {
            push_element(&mut out, "pause-condition", condition);
        }
        out.push_str("</trapstate>\n");
        out
    }

    /// Parse a trapstate XML document
    pub fn from_xml(xml: &str) -> Result<Self> {
        let body = root_body(xml)?;

        let timestamp = required(body, "timestamp")?
            .trim()
            .parse()
            .map_err(|_| malformed("timestamp is not a number"))?;
        let cause: Cause = required(body, "cause")?.parse()?;
        let description = element(body, "description")?.unwrap_or_default();
        let triggering_message = element(body, "triggering-message")?.unwrap_or_default();
        let reschedule_delay_ms = required(body, "reschedule-delay")?
            .trim()
            .parse()
            .map_err(|_| malformed("reschedule-delay is not a number"))?;
        let discard_after_ms = required(body, "discard-after")?
            .trim()
            .parse()
            .map_err(|_| malformed("discard-after is not a number"))?;
        let pause_condition = element(body, "pause-condition")?;

        Ok(Trapstate {
            timestamp,
            cause,
            description,
            triggering_message,
            reschedule_delay_ms,
            discard_after_ms,
            pause_condition,
        })
    }
}

/// Deserialize the JSON `trapstate` property: XML text, blank means none
pub(crate) fn deserialize_xml_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Trapstate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(xml) if !xml.trim().is_empty() => Trapstate::from_xml(&xml)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn malformed(what: &str) -> RubbleError {
    RubbleError::MalformedTrapstate(what.to_string())
}

fn push_element(out: &mut String, name: &str, text: &str) {
    out.push_str("    <");
    out.push_str(name);
    out.push('>');
    escape_into(out, text);
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

/// Content between `<trapstate ...>` and `</trapstate>`
fn root_body(xml: &str) -> Result<&str> {
    let mut rest = xml.trim_start_matches('\u{feff}').trim_start();
    if rest.starts_with("<?") {
        let end = rest
            .find("?>")
            .ok_or_else(|| malformed("unterminated XML declaration"))?;
        rest = &rest[end + 2..];
    }
    let open = rest
        .find("<trapstate")
        .ok_or_else(|| malformed("missing <trapstate> root"))?;
    let after_name = &rest[open + "<trapstate".len()..];
    if !after_name.starts_with(|c: char| c == '>' || c.is_whitespace()) {
        return Err(malformed("missing <trapstate> root"));
    }
    let start = after_name
        .find('>')
        .ok_or_else(|| malformed("unterminated <trapstate> tag"))?;
    let body = &after_name[start + 1..];
    let end = body
        .rfind("</trapstate>")
        .ok_or_else(|| malformed("missing </trapstate>"))?;
    Ok(&body[..end])
}

fn required(body: &str, name: &str) -> Result<String> {
    element(body, name)?.ok_or_else(|| malformed(&format!("missing <{}>", name)))
}

/// Unescaped text of the first `<name>` child, `None` when absent
fn element(body: &str, name: &str) -> Result<Option<String>> {
    let empty = format!("<{}/>", name);
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);

    let Some(start) = body.find(&open) else {
        return Ok(body.contains(&empty).then(String::new));
    };
    let text = &body[start + open.len()..];
    let end = text
        .find(&close)
        .ok_or_else(|| malformed(&format!("unterminated <{}>", name)))?;
    unescape(&text[..end]).map(Some)
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find(['&', '<']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
            let end = cdata
                .find("]]>")
                .ok_or_else(|| malformed("unterminated CDATA section"))?;
            out.push_str(&cdata[..end]);
            rest = &cdata[end + 3..];
            continue;
        }
        if rest.starts_with('<') {
            return Err(malformed("unexpected markup in element text"));
        }

        let end = rest
            .find(';')
            .ok_or_else(|| malformed("unterminated entity reference"))?;
        let entity = &rest[1..end];
        let ch = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            numeric => numeric
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| numeric.strip_prefix('#').map(str::parse::<u32>))
                .and_then(|code| code.ok())
                .and_then(char::from_u32)
                .ok_or_else(|| malformed(&format!("unknown entity &{};", numeric)))?,
        };
        out.push(ch);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{self, Term};

    const DOCUMENTED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<trapstate>
    <timestamp>1368101400107</timestamp>
    <cause>ERROR</cause>
    <description>Inference failure: CONTRADICTION crazy_fact</description>
    <triggering-message>input(pid(42),crazy_fact);</triggering-message>
    <reschedule-delay>60000</reschedule-delay>
    <discard-after>172800000</discard-after>
</trapstate>
"#;

    #[test]
    fn test_parse_documented_example() {
        let trap = Trapstate::from_xml(DOCUMENTED).unwrap();
        assert_eq!(trap.timestamp, 1_368_101_400_107);
        assert_eq!(trap.cause, Cause::Error);
        assert_eq!(trap.description, "Inference failure: CONTRADICTION crazy_fact");
        assert_eq!(trap.triggering_message, "input(pid(42),crazy_fact);");
        let terms = trap.triggering_terms().unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].name(), Some("input"));
        assert_eq!(trap.reschedule_delay_ms, 60_000);
        assert_eq!(trap.discard_after_ms, 172_800_000);
        assert_eq!(trap.pause_condition, None);
    }

    #[test]
    fn test_emits_documented_layout() {
        let trap = Trapstate::from_xml(DOCUMENTED).unwrap();
        assert_eq!(trap.to_xml(), DOCUMENTED);
    }

    #[test]
    fn test_escaping_and_pause_condition() {
        let trap = Trapstate::pause_on("count(X), X > 3 & X < 10", 7)
            .with_triggering_message(vec![Term::atom("a <b>")]);
        let xml = trap.to_xml();
        assert!(xml.contains("<pause-condition>count(X), X &gt; 3 &amp; X &lt; 10</pause-condition>"));
        assert!(xml.contains("<cause>PAUSE-ON-CONDITION</cause>"));
        assert_eq!(Trapstate::from_xml(&xml).unwrap(), trap);
    }

    #[test]
    fn test_lenient_input() {
        let xml = "<trapstate><timestamp> 5 </timestamp><cause>PAUSE_ON_CONDITION</cause>\
                   <triggering-message/><reschedule-delay>0</reschedule-delay>\
                   <discard-after>1</discard-after>\
                   <pause-condition><![CDATA[x > 1]]>&#x26;&#38;</pause-condition></trapstate>";
        let trap = Trapstate::from_xml(xml).unwrap();
        assert_eq!(trap.timestamp, 5);
        assert_eq!(trap.cause, Cause::PauseOnCondition);
        assert_eq!(trap.description, "");
        assert!(trap.triggering_message.is_empty());
        assert_eq!(trap.pause_condition.as_deref(), Some("x > 1&&"));
    }

    #[test]
    fn test_unparsed_triggering_message_is_kept() {
        let xml = DOCUMENTED.replace("input(pid(42),crazy_fact);", "reading(x &lt;- 1.0E10 ?);");
        let trap = Trapstate::from_xml(&xml).unwrap();
        assert_eq!(trap.triggering_message, "reading(x <- 1.0E10 ?);");
        assert!(trap.triggering_terms().is_err());
        assert_eq!(trap.to_xml(), xml);
    }

    #[test]
    fn test_float_triggering_message_round_trip() {
        let big = serde_json::Number::from_f64(1e20).unwrap();
        let trap = Trapstate::new(Cause::Error, "overflow", 5)
            .with_triggering_message(vec![term!("reading", Term::Number(big), Term::int(-3))]);
        let back = Trapstate::from_xml(&trap.to_xml()).unwrap();
        assert_eq!(back, trap);
        assert_eq!(back.triggering_terms().unwrap(), trap.triggering_terms().unwrap());

        let java = DOCUMENTED.replace("input(pid(42),crazy_fact);", "reading(1.0E10);");
        let terms = Trapstate::from_xml(&java).unwrap().triggering_terms().unwrap();
        let expected = serde_json::Number::from_f64(1.0e10).unwrap();
        assert_eq!(terms, vec![term!("reading", Term::Number(expected))]);
    }

    #[test]
    fn test_malformed_documents() {
        let missing_cause = DOCUMENTED.replace("<cause>ERROR</cause>", "");
        let bad_number = DOCUMENTED.replace("60000", "soon");
        for xml in [
            "",
            "<trapstates></trapstates>",
            "<trapstate><timestamp>1</timestamp>",
            missing_cause.as_str(),
            bad_number.as_str(),
        ] {
            assert!(
                matches!(Trapstate::from_xml(xml), Err(RubbleError::MalformedTrapstate(_))),
                "{xml}"
            );
        }
    }
}
