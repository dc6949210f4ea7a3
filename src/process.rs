//! Process registry types
//!
//! A process is a server-side unit of rule-governed state. The server owns
//! it; these are transient client copies and request bodies.

use crate::error::{Result, RubbleError};
use crate::term::{self, Term};
use crate::time;
use crate::trapstate::{self, ProcessState, Trapstate};
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Pid
// ============================================================================

/// Numeric process ID, assigned by the server at creation
///
/// Travels as a JSON string of digits; numbers are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u64);

impl Pid {
    /// The alias-delete sentinel
    pub const NONE: Pid = Pid(0);
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Pid {
    fn from(pid: u64) -> Self {
        Pid(pid)
    }
}

impl FromStr for Pid {
    type Err = RubbleError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse()
            .map(Pid)
            .map_err(|_| RubbleError::InvalidResponse(format!("not a process ID: {:?}", s)))
    }
}

impl Serialize for Pid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PidVisitor;

        impl Visitor<'_> for PidVisitor {
            type Value = Pid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a process ID as a string of digits or a number")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Pid, E> {
                Ok(Pid(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Pid, E> {
                u64::try_from(v)
                    .map(Pid)
                    .map_err(|_| E::custom("negative process ID"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Pid, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PidVisitor)
    }
}

// ============================================================================
// Rules reference
// ============================================================================

/// Locator of the rule file controlling a process
///
/// `file:/PATH`, `file://DOMAIN/PATH`, `file:///PATH` (same as
/// `file:/PATH`) or empty for no rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulesRef(String);

impl RulesRef {
    /// Validate a locator
    pub fn new(locator: impl Into<String>) -> Result<Self> {
        let locator = locator.into();
        if locator.is_empty() {
            return Ok(Self(locator));
        }
        let rest = locator
            .strip_prefix("file:/")
            .ok_or_else(|| RubbleError::InvalidRulesRef(locator.clone()))?;
        let path_ok = match rest.strip_prefix('/') {
            // file:///PATH
            Some(after) if after.starts_with('/') => after.len() > 1,
            // file://DOMAIN/PATH
            Some(after) => after
                .split_once('/')
                .is_some_and(|(domain, path)| !domain.is_empty() && !path.is_empty()),
            // file:/PATH
            None => !rest.is_empty(),
        };
        if !path_ok {
            return Err(RubbleError::InvalidRulesRef(locator));
        }
        Ok(Self(locator))
    }

    /// A rule file in the caller's own domain
    pub fn local(path: &str) -> Self {
        Self(format!("file:/{}", path.trim_start_matches('/')))
    }

    /// No rules
    pub fn none() -> Self {
        Self::default()
    }

    /// The locator text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Domain named by a `file://DOMAIN/PATH` locator
    pub fn domain(&self) -> Option<&str> {
        let after = self.0.strip_prefix("file://")?;
        if after.starts_with('/') {
            return None;
        }
        after.split_once('/').map(|(domain, _)| domain)
    }

    /// Path within the domain, without leading slash
    pub fn path(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("file:/")?;
        let path = match rest.strip_prefix('/') {
            Some(after) if after.starts_with('/') => &after[1..],
            Some(after) => after.split_once('/').map(|(_, path)| path)?,
            None => rest,
        };
        Some(path)
    }
}

impl fmt::Display for RulesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Facts
// ============================================================================

/// Storage format of a process's facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FactsFormat {
    /// Native Rubble syntax, supplied as source text
    Native,
    /// XML, supplied as source text
    Xml,
    /// JSON array of terms, stored natively
    #[default]
    Json,
}

impl FactsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactsFormat::Native => "native",
            FactsFormat::Xml => "xml",
            FactsFormat::Json => "json",
        }
    }

    /// Legacy numeric codes: `1` native, `2` xml
    fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(FactsFormat::Native),
            2 => Some(FactsFormat::Xml),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for FactsFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FormatVisitor;

        impl Visitor<'_> for FormatVisitor {
            type Value = FactsFormat;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("native, xml, json, 1 or 2")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<FactsFormat, E> {
                FactsFormat::from_code(v)
                    .ok_or_else(|| E::custom(format!("unknown facts format code {}", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<FactsFormat, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(FactsFormat::from_code)
                    .ok_or_else(|| E::custom(format!("unknown facts format code {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<FactsFormat, E> {
                match v {
                    "native" | "1" => Ok(FactsFormat::Native),
                    "xml" | "2" => Ok(FactsFormat::Xml),
                    "json" => Ok(FactsFormat::Json),
                    other => Err(E::custom(format!("unknown facts format {:?}", other))),
                }
            }
        }

        deserializer.deserialize_any(FormatVisitor)
    }
}

/// Process facts: a term array (json) or source text (native, xml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Facts {
    Terms(Vec<Term>),
    Source(String),
}

impl Facts {
    /// Check the facts against the format they will be stored in
    ///
    /// An empty string is always accepted.
    pub fn check_format(&self, format: FactsFormat) -> Result<()> {
        match (format, self) {
            (_, Facts::Source(s)) if s.is_empty() => Ok(()),
            (FactsFormat::Json, Facts::Terms(_)) => Ok(()),
            (FactsFormat::Native | FactsFormat::Xml, Facts::Source(_)) => Ok(()),
            (FactsFormat::Json, Facts::Source(_)) => Err(RubbleError::FormatMismatch {
                format: format.as_str(),
                expected: "term-array",
            }),
            (_, Facts::Terms(_)) => Err(RubbleError::FormatMismatch {
                format: format.as_str(),
                expected: "source-text",
            }),
        }
    }
}

impl From<Vec<Term>> for Facts {
    fn from(terms: Vec<Term>) -> Self {
        Facts::Terms(terms)
    }
}

// ============================================================================
// Process
// ============================================================================

/// A process as returned by `GET process`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Process {
    pub pid: Pid,
    /// Last modification, epoch milliseconds
    pub modtime: i64,
    pub domain: String,
    #[serde(rename = "rulesref", default)]
    pub rules_ref: RulesRef,
    #[serde(rename = "factsformat", default)]
    pub facts_format: FactsFormat,
    #[serde(default)]
    pub facts: Option<Facts>,
    #[serde(default, deserialize_with = "trapstate::deserialize_xml_opt")]
    pub trapstate: Option<Trapstate>,
}

impl Process {
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        time::from_millis(self.modtime)
    }

    /// Current trapstate machine state
    pub fn state(&self) -> ProcessState {
        ProcessState::of(self.trapstate.as_ref())
    }

    /// Whether messages are delivered to the process right now
    pub fn accepts_messages(&self) -> bool {
        !self.state().blocks_delivery()
    }

    /// Facts as terms; native source is parsed, XML is not supported
    pub fn fact_terms(&self) -> Result<Vec<Term>> {
        match (&self.facts, self.facts_format) {
            (None, _) => Ok(Vec::new()),
            (Some(Facts::Terms(terms)), _) => Ok(terms.clone()),
            (Some(Facts::Source(src)), FactsFormat::Native | FactsFormat::Json) => {
                term::parse_source(src)
            }
            (Some(Facts::Source(_)), FactsFormat::Xml) => Err(RubbleError::FormatMismatch {
                format: "xml",
                expected: "term-array or native",
            }),
        }
    }
}

/// Wire body shared by `processcreate` and `processupdate`
#[derive(Debug, Serialize)]
pub(crate) struct ProcessRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<Pid>,
    pub rulesref: &'a RulesRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factsformat: Option<FactsFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<&'a Facts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trapstate: Option<String>,
}

/// Input for creating a process
#[derive(Debug, Clone, Default)]
pub struct CreateProcess {
    pub rules_ref: RulesRef,
    /// Defaults to json on the server
    pub facts_format: Option<FactsFormat>,
    /// Defaults to an empty set of facts
    pub facts: Option<Facts>,
    /// Typically omitted at creation
    pub trapstate: Option<Trapstate>,
}

impl CreateProcess {
    pub fn new(rules_ref: RulesRef) -> Self {
        Self {
            rules_ref,
            ..Default::default()
        }
    }

    pub fn with_facts(mut self, format: FactsFormat, facts: impl Into<Facts>) -> Self {
        self.facts_format = Some(format);
        self.facts = Some(facts.into());
        self
    }

    pub fn with_trapstate(mut self, trapstate: Trapstate) -> Self {
        self.trapstate = Some(trapstate);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_facts(self.facts_format, self.facts.as_ref())
    }

    pub(crate) fn request(&self) -> ProcessRequest<'_> {
        ProcessRequest {
            pid: None,
            rulesref: &self.rules_ref,
            factsformat: self.facts_format,
            facts: self.facts.as_ref(),
            trapstate: self.trapstate.as_ref().map(Trapstate::to_xml),
        }
    }
}

/// Input for updating a process
///
/// Omitted fields are defaulted exactly as on creation, not kept at their
/// stored values. Leaving `trapstate` empty returns the process to normal.
#[derive(Debug, Clone)]
pub struct UpdateProcess {
    pub pid: Pid,
    pub rules_ref: RulesRef,
    pub facts_format: Option<FactsFormat>,
    pub facts: Option<Facts>,
    pub trapstate: Option<Trapstate>,
}

impl UpdateProcess {
    pub fn new(pid: Pid, rules_ref: RulesRef) -> Self {
        Self {
            pid,
            rules_ref,
            facts_format: None,
            facts: None,
            trapstate: None,
        }
    }

    /// Rewrite a fetched process, keeping its rules, facts and trapstate
    pub fn from_process(process: &Process) -> Self {
        Self {
            pid: process.pid,
            rules_ref: process.rules_ref.clone(),
            facts_format: Some(process.facts_format),
            facts: process.facts.clone(),
            trapstate: process.trapstate.clone(),
        }
    }

    pub fn with_facts(mut self, format: FactsFormat, facts: impl Into<Facts>) -> Self {
        self.facts_format = Some(format);
        self.facts = Some(facts.into());
        self
    }

    pub fn with_trapstate(mut self, trapstate: Option<Trapstate>) -> Self {
        self.trapstate = trapstate;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_facts(self.facts_format, self.facts.as_ref())
    }

    pub(crate) fn request(&self) -> ProcessRequest<'_> {
        ProcessRequest {
            pid: Some(self.pid),
            rulesref: &self.rules_ref,
            factsformat: self.facts_format,
            facts: self.facts.as_ref(),
            trapstate: self.trapstate.as_ref().map(Trapstate::to_xml),
        }
    }
}

/// Source formats need their facts as text, even if empty
fn validate_facts(format: Option<FactsFormat>, facts: Option<&Facts>) -> Result<()> {
    let format = format.unwrap_or_default();
    match facts {
        Some(facts) => facts.check_format(format),
        None if format == FactsFormat::Json => Ok(()),
        None => Err(RubbleError::FormatMismatch {
            format: format.as_str(),
            expected: "source-text",
        }),
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Kind of process in a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    Rules,
    Script,
    #[serde(other)]
    Unknown,
}

/// One entry of `processlist`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub pid: Pid,
    pub domain: String,
    pub modtime: i64,
    #[serde(rename = "type")]
    pub kind: ProcessKind,
}

/// Options for listing processes
#[derive(Debug, Clone, Default)]
pub struct ProcessListOptions {
    /// Lower limit for listed process IDs (pagination)
    pub pid_begin: Option<Pid>,
    /// Return at most this many entries (pagination)
    pub max_items: Option<u32>,
}

impl ProcessListOptions {
    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(pid) = self.pid_begin {
            params.push(("pidBegin", pid.to_string()));
        }
        if let Some(max) = self.max_items {
            params.push(("maxItems", max.to_string()));
        }
        params
    }
}
