use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The type prefix of a [`Uid`]: three tree-item headers and six element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UidKind {
    Solution,
    Project,
    Diagram,
    Pin,
    Input,
    Output,
    AndGate,
    OrGate,
    Wire,
}

impl UidKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            UidKind::Solution => "Solution",
            UidKind::Project => "Project",
            UidKind::Diagram => "Diagram",
            UidKind::Pin => "Pin",
            UidKind::Input => "Input",
            UidKind::Output => "Output",
            UidKind::AndGate => "AndGate",
            UidKind::OrGate => "OrGate",
            UidKind::Wire => "Wire",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "Solution" => UidKind::Solution,
            "Project" => UidKind::Project,
            "Diagram" => UidKind::Diagram,
            "Pin" => UidKind::Pin,
            "Input" => UidKind::Input,
            "Output" => UidKind::Output,
            "AndGate" => UidKind::AndGate,
            "OrGate" => UidKind::OrGate,
            "Wire" => UidKind::Wire,
            _ => return None,
        })
    }

    /// Solution, Project and Diagram name tree items, not diagram elements.
    pub const fn is_header(self) -> bool {
        matches!(self, UidKind::Solution | UidKind::Project | UidKind::Diagram)
    }
}

impl fmt::Display for UidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a `Type|number` name could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UidError {
    #[error("missing '|' in `{0}`")]
    MissingSeparator(String),
    #[error("unknown type prefix `{0}`")]
    UnknownKind(String),
    #[error("invalid id number `{0}`")]
    InvalidNumber(String),
}

/// Identity of an element or tree item, written as `"<Type>|<number>"`.
///
/// The kind prefix drives dispatch everywhere; only the number is ever
/// rewritten (when ids are appended on paste or compacted by the formatter).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    pub kind: UidKind,
    pub number: u32,
}

impl Uid {
    pub const fn new(kind: UidKind, number: u32) -> Self {
        Self { kind, number }
    }

    /// Same kind, different number.
    #[must_use]
    pub const fn with_number(self, number: u32) -> Self {
        Self {
            kind: self.kind,
            number,
        }
    }

    pub fn parse(s: &str) -> Result<Self, UidError> {
        s.parse()
    }
}

impl FromStr for Uid {
    type Err = UidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, number) = s
            .split_once('|')
            .ok_or_else(|| UidError::MissingSeparator(s.to_string()))?;
        let kind =
            UidKind::from_prefix(prefix).ok_or_else(|| UidError::UnknownKind(prefix.to_string()))?;
        let number = number
            .parse::<u32>()
            .map_err(|_| UidError::InvalidNumber(number.to_string()))?;
        Ok(Self { kind, number })
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.kind, self.number)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.kind, self.number)
    }
}

impl Serialize for Uid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Monotonic id generator.
///
/// Holds the next number to hand out. Observing or merging can only move
/// it forward, so ids are never reused within one counter's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter {
    next: u32,
}

impl IdCounter {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    pub const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Allocate the next id.
    pub fn next(&mut self) -> u32 {
        let n = self.next;
        self.next = self.next.saturating_add(1);
        n
    }

    /// Record an id seen elsewhere: afterwards `peek() > id`.
    pub fn observe(&mut self, id: u32) {
        self.next = self.next.max(id.saturating_add(1));
    }

    /// Advance to cover everything `other` has handed out.
    pub fn merge(&mut self, other: &IdCounter) {
        self.next = self.next.max(other.next);
    }

    pub const fn peek(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_roundtrip() {
        let uid: Uid = "AndGate|12".parse().unwrap();
        assert_eq!(uid, Uid::new(UidKind::AndGate, 12));
        assert_eq!(uid.to_string(), "AndGate|12");
    }

    #[test]
    fn uid_errors() {
        assert_eq!(
            Uid::parse("Wire7"),
            Err(UidError::MissingSeparator("Wire7".into()))
        );
        assert_eq!(
            Uid::parse("Nand|1"),
            Err(UidError::UnknownKind("Nand".into()))
        );
        assert_eq!(
            Uid::parse("Pin|x"),
            Err(UidError::InvalidNumber("x".into()))
        );
    }

    #[test]
    fn with_number_keeps_kind() {
        let uid = Uid::new(UidKind::Wire, 3).with_number(40);
        assert_eq!(uid.kind, UidKind::Wire);
        assert_eq!(uid.number, 40);
    }

    #[test]
    fn counter_only_moves_forward() {
        let mut c = IdCounter::new();
        assert_eq!(c.next(), 0);
        c.observe(9);
        assert_eq!(c.peek(), 10);
        c.observe(2);
        assert_eq!(c.peek(), 10);
        c.merge(&IdCounter::starting_at(4));
        assert_eq!(c.peek(), 10);
        c.merge(&IdCounter::starting_at(20));
        assert_eq!(c.next(), 20);
        assert_eq!(c.peek(), 21);
    }
}
