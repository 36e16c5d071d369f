//! I/O tag table.
//!
//! Input and Output elements refer to a [`Tag`] by its integer id. The tags
//! themselves live in a flat table loaded from the solution's tag file, one
//! record per line: `id;designation;description;signal;condition`.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// I/O metadata attached to Input/Output elements by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub id: u32,
    pub designation: String,
    pub description: String,
    pub signal: String,
    pub condition: String,
}

/// Flat list of tags, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTable {
    pub tags: Vec<Tag>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a tag file. Lines that do not start with a numeric id are
    /// skipped with a warning; missing trailing columns are left empty.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            // Tag text may contain spaces and empty columns, so split verbatim.
            let fields: Vec<&str> = line.split([';', '\t']).collect();
            let Ok(id) = fields[0].trim().parse::<u32>() else {
                log::warn!("tag file line {}: `{}` is not a tag id", n + 1, fields[0]);
                continue;
            };
            let column = |i: usize| fields.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
            table.insert(Tag {
                id,
                designation: column(1),
                description: column(2),
                signal: column(3),
                condition: column(4),
            });
        }
        table
    }

    pub fn emit(&self) -> String {
        let mut out = String::with_capacity(self.tags.len() * 32);
        for tag in &self.tags {
            writeln!(
                out,
                "{};{};{};{};{}",
                tag.id, tag.designation, tag.description, tag.signal, tag.condition
            )
            .ok();
        }
        out
    }

    pub fn get(&self, id: u32) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// Insert or replace the tag with the same id.
    pub fn insert(&mut self, tag: Tag) {
        match self.tags.iter_mut().find(|t| t.id == tag.id) {
            Some(existing) => *existing = tag,
            None => self.tags.push(tag),
        }
    }

    /// One past the largest id in the table.
    pub fn next_id(&self) -> u32 {
        self.tags.iter().map(|t| t.id.saturating_add(1)).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
