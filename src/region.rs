//! Issuing-state ranges for plate prefixes.
//!
//! Prefix series are handed out to states as inclusive intervals of
//! three-letter codes. A prefix is compared by its base-26 ordinal, so
//! `AAA` is 0 and `ZZZ` is 17575.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StateRange {
    pub start: String,
    pub end: String,
    pub uf: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub uf: String,
    pub name: String,
}

#[derive(Debug, Fail)]
pub enum RegionError {
    #[fail(display = "invalid prefix {:?} in state table", _0)]
    InvalidPrefix(String),
    #[fail(display = "range {}..{} for {} is reversed", _0, _1, _2)]
    Reversed(String, String, String),
    #[fail(display = "unable to read state table: {}", _0)]
    Read(String),
}

// (start, end, uf, name), checked in order.
const SOUTHERN: &[(&str, &str, &str, &str)] = &[
    ("AAA", "BEZ", "PR", "Paraná"),
    ("IAQ", "JDO", "RS", "Rio Grande do Sul"),
    ("LWR", "MMM", "SC", "Santa Catarina"),
    ("OKD", "OKH", "SC", "Santa Catarina"),
    ("QHA", "QJZ", "SC", "Santa Catarina"),
    ("RAJ", "RAN", "SC", "Santa Catarina"),
    ("RDS", "REB", "SC", "Santa Catarina"),
    ("RHA", "RHZ", "PR", "Paraná"),
    ("RKW", "RLP", "SC", "Santa Catarina"),
    ("RXK", "RYI", "SC", "Santa Catarina"),
];

/// Base-26 ordinal of a three-letter uppercase prefix.
pub fn prefix_ordinal(prefix: &str) -> Option<u32> {
    if prefix.len() != 3 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    Some(
        prefix
            .bytes()
            .fold(0, |acc, b| acc * 26 + u32::from(b - b'A')),
    )
}

#[derive(Debug, Clone, Copy)]
struct CompiledRange {
    start: u32,
    end: u32,
    index: usize,
}

#[derive(Debug, Clone)]
pub struct RegionTable {
    ranges: Vec<StateRange>,
    compiled: Vec<CompiledRange>,
}

impl RegionTable {
    pub fn new(ranges: Vec<StateRange>) -> Result<RegionTable, RegionError> {
        let mut compiled = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.iter().enumerate() {
            let start = prefix_ordinal(&range.start)
                .ok_or_else(|| RegionError::InvalidPrefix(range.start.clone()))?;
            let end = prefix_ordinal(&range.end)
                .ok_or_else(|| RegionError::InvalidPrefix(range.end.clone()))?;
            if start > end {
                return Err(RegionError::Reversed(
                    range.start.clone(),
                    range.end.clone(),
                    range.uf.clone(),
                ));
            }
            compiled.push(CompiledRange { start, end, index });
        }
        Ok(RegionTable { ranges, compiled })
    }

    /// Paraná, Santa Catarina and Rio Grande do Sul.
    pub fn southern() -> Result<RegionTable, RegionError> {
        let ranges = SOUTHERN
            .iter()
            .map(|&(start, end, uf, name)| StateRange {
                start: start.to_string(),
                end: end.to_string(),
                uf: uf.to_string(),
                name: name.to_string(),
            })
            .collect();
        RegionTable::new(ranges)
    }

    pub fn from_json(json: &str) -> Result<RegionTable, failure::Error> {
        let ranges: Vec<StateRange> = serde_json::from_str(json)?;
        Ok(RegionTable::new(ranges)?)
    }

    pub fn load(path: &Path) -> Result<RegionTable, failure::Error> {
        let json = fs::read_to_string(path)
            .map_err(|e| RegionError::Read(format!("{}: {}", path.display(), e)))?;
        RegionTable::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// First range containing the prefix wins.
    pub fn lookup(&self, prefix: &str) -> Option<Region> {
        let ordinal = prefix_ordinal(prefix)?;
        self.compiled
            .iter()
            .find(|r| r.start <= ordinal && ordinal <= r.end)
            .map(|r| {
                let range = &self.ranges[r.index];
                Region {
                    uf: range.uf.clone(),
                    name: range.name.clone(),
                }
            })
    }
}
