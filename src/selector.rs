/// Compound CSS selectors used to find elements on the host page
///
/// Only the subset the locator needs is accepted: an optional tag followed by
/// any number of `#id`, `.class`, `[attr]`, `[attr="v"]` and `[attr*="v"]`
/// parts. Combinators are not supported; nested lookups are done in code.

use crate::error::{FocusError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;

lazy_static! {
    static ref COMPOUND_PATTERN: Regex = Regex::new(
        r#"^([a-zA-Z][a-zA-Z0-9-]*)?((?:#[\w-]+|\.[\w-]+|\[[\w-]+(?:\*?="[^"]*")?\])*)$"#
    ).unwrap();

    static ref PART_PATTERN: Regex = Regex::new(
        r#"#([\w-]+)|\.([\w-]+)|\[([\w-]+)(?:(\*?=)"([^"]*)")?\]"#
    ).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrOp {
    Present,
    Equals(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrFilter {
    pub name: String,
    pub op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrFilter>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Selector> {
        let source = source.trim();
        let invalid = || FocusError::InvalidSelector(source.to_string());

        let caps = COMPOUND_PATTERN.captures(source).ok_or_else(invalid)?;
        let tag = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let rest = caps.get(2).map_or("", |m| m.as_str());

        if tag.is_none() && rest.is_empty() {
            return Err(invalid());
        }

        let mut selector = Selector {
            source: source.to_string(),
            tag,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        };

        for part in PART_PATTERN.captures_iter(rest) {
            if let Some(id) = part.get(1) {
                selector.id = Some(id.as_str().to_string());
            } else if let Some(class) = part.get(2) {
                selector.classes.push(class.as_str().to_string());
            } else if let Some(name) = part.get(3) {
                let value = part.get(5).map_or(String::new(), |v| v.as_str().to_string());
                let op = match part.get(4).map(|m| m.as_str()) {
                    Some("=") => AttrOp::Equals(value),
                    Some("*=") => AttrOp::Contains(value),
                    _ => AttrOp::Present,
                };
                selector.attrs.push(AttrFilter {
                    name: name.as_str().to_string(),
                    op,
                });
            }
        }

        Ok(selector)
    }

    /// Parse a list, dropping (and logging) entries that do not parse
    pub fn parse_all<S: AsRef<str>>(sources: &[S]) -> Vec<Selector> {
        sources
            .iter()
            .filter_map(|s| match Selector::parse(s.as_ref()) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    log::warn!("Ignoring selector: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Matches no element on the page
    pub fn unmatched() -> Selector {
        Selector {
            source: "whatsapp-focus-unmatched".to_string(),
            tag: Some("whatsapp-focus-unmatched".to_string()),
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        }
    }

    /// CSS text suitable for `querySelector`
    pub fn as_css(&self) -> &str {
        &self.source
    }

    /// Match an element given its tag name and an attribute reader.
    /// `id` and `class` are read through the same accessor.
    pub fn matches<F>(&self, tag: &str, attribute: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(expected) = &self.id {
            if attribute("id").as_deref() != Some(expected.as_str()) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class_attr = attribute("class").unwrap_or_default();
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }

        self.attrs.iter().all(|filter| match (&filter.op, attribute(&filter.name)) {
            (_, None) => false,
            (AttrOp::Present, Some(_)) => true,
            (AttrOp::Equals(v), Some(actual)) => actual == *v,
            (AttrOp::Contains(v), Some(actual)) => actual.contains(v.as_str()),
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Selector::parse(&source).map_err(serde::de::Error::custom)
    }
}

/// For `deserialize_with`: a list where bad entries are dropped, not fatal
pub fn lenient_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<Selector>, D::Error> {
    let sources = Vec::<String>::deserialize(deserializer)?;
    Ok(Selector::parse_all(&sources))
}
