//! Title -> canonical column name.
//!
//! Rules are checked in order and the first match wins. Support for a new
//! spreadsheet layout is added by appending a rule.

use std::collections::{HashMap, HashSet};

/// Condition on a lower-cased block title.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Every fragment occurs somewhere in the title.
    ContainsAll(Vec<String>),
    /// At least one fragment occurs.
    ContainsAny(Vec<String>),
}

impl Predicate {
    pub fn all(fragments: &[&str]) -> Self {
        Predicate::ContainsAll(fragments.iter().map(|f| f.to_lowercase()).collect())
    }

    pub fn any(fragments: &[&str]) -> Self {
        Predicate::ContainsAny(fragments.iter().map(|f| f.to_lowercase()).collect())
    }

    fn matches(&self, title_lower: &str) -> bool {
        match self {
            Predicate::ContainsAll(parts) => parts.iter().all(|p| title_lower.contains(p.as_str())),
            Predicate::ContainsAny(parts) => parts.iter().any(|p| title_lower.contains(p.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NameRule {
    pub predicate: Predicate,
    pub name: String,
}

impl NameRule {
    pub fn new(predicate: Predicate, name: impl Into<String>) -> Self {
        Self {
            predicate,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NameMapper {
    rules: Vec<NameRule>,
}

impl Default for NameMapper {
    fn default() -> Self {
        let rules = vec![
            NameRule::new(Predicate::all(&["load", "reference", "1mw"]), "load_1mw"),
            NameRule::new(Predicate::all(&["load requirement"]), "load_requirement_1mw"),
            NameRule::new(Predicate::all(&["ft solar", "1mw"]), "solar_ft_1mw"),
            NameRule::new(Predicate::all(&["sat solar", "1mw"]), "solar_sat_1mw"),
            NameRule::new(Predicate::all(&["wind", "1mw"]), "wind_1mw"),
            NameRule::new(
                Predicate::all(&["difference", "discharging limits"]),
                "bess_discharge_limit_kw",
            ),
            NameRule::new(
                Predicate::all(&["difference", "charging limits"]),
                "bess_charge_limit_kw",
            ),
        ];
        Self { rules }
    }
}

impl NameMapper {
    /// Mapper with no rules: every title becomes its slug.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule with the lowest priority.
    pub fn with_rule(mut self, rule: NameRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[NameRule] {
        &self.rules
    }

    /// Canonical name for one title, before collision handling.
    pub fn map_title(&self, title: &str) -> String {
        let lower = title.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(&lower))
            .map(|rule| rule.name.clone())
            .unwrap_or_else(|| slug(title))
    }

    /// Map all titles; repeated names become `name_2`, `name_3`, ...
    ///
    /// Suffixes skip any name already handed out, so the result is always
    /// unique.
    pub fn map_titles<S: AsRef<str>>(&self, titles: &[S]) -> Vec<String> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut used: HashSet<String> = HashSet::new();
        titles
            .iter()
            .map(|t| {
                let name = self.map_title(t.as_ref());
                let count = seen.entry(name.clone()).or_insert(0);
                *count += 1;
                let mut candidate = if *count == 1 {
                    name.clone()
                } else {
                    format!("{name}_{count}")
                };
                while used.contains(&candidate) {
                    *count += 1;
                    candidate = format!("{name}_{count}");
                }
                used.insert(candidate.clone());
                candidate
            })
            .collect()
    }
}

/// Lowercase, runs of non-alphanumerics collapsed to `_`, trimmed.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_sep = false;
    for ch in s.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}
