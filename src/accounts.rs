//! High-value account classification.
//!
//! Each node is checked against five independent predicates; every predicate
//! that holds files the node's display name under its [`Category`]. Names are
//! never deduplicated, so repeated occurrences across nodes or files remain
//! visible in the report.
use std::fmt;

use crate::graph::{Document, Properties};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    HighValue,
    DomainAdmins,
    Kerberoastable,
    UnconstrainedDelegation,
    AllowedToDelegate,
}

impl Category {
    /// Evaluation order for a single node.
    pub const ALL: [Category; 5] = [
        Category::HighValue,
        Category::DomainAdmins,
        Category::Kerberoastable,
        Category::UnconstrainedDelegation,
        Category::AllowedToDelegate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::HighValue => "High Value",
            Category::DomainAdmins => "Domain Admins / Enterprise Admins",
            Category::Kerberoastable => "Kerberoastable Accounts",
            Category::UnconstrainedDelegation => "Unconstrained Delegation",
            Category::AllowedToDelegate => "Allowed to Delegate",
        }
    }

    pub fn matches(self, props: &Properties) -> bool {
        match self {
            Category::HighValue => props.is_high_value(),
            Category::DomainAdmins => props.is_admin_count(),
            Category::Kerberoastable => props.has_spn(),
            Category::UnconstrainedDelegation => props.is_unconstrained_delegation(),
            Category::AllowedToDelegate => props.is_allowed_to_delegate(),
        }
    }

    /// Categories whose members count as privileged when matching sessions.
    pub fn is_privileged(self) -> bool {
        matches!(self, Category::HighValue | Category::DomainAdmins)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category to account names, in the order categories were first populated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HighValueAccounts {
    entries: Vec<(Category, Vec<String>)>,
}

impl HighValueAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names for `category`, creating an empty list if the category is new.
    pub fn entry(&mut self, category: Category) -> &mut Vec<String> {
        let idx = match self.entries.iter().position(|(c, _)| *c == category) {
            Some(i) => i,
            None => {
                self.entries.push((category, Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Register `category` with no names if it is not present yet.
    pub fn ensure(&mut self, category: Category) {
        self.entry(category);
    }

    pub fn push(&mut self, category: Category, name: impl Into<String>) {
        self.entry(category).push(name.into());
    }

    pub fn get(&self, category: Category) -> &[String] {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, names)| names.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_category(&self, category: Category) -> bool {
        self.entries.iter().any(|(c, _)| *c == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.entries.iter().map(|(c, names)| (*c, names.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of names across all categories, counting repeats.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, names)| names.len()).sum()
    }

    /// Extend each category with `other`'s names, keeping order.
    pub fn merge(&mut self, other: HighValueAccounts) {
        for (category, names) in other.entries {
            self.entry(category).extend(names);
        }
    }
}

pub fn extract_high_value_accounts(doc: &Document) -> HighValueAccounts {
    let mut out = HighValueAccounts::new();
    for node in &doc.nodes {
        let props = &node.properties;
        let name = props.display_name();
        for category in Category::ALL {
            if category.matches(props) {
                out.push(category, name.clone());
            }
        }
    }
    out
}
