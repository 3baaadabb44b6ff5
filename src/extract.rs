//! Recipient extraction from pasted text and PDF page text
//!
//! Extraction lowercases the input, repairs top-level domains that PDF text
//! extraction glued to the following token, then collects every substring
//! matching the email surface grammar:
//!
//! ```text
//! [a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}
//! ```
//!
//! The grammar is a syntactic filter only. It says nothing about whether an
//! address is deliverable or whether its TLD exists.

use crate::error::{OutreachError, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Suffixes split by the standard repair step, applied in this order.
///
/// Changing this list or its order changes extraction output.
pub const STANDARD_REPAIR_SUFFIXES: [&str; 5] = [".com", ".net", ".org", ".edu", ".co.uk"];

static EMAIL_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").unwrap());

/// Ordered list of literal TLD suffixes that get a space inserted after them.
///
/// Suffixes are matched as plain substrings, not at word boundaries, so a
/// longer label containing one (`b.community`) is split as well. That loss is
/// accepted: the repair exists to recover addresses merged by PDF extraction
/// (`foo@example.comjane@sample.org`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairList {
    suffixes: Vec<String>,
}

impl RepairList {
    /// The standard list: `.com`, `.net`, `.org`, `.edu`, `.co.uk`
    #[must_use]
    pub fn standard() -> Self {
        Self {
            suffixes: STANDARD_REPAIR_SUFFIXES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Build a custom list, keeping the given order.
    ///
    /// Each suffix must start with a dot and contain only ASCII letters,
    /// digits, dots and hyphens. Suffixes are lowercased.
    pub fn new<I, S>(suffixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| {
                let suffix = s.as_ref().to_lowercase();
                if is_valid_suffix(&suffix) {
                    Ok(suffix)
                } else {
                    Err(OutreachError::InvalidSuffix(s.as_ref().to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { suffixes })
    }

    /// An empty list, which disables the repair step
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            suffixes: Vec::new(),
        }
    }

    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Insert a single space after every occurrence of every suffix
    #[must_use]
    pub fn repair(&self, text: &str) -> String {
        let mut repaired = text.to_string();
        for suffix in &self.suffixes {
            if repaired.contains(suffix.as_str()) {
                repaired = repaired.replace(suffix.as_str(), &format!("{suffix} "));
            }
        }
        repaired
    }
}

impl Default for RepairList {
    fn default() -> Self {
        Self::standard()
    }
}

fn is_valid_suffix(suffix: &str) -> bool {
    suffix.len() > 1
        && suffix.starts_with('.')
        && suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Deduplicated lowercase email addresses in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct RecipientSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl RecipientSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address; returns false when it was already present
    pub(crate) fn insert(&mut self, address: &str) -> bool {
        let address = address.to_lowercase();
        if self.seen.contains(&address) {
            return false;
        }
        self.seen.insert(address.clone());
        self.ordered.push(address);
        true
    }

    /// Union of two sets; entries of `self` come first
    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        for address in other.ordered {
            self.insert(&address);
        }
        self
    }

    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.seen.contains(&address.to_lowercase())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ordered.iter()
    }

    #[must_use]
    pub const fn as_slice(&self) -> &[String] {
        self.ordered.as_slice()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Equality ignores order
impl PartialEq for RecipientSet {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for RecipientSet {}

impl<'a> IntoIterator for &'a RecipientSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for RecipientSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.into_iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RecipientSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address.as_ref());
        }
        set
    }
}

/// Stateless extractor parameterized by its repair list
#[derive(Debug, Clone, Default)]
pub struct RecipientExtractor {
    repair: RepairList,
}

impl RecipientExtractor {
    #[must_use]
    pub const fn new(repair: RepairList) -> Self {
        Self { repair }
    }

    #[must_use]
    pub const fn repair_list(&self) -> &RepairList {
        &self.repair
    }

    /// Lowercase and repair text, producing the string the grammar runs on
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        self.repair.repair(&text.to_lowercase())
    }

    /// Extract the set of email-shaped substrings from one text blob
    #[must_use]
    pub fn extract(&self, text: &str) -> RecipientSet {
        let normalized = self.normalize(text);
        let mut set = RecipientSet::new();

        for found in EMAIL_REGEX.find_iter(&normalized) {
            set.insert(found.as_str());
        }

        debug!(
            "Extracted {} recipient(s) from {} byte(s) of text",
            set.len(),
            text.len()
        );

        set
    }
}

/// Extract recipients using the standard repair list
#[must_use]
pub fn extract_addresses(text: &str) -> RecipientSet {
    RecipientExtractor::default().extract(text)
}
