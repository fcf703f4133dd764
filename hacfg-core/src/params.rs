//! HAProxy directive parameters and their merge semantics.
//!
//! A [`ParameterSet`] maps a section name (`global`, `defaults`) to the
//! directives emitted inside that section. Each directive keyword owns an
//! ordered list of argument lines, so a keyword may appear several times in
//! the rendered document:
//!
//! ```text
//! defaults
//!     timeout connect 5s
//!     timeout client 30s
//! ```
//!
//! is the keyword `timeout` with lines `["connect 5s", "client 30s"]`.
//!
//! Merging is last-writer-wins at keyword granularity: an override replaces
//! every line of the same keyword, and keywords that only exist on one side
//! are carried through untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Section holding process-wide directives.
pub const GLOBAL: &str = "global";

/// Section holding proxy defaults.
pub const DEFAULTS: &str = "defaults";

/// Directive keyword → ordered argument lines.
///
/// `BTreeMap` keeps keyword iteration sorted, which makes rendering
/// deterministic for equal inputs.
pub type Directives = BTreeMap<String, Vec<String>>;

/// Errors produced while parsing `--haproxy-param` style flags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// Flag is not of the form `<group>.<keyword>=<args>`.
    #[error("bad haproxy-param flag '{flag}', expected {{group}}.{{keyword}}={{args}}")]
    MalformedFlag { flag: String },

    /// Group is neither `global` nor `defaults`.
    #[error("unknown haproxy-param group '{group}' in '{flag}', expected 'global' or 'defaults'")]
    UnknownGroup { group: String, flag: String },
}

/// Grouped HAProxy directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    groups: BTreeMap<String, Directives>,
}

impl ParameterSet {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults that make a fresh workspace usable with no overrides.
    #[must_use]
    pub fn defaults() -> Self {
        let mut params = Self::new();
        params.insert(GLOBAL, "stats", ["timeout 2m"]);
        params.insert(GLOBAL, "tune.ssl.default-dh-param", ["1024"]);
        params.insert(GLOBAL, "nbthread", [available_threads().to_string()]);
        params.insert(GLOBAL, "ulimit-n", ["65536"]);
        params.insert(GLOBAL, "maxconn", ["32000"]);
        params.insert(DEFAULTS, "http-reuse", ["always"]);
        params
    }

    /// Parse repeated `<group>.<keyword>=<args>` flags.
    ///
    /// Repeating a keyword appends another argument line to it. Only the
    /// `global` and `defaults` groups are accepted since they are the only
    /// sections the main document renders.
    pub fn from_flags<I, S>(flags: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for flag in flags {
            let flag = flag.as_ref();
            let malformed = || ParamError::MalformedFlag {
                flag: flag.to_string(),
            };

            let (name, value) = flag.split_once('=').ok_or_else(malformed)?;
            let (group, keyword) = name.split_once('.').ok_or_else(malformed)?;
            if keyword.is_empty() || value.trim().is_empty() {
                return Err(malformed());
            }
            if group != GLOBAL && group != DEFAULTS {
                return Err(ParamError::UnknownGroup {
                    group: group.to_string(),
                    flag: flag.to_string(),
                });
            }

            params.push(group, keyword, value);
        }
        Ok(params)
    }

    /// Replace every line of `keyword` in `group`.
    pub fn insert<I, S>(&mut self, group: &str, keyword: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(keyword.to_string(), lines.into_iter().map(Into::into).collect());
    }

    /// Append one argument line to `keyword` in `group`.
    pub fn push(&mut self, group: &str, keyword: &str, line: impl Into<String>) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .entry(keyword.to_string())
            .or_default()
            .push(line.into());
    }

    /// Directives of a group, if any were set.
    #[must_use]
    pub fn group(&self, group: &str) -> Option<&Directives> {
        self.groups.get(group)
    }

    /// Argument lines of a keyword, if set.
    #[must_use]
    pub fn get(&self, group: &str, keyword: &str) -> Option<&[String]> {
        self.groups
            .get(group)
            .and_then(|directives| directives.get(keyword))
            .map(Vec::as_slice)
    }

    /// Iterate over `(group, directives)` in sorted group order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &Directives)> {
        self.groups.iter().map(|(name, d)| (name.as_str(), d))
    }

    /// True when no group holds any directive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(BTreeMap::is_empty)
    }

    /// Merge `overrides` on top of `defaults` into a new set.
    ///
    /// Neither input is modified.
    #[must_use]
    pub fn merge(defaults: &Self, overrides: &Self) -> Self {
        let mut merged = defaults.clone();
        for (group, directives) in &overrides.groups {
            let target = merged.groups.entry(group.clone()).or_default();
            for (keyword, lines) in directives {
                target.insert(keyword.clone(), lines.clone());
            }
        }
        merged
    }

    /// `self` with `overrides` applied, see [`ParameterSet::merge`].
    #[must_use]
    pub fn with(&self, overrides: &Self) -> Self {
        Self::merge(self, overrides)
    }
}

/// Worker thread count used for the default `nbthread` directive.
#[must_use]
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
