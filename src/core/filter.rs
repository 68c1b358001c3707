//! Include/exclude selection of units before a run.
//!
//! Tokens are `ALL`, a bare name or `+name` (include), or `-name` (exclude).
//! A name matching a pool expands to every unit currently in that pool.
//! Matching is case-insensitive.

use std::collections::HashSet;

use super::pool::Pool;

/// Token that selects every unit not flagged "not in default run".
pub const ALL_TOKEN: &str = "ALL";

/// Parsed run-selection tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    all: bool,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl RunFilter {
    /// Parse a token list. Blank tokens are ignored.
    pub fn parse<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            if token.eq_ignore_ascii_case(ALL_TOKEN) {
                filter.all = true;
            } else if let Some(name) = token.strip_prefix('-') {
                filter.exclude.push(name.to_uppercase());
            } else {
                let name = token.strip_prefix('+').unwrap_or(token);
                filter.include.push(name.to_uppercase());
            }
        }
        filter
    }

    /// Whether `ALL` was given.
    #[must_use]
    pub const fn selects_all(&self) -> bool {
        self.all
    }

    /// Remove unselected units from `pools` in place.
    ///
    /// Returns the names of removed units in pool order.
    pub fn apply<'a, I>(&self, pools: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a mut Pool>,
    {
        let mut pools: Vec<&mut Pool> = pools.into_iter().collect();

        let mut include: HashSet<String> = HashSet::new();
        let mut exclude: HashSet<String> = HashSet::new();
        for name in &self.include {
            expand(name, &pools, &mut include);
        }
        for name in &self.exclude {
            expand(name, &pools, &mut exclude);
        }

        if self.all {
            for pool in &pools {
                for name in pool.not_in_default() {
                    let upper = name.to_uppercase();
                    if !include.contains(&upper) {
                        exclude.insert(upper);
                    }
                }
            }
        }

        let mut removed = Vec::new();
        for pool in &mut pools {
            removed.extend(pool.retain_units(|unit| {
                let upper = unit.name().to_uppercase();
                !exclude.contains(&upper) && (self.all || include.contains(&upper))
            }));
        }
        removed
    }
}

/// Add `name` to `set`, or every unit of the pool it names.
fn expand(name: &str, pools: &[&mut Pool], set: &mut HashSet<String>) {
    match pools.iter().find(|p| p.name().to_uppercase() == name) {
        Some(pool) => set.extend(pool.units().iter().map(|u| u.name().to_uppercase())),
        None => {
            set.insert(name.to_string());
        }
    }
}
