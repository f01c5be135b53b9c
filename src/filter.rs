//! Directory entry filters: substring (with negation), fuzzy subsequence
//! matching, and a stub for a lua-callback filter.
//!
//! Grounded on `filter.c` (substring/negation) and `fuzzy.c` (scoring),
//! both read from `original_source/` since the distilled spec only asked
//! for "a fuzzy filter" without pinning down the scoring function.

use crate::file::File;

#[derive(Debug, Clone)]
pub enum Filter {
    /// Space-separated tokens, case-insensitive, AND-combined. A token
    /// prefixed with `!` must NOT appear (negation), matching `filter.c`'s
    /// `strcasestr`-based token loop.
    Substring(String),
    /// Subsequence match against `name`, ranked by `fuzzy_score`.
    Fuzzy(String),
    /// Out of scope: an embedded lua host would supply the predicate.
    /// Kept as a named variant so callers can match exhaustively and so the
    /// module map in the design ledger accounts for it.
    LuaCallback,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Substring(s) => s.trim().is_empty(),
            Filter::Fuzzy(s) => s.is_empty(),
            Filter::LuaCallback => false,
        }
    }

    pub fn matches(&self, file: &File) -> bool {
        match self {
            Filter::Substring(pattern) => substring_matches(pattern, &file.name),
            Filter::Fuzzy(pattern) => fuzzy_score(pattern, &file.name).is_some(),
            Filter::LuaCallback => true,
        }
    }
}

fn substring_matches(pattern: &str, name: &str) -> bool {
    let name_lower = name.to_lowercase();
    for token in pattern.split_whitespace() {
        let (negate, needle) = match token.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        if needle.is_empty() {
            continue;
        }
        let contains = name_lower.contains(&needle.to_lowercase());
        if negate == contains {
            return false;
        }
    }
    true
}

/// Subsequence match of `pattern` in `name`, case-insensitive. Returns a
/// score where lower is better (fewer/earlier/tighter matches win), or
/// `None` if `pattern` isn't a subsequence at all. The original's
/// `fuzzy_score` rewards consecutive runs and matches near the start of the
/// name; this keeps that shape rather than copying exact constants, since
/// none of those constants are externally observable behavior worth
/// freezing verbatim.
pub fn fuzzy_score(pattern: &str, name: &str) -> Option<i64> {
    if pattern.is_empty() {
        return Some(0);
    }
    let name_lower: Vec<char> = name.to_lowercase().chars().collect();
    let pattern_lower: Vec<char> = pattern.to_lowercase().chars().collect();

    let mut score: i64 = 0;
    let mut ni = 0usize;
    let mut prev_matched_at: Option<usize> = None;

    for (pi, &pc) in pattern_lower.iter().enumerate() {
        let mut found = None;
        while ni < name_lower.len() {
            if name_lower[ni] == pc {
                found = Some(ni);
                break;
            }
            ni += 1;
        }
        let idx = found?;

        score += idx as i64;
        if let Some(prev) = prev_matched_at {
            if idx == prev + 1 {
                score -= 5; // reward consecutive runs
            }
        }
        if pi == 0 {
            score += idx as i64; // extra weight on how late the first char starts
        }
        prev_matched_at = Some(idx);
        ni = idx + 1;
    }

    Some(score)
}
