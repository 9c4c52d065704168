//! Placeholder interpolation for path and body templates.
//!
//! # Design
//! Templates carry `<name>` placeholders. A single escape character (`@` by
//! default) lets a literal `<` survive: `@<name>` renders as `<name>`. A doubled
//! escape collapses to one escape character when the run of escapes that
//! follows it ends in `<`, so `@@<name>` renders as `@` followed by the
//! substituted value.
//!
//! The scanner walks the template once, left to right. At every position the
//! three rules are tried in order and the first match is consumed:
//!
//! 1. `esc esc` when followed by `esc*` (greedy, no backtracking) and `<`
//! 2. `esc <`
//! 3. `<word+>`
//!
//! Substituted values are never re-scanned.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Caller-supplied values keyed by placeholder name.
pub type Params = BTreeMap<String, String>;

/// Escape character used when none is given.
pub const DEFAULT_ESCAPE: char = '@';

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z0-9_]+)>").expect("valid regex"));

/// Build a `Params` map from key/value pairs.
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Params
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Replace every placeholder in `template` with its value from `variables`.
///
/// A placeholder without a value is replaced by `missing` when given, and is
/// otherwise left in the output verbatim.
pub fn interpolate(
    template: &str,
    variables: &Params,
    escape: char,
    missing: Option<&str>,
) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == escape && next == Some(escape) && escapes_then_open(&chars, i + 2, escape) {
            out.push(escape);
            i += 2;
            continue;
        }

        if c == escape && next == Some('<') {
            out.push('<');
            i += 2;
            continue;
        }

        if c == '<' {
            if let Some(end) = placeholder_end(&chars, i) {
                let name: String = chars[i + 1..end].iter().collect();
                match (variables.get(&name), missing) {
                    (Some(value), _) => out.push_str(value),
                    (None, Some(fallback)) => out.push_str(fallback),
                    (None, None) => out.extend(&chars[i..=end]),
                }
                i = end + 1;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }

    out
}

/// `interpolate` with the default escape character and no missing fallback.
pub fn interpolate_default(template: &str, variables: &Params) -> String {
    interpolate(template, variables, DEFAULT_ESCAPE, None)
}

/// Names of all `<name>` placeholders in `template`, deduplicated, in order of
/// first appearance. Escapes are not taken into account.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        if let Some(m) = caps.get(1) {
            if !names.contains(&m.as_str()) {
                names.push(m.as_str());
            }
        }
    }
    names
}

/// Keep only the entries whose key occurs somewhere in `template`.
pub fn narrow(template: &str, params: &Params) -> Params {
    params
        .iter()
        .filter(|(key, _)| template.contains(key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Skip a greedy run of escape characters starting at `from`, then require `<`.
fn escapes_then_open(chars: &[char], from: usize, escape: char) -> bool {
    let mut j = from;
    while chars.get(j) == Some(&escape) {
        j += 1;
    }
    chars.get(j) == Some(&'<')
}

/// Index of the closing `>` of a `<word+>` placeholder opening at `start`.
fn placeholder_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    while chars.get(j).is_some_and(|c| is_word(*c)) {
        j += 1;
    }
    if j > start + 1 && chars.get(j) == Some(&'>') {
        Some(j)
    } else {
        None
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
