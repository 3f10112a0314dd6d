use std::cell::RefCell;
use std::collections::HashMap;

use regex::bytes::Regex;

use super::{Comparator, MatchType};
use crate::error::{SieveError, SieveResult};
use crate::match_engine::values::MatchValues;

/// `:regex` — compiles each key as a regular expression, lazily, caching
/// the compiled pattern per `key_index` (mirrors `mcht_regex_get`'s
/// per-key cache). Key arguments are expected to be literal strings; the
/// (external) validator is responsible for rejecting variable key
/// arguments before bytecode referencing this match type is generated.
#[derive(Default)]
pub struct RegexMatch {
    cache: RefCell<HashMap<usize, Regex>>,
}

impl MatchType for RegexMatch {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn validate(&self, comparator: &dyn Comparator) -> SieveResult<()> {
        match comparator.name() {
            "i;ascii-casemap" | "i;octet" => Ok(()),
            other => Err(SieveError::UnsupportedComparator {
                match_type: "regex",
                comparator: other.to_string(),
            }),
        }
    }

    fn match_deinit(&self) {
        self.cache.borrow_mut().clear();
    }

    fn r#match(
        &self,
        comparator: &dyn Comparator,
        value: &[u8],
        key: &[u8],
        key_index: usize,
        values: &mut MatchValues,
    ) -> bool {
        let mut cache = self.cache.borrow_mut();
        let regex = match cache.get(&key_index) {
            Some(r) => r,
            None => {
                let pattern = build_pattern(comparator, key);
                match Regex::new(&pattern) {
                    Ok(r) => cache.entry(key_index).or_insert(r),
                    Err(e) => {
                        log::warn!("regex match type: failed to compile pattern: {e}");
                        return false;
                    }
                }
            }
        };

        let Some(captures) = regex.captures(value) else {
            return false;
        };
        if values.is_enabled() {
            for group in captures.iter().skip(1) {
                match group {
                    Some(m) => values.push(m.as_bytes().to_vec()),
                    None => values.skip(1),
                }
            }
        }
        true
    }
}

fn build_pattern(comparator: &dyn Comparator, key: &[u8]) -> String {
    let body = String::from_utf8_lossy(key);
    if comparator.name() == "i;ascii-casemap" {
        format!("(?i){body}")
    } else {
        body.into_owned()
    }
}
