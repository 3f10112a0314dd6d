use super::{Comparator, ComparatorFlags, MatchType};
use crate::error::{SieveError, SieveResult};
use crate::match_engine::values::MatchValues;

/// `:is` — exact equality under the comparator's collation.
pub struct Is;

impl MatchType for Is {
    fn name(&self) -> &'static str {
        "is"
    }

    fn validate(&self, _comparator: &dyn Comparator) -> SieveResult<()> {
        Ok(())
    }

    fn r#match(
        &self,
        comparator: &dyn Comparator,
        value: &[u8],
        key: &[u8],
        _key_index: usize,
        _values: &mut MatchValues,
    ) -> bool {
        comparator.equal(value, key)
    }
}

/// `:contains` — naive substring scan, restarting one byte after each
/// failed candidate position (mirrors `mtch_contains_match`'s cursor
/// restart `vp = vp - (kp - key) + 1`).
pub struct Contains;

impl MatchType for Contains {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn validate(&self, comparator: &dyn Comparator) -> SieveResult<()> {
        if !comparator.flags().contains(ComparatorFlags::SUPPORTS_SUBSTRING) {
            return Err(SieveError::UnsupportedComparator {
                match_type: "contains",
                comparator: comparator.name().to_string(),
            });
        }
        Ok(())
    }

    fn r#match(
        &self,
        comparator: &dyn Comparator,
        value: &[u8],
        key: &[u8],
        _key_index: usize,
        _values: &mut MatchValues,
    ) -> bool {
        if key.is_empty() {
            return true;
        }
        if value.len() < key.len() {
            return false;
        }
        for pos in 0..=(value.len() - key.len()) {
            if comparator.char_match(value, pos, key) {
                return true;
            }
        }
        false
    }
}

/// `:matches` — glob matching with `*` (any run of bytes) and `?` (any
/// single byte), evaluated under the comparator's substring semantics.
pub struct Matches;

impl MatchType for Matches {
    fn name(&self) -> &'static str {
        "matches"
    }

    fn validate(&self, comparator: &dyn Comparator) -> SieveResult<()> {
        if !comparator.flags().contains(ComparatorFlags::SUPPORTS_SUBSTRING) {
            return Err(SieveError::UnsupportedComparator {
                match_type: "matches",
                comparator: comparator.name().to_string(),
            });
        }
        Ok(())
    }

    fn r#match(
        &self,
        comparator: &dyn Comparator,
        value: &[u8],
        key: &[u8],
        _key_index: usize,
        _values: &mut MatchValues,
    ) -> bool {
        glob_match(comparator, value, key)
    }
}

fn glob_match(comparator: &dyn Comparator, value: &[u8], pattern: &[u8]) -> bool {
    glob_match_at(comparator, value, 0, pattern, 0)
}

fn glob_match_at(
    comparator: &dyn Comparator,
    value: &[u8],
    mut vpos: usize,
    pattern: &[u8],
    mut ppos: usize,
) -> bool {
    while ppos < pattern.len() {
        match pattern[ppos] {
            b'*' => {
                ppos += 1;
                if ppos == pattern.len() {
                    return true;
                }
                for start in vpos..=value.len() {
                    if glob_match_at(comparator, value, start, pattern, ppos) {
                        return true;
                    }
                }
                return false;
            }
            b'?' => {
                if vpos >= value.len() {
                    return false;
                }
                vpos += 1;
                ppos += 1;
            }
            c => {
                if vpos >= value.len() || !comparator.char_match(value, vpos, &[c]) {
                    return false;
                }
                vpos += 1;
                ppos += 1;
            }
        }
    }
    vpos == value.len()
}
