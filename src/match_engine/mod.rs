//! Match-type/comparator evaluation: a [`MatchContext`] drives
//! [`begin`]/[`match_value`]/[`end`] over a [`stringlist::StringList`] of
//! keys, short-circuiting on the first key that matches, exactly as the
//! original's `sieve_match_begin`/`match_value`/`end` trio does.

pub mod comparator;
pub mod core_types;
pub mod regex_match;
pub mod stringlist;
pub mod values;

use crate::error::SieveResult;
use bitflags::bitflags;
use stringlist::StringList;
use values::MatchValues;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ComparatorFlags: u8 {
        const SUPPORTS_SUBSTRING = 0b0000_0001;
    }
}

/// Compares bytes under a named collation; `char_match` additionally
/// supports substring scanning when [`ComparatorFlags::SUPPORTS_SUBSTRING`]
/// is set.
pub trait Comparator {
    fn name(&self) -> &'static str;
    fn flags(&self) -> ComparatorFlags;
    fn equal(&self, a: &[u8], b: &[u8]) -> bool;
    /// Returns `true` if `haystack[pos..]` begins with `needle` under this
    /// comparator's collation. Only called when `SUPPORTS_SUBSTRING` is set.
    fn char_match(&self, haystack: &[u8], pos: usize, needle: &[u8]) -> bool;
}

/// One key-list evaluation strategy (`is`, `contains`, `matches`, `regex`,
/// ...). `key_index` is the position of `key` within the full key list,
/// used for per-key caching (the regex extension memoizes compiled
/// patterns by this index) and for match-value indexing.
pub trait MatchType {
    fn name(&self) -> &'static str;

    /// Rejects comparator/match-type combinations that cannot cooperate
    /// instead of silently falling back to a default (spec Open Question:
    /// fail closed).
    fn validate(&self, comparator: &dyn Comparator) -> SieveResult<()>;

    fn match_init(&self, _capture_match_values: bool) {}

    fn r#match(
        &self,
        comparator: &dyn Comparator,
        value: &[u8],
        key: &[u8],
        key_index: usize,
        values: &mut MatchValues,
    ) -> bool;

    fn match_deinit(&self) {}
}

/// Per-evaluation scratch state threaded through `begin`/`match_value`/`end`.
pub struct MatchContext<'a> {
    pub match_type: &'a dyn MatchType,
    pub comparator: &'a dyn Comparator,
    pub values: MatchValues,
}

pub fn begin<'a>(
    match_type: &'a dyn MatchType,
    comparator: &'a dyn Comparator,
    capture_match_values: bool,
) -> SieveResult<MatchContext<'a>> {
    match_type.validate(comparator)?;
    match_type.match_init(capture_match_values);
    Ok(MatchContext {
        match_type,
        comparator,
        values: MatchValues::new(capture_match_values),
    })
}

/// Evaluates `value` against every key in `keys`, left to right,
/// returning `true` on the first match (short-circuiting, as the
/// original does).
pub fn match_value(ctx: &mut MatchContext<'_>, value: &[u8], keys: &StringList) -> bool {
    for (key_index, key) in keys.iter().enumerate() {
        if ctx
            .match_type
            .r#match(ctx.comparator, value, key, key_index, &mut ctx.values)
        {
            return true;
        }
    }
    false
}

pub fn end(ctx: MatchContext<'_>) -> MatchValues {
    ctx.match_type.match_deinit();
    ctx.values
}
