use super::{Comparator, ComparatorFlags};

/// `i;octet`: byte-for-byte equality, no case folding.
pub struct Octet;

impl Comparator for Octet {
    fn name(&self) -> &'static str {
        "i;octet"
    }

    fn flags(&self) -> ComparatorFlags {
        ComparatorFlags::SUPPORTS_SUBSTRING
    }

    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    fn char_match(&self, haystack: &[u8], pos: usize, needle: &[u8]) -> bool {
        haystack.len() >= pos + needle.len() && &haystack[pos..pos + needle.len()] == needle
    }
}

/// `i;ascii-casemap`: equality up to ASCII case folding; non-ASCII bytes
/// compare byte-for-byte.
pub struct AsciiCasemap;

impl Comparator for AsciiCasemap {
    fn name(&self) -> &'static str {
        "i;ascii-casemap"
    }

    fn flags(&self) -> ComparatorFlags {
        ComparatorFlags::SUPPORTS_SUBSTRING
    }

    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_ascii_lowercase() == y.to_ascii_lowercase())
    }

    fn char_match(&self, haystack: &[u8], pos: usize, needle: &[u8]) -> bool {
        if haystack.len() < pos + needle.len() {
            return false;
        }
        haystack[pos..pos + needle.len()]
            .iter()
            .zip(needle)
            .all(|(x, y)| x.to_ascii_lowercase() == y.to_ascii_lowercase())
    }
}
