/// Captured submatch groups (`:regex` capture groups, in this core), built
/// up while matching and exposed to the `${1}` style variable extension.
/// Capture is gated on `capture_match_values` since it costs an
/// allocation per match attempt.
#[derive(Debug, Clone, Default)]
pub struct MatchValues {
    enabled: bool,
    values: Vec<Option<Vec<u8>>>,
    skipped: usize,
}

impl MatchValues {
    pub fn new(enabled: bool) -> Self {
        MatchValues { enabled, values: Vec::new(), skipped: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advances the logical index without recording a value, mirroring
    /// `sieve_match_values_skip`'s handling of unmatched regex groups.
    pub fn skip(&mut self, n: usize) {
        if !self.enabled {
            return;
        }
        self.skipped += n;
        for _ in 0..n {
            self.values.push(None);
        }
    }

    pub fn push(&mut self, value: Vec<u8>) {
        if !self.enabled {
            return;
        }
        self.values.push(Some(value));
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
