//! Wake-turbulence categories and the separation matrix.
//!
//! The matrix is directional: the leading aircraft's wake constrains the
//! trailing aircraft, never the other way round.
//!
//! # Reference
//! ICAO Doc 4444 (PANS-ATM), 8.7.3 "Wake turbulence separation minima"

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wake-turbulence category of an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WakeCategory {
    /// Wide-body and large aircraft (A330, B777, A380, ...).
    Heavy,
    /// Narrow-body airliners (A320, B737, ...).
    Medium,
    /// Regional turboprops and light aircraft.
    Light,
}

impl WakeCategory {
    /// All categories, heaviest first.
    pub const ALL: [WakeCategory; 3] = [Self::Heavy, Self::Medium, Self::Light];

    /// Short label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Heavy => "Heavy",
            Self::Medium => "Medium",
            Self::Light => "Light",
        }
    }
}

impl fmt::Display for WakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One (leading, trailing) → seconds entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparationEntry {
    /// Category of the preceding operation.
    pub leading: WakeCategory,
    /// Category of the following operation.
    pub trailing: WakeCategory,
    /// Minimum gap after the leading aircraft clears the runway (seconds).
    pub seconds: i64,
}

/// Directional wake-separation matrix.
///
/// Lookups of pairs that are not listed fall back to the smallest listed
/// entry, or 0 for an empty matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SeparationEntry>", into = "Vec<SeparationEntry>")]
pub struct SeparationMatrix {
    // Sorted by (leading, trailing), one entry per pair.
    entries: Vec<SeparationEntry>,
}

impl SeparationMatrix {
    /// Creates an empty matrix.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The ICAO-based minima used at the reference airport.
    pub fn icao() -> Self {
        use WakeCategory::*;
        Self::new()
            .with(Heavy, Heavy, 90)
            .with(Heavy, Medium, 120)
            .with(Heavy, Light, 180)
            .with(Medium, Heavy, 60)
            .with(Medium, Medium, 60)
            .with(Medium, Light, 120)
            .with(Light, Heavy, 60)
            .with(Light, Medium, 60)
            .with(Light, Light, 60)
    }

    /// Builder: sets a pair and returns self.
    pub fn with(mut self, leading: WakeCategory, trailing: WakeCategory, seconds: i64) -> Self {
        self.set(leading, trailing, seconds);
        self
    }

    /// Defines (or replaces) the separation for a pair.
    pub fn set(&mut self, leading: WakeCategory, trailing: WakeCategory, seconds: i64) {
        match self
            .entries
            .binary_search_by_key(&(leading, trailing), |e| (e.leading, e.trailing))
        {
            Ok(idx) => self.entries[idx].seconds = seconds,
            Err(idx) => self.entries.insert(
                idx,
                SeparationEntry {
                    leading,
                    trailing,
                    seconds,
                },
            ),
        }
    }

    /// Explicitly listed separation for a pair.
    pub fn get(&self, leading: WakeCategory, trailing: WakeCategory) -> Option<i64> {
        self.entries
            .binary_search_by_key(&(leading, trailing), |e| (e.leading, e.trailing))
            .ok()
            .map(|idx| self.entries[idx].seconds)
    }

    /// Separation to apply between `leading` and `trailing` (seconds).
    pub fn separation(&self, leading: WakeCategory, trailing: WakeCategory) -> i64 {
        self.get(leading, trailing)
            .unwrap_or_else(|| self.minimum())
    }

    /// Smallest listed entry (0 when empty).
    pub fn minimum(&self) -> i64 {
        self.entries.iter().map(|e| e.seconds).min().unwrap_or(0)
    }

    /// Listed entries, ordered by (leading, trailing).
    pub fn entries(&self) -> &[SeparationEntry] {
        &self.entries
    }

    /// Number of listed pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pair is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SeparationMatrix {
    fn default() -> Self {
        Self::icao()
    }
}

impl From<Vec<SeparationEntry>> for SeparationMatrix {
    fn from(entries: Vec<SeparationEntry>) -> Self {
        let mut matrix = Self::new();
        for e in entries {
            matrix.set(e.leading, e.trailing, e.seconds);
        }
        matrix
    }
}

impl From<SeparationMatrix> for Vec<SeparationEntry> {
    fn from(matrix: SeparationMatrix) -> Self {
        matrix.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WakeCategory::*;

    #[test]
    fn test_icao_matrix_is_directional() {
        let m = SeparationMatrix::icao();
        assert_eq!(m.separation(Heavy, Light), 180);
        assert_eq!(m.separation(Light, Heavy), 60);
        assert_eq!(m.separation(Heavy, Medium), 120);
        assert_eq!(m.len(), 9);
    }

    #[test]
    fn test_unlisted_pair_falls_back_to_minimum() {
        let m = SeparationMatrix::new()
            .with(Heavy, Medium, 120)
            .with(Heavy, Light, 180);
        assert_eq!(m.get(Medium, Medium), None);
        assert_eq!(m.separation(Medium, Medium), 120);
        assert_eq!(m.minimum(), 120);
    }

    #[test]
    fn test_empty_matrix() {
        let m = SeparationMatrix::new();
        assert!(m.is_empty());
        assert_eq!(m.separation(Heavy, Heavy), 0);
    }

    #[test]
    fn test_set_replaces_entry() {
        let mut m = SeparationMatrix::icao();
        m.set(Heavy, Heavy, 150);
        assert_eq!(m.separation(Heavy, Heavy), 150);
        assert_eq!(m.len(), 9);
    }

    #[test]
    fn test_serde_entries_list() {
        let json = r#"[{"leading":"Heavy","trailing":"Light","seconds":200}]"#;
        let m: SeparationMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(m.separation(Heavy, Light), 200);
        assert_eq!(m.separation(Light, Light), 200);
    }
}
