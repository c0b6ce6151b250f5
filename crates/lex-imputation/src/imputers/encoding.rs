use std::collections::BTreeSet;

/// Maps categories to integer codes for the multivariate imputers.
///
/// Categories are sorted, so codes are stable for a given set of observed
/// values. Decoding rounds and clamps, so every decoded value is one of the
/// observed categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    categories: Vec<String>,
}

impl LabelEncoder {
    pub fn fit(values: &[Option<String>]) -> Self {
        let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        Self {
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn encode(&self, values: &[Option<String>]) -> Vec<Option<f64>> {
        values
            .iter()
            .map(|v| {
                v.as_ref().and_then(|s| {
                    self.categories
                        .binary_search_by(|c| c.as_str().cmp(s.as_str()))
                        .ok()
                        .map(|idx| idx as f64)
                })
            })
            .collect()
    }

    /// Nearest category for a (possibly fractional) code.
    pub fn decode(&self, code: f64) -> Option<&str> {
        if self.categories.is_empty() || !code.is_finite() {
            return None;
        }
        let max = (self.categories.len() - 1) as f64;
        let idx = code.round().clamp(0.0, max) as usize;
        self.categories.get(idx).map(String::as_str)
    }
}
