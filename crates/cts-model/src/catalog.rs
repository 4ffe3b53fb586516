use std::collections::{BTreeSet, HashMap};

/// Category assigned to features absent from the catalog.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Static feature category dictionary ("Blood Cells" -> [...]).
///
/// Category and feature order is the insertion order; a feature listed under
/// several categories keeps the first one.
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    categories: Vec<(String, Vec<String>)>,
    lookup: HashMap<String, usize>,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: &str, feature: &str) {
        let category = category.trim();
        let feature = feature.trim();
        if category.is_empty() || feature.is_empty() || self.lookup.contains_key(feature) {
            return;
        }
        let index = match self.categories.iter().position(|(name, _)| name == category) {
            Some(index) => index,
            None => {
                self.categories.push((category.to_string(), Vec::new()));
                self.categories.len() - 1
            }
        };
        self.categories[index].1.push(feature.to_string());
        self.lookup.insert(feature.to_string(), index);
    }

    pub fn category_of(&self, feature: &str) -> &str {
        self.lookup
            .get(feature.trim())
            .map_or(UNKNOWN_CATEGORY, |&index| self.categories[index].0.as_str())
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(name, features)| (name.as_str(), features.as_slice()))
    }

    /// Orders `features` by catalog position; features not in the catalog
    /// follow alphabetically.
    pub fn order_features<'a>(&self, features: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let present: BTreeSet<&str> = features.into_iter().collect();
        let mut ordered: Vec<String> = self
            .categories
            .iter()
            .flat_map(|(_, listed)| listed.iter())
            .filter(|feature| present.contains(feature.as_str()))
            .cloned()
            .collect();
        ordered.extend(
            present
                .iter()
                .filter(|feature| !self.lookup.contains_key(**feature))
                .map(|feature| (*feature).to_string()),
        );
        ordered
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

impl<C: AsRef<str>, F: AsRef<str>> FromIterator<(C, F)> for FeatureCatalog {
    fn from_iter<I: IntoIterator<Item = (C, F)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (category, feature) in iter {
            catalog.insert(category.as_ref(), feature.as_ref());
        }
        catalog
    }
}
