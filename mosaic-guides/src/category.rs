use indexmap::IndexMap;
use mosaic_common::types::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::MosaicGuidesError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryState {
    pub color: Rgba,
    pub enabled: bool,
}

/// Category key to color and enabled flag, in first-observed order.
///
/// A non-empty set always has at least one enabled category. `toggle` and `merge_enabled`
/// restore every category when they would otherwise leave none enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet {
    entries: IndexMap<String, CategoryState>,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enabled category unless `key` is already present. Returns whether it was added.
    pub fn insert(&mut self, key: impl Into<String>, color: Rgba) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            CategoryState {
                color,
                enabled: true,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CategoryState> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn color(&self, key: &str) -> Option<Rgba> {
        self.entries.get(key).map(|s| s.color)
    }

    /// Whether `key` is present and enabled
    pub fn is_enabled(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|s| s.enabled)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryState)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn enabled_keys(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, s)| s.enabled).map(|(k, _)| k)
    }

    pub fn enabled_count(&self) -> usize {
        self.entries.values().filter(|s| s.enabled).count()
    }

    /// Carry the enabled flags of `prior` over to the keys this set shares with it.
    ///
    /// Keys new to this set keep their own flag, keys only present in `prior` are dropped.
    pub fn merge_enabled(mut self, prior: &CategorySet) -> Self {
        for (key, state) in self.entries.iter_mut() {
            if let Some(prior_state) = prior.entries.get(key) {
                state.enabled = prior_state.enabled;
            }
        }
        self.ensure_enabled();
        self
    }

    /// Flip the enabled flag of `key`, re-enabling every category if none would remain enabled
    pub fn toggle(&mut self, key: &str) -> Result<(), MosaicGuidesError> {
        let state = self
            .entries
            .get_mut(key)
            .ok_or_else(|| MosaicGuidesError::UnknownCategory(key.to_string()))?;
        state.enabled = !state.enabled;
        self.ensure_enabled();
        Ok(())
    }

    /// Enable `key` and disable every other category
    pub fn isolate(&mut self, key: &str) -> Result<(), MosaicGuidesError> {
        if !self.entries.contains_key(key) {
            return Err(MosaicGuidesError::UnknownCategory(key.to_string()));
        }
        for (k, state) in self.entries.iter_mut() {
            state.enabled = k == key;
        }
        Ok(())
    }

    fn ensure_enabled(&mut self) {
        if self.enabled_count() == 0 {
            for state in self.entries.values_mut() {
                state.enabled = true;
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Rgba)> for CategorySet {
    fn from_iter<T: IntoIterator<Item = (K, Rgba)>>(iter: T) -> Self {
        let mut set = CategorySet::new();
        for (key, color) in iter {
            set.insert(key, color);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = [255, 0, 0, 255];
    const BLUE: Rgba = [0, 0, 255, 255];
    const GREEN: Rgba = [0, 255, 0, 255];

    fn sample() -> CategorySet {
        [("a", RED), ("b", BLUE), ("c", GREEN)].into_iter().collect()
    }

    #[test]
    fn test_insert_keeps_first_color() {
        let mut set = CategorySet::new();
        assert!(set.insert("a", RED));
        assert!(!set.insert("a", BLUE));
        assert_eq!(set.color("a"), Some(RED));
        assert!(set.is_enabled("a"));
    }

    #[test]
    fn test_toggle_last_enabled_restores_all() -> Result<(), MosaicGuidesError> {
        let mut set = sample();
        set.toggle("a")?;
        set.toggle("b")?;
        assert_eq!(set.enabled_keys().collect::<Vec<_>>(), vec!["c"]);

        set.toggle("c")?;
        assert_eq!(set.enabled_count(), 3);
        Ok(())
    }

    #[test]
    fn test_toggle_sequences_keep_one_enabled() -> Result<(), MosaicGuidesError> {
        let mut set = sample();
        let keys = ["a", "b", "c"];
        for step in 0..30 {
            set.toggle(keys[(step * 7 + step / 3) % 3])?;
            assert!(set.enabled_count() >= 1);
        }
        Ok(())
    }

    #[test]
    fn test_isolate() -> Result<(), MosaicGuidesError> {
        let mut set = sample();
        set.toggle("b")?;
        set.isolate("b")?;
        assert_eq!(set.enabled_keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(
            set.isolate("z"),
            Err(MosaicGuidesError::UnknownCategory("z".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_merge_enabled() -> Result<(), MosaicGuidesError> {
        let mut prior = sample();
        prior.toggle("a")?;

        let next: CategorySet = [("b", BLUE), ("a", RED), ("d", RED)].into_iter().collect();
        let merged = next.merge_enabled(&prior);
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["b", "a", "d"]);
        assert!(!merged.is_enabled("a"));
        assert!(merged.is_enabled("b"));
        assert!(merged.is_enabled("d"));
        Ok(())
    }

    #[test]
    fn test_merge_enabled_never_empties_selection() -> Result<(), MosaicGuidesError> {
        let mut prior = sample();
        prior.isolate("c")?;

        let next: CategorySet = [("a", RED), ("b", BLUE)].into_iter().collect();
        let merged = next.merge_enabled(&prior);
        assert_eq!(merged.enabled_count(), 2);
        Ok(())
    }

    #[test]
    fn test_serialize_as_map() -> Result<(), serde_json::Error> {
        let set: CategorySet = [("NYC", RED)].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&set)?,
            r#"{"NYC":{"color":[255,0,0,255],"enabled":true}}"#
        );
        Ok(())
    }
}
