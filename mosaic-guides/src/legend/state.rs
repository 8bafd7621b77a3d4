use indexmap::IndexMap;
use mosaic_common::types::SliceId;

use crate::category::CategorySet;
use crate::error::MosaicGuidesError;

/// Enabled flags for the category sets of every slice in a composite.
///
/// Each slice owns an independent set, so toggling a key in one slice never affects another
/// slice that happens to use the same key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendStateMachine {
    sets: IndexMap<SliceId, CategorySet>,
}

impl LegendStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the recomputed categories of a slice, keeping the user's enabled flags for
    /// keys that survived the recomputation
    pub fn update(&mut self, slice_id: SliceId, categories: CategorySet) -> &CategorySet {
        let merged = match self.sets.get(&slice_id) {
            Some(prior) => categories.merge_enabled(prior),
            None => categories,
        };
        let entry = self.sets.entry(slice_id).or_default();
        *entry = merged;
        entry
    }

    pub fn get(&self, slice_id: SliceId) -> Option<&CategorySet> {
        self.sets.get(&slice_id)
    }

    pub fn remove(&mut self, slice_id: SliceId) -> Option<CategorySet> {
        self.sets.shift_remove(&slice_id)
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (SliceId, &CategorySet)> {
        self.sets.iter().map(|(id, set)| (*id, set))
    }

    pub fn toggle(&mut self, slice_id: SliceId, key: &str) -> Result<(), MosaicGuidesError> {
        tracing::debug!(%slice_id, key, "toggle category");
        self.set_mut(slice_id)?.toggle(key)
    }

    pub fn isolate(&mut self, slice_id: SliceId, key: &str) -> Result<(), MosaicGuidesError> {
        tracing::debug!(%slice_id, key, "isolate category");
        self.set_mut(slice_id)?.isolate(key)
    }

    fn set_mut(&mut self, slice_id: SliceId) -> Result<&mut CategorySet, MosaicGuidesError> {
        self.sets
            .get_mut(&slice_id)
            .ok_or(MosaicGuidesError::UnknownSlice(slice_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(keys: &[&str]) -> CategorySet {
        keys.iter().map(|k| (*k, [0, 0, 0, 255])).collect()
    }

    #[test]
    fn test_slices_are_independent() -> Result<(), MosaicGuidesError> {
        let mut legends = LegendStateMachine::new();
        legends.update(SliceId(1), categories(&["a", "b"]));
        legends.update(SliceId(2), categories(&["a", "b"]));

        legends.isolate(SliceId(1), "a")?;
        assert!(!legends.get(SliceId(1)).unwrap().is_enabled("b"));
        assert!(legends.get(SliceId(2)).unwrap().is_enabled("b"));
        Ok(())
    }

    #[test]
    fn test_update_preserves_user_toggles() -> Result<(), MosaicGuidesError> {
        let mut legends = LegendStateMachine::new();
        legends.update(SliceId(1), categories(&["a", "b"]));
        legends.toggle(SliceId(1), "a")?;

        let updated = legends.update(SliceId(1), categories(&["a", "b", "c"]));
        assert_eq!(updated.enabled_keys().collect::<Vec<_>>(), vec!["b", "c"]);
        Ok(())
    }

    #[test]
    fn test_unknown_slice() {
        let mut legends = LegendStateMachine::new();
        assert_eq!(
            legends.toggle(SliceId(9), "a"),
            Err(MosaicGuidesError::UnknownSlice(SliceId(9)))
        );
    }
}
