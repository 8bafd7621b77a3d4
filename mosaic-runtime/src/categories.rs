use mosaic_common::feature::Feature;
use mosaic_common::form_data::FormData;
use mosaic_common::types::{Rgba, VizKind};
use mosaic_guides::CategorySet;
use mosaic_scales::color::with_alpha;
use std::sync::Arc;

use crate::collaborators::{BreakPointBucketer, ColorScaleProvider, MetricBucketer, SchemeColorScales};
use crate::error::MosaicRuntimeError;

/// Derives the legend categories of a slice from its features
#[derive(Debug, Clone)]
pub struct CategoryBucketEngine {
    color_scales: Arc<dyn ColorScaleProvider>,
    bucketer: Arc<dyn MetricBucketer>,
}

impl Default for CategoryBucketEngine {
    fn default() -> Self {
        Self::new(
            Arc::new(SchemeColorScales::default()),
            Arc::new(BreakPointBucketer),
        )
    }
}

impl CategoryBucketEngine {
    pub fn new(color_scales: Arc<dyn ColorScaleProvider>, bucketer: Arc<dyn MetricBucketer>) -> Self {
        Self {
            color_scales,
            bucketer,
        }
    }

    /// Categories of a slice, every key enabled.
    ///
    /// Point kinds get one entry per distinct non-null category in feature order. Polygons
    /// are bucketed by their metric. Other kinds have no categories.
    pub fn categories(
        &self,
        kind: VizKind,
        features: &[Feature],
        form_data: &FormData,
    ) -> Result<CategorySet, MosaicRuntimeError> {
        match kind {
            VizKind::Scatter | VizKind::Text => self.point_categories(features, form_data),
            VizKind::Polygon => {
                let Some(label) = form_data.metric_label() else {
                    return Ok(CategorySet::new());
                };
                Ok(self
                    .bucketer
                    .buckets(form_data, features, &|f: &Feature| f.metric(label))?)
            }
            VizKind::Other => Ok(CategorySet::new()),
        }
    }

    fn point_categories(
        &self,
        features: &[Feature],
        form_data: &FormData,
    ) -> Result<CategorySet, MosaicRuntimeError> {
        let fixed = form_data.color_picker_or_default().to_rgba();
        let mut categories = CategorySet::new();
        for category in features.iter().filter_map(|f| f.category.as_deref()) {
            if categories.contains_key(category) {
                continue;
            }
            let color = if form_data.dimension.is_some() {
                self.category_color(form_data, category)?
            } else {
                fixed
            };
            categories.insert(category, color);
        }
        Ok(categories)
    }

    /// Scheme color of a category with the color picker's alpha
    pub fn category_color(&self, form_data: &FormData, category: &str) -> Result<Rgba, MosaicRuntimeError> {
        let color = self
            .color_scales
            .color(form_data.color_scheme.as_deref(), category)?;
        Ok(with_alpha(color, form_data.color_picker_or_default().alpha_u8()))
    }

    /// Attach the category color to each feature when the slice groups by a dimension.
    ///
    /// Features without a category, and all features of slices without a dimension, keep
    /// their current color.
    pub fn assign_colors(
        &self,
        form_data: &FormData,
        features: Vec<Feature>,
    ) -> Result<Vec<Feature>, MosaicRuntimeError> {
        if form_data.dimension.is_none() {
            return Ok(features);
        }
        features
            .into_iter()
            .map(|mut feature| {
                if let Some(category) = feature.category.as_deref() {
                    feature.color = Some(self.category_color(form_data, category)?);
                }
                Ok(feature)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::types::ColorPicker;
    use rstest::rstest;

    fn scatter(dimension: Option<&str>) -> FormData {
        let mut form_data = FormData::new(VizKind::Scatter);
        form_data.dimension = dimension.map(str::to_string);
        form_data.color_picker = Some(ColorPicker {
            r: 10,
            g: 20,
            b: 30,
            a: 0.5,
        });
        form_data
    }

    fn cities(names: &[Option<&str>]) -> Vec<Feature> {
        names
            .iter()
            .map(|name| {
                let feature = Feature::new_point([0.0, 0.0]);
                match name {
                    Some(name) => feature.with_category(*name),
                    None => feature,
                }
            })
            .collect()
    }

    #[test]
    fn test_distinct_categories_in_feature_order() -> Result<(), MosaicRuntimeError> {
        let engine = CategoryBucketEngine::default();
        let features = cities(&[Some("NYC"), Some("LA"), None, Some("NYC")]);
        let categories = engine.categories(VizKind::Scatter, &features, &scatter(Some("city")))?;

        assert_eq!(categories.keys().collect::<Vec<_>>(), vec!["NYC", "LA"]);
        assert_eq!(categories.enabled_count(), 2);
        assert_eq!(categories.get("NYC").map(|s| s.color[3]), Some(128));
        Ok(())
    }

    #[test]
    fn test_fixed_color_without_dimension() -> Result<(), MosaicRuntimeError> {
        let engine = CategoryBucketEngine::default();
        let features = cities(&[Some("NYC"), Some("LA")]);
        let categories = engine.categories(VizKind::Scatter, &features, &scatter(None))?;
        assert_eq!(categories.color("NYC"), Some([10, 20, 30, 128]));
        assert_eq!(categories.color("LA"), Some([10, 20, 30, 128]));
        Ok(())
    }

    #[test]
    fn test_recomputation_is_idempotent() -> Result<(), MosaicRuntimeError> {
        let engine = CategoryBucketEngine::default();
        let features = cities(&[Some("b"), Some("a"), Some("c")]);
        let form_data = scatter(Some("letter"));
        let first = engine.categories(VizKind::Scatter, &features, &form_data)?;
        let second = engine.categories(VizKind::Scatter, &features, &form_data)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_polygon_buckets() -> Result<(), MosaicRuntimeError> {
        let engine = CategoryBucketEngine::default();
        let mut form_data = FormData::new(VizKind::Polygon);
        form_data.metric = Some(mosaic_common::form_data::MetricSpec::Named("count".to_string()));
        form_data.num_buckets = Some(2);
        let features = vec![
            Feature::new_polygon(vec![]).with_property("count", 0.0),
            Feature::new_polygon(vec![]).with_property("count", 10.0),
        ];
        let categories = engine.categories(VizKind::Polygon, &features, &form_data)?;
        assert_eq!(categories.keys().collect::<Vec<_>>(), vec!["0 - 5", "5 - 10"]);
        Ok(())
    }

    #[rstest]
    #[case(VizKind::Other)]
    #[case(VizKind::Polygon)]
    fn test_no_categories(#[case] kind: VizKind) -> Result<(), MosaicRuntimeError> {
        // polygons without a metric have nothing to bucket
        let engine = CategoryBucketEngine::default();
        let features = cities(&[Some("NYC")]);
        let categories = engine.categories(kind, &features, &FormData::new(kind))?;
        assert!(categories.is_empty());
        Ok(())
    }

    #[test]
    fn test_assign_colors() -> Result<(), MosaicRuntimeError> {
        let engine = CategoryBucketEngine::default();
        let features = cities(&[Some("NYC"), None]);

        let colored = engine.assign_colors(&scatter(Some("city")), features.clone())?;
        assert!(colored[0].color.is_some());
        assert!(colored[1].color.is_none());

        let uncolored = engine.assign_colors(&scatter(None), features)?;
        assert!(uncolored.iter().all(|f| f.color.is_none()));
        Ok(())
    }
}
