//! Contracts of the components the compositor delegates to.
//!
//! Fetching, layer generation and mutator evaluation happen outside this crate. Color scales
//! and metric bucketing have defaults backed by `mosaic-scales`.
use async_trait::async_trait;
use indexmap::IndexMap;
use mosaic_common::feature::{Feature, SlicePayload};
use mosaic_common::form_data::FormData;
use mosaic_common::types::Rgba;
use mosaic_guides::CategorySet;
use mosaic_scales::bucket::{break_points, metric_buckets};
use mosaic_scales::color::categorical::{CategoricalScheme, OrdinalColorScale, DEFAULT_CATEGORICAL_SCHEME};
use mosaic_scales::color::sequential::SequentialScheme;
use mosaic_scales::error::MosaicScaleError;
use std::fmt::Debug;
use std::sync::Mutex;

use crate::error::{FetchError, LayerError, MutatorError};
use crate::layers::LayerRequest;
use crate::query::SliceQuery;

#[async_trait]
pub trait SliceFetcher: Debug + Send + Sync {
    /// Fetch the payload of one slice
    async fn fetch(&self, query: &SliceQuery) -> Result<SlicePayload, FetchError>;
}

pub trait LayerGenerator: Send + Sync {
    type Layer: Send;

    fn generate(&self, request: &LayerRequest<'_>) -> Result<Self::Layer, LayerError>;
}

pub trait ColorScaleProvider: Debug + Send + Sync {
    /// Color of `key` in the categorical scheme `scheme` (the default scheme when `None`)
    fn color(&self, scheme: Option<&str>, key: &str) -> Result<Rgba, MosaicScaleError>;
}

/// Evaluates a trusted user transform over a feature array.
///
/// Implementations only see the features they are handed and must not reach host state.
pub trait DataMutator: Send + Sync {
    fn mutate(&self, expression: &str, features: Vec<Feature>) -> Result<Vec<Feature>, MutatorError>;
}

impl<F> DataMutator for F
where
    F: Fn(&str, Vec<Feature>) -> Result<Vec<Feature>, MutatorError> + Send + Sync,
{
    fn mutate(&self, expression: &str, features: Vec<Feature>) -> Result<Vec<Feature>, MutatorError> {
        self(expression, features)
    }
}

pub trait MetricBucketer: Debug + Send + Sync {
    /// Partition the values of `accessor` over `features` into colored buckets
    fn buckets(
        &self,
        form_data: &FormData,
        features: &[Feature],
        accessor: &dyn Fn(&Feature) -> Option<f64>,
    ) -> Result<CategorySet, MosaicScaleError>;
}

/// Ordinal scales per scheme, shared by every slice so a key keeps its color across slices
/// and recomputations
#[derive(Debug, Default)]
pub struct SchemeColorScales {
    scales: Mutex<IndexMap<String, OrdinalColorScale>>,
}

impl ColorScaleProvider for SchemeColorScales {
    fn color(&self, scheme: Option<&str>, key: &str) -> Result<Rgba, MosaicScaleError> {
        let id = scheme.unwrap_or(DEFAULT_CATEGORICAL_SCHEME);
        let mut scales = self
            .scales
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !scales.contains_key(id) {
            let scale = OrdinalColorScale::new(CategoricalScheme::builtin(Some(id))?);
            scales.insert(id.to_string(), scale);
        }
        match scales.get_mut(id) {
            Some(scale) => Ok(scale.color(key)),
            None => Err(MosaicScaleError::UnknownColorScheme(id.to_string())),
        }
    }
}

/// Buckets delimited by explicit break points or by equal-width intervals over the metric's
/// extent, colored from the slice's sequential scheme
#[derive(Debug, Default, Clone)]
pub struct BreakPointBucketer;

impl MetricBucketer for BreakPointBucketer {
    fn buckets(
        &self,
        form_data: &FormData,
        features: &[Feature],
        accessor: &dyn Fn(&Feature) -> Option<f64>,
    ) -> Result<CategorySet, MosaicScaleError> {
        let values = features.iter().filter_map(accessor).collect::<Vec<_>>();
        let points = break_points(&form_data.break_points, form_data.num_buckets, &values)?;
        let scheme = SequentialScheme::builtin(form_data.linear_color_scheme.as_deref())?;
        let buckets = metric_buckets(&points, &scheme, form_data.opacity)?;
        Ok(buckets.into_iter().map(|b| (b.key, b.color)).collect())
    }
}

/// Mutator used when no evaluator is available, every expression fails
#[derive(Debug, Default, Clone)]
pub struct UnavailableMutator;

impl DataMutator for UnavailableMutator {
    fn mutate(&self, _expression: &str, _features: Vec<Feature>) -> Result<Vec<Feature>, MutatorError> {
        Err(MutatorError("no mutator evaluator configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::types::VizKind;

    #[test]
    fn test_scheme_colors_are_stable() -> Result<(), MosaicScaleError> {
        let scales = SchemeColorScales::default();
        let nyc = scales.color(None, "NYC")?;
        let la = scales.color(None, "LA")?;
        assert_ne!(nyc, la);
        assert_eq!(scales.color(None, "NYC")?, nyc);
        assert_eq!(scales.color(Some(DEFAULT_CATEGORICAL_SCHEME), "LA")?, la);
        assert!(scales.color(Some("no_such_scheme"), "LA").is_err());
        Ok(())
    }

    #[test]
    fn test_break_point_bucketer() -> Result<(), MosaicScaleError> {
        let mut form_data = FormData::new(VizKind::Polygon);
        form_data.break_points = vec!["10".to_string(), "0".to_string(), "5".to_string()];
        let features = vec![
            Feature::new_point([0.0, 0.0]).with_property("count", 1.0),
            Feature::new_point([0.0, 0.0]).with_property("count", 9.0),
        ];

        let categories = BreakPointBucketer.buckets(&form_data, &features, &|f: &Feature| {
            f.metric("count")
        })?;
        assert_eq!(categories.keys().collect::<Vec<_>>(), vec!["0 - 5", "5 - 10"]);
        assert_eq!(categories.get("0 - 5").map(|s| s.color[3]), Some(204));
        Ok(())
    }

    #[test]
    fn test_closure_mutator() -> Result<(), MutatorError> {
        let reverse = |_: &str, mut features: Vec<Feature>| -> Result<Vec<Feature>, MutatorError> {
            features.reverse();
            Ok(features)
        };
        let features = vec![
            Feature::new_point([0.0, 0.0]).with_name("a"),
            Feature::new_point([1.0, 1.0]).with_name("b"),
        ];
        let mutated = reverse.mutate("reverse", features)?;
        assert_eq!(mutated[0].name.as_deref(), Some("b"));
        assert!(UnavailableMutator.mutate("x", vec![]).is_err());
        Ok(())
    }
}
