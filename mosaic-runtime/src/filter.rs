use mosaic_common::feature::Feature;
use mosaic_common::form_data::FormData;
use mosaic_guides::CategorySet;

use crate::categories::CategoryBucketEngine;
use crate::collaborators::DataMutator;
use crate::error::MosaicRuntimeError;
use crate::time_window::TimeWindow;

/// Features surviving the pipeline, plus the isolated failure of the mutator stage if any
#[derive(Debug)]
pub struct FilteredFeatures {
    pub features: Vec<Feature>,
    pub mutator_error: Option<MosaicRuntimeError>,
}

/// Colors, mutates and filters the features of one point slice.
///
/// Stages run in order and each only sees what the previous one kept:
/// color assignment, the user data mutator, the playback window, then enabled categories.
/// The playback window only applies to slices that carry timestamps.
pub struct FeatureFilterPipeline<'a> {
    engine: &'a CategoryBucketEngine,
    mutator: &'a dyn DataMutator,
}

impl<'a> FeatureFilterPipeline<'a> {
    pub fn new(engine: &'a CategoryBucketEngine, mutator: &'a dyn DataMutator) -> Self {
        Self { engine, mutator }
    }

    #[tracing::instrument(skip_all, fields(slice_id = ?form_data.slice_id, features = features.len()))]
    pub fn filter(
        &self,
        form_data: &FormData,
        features: &[Feature],
        window: &TimeWindow,
        values: [i64; 2],
        categories: Option<&CategorySet>,
    ) -> Result<FilteredFeatures, MosaicRuntimeError> {
        // an untimed slice is not played back even when other slices enable the window
        let timed = features.iter().any(|f| f.timestamp.is_some());
        let mut features = self.engine.assign_colors(form_data, features.to_vec())?;

        let mut mutator_error = None;
        if form_data.has_mutator() {
            let expression = form_data.js_data_mutator.as_deref().unwrap_or_default();
            match self.mutator.mutate(expression, features.clone()) {
                Ok(mutated) => features = mutated,
                Err(source) => {
                    let err = MosaicRuntimeError::Mutator {
                        slice_id: form_data.slice_id.unwrap_or_default(),
                        source,
                    };
                    tracing::warn!("{err}, rendering unmutated features");
                    mutator_error = Some(err);
                }
            }
        }

        if timed && !window.disabled {
            features.retain(|f| f.timestamp.is_some_and(|ts| window.contains(ts, values)));
        }

        if let (Some(categories), Some(_)) = (categories, &form_data.dimension) {
            features.retain(|f| {
                f.category
                    .as_deref()
                    .is_some_and(|c| categories.is_enabled(c))
            });
        }

        Ok(FilteredFeatures {
            features,
            mutator_error,
        })
    }
}
