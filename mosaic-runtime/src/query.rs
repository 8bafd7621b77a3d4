use mosaic_common::form_data::{CompositeConfig, FormData, SliceDescriptor};
use mosaic_common::types::SliceId;
use serde_json::Value;

use crate::error::MosaicRuntimeError;

pub const EXPLORE_JSON_ENDPOINT: &str = "/superset/explore_json/";

/// The effective query of one slice inside a composite
#[derive(Debug, Clone, PartialEq)]
pub struct SliceQuery {
    descriptor: SliceDescriptor,
}

impl SliceQuery {
    /// Combine a slice with the composite's filters.
    ///
    /// The effective filters are the slice's own filters, followed by the composite's filters,
    /// followed by its extra (ad-hoc) filters.
    pub fn new(descriptor: &SliceDescriptor, config: &CompositeConfig) -> Self {
        let mut descriptor = descriptor.clone();
        let filters: Vec<Value> = descriptor
            .form_data
            .filters
            .iter()
            .chain(config.filters.iter())
            .chain(config.extra_filters.iter())
            .cloned()
            .collect();
        descriptor.form_data.filters = filters;
        descriptor.form_data.slice_id = Some(descriptor.slice_id);
        Self { descriptor }
    }

    pub fn slice_id(&self) -> SliceId {
        self.descriptor.slice_id
    }

    pub fn descriptor(&self) -> &SliceDescriptor {
        &self.descriptor
    }

    pub fn form_data(&self) -> &FormData {
        &self.descriptor.form_data
    }

    /// JSON endpoint for the effective form data
    pub fn endpoint(&self) -> Result<String, MosaicRuntimeError> {
        let form_data = serde_json::to_string(&self.descriptor.form_data)?;
        Ok(format!(
            "{EXPLORE_JSON_ENDPOINT}?form_data={}",
            urlencoding::encode(&form_data)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::types::VizKind;
    use serde_json::json;

    #[test]
    fn test_filter_order() {
        let mut form_data = FormData::new(VizKind::Scatter);
        form_data.filters = vec![json!({"col": "own"})];
        let descriptor = SliceDescriptor::new(7, "trips", form_data);
        let config = CompositeConfig {
            filters: vec![json!({"col": "top"})],
            extra_filters: vec![json!({"col": "extra"})],
            ..Default::default()
        };

        let query = SliceQuery::new(&descriptor, &config);
        let cols = query
            .form_data()
            .filters
            .iter()
            .map(|f| f["col"].as_str().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(cols, vec!["own", "top", "extra"]);
        assert_eq!(query.slice_id(), SliceId(7));
        assert_eq!(query.form_data().slice_id, Some(SliceId(7)));
    }

    #[test]
    fn test_endpoint_round_trips_form_data() -> Result<(), MosaicRuntimeError> {
        let descriptor = SliceDescriptor::new(3, "cities", FormData::new(VizKind::Text));
        let query = SliceQuery::new(&descriptor, &CompositeConfig::default());

        let endpoint = query.endpoint()?;
        let encoded = endpoint
            .strip_prefix("/superset/explore_json/?form_data=")
            .unwrap();
        assert!(!encoded.contains('{'));

        let decoded = urlencoding::decode(encoded).unwrap();
        let form_data: FormData = serde_json::from_str(&decoded)?;
        assert_eq!(form_data.viz_type, VizKind::Text);
        assert_eq!(form_data.slice_id, Some(SliceId(3)));
        Ok(())
    }
}
