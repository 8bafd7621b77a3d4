use mosaic_common::form_data::FormData;
use mosaic_common::types::Rgba;
use mosaic_geometry::{ClusterIndex, Extremum};
use mosaic_scales::color::sequential::interpolate_rgba;

/// One label of a clusterized text layer
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    /// `[lng, lat]`
    pub position: [f64; 2],
    pub text: String,
    pub count: usize,
    pub color: Rgba,
    pub cluster: bool,
}

/// Integer zoom level of a fractional map zoom
pub fn zoom_level(zoom: f64) -> u8 {
    if zoom.is_finite() {
        zoom.floor().clamp(0.0, u8::MAX as f64) as u8
    } else {
        0
    }
}

/// Labels for every cluster and unclustered point visible at `zoom`.
///
/// With `grade_colors`, label colors run from the color picker (smallest clusters) to the
/// alternate color picker (largest clusters). Sizes are ranked within `zoom` when
/// `per_zoom_level` is set and across all levels otherwise.
pub fn plan_labels(index: &ClusterIndex, form_data: &FormData, zoom: u8) -> Vec<TextLabel> {
    let base = form_data.color_picker_or_default().to_rgba();
    let alt = form_data
        .color_picker_alt
        .map(|c| c.to_rgba())
        .unwrap_or(base);

    let range = form_data.grade_colors.then(|| {
        let level = form_data.per_zoom_level.then_some(zoom);
        (
            index.extremum_size(Extremum::Min, level),
            index.extremum_size(Extremum::Max, level),
        )
    });

    index
        .clusters(zoom)
        .iter()
        .map(|node| {
            let color = match range {
                Some((min, max)) if max > min => {
                    let t = (node.num_points as f64 - min as f64) / (max - min) as f64;
                    interpolate_rgba(&[base, alt], t.clamp(0.0, 1.0))
                }
                Some(_) | None => base,
            };
            TextLabel {
                position: node.position(),
                text: node.label(),
                count: node.num_points,
                color,
                cluster: node.is_cluster(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_common::feature::Feature;
    use mosaic_common::types::{ColorPicker, VizKind};
    use mosaic_geometry::ClusterOptions;

    const BLACK: ColorPicker = ColorPicker {
        r: 0,
        g: 0,
        b: 0,
        a: 1.0,
    };
    const WHITE: ColorPicker = ColorPicker {
        r: 255,
        g: 255,
        b: 255,
        a: 1.0,
    };

    fn index() -> ClusterIndex {
        let features = vec![
            Feature::new_point([10.0, 10.0]).with_name("X"),
            Feature::new_point([10.0, 10.0]).with_name("Y"),
            Feature::new_point([10.0, 10.0]).with_name("X"),
            Feature::new_point([-50.0, -20.0]).with_name("Solo,Other"),
        ];
        ClusterIndex::build(&features, ClusterOptions::default()).unwrap()
    }

    fn text_form_data(grade: bool, per_zoom_level: bool) -> FormData {
        let mut form_data = FormData::new(VizKind::Text);
        form_data.clusterize = true;
        form_data.color_picker = Some(BLACK);
        form_data.color_picker_alt = Some(WHITE);
        form_data.grade_colors = grade;
        form_data.per_zoom_level = per_zoom_level;
        form_data
    }

    fn label<'a>(labels: &'a [TextLabel], text: &str) -> &'a TextLabel {
        labels.iter().find(|l| l.text == text).unwrap()
    }

    #[test]
    fn test_labels() {
        let labels = plan_labels(&index(), &text_form_data(false, false), 5);
        assert_eq!(labels.len(), 2);

        let cluster = label(&labels, "X");
        assert!(cluster.cluster);
        assert_eq!(cluster.count, 3);
        assert_eq!(cluster.color, [0, 0, 0, 255]);

        let single = label(&labels, "Solo (+1)");
        assert!(!single.cluster);
        assert_eq!(single.count, 1);
    }

    #[test]
    fn test_graded_colors_across_levels() {
        let mut features = vec![
            Feature::new_point([60.0, 30.0]).with_name("Pair"),
            Feature::new_point([60.0, 30.0]).with_name("Pair"),
        ];
        features.extend([
            Feature::new_point([10.0, 10.0]).with_name("X"),
            Feature::new_point([10.0, 10.0]).with_name("X"),
            Feature::new_point([10.0, 10.0]).with_name("X"),
            Feature::new_point([-50.0, -20.0]).with_name("Solo,Other"),
        ]);
        let index = ClusterIndex::build(&features, ClusterOptions::default()).unwrap();

        let labels = plan_labels(&index, &text_form_data(true, false), 5);
        assert_eq!(label(&labels, "X").color, [255, 255, 255, 255]);
        assert_eq!(label(&labels, "Pair").color, [0, 0, 0, 255]);
        // smaller than the smallest cluster, clamped to the low end
        assert_eq!(label(&labels, "Solo (+1)").color, [0, 0, 0, 255]);
    }

    #[test]
    fn test_graded_colors_per_zoom_level() {
        // a single cluster size at this zoom leaves nothing to grade
        let labels = plan_labels(&index(), &text_form_data(true, true), 5);
        assert_eq!(label(&labels, "X").color, [0, 0, 0, 255]);
    }

    #[test]
    fn test_zoom_level() {
        assert_eq!(zoom_level(3.7), 3);
        assert_eq!(zoom_level(-1.0), 0);
        assert_eq!(zoom_level(f64::NAN), 0);
    }
}
