use mosaic_common::feature::Feature;
use mosaic_geometry::error::MosaicGeometryError;
use mosaic_geometry::{ClusterIndex, ClusterOptions, Extremum};
use rstest::rstest;

/// Seven points near (-100, 0), three near (100, 40) and one on its own
fn sample_features() -> Vec<Feature> {
    let mut features = Vec::new();
    for i in 0..7 {
        let name = if i % 2 == 0 { "Airport" } else { "Station" };
        features.push(Feature::new_point([-100.0 + i as f64 * 1e-6, 0.0]).with_name(name));
    }
    for i in 0..3 {
        features.push(Feature::new_point([100.0, 40.0 + i as f64 * 1e-6]).with_name("Harbor"));
    }
    features.push(Feature::new_point([0.0, -60.0]).with_name("Lighthouse"));
    features
}

fn sample_index() -> ClusterIndex {
    ClusterIndex::build(&sample_features(), ClusterOptions::default()).unwrap()
}

#[test]
fn test_global_extremum() {
    let index = sample_index();
    assert_eq!(index.len(), 11);
    assert_eq!(index.extremum_size(Extremum::Max, None), 7);
    // the lone point never forms a cluster, so the smallest is the harbor group
    assert_eq!(index.extremum_size(Extremum::Min, None), 3);
}

#[test]
fn test_global_extremum_of_single_cluster() -> Result<(), MosaicGeometryError> {
    let features = (0..3)
        .map(|_| Feature::new_point([2.35, 48.85]).with_name("X"))
        .collect::<Vec<_>>();
    let index = ClusterIndex::build(&features, ClusterOptions::default())?;
    for zoom in 0..=16 {
        assert_eq!(index.extremum_size(Extremum::Min, Some(zoom)), 3);
    }
    assert_eq!(index.extremum_size(Extremum::Min, None), 3);
    assert_eq!(index.extremum_size(Extremum::Max, None), 3);
    Ok(())
}

#[test]
fn test_global_extremum_without_clusters() -> Result<(), MosaicGeometryError> {
    let features = vec![
        Feature::new_point([-100.0, 0.0]).with_name("A"),
        Feature::new_point([100.0, 40.0]).with_name("B"),
    ];
    let index = ClusterIndex::build(&features, ClusterOptions::default())?;
    assert_eq!(index.extremum_size(Extremum::Min, None), 1);
    assert_eq!(index.extremum_size(Extremum::Max, None), 1);
    Ok(())
}

#[rstest]
#[case(0, Extremum::Min, 3)]
#[case(5, Extremum::Min, 3)]
#[case(5, Extremum::Max, 7)]
#[case(16, Extremum::Max, 7)]
#[case(17, Extremum::Min, 1)]
#[case(17, Extremum::Max, 1)]
#[case(30, Extremum::Max, 1)]
fn test_extremum_at_zoom(#[case] zoom: u8, #[case] extremum: Extremum, #[case] expected: usize) {
    assert_eq!(sample_index().extremum_size(extremum, Some(zoom)), expected);
}

#[test]
fn test_clusters_per_zoom() {
    let index = sample_index();
    let mut sizes = index
        .clusters(5)
        .iter()
        .map(|n| n.num_points)
        .collect::<Vec<_>>();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 3, 7]);
    assert_eq!(index.clusters(17).len(), 11);
}

#[test]
fn test_cluster_label_is_most_frequent_name() -> Result<(), MosaicGeometryError> {
    let index = sample_index();
    let nodes = index.clusters_in([-110.0, -10.0, -90.0, 10.0], 5);
    assert_eq!(nodes.len(), 1);

    let cluster = nodes[0];
    assert!(cluster.is_cluster());
    assert_eq!(cluster.num_points, 7);
    assert_eq!(cluster.label(), "Airport");

    let mut leaves = index.leaves(cluster)?;
    leaves.sort_unstable();
    assert_eq!(leaves, (0..7).collect::<Vec<_>>());
    assert_eq!(index.children(cluster)?.len(), 7);

    let [lng, lat] = cluster.position();
    assert!((lng + 100.0).abs() < 1e-4);
    assert!(lat.abs() < 1e-4);
    Ok(())
}

#[test]
fn test_singleton_label() {
    let index = sample_index();
    let nodes = index.clusters_in([-10.0, -70.0, 10.0, -50.0], 3);
    assert_eq!(nodes.len(), 1);
    assert!(!nodes[0].is_cluster());
    assert_eq!(nodes[0].feature_index(), Some(10));
    assert_eq!(nodes[0].label(), "Lighthouse");
}

#[test]
fn test_bbox_across_antimeridian() {
    let index = sample_index();
    let nodes = index.clusters_in([90.0, -80.0, -90.0, 80.0], 2);
    let mut sizes = nodes.iter().map(|n| n.num_points).collect::<Vec<_>>();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![3, 7]);
}

#[test]
fn test_cluster_of_repeated_names() {
    let features = vec![
        Feature::new_point([10.0, 10.0]).with_name("X"),
        Feature::new_point([10.0, 10.0]).with_name("Y"),
        Feature::new_point([10.0, 10.0]).with_name("X"),
    ];
    let index = ClusterIndex::build(&features, ClusterOptions::default()).unwrap();
    let top = &index.clusters(0)[0];
    assert_eq!(top.num_points, 3);
    assert_eq!(top.name, "X,Y,X");
    assert_eq!(top.label(), "X");
}
