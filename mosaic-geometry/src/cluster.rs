use geo::Centroid;
use itertools::{Itertools, MinMaxResult};
use mosaic_common::feature::{Feature, FeatureGeometry};
use mosaic_common::form_data::{FormData, DEFAULT_CLUSTER_MAX_ZOOM, DEFAULT_CLUSTER_RADIUS};
use rstar::{primitives::GeomWithData, RTree, AABB};

use crate::error::MosaicGeometryError;
use crate::labels::{accumulate_name, cluster_label, singleton_label};
use crate::projection::{lat_y, lng_x, project, unproject};

/// Deepest zoom level an index may be built for
pub const MAX_SUPPORTED_ZOOM: u8 = 24;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Cluster radius in pixels
    pub radius: f64,
    /// Tile extent the radius is relative to
    pub extent: f64,
    pub min_zoom: u8,
    /// Zoom level beyond which points are never merged
    pub max_zoom: u8,
    /// Minimum number of points to form a cluster
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: DEFAULT_CLUSTER_RADIUS,
            extent: 512.0,
            min_zoom: 0,
            max_zoom: DEFAULT_CLUSTER_MAX_ZOOM,
            min_points: 2,
        }
    }
}

impl From<&FormData> for ClusterOptions {
    fn from(form_data: &FormData) -> Self {
        Self {
            radius: form_data.cluster_radius,
            max_zoom: form_data.cluster_max_zoom,
            ..Default::default()
        }
    }
}

/// Which end of the cluster size range to query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

/// Identifies a cluster by the zoom level it was formed at and its position in that level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterId {
    pub zoom: u8,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeOrigin {
    /// An original point, `feature` indexes the slice the index was built from
    Leaf { feature: usize },
    /// A merge of `children`, which index the nodes of level `id.zoom + 1`
    Cluster { id: ClusterId, children: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNode {
    /// Projected unit-square coordinates
    pub point: [f64; 2],
    pub num_points: usize,
    /// Names of all merged points joined by the name separator
    pub name: String,
    pub origin: NodeOrigin,
}

impl ClusterNode {
    pub fn is_cluster(&self) -> bool {
        matches!(self.origin, NodeOrigin::Cluster { .. })
    }

    /// `[lng, lat]` of the node
    pub fn position(&self) -> [f64; 2] {
        unproject(self.point)
    }

    /// The most frequent name for clusters, the first name segment for single points
    pub fn label(&self) -> String {
        if self.is_cluster() {
            cluster_label(&self.name)
        } else {
            singleton_label(&self.name)
        }
    }

    pub fn feature_index(&self) -> Option<usize> {
        match self.origin {
            NodeOrigin::Leaf { feature } => Some(feature),
            NodeOrigin::Cluster { .. } => None,
        }
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        match self.origin {
            NodeOrigin::Cluster { id, .. } => Some(id),
            NodeOrigin::Leaf { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct ZoomLevel {
    nodes: Vec<ClusterNode>,
    tree: RTree<IndexedPoint>,
}

impl ZoomLevel {
    fn new(nodes: Vec<ClusterNode>) -> Self {
        let tree = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(i, n)| IndexedPoint::new(n.point, i))
                .collect(),
        );
        Self { nodes, tree }
    }

    /// Point counts of the actual clusters at this level
    fn cluster_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.is_cluster())
            .map(|n| n.num_points)
    }

    /// Min/max cluster size, a single point counts as the fallback when there are no clusters
    fn size_range(&self) -> (usize, usize) {
        match self.cluster_sizes().minmax() {
            MinMaxResult::NoElements => (1, 1),
            MinMaxResult::OneElement(size) => (size, size),
            MinMaxResult::MinMax(min, max) => (min, max),
        }
    }
}

/// Hierarchical point clustering over all zoom levels.
///
/// Built once per feature set, bottom-up: the level at `max_zoom + 1` holds every named point,
/// and each lower level merges the nodes of the level above that fall within the cluster
/// radius. Immutable once built.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    options: ClusterOptions,
    /// Levels `min_zoom..=max_zoom + 1`
    levels: Vec<ZoomLevel>,
}

impl ClusterIndex {
    /// Index the named points of `features`.
    ///
    /// Features with a null name or without geometry are skipped. Polygons are represented
    /// by their centroid.
    #[tracing::instrument(skip_all, fields(features = features.len()))]
    pub fn build(features: &[Feature], options: ClusterOptions) -> Result<Self, MosaicGeometryError> {
        if options.min_zoom > options.max_zoom || options.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(MosaicGeometryError::InvalidZoomRange {
                min_zoom: options.min_zoom,
                max_zoom: options.max_zoom,
            });
        }
        if !(options.radius.is_finite() && options.radius > 0.0) {
            return Err(MosaicGeometryError::InvalidRadius(options.radius));
        }

        let leaves = features
            .iter()
            .enumerate()
            .filter_map(|(i, feature)| {
                let name = feature.name.as_ref()?;
                let position = feature_point(feature)?;
                Some(ClusterNode {
                    point: project(position),
                    num_points: 1,
                    name: name.clone(),
                    origin: NodeOrigin::Leaf { feature: i },
                })
            })
            .collect::<Vec<_>>();

        let mut above = ZoomLevel::new(leaves);
        let mut levels = Vec::with_capacity((options.max_zoom - options.min_zoom) as usize + 2);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let next = cluster_level(&above, zoom, &options);
            levels.push(std::mem::replace(&mut above, next));
        }
        levels.push(above);
        levels.reverse();

        let index = Self { options, levels };
        tracing::debug!(
            points = index.len(),
            clusters_at_min_zoom = index.level(options.min_zoom).cluster_sizes().count(),
            "built cluster index"
        );
        Ok(index)
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of indexed (named) points
    pub fn len(&self) -> usize {
        self.levels.last().map(|l| l.nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.options.min_zoom, self.options.max_zoom + 1)
    }

    fn level(&self, zoom: u8) -> &ZoomLevel {
        &self.levels[(self.clamp_zoom(zoom) - self.options.min_zoom) as usize]
    }

    /// All nodes, clusters and unmerged points, visible at `zoom`
    pub fn clusters(&self, zoom: u8) -> &[ClusterNode] {
        &self.level(zoom).nodes
    }

    /// Nodes at `zoom` inside `[west, south, east, north]`, crossing the antimeridian when
    /// `west > east`
    pub fn clusters_in(&self, bbox: [f64; 4], zoom: u8) -> Vec<&ClusterNode> {
        let [west, south, east, north] = bbox;
        if west > east {
            let mut nodes = self.clusters_in([west, south, 180.0, north], zoom);
            nodes.extend(self.clusters_in([-180.0, south, east, north], zoom));
            return nodes;
        }

        let level = self.level(zoom);
        let envelope = AABB::from_corners(
            [lng_x(west), lat_y(north)],
            [lng_x(east), lat_y(south)],
        );
        let mut ids = level
            .tree
            .locate_in_envelope(&envelope)
            .map(|p| p.data)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.into_iter().map(|i| &level.nodes[i]).collect()
    }

    /// Direct children of a cluster node, empty for leaves
    pub fn children(&self, node: &ClusterNode) -> Result<Vec<&ClusterNode>, MosaicGeometryError> {
        let NodeOrigin::Cluster { id, children } = &node.origin else {
            return Ok(vec![]);
        };
        let level = self.level(id.zoom + 1);
        children
            .iter()
            .map(|&i| {
                level.nodes.get(i).ok_or(MosaicGeometryError::ClusterNotFound {
                    zoom: id.zoom,
                    index: id.index,
                })
            })
            .collect()
    }

    /// Indices of the original features merged into `node`
    pub fn leaves(&self, node: &ClusterNode) -> Result<Vec<usize>, MosaicGeometryError> {
        match node.origin {
            NodeOrigin::Leaf { feature } => Ok(vec![feature]),
            NodeOrigin::Cluster { .. } => {
                let mut leaves = Vec::with_capacity(node.num_points);
                for child in self.children(node)? {
                    leaves.extend(self.leaves(child)?);
                }
                Ok(leaves)
            }
        }
    }

    /// Smallest or largest cluster size.
    ///
    /// With a zoom, only that level's clusters are considered and a level without clusters
    /// reports 1. Without a zoom, the per-level results of every level are combined.
    pub fn extremum_size(&self, extremum: Extremum, zoom: Option<u8>) -> usize {
        let pick = |(min, max): (usize, usize)| match extremum {
            Extremum::Min => min,
            Extremum::Max => max,
        };

        match zoom {
            Some(zoom) => pick(self.level(zoom).size_range()),
            None => {
                let sizes = self.levels.iter().flat_map(|level| level.cluster_sizes());
                match extremum {
                    Extremum::Min => sizes.min(),
                    Extremum::Max => sizes.max(),
                }
                .unwrap_or(1)
            }
        }
    }
}

/// Merge the nodes of the level above `zoom` into the nodes of `zoom`
fn cluster_level(above: &ZoomLevel, zoom: u8, options: &ClusterOptions) -> ZoomLevel {
    let r = options.radius / (options.extent * 2f64.powi(zoom as i32));
    let mut visited = vec![false; above.nodes.len()];
    let mut nodes = Vec::with_capacity(above.nodes.len());

    for (i, node) in above.nodes.iter().enumerate() {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut neighbors = above
            .tree
            .locate_within_distance(node.point, r * r)
            .map(|p| p.data)
            .filter(|&j| !visited[j])
            .collect::<Vec<_>>();
        neighbors.sort_unstable();

        let num_points = node.num_points
            + neighbors
                .iter()
                .map(|&j| above.nodes[j].num_points)
                .sum::<usize>();

        if neighbors.is_empty() || num_points < options.min_points {
            nodes.push(node.clone());
            continue;
        }

        let mut wx = node.point[0] * node.num_points as f64;
        let mut wy = node.point[1] * node.num_points as f64;
        let mut name = node.name.clone();
        for &j in &neighbors {
            visited[j] = true;
            let neighbor = &above.nodes[j];
            wx += neighbor.point[0] * neighbor.num_points as f64;
            wy += neighbor.point[1] * neighbor.num_points as f64;
            accumulate_name(&mut name, &neighbor.name);
        }

        let mut children = Vec::with_capacity(neighbors.len() + 1);
        children.push(i);
        children.extend(neighbors);

        nodes.push(ClusterNode {
            point: [wx / num_points as f64, wy / num_points as f64],
            num_points,
            name,
            origin: NodeOrigin::Cluster {
                id: ClusterId {
                    zoom,
                    index: nodes.len(),
                },
                children,
            },
        });
    }

    ZoomLevel::new(nodes)
}

/// Representative `[lng, lat]` of a feature
fn feature_point(feature: &Feature) -> Option<[f64; 2]> {
    match feature.geometry.as_ref()? {
        FeatureGeometry::Point(p) => Some(*p),
        FeatureGeometry::Polygon(ring) => {
            let polygon = geo_types::Polygon::new(
                geo_types::LineString::from(ring.clone()),
                vec![],
            );
            polygon.centroid().map(|c| [c.x(), c.y()])
        }
    }
}
