use indexmap::IndexMap;
use mosaic_common::feature::{Feature, SlicePayload};
use mosaic_common::types::{SliceId, Viewport};
use mosaic_geometry::ClusterIndex;
use mosaic_guides::LegendStateMachine;
use std::sync::Arc;

use crate::error::FetchError;
use crate::layers::SelectedItem;
use crate::query::SliceQuery;
use crate::time_window::TimeWindow;

/// A slice whose payload arrived
#[derive(Debug, Clone)]
pub struct ResolvedSlice {
    pub query: SliceQuery,
    pub payload: Arc<SlicePayload>,
    /// Cluster index over the payload, for clusterized text slices
    pub clusters: Option<Arc<ClusterIndex>>,
}

impl ResolvedSlice {
    pub fn features(&self) -> &[Feature] {
        self.payload.features()
    }
}

#[derive(Debug, Clone)]
pub enum SliceState {
    Resolved(ResolvedSlice),
    Failed(FetchError),
}

/// Snapshot of a composite.
///
/// Every update produces a new snapshot, readers holding an older `Arc` keep a consistent view.
#[derive(Debug, Clone, Default)]
pub struct CompositeState {
    /// Load cycle this snapshot belongs to
    pub generation: u64,
    /// Number of slices requested in this load cycle
    pub expected: usize,
    /// Settled slices in settlement order
    pub slices: IndexMap<SliceId, SliceState>,
    pub legends: LegendStateMachine,
    pub time_window: TimeWindow,
    /// Current playback range
    pub values: [i64; 2],
    pub viewport: Viewport,
    pub selected: Option<SelectedItem>,
}

impl CompositeState {
    /// Every requested slice has either resolved or failed
    pub fn is_ready(&self) -> bool {
        self.slices.len() >= self.expected
    }

    /// Resolved slices in resolution order
    pub fn resolved(&self) -> impl Iterator<Item = (SliceId, &ResolvedSlice)> {
        self.slices.iter().filter_map(|(id, state)| match state {
            SliceState::Resolved(slice) => Some((*id, slice)),
            SliceState::Failed(_) => None,
        })
    }

    pub fn resolved_slice(&self, slice_id: SliceId) -> Option<&ResolvedSlice> {
        match self.slices.get(&slice_id)? {
            SliceState::Resolved(slice) => Some(slice),
            SliceState::Failed(_) => None,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = (SliceId, &FetchError)> {
        self.slices.iter().filter_map(|(id, state)| match state {
            SliceState::Failed(err) => Some((*id, err)),
            SliceState::Resolved(_) => None,
        })
    }

    /// Timestamps of every resolved feature
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.resolved()
            .flat_map(|(_, slice)| slice.features().iter().filter_map(|f| f.timestamp))
    }
}
