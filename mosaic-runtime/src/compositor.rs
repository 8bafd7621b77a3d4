use mosaic_common::feature::SlicePayload;
use mosaic_common::form_data::{CompositeConfig, FormData};
use mosaic_common::types::{SliceId, Viewport, VizKind};
use mosaic_geometry::{ClusterIndex, ClusterOptions};
use mosaic_guides::legend::{make_legend, Legend, LegendConfig, LegendPosition};
use mosaic_guides::error::MosaicGuidesError;
use mosaic_guides::CategorySet;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::categories::CategoryBucketEngine;
use crate::collaborators::{DataMutator, LayerGenerator, SliceFetcher, UnavailableMutator};
use crate::error::{FetchError, MosaicRuntimeError};
use crate::filter::FeatureFilterPipeline;
use crate::layers::{LayerRequest, RenderLayer, SelectedItem, SelectionMarker};
use crate::query::SliceQuery;
use crate::state::{CompositeState, ResolvedSlice, SliceState};
use crate::text::{plan_labels, zoom_level, TextLabel};
use crate::time_window::{PlaybackInput, TimeWindow, TimeWindowDeriver, TimeWindowOptions};

/// Outcome of one fetch, tagged with the load cycle that issued it
#[derive(Debug)]
pub struct SliceCompletion {
    pub generation: u64,
    pub query: SliceQuery,
    pub result: Result<SlicePayload, FetchError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceLegend {
    pub slice_id: SliceId,
    pub legend: Legend,
}

/// Composes independently fetched slices into one layered scene.
///
/// Fetches run as concurrent tokio tasks and report back over a channel. The compositor is
/// the only writer of composite state: completions are applied one at a time through
/// `&mut self`, and each application publishes a new [`CompositeState`] snapshot.
pub struct MultiSliceCompositor<G: LayerGenerator> {
    config: CompositeConfig,
    fetcher: Arc<dyn SliceFetcher>,
    generator: G,
    engine: CategoryBucketEngine,
    mutator: Arc<dyn DataMutator>,
    deriver: TimeWindowDeriver,
    tasks: Vec<JoinHandle<()>>,
    completions_tx: mpsc::UnboundedSender<SliceCompletion>,
    completions_rx: mpsc::UnboundedReceiver<SliceCompletion>,
    state: watch::Sender<Arc<CompositeState>>,
}

impl<G: LayerGenerator> MultiSliceCompositor<G> {
    pub fn try_new(
        config: CompositeConfig,
        fetcher: Arc<dyn SliceFetcher>,
        generator: G,
    ) -> Result<Self, MosaicRuntimeError> {
        let deriver = TimeWindowDeriver::new(Some(config.time_grain()), Default::default())?;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(Arc::new(CompositeState::default()));
        Ok(Self {
            config,
            fetcher,
            generator,
            engine: CategoryBucketEngine::default(),
            mutator: Arc::new(UnavailableMutator),
            deriver,
            tasks: vec![],
            completions_tx,
            completions_rx,
            state,
        })
    }

    pub fn with_engine(mut self, engine: CategoryBucketEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_mutator(mut self, mutator: Arc<dyn DataMutator>) -> Self {
        self.mutator = mutator;
        self
    }

    pub fn with_time_window_options(mut self, options: TimeWindowOptions) -> Self {
        self.deriver = self.deriver.clone().with_options(options);
        self
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    /// Latest composite snapshot
    pub fn state(&self) -> Arc<CompositeState> {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<CompositeState>> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    fn try_update<T, E>(
        &self,
        f: impl FnOnce(&mut CompositeState) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut next = CompositeState::clone(&self.state.borrow());
        let out = f(&mut next)?;
        self.state.send_replace(Arc::new(next));
        Ok(out)
    }

    fn update(&self, f: impl FnOnce(&mut CompositeState)) {
        let _ = self.try_update(|state| {
            f(state);
            Ok::<_, MosaicRuntimeError>(())
        });
    }

    /// Discard all composite state and fetch every slice of the configuration.
    ///
    /// Fetches still in flight from an earlier load are aborted, and any completion they
    /// already queued is rejected as stale. Returns the new load generation.
    pub fn load(&mut self) -> u64 {
        for task in self.tasks.drain(..) {
            task.abort();
        }

        let generation = self.generation() + 1;
        let expected = self
            .config
            .slices
            .iter()
            .map(|d| d.slice_id)
            .collect::<HashSet<_>>()
            .len();
        let grain = *self.deriver.grain();
        self.update(|state| {
            *state = CompositeState {
                generation,
                expected,
                time_window: TimeWindow::disabled(grain),
                viewport: state.viewport,
                ..Default::default()
            }
        });
        tracing::debug!(generation, slices = expected, "loading composite");

        for descriptor in &self.config.slices {
            let query = SliceQuery::new(descriptor, &self.config);
            let fetcher = self.fetcher.clone();
            let tx = self.completions_tx.clone();
            self.tasks.push(tokio::spawn(async move {
                let result = fetcher.fetch(&query).await;
                // The receiver only goes away with the compositor
                let _ = tx.send(SliceCompletion {
                    generation,
                    query,
                    result,
                });
            }));
        }
        generation
    }

    /// Replace the configuration. A changed slice list reloads from scratch, any other change
    /// keeps the loaded slices and only re-derives the playback window. Returns whether a
    /// reload was started.
    pub fn reconfigure(&mut self, config: CompositeConfig) -> Result<bool, MosaicRuntimeError> {
        let reload = config.slices != self.config.slices;
        let deriver = TimeWindowDeriver::new(Some(config.time_grain()), self.deriver.options())?;
        let regrain = deriver != self.deriver;
        self.config = config;
        self.deriver = deriver;

        if reload {
            self.load();
        } else if regrain {
            self.update(|state| self.rederive_window(state));
        }
        Ok(reload)
    }

    /// Merge one completion into the composite state.
    ///
    /// Fetch failures are recorded and logged, the slice is never shown. Completions from an
    /// earlier load are rejected with [`MosaicRuntimeError::StaleGeneration`].
    pub fn apply(&mut self, completion: SliceCompletion) -> Result<SliceId, MosaicRuntimeError> {
        let slice_id = completion.query.slice_id();
        let current = self.generation();
        if completion.generation != current {
            return Err(MosaicRuntimeError::StaleGeneration {
                slice_id,
                generation: completion.generation,
                current,
            });
        }

        match completion.result {
            Err(source) => {
                tracing::warn!(
                    "{}",
                    MosaicRuntimeError::Fetch {
                        slice_id,
                        source: source.clone()
                    }
                );
                self.update(|state| {
                    state.slices.insert(slice_id, SliceState::Failed(source));
                });
            }
            Ok(payload) => {
                let slice = self.resolve(completion.query, payload);
                let categories = self.slice_categories(&slice);
                self.update(|state| {
                    state.slices.insert(slice_id, SliceState::Resolved(slice));
                    state.legends.update(slice_id, categories);
                    self.rederive_window(state);
                });
                tracing::debug!(%slice_id, "merged slice");
            }
        }
        Ok(slice_id)
    }

    fn resolve(&self, query: SliceQuery, payload: SlicePayload) -> ResolvedSlice {
        let form_data = query.form_data();
        let clusters = if form_data.viz_type == VizKind::Text && form_data.clusterize {
            match ClusterIndex::build(payload.features(), ClusterOptions::from(form_data)) {
                Ok(index) => Some(Arc::new(index)),
                Err(err) => {
                    tracing::warn!(slice_id = %query.slice_id(), "cluster index failed: {err}");
                    None
                }
            }
        } else {
            None
        };
        ResolvedSlice {
            query,
            payload: Arc::new(payload),
            clusters,
        }
    }

    fn slice_categories(&self, slice: &ResolvedSlice) -> CategorySet {
        let form_data = slice.query.form_data();
        self.engine
            .categories(form_data.viz_type, slice.features(), form_data)
            .unwrap_or_else(|err| {
                tracing::warn!(slice_id = %slice.query.slice_id(), "categories failed: {err}");
                CategorySet::new()
            })
    }

    fn rederive_window(&self, state: &mut CompositeState) {
        let window = self.deriver.derive(state.timestamps()).unwrap_or_else(|err| {
            tracing::warn!("time window failed: {err}");
            TimeWindow::disabled(*self.deriver.grain())
        });
        state.values = window.values;
        state.time_window = window;
    }

    /// Wait for the next fetch to settle and merge it
    pub async fn next_completion(&mut self) -> Result<SliceId, MosaicRuntimeError> {
        let completion = self
            .completions_rx
            .recv()
            .await
            .ok_or(MosaicRuntimeError::ChannelClosed)?;
        self.apply(completion)
    }

    /// Merge every completion that has already arrived, without waiting
    pub fn apply_pending(&mut self) -> Vec<Result<SliceId, MosaicRuntimeError>> {
        let mut applied = vec![];
        while let Ok(completion) = self.completions_rx.try_recv() {
            applied.push(self.apply(completion));
        }
        applied
    }

    /// Merge completions until every slice of the current load has settled.
    ///
    /// Stale completions are logged and dropped. A fetch that never settles keeps this
    /// waiting, callers wanting a deadline should wrap it in a timeout.
    pub async fn wait_ready(&mut self) -> Result<Arc<CompositeState>, MosaicRuntimeError> {
        while !self.is_ready() {
            match self.next_completion().await {
                Ok(_) => {}
                Err(err @ MosaicRuntimeError::StaleGeneration { .. }) => {
                    tracing::warn!("{err}, dropping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(self.state())
    }

    /// Select the playback range, returning the resolved `[low, high]`
    pub fn set_playback(&mut self, input: PlaybackInput) -> Result<[i64; 2], MosaicRuntimeError> {
        self.try_update(|state| {
            let values = state.time_window.resolve(input)?;
            state.values = values;
            Ok(values)
        })
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.update(|state| state.viewport = viewport);
    }

    pub fn select(&mut self, item: SelectedItem) {
        self.update(|state| state.selected = Some(item));
    }

    pub fn remove_marker(&mut self) {
        self.update(|state| state.selected = None);
    }

    pub fn toggle_category(&mut self, slice_id: SliceId, key: &str) -> Result<(), MosaicRuntimeError> {
        self.try_update(|state| Ok(state.legends.toggle(slice_id, key)?))
    }

    pub fn isolate_category(&mut self, slice_id: SliceId, key: &str) -> Result<(), MosaicRuntimeError> {
        self.try_update(|state| Ok(state.legends.isolate(slice_id, key)?))
    }

    /// Layers of every resolved slice in resolution order, followed by the selection marker.
    ///
    /// Point slices are filtered with `values`, or the current playback range when `None`.
    /// A slice whose layer cannot be generated is left out.
    pub fn get_layers(&self, values: Option<[i64; 2]>) -> Vec<RenderLayer<G::Layer>> {
        let state = self.state();
        let values = values.unwrap_or(state.values);
        let pipeline = FeatureFilterPipeline::new(&self.engine, self.mutator.as_ref());

        let mut layers = Vec::with_capacity(state.slices.len() + 1);
        for (slice_id, slice) in state.resolved() {
            let form_data = slice.query.form_data();
            let kind = form_data.viz_type;

            let filtered_payload;
            let mut labels = None;
            let payload = if kind.is_point_kind() {
                let filtered = match pipeline.filter(
                    form_data,
                    slice.features(),
                    &state.time_window,
                    values,
                    state.legends.get(slice_id),
                ) {
                    Ok(filtered) => filtered,
                    Err(err) => {
                        tracing::warn!(%slice_id, "filter failed, skipping layer: {err}");
                        continue;
                    }
                };
                filtered_payload = slice.payload.with_features(filtered.features);
                if let Some(index) = &slice.clusters {
                    labels = self.text_labels(slice, index, form_data, &filtered_payload, &state.viewport);
                }
                &filtered_payload
            } else {
                slice.payload.as_ref()
            };

            let request = LayerRequest {
                slice_id,
                kind,
                form_data,
                payload,
                labels: labels.as_deref(),
                viewport: &state.viewport,
            };
            match self.generator.generate(&request) {
                Ok(layer) => layers.push(RenderLayer::Slice { slice_id, layer }),
                Err(source) => {
                    tracing::warn!("{}", MosaicRuntimeError::Layer { slice_id, source });
                }
            }
        }

        if let Some(item) = &state.selected {
            layers.push(RenderLayer::Marker(SelectionMarker::from(item)));
        }
        layers
    }

    fn text_labels(
        &self,
        slice: &ResolvedSlice,
        index: &ClusterIndex,
        form_data: &FormData,
        filtered: &SlicePayload,
        viewport: &Viewport,
    ) -> Option<Vec<TextLabel>> {
        let zoom = zoom_level(viewport.zoom);
        // filters only ever remove features, so an unchanged count means an unchanged set
        if !form_data.has_mutator() && filtered.features().len() == slice.features().len() {
            return Some(plan_labels(index, form_data, zoom));
        }
        match ClusterIndex::build(filtered.features(), ClusterOptions::from(form_data)) {
            Ok(index) => Some(plan_labels(&index, form_data, zoom)),
            Err(err) => {
                tracing::warn!(slice_id = %slice.query.slice_id(), "cluster index failed: {err}");
                None
            }
        }
    }

    /// Legends of the resolved slices that have categories.
    ///
    /// With several slices the legends are inline and titled `"<slice name> (<label>)"`,
    /// a lone slice's legend is anchored at its configured position. A slice whose legend
    /// settings are invalid is left out.
    pub fn legends(&self) -> Vec<SliceLegend> {
        let state = self.state();
        let inline = state.resolved().count() > 1;

        let mut legends = vec![];
        for (slice_id, categories) in state.legends.iter() {
            let Some(slice) = state.resolved_slice(slice_id) else {
                continue;
            };
            match slice_legend(slice, categories, inline) {
                Ok(Some(legend)) => legends.push(SliceLegend { slice_id, legend }),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%slice_id, "legend failed, skipping: {err}");
                }
            }
        }
        legends
    }
}

fn slice_legend(
    slice: &ResolvedSlice,
    categories: &CategorySet,
    inline: bool,
) -> Result<Option<Legend>, MosaicGuidesError> {
    let descriptor = slice.query.descriptor();
    let form_data = &descriptor.form_data;
    let title = match form_data.legend_label() {
        Some(label) => format!("{} ({label})", descriptor.slice_name),
        None => descriptor.slice_name.clone(),
    };
    let config = LegendConfig::new()
        .title(title)
        .position(LegendPosition::parse(form_data.legend_position.as_deref())?)
        .format(form_data.legend_format.clone())
        .inline(inline);
    make_legend(categories, &config)
}

impl<G: LayerGenerator> Drop for MultiSliceCompositor<G> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
