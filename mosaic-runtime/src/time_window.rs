use mosaic_scales::error::MosaicScaleError;
use mosaic_scales::temporal::TimeGrain;
use serde::{Deserialize, Serialize};

/// A playback position: a single instant, or an explicit `[low, high]` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaybackInput {
    Position(i64),
    Range([i64; 2]),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindowOptions {
    /// Snap `start` down and `end` up to grain boundaries
    pub align_to_grain: bool,
}

/// Playback window over the timestamps of every loaded slice.
///
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
    pub grain: TimeGrain,
    /// The initial `[low, high]` playback range
    pub values: [i64; 2],
    /// No slice has temporal data, no playback control should be shown
    pub disabled: bool,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::disabled(TimeGrain::Raw)
    }
}

impl TimeWindow {
    pub fn disabled(grain: TimeGrain) -> Self {
        Self {
            start: 0,
            end: 0,
            grain,
            values: [0, 0],
            disabled: true,
        }
    }

    /// Increment of the playback control at `position`. Calendar grains vary in length
    pub fn step(&self, position: i64) -> Result<i64, MosaicScaleError> {
        self.grain.step_size(position)
    }

    /// The range a playback input selects: one step from a position, or the explicit range.
    /// At the finest grain a position selects just that instant.
    pub fn resolve(&self, input: PlaybackInput) -> Result<[i64; 2], MosaicScaleError> {
        match input {
            PlaybackInput::Range(range) => Ok(range),
            PlaybackInput::Position(v) if self.grain.is_finest() => Ok([v, v]),
            PlaybackInput::Position(v) => Ok([v, self.grain.next(v)?]),
        }
    }

    /// Whether `values` is filtered inclusive of its upper bound.
    ///
    /// Single instants and ranges reaching the end of the window are closed so the last
    /// instant is never dropped, every other range is half-open.
    pub fn is_closed(&self, values: [i64; 2]) -> bool {
        values[0] == values[1] || values[1] == self.end
    }

    pub fn contains(&self, timestamp: i64, values: [i64; 2]) -> bool {
        let [low, high] = values;
        if self.is_closed(values) {
            low <= timestamp && timestamp <= high
        } else {
            low <= timestamp && timestamp < high
        }
    }
}

/// Derives the shared playback window from the timestamps of all slices
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindowDeriver {
    grain: TimeGrain,
    options: TimeWindowOptions,
}

impl TimeWindowDeriver {
    pub fn new(granularity: Option<&str>, options: TimeWindowOptions) -> Result<Self, MosaicScaleError> {
        Ok(Self {
            grain: TimeGrain::parse(granularity)?,
            options,
        })
    }

    pub fn with_options(mut self, options: TimeWindowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> TimeWindowOptions {
        self.options
    }

    pub fn grain(&self) -> &TimeGrain {
        &self.grain
    }

    pub fn derive<I>(&self, timestamps: I) -> Result<TimeWindow, MosaicScaleError>
    where
        I: IntoIterator<Item = i64>,
    {
        let Some((min, max)) = timestamps.into_iter().fold(None, |extent, ts| match extent {
            None => Some((ts, ts)),
            Some((lo, hi)) => Some((i64::min(lo, ts), i64::max(hi, ts))),
        }) else {
            return Ok(TimeWindow::disabled(self.grain));
        };

        let (start, end) = if self.options.align_to_grain {
            (self.grain.floor(min)?, self.grain.ceil(max)?)
        } else {
            (min, max)
        };

        let values = if self.grain.is_finest() {
            [start, start]
        } else {
            [start, self.grain.next(start)?]
        };

        tracing::debug!(start, end, ?values, "derived time window");
        Ok(TimeWindow {
            start,
            end,
            grain: self.grain,
            values,
            disabled: false,
        })
    }
}
