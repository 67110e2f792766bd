//! Fixed-capacity rolling time series feeding the live graphs.
//!
//! The buffer keeps one bounded sequence per channel plus a time axis. Every sequence
//! shares the same logical index: entry `i` of each channel belongs to the `i`-th
//! accepted sample still retained. When full, an append evicts the oldest entry of every
//! sequence at once, so alignment survives eviction.
//!
//! # Absent channels
//!
//! A sample missing a channel repeats that channel's last known value ("carry forward").
//! Until a channel has been observed at least once since the last [`RollingBuffer::clear`],
//! its entries are `None`.
//!
//! # Ownership
//!
//! Only the pump mutates the buffer. Consumers receive a [`BufferView`], an owned copy
//! taken by [`RollingBuffer::snapshot`], so a slow renderer never observes a half-applied
//! append.

use crate::telemetry::{Channel, Readings, Sample};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of samples retained.
pub const DEFAULT_CAPACITY: usize = 500;

/// Bounded per-channel FIFO of accepted samples.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    capacity: usize,
    time: VecDeque<f64>,
    channels: [VecDeque<Option<f64>>; 5],
    last_known: Readings,
}

impl RollingBuffer {
    /// Create an empty buffer holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            time: VecDeque::with_capacity(capacity),
            channels: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
            last_known: Readings::default(),
        }
    }

    /// Append a sample, evicting the oldest entry when full.
    pub fn append(&mut self, sample: &Sample) {
        if self.time.len() == self.capacity {
            self.time.pop_front();
            for series in &mut self.channels {
                series.pop_front();
            }
        }

        self.time.push_back(sample.timestamp());
        for channel in Channel::ALL {
            if let Some(value) = sample.value(channel) {
                self.last_known.set(channel, Some(value));
            }
            self.channels[channel.index()].push_back(self.last_known.get(channel));
        }
    }

    /// Drop every entry and forget carried-forward values.
    pub fn clear(&mut self) {
        self.time.clear();
        for series in &mut self.channels {
            series.clear();
        }
        self.last_known = Readings::default();
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// True when nothing has been appended since the last clear.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent carried-forward values (what the numeric displays show).
    pub fn latest(&self) -> Option<Readings> {
        if self.is_empty() {
            return None;
        }
        Some(self.last_known)
    }

    /// Owned point-in-time copy of every sequence.
    pub fn snapshot(&self) -> BufferView {
        BufferView {
            time: self.time.iter().copied().collect(),
            channels: std::array::from_fn(|i| self.channels[i].iter().copied().collect()),
        }
    }
}

impl Default for RollingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Immutable copy of the rolling buffer handed to display consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BufferView {
    time: Vec<f64>,
    channels: [Vec<Option<f64>>; 5],
}

impl BufferView {
    /// Number of samples in the view.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// True when the view holds no samples.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Timestamps (seconds since connect), oldest first.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Values of one channel, index-aligned with [`BufferView::time`].
    pub fn channel(&self, channel: Channel) -> &[Option<f64>] {
        &self.channels[channel.index()]
    }

    /// `(time, value)` points for graphing, skipping entries with no value yet.
    pub fn series(&self, channel: Channel) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time
            .iter()
            .zip(self.channel(channel))
            .filter_map(|(t, v)| v.map(|v| (*t, v)))
    }

    /// Minimum and maximum of a channel, for axis scaling.
    pub fn range(&self, channel: Channel) -> Option<(f64, f64)> {
        self.series(channel).fold(None, |acc, (_, v)| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}
