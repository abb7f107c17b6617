use crate::nal::NAL_UNIT_PREFIX;
use bytes::Bytes;
use std::collections::VecDeque;

/// Bounded FIFO of in-band SPS/PPS NAL units, waiting to be written in front of the next frame
#[derive(Debug)]
pub(crate) struct ParameterSetCache {
    sets: VecDeque<Bytes>,
    max_sets: usize,
}

impl ParameterSetCache {
    pub(crate) fn new(max_sets: usize) -> Self {
        let max_sets = max_sets.max(1);

        Self {
            sets: VecDeque::with_capacity(max_sets),
            max_sets,
        }
    }

    /// Store a parameter set, evicting the oldest ones when full
    pub(crate) fn save(&mut self, set: Bytes) {
        if set.is_empty() {
            return;
        }

        while self.sets.len() >= self.max_sets {
            self.sets.pop_front();
            log::debug!("parameter set cache full, evicted oldest set");
        }

        self.sets.push_back(set);
    }

    /// Write all cached sets as Annex B NAL units to `frame`, leaving the cache empty
    pub(crate) fn drain_into(&mut self, frame: &mut Vec<u8>) {
        if self.is_empty() {
            return;
        }

        log::trace!("writing {} in-band parameter sets", self.sets.len());

        for set in self.sets.drain(..) {
            frame.extend_from_slice(&NAL_UNIT_PREFIX);
            frame.extend_from_slice(&set);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.sets.clear();
    }
}
