// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// A resizable byte reservation charged to a tracker for as long as it lives.
///
/// Result holders keep one of these and resize it whenever their slot arena
/// grows or is trimmed.
#[derive(Debug)]
pub struct TrackedReservation {
    bytes: i64,
    tracker: Arc<MemTracker>,
}

impl TrackedReservation {
    pub fn new(tracker: Arc<MemTracker>) -> Self {
        Self { bytes: 0, tracker }
    }

    pub fn bytes(&self) -> i64 {
        self.bytes
    }

    pub fn resize(&mut self, bytes: usize) {
        let bytes = i64::try_from(bytes).unwrap_or(i64::MAX);
        if bytes > self.bytes {
            self.tracker.consume(bytes - self.bytes);
        } else if bytes < self.bytes {
            self.tracker.release(self.bytes - bytes);
        }
        self.bytes = bytes;
    }

    pub fn tracker(&self) -> &Arc<MemTracker> {
        &self.tracker
    }
}

impl Drop for TrackedReservation {
    fn drop(&mut self) {
        self.tracker.release(self.bytes);
    }
}

/// Tracks logical memory usage for a component and its ancestors.
///
/// Only bytes explicitly reported by callers are counted; this is not RSS.
#[derive(Debug)]
pub struct MemTracker {
    label: String,
    parent: Option<Arc<MemTracker>>,
    current: AtomicI64,
    peak: AtomicI64,
}

impl MemTracker {
    pub fn new_root(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            parent: None,
            current: AtomicI64::new(0),
            peak: AtomicI64::new(0),
        })
    }

    pub fn new_child(label: impl Into<String>, parent: &Arc<MemTracker>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            parent: Some(Arc::clone(parent)),
            current: AtomicI64::new(0),
            peak: AtomicI64::new(0),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn current(&self) -> i64 {
        self.current.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> i64 {
        self.peak.load(Ordering::Relaxed)
    }

    /// Increase consumption for this tracker and all ancestors.
    pub fn consume(&self, bytes: i64) {
        if bytes <= 0 {
            return;
        }
        let mut tracker: Option<&MemTracker> = Some(self);
        while let Some(current) = tracker {
            let new_value = current.current.fetch_add(bytes, Ordering::AcqRel) + bytes;
            current.update_peak(new_value);
            tracker = current.parent.as_deref();
        }
    }

    /// Decrease consumption for this tracker and all ancestors.
    pub fn release(&self, bytes: i64) {
        if bytes <= 0 {
            return;
        }
        let mut tracker: Option<&MemTracker> = Some(self);
        while let Some(current) = tracker {
            current.current.fetch_sub(bytes, Ordering::AcqRel);
            tracker = current.parent.as_deref();
        }
    }

    fn update_peak(&self, value: i64) {
        let mut prev = self.peak.load(Ordering::Relaxed);
        while value > prev {
            match self
                .peak
                .compare_exchange(prev, value, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemTracker, TrackedReservation};

    #[test]
    fn reservation_resize_propagates_to_parent() {
        let root = MemTracker::new_root("query");
        let child = MemTracker::new_child("group_by", &root);
        {
            let mut reservation = TrackedReservation::new(child.clone());
            reservation.resize(128);
            assert_eq!(child.current(), 128);
            assert_eq!(root.current(), 128);
            reservation.resize(32);
            assert_eq!(root.current(), 32);
            assert_eq!(root.peak(), 128);
        }
        assert_eq!(child.current(), 0);
        assert_eq!(root.current(), 0);
    }
}
