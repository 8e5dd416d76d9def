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
//! Accumulator storage owned by one worker for one function application.
//!
//! A [`GroupByResultHolder`] keeps live groups in a slot arena and maps group
//! keys to arena slots through a directory indexed directly by key. The arena
//! grows by doubling up to `max_capacity`. When a new key arrives at full
//! capacity, a comparable function keeps the best `trim_size` groups (ties go to
//! the smaller key) and an evicted key that shows up again starts over from the
//! identity state. Non-comparable functions fail instead.

use std::cell::Cell;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::common::error::{AggError, AggResult};
use crate::novarocks_logging::{debug, warn};
use crate::runtime::mem_tracker::{MemTracker, TrackedReservation};

use super::functions::AggregateFunction;
use super::{AggInputView, AggSpec, IntermediateResult, RowTarget};

const NO_SLOT: u32 = u32::MAX;

fn ensure_accumulating(extracted: &Cell<bool>) -> AggResult<()> {
    if extracted.get() {
        return Err(AggError::contract(
            "result holder already extracted; accumulation has ended",
        ));
    }
    Ok(())
}

/// Single accumulator slot for whole-table aggregation.
#[derive(Debug)]
pub struct AggregationResultHolder {
    slot: [IntermediateResult; 1],
    extracted: Cell<bool>,
}

impl AggregationResultHolder {
    pub(super) fn new(identity: IntermediateResult) -> Self {
        Self {
            slot: [identity],
            extracted: Cell::new(false),
        }
    }

    /// Current state without ending the accumulation phase.
    pub fn peek(&self) -> &IntermediateResult {
        &self.slot[0]
    }

    pub fn is_extracted(&self) -> bool {
        self.extracted.get()
    }

    pub(super) fn accumulate(
        &mut self,
        function: &dyn AggregateFunction,
        spec: &AggSpec,
        input: &AggInputView,
        length: usize,
    ) -> AggResult<()> {
        ensure_accumulating(&self.extracted)?;
        let targets: Vec<RowTarget> = (0..length).map(|row| RowTarget { row, slot: 0 }).collect();
        function.update_batch(spec, &mut self.slot, &targets, input)
    }

    pub(super) fn extract(&self) -> IntermediateResult {
        self.extracted.set(true);
        self.slot[0].clone()
    }
}

/// Dense group key to accumulator mapping with bounded capacity.
#[derive(Debug)]
pub struct GroupByResultHolder {
    initial_capacity: usize,
    max_capacity: usize,
    trim_size: usize,
    capacity: usize,
    slots: Vec<IntermediateResult>,
    slot_keys: Vec<u32>,
    directory: Vec<u32>,
    identity: IntermediateResult,
    num_trims: usize,
    extracted: Cell<bool>,
    reservation: Option<TrackedReservation>,
}

impl GroupByResultHolder {
    pub(super) fn new(
        identity: IntermediateResult,
        initial_capacity: usize,
        max_capacity: usize,
        trim_size: usize,
    ) -> AggResult<Self> {
        if max_capacity == 0 {
            return Err(AggError::contract("group-by max capacity must be positive"));
        }
        if max_capacity >= NO_SLOT as usize {
            return Err(AggError::contract(format!(
                "group-by max capacity {max_capacity} exceeds {}",
                NO_SLOT - 1
            )));
        }
        if initial_capacity > max_capacity {
            return Err(AggError::contract(format!(
                "group-by initial capacity {initial_capacity} exceeds max capacity {max_capacity}"
            )));
        }
        if trim_size > max_capacity {
            return Err(AggError::contract(format!(
                "group-by trim size {trim_size} exceeds max capacity {max_capacity}"
            )));
        }
        let capacity = initial_capacity.max(1);
        Ok(Self {
            initial_capacity,
            max_capacity,
            trim_size,
            capacity,
            slots: Vec::with_capacity(capacity),
            slot_keys: Vec::with_capacity(capacity),
            directory: Vec::new(),
            identity,
            num_trims: 0,
            extracted: Cell::new(false),
            reservation: None,
        })
    }

    /// Charges the arena and key directory to `tracker` from now on.
    pub fn with_mem_tracker(mut self, tracker: Arc<MemTracker>) -> Self {
        let mut reservation = TrackedReservation::new(tracker);
        reservation.resize(self.estimated_bytes());
        self.reservation = Some(reservation);
        self
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Slots currently allocated in the arena; never above `max_capacity`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub fn trim_size(&self) -> usize {
        self.trim_size
    }

    pub fn num_groups(&self) -> usize {
        self.slots.len()
    }

    pub fn num_trims(&self) -> usize {
        self.num_trims
    }

    pub fn is_extracted(&self) -> bool {
        self.extracted.get()
    }

    pub fn contains_key(&self, key: u32) -> bool {
        self.slot_of(key).is_some()
    }

    /// Live group keys, ascending.
    pub fn group_keys(&self) -> Vec<u32> {
        let mut keys = self.slot_keys.clone();
        keys.sort_unstable();
        keys
    }

    /// State of `key` without ending the accumulation phase; identity when the
    /// key has no live group.
    pub fn peek(&self, key: u32) -> &IntermediateResult {
        match self.slot_of(key) {
            Some(slot) => &self.slots[slot],
            None => &self.identity,
        }
    }

    pub(super) fn extract(&self, key: u32) -> IntermediateResult {
        self.extracted.set(true);
        self.peek(key).clone()
    }

    fn slot_of(&self, key: u32) -> Option<usize> {
        match self.directory.get(key as usize) {
            Some(&slot) if slot != NO_SLOT => Some(slot as usize),
            _ => None,
        }
    }

    fn estimated_bytes(&self) -> usize {
        let arena = (self.capacity - self.slots.len())
            * std::mem::size_of::<IntermediateResult>()
            + self.slots.iter().map(|s| s.estimated_bytes()).sum::<usize>();
        arena
            + self.slot_keys.capacity() * std::mem::size_of::<u32>()
            + self.directory.capacity() * std::mem::size_of::<u32>()
    }

    fn update_reservation(&mut self) {
        if self.reservation.is_none() {
            return;
        }
        let bytes = self.estimated_bytes();
        if let Some(reservation) = self.reservation.as_mut() {
            reservation.resize(bytes);
        }
    }

    /// Folds `(row, key)` pairs into their groups. A row listed under several
    /// keys contributes to each of them.
    pub(super) fn accumulate(
        &mut self,
        function: &dyn AggregateFunction,
        spec: &AggSpec,
        input: &AggInputView,
        rows: impl IntoIterator<Item = (usize, u32)>,
    ) -> AggResult<()> {
        ensure_accumulating(&self.extracted)?;
        let mut targets = Vec::new();
        for (row, key) in rows {
            if key == NO_SLOT {
                return Err(AggError::contract(format!("group key {key} out of range")));
            }
            let slot = match self.slot_of(key) {
                Some(slot) => slot,
                None => {
                    if self.slots.len() == self.max_capacity {
                        // trimming compacts slot indices, so settle what is pending first
                        function.update_batch(spec, &mut self.slots, &targets, input)?;
                        targets.clear();
                        self.trim(function, spec)?;
                    }
                    self.insert_group(key)
                }
            };
            targets.push(RowTarget { row, slot });
        }
        function.update_batch(spec, &mut self.slots, &targets, input)
    }

    fn insert_group(&mut self, key: u32) -> usize {
        let key_idx = key as usize;
        if key_idx >= self.directory.len() {
            let new_len = (key_idx + 1)
                .max(self.directory.len() * 2)
                .max(self.initial_capacity);
            self.directory.resize(new_len, NO_SLOT);
        }
        if self.slots.len() == self.capacity {
            self.grow();
        }
        let slot = self.slots.len();
        self.slots.push(self.identity.clone());
        self.slot_keys.push(key);
        self.directory[key_idx] = slot as u32;
        slot
    }

    fn grow(&mut self) {
        let new_capacity = (self.capacity * 2).min(self.max_capacity);
        self.slots.reserve_exact(new_capacity - self.slots.len());
        self.slot_keys.reserve_exact(new_capacity - self.slot_keys.len());
        debug!(
            "group-by holder grows from {} to {} slots",
            self.capacity, new_capacity
        );
        self.capacity = new_capacity;
        self.update_reservation();
    }

    /// Keeps the best groups and frees the rest. At least one slot is always
    /// freed so the incoming key fits.
    fn trim(&mut self, function: &dyn AggregateFunction, spec: &AggSpec) -> AggResult<()> {
        if !function.is_comparable() {
            warn!(
                "group-by holder for {} is full at {} groups and cannot be trimmed",
                spec.name(),
                self.slots.len()
            );
            return Err(AggError::CapacityExceeded {
                function: spec.name(),
                live_groups: self.slots.len(),
                max_capacity: self.max_capacity,
            });
        }

        let live = self.slots.len();
        let keep = self.trim_size.min(live.saturating_sub(1));
        let mut order: Vec<usize> = (0..live).collect();
        let mut compare_err: Option<AggError> = None;
        {
            let slots = &self.slots;
            let slot_keys = &self.slot_keys;
            let mut rank = |a: &usize, b: &usize| -> Ordering {
                // better groups first, then smaller keys
                match function.compare(spec, &slots[*b], &slots[*a]) {
                    Ok(ord) => ord.then_with(|| slot_keys[*a].cmp(&slot_keys[*b])),
                    Err(err) => {
                        compare_err.get_or_insert(err);
                        Ordering::Equal
                    }
                }
            };
            if keep > 0 {
                order.select_nth_unstable_by(keep - 1, &mut rank);
            }
        }
        if let Some(err) = compare_err {
            return Err(err);
        }

        let mut retain = vec![false; live];
        for &idx in &order[..keep] {
            retain[idx] = true;
        }
        let old_slots = std::mem::replace(&mut self.slots, Vec::with_capacity(self.capacity));
        let old_keys = std::mem::replace(&mut self.slot_keys, Vec::with_capacity(self.capacity));
        for ((slot, key), keep_it) in old_slots.into_iter().zip(old_keys).zip(retain) {
            if keep_it {
                self.directory[key as usize] = self.slots.len() as u32;
                self.slots.push(slot);
                self.slot_keys.push(key);
            } else {
                self.directory[key as usize] = NO_SLOT;
            }
        }
        self.num_trims += 1;
        debug!(
            "trimmed group-by holder for {} from {} to {} groups (trim #{})",
            spec.name(),
            live,
            self.slots.len(),
            self.num_trims
        );
        self.update_reservation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array};

    use super::*;
    use crate::exec::expr::agg::{AggregationFunctionType, ValueBatch};
    use crate::exec::expr::agg::functions::resolve_by_type;

    fn run(
        holder: &mut GroupByResultHolder,
        spec: &AggSpec,
        values: &[i64],
        keys: &[u32],
    ) -> AggResult<()> {
        let function = resolve_by_type(spec.kind);
        let batch = ValueBatch::new(Arc::new(Int64Array::from(values.to_vec())) as ArrayRef);
        let input = function.build_input_view(spec, Some(&batch))?;
        holder.accumulate(function, spec, &input, keys.iter().copied().enumerate())
    }

    fn holder(spec: &AggSpec, initial: usize, max: usize, trim: usize) -> GroupByResultHolder {
        let identity = resolve_by_type(spec.kind).identity(spec).expect("identity");
        GroupByResultHolder::new(identity, initial, max, trim).expect("holder")
    }

    #[test]
    fn rejects_inconsistent_capacities() {
        let identity = IntermediateResult::Double(0.0);
        assert!(GroupByResultHolder::new(identity.clone(), 8, 4, 2).is_err());
        assert!(GroupByResultHolder::new(identity.clone(), 2, 4, 5).is_err());
        assert!(GroupByResultHolder::new(identity, 0, 0, 0).is_err());
    }

    #[test]
    fn growth_keeps_existing_groups() {
        let spec = AggSpec::new(AggregationFunctionType::Sum);
        let mut h = holder(&spec, 2, 64, 8);
        run(&mut h, &spec, &[1, 2], &[0, 1]).expect("first");
        let before = h.peek(1).clone();
        run(&mut h, &spec, &[5, 6, 7, 8], &[2, 3, 4, 5]).expect("second");
        assert!(h.capacity() >= 6);
        assert_eq!(h.peek(1), &before);
        assert_eq!(h.num_trims(), 0);
        assert_eq!(h.group_keys(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn trim_keeps_best_groups_with_key_tie_break() {
        let spec = AggSpec::new(AggregationFunctionType::Max);
        let mut h = holder(&spec, 2, 4, 2);
        // keys 0..4 fill the arena; 1 and 2 tie at 9, key 3 has 7
        run(&mut h, &spec, &[1, 9, 9, 7], &[0, 1, 2, 3]).expect("fill");
        run(&mut h, &spec, &[3], &[4]).expect("trim");
        assert_eq!(h.num_trims(), 1);
        assert_eq!(h.group_keys(), vec![1, 2, 4]);
        assert_eq!(h.peek(0), &IntermediateResult::Double(f64::NEG_INFINITY));
    }

    #[test]
    fn evicted_key_restarts_from_identity() {
        let spec = AggSpec::new(AggregationFunctionType::Sum);
        let mut h = holder(&spec, 1, 2, 1);
        run(&mut h, &spec, &[10, 1, 5], &[0, 1, 2]).expect("run");
        // key 1 lost to key 0 when key 2 arrived
        assert_eq!(h.group_keys(), vec![0, 2]);
        run(&mut h, &spec, &[4], &[1]).expect("rerun");
        assert_eq!(h.peek(1), &IntermediateResult::Double(4.0));
    }

    #[test]
    fn non_comparable_function_fails_at_capacity() {
        let spec = AggSpec::new(AggregationFunctionType::DistinctCount);
        let mut h = holder(&spec, 2, 2, 1);
        let err = run(&mut h, &spec, &[1, 2, 3], &[0, 1, 2]).expect_err("capacity");
        assert!(matches!(
            err,
            AggError::CapacityExceeded {
                live_groups: 2,
                max_capacity: 2,
                ..
            }
        ));
    }

    #[test]
    fn accumulate_after_extract_is_rejected() {
        let spec = AggSpec::new(AggregationFunctionType::Count);
        let mut h = holder(&spec, 4, 4, 1);
        run(&mut h, &spec, &[1], &[0]).expect("run");
        assert_eq!(h.extract(0), IntermediateResult::Long(1));
        assert_eq!(h.extract(3), IntermediateResult::Long(0));
        assert!(matches!(
            run(&mut h, &spec, &[1], &[0]),
            Err(AggError::ContractViolation(_))
        ));
    }

    #[test]
    fn reservation_follows_growth_and_drop() {
        let tracker = MemTracker::new_root("group_by");
        let spec = AggSpec::new(AggregationFunctionType::Sum);
        {
            let mut h = holder(&spec, 1, 16, 4).with_mem_tracker(tracker.clone());
            let initial = tracker.current();
            assert!(initial > 0);
            run(&mut h, &spec, &[1; 8], &[0, 1, 2, 3, 4, 5, 6, 7]).expect("run");
            assert!(tracker.current() > initial);
        }
        assert_eq!(tracker.current(), 0);
    }
}
