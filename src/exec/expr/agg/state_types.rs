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
use std::cmp::Ordering;

use hashbrown::HashSet;

use crate::common::types::ColumnDataType;

use super::HyperLogLog;

/// Per-partition partial aggregate, one payload shape per function family.
///
/// Holders accumulate directly into these values, so extraction is a clone.
#[derive(Clone, Debug, PartialEq)]
pub enum IntermediateResult {
    Long(i64),
    Double(f64),
    AvgPair(AvgPair),
    MinMaxRange(MinMaxRangePair),
    DistinctSet(DistinctSet),
    Hll(HyperLogLog),
    ValueList(ValueList),
}

impl IntermediateResult {
    pub fn variant_name(&self) -> &'static str {
        match self {
            IntermediateResult::Long(_) => "Long",
            IntermediateResult::Double(_) => "Double",
            IntermediateResult::AvgPair(_) => "AvgPair",
            IntermediateResult::MinMaxRange(_) => "MinMaxRange",
            IntermediateResult::DistinctSet(_) => "DistinctSet",
            IntermediateResult::Hll(_) => "Hll",
            IntermediateResult::ValueList(_) => "ValueList",
        }
    }

    pub fn column_type(&self) -> ColumnDataType {
        match self {
            IntermediateResult::Long(_) => ColumnDataType::Long,
            IntermediateResult::Double(_) => ColumnDataType::Double,
            _ => ColumnDataType::Object,
        }
    }

    /// Rough heap + inline footprint, used for memory accounting only.
    pub(crate) fn estimated_bytes(&self) -> usize {
        let inline = std::mem::size_of::<IntermediateResult>();
        inline
            + match self {
                IntermediateResult::DistinctSet(set) => {
                    set.len() * std::mem::size_of::<DistinctKey>()
                }
                IntermediateResult::Hll(hll) => hll.registers().len(),
                IntermediateResult::ValueList(list) => list.len() * std::mem::size_of::<f64>(),
                _ => 0,
            }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AvgPair {
    pub sum: f64,
    pub count: i64,
}

impl AvgPair {
    pub fn new(sum: f64, count: i64) -> Self {
        Self { sum, count }
    }

    pub fn apply(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &AvgPair) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Running min and max; `min > max` marks the empty pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxRangePair {
    pub min: f64,
    pub max: f64,
}

impl Default for MinMaxRangePair {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MinMaxRangePair {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn apply(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn merge(&mut self, other: &MinMaxRangePair) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn range(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.max - self.min)
    }
}

/// Hashable identity of one distinct value. Integers keep their exact value and
/// floats compare by bit pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistinctKey {
    Long(i64),
    Double(u64),
    Utf8(String),
}

impl DistinctKey {
    pub fn from_f64(v: f64) -> Self {
        // fold -0.0 into 0.0 so both count once
        let v = if v == 0.0 { 0.0 } else { v };
        DistinctKey::Double(v.to_bits())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistinctSet {
    values: HashSet<DistinctKey>,
}

impl DistinctSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: DistinctKey) -> bool {
        self.values.insert(key)
    }

    pub fn union_with(&mut self, other: &DistinctSet) {
        self.values.extend(other.values.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &DistinctKey) -> bool {
        self.values.contains(key)
    }

    /// Keys in ascending order, for deterministic encoding.
    pub fn sorted_keys(&self) -> Vec<&DistinctKey> {
        let mut keys: Vec<&DistinctKey> = self.values.iter().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<DistinctKey> for DistinctSet {
    fn from_iter<T: IntoIterator<Item = DistinctKey>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Unordered multiset of raw values kept for exact percentiles.
///
/// Equality ignores insertion order so merged lists compare equal regardless of
/// the merge order that produced them.
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    values: Vec<f64>,
}

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn extend_from(&mut self, other: &ValueList) {
        self.values.extend_from_slice(&other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sorted_values(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }

    /// Value at `floor(len * percentile / 100)` of the sorted list, clamped to the
    /// last element.
    pub fn percentile(&self, percentile: u8) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sorted = self.sorted_values();
        let idx = sorted.len() * usize::from(percentile) / 100;
        Some(sorted[idx.min(sorted.len() - 1)])
    }
}

impl PartialEq for ValueList {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .sorted_values()
                .iter()
                .zip(other.sorted_values().iter())
                .all(|(l, r)| l.total_cmp(r) == Ordering::Equal)
    }
}
