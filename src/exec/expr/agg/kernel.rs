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

use crate::common::config;
use crate::common::error::{AggError, AggResult};
use crate::common::types::ColumnDataType;
use crate::novarocks_logging::debug;

use super::functions::{self, AggregateFunction};
use super::*;

/// One accumulate step: fold `row` of the input into holder slot `slot`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowTarget {
    pub row: usize,
    pub slot: usize,
}

/// A configured aggregation function: the entry point for accumulating into
/// holders, merging partition results and projecting final values.
///
/// Cheap to copy; workers each take their own copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AggregationFunction {
    spec: AggSpec,
}

impl AggregationFunction {
    pub fn new(spec: AggSpec) -> Self {
        Self { spec }
    }

    pub fn from_type(kind: AggregationFunctionType) -> Self {
        Self::new(AggSpec::new(kind))
    }

    /// Resolves a textual name such as `sum`, `countMV` or `percentile90`.
    pub fn from_name(name: &str) -> AggResult<Self> {
        AggSpec::from_name(name).map(Self::new)
    }

    pub fn spec(&self) -> &AggSpec {
        &self.spec
    }

    pub fn function_type(&self) -> AggregationFunctionType {
        self.spec.kind
    }

    pub fn name(&self) -> String {
        self.spec.name()
    }

    /// Result column label; `count` ignores the column.
    pub fn column_name(&self, column: &str) -> String {
        match self.spec.kind {
            AggregationFunctionType::Count => "count_star".to_string(),
            _ => format!("{}_{}", self.spec.name(), column),
        }
    }

    fn implementation(&self) -> &'static dyn AggregateFunction {
        functions::resolve_by_type(self.spec.kind)
    }

    /// Double dispatch: calls the visitor method for this function's family.
    pub fn accept<V: AggregationFunctionVisitor + ?Sized>(&self, visitor: &mut V) {
        use AggregationFunctionType as T;
        match self.spec.kind {
            T::Count | T::CountMv => visitor.visit_count(self),
            T::Min | T::MinMv => visitor.visit_min(self),
            T::Max | T::MaxMv => visitor.visit_max(self),
            T::Sum | T::SumMv => visitor.visit_sum(self),
            T::Avg | T::AvgMv => visitor.visit_avg(self),
            T::MinMaxRange | T::MinMaxRangeMv => visitor.visit_min_max_range(self),
            T::DistinctCount | T::DistinctCountMv => visitor.visit_distinct_count(self),
            T::DistinctCountHll | T::DistinctCountHllMv => visitor.visit_distinct_count_hll(self),
            T::Percentile | T::PercentileMv => visitor.visit_percentile(self),
        }
    }

    /// State of a holder slot that has seen no rows.
    pub fn identity(&self) -> AggResult<IntermediateResult> {
        self.implementation().identity(&self.spec)
    }

    pub fn create_aggregation_result_holder(&self) -> AggResult<AggregationResultHolder> {
        Ok(AggregationResultHolder::new(self.identity()?))
    }

    pub fn create_group_by_result_holder(
        &self,
        initial_capacity: usize,
        max_capacity: usize,
        trim_size: usize,
    ) -> AggResult<GroupByResultHolder> {
        debug!(
            "create group-by holder for {}: initial={}, max={}, trim={}",
            self.spec.name(),
            initial_capacity,
            max_capacity,
            trim_size
        );
        GroupByResultHolder::new(self.identity()?, initial_capacity, max_capacity, trim_size)
    }

    /// Holder sized from the `[group_by]` config section.
    pub fn create_group_by_result_holder_from_config(&self) -> AggResult<GroupByResultHolder> {
        self.create_group_by_result_holder(
            config::group_by_initial_capacity(),
            config::group_by_max_capacity(),
            config::group_by_trim_size(),
        )
    }

    fn check_batches(&self, length: usize, batches: &[ValueBatch]) -> AggResult<()> {
        for (idx, batch) in batches.iter().enumerate() {
            if batch.len() < length {
                return Err(AggError::contract(format!(
                    "{}: input batch {} has {} rows, expected at least {}",
                    self.spec.name(),
                    idx,
                    batch.len(),
                    length
                )));
            }
        }
        Ok(())
    }

    /// Folds rows `[0, length)` of `batches` into the single holder slot.
    pub fn aggregate(
        &self,
        length: usize,
        holder: &mut AggregationResultHolder,
        batches: &[ValueBatch],
    ) -> AggResult<()> {
        self.check_batches(length, batches)?;
        let function = self.implementation();
        let input = function.build_input_view(&self.spec, batches.first())?;
        holder.accumulate(function, &self.spec, &input, length)
    }

    /// Row `i` folds into the group `group_keys[i]`.
    pub fn aggregate_group_by_sv(
        &self,
        length: usize,
        group_keys: &[u32],
        holder: &mut GroupByResultHolder,
        batches: &[ValueBatch],
    ) -> AggResult<()> {
        if group_keys.len() < length {
            return Err(AggError::contract(format!(
                "{}: {} group keys for {} rows",
                self.spec.name(),
                group_keys.len(),
                length
            )));
        }
        self.check_batches(length, batches)?;
        let function = self.implementation();
        let input = function.build_input_view(&self.spec, batches.first())?;
        holder.accumulate(
            function,
            &self.spec,
            &input,
            group_keys[..length].iter().copied().enumerate(),
        )
    }

    /// Row `i` folds into every group listed in `group_keys[i]`, possibly none.
    /// Each row's keys form a set; a key repeated within one row is rejected.
    pub fn aggregate_group_by_mv<K: AsRef<[u32]>>(
        &self,
        length: usize,
        group_keys: &[K],
        holder: &mut GroupByResultHolder,
        batches: &[ValueBatch],
    ) -> AggResult<()> {
        if group_keys.len() < length {
            return Err(AggError::contract(format!(
                "{}: {} group key sets for {} rows",
                self.spec.name(),
                group_keys.len(),
                length
            )));
        }
        self.check_batches(length, batches)?;
        // validated up front; accumulation mutates the holder in place
        for (row, keys) in group_keys[..length].iter().enumerate() {
            if let Some(key) = first_duplicate_key(keys.as_ref()) {
                return Err(AggError::contract(format!(
                    "{}: group key {} repeated in row {}",
                    self.spec.name(),
                    key,
                    row
                )));
            }
        }
        let function = self.implementation();
        let input = function.build_input_view(&self.spec, batches.first())?;
        let rows = group_keys[..length]
            .iter()
            .enumerate()
            .flat_map(|(row, keys)| keys.as_ref().iter().map(move |&key| (row, key)));
        holder.accumulate(function, &self.spec, &input, rows)
    }

    /// Ends the accumulation phase of `holder` and returns its state.
    pub fn extract_aggregation_result(&self, holder: &AggregationResultHolder) -> IntermediateResult {
        holder.extract()
    }

    /// State of group `key`; identity when the key has no live group.
    pub fn extract_group_by_result(
        &self,
        holder: &GroupByResultHolder,
        key: u32,
    ) -> IntermediateResult {
        holder.extract(key)
    }

    /// Every live group, ascending by key.
    pub fn extract_group_by_results(
        &self,
        holder: &GroupByResultHolder,
    ) -> Vec<(u32, IntermediateResult)> {
        holder
            .group_keys()
            .into_iter()
            .map(|key| (key, holder.extract(key)))
            .collect()
    }

    pub fn merge(
        &self,
        a: &IntermediateResult,
        b: &IntermediateResult,
    ) -> AggResult<IntermediateResult> {
        let mut merged = a.clone();
        self.merge_into(&mut merged, b)?;
        Ok(merged)
    }

    pub fn merge_into(&self, dst: &mut IntermediateResult, src: &IntermediateResult) -> AggResult<()> {
        self.implementation().merge(&self.spec, dst, src)
    }

    pub fn is_intermediate_result_comparable(&self) -> bool {
        self.implementation().is_comparable()
    }

    pub fn compare_intermediate_results(
        &self,
        a: &IntermediateResult,
        b: &IntermediateResult,
    ) -> AggResult<Ordering> {
        self.implementation().compare(&self.spec, a, b)
    }

    pub fn intermediate_result_column_type(&self) -> ColumnDataType {
        self.implementation().intermediate_column_type()
    }

    pub fn final_result_column_type(&self) -> ColumnDataType {
        self.implementation().final_column_type()
    }

    pub fn extract_final_result(&self, intermediate: &IntermediateResult) -> AggResult<FinalResult> {
        self.implementation().extract_final(&self.spec, intermediate)
    }
}

fn first_duplicate_key(keys: &[u32]) -> Option<u32> {
    if keys.len() <= 8 {
        return keys
            .iter()
            .enumerate()
            .find(|&(idx, key)| keys[..idx].contains(key))
            .map(|(_, key)| *key);
    }
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().copied().find(|key| !seen.insert(*key))
}

/// Operation implemented once across all function families. Every method
/// falls back to `visit_default`.
pub trait AggregationFunctionVisitor {
    fn visit_default(&mut self, function: &AggregationFunction);

    fn visit_count(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_min(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_max(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_sum(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_avg(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_min_max_range(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_distinct_count(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_distinct_count_hll(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }

    fn visit_percentile(&mut self, function: &AggregationFunction) {
        self.visit_default(function)
    }
}
