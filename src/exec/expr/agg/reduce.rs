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
//! Folding of partition results.
//!
//! Dense group keys only mean something inside one partition, so group-by
//! partials are exchanged keyed by the external group value `K`.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::common::error::{AggError, AggResult};

use super::{AggregationFunction, FinalResult, GroupByResultHolder, IntermediateResult};

/// Left fold from the identity; an empty input yields the identity.
pub fn merge_all<'a>(
    function: &AggregationFunction,
    results: impl IntoIterator<Item = &'a IntermediateResult>,
) -> AggResult<IntermediateResult> {
    let mut acc = function.identity()?;
    for result in results {
        function.merge_into(&mut acc, result)?;
    }
    Ok(acc)
}

/// Pairwise reduction, the shape a parallel merge would take.
pub fn merge_tree(
    function: &AggregationFunction,
    mut results: Vec<IntermediateResult>,
) -> AggResult<IntermediateResult> {
    if results.is_empty() {
        return function.identity();
    }
    while results.len() > 1 {
        let mut next = Vec::with_capacity(results.len().div_ceil(2));
        let mut iter = results.into_iter();
        while let Some(mut left) = iter.next() {
            if let Some(right) = iter.next() {
                function.merge_into(&mut left, &right)?;
            }
            next.push(left);
        }
        results = next;
    }
    results
        .pop()
        .ok_or_else(|| AggError::contract("merge tree lost its root"))
}

/// Extracts every live group of a partition, renaming dense keys through the
/// partition's key dictionary.
pub fn extract_keyed<K: Ord + Clone>(
    function: &AggregationFunction,
    holder: &GroupByResultHolder,
    dictionary: &[K],
) -> AggResult<BTreeMap<K, IntermediateResult>> {
    let mut out = BTreeMap::new();
    for (key, result) in function.extract_group_by_results(holder) {
        let value = dictionary.get(key as usize).ok_or_else(|| {
            AggError::contract(format!(
                "group key {key} missing from dictionary of {} entries",
                dictionary.len()
            ))
        })?;
        out.insert(value.clone(), result);
    }
    Ok(out)
}

/// Unions per-partition group maps, merging groups present in several.
pub fn merge_group_by<K: Ord>(
    function: &AggregationFunction,
    partials: impl IntoIterator<Item = BTreeMap<K, IntermediateResult>>,
) -> AggResult<BTreeMap<K, IntermediateResult>> {
    let mut merged: BTreeMap<K, IntermediateResult> = BTreeMap::new();
    for partial in partials {
        for (key, result) in partial {
            match merged.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(result);
                }
                Entry::Occupied(mut slot) => {
                    function.merge_into(slot.get_mut(), &result)?;
                }
            }
        }
    }
    Ok(merged)
}

pub fn finalize_group_by<K: Ord + Clone>(
    function: &AggregationFunction,
    merged: &BTreeMap<K, IntermediateResult>,
) -> AggResult<BTreeMap<K, FinalResult>> {
    merged
        .iter()
        .map(|(key, result)| Ok((key.clone(), function.extract_final_result(result)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::expr::agg::AggregationFunctionType;

    #[test]
    fn empty_merge_is_identity() {
        let max = AggregationFunction::from_type(AggregationFunctionType::Max);
        assert_eq!(
            merge_all(&max, []).expect("merge"),
            IntermediateResult::Double(f64::NEG_INFINITY)
        );
        assert_eq!(
            merge_tree(&max, Vec::new()).expect("tree"),
            IntermediateResult::Double(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn tree_and_fold_agree() {
        let count = AggregationFunction::from_type(AggregationFunctionType::Count);
        let parts: Vec<IntermediateResult> = (1..=7).map(IntermediateResult::Long).collect();
        assert_eq!(
            merge_tree(&count, parts.clone()).expect("tree"),
            merge_all(&count, &parts).expect("fold")
        );
    }

    #[test]
    fn group_maps_merge_by_external_key() {
        let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
        let a = BTreeMap::from([
            ("x", IntermediateResult::Double(1.0)),
            ("y", IntermediateResult::Double(2.0)),
        ]);
        let b = BTreeMap::from([("y", IntermediateResult::Double(5.0))]);
        let merged = merge_group_by(&sum, [a, b]).expect("merge");
        let finals = finalize_group_by(&sum, &merged).expect("final");
        assert_eq!(
            finals,
            BTreeMap::from([("x", FinalResult::Double(1.0)), ("y", FinalResult::Double(7.0))])
        );
    }
}
