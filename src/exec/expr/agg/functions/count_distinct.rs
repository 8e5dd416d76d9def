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

use crate::common::error::{AggError, AggResult};
use crate::common::types::ColumnDataType;

use super::super::*;
use super::AggregateFunction;
use super::common::{self, InputDomain};

/// Exact distinct count backed by a hash set of value identities.
pub(super) struct CountDistinctAgg;

impl AggregateFunction for CountDistinctAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::DistinctSet(DistinctSet::new()))
    }

    fn build_input_view<'a>(
        &self,
        spec: &AggSpec,
        batch: Option<&'a ValueBatch>,
    ) -> AggResult<AggInputView<'a>> {
        common::value_view(spec, batch, InputDomain::NumericOrUtf8)
    }

    fn update_batch(
        &self,
        spec: &AggSpec,
        slots: &mut [IntermediateResult],
        targets: &[RowTarget],
        input: &AggInputView,
    ) -> AggResult<()> {
        for target in targets {
            match common::slot_mut(slots, target.slot)? {
                IntermediateResult::DistinctSet(set) => {
                    input.for_each_key(target.row, |key| {
                        set.insert(key);
                    });
                }
                other => return Err(common::unexpected_state(spec, other)),
            }
        }
        Ok(())
    }

    fn merge(
        &self,
        spec: &AggSpec,
        dst: &mut IntermediateResult,
        src: &IntermediateResult,
    ) -> AggResult<()> {
        match (dst, src) {
            (IntermediateResult::DistinctSet(a), IntermediateResult::DistinctSet(b)) => {
                a.union_with(b);
                Ok(())
            }
            (dst, src) => Err(common::merge_mismatch(spec, dst, src)),
        }
    }

    fn is_comparable(&self) -> bool {
        false
    }

    fn compare(
        &self,
        spec: &AggSpec,
        _lhs: &IntermediateResult,
        _rhs: &IntermediateResult,
    ) -> AggResult<Ordering> {
        Err(AggError::unsupported(format!(
            "{} intermediate results are not comparable",
            spec.name()
        )))
    }

    fn intermediate_column_type(&self) -> ColumnDataType {
        ColumnDataType::Object
    }

    fn final_column_type(&self) -> ColumnDataType {
        ColumnDataType::Long
    }

    fn extract_final(
        &self,
        spec: &AggSpec,
        intermediate: &IntermediateResult,
    ) -> AggResult<FinalResult> {
        match intermediate {
            IntermediateResult::DistinctSet(set) => Ok(FinalResult::Long(set.len() as i64)),
            other => Err(common::unexpected_state(spec, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, StringArray};

    use super::super::common::test_util::{accumulate, doubles, finalize, long_lists, longs, merged};
    use super::*;

    #[test]
    fn overlapping_partitions_count_once() {
        let spec = AggSpec::new(AggregationFunctionType::DistinctCount);
        let a = accumulate(&spec, &longs(&[1, 2, 3])).expect("a");
        let b = accumulate(&spec, &longs(&[3, 4, 5])).expect("b");
        let m = merged(&spec, &a, &b).expect("merge");
        assert_eq!(finalize(&spec, &m).expect("final"), FinalResult::Long(5));
    }

    #[test]
    fn strings_and_signed_zero_are_distinct_values() {
        let spec = AggSpec::new(AggregationFunctionType::DistinctCount);
        let strings = ValueBatch::new(
            Arc::new(StringArray::from(vec![Some("a"), Some("b"), Some("a"), None])) as ArrayRef,
        );
        let r = accumulate(&spec, &strings).expect("strings");
        assert_eq!(finalize(&spec, &r).expect("final"), FinalResult::Long(2));

        let zeros = accumulate(&spec, &doubles(&[0.0, -0.0])).expect("zeros");
        assert_eq!(finalize(&spec, &zeros).expect("final"), FinalResult::Long(1));
    }

    #[test]
    fn distinct_count_mv_flattens_rows() {
        let spec = AggSpec::new(AggregationFunctionType::DistinctCountMv);
        let r = accumulate(&spec, &long_lists(vec![vec![1, 2], vec![2, 3]])).expect("mv");
        assert_eq!(finalize(&spec, &r).expect("final"), FinalResult::Long(3));
    }

    #[test]
    fn not_comparable() {
        let spec = AggSpec::new(AggregationFunctionType::DistinctCount);
        assert!(!CountDistinctAgg.is_comparable());
        let empty = CountDistinctAgg.identity(&spec).expect("identity");
        assert!(CountDistinctAgg.compare(&spec, &empty, &empty).is_err());
    }
}
