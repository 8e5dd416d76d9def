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

use crate::common::error::AggResult;
use crate::common::types::ColumnDataType;

use super::super::*;
use super::AggregateFunction;
use super::common::{self, InputDomain};

pub(super) struct MinMaxRangeAgg;

fn range_or_neg_inf(spec: &AggSpec, state: &IntermediateResult) -> AggResult<f64> {
    match state {
        IntermediateResult::MinMaxRange(pair) => Ok(pair.range().unwrap_or(f64::NEG_INFINITY)),
        other => Err(common::unexpected_state(spec, other)),
    }
}

impl AggregateFunction for MinMaxRangeAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::MinMaxRange(MinMaxRangePair::default()))
    }

    fn build_input_view<'a>(
        &self,
        spec: &AggSpec,
        batch: Option<&'a ValueBatch>,
    ) -> AggResult<AggInputView<'a>> {
        common::value_view(spec, batch, InputDomain::Numeric)
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
                IntermediateResult::MinMaxRange(pair) => {
                    input.for_each_f64(target.row, |v| pair.apply(v));
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
            (IntermediateResult::MinMaxRange(a), IntermediateResult::MinMaxRange(b)) => {
                a.merge(b);
                Ok(())
            }
            (dst, src) => Err(common::merge_mismatch(spec, dst, src)),
        }
    }

    fn is_comparable(&self) -> bool {
        true
    }

    fn compare(
        &self,
        spec: &AggSpec,
        lhs: &IntermediateResult,
        rhs: &IntermediateResult,
    ) -> AggResult<Ordering> {
        Ok(range_or_neg_inf(spec, lhs)?.total_cmp(&range_or_neg_inf(spec, rhs)?))
    }

    fn intermediate_column_type(&self) -> ColumnDataType {
        ColumnDataType::Object
    }

    fn final_column_type(&self) -> ColumnDataType {
        ColumnDataType::Double
    }

    fn extract_final(
        &self,
        spec: &AggSpec,
        intermediate: &IntermediateResult,
    ) -> AggResult<FinalResult> {
        range_or_neg_inf(spec, intermediate).map(FinalResult::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::super::common::test_util::{accumulate, doubles, finalize, long_lists, merged};
    use super::*;

    #[test]
    fn range_spans_merged_partitions() {
        let spec = AggSpec::new(AggregationFunctionType::MinMaxRange);
        let a = accumulate(&spec, &doubles(&[2.0, 5.0])).expect("a");
        let b = accumulate(&spec, &doubles(&[-3.0])).expect("b");
        let m = merged(&spec, &a, &b).expect("merge");
        assert_eq!(finalize(&spec, &m).expect("final"), FinalResult::Double(8.0));
    }

    #[test]
    fn single_value_has_zero_range() {
        let spec = AggSpec::new(AggregationFunctionType::MinMaxRangeMv);
        let r = accumulate(&spec, &long_lists(vec![vec![4, 4]])).expect("mv");
        assert_eq!(finalize(&spec, &r).expect("final"), FinalResult::Double(0.0));
    }
}
