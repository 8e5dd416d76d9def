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

pub(super) struct AvgAgg;

fn as_pair<'r>(spec: &AggSpec, state: &'r IntermediateResult) -> AggResult<&'r AvgPair> {
    match state {
        IntermediateResult::AvgPair(pair) => Ok(pair),
        other => Err(common::unexpected_state(spec, other)),
    }
}

/// Average used for both ranking and the final value; empty pairs rank last.
fn average_or_neg_inf(pair: &AvgPair) -> f64 {
    pair.average().unwrap_or(f64::NEG_INFINITY)
}

impl AggregateFunction for AvgAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::AvgPair(AvgPair::default()))
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
                IntermediateResult::AvgPair(pair) => {
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
            (IntermediateResult::AvgPair(a), IntermediateResult::AvgPair(b)) => {
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
        let lhs = average_or_neg_inf(as_pair(spec, lhs)?);
        let rhs = average_or_neg_inf(as_pair(spec, rhs)?);
        Ok(lhs.total_cmp(&rhs))
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
        let pair = as_pair(spec, intermediate)?;
        Ok(FinalResult::Double(average_or_neg_inf(pair)))
    }
}
