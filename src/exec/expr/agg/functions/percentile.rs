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

/// Exact percentile: keeps every value and picks one from the sorted list at
/// extraction time.
pub(super) struct PercentileAgg;

impl AggregateFunction for PercentileAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::ValueList(ValueList::new()))
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
                IntermediateResult::ValueList(list) => {
                    input.for_each_f64(target.row, |v| list.push(v));
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
            (IntermediateResult::ValueList(a), IntermediateResult::ValueList(b)) => {
                a.extend_from(b);
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
        ColumnDataType::Double
    }

    fn extract_final(
        &self,
        spec: &AggSpec,
        intermediate: &IntermediateResult,
    ) -> AggResult<FinalResult> {
        match intermediate {
            IntermediateResult::ValueList(list) => Ok(FinalResult::Double(
                list.percentile(spec.percentile)
                    .unwrap_or(f64::NEG_INFINITY),
            )),
            other => Err(common::unexpected_state(spec, other)),
        }
    }
}
