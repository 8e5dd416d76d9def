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

pub(super) struct CountAgg;

fn as_long(spec: &AggSpec, state: &IntermediateResult) -> AggResult<i64> {
    match state {
        IntermediateResult::Long(v) => Ok(*v),
        other => Err(common::unexpected_state(spec, other)),
    }
}

impl AggregateFunction for CountAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::Long(0))
    }

    fn build_input_view<'a>(
        &self,
        spec: &AggSpec,
        batch: Option<&'a ValueBatch>,
    ) -> AggResult<AggInputView<'a>> {
        if spec.kind.is_multi_value() {
            return common::value_view(spec, batch, InputDomain::NumericOrUtf8);
        }
        // count(*) counts rows; a value column only has to be single-valued.
        if let Some(batch) = batch {
            common::check_shape(spec, batch)?;
        }
        Ok(AggInputView::None)
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
                IntermediateResult::Long(count) => {
                    *count += input.value_count(target.row) as i64;
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
            (IntermediateResult::Long(a), IntermediateResult::Long(b)) => {
                *a += *b;
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
        Ok(as_long(spec, lhs)?.cmp(&as_long(spec, rhs)?))
    }

    fn intermediate_column_type(&self) -> ColumnDataType {
        ColumnDataType::Long
    }

    fn final_column_type(&self) -> ColumnDataType {
        ColumnDataType::Long
    }

    fn extract_final(
        &self,
        spec: &AggSpec,
        intermediate: &IntermediateResult,
    ) -> AggResult<FinalResult> {
        as_long(spec, intermediate).map(FinalResult::Long)
    }
}
