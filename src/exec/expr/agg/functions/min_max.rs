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

/// `min` and `max` share one implementation; the identity is the infinity on
/// the losing side so an empty slot merges away.
pub(super) struct MinMaxAgg {
    pub(super) pick_max: bool,
}

impl MinMaxAgg {
    fn fold(&self, acc: &mut f64, v: f64) {
        *acc = if self.pick_max { acc.max(v) } else { acc.min(v) };
    }
}

impl AggregateFunction for MinMaxAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::Double(if self.pick_max {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }))
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
        common::update_doubles(spec, slots, targets, input, |acc, v| self.fold(acc, v))
    }

    fn merge(
        &self,
        spec: &AggSpec,
        dst: &mut IntermediateResult,
        src: &IntermediateResult,
    ) -> AggResult<()> {
        match (dst, src) {
            (IntermediateResult::Double(a), IntermediateResult::Double(b)) => {
                self.fold(a, *b);
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
        Ok(common::as_double(spec, lhs)?.total_cmp(&common::as_double(spec, rhs)?))
    }

    fn intermediate_column_type(&self) -> ColumnDataType {
        ColumnDataType::Double
    }

    fn final_column_type(&self) -> ColumnDataType {
        ColumnDataType::Double
    }

    fn extract_final(
        &self,
        spec: &AggSpec,
        intermediate: &IntermediateResult,
    ) -> AggResult<FinalResult> {
        common::as_double(spec, intermediate).map(FinalResult::Double)
    }
}
