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

pub(super) struct SumAgg;

impl AggregateFunction for SumAgg {
    fn identity(&self, _spec: &AggSpec) -> AggResult<IntermediateResult> {
        Ok(IntermediateResult::Double(0.0))
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
        common::update_doubles(spec, slots, targets, input, |acc, v| *acc += v)
    }

    fn merge(
        &self,
        spec: &AggSpec,
        dst: &mut IntermediateResult,
        src: &IntermediateResult,
    ) -> AggResult<()> {
        match (dst, src) {
            (IntermediateResult::Double(a), IntermediateResult::Double(b)) => {
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
