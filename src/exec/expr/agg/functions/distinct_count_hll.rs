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

/// Approximate distinct count over a dense HyperLogLog sketch.
pub(super) struct DistinctCountHllAgg;

fn check_precision(spec: &AggSpec, hll: &HyperLogLog) -> AggResult<()> {
    if hll.log2m() != spec.hll_log2m {
        return Err(AggError::type_mismatch(format!(
            "{} expects log2m {}, got sketch with log2m {}",
            spec.name(),
            spec.hll_log2m,
            hll.log2m()
        )));
    }
    Ok(())
}

impl AggregateFunction for DistinctCountHllAgg {
    fn identity(&self, spec: &AggSpec) -> AggResult<IntermediateResult> {
        HyperLogLog::new(spec.hll_log2m).map(IntermediateResult::Hll)
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
                IntermediateResult::Hll(hll) => {
                    input.for_each_key(target.row, |key| hll.offer(&key));
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
            (IntermediateResult::Hll(a), IntermediateResult::Hll(b)) => {
                check_precision(spec, b)?;
                a.merge(b)
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
            IntermediateResult::Hll(hll) => {
                check_precision(spec, hll)?;
                Ok(FinalResult::Long(hll.cardinality()))
            }
            other => Err(common::unexpected_state(spec, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::common::test_util::{accumulate, finalize, longs, merged};
    use super::*;

    #[test]
    fn small_cardinality_is_exact_enough() {
        let spec = AggSpec::distinct_count_hll(12, false).expect("spec");
        let a = accumulate(&spec, &longs(&[1, 2, 3, 3, 2])).expect("a");
        let b = accumulate(&spec, &longs(&[3, 4, 5])).expect("b");
        let m = merged(&spec, &a, &b).expect("merge");
        assert_eq!(finalize(&spec, &m).expect("final"), FinalResult::Long(5));
    }

    #[test]
    fn different_precision_does_not_merge() {
        let spec8 = AggSpec::distinct_count_hll(8, false).expect("spec");
        let spec12 = AggSpec::distinct_count_hll(12, false).expect("spec");
        let a = accumulate(&spec8, &longs(&[1])).expect("a");
        let b = accumulate(&spec12, &longs(&[1])).expect("b");
        assert!(matches!(
            merged(&spec8, &a, &b),
            Err(AggError::TypeMismatch(_))
        ));
        assert!(matches!(
            finalize(&spec8, &b),
            Err(AggError::TypeMismatch(_))
        ));
    }
}
