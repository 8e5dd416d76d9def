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

use super::{
    AggInputView, AggSpec, AggregationFunctionType, FinalResult, IntermediateResult, RowTarget,
    ValueBatch,
};

mod avg;
pub(crate) mod common;
mod count;
mod count_distinct;
mod distinct_count_hll;
mod min_max;
mod min_max_range;
mod percentile;
mod sum;

use avg::AvgAgg;
use count::CountAgg;
use count_distinct::CountDistinctAgg;
use distinct_count_hll::DistinctCountHllAgg;
use min_max::MinMaxAgg;
use min_max_range::MinMaxRangeAgg;
use percentile::PercentileAgg;
use sum::SumAgg;

/// Per-family accumulate, merge and projection logic.
///
/// Implementations are stateless; all per-application configuration arrives
/// through `AggSpec` and all state lives in `IntermediateResult` slots owned by
/// a holder.
pub(super) trait AggregateFunction: Sync {
    /// State of a slot that has seen no rows.
    fn identity(&self, spec: &AggSpec) -> AggResult<IntermediateResult>;

    /// Validates the input column against the function and builds its view.
    /// `None` means the call carried no value column.
    fn build_input_view<'a>(
        &self,
        spec: &AggSpec,
        batch: Option<&'a ValueBatch>,
    ) -> AggResult<AggInputView<'a>>;

    /// Folds `targets[i].row` of `input` into `slots[targets[i].slot]`.
    fn update_batch(
        &self,
        spec: &AggSpec,
        slots: &mut [IntermediateResult],
        targets: &[RowTarget],
        input: &AggInputView,
    ) -> AggResult<()>;

    /// Folds `src` into `dst`; either side may be the identity.
    fn merge(
        &self,
        spec: &AggSpec,
        dst: &mut IntermediateResult,
        src: &IntermediateResult,
    ) -> AggResult<()>;

    fn is_comparable(&self) -> bool;

    /// Ranking used by group-by trimming, greater is better. Only called when
    /// `is_comparable` holds.
    fn compare(
        &self,
        spec: &AggSpec,
        lhs: &IntermediateResult,
        rhs: &IntermediateResult,
    ) -> AggResult<Ordering>;

    fn intermediate_column_type(&self) -> ColumnDataType;

    fn final_column_type(&self) -> ColumnDataType;

    fn extract_final(
        &self,
        spec: &AggSpec,
        intermediate: &IntermediateResult,
    ) -> AggResult<FinalResult>;
}

static COUNT: CountAgg = CountAgg;
static MIN: MinMaxAgg = MinMaxAgg { pick_max: false };
static MAX: MinMaxAgg = MinMaxAgg { pick_max: true };
static SUM: SumAgg = SumAgg;
static AVG: AvgAgg = AvgAgg;
static MIN_MAX_RANGE: MinMaxRangeAgg = MinMaxRangeAgg;
static DISTINCT_COUNT: CountDistinctAgg = CountDistinctAgg;
static DISTINCT_COUNT_HLL: DistinctCountHllAgg = DistinctCountHllAgg;
static PERCENTILE: PercentileAgg = PercentileAgg;

/// MV kinds share the SV implementation; the SV/MV split only changes how the
/// input view is validated.
pub(super) fn resolve_by_type(kind: AggregationFunctionType) -> &'static dyn AggregateFunction {
    use AggregationFunctionType as T;
    match kind {
        T::Count | T::CountMv => &COUNT,
        T::Min | T::MinMv => &MIN,
        T::Max | T::MaxMv => &MAX,
        T::Sum | T::SumMv => &SUM,
        T::Avg | T::AvgMv => &AVG,
        T::MinMaxRange | T::MinMaxRangeMv => &MIN_MAX_RANGE,
        T::DistinctCount | T::DistinctCountMv => &DISTINCT_COUNT,
        T::DistinctCountHll | T::DistinctCountHllMv => &DISTINCT_COUNT_HLL,
        T::Percentile | T::PercentileMv => &PERCENTILE,
    }
}
