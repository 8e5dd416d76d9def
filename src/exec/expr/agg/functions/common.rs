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
use crate::common::error::{AggError, AggResult};

use super::super::*;

/// Which scalar inputs a function reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum InputDomain {
    Numeric,
    NumericOrUtf8,
}

/// Checks the column shape against the SV/MV kind and builds the view.
pub(super) fn value_view<'a>(
    spec: &AggSpec,
    batch: Option<&'a ValueBatch>,
    domain: InputDomain,
) -> AggResult<AggInputView<'a>> {
    let batch = batch.ok_or_else(|| {
        AggError::contract(format!("{} requires an input column", spec.name()))
    })?;
    check_shape(spec, batch)?;
    let view = if batch.is_multi_value() {
        AggInputView::Multi(MultiValueView::new(batch.array())?)
    } else {
        AggInputView::Single(ScalarArrayView::new(batch.array())?)
    };
    let numeric = match &view {
        AggInputView::Single(v) => v.is_numeric(),
        AggInputView::Multi(v) => v.values().is_numeric(),
        AggInputView::None => true,
    };
    if domain == InputDomain::Numeric && !numeric {
        return Err(AggError::unsupported(format!(
            "{} does not accept {:?} input",
            spec.name(),
            batch.data_type()
        )));
    }
    Ok(view)
}

/// SV kinds reject list columns and MV kinds require them.
pub(super) fn check_shape(spec: &AggSpec, batch: &ValueBatch) -> AggResult<()> {
    match (spec.kind.is_multi_value(), batch.is_multi_value()) {
        (false, true) => Err(AggError::unsupported(format!(
            "single-value function {} called on a multi-value column",
            spec.name()
        ))),
        (true, false) => Err(AggError::unsupported(format!(
            "multi-value function {} called on a single-value column",
            spec.name()
        ))),
        _ => Ok(()),
    }
}

pub(super) fn slot_mut<'s>(
    slots: &'s mut [IntermediateResult],
    slot: usize,
) -> AggResult<&'s mut IntermediateResult> {
    let len = slots.len();
    slots
        .get_mut(slot)
        .ok_or_else(|| AggError::contract(format!("slot {slot} out of range ({len} slots)")))
}

pub(super) fn unexpected_state(spec: &AggSpec, state: &IntermediateResult) -> AggError {
    AggError::type_mismatch(format!(
        "{} got {} intermediate result",
        spec.name(),
        state.variant_name()
    ))
}

pub(super) fn merge_mismatch(
    spec: &AggSpec,
    dst: &IntermediateResult,
    src: &IntermediateResult,
) -> AggError {
    AggError::type_mismatch(format!(
        "{} cannot merge {} with {}",
        spec.name(),
        dst.variant_name(),
        src.variant_name()
    ))
}

pub(super) fn as_double(spec: &AggSpec, state: &IntermediateResult) -> AggResult<f64> {
    match state {
        IntermediateResult::Double(v) => Ok(*v),
        other => Err(unexpected_state(spec, other)),
    }
}

/// Doubles accumulated into one slot per target, shared by sum/min/max.
pub(super) fn update_doubles(
    spec: &AggSpec,
    slots: &mut [IntermediateResult],
    targets: &[RowTarget],
    input: &AggInputView,
    mut fold: impl FnMut(&mut f64, f64),
) -> AggResult<()> {
    for target in targets {
        match slot_mut(slots, target.slot)? {
            IntermediateResult::Double(acc) => input.for_each_f64(target.row, |v| fold(acc, v)),
            other => return Err(unexpected_state(spec, other)),
        }
    }
    Ok(())
}
