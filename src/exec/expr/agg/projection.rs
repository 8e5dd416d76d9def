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
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BinaryBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::common::error::{AggError, AggResult};
use crate::common::types::ColumnDataType;

use super::codec;
use super::{AggregationFunction, IntermediateResult};

/// Externally visible aggregate value. Always totally ordered.
#[derive(Clone, Copy, Debug)]
pub enum FinalResult {
    Long(i64),
    Double(f64),
}

impl FinalResult {
    pub fn column_type(&self) -> ColumnDataType {
        match self {
            FinalResult::Long(_) => ColumnDataType::Long,
            FinalResult::Double(_) => ColumnDataType::Double,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            FinalResult::Long(v) => *v as f64,
            FinalResult::Double(v) => *v,
        }
    }
}

impl Ord for FinalResult {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FinalResult::Long(a), FinalResult::Long(b)) => a.cmp(b),
            (FinalResult::Double(a), FinalResult::Double(b)) => a.total_cmp(b),
            // numeric first, then Long sorts before Double
            (FinalResult::Long(_), FinalResult::Double(_)) => self
                .as_f64()
                .total_cmp(&other.as_f64())
                .then(Ordering::Less),
            (FinalResult::Double(_), FinalResult::Long(_)) => self
                .as_f64()
                .total_cmp(&other.as_f64())
                .then(Ordering::Greater),
        }
    }
}

impl PartialOrd for FinalResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FinalResult {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FinalResult {}

/// Builds the output column for final results of one function.
pub fn build_final_array(
    final_type: ColumnDataType,
    results: &[FinalResult],
) -> AggResult<ArrayRef> {
    match final_type {
        ColumnDataType::Long => {
            let mut builder = Int64Builder::with_capacity(results.len());
            for result in results {
                match result {
                    FinalResult::Long(v) => builder.append_value(*v),
                    FinalResult::Double(_) => {
                        return Err(AggError::type_mismatch(
                            "double final result in LONG column",
                        ));
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnDataType::Double => {
            let mut builder = Float64Builder::with_capacity(results.len());
            for result in results {
                match result {
                    FinalResult::Double(v) => builder.append_value(*v),
                    FinalResult::Long(_) => {
                        return Err(AggError::type_mismatch(
                            "long final result in DOUBLE column",
                        ));
                    }
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(AggError::unsupported(format!(
            "final results cannot be projected as {other}"
        ))),
    }
}

/// Packs intermediate results into an arrow array typed by their wire tag, so a
/// partition can ship them as one column.
pub fn build_intermediate_array(
    wire_type: ColumnDataType,
    results: &[IntermediateResult],
) -> AggResult<ArrayRef> {
    match wire_type {
        ColumnDataType::Long => {
            let mut builder = Int64Builder::with_capacity(results.len());
            for result in results {
                match result {
                    IntermediateResult::Long(v) => builder.append_value(*v),
                    other => return Err(wire_mismatch(wire_type, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnDataType::Double => {
            let mut builder = Float64Builder::with_capacity(results.len());
            for result in results {
                match result {
                    IntermediateResult::Double(v) => builder.append_value(*v),
                    other => return Err(wire_mismatch(wire_type, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ColumnDataType::Object => {
            let mut builder = BinaryBuilder::with_capacity(results.len(), results.len() * 16);
            for result in results {
                if result.column_type() != ColumnDataType::Object {
                    return Err(wire_mismatch(wire_type, result));
                }
                builder.append_value(codec::serialize_intermediate(result)?);
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(AggError::unsupported(format!(
            "intermediate results cannot be shipped as {other}"
        ))),
    }
}

fn wire_mismatch(wire_type: ColumnDataType, result: &IntermediateResult) -> AggError {
    AggError::type_mismatch(format!(
        "{} intermediate result in {wire_type} column",
        result.variant_name()
    ))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> AggResult<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| AggError::type_mismatch(format!("failed to downcast to {name}")))
}

/// Reverse of [`build_intermediate_array`]. Nulls are rejected: every shipped
/// group carries a state, even an identity one.
pub fn intermediate_results_from_array(array: &ArrayRef) -> AggResult<Vec<IntermediateResult>> {
    if array.null_count() > 0 {
        return Err(AggError::contract(
            "intermediate result column must not contain nulls",
        ));
    }
    match array.data_type() {
        DataType::Int64 => {
            let arr: &Int64Array = downcast(array, "Int64Array")?;
            Ok(arr.values().iter().map(|v| IntermediateResult::Long(*v)).collect())
        }
        DataType::Float64 => {
            let arr: &Float64Array = downcast(array, "Float64Array")?;
            Ok(arr
                .values()
                .iter()
                .map(|v| IntermediateResult::Double(*v))
                .collect())
        }
        DataType::Binary => {
            let arr: &BinaryArray = downcast(array, "BinaryArray")?;
            arr.iter()
                .map(|bytes| codec::deserialize_intermediate(bytes.unwrap_or_default()))
                .collect()
        }
        other => Err(AggError::unsupported(format!(
            "no intermediate wire type for {other:?}"
        ))),
    }
}

/// Output schema for a row of aggregates applied to the named columns.
pub fn build_result_schema(
    columns: &[(&AggregationFunction, &str)],
    intermediate: bool,
) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(function, column)| {
            let column_type = if intermediate {
                function.intermediate_result_column_type()
            } else {
                function.final_result_column_type()
            };
            Field::new(
                function.column_name(column),
                column_type.to_arrow_type(),
                false,
            )
        })
        .collect();
    Arc::new(Schema::new(fields))
}
