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
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array, Int64Array,
    ListArray, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;

use crate::common::error::{AggError, AggResult};

use super::DistinctKey;

/// One column of row values handed to an aggregate call.
///
/// Primitive arrow arrays are single-valued; a `ListArray` is multi-valued, each
/// row holding an ordered list of scalars.
#[derive(Clone, Debug)]
pub struct ValueBatch {
    array: ArrayRef,
}

impl ValueBatch {
    pub fn new(array: ArrayRef) -> Self {
        Self { array }
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn is_multi_value(&self) -> bool {
        matches!(self.array.data_type(), DataType::List(_))
    }

    pub fn data_type(&self) -> &DataType {
        self.array.data_type()
    }

    pub fn array(&self) -> &ArrayRef {
        &self.array
    }

    /// Zero-copy row range, used to split a batch between partitions.
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        Self {
            array: self.array.slice(offset, length),
        }
    }
}

impl From<ArrayRef> for ValueBatch {
    fn from(array: ArrayRef) -> Self {
        Self::new(array)
    }
}

#[derive(Clone, Debug)]
pub enum ScalarArrayView<'a> {
    Int64(&'a Int64Array),
    Int32(&'a Int32Array),
    Int16(&'a Int16Array),
    Int8(&'a Int8Array),
    UInt64(&'a UInt64Array),
    UInt32(&'a UInt32Array),
    UInt16(&'a UInt16Array),
    UInt8(&'a UInt8Array),
    Float64(&'a Float64Array),
    Float32(&'a Float32Array),
    Utf8(&'a StringArray),
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> AggResult<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| AggError::type_mismatch(format!("failed to downcast to {name}")))
}

impl<'a> ScalarArrayView<'a> {
    pub fn new(array: &'a ArrayRef) -> AggResult<Self> {
        match array.data_type() {
            DataType::Int64 => downcast(array, "Int64Array").map(Self::Int64),
            DataType::Int32 => downcast(array, "Int32Array").map(Self::Int32),
            DataType::Int16 => downcast(array, "Int16Array").map(Self::Int16),
            DataType::Int8 => downcast(array, "Int8Array").map(Self::Int8),
            DataType::UInt64 => downcast(array, "UInt64Array").map(Self::UInt64),
            DataType::UInt32 => downcast(array, "UInt32Array").map(Self::UInt32),
            DataType::UInt16 => downcast(array, "UInt16Array").map(Self::UInt16),
            DataType::UInt8 => downcast(array, "UInt8Array").map(Self::UInt8),
            DataType::Float64 => downcast(array, "Float64Array").map(Self::Float64),
            DataType::Float32 => downcast(array, "Float32Array").map(Self::Float32),
            DataType::Utf8 => downcast(array, "StringArray").map(Self::Utf8),
            other => Err(AggError::unsupported(format!(
                "unsupported aggregate input type: {:?}",
                other
            ))),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarArrayView::Utf8(_))
    }

    pub fn len(&self) -> usize {
        match self {
            ScalarArrayView::Int64(arr) => arr.len(),
            ScalarArrayView::Int32(arr) => arr.len(),
            ScalarArrayView::Int16(arr) => arr.len(),
            ScalarArrayView::Int8(arr) => arr.len(),
            ScalarArrayView::UInt64(arr) => arr.len(),
            ScalarArrayView::UInt32(arr) => arr.len(),
            ScalarArrayView::UInt16(arr) => arr.len(),
            ScalarArrayView::UInt8(arr) => arr.len(),
            ScalarArrayView::Float64(arr) => arr.len(),
            ScalarArrayView::Float32(arr) => arr.len(),
            ScalarArrayView::Utf8(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric value widened to f64; `None` for nulls and for utf8 input.
    pub fn f64_at(&self, idx: usize) -> Option<f64> {
        match self {
            ScalarArrayView::Int64(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::Int32(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::Int16(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::Int8(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::UInt64(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::UInt32(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::UInt16(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::UInt8(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::Float64(arr) => (!arr.is_null(idx)).then(|| arr.value(idx)),
            ScalarArrayView::Float32(arr) => (!arr.is_null(idx)).then(|| arr.value(idx) as f64),
            ScalarArrayView::Utf8(_) => None,
        }
    }

    /// Exact distinct identity: integers are not widened, so large i64 values
    /// never collide through f64 rounding.
    pub fn key_at(&self, idx: usize) -> Option<DistinctKey> {
        match self {
            ScalarArrayView::Int64(arr) => (!arr.is_null(idx)).then(|| DistinctKey::Long(arr.value(idx))),
            ScalarArrayView::Int32(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Long(i64::from(arr.value(idx))))
            }
            ScalarArrayView::Int16(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Long(i64::from(arr.value(idx))))
            }
            ScalarArrayView::Int8(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Long(i64::from(arr.value(idx))))
            }
            ScalarArrayView::UInt64(arr) => (!arr.is_null(idx)).then(|| {
                let v = arr.value(idx);
                i64::try_from(v)
                    .map(DistinctKey::Long)
                    .unwrap_or_else(|_| DistinctKey::from_f64(v as f64))
            }),
            ScalarArrayView::UInt32(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Long(i64::from(arr.value(idx))))
            }
            ScalarArrayView::UInt16(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Long(i64::from(arr.value(idx))))
            }
            ScalarArrayView::UInt8(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Long(i64::from(arr.value(idx))))
            }
            ScalarArrayView::Float64(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::from_f64(arr.value(idx)))
            }
            ScalarArrayView::Float32(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::from_f64(f64::from(arr.value(idx))))
            }
            ScalarArrayView::Utf8(arr) => {
                (!arr.is_null(idx)).then(|| DistinctKey::Utf8(arr.value(idx).to_string()))
            }
        }
    }
}

/// Multi-valued column: row `r` owns child values `offsets[r]..offsets[r + 1]`.
#[derive(Clone, Debug)]
pub struct MultiValueView<'a> {
    list: &'a ListArray,
    values: ScalarArrayView<'a>,
}

impl<'a> MultiValueView<'a> {
    pub fn new(array: &'a ArrayRef) -> AggResult<Self> {
        let list: &ListArray = downcast(array, "ListArray")?;
        let values = ScalarArrayView::new(list.values())?;
        Ok(Self { list, values })
    }

    pub fn values(&self) -> &ScalarArrayView<'a> {
        &self.values
    }

    fn value_range(&self, row: usize) -> std::ops::Range<usize> {
        if self.list.is_null(row) {
            return 0..0;
        }
        let offsets = self.list.value_offsets();
        offsets[row] as usize..offsets[row + 1] as usize
    }

    /// Number of non-null values in `row`.
    pub fn value_count(&self, row: usize) -> usize {
        self.value_range(row)
            .filter(|&idx| self.values.key_at(idx).is_some())
            .count()
    }
}

/// Input of one aggregate call, already validated against the function.
pub enum AggInputView<'a> {
    /// Row-count functions read no values.
    None,
    Single(ScalarArrayView<'a>),
    Multi(MultiValueView<'a>),
}

impl<'a> AggInputView<'a> {
    pub fn for_each_f64(&self, row: usize, mut f: impl FnMut(f64)) {
        match self {
            AggInputView::None => {}
            AggInputView::Single(view) => {
                if let Some(v) = view.f64_at(row) {
                    f(v);
                }
            }
            AggInputView::Multi(view) => {
                for idx in view.value_range(row) {
                    if let Some(v) = view.values.f64_at(idx) {
                        f(v);
                    }
                }
            }
        }
    }

    pub fn for_each_key(&self, row: usize, mut f: impl FnMut(DistinctKey)) {
        match self {
            AggInputView::None => {}
            AggInputView::Single(view) => {
                if let Some(k) = view.key_at(row) {
                    f(k);
                }
            }
            AggInputView::Multi(view) => {
                for idx in view.value_range(row) {
                    if let Some(k) = view.values.key_at(idx) {
                        f(k);
                    }
                }
            }
        }
    }

    /// Rows count once when no values are read; otherwise each non-null value counts.
    pub fn value_count(&self, row: usize) -> usize {
        match self {
            AggInputView::None => 1,
            AggInputView::Single(view) => usize::from(view.key_at(row).is_some()),
            AggInputView::Multi(view) => view.value_count(row),
        }
    }
}
