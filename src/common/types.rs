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
use std::fmt;

use arrow::datatypes::DataType;

/// Wire type tag attached to aggregate results that cross a partition boundary.
///
/// `Object` covers structured intermediates (sketches, sets, pairs) that are shipped
/// as opaque bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ColumnDataType {
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Object,
}

impl ColumnDataType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnDataType::Int => "INT",
            ColumnDataType::Long => "LONG",
            ColumnDataType::Float => "FLOAT",
            ColumnDataType::Double => "DOUBLE",
            ColumnDataType::String => "STRING",
            ColumnDataType::Bytes => "BYTES",
            ColumnDataType::Object => "OBJECT",
        }
    }

    pub fn to_arrow_type(self) -> DataType {
        match self {
            ColumnDataType::Int => DataType::Int32,
            ColumnDataType::Long => DataType::Int64,
            ColumnDataType::Float => DataType::Float32,
            ColumnDataType::Double => DataType::Float64,
            ColumnDataType::String => DataType::Utf8,
            ColumnDataType::Bytes | ColumnDataType::Object => DataType::Binary,
        }
    }

    /// Binary arrays map back to `Bytes`; callers that expect `Object` compare tags
    /// by arrow type instead.
    pub fn from_arrow_type(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Int32 => Some(ColumnDataType::Int),
            DataType::Int64 => Some(ColumnDataType::Long),
            DataType::Float32 => Some(ColumnDataType::Float),
            DataType::Float64 => Some(ColumnDataType::Double),
            DataType::Utf8 => Some(ColumnDataType::String),
            DataType::Binary => Some(ColumnDataType::Bytes),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnDataType::Int
                | ColumnDataType::Long
                | ColumnDataType::Float
                | ColumnDataType::Double
        )
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;

    use super::ColumnDataType;

    #[test]
    fn object_is_shipped_as_binary() {
        assert_eq!(ColumnDataType::Object.to_arrow_type(), DataType::Binary);
        assert_eq!(
            ColumnDataType::from_arrow_type(&DataType::Binary),
            Some(ColumnDataType::Bytes)
        );
    }

    #[test]
    fn numeric_tags_round_trip_through_arrow() {
        for tag in [
            ColumnDataType::Int,
            ColumnDataType::Long,
            ColumnDataType::Float,
            ColumnDataType::Double,
        ] {
            assert!(tag.is_numeric());
            assert_eq!(ColumnDataType::from_arrow_type(&tag.to_arrow_type()), Some(tag));
        }
        assert_eq!(ColumnDataType::Long.to_string(), "LONG");
    }
}
