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

use crate::common::config;
use crate::common::error::{AggError, AggResult};

use super::hll::{MAX_LOG2M, MIN_LOG2M};

/// Closed registry of aggregation function kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregationFunctionType {
    Count,
    Min,
    Max,
    Sum,
    Avg,
    MinMaxRange,
    DistinctCount,
    DistinctCountHll,
    Percentile,
    CountMv,
    MinMv,
    MaxMv,
    SumMv,
    AvgMv,
    MinMaxRangeMv,
    DistinctCountMv,
    DistinctCountHllMv,
    PercentileMv,
}

impl AggregationFunctionType {
    pub const ALL: [AggregationFunctionType; 18] = [
        AggregationFunctionType::Count,
        AggregationFunctionType::Min,
        AggregationFunctionType::Max,
        AggregationFunctionType::Sum,
        AggregationFunctionType::Avg,
        AggregationFunctionType::MinMaxRange,
        AggregationFunctionType::DistinctCount,
        AggregationFunctionType::DistinctCountHll,
        AggregationFunctionType::Percentile,
        AggregationFunctionType::CountMv,
        AggregationFunctionType::MinMv,
        AggregationFunctionType::MaxMv,
        AggregationFunctionType::SumMv,
        AggregationFunctionType::AvgMv,
        AggregationFunctionType::MinMaxRangeMv,
        AggregationFunctionType::DistinctCountMv,
        AggregationFunctionType::DistinctCountHllMv,
        AggregationFunctionType::PercentileMv,
    ];

    /// Lowercase name; percentile kinds omit the percentile number.
    pub fn name(&self) -> &'static str {
        match self {
            AggregationFunctionType::Count => "count",
            AggregationFunctionType::Min => "min",
            AggregationFunctionType::Max => "max",
            AggregationFunctionType::Sum => "sum",
            AggregationFunctionType::Avg => "avg",
            AggregationFunctionType::MinMaxRange => "minmaxrange",
            AggregationFunctionType::DistinctCount => "distinctcount",
            AggregationFunctionType::DistinctCountHll => "distinctcounthll",
            AggregationFunctionType::Percentile => "percentile",
            AggregationFunctionType::CountMv => "countmv",
            AggregationFunctionType::MinMv => "minmv",
            AggregationFunctionType::MaxMv => "maxmv",
            AggregationFunctionType::SumMv => "summv",
            AggregationFunctionType::AvgMv => "avgmv",
            AggregationFunctionType::MinMaxRangeMv => "minmaxrangemv",
            AggregationFunctionType::DistinctCountMv => "distinctcountmv",
            AggregationFunctionType::DistinctCountHllMv => "distinctcounthllmv",
            AggregationFunctionType::PercentileMv => "percentilemv",
        }
    }

    /// Resolves a plain function name (no percentile digits) case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.name() == lower)
    }

    pub fn is_multi_value(&self) -> bool {
        self.single_value_base() != *self
    }

    /// The SV kind sharing this kind's accumulator and merge logic.
    pub fn single_value_base(&self) -> Self {
        match self {
            AggregationFunctionType::CountMv => AggregationFunctionType::Count,
            AggregationFunctionType::MinMv => AggregationFunctionType::Min,
            AggregationFunctionType::MaxMv => AggregationFunctionType::Max,
            AggregationFunctionType::SumMv => AggregationFunctionType::Sum,
            AggregationFunctionType::AvgMv => AggregationFunctionType::Avg,
            AggregationFunctionType::MinMaxRangeMv => AggregationFunctionType::MinMaxRange,
            AggregationFunctionType::DistinctCountMv => AggregationFunctionType::DistinctCount,
            AggregationFunctionType::DistinctCountHllMv => {
                AggregationFunctionType::DistinctCountHll
            }
            AggregationFunctionType::PercentileMv => AggregationFunctionType::Percentile,
            sv => *sv,
        }
    }
}

impl fmt::Display for AggregationFunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration of one function application.
///
/// `percentile` only matters for percentile kinds and `hll_log2m` only for HLL
/// kinds; both still take part in equality so results of differently configured
/// functions never merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AggSpec {
    pub kind: AggregationFunctionType,
    pub percentile: u8,
    pub hll_log2m: u8,
}

impl AggSpec {
    pub fn new(kind: AggregationFunctionType) -> Self {
        Self {
            kind,
            percentile: 50,
            hll_log2m: config::hll_log2m(),
        }
    }

    pub fn percentile(percentile: u8, multi_value: bool) -> AggResult<Self> {
        if percentile > 100 {
            return Err(AggError::contract(format!(
                "percentile must be within [0, 100], got {percentile}"
            )));
        }
        let kind = if multi_value {
            AggregationFunctionType::PercentileMv
        } else {
            AggregationFunctionType::Percentile
        };
        Ok(Self {
            percentile,
            ..Self::new(kind)
        })
    }

    pub fn distinct_count_hll(log2m: u8, multi_value: bool) -> AggResult<Self> {
        if !(MIN_LOG2M..=MAX_LOG2M).contains(&log2m) {
            return Err(AggError::contract(format!(
                "hll log2m must be within [{MIN_LOG2M}, {MAX_LOG2M}], got {log2m}"
            )));
        }
        let kind = if multi_value {
            AggregationFunctionType::DistinctCountHllMv
        } else {
            AggregationFunctionType::DistinctCountHll
        };
        Ok(Self {
            hll_log2m: log2m,
            ..Self::new(kind)
        })
    }

    /// Parses names such as `sum`, `DistinctCountMV` or `percentile95mv`.
    pub fn from_name(name: &str) -> AggResult<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some(kind) = AggregationFunctionType::from_name(&lower) {
            if matches!(
                kind,
                AggregationFunctionType::Percentile | AggregationFunctionType::PercentileMv
            ) {
                return Err(AggError::unsupported(format!(
                    "percentile function '{name}' needs a percentile, e.g. percentile95"
                )));
            }
            return Ok(Self::new(kind));
        }
        if let Some(rest) = lower.strip_prefix("percentile") {
            let (digits, multi_value) = match rest.strip_suffix("mv") {
                Some(digits) => (digits, true),
                None => (rest, false),
            };
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                let percentile = digits.parse::<u8>().map_err(|_| {
                    AggError::contract(format!("invalid percentile in '{name}'"))
                })?;
                return Self::percentile(percentile, multi_value);
            }
        }
        Err(AggError::unsupported(format!(
            "unknown aggregation function '{name}'"
        )))
    }

    /// Display name, including the percentile for percentile kinds.
    pub fn name(&self) -> String {
        match self.kind {
            AggregationFunctionType::Percentile => format!("percentile{}", self.percentile),
            AggregationFunctionType::PercentileMv => format!("percentile{}mv", self.percentile),
            kind => kind.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        for kind in AggregationFunctionType::ALL {
            assert_eq!(
                AggregationFunctionType::from_name(&kind.name().to_uppercase()),
                Some(kind)
            );
        }
        assert_eq!(AggregationFunctionType::from_name("median"), None);
    }

    #[test]
    fn mv_kinds_map_to_sv_base() {
        assert!(AggregationFunctionType::SumMv.is_multi_value());
        assert!(!AggregationFunctionType::Sum.is_multi_value());
        assert_eq!(
            AggregationFunctionType::PercentileMv.single_value_base(),
            AggregationFunctionType::Percentile
        );
    }

    #[test]
    fn parses_percentile_names() {
        let spec = AggSpec::from_name("Percentile95MV").expect("spec");
        assert_eq!(spec.kind, AggregationFunctionType::PercentileMv);
        assert_eq!(spec.percentile, 95);
        assert_eq!(spec.name(), "percentile95mv");

        assert!(AggSpec::from_name("percentile101").is_err());
        assert!(matches!(
            AggSpec::from_name("percentile"),
            Err(AggError::Unsupported(_))
        ));
        assert!(matches!(
            AggSpec::from_name("percentilexx"),
            Err(AggError::Unsupported(_))
        ));
    }
}
