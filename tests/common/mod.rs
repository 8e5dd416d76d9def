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
//! Common utilities and helpers for integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, ListArray};
use arrow::datatypes::Int64Type;
use tempfile::TempDir;

use novarocks_agg::exec::expr::agg::{
    AggregationFunction, AggregationFunctionType, IntermediateResult, ValueBatch,
};
use novarocks_agg::novarocks_config;
use novarocks_agg::novarocks_logging;

/// Temporary config file for tests that need a loaded configuration.
pub struct TestConfig {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl TestConfig {
    pub fn new(content: &str) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let config_path = temp_dir.path().join("novarocks_agg.toml");
        std::fs::write(&config_path, content)?;
        Ok(Self {
            temp_dir,
            config_path,
        })
    }

    pub fn init_logging(&self) {
        novarocks_logging::init_with_level("debug");
    }

    pub fn load_config(&self) -> anyhow::Result<&'static novarocks_config::NovaRocksAggConfig> {
        novarocks_config::init_from_path(&self.config_path)
    }
}

pub fn longs(values: &[i64]) -> ValueBatch {
    ValueBatch::new(Arc::new(Int64Array::from(values.to_vec())) as ArrayRef)
}

pub fn doubles(values: &[f64]) -> ValueBatch {
    ValueBatch::new(Arc::new(Float64Array::from(values.to_vec())) as ArrayRef)
}

pub fn long_lists(rows: &[Vec<i64>]) -> ValueBatch {
    let list = ListArray::from_iter_primitive::<Int64Type, _, _>(
        rows.iter()
            .map(|row| Some(row.iter().copied().map(Some).collect::<Vec<_>>())),
    );
    ValueBatch::new(Arc::new(list) as ArrayRef)
}

/// Whole-table aggregate of `batch`, extracted.
pub fn aggregate_all(function: &AggregationFunction, batch: &ValueBatch) -> IntermediateResult {
    let mut holder = function.create_aggregation_result_holder().unwrap();
    function
        .aggregate(batch.len(), &mut holder, std::slice::from_ref(batch))
        .unwrap();
    function.extract_aggregation_result(&holder)
}

/// Every SV function, percentile and HLL with fixed configuration.
pub fn sv_functions() -> Vec<AggregationFunction> {
    vec![
        AggregationFunction::from_type(AggregationFunctionType::Count),
        AggregationFunction::from_type(AggregationFunctionType::Min),
        AggregationFunction::from_type(AggregationFunctionType::Max),
        AggregationFunction::from_type(AggregationFunctionType::Sum),
        AggregationFunction::from_type(AggregationFunctionType::Avg),
        AggregationFunction::from_type(AggregationFunctionType::MinMaxRange),
        AggregationFunction::from_type(AggregationFunctionType::DistinctCount),
        AggregationFunction::from_name("distinctcounthll").unwrap(),
        AggregationFunction::from_name("percentile90").unwrap(),
    ]
}
