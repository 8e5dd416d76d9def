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
//! Aggregation execution engine.
//!
//! An [`AggregationFunction`] accumulates value batches into result holders
//! owned by one worker, extracts [`IntermediateResult`]s, merges them across
//! partitions and projects the merged value into a [`FinalResult`].

mod functions;
mod hll;
pub use hll::{HyperLogLog, MAX_LOG2M, MIN_LOG2M};
mod holder;
pub use holder::{AggregationResultHolder, GroupByResultHolder};
mod kernel;
pub use kernel::{AggregationFunction, AggregationFunctionVisitor, RowTarget};
mod spec;
pub use spec::{AggSpec, AggregationFunctionType};
mod state_types;
pub use state_types::{AvgPair, DistinctKey, DistinctSet, IntermediateResult, MinMaxRangePair, ValueList};
mod views;
pub use views::{AggInputView, MultiValueView, ScalarArrayView, ValueBatch};

pub mod codec;
pub mod projection;
pub use projection::FinalResult;
pub mod reduce;
