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
use arrow::error::ArrowError;
use thiserror::Error;

/// Errors raised while accumulating, merging or projecting aggregates.
///
/// Every variant is fatal for the current query: holders are mutated in place,
/// so the caller has to restart the affected aggregation from scratch.
#[derive(Error, Debug)]
pub enum AggError {
    /// Caller broke the call contract (batch/key length, lifecycle, holder config).
    #[error("aggregate contract violation: {0}")]
    ContractViolation(String),

    /// A group-by holder is full and its function has no ordering to trim by.
    #[error(
        "group-by capacity exceeded for {function}: {live_groups} groups at max capacity {max_capacity}"
    )]
    CapacityExceeded {
        function: String,
        live_groups: usize,
        max_capacity: usize,
    },

    /// Intermediate results do not belong to the same function configuration.
    #[error("aggregate type mismatch: {0}")]
    TypeMismatch(String),

    /// The function does not accept this kind of input (e.g. SV call on an MV column).
    #[error("unsupported aggregate call: {0}")]
    Unsupported(String),

    /// Partition worker was cancelled before finishing.
    #[error("aggregation cancelled: {0}")]
    Cancelled(String),

    #[error("malformed intermediate result encoding: {0}")]
    Codec(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

pub type AggResult<T> = Result<T, AggError>;

impl AggError {
    pub fn contract(msg: impl Into<String>) -> Self {
        AggError::ContractViolation(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        AggError::TypeMismatch(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        AggError::Unsupported(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        AggError::Codec(msg.into())
    }
}
