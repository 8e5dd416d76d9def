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
//! Partition-parallel aggregation.
//!
//! Each partition runs on one pool thread with holders it owns exclusively.
//! Partition results are merged only after every partition finished cleanly; a
//! failure or cancellation anywhere fails the whole execution and no partial
//! holder is ever merged.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use threadpool::ThreadPool;

use crate::common::config;
use crate::common::error::{AggError, AggResult};
use crate::exec::expr::agg::{
    AggregationFunction, IntermediateResult, ValueBatch, reduce,
};
use crate::novarocks_logging::{debug, info, warn};
use crate::runtime::mem_tracker::MemTracker;

#[derive(Clone, Debug, Default)]
pub struct PartitionCancelToken {
    cancelled: Arc<AtomicBool>,
}

impl PartitionCancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn check(&self, partition: usize) -> AggResult<()> {
        if self.is_cancelled() {
            return Err(AggError::Cancelled(format!("partition {partition}")));
        }
        Ok(())
    }
}

/// Rows of one whole-table aggregate call.
#[derive(Clone, Debug)]
pub struct AggregationBlock {
    pub length: usize,
    pub batches: Vec<ValueBatch>,
}

#[derive(Clone, Debug)]
pub enum GroupKeys {
    Single(Vec<u32>),
    Multi(Vec<Vec<u32>>),
}

/// Rows of one group-by call with their dense group keys.
#[derive(Clone, Debug)]
pub struct GroupByBlock {
    pub length: usize,
    pub group_keys: GroupKeys,
    pub batches: Vec<ValueBatch>,
}

/// One partition's group-by input. `dictionary[k]` is the external group value
/// of dense key `k`.
#[derive(Clone, Debug)]
pub struct GroupByPartition<K> {
    pub dictionary: Vec<K>,
    pub blocks: Vec<GroupByBlock>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupByCapacity {
    pub initial_capacity: usize,
    pub max_capacity: usize,
    pub trim_size: usize,
}

impl GroupByCapacity {
    pub fn from_config() -> Self {
        Self {
            initial_capacity: config::group_by_initial_capacity(),
            max_capacity: config::group_by_max_capacity(),
            trim_size: config::group_by_trim_size(),
        }
    }
}

pub struct PartitionExecutor {
    pool: ThreadPool,
    capacity: GroupByCapacity,
    mem_tracker: Option<Arc<MemTracker>>,
}

impl PartitionExecutor {
    pub fn new(num_threads: usize) -> Self {
        let threads = num_threads.max(1);
        Self {
            pool: ThreadPool::with_name("agg_partition".to_string(), threads),
            capacity: GroupByCapacity::from_config(),
            mem_tracker: None,
        }
    }

    /// Pool sized by `[exec] partition_threads`.
    pub fn from_config() -> Self {
        Self::new(config::partition_threads())
    }

    pub fn with_group_by_capacity(mut self, capacity: GroupByCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Group-by holders charge a per-partition child of `tracker`.
    pub fn with_mem_tracker(mut self, tracker: Arc<MemTracker>) -> Self {
        self.mem_tracker = Some(tracker);
        self
    }

    pub fn num_threads(&self) -> usize {
        self.pool.max_count()
    }

    /// Whole-table aggregate over every partition, merged in partition order.
    pub fn aggregate(
        &self,
        function: AggregationFunction,
        partitions: Vec<Vec<AggregationBlock>>,
        cancel: &PartitionCancelToken,
    ) -> AggResult<IntermediateResult> {
        let results = self.run(partitions, cancel, move |idx, blocks, cancel| {
            let mut holder = function.create_aggregation_result_holder()?;
            for block in &blocks {
                cancel.check(idx)?;
                function.aggregate(block.length, &mut holder, &block.batches)?;
            }
            cancel.check(idx)?;
            Ok(function.extract_aggregation_result(&holder))
        })?;
        reduce::merge_tree(&function, results)
    }

    /// Group-by aggregate; groups from different partitions meet by external
    /// value, not by dense key.
    pub fn aggregate_group_by<K>(
        &self,
        function: AggregationFunction,
        partitions: Vec<GroupByPartition<K>>,
        cancel: &PartitionCancelToken,
    ) -> AggResult<BTreeMap<K, IntermediateResult>>
    where
        K: Ord + Clone + Send + 'static,
    {
        let capacity = self.capacity;
        let tracker = self.mem_tracker.clone();
        let results = self.run(partitions, cancel, move |idx, partition, cancel| {
            let mut holder = function.create_group_by_result_holder(
                capacity.initial_capacity,
                capacity.max_capacity,
                capacity.trim_size,
            )?;
            if let Some(parent) = tracker.as_ref() {
                let child = MemTracker::new_child(format!("agg_partition_{idx}"), parent);
                holder = holder.with_mem_tracker(child);
            }
            for block in &partition.blocks {
                cancel.check(idx)?;
                match &block.group_keys {
                    GroupKeys::Single(keys) => function.aggregate_group_by_sv(
                        block.length,
                        keys,
                        &mut holder,
                        &block.batches,
                    )?,
                    GroupKeys::Multi(keys) => function.aggregate_group_by_mv(
                        block.length,
                        keys,
                        &mut holder,
                        &block.batches,
                    )?,
                }
            }
            cancel.check(idx)?;
            if holder.num_trims() > 0 {
                debug!(
                    "partition {} trimmed {} times, {} groups left",
                    idx,
                    holder.num_trims(),
                    holder.num_groups()
                );
            }
            reduce::extract_keyed(&function, &holder, &partition.dictionary)
        })?;
        reduce::merge_group_by(&function, results)
    }

    /// Runs `task` once per partition and returns results in partition order.
    fn run<P, T, F>(
        &self,
        partitions: Vec<P>,
        cancel: &PartitionCancelToken,
        task: F,
    ) -> AggResult<Vec<T>>
    where
        P: Send + 'static,
        T: Send + 'static,
        F: Fn(usize, P, &PartitionCancelToken) -> AggResult<T> + Send + Sync + 'static,
    {
        let num_partitions = partitions.len();
        info!(
            "aggregate {} partitions on {} threads",
            num_partitions,
            self.num_threads()
        );
        let task = Arc::new(task);
        let (tx, rx) = mpsc::channel::<(usize, AggResult<T>)>();
        for (idx, partition) in partitions.into_iter().enumerate() {
            let tx = tx.clone();
            let task = Arc::clone(&task);
            let cancel = cancel.clone();
            self.pool.execute(move || {
                let result = task(idx, partition, &cancel);
                // receiver is gone once another partition failed
                let _ = tx.send((idx, result));
            });
        }
        drop(tx);

        let mut results: Vec<Option<T>> = (0..num_partitions).map(|_| None).collect();
        for _ in 0..num_partitions {
            let (idx, result) = rx.recv().map_err(|_| {
                cancel.cancel();
                AggError::Cancelled("partition worker exited without a result".to_string())
            })?;
            match result {
                Ok(value) => {
                    debug!("partition {} finished", idx);
                    results[idx] = Some(value);
                }
                Err(err) => {
                    warn!("partition {} failed, cancelling aggregation: {}", idx, err);
                    cancel.cancel();
                    return Err(err);
                }
            }
        }
        results
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                value.ok_or_else(|| AggError::contract(format!("partition {idx} reported twice")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array};

    use super::*;
    use crate::exec::expr::agg::AggregationFunctionType;

    fn longs(values: &[i64]) -> ValueBatch {
        ValueBatch::new(Arc::new(Int64Array::from(values.to_vec())) as ArrayRef)
    }

    fn block(values: &[i64]) -> AggregationBlock {
        AggregationBlock {
            length: values.len(),
            batches: vec![longs(values)],
        }
    }

    #[test]
    fn partitions_merge_to_whole_table_result() {
        let executor = PartitionExecutor::new(3);
        let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
        let partitions = vec![
            vec![block(&[1, 2]), block(&[3])],
            vec![],
            vec![block(&[4, 5])],
        ];
        let result = executor
            .aggregate(sum, partitions, &PartitionCancelToken::new())
            .expect("aggregate");
        assert_eq!(result, IntermediateResult::Double(15.0));
    }

    #[test]
    fn cancelled_execution_returns_no_result() {
        let executor = PartitionExecutor::new(2);
        let count = AggregationFunction::from_type(AggregationFunctionType::Count);
        let cancel = PartitionCancelToken::new();
        cancel.cancel();
        let err = executor
            .aggregate(count, vec![vec![block(&[1])]], &cancel)
            .expect_err("cancelled");
        assert!(matches!(err, AggError::Cancelled(_)));
    }

    #[test]
    fn failing_partition_fails_execution() {
        let executor = PartitionExecutor::new(2);
        let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
        let bad = AggregationBlock {
            length: 5,
            batches: vec![longs(&[1])],
        };
        let err = executor
            .aggregate(sum, vec![vec![block(&[1])], vec![bad]], &PartitionCancelToken::new())
            .expect_err("short batch");
        assert!(matches!(err, AggError::ContractViolation(_)));
    }

    #[test]
    fn group_by_partitions_meet_by_external_value() {
        let executor = PartitionExecutor::new(2).with_group_by_capacity(GroupByCapacity {
            initial_capacity: 2,
            max_capacity: 16,
            trim_size: 4,
        });
        let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
        let p0 = GroupByPartition {
            dictionary: vec!["a".to_string(), "b".to_string()],
            blocks: vec![GroupByBlock {
                length: 3,
                group_keys: GroupKeys::Single(vec![0, 1, 0]),
                batches: vec![longs(&[1, 2, 3])],
            }],
        };
        // same external values, different dense keys
        let p1 = GroupByPartition {
            dictionary: vec!["b".to_string(), "c".to_string()],
            blocks: vec![GroupByBlock {
                length: 2,
                group_keys: GroupKeys::Multi(vec![vec![0, 1], vec![0]]),
                batches: vec![longs(&[10, 20])],
            }],
        };
        let merged = executor
            .aggregate_group_by(sum, vec![p0, p1], &PartitionCancelToken::new())
            .expect("group by");
        assert_eq!(
            merged,
            BTreeMap::from([
                ("a".to_string(), IntermediateResult::Double(4.0)),
                ("b".to_string(), IntermediateResult::Double(32.0)),
                ("c".to_string(), IntermediateResult::Double(10.0)),
            ])
        );
    }
}
