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
mod common;

use std::collections::BTreeMap;

use novarocks_agg::exec::expr::agg::{
    AggregationFunction, AggregationFunctionType, FinalResult, IntermediateResult,
};
use novarocks_agg::{AggError, ColumnDataType};

use common::{aggregate_all, long_lists, longs};

fn group_sums(function: &AggregationFunction, results: Vec<(u32, IntermediateResult)>) -> BTreeMap<u32, f64> {
    results
        .into_iter()
        .map(|(key, r)| (key, function.extract_final_result(&r).unwrap().as_f64()))
        .collect()
}

#[test]
fn sum_single_holder_and_split_merge() {
    let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
    let whole = aggregate_all(&sum, &longs(&[1, 2, 3, 4, 5]));
    assert_eq!(whole, IntermediateResult::Double(15.0));

    let left = aggregate_all(&sum, &longs(&[1, 2, 3]));
    let right = aggregate_all(&sum, &longs(&[4, 5]));
    assert_eq!(left, IntermediateResult::Double(6.0));
    assert_eq!(right, IntermediateResult::Double(9.0));
    assert_eq!(sum.merge(&left, &right).unwrap(), whole);
}

#[test]
fn sum_group_by_single_value_keys() {
    let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
    let mut holder = sum.create_group_by_result_holder(2, 16, 4).unwrap();
    sum.aggregate_group_by_sv(
        5,
        &[0, 1, 0, 1, 2],
        &mut holder,
        &[longs(&[10, 20, 30, 40, 50])],
    )
    .unwrap();
    let results = sum.extract_group_by_results(&holder);
    assert_eq!(
        group_sums(&sum, results),
        BTreeMap::from([(0, 40.0), (1, 60.0), (2, 50.0)])
    );
}

#[test]
fn sum_group_by_multi_value_keys_fans_out() {
    let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
    let mut holder = sum.create_group_by_result_holder(2, 16, 4).unwrap();
    let keys: Vec<Vec<u32>> = vec![vec![0, 1], vec![1]];
    sum.aggregate_group_by_mv(2, &keys, &mut holder, &[longs(&[5, 3])])
        .unwrap();
    assert_eq!(
        sum.extract_group_by_result(&holder, 0),
        IntermediateResult::Double(5.0)
    );
    assert_eq!(
        sum.extract_group_by_result(&holder, 1),
        IntermediateResult::Double(8.0)
    );
}

#[test]
fn rows_without_group_keys_contribute_nothing() {
    let count = AggregationFunction::from_type(AggregationFunctionType::Count);
    let mut holder = count.create_group_by_result_holder(1, 4, 2).unwrap();
    let keys: Vec<&[u32]> = vec![&[], &[3], &[]];
    count
        .aggregate_group_by_mv(3, &keys, &mut holder, &[])
        .unwrap();
    assert_eq!(holder.group_keys(), vec![3]);
    assert_eq!(
        count.extract_group_by_result(&holder, 3),
        IntermediateResult::Long(1)
    );
}

#[test]
fn max_group_by_trims_to_best_groups() {
    let max = AggregationFunction::from_type(AggregationFunctionType::Max);
    assert!(max.is_intermediate_result_comparable());
    let mut holder = max.create_group_by_result_holder(4, 8, 2).unwrap();
    let values = [3, 17, 8, 1, 12, 5, 9, 2, 4, 6];

    let keys: Vec<u32> = (0..8).collect();
    max.aggregate_group_by_sv(8, &keys, &mut holder, &[longs(&values[..8])])
        .unwrap();
    assert_eq!(holder.num_groups(), 8);
    assert_eq!(holder.num_trims(), 0);

    // the trim leaves exactly the two best groups, then the new key takes a freed slot
    max.aggregate_group_by_sv(1, &[8], &mut holder, &[longs(&values[8..9])])
        .unwrap();
    assert_eq!(holder.num_trims(), 1);
    assert_eq!(holder.num_groups(), 2 + 1);
    assert_eq!(holder.group_keys(), vec![1, 4, 8]);
    assert_eq!(max.extract_group_by_result(&holder, 1), IntermediateResult::Double(17.0));
    assert_eq!(max.extract_group_by_result(&holder, 4), IntermediateResult::Double(12.0));
}

#[test]
fn max_group_by_keeps_new_keys_after_trim() {
    let max = AggregationFunction::from_type(AggregationFunctionType::Max);
    let mut holder = max.create_group_by_result_holder(4, 8, 2).unwrap();
    let keys: Vec<u32> = (0..10).collect();
    let values = [3, 17, 8, 1, 12, 5, 9, 2, 4, 6];
    max.aggregate_group_by_sv(10, &keys, &mut holder, &[longs(&values)])
        .unwrap();

    // key 8 triggers the only trim; keys 8 and 9 arrive after it
    assert_eq!(holder.num_trims(), 1);
    assert_eq!(holder.group_keys(), vec![1, 4, 8, 9]);
    assert_eq!(max.extract_group_by_result(&holder, 9), IntermediateResult::Double(6.0));
    assert_eq!(max.extract_group_by_result(&holder, 0), max.identity().unwrap());
}

#[test]
fn distinct_count_merges_sets_not_counts() {
    let dc = AggregationFunction::from_type(AggregationFunctionType::DistinctCount);
    let a = aggregate_all(&dc, &longs(&[1, 2, 3]));
    let b = aggregate_all(&dc, &longs(&[3, 4, 5]));
    let merged = dc.merge(&a, &b).unwrap();
    assert_eq!(dc.extract_final_result(&merged).unwrap(), FinalResult::Long(5));
}

#[test]
fn distinct_count_cannot_trim() {
    let dc = AggregationFunction::from_type(AggregationFunctionType::DistinctCount);
    let mut holder = dc.create_group_by_result_holder(2, 4, 2).unwrap();
    let err = dc
        .aggregate_group_by_sv(5, &[0, 1, 2, 3, 4], &mut holder, &[longs(&[1, 2, 3, 4, 5])])
        .unwrap_err();
    assert!(matches!(err, AggError::CapacityExceeded { .. }), "{err}");
}

#[test]
fn sv_and_mv_calls_are_checked() {
    let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
    let sum_mv = AggregationFunction::from_type(AggregationFunctionType::SumMv);
    let lists = long_lists(&[vec![1, 2], vec![3]]);

    let mut holder = sum.create_aggregation_result_holder().unwrap();
    assert!(matches!(
        sum.aggregate(2, &mut holder, &[lists.clone()]),
        Err(AggError::Unsupported(_))
    ));

    let mut holder = sum_mv.create_aggregation_result_holder().unwrap();
    assert!(matches!(
        sum_mv.aggregate(2, &mut holder, &[longs(&[1, 2])]),
        Err(AggError::Unsupported(_))
    ));
    sum_mv.aggregate(2, &mut holder, &[lists]).unwrap();
    assert_eq!(
        sum_mv.extract_aggregation_result(&holder),
        IntermediateResult::Double(6.0)
    );
}

#[test]
fn declared_column_types() {
    let cases = [
        ("count", ColumnDataType::Long, ColumnDataType::Long, true),
        ("sum", ColumnDataType::Double, ColumnDataType::Double, true),
        ("avg", ColumnDataType::Object, ColumnDataType::Double, true),
        ("minmaxrange", ColumnDataType::Object, ColumnDataType::Double, true),
        ("distinctcount", ColumnDataType::Object, ColumnDataType::Long, false),
        ("distinctcounthllmv", ColumnDataType::Object, ColumnDataType::Long, false),
        ("percentile50", ColumnDataType::Object, ColumnDataType::Double, false),
    ];
    for (name, intermediate, final_type, comparable) in cases {
        let function = AggregationFunction::from_name(name).unwrap();
        assert_eq!(function.intermediate_result_column_type(), intermediate, "{name}");
        assert_eq!(function.final_result_column_type(), final_type, "{name}");
        assert_eq!(function.is_intermediate_result_comparable(), comparable, "{name}");
    }
}
