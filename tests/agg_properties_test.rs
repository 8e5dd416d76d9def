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

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use novarocks_agg::exec::expr::agg::{
    AggregationFunction, AggregationFunctionType, FinalResult, IntermediateResult,
};

use common::{aggregate_all, longs, sv_functions};

fn random_values(rng: &mut StdRng, len: usize) -> Vec<i64> {
    (0..len).map(|_| rng.gen_range(-50..50)).collect()
}

fn finalize(function: &AggregationFunction, result: &IntermediateResult) -> FinalResult {
    function.extract_final_result(result).unwrap()
}

#[test]
fn merge_is_associative_and_commutative() {
    let mut rng = StdRng::seed_from_u64(7);
    for function in sv_functions() {
        for _ in 0..8 {
            let a = aggregate_all(&function, &longs(&random_values(&mut rng, 6)));
            let b = aggregate_all(&function, &longs(&random_values(&mut rng, 3)));
            let c = aggregate_all(&function, &longs(&random_values(&mut rng, 5)));

            let left = function.merge(&function.merge(&a, &b).unwrap(), &c).unwrap();
            let right = function.merge(&a, &function.merge(&b, &c).unwrap()).unwrap();
            assert_eq!(
                finalize(&function, &left),
                finalize(&function, &right),
                "{} associativity",
                function.name()
            );

            let ab = function.merge(&a, &b).unwrap();
            let ba = function.merge(&b, &a).unwrap();
            assert_eq!(
                finalize(&function, &ab),
                finalize(&function, &ba),
                "{} commutativity",
                function.name()
            );
        }
    }
}

#[test]
fn identity_is_neutral_for_merge() {
    for function in sv_functions() {
        let state = aggregate_all(&function, &longs(&[4, -2, 9, 9]));
        let identity = function.identity().unwrap();
        assert_eq!(function.merge(&state, &identity).unwrap(), state, "{}", function.name());
        assert_eq!(function.merge(&identity, &state).unwrap(), state, "{}", function.name());
    }
}

#[test]
fn every_split_point_matches_whole_input() {
    let values = [5, -3, 12, 0, 7, 7, -8, 21, 4];
    let batch = longs(&values);
    for function in sv_functions() {
        let whole = finalize(&function, &aggregate_all(&function, &batch));
        for k in 0..=values.len() {
            let head = aggregate_all(&function, &batch.slice(0, k));
            let tail = aggregate_all(&function, &batch.slice(k, values.len() - k));
            let merged = function.merge(&head, &tail).unwrap();
            assert_eq!(
                finalize(&function, &merged),
                whole,
                "{} split at {}",
                function.name(),
                k
            );
        }
    }
}

#[test]
fn row_order_does_not_change_final_result() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut values = random_values(&mut rng, 40);
    for function in sv_functions() {
        let expected = finalize(&function, &aggregate_all(&function, &longs(&values)));
        for _ in 0..5 {
            values.shuffle(&mut rng);
            let actual = finalize(&function, &aggregate_all(&function, &longs(&values)));
            assert_eq!(actual, expected, "{}", function.name());
        }
    }
}

#[test]
fn growth_keeps_every_group_state() {
    let sum = AggregationFunction::from_type(AggregationFunctionType::Sum);
    let mut holder = sum.create_group_by_result_holder(1, 1024, 16).unwrap();
    let mut expected: BTreeMap<u32, f64> = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..6 {
        let keys: Vec<u32> = (0..64).map(|_| rng.gen_range(0..300)).collect();
        let values = random_values(&mut rng, keys.len());
        for (key, value) in keys.iter().zip(&values) {
            *expected.entry(*key).or_default() += *value as f64;
        }
        sum.aggregate_group_by_sv(keys.len(), &keys, &mut holder, &[longs(&values)])
            .unwrap();
    }
    assert_eq!(holder.num_trims(), 0);
    assert!(holder.capacity() >= expected.len());
    let actual: BTreeMap<u32, f64> = sum
        .extract_group_by_results(&holder)
        .into_iter()
        .map(|(key, result)| (key, finalize(&sum, &result).as_f64()))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn trim_keeps_the_best_groups() {
    let max = AggregationFunction::from_type(AggregationFunctionType::Max);
    let mut rng = StdRng::seed_from_u64(11);
    let values: Vec<i64> = (0..32).map(|_| rng.gen_range(0..10)).collect();
    let keys: Vec<u32> = (0..32).collect();

    let mut holder = max.create_group_by_result_holder(4, 32, 5).unwrap();
    max.aggregate_group_by_sv(32, &keys, &mut holder, &[longs(&values)])
        .unwrap();
    assert_eq!(holder.num_trims(), 0);

    // one more key forces a trim; ties break toward smaller keys
    max.aggregate_group_by_sv(1, &[32], &mut holder, &[longs(&[-1])])
        .unwrap();
    assert_eq!(holder.num_trims(), 1);

    let mut ranked: Vec<(u32, i64)> = keys.iter().copied().zip(values.iter().copied()).collect();
    ranked.sort_by(|a, b| match b.1.cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        ord => ord,
    });
    let mut expected: Vec<u32> = ranked.iter().take(5).map(|(k, _)| *k).collect();
    expected.push(32);
    expected.sort_unstable();
    assert_eq!(holder.group_keys(), expected);

    for key in &expected[..5] {
        assert_eq!(
            max.extract_group_by_result(&holder, *key),
            IntermediateResult::Double(values[*key as usize] as f64)
        );
    }
}

#[test]
fn final_extraction_is_pure() {
    for function in sv_functions() {
        let state = aggregate_all(&function, &longs(&[3, 1, 4, 1, 5, 9, 2, 6]));
        let before = state.clone();
        let first = finalize(&function, &state);
        let second = finalize(&function, &state);
        assert_eq!(first, second, "{}", function.name());
        assert_eq!(state, before, "{}", function.name());
        assert_eq!(first.column_type(), function.final_result_column_type());
    }
}

#[test]
fn comparable_functions_order_like_their_finals() {
    let mut rng = StdRng::seed_from_u64(5);
    for function in sv_functions()
        .into_iter()
        .filter(|f| f.is_intermediate_result_comparable())
    {
        for _ in 0..10 {
            let a = aggregate_all(&function, &longs(&random_values(&mut rng, 4)));
            let b = aggregate_all(&function, &longs(&random_values(&mut rng, 4)));
            let by_state = function.compare_intermediate_results(&a, &b).unwrap();
            let by_final = finalize(&function, &a).cmp(&finalize(&function, &b));
            assert_eq!(by_state, by_final, "{}", function.name());
        }
    }
}
