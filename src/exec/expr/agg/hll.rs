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
use crate::common::error::{AggError, AggResult};

use super::DistinctKey;

pub const MIN_LOG2M: u8 = 4;
pub const MAX_LOG2M: u8 = 16;

const MURMUR_PRIME: u64 = 0xc6a4_a793_5bd1_e995;
const MURMUR_SEED: u32 = 0xadc8_3b19;

/// Dense HyperLogLog sketch with `2^log2m` one-byte registers.
///
/// Merging takes the register-wise max, so it is associative, commutative and
/// idempotent; two sketches only merge when their `log2m` matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HyperLogLog {
    log2m: u8,
    registers: Vec<u8>,
}

impl HyperLogLog {
    pub fn new(log2m: u8) -> AggResult<Self> {
        if !(MIN_LOG2M..=MAX_LOG2M).contains(&log2m) {
            return Err(AggError::contract(format!(
                "hll log2m must be within [{MIN_LOG2M}, {MAX_LOG2M}], got {log2m}"
            )));
        }
        Ok(Self {
            log2m,
            registers: vec![0u8; 1usize << log2m],
        })
    }

    pub fn from_registers(log2m: u8, registers: Vec<u8>) -> AggResult<Self> {
        let mut hll = Self::new(log2m)?;
        if registers.len() != hll.registers.len() {
            return Err(AggError::codec(format!(
                "hll register count mismatch: expected {}, got {}",
                hll.registers.len(),
                registers.len()
            )));
        }
        hll.registers = registers;
        Ok(hll)
    }

    pub fn log2m(&self) -> u8 {
        self.log2m
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn offer(&mut self, key: &DistinctKey) {
        let hash = match key {
            DistinctKey::Long(v) => murmur_hash64a(&v.to_le_bytes(), MURMUR_SEED),
            DistinctKey::Double(bits) => murmur_hash64a(&bits.to_le_bytes(), MURMUR_SEED),
            DistinctKey::Utf8(s) => murmur_hash64a(s.as_bytes(), MURMUR_SEED),
        };
        self.offer_hash(hash);
    }

    pub fn offer_hash(&mut self, hash: u64) {
        let m = self.registers.len() as u64;
        let idx = (hash & (m - 1)) as usize;
        let mut shifted = hash >> self.log2m;
        shifted |= 1_u64 << (64 - u32::from(self.log2m));
        let rank = shifted.trailing_zeros() as u8 + 1;
        if self.registers[idx] < rank {
            self.registers[idx] = rank;
        }
    }

    pub fn merge(&mut self, other: &HyperLogLog) -> AggResult<()> {
        if self.log2m != other.log2m {
            return Err(AggError::type_mismatch(format!(
                "cannot merge hll sketches with log2m {} and {}",
                self.log2m, other.log2m
            )));
        }
        for (dst, src) in self.registers.iter_mut().zip(other.registers.iter()) {
            if *dst < *src {
                *dst = *src;
            }
        }
        Ok(())
    }

    pub fn cardinality(&self) -> i64 {
        let num_streams = self.registers.len() as f64;
        let alpha = match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / num_streams),
        };

        let mut harmonic_mean = 0.0f64;
        let mut zero_registers = 0usize;
        for register in &self.registers {
            harmonic_mean += 2_f64.powi(-i32::from(*register));
            if *register == 0 {
                zero_registers += 1;
            }
        }
        if zero_registers == self.registers.len() {
            return 0;
        }

        let mut estimate = alpha * num_streams * num_streams / harmonic_mean;
        if estimate <= num_streams * 2.5 && zero_registers != 0 {
            // linear counting for the small range
            estimate = num_streams * (num_streams / zero_registers as f64).ln();
        }
        estimate.max(0.0).round() as i64
    }
}

fn murmur_hash64a(data: &[u8], seed: u32) -> u64 {
    let r: u32 = 47;
    let mut h = (seed as u64) ^ (data.len() as u64).wrapping_mul(MURMUR_PRIME);

    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0u8; 8];
        block.copy_from_slice(chunk);
        let mut k = u64::from_le_bytes(block);
        k = k.wrapping_mul(MURMUR_PRIME);
        k ^= k >> r;
        k = k.wrapping_mul(MURMUR_PRIME);
        h ^= k;
        h = h.wrapping_mul(MURMUR_PRIME);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (idx, byte) in tail.iter().enumerate() {
            h ^= (*byte as u64) << (idx * 8);
        }
        h = h.wrapping_mul(MURMUR_PRIME);
    }

    h ^= h >> r;
    h = h.wrapping_mul(MURMUR_PRIME);
    h ^= h >> r;
    h
}
