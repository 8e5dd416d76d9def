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
//! Byte encoding of intermediate results shipped between partitions.
//!
//! Layout: `[version u8][tag u8][payload]`, all integers little-endian.

use crate::common::error::{AggError, AggResult};

use super::hll::{MAX_LOG2M, MIN_LOG2M};
use super::{
    AvgPair, DistinctKey, DistinctSet, HyperLogLog, IntermediateResult, MinMaxRangePair, ValueList,
};

const CODEC_VERSION: u8 = 1;

const TAG_LONG: u8 = 1;
const TAG_DOUBLE: u8 = 2;
const TAG_AVG_PAIR: u8 = 3;
const TAG_MIN_MAX_RANGE: u8 = 4;
const TAG_DISTINCT_SET: u8 = 5;
const TAG_HLL: u8 = 6;
const TAG_VALUE_LIST: u8 = 7;

const KEY_LONG: u8 = 1;
const KEY_DOUBLE: u8 = 2;
const KEY_UTF8: u8 = 3;

pub fn serialize_intermediate(result: &IntermediateResult) -> AggResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(16);
    buf.push(CODEC_VERSION);
    match result {
        IntermediateResult::Long(v) => {
            buf.push(TAG_LONG);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        IntermediateResult::Double(v) => {
            buf.push(TAG_DOUBLE);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        IntermediateResult::AvgPair(pair) => {
            buf.push(TAG_AVG_PAIR);
            buf.extend_from_slice(&pair.sum.to_le_bytes());
            buf.extend_from_slice(&pair.count.to_le_bytes());
        }
        IntermediateResult::MinMaxRange(pair) => {
            buf.push(TAG_MIN_MAX_RANGE);
            buf.extend_from_slice(&pair.min.to_le_bytes());
            buf.extend_from_slice(&pair.max.to_le_bytes());
        }
        IntermediateResult::DistinctSet(set) => {
            buf.push(TAG_DISTINCT_SET);
            write_len(&mut buf, set.len())?;
            for key in set.sorted_keys() {
                write_key(&mut buf, key)?;
            }
        }
        IntermediateResult::Hll(hll) => {
            buf.push(TAG_HLL);
            buf.push(hll.log2m());
            buf.extend_from_slice(hll.registers());
        }
        IntermediateResult::ValueList(list) => {
            buf.push(TAG_VALUE_LIST);
            write_len(&mut buf, list.len())?;
            for v in list.values() {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    Ok(buf)
}

pub fn deserialize_intermediate(data: &[u8]) -> AggResult<IntermediateResult> {
    let mut offset = 0usize;
    let version = read_u8(data, &mut offset)?;
    if version != CODEC_VERSION {
        return Err(AggError::codec(format!(
            "unsupported intermediate codec version {version}"
        )));
    }
    let tag = read_u8(data, &mut offset)?;
    let result = match tag {
        TAG_LONG => IntermediateResult::Long(read_i64_le(data, &mut offset)?),
        TAG_DOUBLE => IntermediateResult::Double(read_f64_le(data, &mut offset)?),
        TAG_AVG_PAIR => {
            let sum = read_f64_le(data, &mut offset)?;
            let count = read_i64_le(data, &mut offset)?;
            IntermediateResult::AvgPair(AvgPair::new(sum, count))
        }
        TAG_MIN_MAX_RANGE => {
            let min = read_f64_le(data, &mut offset)?;
            let max = read_f64_le(data, &mut offset)?;
            IntermediateResult::MinMaxRange(MinMaxRangePair::new(min, max))
        }
        TAG_DISTINCT_SET => {
            let len = read_u32_le(data, &mut offset)? as usize;
            let mut keys = Vec::with_capacity(len.min(data.len()));
            for _ in 0..len {
                keys.push(read_key(data, &mut offset)?);
            }
            IntermediateResult::DistinctSet(keys.into_iter().collect::<DistinctSet>())
        }
        TAG_HLL => {
            let log2m = read_u8(data, &mut offset)?;
            if !(MIN_LOG2M..=MAX_LOG2M).contains(&log2m) {
                return Err(AggError::codec(format!("invalid hll log2m {log2m}")));
            }
            let registers = read_bytes(data, &mut offset, 1usize << log2m)?;
            IntermediateResult::Hll(HyperLogLog::from_registers(log2m, registers.to_vec())?)
        }
        TAG_VALUE_LIST => {
            let len = read_u32_le(data, &mut offset)? as usize;
            let mut values = Vec::with_capacity(len.min(data.len() / 8));
            for _ in 0..len {
                values.push(read_f64_le(data, &mut offset)?);
            }
            IntermediateResult::ValueList(ValueList::from_values(values))
        }
        other => {
            return Err(AggError::codec(format!(
                "unknown intermediate result tag {other}"
            )));
        }
    };
    if offset != data.len() {
        return Err(AggError::codec(format!(
            "{} trailing bytes after {} intermediate result",
            data.len() - offset,
            result.variant_name()
        )));
    }
    Ok(result)
}

fn write_len(buf: &mut Vec<u8>, len: usize) -> AggResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| AggError::codec(format!("collection too large to encode: {len}")))?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_key(buf: &mut Vec<u8>, key: &DistinctKey) -> AggResult<()> {
    match key {
        DistinctKey::Long(v) => {
            buf.push(KEY_LONG);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        DistinctKey::Double(bits) => {
            buf.push(KEY_DOUBLE);
            buf.extend_from_slice(&bits.to_le_bytes());
        }
        DistinctKey::Utf8(s) => {
            buf.push(KEY_UTF8);
            write_len(buf, s.len())?;
            buf.extend_from_slice(s.as_bytes());
        }
    }
    Ok(())
}

fn read_key(data: &[u8], offset: &mut usize) -> AggResult<DistinctKey> {
    match read_u8(data, offset)? {
        KEY_LONG => Ok(DistinctKey::Long(read_i64_le(data, offset)?)),
        KEY_DOUBLE => Ok(DistinctKey::Double(read_i64_le(data, offset)? as u64)),
        KEY_UTF8 => {
            let len = read_u32_le(data, offset)? as usize;
            let bytes = read_bytes(data, offset, len)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| AggError::codec(format!("invalid utf8 distinct key: {e}")))?;
            Ok(DistinctKey::Utf8(s.to_string()))
        }
        other => Err(AggError::codec(format!("unknown distinct key tag {other}"))),
    }
}

fn read_bytes<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> AggResult<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| AggError::codec("intermediate result data truncated"))?;
    let bytes = &data[*offset..end];
    *offset = end;
    Ok(bytes)
}

fn read_u8(data: &[u8], offset: &mut usize) -> AggResult<u8> {
    Ok(read_bytes(data, offset, 1)?[0])
}

fn read_u32_le(data: &[u8], offset: &mut usize) -> AggResult<u32> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(read_bytes(data, offset, 4)?);
    Ok(u32::from_le_bytes(buf))
}

fn read_i64_le(data: &[u8], offset: &mut usize) -> AggResult<i64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(read_bytes(data, offset, 8)?);
    Ok(i64::from_le_bytes(buf))
}

fn read_f64_le(data: &[u8], offset: &mut usize) -> AggResult<f64> {
    Ok(f64::from_bits(read_i64_le(data, offset)? as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> Vec<IntermediateResult> {
        let mut hll = HyperLogLog::new(6).expect("hll");
        hll.offer(&DistinctKey::Utf8("x".to_string()));
        vec![
            IntermediateResult::Long(-42),
            IntermediateResult::Double(f64::NEG_INFINITY),
            IntermediateResult::AvgPair(AvgPair::new(7.5, 3)),
            IntermediateResult::MinMaxRange(MinMaxRangePair::default()),
            IntermediateResult::DistinctSet(
                [
                    DistinctKey::Long(1),
                    DistinctKey::from_f64(2.5),
                    DistinctKey::Utf8("héllo".to_string()),
                ]
                .into_iter()
                .collect(),
            ),
            IntermediateResult::Hll(hll),
            IntermediateResult::ValueList(ValueList::from_values(vec![3.0, 1.0, 2.0])),
        ]
    }

    #[test]
    fn every_variant_survives_encoding() {
        for result in sample_results() {
            let bytes = serialize_intermediate(&result).expect("encode");
            let decoded = deserialize_intermediate(&bytes).expect("decode");
            assert_eq!(decoded, result, "{}", result.variant_name());
        }
    }

    #[test]
    fn distinct_set_encoding_is_deterministic() {
        let a: DistinctSet = (0..50).map(DistinctKey::Long).collect();
        let b: DistinctSet = (0..50).rev().map(DistinctKey::Long).collect();
        assert_eq!(
            serialize_intermediate(&IntermediateResult::DistinctSet(a)).expect("a"),
            serialize_intermediate(&IntermediateResult::DistinctSet(b)).expect("b")
        );
    }

    #[test]
    fn malformed_bytes_are_codec_errors() {
        let bytes = serialize_intermediate(&IntermediateResult::Long(1)).expect("encode");
        assert!(matches!(
            deserialize_intermediate(&bytes[..bytes.len() - 1]),
            Err(AggError::Codec(_))
        ));
        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            deserialize_intermediate(&trailing),
            Err(AggError::Codec(_))
        ));
        assert!(matches!(
            deserialize_intermediate(&[CODEC_VERSION, 99]),
            Err(AggError::Codec(_))
        ));
        assert!(matches!(
            deserialize_intermediate(&[]),
            Err(AggError::Codec(_))
        ));
    }
}
