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
use crate::novarocks_config::config as novarocks_app_config;

pub(crate) fn group_by_initial_capacity() -> usize {
    novarocks_app_config()
        .ok()
        .map(|c| c.group_by.effective_initial_capacity())
        .unwrap_or(1024)
}

pub(crate) fn group_by_max_capacity() -> usize {
    novarocks_app_config()
        .ok()
        .map(|c| c.group_by.max_capacity)
        .unwrap_or(100_000)
}

pub(crate) fn group_by_trim_size() -> usize {
    novarocks_app_config()
        .ok()
        .map(|c| c.group_by.trim_size)
        .unwrap_or(5_000)
}

pub(crate) fn partition_threads() -> usize {
    novarocks_app_config()
        .ok()
        .map(|c| c.exec.actual_partition_threads())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

pub(crate) fn hll_log2m() -> u8 {
    novarocks_app_config()
        .ok()
        .map(|c| c.hll.log2m)
        .unwrap_or(8)
}
