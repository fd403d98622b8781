//
// Copyright 2018 Tamas Blummer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//!
//! # Group configuration
//!

use std::time::Duration;

/// per-peer tuning. `size` is fixed for the group's lifetime; the pump poll
/// interval only trades CPU use against message latency and has no effect on
/// correctness.
#[derive(Clone, Debug)]
pub struct GroupConfig {
    pub size: usize,
    pub pump_poll_interval: Duration,
}

impl GroupConfig {
    pub fn new(size: usize) -> GroupConfig {
        GroupConfig {
            size,
            pump_poll_interval: Duration::from_millis(10),
        }
    }
}
