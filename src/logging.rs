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
//! # Logging
//!
//! Library code only ever calls the `log` macros; it never installs a logger
//! itself. This is the one place that does, for use by the demo binary.
//!

use log::Level;

/// install a simple stderr logger at the given level. Call once, from a binary.
pub fn init(level: Level) {
    simple_logger::init_with_level(level).unwrap_or(());
}
