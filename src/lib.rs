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
//! # replikate
//!
//! A replicated shared object across a fixed group of peers, backed by a
//! token-based multiple-readers/single-writer protocol: the group owns N
//! tokens (N = peer count); holding at least one authorizes reading the local
//! replica, holding all N authorizes writing. See `dist_obj::ReplicatedObject`
//! for the public surface and `token_manager::TokenManager` for the
//! coordination protocol itself.
//!

pub mod config;
pub mod dist_obj;
pub mod error;
pub mod logging;
pub mod message;
pub mod token_manager;
pub mod transport;

pub use config::GroupConfig;
pub use dist_obj::ReplicatedObject;
pub use error::{ReplError, Result};
pub use transport::{ChannelTransport, Transport};
