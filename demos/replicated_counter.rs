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
//! Demo driver reproducing the integer-counter scenario from the spec this
//! crate implements: peer 0 starts the group with an initial value, every
//! peer reads it, then peers take turns writing a new value while the others
//! observe it. Not part of the library's public surface.

use log::{info, Level};
use replikate::{ChannelTransport, GroupConfig, ReplicatedObject, Transport};
use std::sync::Arc;
use std::thread;

const GROUP_SIZE: usize = 3;

fn main() {
    replikate::logging::init(Level::Info);

    let transports = ChannelTransport::<i64>::new_group(GROUP_SIZE);
    let config = GroupConfig::new(GROUP_SIZE);

    let handles: Vec<_> = transports
        .into_iter()
        .map(|transport| {
            let config = config.clone();
            thread::spawn(move || run_peer(transport, config))
        })
        .collect();

    for handle in handles {
        handle.join().expect("peer thread panicked");
    }
}

fn run_peer(transport: ChannelTransport<i64>, config: GroupConfig) {
    let rank = transport.rank();
    let size = transport.size();
    let transport: Arc<dyn Transport<i64>> = Arc::new(transport);

    let initial_value = if rank == 0 { Some(42) } else { None };
    let obj = ReplicatedObject::new(transport.clone(), config, initial_value)
        .expect("construct replicated object");

    transport.barrier();
    let value = obj.read().expect("read");
    info!("peer={} read value: {}", rank, value);

    transport.barrier();
    for turn in 0..size {
        if turn == rank {
            let new_value = 100 + rank as i64;
            info!("peer={} writing value: {}", rank, new_value);
            obj.write(new_value).expect("write");
        }
        transport.barrier();

        let updated = obj.read().expect("read after turn");
        info!("peer={} read value after turn {}: {}", rank, turn, updated);
        transport.barrier();
    }
}
