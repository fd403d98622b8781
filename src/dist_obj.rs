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
//! # Replicated object
//!
//! Wraps a `TokenManager` and owns the local replica value and the per-peer
//! message pump. `read`/`write` run on the caller's thread and suspend on
//! ledger/ack state maintained by the pump; the pump is the sole owner of the
//! transport's receive side.
//!

use crate::config::GroupConfig;
use crate::error::{ReplError, Result};
use crate::message::{Acknowledge, DataUpdate, Message, NewProcess, ReadRequest};
use crate::token_manager::TokenManager;
use crate::transport::Transport;
use log::{debug, error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::thread::JoinHandle;

struct AckInner {
    awaiting: Option<usize>,
    received: bool,
}

/// lets `write()` synchronously await the `ACKNOWLEDGE` the pump receives for
/// each `DATA_UPDATE` it sends, one peer at a time, without itself touching
/// the transport's receive side.
struct AckWaiter {
    inner: Mutex<AckInner>,
    cv: Condvar,
}

impl AckWaiter {
    fn new() -> AckWaiter {
        AckWaiter {
            inner: Mutex::new(AckInner {
                awaiting: None,
                received: false,
            }),
            cv: Condvar::new(),
        }
    }

    fn expect(&self, peer: usize) {
        let mut guard = self.inner.lock().unwrap();
        guard.awaiting = Some(peer);
        guard.received = false;
    }

    fn wait(&self) {
        let mut guard = self.inner.lock().unwrap();
        while !guard.received {
            guard = self.cv.wait(guard).unwrap();
        }
    }

    /// called by the pump; a stray ack outside an active write (no matching
    /// `awaiting`) is dropped without disturbing state
    fn notify(&self, sender: usize) {
        let mut guard = self.inner.lock().unwrap();
        if guard.awaiting == Some(sender) {
            guard.received = true;
            self.cv.notify_all();
        } else {
            warn!("ignoring ACKNOWLEDGE from peer={} outside an active write", sender);
        }
    }
}

/// a replicated shared object: every peer holds a full local copy of `value`,
/// reads are served locally once read-eligible, writes are applied everywhere
/// under the token manager's mutual exclusion.
pub struct ReplicatedObject<T> {
    rank: usize,
    transport: Arc<dyn Transport<T>>,
    token_manager: Arc<TokenManager>,
    value: Arc<Mutex<Option<T>>>,
    bootstrapped: Arc<(Mutex<bool>, Condvar)>,
    ack: Arc<AckWaiter>,
    running: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + 'static> ReplicatedObject<T> {
    /// `initial_value` is only meaningful on rank 0; every other rank learns
    /// its value via the bootstrap handshake before this call returns.
    pub fn new(
        transport: Arc<dyn Transport<T>>,
        config: GroupConfig,
        initial_value: Option<T>,
    ) -> Result<ReplicatedObject<T>> {
        let rank = transport.rank();
        let size = transport.size();
        if size != config.size {
            return Err(ReplError::Generic(format!(
                "transport group size {} does not match configured size {}",
                size, config.size
            )));
        }

        let token_manager = Arc::new(TokenManager::new(rank, size));
        let value = Arc::new(Mutex::new(if rank == 0 { initial_value } else { None }));
        let ack = Arc::new(AckWaiter::new());
        let bootstrapped = Arc::new((Mutex::new(rank == 0), Condvar::new()));
        let running = Arc::new(AtomicBool::new(true));

        let pump = {
            let ctx = PumpContext {
                rank,
                transport: transport.clone(),
                token_manager: token_manager.clone(),
                value: value.clone(),
                ack: ack.clone(),
                bootstrapped: bootstrapped.clone(),
            };
            let running = running.clone();
            let poll_interval = config.pump_poll_interval;
            thread::spawn(move || pump_loop(ctx, running, poll_interval))
        };

        for peer in 0..size {
            if peer != rank {
                transport.send(peer, Message::NewProcess(NewProcess { sender: rank }))?;
            }
        }

        if rank != 0 {
            transport.send(0, Message::ReadRequest(ReadRequest { sender: rank }))?;
            let (lock, cv) = &*bootstrapped;
            let mut done = lock.lock().unwrap();
            while !*done {
                done = cv.wait(done).unwrap();
            }
        }

        Ok(ReplicatedObject {
            rank,
            transport,
            token_manager,
            value,
            bootstrapped,
            ack,
            running,
            pump: Some(pump),
        })
    }

    /// acquires at least one token, then returns a deep, independent copy of
    /// the local replica — mutating the returned value never affects any
    /// peer's replica without a subsequent `write()`
    pub fn read(&self) -> Result<T> {
        self.token_manager.acquire_read_token(&*self.transport)?;
        let guard = self.value.lock().unwrap();
        Ok(guard
            .clone()
            .expect("value must be initialized by construction before read() is reachable"))
    }

    /// acquires all tokens, applies `v` locally, then synchronously
    /// broadcasts it to every other peer and awaits each one's acknowledgment
    /// before releasing the tokens
    pub fn write(&self, v: T) -> Result<()> {
        self.token_manager.acquire_write_tokens(&*self.transport)?;
        {
            let mut guard = self.value.lock().unwrap();
            *guard = Some(v.clone());
        }
        for peer in 0..self.transport.size() {
            if peer != self.rank {
                self.ack.expect(peer);
                self.transport.send(
                    peer,
                    Message::DataUpdate(DataUpdate {
                        sender: self.rank,
                        value: v.clone(),
                    }),
                )?;
                self.ack.wait();
            }
        }
        self.token_manager.release_tokens(&*self.transport, true)
    }
}

impl<T> Drop for ReplicatedObject<T> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.pump.take() {
            // the pump checks `running` once per poll interval, so this join
            // completes within roughly one interval rather than blocking
            // indefinitely
            let _ = handle.join();
        }
    }
}

/// everything the pump needs, bundled so `ReplicatedObject::new` only clones
/// one value per spawn
struct PumpContext<T> {
    rank: usize,
    transport: Arc<dyn Transport<T>>,
    token_manager: Arc<TokenManager>,
    value: Arc<Mutex<Option<T>>>,
    ack: Arc<AckWaiter>,
    bootstrapped: Arc<(Mutex<bool>, Condvar)>,
}

fn pump_loop<T: Clone + Send + 'static>(ctx: PumpContext<T>, running: Arc<AtomicBool>, poll_interval: std::time::Duration) {
    while running.load(Ordering::Acquire) {
        if !ctx.transport.probe() {
            thread::sleep(poll_interval);
            continue;
        }
        let msg = match ctx.transport.recv_any() {
            Ok(msg) => msg,
            Err(e) => {
                error!("peer={} transport error in pump, shutting down: {}", ctx.rank, e);
                running.store(false, Ordering::Release);
                break;
            }
        };
        debug!("peer={} pump dispatching {}", ctx.rank, msg.kind_name());
        if let Err(e) = dispatch(&ctx, &msg) {
            error!("peer={} transport error handling {}: {}", ctx.rank, msg.kind_name(), e);
            running.store(false, Ordering::Release);
            break;
        }
    }
}

fn dispatch<T: Clone + Send + 'static>(ctx: &PumpContext<T>, msg: &Message<T>) -> Result<()> {
    let transport = ctx.transport.as_ref();
    match msg {
        Message::TokenRequest(m) => ctx.token_manager.handle_token_request(transport, m),
        Message::WriteRequest(m) => ctx.token_manager.handle_write_request(transport, m),
        Message::TokenRelease(m) => {
            ctx.token_manager.handle_token_release(m);
            Ok(())
        }
        Message::NewProcess(m) => ctx.token_manager.handle_new_process(transport, m),
        Message::ReadRequest(m) => {
            if ctx.token_manager.has_read_access() {
                let current = ctx.value.lock().unwrap().clone();
                if let Some(v) = current {
                    transport.send(
                        m.sender,
                        Message::DataUpdate(DataUpdate { sender: ctx.rank, value: v }),
                    )?;
                }
            }
            // otherwise ignored: the requester retries against another peer
            // or waits, per spec
            Ok(())
        }
        Message::DataUpdate(m) => {
            {
                let mut guard = ctx.value.lock().unwrap();
                *guard = Some(m.value.clone());
            }
            transport.send(m.sender, Message::Acknowledge(Acknowledge { sender: ctx.rank }))?;
            let (lock, cv) = &*ctx.bootstrapped;
            {
                let mut done = lock.lock().unwrap();
                *done = true;
            }
            cv.notify_all();
            Ok(())
        }
        Message::Acknowledge(m) => {
            ctx.ack.notify(m.sender);
            Ok(())
        }
    }
}
