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
//! # Transport
//!
//! The core coordination layer (`token_manager`, `dist_obj`) is written against
//! this trait rather than against a concrete network binding, per the spec: a
//! reliable, FIFO-per-pair, point-to-point transport is an external collaborator.
//! `ChannelTransport` is the one concrete implementation this crate ships: every
//! ordered pair of peers gets its own `mpsc` channel, so FIFO delivery between
//! any two peers is structural rather than assumed.
//!

use crate::error::{ReplError, Result};
use crate::message::Message;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// the external collaborator spec.md §6 describes: reliable, ordered,
/// point-to-point send/receive plus a non-blocking probe and a barrier.
pub trait Transport<T>: Send + Sync {
    /// this peer's rank in `[0, size())`
    fn rank(&self) -> usize;

    /// number of peers in the group
    fn size(&self) -> usize;

    /// reliably deliver `msg` to `destination`, preserving FIFO order relative
    /// to other sends from this peer to the same destination
    fn send(&self, destination: usize, msg: Message<T>) -> Result<()>;

    /// block until a message from `source` is available, then return it
    fn recv(&self, source: usize) -> Result<Message<T>>;

    /// non-blocking: true if a message from any source is currently pending
    fn probe(&self) -> bool;

    /// block until a pending message (from any source) is available, then return it
    fn recv_any(&self) -> Result<Message<T>>;

    /// collective synchronization point; used only by application code, never
    /// by the core per spec.md §1
    fn barrier(&self);
}

/// an in-process transport over `std::sync::mpsc`, one channel per ordered pair
/// of peers. Used by the demo binary and by the crate's own tests in place of a
/// real network/MPI binding (out of scope per spec.md §1).
pub struct ChannelTransport<T> {
    // one lock per source rather than one lock over the whole inbox set, so a
    // blocking `recv(source)` only ever holds the lock for its own source and
    // never stalls `probe`/`recv_any`/`recv` working against a different one
    sources: Vec<Mutex<SourceState<T>>>,
    rank: usize,
    size: usize,
    outboxes: Vec<Sender<Message<T>>>,
    barrier: Arc<BarrierState>,
}

struct SourceState<T> {
    // taken out of the slot for the duration of a blocking `recv`, so the
    // lock guarding `pending` can be released before the thread parks on it
    receiver: Option<Receiver<Message<T>>>,
    // a message pulled off the channel by `probe`/`recv_any` to answer "is one
    // pending?" without losing it; `recv` drains this before touching the
    // channel itself
    pending: Option<Message<T>>,
}

struct BarrierState {
    size: usize,
    waiting: AtomicUsize,
    generation: Mutex<usize>,
    cv: Condvar,
}

impl<T> ChannelTransport<T> {
    /// build `size` linked transports, one per peer, ready to hand to `size`
    /// peer threads
    pub fn new_group(size: usize) -> Vec<ChannelTransport<T>> {
        assert!(size > 0, "a group must have at least one peer");

        // senders[i][j] is peer i's sending end toward peer j
        let mut senders: Vec<Vec<Sender<Message<T>>>> = Vec::with_capacity(size);
        let mut receivers: Vec<Vec<Option<Receiver<Message<T>>>>> = Vec::with_capacity(size);
        for _ in 0..size {
            receivers.push((0..size).map(|_| None).collect());
        }

        for _src in 0..size {
            let mut row = Vec::with_capacity(size);
            for dst in 0..size {
                let (tx, rx) = mpsc::channel::<Message<T>>();
                row.push(tx);
                receivers[dst][_src] = Some(rx);
            }
            senders.push(row);
        }

        let barrier = Arc::new(BarrierState {
            size,
            waiting: AtomicUsize::new(0),
            generation: Mutex::new(0),
            cv: Condvar::new(),
        });

        let mut out = Vec::with_capacity(size);
        for rank in 0..size {
            let outboxes: Vec<Sender<Message<T>>> = senders.iter().map(|row| row[rank].clone()).collect();
            let sources: Vec<Mutex<SourceState<T>>> = receivers[rank]
                .iter_mut()
                .map(|r| {
                    Mutex::new(SourceState {
                        receiver: Some(r.take().unwrap()),
                        pending: None,
                    })
                })
                .collect();
            out.push(ChannelTransport {
                sources,
                rank,
                size,
                outboxes,
                barrier: barrier.clone(),
            });
        }
        out
    }
}

impl<T: Send + 'static> Transport<T> for ChannelTransport<T> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, destination: usize, msg: Message<T>) -> Result<()> {
        if destination >= self.size {
            return Err(ReplError::UnknownPeer(destination));
        }
        self.outboxes[destination]
            .send(msg)
            .map_err(|e| ReplError::Transport(e.to_string()))
    }

    fn recv(&self, source: usize) -> Result<Message<T>> {
        if source >= self.size {
            return Err(ReplError::UnknownPeer(source));
        }
        // fast path: a message `probe`/`recv_any` already pulled off the wire
        {
            let mut slot = self.sources[source].lock().unwrap();
            if let Some(msg) = slot.pending.take() {
                return Ok(msg);
            }
        }
        // take the receiver out from under the lock so the blocking wait below
        // never holds it; `probe`/`recv_any` just see an absent receiver for
        // this source in the meantime and move on rather than stalling on it
        let receiver = self.sources[source]
            .lock()
            .unwrap()
            .receiver
            .take()
            .ok_or_else(|| ReplError::Transport(format!("peer={} source={} is already being received from", self.rank, source)))?;
        let result = receiver.recv().map_err(ReplError::from);
        self.sources[source].lock().unwrap().receiver = Some(receiver);
        result
    }

    fn probe(&self) -> bool {
        for slot in &self.sources {
            let mut slot = slot.lock().unwrap();
            if slot.pending.is_some() {
                return true;
            }
            if let Some(receiver) = slot.receiver.as_ref() {
                if let Ok(msg) = receiver.try_recv() {
                    slot.pending = Some(msg);
                    return true;
                }
            }
        }
        false
    }

    fn recv_any(&self) -> Result<Message<T>> {
        // poll round-robin with a short sleep; this mirrors the teacher's
        // Iprobe-then-sleep pump loop rather than blocking on any one channel
        loop {
            for slot in &self.sources {
                let mut slot = slot.lock().unwrap();
                if let Some(msg) = slot.pending.take() {
                    return Ok(msg);
                }
                if let Some(receiver) = slot.receiver.as_ref() {
                    if let Ok(msg) = receiver.try_recv() {
                        return Ok(msg);
                    }
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn barrier(&self) {
        let mut gen = self.barrier.generation.lock().unwrap();
        let local_gen = *gen;
        let arrived = self.barrier.waiting.fetch_add(1, Ordering::SeqCst) + 1;
        if arrived == self.barrier.size {
            self.barrier.waiting.store(0, Ordering::SeqCst);
            *gen += 1;
            self.barrier.cv.notify_all();
        } else {
            while *gen == local_gen {
                gen = self.barrier.cv.wait(gen).unwrap();
            }
        }
    }
}
