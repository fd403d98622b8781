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
//! # Wire messages of the token/replication protocol
//!
//! Every message carries the rank of its originator so the receiver can reply.
//! `Message` is a closed enum on purpose: dispatch on it is an exhaustive match,
//! not a kind-tag check, so the compiler flags any new variant left unhandled.
//!

use serde_derive::{Deserialize, Serialize};

/// a request for a single read token
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRequest {
    pub sender: usize,
}

/// a request for all N tokens, to enter write mode
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    pub sender: usize,
}

/// a grant of `count` tokens back to the requester
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRelease {
    pub sender: usize,
    pub token_count: usize,
}

/// announces that `sender` has just joined the group
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewProcess {
    pub sender: usize,
}

/// asks the receiver to reply with its current replica value
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadRequest {
    pub sender: usize,
}

/// carries a new replica value, either as a read-request reply or a write broadcast
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataUpdate<T> {
    pub sender: usize,
    pub value: T,
}

/// acknowledges a `DataUpdate` broadcast from `sender`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Acknowledge {
    pub sender: usize,
}

/// every message that can flow between two peers on the protocol's single logical channel
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Message<T> {
    TokenRequest(TokenRequest),
    WriteRequest(WriteRequest),
    TokenRelease(TokenRelease),
    NewProcess(NewProcess),
    ReadRequest(ReadRequest),
    DataUpdate(DataUpdate<T>),
    Acknowledge(Acknowledge),
}

impl<T> Message<T> {
    /// rank of the peer that originated this message
    pub fn sender(&self) -> usize {
        match self {
            Message::TokenRequest(m) => m.sender,
            Message::WriteRequest(m) => m.sender,
            Message::TokenRelease(m) => m.sender,
            Message::NewProcess(m) => m.sender,
            Message::ReadRequest(m) => m.sender,
            Message::DataUpdate(m) => m.sender,
            Message::Acknowledge(m) => m.sender,
        }
    }

    /// short tag for log lines, mirrors the original `MessageType` names
    pub fn kind_name(&self) -> &'static str {
        match self {
            Message::TokenRequest(_) => "TOKEN_REQUEST",
            Message::WriteRequest(_) => "WRITE_REQUEST",
            Message::TokenRelease(_) => "TOKEN_RELEASE",
            Message::NewProcess(_) => "NEW_PROCESS",
            Message::ReadRequest(_) => "READ_REQUEST",
            Message::DataUpdate(_) => "DATA_UPDATE",
            Message::Acknowledge(_) => "ACKNOWLEDGE",
        }
    }
}
