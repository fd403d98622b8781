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
//! # Replikate error
//!
//! All modules of this library use this error class to indicate problems.
//!

use std::convert;
use std::error::Error;
use std::fmt;
use std::sync::mpsc;

/// An error class to offer a unified error interface upstream
pub enum ReplError {
    /// There is no peer in the group with this rank
    UnknownPeer(usize),
    /// The transport could not deliver or receive a message
    Transport(String),
    /// A value could not be serialized or deserialized for the wire
    Serialization(String),
    /// generic error message
    Generic(String),
    /// a condition the protocol's invariants guarantee cannot happen did happen
    Panic(String),
}

impl Error for ReplError {}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReplError::UnknownPeer(rank) => write!(f, "Unknown peer rank={}", rank),
            ReplError::Transport(ref s) => write!(f, "Transport error: {}", s),
            ReplError::Serialization(ref s) => write!(f, "Serialization error: {}", s),
            ReplError::Generic(ref s) => write!(f, "Generic: {}", s),
            ReplError::Panic(ref s) => write!(f, "Panic: {}", s),
        }
    }
}

impl fmt::Debug for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        (self as &dyn fmt::Display).fmt(f)
    }
}

impl<T> convert::From<mpsc::SendError<T>> for ReplError {
    fn from(err: mpsc::SendError<T>) -> ReplError {
        ReplError::Transport(err.to_string())
    }
}

impl convert::From<mpsc::RecvError> for ReplError {
    fn from(err: mpsc::RecvError) -> ReplError {
        ReplError::Transport(err.to_string())
    }
}

/// convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ReplError>;
