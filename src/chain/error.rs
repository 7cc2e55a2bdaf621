// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of the [`Error`] type for backend failures.

use std::fmt;

/// An error reported by a [`ChainBackend`](super::ChainBackend).
///
/// The engine's behavior differs by kind, so backends must classify
/// their failures rather than stringify them:
///
/// * [`NoContract`](Error::NoContract) and
///   [`WrongContractType`](Error::WrongContractType) are definitive
///   absences. They are the only kinds the resolver cache records as
///   negative entries.
/// * [`EmptyAbi`](Error::EmptyAbi) means a call succeeded but decoded
///   to no value. It is always treated as "field absent," never as a
///   failure.
/// * [`Transient`](Error::Transient) covers timeouts, transport
///   errors, and anything else that might succeed on retry. Transient
///   failures are never cached.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// There is no contract code at the resolved address.
    NoContract,

    /// A contract exists but is not a resolver of the requested kind.
    WrongContractType,

    /// The call returned an empty ABI encoding, i.e. no value.
    EmptyAbi,

    /// A transport-level or otherwise retryable failure.
    Transient(String),
}

impl Error {
    /// Returns whether this error definitively reports that the
    /// resolver is absent (and may therefore be negative-cached).
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NoContract | Self::WrongContractType)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoContract => f.write_str("no contract code at the resolved address"),
            Self::WrongContractType => f.write_str("contract is not a resolver of this kind"),
            Self::EmptyAbi => f.write_str("call decoded to an empty value"),
            Self::Transient(detail) => write!(f, "transient backend failure: {}", detail),
        }
    }
}

impl std::error::Error for Error {}
