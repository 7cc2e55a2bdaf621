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

//! The capability surface toward the naming chain.
//!
//! Everything the engine knows about the chain goes through the
//! [`ChainBackend`] trait: resolver discovery for a domain, ownership,
//! and sync state. Per-domain record access goes through the resolver
//! handles a backend constructs: a [`DnsResolver`] for domains whose
//! resolver contract stores wire-format DNS RRSETs, and a
//! [`TextResolver`] for the address and content-hash fields. A given
//! domain may have one, both, or neither.
//!
//! The concrete RPC client and its ABI plumbing live outside this
//! crate; the engine only depends on these traits, which also makes
//! the whole lookup path testable against an in-memory double.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::ctx::RequestContext;
use crate::name::Name;
use crate::rr::Type;
use crate::util::push_hex;

mod error;
pub use error::Error;

////////////////////////////////////////////////////////////////////////
// ADDRESSES                                                          //
////////////////////////////////////////////////////////////////////////

/// A 20-octet account address on the naming chain.
///
/// The all-zero address means "unknown" or "unowned"; the registry
/// reports it for names with no owner.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0; 20]);

    /// Constructs an `Address` from its octets.
    pub fn new(octets: [u8; 20]) -> Self {
        Self(octets)
    }

    /// Returns the octets of the address.
    pub fn octets(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns whether this is the all-zero address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut hex = String::with_capacity(42);
        hex.push_str("0x");
        push_hex(&mut hex, &self.0);
        f.write_str(&hex)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if hex.len() != 40 || !hex.is_ascii() {
            return Err("address must be 40 hex digits");
        }
        let mut octets = [0; 20];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
                .or(Err("address contains a non-hex digit"))?;
        }
        Ok(Self(octets))
    }
}

////////////////////////////////////////////////////////////////////////
// SYNC STATE                                                         //
////////////////////////////////////////////////////////////////////////

/// A report that the backing node is still synchronizing. A fully
/// synced node reports no `SyncProgress` at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyncProgress {
    pub current_block: u64,
    pub highest_block: u64,
}

////////////////////////////////////////////////////////////////////////
// BACKEND CAPABILITIES                                               //
////////////////////////////////////////////////////////////////////////

/// The chain-side operations the engine needs.
///
/// Implementations are shared across concurrent queries and must be
/// internally thread-safe. Every operation receives the ambient
/// [`RequestContext`] so that in-flight RPCs can observe cancellation.
pub trait ChainBackend: Send + Sync {
    /// Returns the owner address recorded for `domain`. The all-zero
    /// address means the domain is unowned.
    fn owner(&self, ctx: &RequestContext, domain: &Name) -> Result<Address, Error>;

    /// Returns the resolver contract address recorded for `domain`.
    fn resolver_address(&self, ctx: &RequestContext, domain: &Name) -> Result<Address, Error>;

    /// Constructs a handle to `domain`'s DNS resolver contract.
    fn dns_resolver(
        &self,
        ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Arc<dyn DnsResolver>, Error>;

    /// Constructs a handle to `domain`'s text resolver contract.
    fn text_resolver(
        &self,
        ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Arc<dyn TextResolver>, Error>;

    /// Reports the backing node's synchronization state; `None` means
    /// fully synced.
    fn sync_progress(&self, ctx: &RequestContext) -> Result<Option<SyncProgress>, Error>;
}

/// A handle to one domain's DNS resolver contract, which stores
/// wire-format RRSET blobs keyed by name and RR type.
pub trait DnsResolver: Send + Sync {
    /// Fetches the stored RRSET blob for `(name, rr_type)`. An empty
    /// blob means no records.
    fn record(&self, ctx: &RequestContext, name: &Name, rr_type: Type) -> Result<Vec<u8>, Error>;

    /// Returns whether any records of any type are stored for `name`.
    fn has_records(&self, ctx: &RequestContext, name: &Name) -> Result<bool, Error>;
}

/// A handle to one domain's text resolver contract, which stores the
/// domain's account address and content hash.
pub trait TextResolver: Send + Sync {
    /// Fetches the domain's content hash. [`Error::EmptyAbi`] means no
    /// hash is recorded.
    fn content_hash(&self, ctx: &RequestContext) -> Result<Vec<u8>, Error>;

    /// Fetches the domain's account address. [`Error::EmptyAbi`] means
    /// no address is recorded.
    fn address(&self, ctx: &RequestContext) -> Result<Address, Error>;
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_works() {
        let mut octets = [0; 20];
        octets[0] = 0xab;
        octets[19] = 0x01;
        assert_eq!(
            Address::new(octets).to_string(),
            "0xab00000000000000000000000000000000000001",
        );
    }

    #[test]
    fn address_from_str_round_trips() {
        let text = "0xab00000000000000000000000000000000000001";
        let address: Address = text.parse().unwrap();
        assert_eq!(address.to_string(), text);
        assert!(!address.is_zero());
    }

    #[test]
    fn address_from_str_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz00000000000000000000000000000000000001"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(
            "0x0000000000000000000000000000000000000000"
                .parse::<Address>()
                .unwrap(),
            Address::ZERO,
        );
    }
}
