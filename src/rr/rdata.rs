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

//! Implementation of the [`Rdata`] type and RDATA processing.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ops::Deref;

use super::Type;
use crate::name::Name;
use crate::util::push_hex;

////////////////////////////////////////////////////////////////////////
// RDATA TYPE                                                         //
////////////////////////////////////////////////////////////////////////

/// The RDATA of a resource record.
///
/// This is an owned octet buffer whose length is limited to the
/// 65,535-octet maximum the 16-bit RDLENGTH field can express. Typed
/// constructors and accessors are provided for the RR types the engine
/// produces and consumes; everything else passes through untyped.
#[derive(Clone, Eq, PartialEq)]
pub struct Rdata(Box<[u8]>);

/// The maximum length of RDATA in octets.
pub const MAX_RDATA_LEN: usize = u16::MAX as usize;

impl Rdata {
    /// Constructs an `Rdata` from raw octets, failing if the buffer is
    /// longer than [`MAX_RDATA_LEN`].
    pub fn from_octets(octets: impl Into<Vec<u8>>) -> Result<Self, RdataError> {
        let octets = octets.into();
        if octets.len() > MAX_RDATA_LEN {
            Err(RdataError::TooLong)
        } else {
            Ok(Self(octets.into_boxed_slice()))
        }
    }

    /// Returns the octets of the RDATA.
    pub fn octets(&self) -> &[u8] {
        &self.0
    }

    /// Constructs A RDATA from an IPv4 address.
    pub fn from_ipv4(addr: Ipv4Addr) -> Self {
        Self(Box::new(addr.octets()))
    }

    /// Constructs AAAA RDATA from an IPv6 address.
    pub fn from_ipv6(addr: Ipv6Addr) -> Self {
        Self(Box::new(addr.octets()))
    }

    /// Constructs RDATA consisting of a single uncompressed domain
    /// name (NS, CNAME, DNAME, PTR).
    pub fn from_name(name: &Name) -> Self {
        Self(name.wire_repr().into())
    }

    /// Constructs TXT RDATA from a sequence of character-strings. Each
    /// string must be at most 255 octets long, and at least one must
    /// be provided.
    pub fn txt<I, S>(strings: I) -> Result<Self, RdataError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut octets = Vec::new();
        let mut any = false;
        for string in strings {
            let string = string.as_ref();
            if string.len() > 255 {
                return Err(RdataError::StringTooLong);
            }
            octets.push(string.len() as u8);
            octets.extend_from_slice(string);
            any = true;
        }
        if !any {
            return Err(RdataError::Malformed);
        }
        Self::from_octets(octets)
    }

    /// Constructs SOA RDATA from its fields.
    pub fn soa(
        mname: &Name,
        rname: &Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    ) -> Self {
        let mut octets =
            Vec::with_capacity(mname.wire_repr().len() + rname.wire_repr().len() + 20);
        octets.extend_from_slice(mname.wire_repr());
        octets.extend_from_slice(rname.wire_repr());
        for value in [serial, refresh, retry, expire, minimum] {
            octets.extend_from_slice(&value.to_be_bytes());
        }
        Self(octets.into_boxed_slice())
    }

    /// Parses the RDATA as a single domain name (the layout of NS,
    /// CNAME, DNAME, and PTR records).
    pub fn as_name(&self) -> Result<Name, RdataError> {
        Name::from_wire_all(&self.0).map_err(|_| RdataError::Malformed)
    }

    /// Interprets the RDATA as an IPv4 address, if it has the right
    /// length.
    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        let octets: [u8; 4] = self.0.as_ref().try_into().ok()?;
        Some(octets.into())
    }

    /// Interprets the RDATA as an IPv6 address, if it has the right
    /// length.
    pub fn as_ipv6(&self) -> Option<Ipv6Addr> {
        let octets: [u8; 16] = self.0.as_ref().try_into().ok()?;
        Some(octets.into())
    }

    /// Returns an iterator over the character-strings of TXT RDATA.
    /// Malformed trailing data ends the iteration.
    pub fn txt_strings(&self) -> TxtStrings {
        TxtStrings { cursor: &self.0 }
    }

    /// Parses the RDATA as the fields of an SOA record.
    pub fn as_soa(&self) -> Result<Soa, RdataError> {
        let (mname, consumed) =
            Name::from_wire(&self.0, 0).map_err(|_| RdataError::Malformed)?;
        let (rname, consumed2) =
            Name::from_wire(&self.0, consumed).map_err(|_| RdataError::Malformed)?;
        let rest = &self.0[consumed + consumed2..];
        if rest.len() != 20 {
            return Err(RdataError::Malformed);
        }
        let field = |i: usize| u32::from_be_bytes(rest[i * 4..i * 4 + 4].try_into().unwrap());
        Ok(Soa {
            mname,
            rname,
            serial: field(0),
            refresh: field(1),
            retry: field(2),
            expire: field(3),
            minimum: field(4),
        })
    }

    /// Validates the RDATA for correctness, assuming it is of type
    /// `rr_type` (in the Internet class). Unknown types pass
    /// unchecked.
    pub fn validate(&self, rr_type: Type) -> Result<(), RdataError> {
        match rr_type {
            Type::A => self.expect_len(4),
            Type::AAAA => self.expect_len(16),
            Type::NS | Type::CNAME | Type::DNAME | Type::PTR => self.as_name().map(|_| ()),
            Type::MX => self.expect_name_at(2),
            Type::SRV => self.expect_name_at(6),
            Type::SOA => self.as_soa().map(|_| ()),
            Type::TXT => {
                let mut strings = self.txt_strings();
                if strings.by_ref().next().is_none() {
                    return Err(RdataError::Malformed);
                }
                for _ in strings.by_ref() {}
                if strings.cursor.is_empty() {
                    Ok(())
                } else {
                    Err(RdataError::Malformed)
                }
            }
            _ => Ok(()),
        }
    }

    fn expect_len(&self, len: usize) -> Result<(), RdataError> {
        if self.0.len() == len {
            Ok(())
        } else {
            Err(RdataError::Malformed)
        }
    }

    fn expect_name_at(&self, offset: usize) -> Result<(), RdataError> {
        if self.0.len() < offset {
            return Err(RdataError::Malformed);
        }
        match Name::from_wire(&self.0, offset) {
            Ok((_, consumed)) if offset + consumed == self.0.len() => Ok(()),
            _ => Err(RdataError::Malformed),
        }
    }
}

impl Deref for Rdata {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut hex = String::with_capacity(2 * self.0.len());
        push_hex(&mut hex, &self.0);
        write!(f, "Rdata({})", hex)
    }
}

/// The decoded fields of an SOA record; see [`Rdata::as_soa`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// An iterator over the character-strings of TXT RDATA; see
/// [`Rdata::txt_strings`].
pub struct TxtStrings<'a> {
    cursor: &'a [u8],
}

impl<'a> Iterator for TxtStrings<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.cursor.split_first()?;
        let string = rest.get(..len as usize)?;
        self.cursor = &rest[len as usize..];
        Some(string)
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error type used to report invalid RDATA.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RdataError {
    /// The RDATA is longer than 65,535 octets.
    TooLong,

    /// A TXT character-string is longer than 255 octets.
    StringTooLong,

    /// The RDATA does not have the layout its RR type requires.
    Malformed,
}

impl fmt::Display for RdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::TooLong => f.write_str("RDATA is longer than 65,535 octets"),
            Self::StringTooLong => f.write_str("character-string is longer than 255 octets"),
            Self::Malformed => f.write_str("RDATA does not match its RR type's layout"),
        }
    }
}

impl std::error::Error for RdataError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
