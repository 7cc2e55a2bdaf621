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

//! Packing and unpacking of wire-format RRSET blobs.
//!
//! The chain stores the records of a name as a single blob: the
//! concatenation of uncompressed wire-format resource records ([RFC
//! 1035 § 4.1.3] without name compression). Unpacking repeatedly reads
//! records from offset 0 until the blob is exhausted.
//!
//! A record whose RDATA fails type-specific validation is skipped
//! (parsing resumes after its declared RDLENGTH) while its well-formed
//! neighbors are retained. If an owner name or fixed header cannot be
//! parsed, no further record boundary is knowable and the remainder of
//! the blob is dropped.
//!
//! [RFC 1035 § 4.1.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.3

use log::warn;

use super::{Rdata, Rr, Ttl, Type};
use crate::class::Class;
use crate::name::{self, Name};

/// An error indicating that an RRSET blob cannot be parsed further.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WireError {
    /// The owner name of a record is invalid.
    Name(name::Error),

    /// The blob ended in the middle of a record.
    UnexpectedEom,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Name(e) => write!(f, "invalid owner name: {}", e),
            Self::UnexpectedEom => f.write_str("unexpected end of RRSET blob"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<name::Error> for WireError {
    fn from(e: name::Error) -> Self {
        Self::Name(e)
    }
}

/// Reads one record from `blob` at `offset`.
///
/// On success, returns the record and the offset of the next record. A
/// record that parses structurally but carries RDATA invalid for its
/// type yields `None` in place of the record, so that the caller can
/// skip it and continue.
pub fn read_rr(blob: &[u8], offset: usize) -> Result<(Option<Rr>, usize), WireError> {
    let (owner, name_len) = Name::from_wire(blob, offset)?;
    let fixed = blob
        .get(offset + name_len..offset + name_len + 10)
        .ok_or(WireError::UnexpectedEom)?;
    let rr_type = Type::from(u16::from_be_bytes([fixed[0], fixed[1]]));
    let class = Class::from(u16::from_be_bytes([fixed[2], fixed[3]]));
    let ttl = Ttl::from(u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]));
    let rdlength = u16::from_be_bytes([fixed[8], fixed[9]]) as usize;

    let rdata_start = offset + name_len + 10;
    let octets = blob
        .get(rdata_start..rdata_start + rdlength)
        .ok_or(WireError::UnexpectedEom)?;
    let next = rdata_start + rdlength;

    // RDLENGTH fits in a u16, so from_octets cannot fail here.
    let rdata = Rdata::from_octets(octets.to_vec()).unwrap();
    if rdata.validate(rr_type).is_err() {
        return Ok((None, next));
    }
    Ok((Some(Rr::new(owner, rr_type, class, ttl, rdata)), next))
}

/// Unpacks a stored RRSET blob into records, skipping malformed
/// entries as described in the module documentation.
pub fn unpack_rrset(blob: &[u8]) -> Vec<Rr> {
    let mut rrs = Vec::new();
    let mut offset = 0;
    while offset < blob.len() {
        match read_rr(blob, offset) {
            Ok((Some(rr), next)) => {
                rrs.push(rr);
                offset = next;
            }
            Ok((None, next)) => {
                warn!("skipping malformed record at offset {} of RRSET blob", offset);
                offset = next;
            }
            Err(e) => {
                warn!(
                    "dropping undecodable tail of RRSET blob at offset {}: {}",
                    offset, e
                );
                break;
            }
        }
    }
    rrs
}

/// Appends the uncompressed wire form of `rr` to `buf`.
pub fn pack_rr(rr: &Rr, buf: &mut Vec<u8>) {
    buf.extend_from_slice(rr.owner.wire_repr());
    buf.extend_from_slice(&u16::from(rr.rr_type).to_be_bytes());
    buf.extend_from_slice(&u16::from(rr.class).to_be_bytes());
    buf.extend_from_slice(&u32::from(rr.ttl).to_be_bytes());
    buf.extend_from_slice(&(rr.rdata.octets().len() as u16).to_be_bytes());
    buf.extend_from_slice(rr.rdata.octets());
}

/// The canonical packing routine: concatenates the uncompressed wire
/// forms of the given records.
pub fn pack_rrset(rrs: &[Rr]) -> Vec<u8> {
    let mut buf = Vec::new();
    for rr in rrs {
        pack_rr(rr, &mut buf);
    }
    buf
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
