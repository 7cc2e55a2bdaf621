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

//! Data structures and routines for handling DNS resource record data.

pub mod wire;

mod rdata;
mod rr_type;
mod ttl;
pub use rdata::{Rdata, RdataError, Soa, TxtStrings, MAX_RDATA_LEN};
pub use rr_type::Type;
pub use ttl::Ttl;

use std::fmt;

use crate::class::Class;
use crate::name::Name;

/// A single resource record.
///
/// Unlike full nameserver databases, which store records grouped into
/// RRsets, this engine passes records around individually: answers are
/// assembled from stored blobs and synthesized one record at a time,
/// and section order matters.
#[derive(Clone, Eq, PartialEq)]
pub struct Rr {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub rdata: Rdata,
}

impl Rr {
    /// Creates a new record.
    pub fn new(owner: Name, rr_type: Type, class: Class, ttl: Ttl, rdata: Rdata) -> Self {
        Self {
            owner,
            rr_type,
            class,
            ttl,
            rdata,
        }
    }

    /// For record types whose RDATA is a single domain name (NS,
    /// CNAME, DNAME, PTR), returns that name.
    pub fn target(&self) -> Option<Name> {
        match self.rr_type {
            Type::NS | Type::CNAME | Type::DNAME | Type::PTR => self.rdata.as_name().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Rr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {:?}",
            self.owner, self.ttl, self.class, self.rr_type, self.rdata
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_works_for_name_rdata() {
        let rr = Rr::new(
            "www.example.com.".parse().unwrap(),
            Type::CNAME,
            Class::IN,
            Ttl::from(3600),
            Rdata::from_name(&"example.com.".parse().unwrap()),
        );
        assert_eq!(rr.target(), Some("example.com.".parse().unwrap()));
    }

    #[test]
    fn target_is_none_for_other_types() {
        let rr = Rr::new(
            "example.com.".parse().unwrap(),
            Type::A,
            Class::IN,
            Ttl::from(3600),
            Rdata::from_ipv4("1.1.2.1".parse().unwrap()),
        );
        assert_eq!(rr.target(), None);
    }
}
