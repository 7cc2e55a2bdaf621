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

//! Test support: an in-memory chain backend and record constructors.
//!
//! Compiled only for tests. [`MockBackend`] stands in for the real
//! chain: each registered domain has an owner address and, optionally,
//! a DNS resolver (a set of records served as packed RRSET blobs) and
//! a text resolver (content hash and address). Constructor errors and
//! per-record fetch failures can be injected, and backend calls are
//! counted so cache behavior can be asserted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::chain::{self, Address, ChainBackend, DnsResolver, SyncProgress, TextResolver};
use crate::class::Class;
use crate::ctx::RequestContext;
use crate::name::Name;
use crate::rr::{wire, Rdata, Rr, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// RECORD CONSTRUCTORS                                                //
////////////////////////////////////////////////////////////////////////

pub(crate) fn name(from: &str) -> Name {
    from.parse().unwrap()
}

pub(crate) fn a_rr(owner: &str, addr: &str) -> Rr {
    Rr::new(
        name(owner),
        Type::A,
        Class::IN,
        Ttl::from(3600),
        Rdata::from_ipv4(addr.parse().unwrap()),
    )
}

pub(crate) fn aaaa_rr(owner: &str, addr: &str) -> Rr {
    Rr::new(
        name(owner),
        Type::AAAA,
        Class::IN,
        Ttl::from(3600),
        Rdata::from_ipv6(addr.parse().unwrap()),
    )
}

pub(crate) fn ns_rr(owner: &str, target: &str) -> Rr {
    Rr::new(
        name(owner),
        Type::NS,
        Class::IN,
        Ttl::from(3600),
        Rdata::from_name(&name(target)),
    )
}

pub(crate) fn cname_rr(owner: &str, target: &str) -> Rr {
    Rr::new(
        name(owner),
        Type::CNAME,
        Class::IN,
        Ttl::from(3600),
        Rdata::from_name(&name(target)),
    )
}

pub(crate) fn dname_rr(owner: &str, target: &str) -> Rr {
    Rr::new(
        name(owner),
        Type::DNAME,
        Class::IN,
        Ttl::from(3600),
        Rdata::from_name(&name(target)),
    )
}

pub(crate) fn txt_rr(owner: &str, text: &str) -> Rr {
    Rr::new(
        name(owner),
        Type::TXT,
        Class::IN,
        Ttl::from(3600),
        Rdata::txt([text]).unwrap(),
    )
}

pub(crate) fn soa_rr(owner: &str, mname: &str, rname: &str, serial: u32) -> Rr {
    Rr::new(
        name(owner),
        Type::SOA,
        Class::IN,
        Ttl::from(3600),
        Rdata::soa(&name(mname), &name(rname), serial, 19762, 1800, 1814400, 14400),
    )
}

////////////////////////////////////////////////////////////////////////
// MOCK DOMAIN STATE                                                  //
////////////////////////////////////////////////////////////////////////

/// The DNS-resolver side of a mock domain: the records it stores, plus
/// injected per-key fetch failures.
#[derive(Clone, Default)]
pub(crate) struct MockZone {
    pub records: Vec<Rr>,
    pub record_failures: Vec<(Name, Type)>,
}

impl MockZone {
    pub fn with_records(records: Vec<Rr>) -> Self {
        Self {
            records,
            record_failures: Vec::new(),
        }
    }

    pub fn failing(mut self, owner: &str, rr_type: Type) -> Self {
        self.record_failures.push((name(owner), rr_type));
        self
    }

    fn blob(&self, qname: &Name, rr_type: Type) -> Vec<u8> {
        let matching: Vec<Rr> = self
            .records
            .iter()
            .filter(|rr| rr.owner == *qname && rr.rr_type == rr_type)
            .cloned()
            .collect();
        wire::pack_rrset(&matching)
    }
}

/// The text-resolver side of a mock domain.
#[derive(Clone)]
pub(crate) struct MockText {
    pub content_hash: Result<Vec<u8>, chain::Error>,
    pub address: Result<Address, chain::Error>,
}

impl MockText {
    pub fn with_hash(hash: Vec<u8>) -> Self {
        Self {
            content_hash: Ok(hash),
            address: Err(chain::Error::EmptyAbi),
        }
    }
}

/// One registered domain of the mock chain.
#[derive(Clone)]
pub(crate) struct MockDomain {
    pub owner: Address,
    pub dns_resolver: Result<MockZone, chain::Error>,
    pub text_resolver: Result<MockText, chain::Error>,
}

impl MockDomain {
    /// A domain with a non-zero owner and no resolvers.
    pub fn owned() -> Self {
        Self {
            owner: Address::new([0x11; 20]),
            dns_resolver: Err(chain::Error::NoContract),
            text_resolver: Err(chain::Error::NoContract),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// THE MOCK BACKEND                                                   //
////////////////////////////////////////////////////////////////////////

struct Inner {
    domains: Mutex<HashMap<Name, MockDomain>>,
    owner_calls: AtomicUsize,
    dns_resolver_calls: AtomicUsize,
    text_resolver_calls: AtomicUsize,
    syncing: AtomicBool,
}

/// An in-memory [`ChainBackend`].
#[derive(Clone)]
pub(crate) struct MockBackend {
    inner: Arc<Inner>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                domains: Mutex::new(HashMap::new()),
                owner_calls: AtomicUsize::new(0),
                dns_resolver_calls: AtomicUsize::new(0),
                text_resolver_calls: AtomicUsize::new(0),
                syncing: AtomicBool::new(false),
            }),
        }
    }

    pub fn add_domain(&self, domain: &str, state: MockDomain) {
        self.inner
            .domains
            .lock()
            .unwrap()
            .insert(name(domain), state);
    }

    pub fn set_syncing(&self, syncing: bool) {
        self.inner.syncing.store(syncing, Ordering::Relaxed);
    }

    pub fn counters(&self) -> Counters {
        Counters {
            inner: self.inner.clone(),
        }
    }

    fn domain(&self, domain: &Name) -> Option<MockDomain> {
        self.inner.domains.lock().unwrap().get(domain).cloned()
    }
}

/// A handle onto the backend's call counters that stays usable after
/// the backend has been moved into an engine.
pub(crate) struct Counters {
    inner: Arc<Inner>,
}

impl Counters {
    pub fn owner_calls(&self) -> usize {
        self.inner.owner_calls.load(Ordering::Relaxed)
    }

    pub fn dns_resolver_calls(&self) -> usize {
        self.inner.dns_resolver_calls.load(Ordering::Relaxed)
    }

    pub fn text_resolver_calls(&self) -> usize {
        self.inner.text_resolver_calls.load(Ordering::Relaxed)
    }
}

impl ChainBackend for MockBackend {
    fn owner(&self, _ctx: &RequestContext, domain: &Name) -> Result<Address, chain::Error> {
        self.inner.owner_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .domain(domain)
            .map(|state| state.owner)
            .unwrap_or(Address::ZERO))
    }

    fn resolver_address(
        &self,
        _ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Address, chain::Error> {
        match self.domain(domain) {
            Some(_) => Ok(Address::new([0x22; 20])),
            None => Err(chain::Error::NoContract),
        }
    }

    fn dns_resolver(
        &self,
        _ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Arc<dyn DnsResolver>, chain::Error> {
        self.inner.dns_resolver_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.domain(domain).ok_or(chain::Error::NoContract)?;
        let zone = state.dns_resolver?;
        Ok(Arc::new(MockDnsResolver { zone }))
    }

    fn text_resolver(
        &self,
        _ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Arc<dyn TextResolver>, chain::Error> {
        self.inner
            .text_resolver_calls
            .fetch_add(1, Ordering::Relaxed);
        let state = self.domain(domain).ok_or(chain::Error::NoContract)?;
        let text = state.text_resolver?;
        Ok(Arc::new(MockTextResolver { text }))
    }

    fn sync_progress(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Option<SyncProgress>, chain::Error> {
        if self.inner.syncing.load(Ordering::Relaxed) {
            Ok(Some(SyncProgress {
                current_block: 1,
                highest_block: 2,
            }))
        } else {
            Ok(None)
        }
    }
}

struct MockDnsResolver {
    zone: MockZone,
}

impl DnsResolver for MockDnsResolver {
    fn record(
        &self,
        _ctx: &RequestContext,
        qname: &Name,
        rr_type: Type,
    ) -> Result<Vec<u8>, chain::Error> {
        if self
            .zone
            .record_failures
            .iter()
            .any(|(failure_name, failure_type)| failure_name == qname && *failure_type == rr_type)
        {
            return Err(chain::Error::Transient("injected record failure".into()));
        }
        Ok(self.zone.blob(qname, rr_type))
    }

    fn has_records(&self, _ctx: &RequestContext, qname: &Name) -> Result<bool, chain::Error> {
        Ok(self.zone.records.iter().any(|rr| rr.owner == *qname))
    }
}

struct MockTextResolver {
    text: MockText,
}

impl TextResolver for MockTextResolver {
    fn content_hash(&self, _ctx: &RequestContext) -> Result<Vec<u8>, chain::Error> {
        self.text.content_hash.clone()
    }

    fn address(&self, _ctx: &RequestContext) -> Result<Address, chain::Error> {
        self.text.address.clone()
    }
}
