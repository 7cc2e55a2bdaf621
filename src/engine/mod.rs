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

//! The authoritative engine over a chain backend.
//!
//! [`Engine`] binds a [`ChainBackend`] to the [`Authority`] capability
//! the lookup driver consumes. It answers three questions:
//!
//! * *Is this name ours?* A domain is authoritative exactly when the
//!   chain records a non-zero owner address for it.
//! * *Does this name own records?* Answered through the domain's DNS
//!   resolver contract, for wildcard eligibility.
//! * *What are the records?* Answered by the record synthesis in
//!   [`synth`], which overlays gateway and metadata records on stored
//!   RRSETs when the domain carries a content hash.
//!
//! The engine holds the two per-variant resolver caches and the
//! operator's synthesis [`Policy`]; everything else is per-request
//! stack state, so one `Engine` serves any number of concurrent
//! queries.

mod synth;

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use log::debug;

use crate::cache::{Miss, ResolverCache, DEFAULT_CAPACITY};
use crate::chain::{ChainBackend, DnsResolver, TextResolver};
use crate::ctx::RequestContext;
use crate::lookup::{Authority, QueryError};
use crate::name::Name;
use crate::rr::{Rr, Type};

////////////////////////////////////////////////////////////////////////
// POLICY                                                             //
////////////////////////////////////////////////////////////////////////

/// The operator-configured inputs to record synthesis.
#[derive(Clone, Debug, Default)]
pub struct Policy {
    /// The names of this service's own nameservers. The first one is
    /// the primary used in synthetic SOA records.
    pub name_servers: Vec<Name>,

    /// IPv4 addresses of the content gateway, served as A records for
    /// names that have a content hash but no stored A RRset.
    pub ipfs_gateway_a: Vec<Ipv4Addr>,

    /// IPv6 addresses of the content gateway, served as AAAA records
    /// for names that have a content hash but no stored AAAA RRset.
    pub ipfs_gateway_aaaa: Vec<Ipv6Addr>,
}

////////////////////////////////////////////////////////////////////////
// THE ENGINE                                                         //
////////////////////////////////////////////////////////////////////////

/// The authoritative resolution engine.
pub struct Engine<B> {
    backend: B,
    policy: Policy,
    dns_resolvers: ResolverCache<dyn DnsResolver>,
    text_resolvers: ResolverCache<dyn TextResolver>,
}

impl<B: ChainBackend> Engine<B> {
    /// Creates an engine over `backend` with the given synthesis
    /// policy.
    pub fn new(backend: B, policy: Policy) -> Self {
        Self {
            backend,
            policy,
            dns_resolvers: ResolverCache::new(DEFAULT_CAPACITY),
            text_resolvers: ResolverCache::new(DEFAULT_CAPACITY),
        }
    }

    /// Returns whether the engine is ready to serve, i.e. whether the
    /// backing node reports itself fully synced. Polled by the host's
    /// health check.
    pub fn ready(&self, ctx: &RequestContext) -> bool {
        matches!(self.backend.sync_progress(ctx), Ok(None))
    }

    /// Returns `domain`'s DNS resolver handle, through the cache.
    fn dns_resolver(
        &self,
        ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Arc<dyn DnsResolver>, Miss> {
        self.dns_resolvers
            .get(domain, || self.backend.dns_resolver(ctx, domain))
    }

    /// Returns `domain`'s text resolver handle, through the cache.
    fn text_resolver(
        &self,
        ctx: &RequestContext,
        domain: &Name,
    ) -> Result<Arc<dyn TextResolver>, Miss> {
        self.text_resolvers
            .get(domain, || self.backend.text_resolver(ctx, domain))
    }
}

impl<B: ChainBackend> Authority for Engine<B> {
    fn query(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        qname: &Name,
        rr_type: Type,
        _do_bit: bool,
    ) -> Result<Vec<Rr>, QueryError> {
        if ctx.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        debug!("query for {} {} in domain {}", qname, rr_type, zone);
        self.produce_records(ctx, zone, qname, rr_type)
    }

    fn has_records(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        qname: &Name,
    ) -> Result<bool, QueryError> {
        if ctx.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let resolver = self.dns_resolver(ctx, zone).map_err(QueryError::from)?;
        resolver.has_records(ctx, qname).map_err(QueryError::Backend)
    }

    fn is_authoritative(&self, ctx: &RequestContext, domain: &Name) -> bool {
        match self.backend.owner(ctx, domain) {
            Ok(owner) => !owner.is_zero(),
            Err(e) => {
                debug!("owner lookup for {} failed: {}", domain, e);
                false
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{self, Address};
    use crate::testing::{a_rr, name, MockBackend, MockDomain, MockZone};

    fn engine_with(backend: MockBackend) -> Engine<MockBackend> {
        Engine::new(
            backend,
            Policy {
                name_servers: vec![name("ns1.ethdns.test."), name("ns2.ethdns.test.")],
                ipfs_gateway_a: vec!["10.0.0.1".parse().unwrap()],
                ipfs_gateway_aaaa: vec!["fd00::1".parse().unwrap()],
            },
        )
    }

    #[test]
    fn authority_follows_owner_addresses() {
        let backend = MockBackend::new();
        backend.add_domain("owned.eth.", MockDomain::owned());
        backend.add_domain("unowned.eth.", {
            let mut domain = MockDomain::owned();
            domain.owner = Address::ZERO;
            domain
        });
        let counters = backend.counters();
        let engine = engine_with(backend);
        let ctx = RequestContext::new();
        assert!(engine.is_authoritative(&ctx, &name("owned.eth.")));
        assert!(!engine.is_authoritative(&ctx, &name("unowned.eth.")));
        assert!(!engine.is_authoritative(&ctx, &name("missing.eth.")));
        assert_eq!(counters.owner_calls(), 3);
    }

    #[test]
    fn has_records_requires_a_dns_resolver() {
        let backend = MockBackend::new();
        let mut domain = MockDomain::owned();
        domain.dns_resolver = Ok(MockZone::with_records(vec![a_rr(
            "www.myens.eth.",
            "1.2.3.4",
        )]));
        backend.add_domain("myens.eth.", domain);
        backend.add_domain("textonly.eth.", MockDomain::owned());

        let engine = engine_with(backend);
        let ctx = RequestContext::new();
        assert_eq!(
            engine.has_records(&ctx, &name("myens.eth."), &name("www.myens.eth.")),
            Ok(true),
        );
        assert_eq!(
            engine.has_records(&ctx, &name("myens.eth."), &name("other.myens.eth.")),
            Ok(false),
        );
        // No DNS resolver contract at all: the probe errors, which the
        // lookup driver treats as "not wildcard-eligible."
        assert_eq!(
            engine.has_records(&ctx, &name("textonly.eth."), &name("textonly.eth.")),
            Err(QueryError::NoResolver),
        );
    }

    #[test]
    fn resolver_discovery_is_cached_across_queries() {
        let backend = MockBackend::new();
        let mut domain = MockDomain::owned();
        domain.dns_resolver = Ok(MockZone::with_records(vec![a_rr("myens.eth.", "1.2.3.4")]));
        backend.add_domain("myens.eth.", domain);
        let counters = backend.counters();

        let engine = engine_with(backend);
        let ctx = RequestContext::new();
        for _ in 0..3 {
            engine
                .query(&ctx, &name("myens.eth."), &name("myens.eth."), Type::A, false)
                .unwrap();
        }
        // Every A query probes the content hash, but both resolver
        // variants are discovered on-chain only once.
        assert_eq!(counters.dns_resolver_calls(), 1);
        assert_eq!(counters.text_resolver_calls(), 1);
    }

    #[test]
    fn negative_resolver_lookups_are_cached() {
        let backend = MockBackend::new();
        let mut domain = MockDomain::owned();
        domain.dns_resolver = Err(chain::Error::NoContract);
        backend.add_domain("myens.eth.", domain);
        let counters = backend.counters();

        let engine = engine_with(backend);
        let ctx = RequestContext::new();
        for _ in 0..3 {
            let records = engine
                .query(&ctx, &name("myens.eth."), &name("myens.eth."), Type::MX, false)
                .unwrap();
            assert!(records.is_empty());
        }
        assert_eq!(counters.dns_resolver_calls(), 1);
    }

    #[test]
    fn cancellation_surfaces_immediately() {
        let backend = MockBackend::new();
        backend.add_domain("myens.eth.", MockDomain::owned());
        let engine = engine_with(backend);
        let ctx = RequestContext::new();
        ctx.cancel();
        assert_eq!(
            engine.query(&ctx, &name("myens.eth."), &name("myens.eth."), Type::A, false),
            Err(QueryError::Cancelled),
        );
        assert_eq!(
            engine.has_records(&ctx, &name("myens.eth."), &name("myens.eth.")),
            Err(QueryError::Cancelled),
        );
    }

    #[test]
    fn readiness_tracks_sync_progress() {
        let backend = MockBackend::new();
        let engine = engine_with(backend.clone());
        let ctx = RequestContext::new();
        assert!(engine.ready(&ctx));

        backend.set_syncing(true);
        assert!(!engine.ready(&ctx));
    }
}
