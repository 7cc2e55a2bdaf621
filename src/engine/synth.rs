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

//! Per-name record production.
//!
//! This is the policy half of the engine: given one name within one
//! authoritative domain, produce the records of the requested type.
//! For most queries that means unpacking the RRSET blob stored in the
//! domain's DNS resolver contract. Domains that carry a content hash
//! get special treatment for SOA, NS, TXT, A, and AAAA queries: web
//! traffic for such names is steered to the operator's content
//! gateway, so the engine synthesizes apex metadata and gateway
//! address records where stored ones are missing.
//!
//! Failure handling follows a simple principle: never let a transient
//! chain hiccup break a response the engine can still answer
//! usefully. Missing resolvers and empty ABI decodings mean "nothing
//! stored"; a transient content-hash failure falls back to stored
//! records; only a failed fetch of the records directly being asked
//! for surfaces as an error.

use chrono::{DateTime, Datelike, Timelike, Utc};
use log::{debug, warn};

use super::Engine;
use crate::cache::Miss;
use crate::chain::{self, ChainBackend};
use crate::class::Class;
use crate::contenthash;
use crate::ctx::RequestContext;
use crate::lookup::QueryError;
use crate::name::Name;
use crate::rr::{wire, Rdata, Rr, Ttl, Type};
use crate::util::push_hex;

/// The TTL of synthesized NS, TXT, and gateway address records.
const SYNTHETIC_TTL: u32 = 3600;

/// The TTL of the synthetic SOA record.
const SYNTHETIC_SOA_TTL: u32 = 10800;

impl<B: ChainBackend> Engine<B> {
    /// Produces the records of type `rr_type` for `name` within
    /// `zone`.
    pub(super) fn produce_records(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        name: &Name,
        rr_type: Type,
    ) -> Result<Vec<Rr>, QueryError> {
        let content_hash = match rr_type {
            Type::SOA | Type::NS | Type::TXT | Type::A | Type::AAAA => {
                self.probe_content_hash(ctx, zone)
            }
            _ => None,
        };

        if let Some(hash) = content_hash {
            match rr_type {
                Type::SOA => return Ok(self.synthesize_soa(name)),
                Type::NS => return Ok(self.synthesize_ns(zone)),
                Type::TXT => return self.synthesize_txt(ctx, zone, name, &hash),
                Type::A => return Ok(self.synthesize_a(ctx, zone, name)),
                Type::AAAA => return Ok(self.synthesize_aaaa(ctx, zone, name)),
                _ => (),
            }
        }
        self.stored_rrset(ctx, zone, name, rr_type)
    }

    /// Fetches `zone`'s content hash, returning it only if it is
    /// present and non-zero. Any failure selects passthrough mode.
    fn probe_content_hash(&self, ctx: &RequestContext, zone: &Name) -> Option<Vec<u8>> {
        let resolver = self.text_resolver(ctx, zone).ok()?;
        match resolver.content_hash(ctx) {
            Ok(hash) if !contenthash::is_absent(&hash) => Some(hash),
            Ok(_) => None,
            Err(chain::Error::EmptyAbi) => None,
            Err(e) => {
                debug!(
                    "content-hash fetch for {} failed, serving stored records: {}",
                    zone, e
                );
                None
            }
        }
    }

    /// Synthesizes the SOA record served for content-hash domains. The
    /// primary is the first configured nameserver and the serial is
    /// derived from the current UTC time.
    fn synthesize_soa(&self, name: &Name) -> Vec<Rr> {
        let primary = match self.policy.name_servers.first() {
            Some(primary) => primary,
            None => return Vec::new(),
        };
        let rname = match name.prepend(b"hostmaster") {
            Ok(rname) => rname,
            Err(e) => {
                warn!("cannot form the SOA RNAME for {}: {}", name, e);
                return Vec::new();
            }
        };
        vec![Rr::new(
            primary.clone(),
            Type::SOA,
            Class::IN,
            Ttl::from(SYNTHETIC_SOA_TTL),
            Rdata::soa(
                primary,
                &rname,
                soa_serial(&Utc::now()),
                3600,
                600,
                1209600,
                300,
            ),
        )]
    }

    /// Synthesizes one NS record per configured nameserver, owned by
    /// the domain.
    fn synthesize_ns(&self, zone: &Name) -> Vec<Rr> {
        self.policy
            .name_servers
            .iter()
            .map(|nameserver| {
                Rr::new(
                    zone.clone(),
                    Type::NS,
                    Class::IN,
                    Ttl::from(SYNTHETIC_TTL),
                    Rdata::from_name(nameserver),
                )
            })
            .collect()
    }

    /// Produces TXT records: the stored TXT RRset, plus the domain's
    /// address, content hash, and `dnslink` rendition when the name is
    /// the on-chain domain itself.
    fn synthesize_txt(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        name: &Name,
        hash: &[u8],
    ) -> Result<Vec<Rr>, QueryError> {
        let mut results = self.stored_rrset_lenient(ctx, zone, name, Type::TXT);

        // Only the name with an on-chain presence gets the metadata
        // records.
        if name != zone {
            return Ok(results);
        }

        let resolver = match self.text_resolver(ctx, zone) {
            Ok(resolver) => resolver,
            Err(miss) => {
                warn!("error obtaining text resolver for {}: {:?}", zone, miss);
                return Ok(results);
            }
        };
        match resolver.address(ctx) {
            Ok(address) if !address.is_zero() => {
                self.push_txt(&mut results, name, format!("a={}", address));
            }
            Ok(_) | Err(chain::Error::EmptyAbi) => (),
            Err(e) => return Err(QueryError::Backend(e)),
        }

        let mut text = String::from("contenthash=0x");
        push_hex(&mut text, hash);
        self.push_txt(&mut results, name, text);

        // dnslink is provided for compatibility with gateways that
        // resolve content through it. An undecodable hash simply has
        // no dnslink form.
        if let Some(rendered) = contenthash::to_text(hash) {
            self.push_txt(&mut results, name, format!("dnslink={}", rendered));
        }
        Ok(results)
    }

    fn push_txt(&self, results: &mut Vec<Rr>, owner: &Name, text: String) {
        match Rdata::txt([text]) {
            Ok(rdata) => results.push(Rr::new(
                owner.clone(),
                Type::TXT,
                Class::IN,
                Ttl::from(SYNTHETIC_TTL),
                rdata,
            )),
            Err(e) => warn!("skipping synthesized TXT for {}: {}", owner, e),
        }
    }

    /// Produces A records: the stored A RRset if there is one, and the
    /// configured gateway addresses otherwise.
    fn synthesize_a(&self, ctx: &RequestContext, zone: &Name, name: &Name) -> Vec<Rr> {
        let stored = self.stored_rrset_lenient(ctx, zone, name, Type::A);
        if !stored.is_empty() {
            return stored;
        }
        self.policy
            .ipfs_gateway_a
            .iter()
            .map(|&addr| {
                Rr::new(
                    name.clone(),
                    Type::A,
                    Class::IN,
                    Ttl::from(SYNTHETIC_TTL),
                    Rdata::from_ipv4(addr),
                )
            })
            .collect()
    }

    /// The AAAA analogue of [`Engine::synthesize_a`].
    fn synthesize_aaaa(&self, ctx: &RequestContext, zone: &Name, name: &Name) -> Vec<Rr> {
        let stored = self.stored_rrset_lenient(ctx, zone, name, Type::AAAA);
        if !stored.is_empty() {
            return stored;
        }
        self.policy
            .ipfs_gateway_aaaa
            .iter()
            .map(|&addr| {
                Rr::new(
                    name.clone(),
                    Type::AAAA,
                    Class::IN,
                    Ttl::from(SYNTHETIC_TTL),
                    Rdata::from_ipv6(addr),
                )
            })
            .collect()
    }

    /// Fetches and unpacks the stored RRSET for `(name, rr_type)`. A
    /// domain without a DNS resolver simply has no stored records; a
    /// transient fetch failure is an error for the caller to surface.
    fn stored_rrset(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        name: &Name,
        rr_type: Type,
    ) -> Result<Vec<Rr>, QueryError> {
        let resolver = match self.dns_resolver(ctx, zone) {
            Ok(resolver) => resolver,
            Err(Miss::Absent) => return Ok(Vec::new()),
            Err(Miss::Transient(e)) => {
                debug!("DNS resolver discovery for {} failed: {}", zone, e);
                return Ok(Vec::new());
            }
        };
        match resolver.record(ctx, name, rr_type) {
            Ok(blob) => Ok(wire::unpack_rrset(&blob)),
            Err(chain::Error::EmptyAbi) => Ok(Vec::new()),
            Err(e) => Err(QueryError::Backend(e)),
        }
    }

    /// Like [`Engine::stored_rrset`], but treats fetch failures as "no
    /// stored records," for contexts where synthesized defaults exist.
    fn stored_rrset_lenient(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        name: &Name,
        rr_type: Type,
    ) -> Vec<Rr> {
        match self.stored_rrset(ctx, zone, name, rr_type) {
            Ok(rrs) => rrs,
            Err(e) => {
                debug!("stored RRSET fetch for {} failed: {}", name, e);
                Vec::new()
            }
        }
    }
}

/// Computes the synthetic SOA serial: the UTC date as `YYYYMMDD`,
/// followed by a two-digit fraction-of-day counter.
fn soa_serial(now: &DateTime<Utc>) -> u32 {
    let date = now.year() as u32 * 10000 + now.month() * 100 + now.day();
    let counter = ((now.hour() * 3600 + now.minute()) * 100) / 86400;
    date * 100 + counter
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
