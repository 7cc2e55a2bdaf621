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

//! The recursive authoritative lookup driver.
//!
//! [`lookup`] moves through the DNS hierarchy and gathers the records
//! for a question, following [RFC 1034 § 4.3.2] as clarified by [RFC
//! 4592] (wildcards) and [RFC 6672] (DNAME). It operates over the
//! [`Authority`] capability so it can be driven against the real
//! engine or a test double. The steps, in order:
//!
//! 1. Find the lowest (longest) domain for which we are authoritative;
//!    with none, the question is not ours to answer.
//! 2. Search the strict ancestors of QNAME, nearest first, for a DNAME
//!    record; on a hit, rewrite QNAME and restart.
//! 3. If QNAME owns no records at all, retry with its first label
//!    replaced by `*`, rewriting owner names in the result.
//! 4. Answer NS questions from the zone apex, with address glue.
//! 5. Chase a CNAME if one is present and was not asked for.
//! 6. Answer from the records of QNAME itself.
//!
//! Lookups are pure: all per-request state lives on the stack, plus a
//! small memo that keeps [`Authority::is_authoritative`] to one call
//! per distinct zone per request.
//!
//! [RFC 1034 § 4.3.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-4.3.2
//! [RFC 4592]: https://datatracker.ietf.org/doc/html/rfc4592
//! [RFC 6672]: https://datatracker.ietf.org/doc/html/rfc6672

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::cache::Miss;
use crate::chain;
use crate::class::Class;
use crate::ctx::RequestContext;
use crate::name::Name;
use crate::rr::{Rdata, Rr, Type};

/// The maximum number of chained lookups (CNAME, DNAME, wildcard) one
/// request may trigger. Every chain step strictly rewrites the name,
/// so legitimate configurations stay well under this; the cap defends
/// against rewrite loops.
const MAX_CHAIN_DEPTH: usize = 10;

////////////////////////////////////////////////////////////////////////
// CAPABILITIES                                                       //
////////////////////////////////////////////////////////////////////////

/// The capability set the lookup driver requires of an authoritative
/// record server.
///
/// [`Engine`](crate::engine::Engine) is the production implementation;
/// tests substitute in-memory doubles.
pub trait Authority {
    /// Returns the records of type `rr_type` for `qname` within the
    /// authoritative domain `zone`.
    fn query(
        &self,
        ctx: &RequestContext,
        zone: &Name,
        qname: &Name,
        rr_type: Type,
        do_bit: bool,
    ) -> Result<Vec<Rr>, QueryError>;

    /// Returns whether any records of any type exist for `qname`
    /// within `zone`. Used to decide wildcard eligibility.
    fn has_records(&self, ctx: &RequestContext, zone: &Name, qname: &Name)
        -> Result<bool, QueryError>;

    /// Returns whether this server is authoritative for `domain`.
    fn is_authoritative(&self, ctx: &RequestContext, domain: &Name) -> bool;
}

/// An error produced by an [`Authority`] operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryError {
    /// The request was cancelled.
    Cancelled,

    /// The domain has no resolver of the required kind.
    NoResolver,

    /// The backend failed.
    Backend(chain::Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("request cancelled"),
            Self::NoResolver => f.write_str("no resolver"),
            Self::Backend(e) => write!(f, "backend failure: {}", e),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<Miss> for QueryError {
    fn from(miss: Miss) -> Self {
        match miss {
            Miss::Absent => Self::NoResolver,
            Miss::Transient(e) => Self::Backend(e),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// RESULTS                                                            //
////////////////////////////////////////////////////////////////////////

/// The overall disposition of a lookup, which the serving layer maps
/// to a DNS RCODE.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LookupResult {
    /// The lookup produced an answer.
    Success,

    /// The name does not exist.
    NameError,

    /// The lookup resulted in a delegation.
    Delegation,

    /// The name is not ours to answer, or it has no records of the
    /// requested type.
    NoData,

    /// The lookup failed; the client should retry later.
    ServerFailure,
}

/// The records gathered by a lookup, by message section, along with
/// the [`LookupResult`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LookupOutput {
    pub answer: Vec<Rr>,
    pub authority: Vec<Rr>,
    pub additional: Vec<Rr>,
    pub result: LookupResult,
}

impl LookupOutput {
    fn empty(result: LookupResult) -> Self {
        Self {
            answer: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            result,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// THE LOOKUP DRIVER                                                  //
////////////////////////////////////////////////////////////////////////

/// Looks up `qname`/`rr_type` against `server` and gathers the records
/// of the response.
pub fn lookup<A: Authority>(
    server: &A,
    ctx: &RequestContext,
    qname: &Name,
    rr_type: Type,
    do_bit: bool,
) -> LookupOutput {
    let qname = qname.to_lowercase();
    let mut auth_memo = HashMap::new();
    lookup_inner(server, ctx, &qname, rr_type, do_bit, 0, &mut auth_memo)
}

fn lookup_inner<A: Authority>(
    server: &A,
    ctx: &RequestContext,
    qname: &Name,
    rr_type: Type,
    do_bit: bool,
    depth: usize,
    auth_memo: &mut HashMap<Name, bool>,
) -> LookupOutput {
    if depth >= MAX_CHAIN_DEPTH {
        debug!("lookup of {} exceeded the chain depth limit", qname);
        return LookupOutput::empty(LookupResult::ServerFailure);
    }

    let zone = match lowest_authoritative_domain(server, ctx, qname, auth_memo) {
        Some(zone) => zone,
        None => return LookupOutput::empty(LookupResult::NoData),
    };

    let mut answer = Vec::new();
    let mut authority = Vec::new();
    let mut additional = Vec::new();

    // Search the strict ancestors of QNAME, nearest first, up to but
    // excluding the zone, for a DNAME. The first hit rewrites QNAME
    // (RFC 6672 § 2.2) and restarts the lookup under the new name. A
    // CNAME with the rewritten target is synthesized for the benefit
    // of older resolvers (RFC 6672 § 3.1).
    let mut ancestor = qname.parent();
    while let Some(dname_owner) = ancestor {
        if dname_owner.label_count() <= zone.label_count() {
            break;
        }
        let dname_rrs = match server.query(ctx, &zone, &dname_owner, Type::DNAME, do_bit) {
            Ok(rrs) => rrs,
            Err(_) => return LookupOutput::empty(LookupResult::ServerFailure),
        };
        if let Some(dname) = dname_rrs.into_iter().next() {
            let target = match dname.target() {
                Some(target) => target,
                None => return LookupOutput::empty(LookupResult::ServerFailure),
            };
            let substituted = match qname.with_suffix_replaced(&dname_owner, &target) {
                Ok(substituted) => substituted.to_lowercase(),
                Err(_) => return LookupOutput::empty(LookupResult::ServerFailure),
            };
            let ttl = dname.ttl;
            answer.push(dname);
            answer.push(Rr::new(
                qname.clone(),
                Type::CNAME,
                Class::IN,
                ttl,
                Rdata::from_name(&substituted),
            ));

            let sub = lookup_inner(server, ctx, &substituted, rr_type, do_bit, depth + 1, auth_memo);
            if sub.result == LookupResult::Success {
                answer.extend(sub.answer);
                authority.extend(sub.authority);
                additional.extend(sub.additional);
            }
            return LookupOutput {
                answer,
                authority,
                additional,
                result: sub.result,
            };
        }
        ancestor = dname_owner.parent();
    }

    // Wildcard substitution: if QNAME owns no records at all, retry
    // with its first label replaced by "*", then rewrite the wildcard
    // owner names in the result back to QNAME (RFC 4592 § 2.2.1). A
    // zone that is itself a wildcard is never substituted again.
    if !zone.is_wildcard() && matches!(server.has_records(ctx, &zone, qname), Ok(false)) {
        if let Some(wildcard) = qname.to_wildcard() {
            if wildcard != *qname {
                let mut sub =
                    lookup_inner(server, ctx, &wildcard, rr_type, do_bit, depth + 1, auth_memo);
                if sub.result == LookupResult::Success {
                    for section in [&mut sub.answer, &mut sub.authority, &mut sub.additional] {
                        for rr in section.iter_mut() {
                            if rr.owner == wildcard {
                                rr.owner = qname.clone();
                            }
                        }
                    }
                    answer.extend(sub.answer);
                    authority.extend(sub.authority);
                    additional.extend(sub.additional);
                }
                return LookupOutput {
                    answer,
                    authority,
                    additional,
                    result: sub.result,
                };
            }
        }
    }

    // NS questions are answered from the zone apex only, with address
    // glue for each nameserver in the additional section.
    if rr_type == Type::NS {
        let ns_rrs = match server.query(ctx, &zone, &zone, Type::NS, do_bit) {
            Ok(rrs) => rrs,
            Err(_) => return LookupOutput::empty(LookupResult::ServerFailure),
        };
        if *qname != zone || ns_rrs.is_empty() {
            return LookupOutput::empty(LookupResult::NoData);
        }
        for ns in &ns_rrs {
            if let Some(nameserver) = ns.target() {
                if let Ok(glue) = server.query(ctx, &zone, &nameserver, Type::A, do_bit) {
                    additional.extend(glue);
                }
                if let Ok(glue) = server.query(ctx, &zone, &nameserver, Type::AAAA, do_bit) {
                    additional.extend(glue);
                }
            }
        }
        answer.extend(ns_rrs);
        return LookupOutput {
            answer,
            authority,
            additional,
            result: LookupResult::Success,
        };
    }

    // If we weren't asked for a CNAME, check for one and chase it.
    if rr_type != Type::CNAME {
        let cname_rrs = match server.query(ctx, &zone, qname, Type::CNAME, do_bit) {
            Ok(rrs) => rrs,
            Err(_) => return LookupOutput::empty(LookupResult::ServerFailure),
        };
        if let Some(cname) = cname_rrs.into_iter().next() {
            let target = match cname.target() {
                Some(target) => target.to_lowercase(),
                None => return LookupOutput::empty(LookupResult::ServerFailure),
            };
            answer.push(cname);

            let sub = lookup_inner(server, ctx, &target, rr_type, do_bit, depth + 1, auth_memo);
            if sub.result == LookupResult::Success {
                answer.extend(sub.answer);
                authority.extend(sub.authority);
                additional.extend(sub.additional);
            }
            return LookupOutput {
                answer,
                authority,
                additional,
                result: sub.result,
            };
        }
    }

    // Finally, the records of QNAME itself.
    let rrs = match server.query(ctx, &zone, qname, rr_type, do_bit) {
        Ok(rrs) => rrs,
        Err(_) => return LookupOutput::empty(LookupResult::ServerFailure),
    };
    if rrs.is_empty() {
        return LookupOutput::empty(LookupResult::NoData);
    }
    answer.extend(rrs);

    // An SOA answer is accompanied by the zone's NS RRset in the
    // authority section.
    if rr_type == Type::SOA {
        if let Ok(ns_rrs) = server.query(ctx, &zone, &zone, Type::NS, do_bit) {
            authority.extend(ns_rrs);
        }
    }

    LookupOutput {
        answer,
        authority,
        additional,
        result: LookupResult::Success,
    }
}

/// Finds the lowest (longest) domain for which `server` is
/// authoritative that is a label-aligned suffix of `name`, testing
/// suffixes from the TLD downward.
fn lowest_authoritative_domain<A: Authority>(
    server: &A,
    ctx: &RequestContext,
    name: &Name,
    auth_memo: &mut HashMap<Name, bool>,
) -> Option<Name> {
    let mut lowest = None;
    // Suffixes from "tld." down to the full name; the root itself is
    // never authoritative.
    for skip in (0..name.label_count().saturating_sub(1)).rev() {
        let candidate = name.suffix(skip).unwrap();
        let authoritative = match auth_memo.get(&candidate) {
            Some(&memoized) => memoized,
            None => {
                let fresh = server.is_authoritative(ctx, &candidate);
                auth_memo.insert(candidate.clone(), fresh);
                fresh
            }
        };
        if authoritative {
            lowest = Some(candidate);
        }
    }
    lowest
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
