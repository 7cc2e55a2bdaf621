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

//! The request/response surface toward the DNS serving framework.
//!
//! The framework owns sockets, message parsing, and handler chaining;
//! this module defines the shapes exchanged with it. [`handle`] runs
//! the [lookup](crate::lookup) for a parsed question and maps its
//! outcome to a wire-level disposition: a [`Reply`] carrying an RCODE
//! and three record sections, or an instruction to let the next
//! handler in the chain take the question.

use crate::ctx::RequestContext;
use crate::lookup::{self, Authority, LookupResult};
use crate::name::Name;
use crate::rr::{Rr, Type};

////////////////////////////////////////////////////////////////////////
// SHAPES                                                             //
////////////////////////////////////////////////////////////////////////

/// The parts of an inbound query the engine consumes.
#[derive(Clone, Debug)]
pub struct Request {
    pub qname: Name,
    pub qtype: Type,

    /// The EDNS DO bit. Plumbed through to record lookups; this engine
    /// serves no DNSSEC records, but the bit is preserved for backends
    /// that might.
    pub do_bit: bool,
}

/// The RCODE of a response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rcode {
    NoError,
    NxDomain,
    ServFail,
}

impl From<Rcode> for u8 {
    fn from(rcode: Rcode) -> Self {
        match rcode {
            Rcode::NoError => 0,
            Rcode::ServFail => 2,
            Rcode::NxDomain => 3,
        }
    }
}

/// A response for the framework to encode and send.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    pub rcode: Rcode,
    pub authoritative: bool,
    pub answer: Vec<Rr>,
    pub authority: Vec<Rr>,
    pub additional: Vec<Rr>,
}

impl Reply {
    fn empty(rcode: Rcode, authoritative: bool) -> Self {
        Self {
            rcode,
            authoritative,
            answer: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }
}

/// What the framework should do with a question.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// Send this reply.
    Answer(Reply),

    /// The question is not ours; pass it to the next handler. Only
    /// produced when the caller reports that a next handler exists.
    NextHandler,
}

////////////////////////////////////////////////////////////////////////
// DISPATCH                                                           //
////////////////////////////////////////////////////////////////////////

/// Handles one question against `server`.
///
/// `has_next` reports whether another handler follows this one in the
/// framework's chain. A question we are not authoritative for (or that
/// has no data) defers to that handler when it exists and is otherwise
/// answered with an empty NOERROR response.
pub fn handle<A: Authority>(
    server: &A,
    ctx: &RequestContext,
    request: &Request,
    has_next: bool,
) -> Disposition {
    let output = lookup::lookup(server, ctx, &request.qname, request.qtype, request.do_bit);
    match output.result {
        LookupResult::Success => Disposition::Answer(Reply {
            rcode: Rcode::NoError,
            authoritative: true,
            answer: output.answer,
            authority: output.authority,
            additional: output.additional,
        }),
        LookupResult::NoData | LookupResult::Delegation => {
            if has_next {
                Disposition::NextHandler
            } else {
                Disposition::Answer(Reply::empty(Rcode::NoError, true))
            }
        }
        LookupResult::NameError => Disposition::Answer(Reply {
            rcode: Rcode::NxDomain,
            authoritative: true,
            answer: output.answer,
            authority: output.authority,
            additional: output.additional,
        }),
        // No partial sections escape a failed lookup.
        LookupResult::ServerFailure => {
            Disposition::Answer(Reply::empty(Rcode::ServFail, false))
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::QueryError;
    use crate::testing::{a_rr, name};

    /// A one-zone authority with scripted behavior.
    struct ScriptedServer {
        fail: bool,
    }

    impl Authority for ScriptedServer {
        fn query(
            &self,
            _ctx: &RequestContext,
            _zone: &Name,
            qname: &Name,
            rr_type: Type,
            _do_bit: bool,
        ) -> Result<Vec<Rr>, QueryError> {
            if self.fail {
                return Err(QueryError::Backend(crate::chain::Error::Transient(
                    "down".into(),
                )));
            }
            if *qname == name("www.scripted.test.") && rr_type == Type::A {
                Ok(vec![a_rr("www.scripted.test.", "1.2.3.4")])
            } else {
                Ok(Vec::new())
            }
        }

        fn has_records(
            &self,
            _ctx: &RequestContext,
            _zone: &Name,
            qname: &Name,
        ) -> Result<bool, QueryError> {
            Ok(*qname == name("www.scripted.test."))
        }

        fn is_authoritative(&self, _ctx: &RequestContext, domain: &Name) -> bool {
            *domain == name("scripted.test.")
        }
    }

    fn request(qname: &str, qtype: Type) -> Request {
        Request {
            qname: name(qname),
            qtype,
            do_bit: false,
        }
    }

    #[test]
    fn answers_map_to_noerror() {
        let server = ScriptedServer { fail: false };
        let disposition = handle(
            &server,
            &RequestContext::new(),
            &request("www.scripted.test.", Type::A),
            false,
        );
        match disposition {
            Disposition::Answer(reply) => {
                assert_eq!(reply.rcode, Rcode::NoError);
                assert!(reply.authoritative);
                assert_eq!(reply.answer, vec![a_rr("www.scripted.test.", "1.2.3.4")]);
            }
            Disposition::NextHandler => panic!("expected an answer"),
        }
    }

    #[test]
    fn no_data_defers_to_the_next_handler_when_one_exists() {
        let server = ScriptedServer { fail: false };
        let ctx = RequestContext::new();
        let req = request("elsewhere.example.", Type::A);
        assert_eq!(handle(&server, &ctx, &req, true), Disposition::NextHandler);

        // Without a next handler, the question gets an empty NOERROR.
        match handle(&server, &ctx, &req, false) {
            Disposition::Answer(reply) => {
                assert_eq!(reply.rcode, Rcode::NoError);
                assert!(reply.answer.is_empty());
            }
            Disposition::NextHandler => panic!("expected an answer"),
        }
    }

    #[test]
    fn failures_map_to_servfail_with_no_partial_sections() {
        let server = ScriptedServer { fail: true };
        let disposition = handle(
            &server,
            &RequestContext::new(),
            &request("www.scripted.test.", Type::A),
            true,
        );
        match disposition {
            Disposition::Answer(reply) => {
                assert_eq!(reply.rcode, Rcode::ServFail);
                assert!(!reply.authoritative);
                assert!(reply.answer.is_empty());
                assert!(reply.authority.is_empty());
                assert!(reply.additional.is_empty());
            }
            Disposition::NextHandler => panic!("expected an answer"),
        }
    }

    #[test]
    fn rcode_values_match_the_wire() {
        assert_eq!(u8::from(Rcode::NoError), 0);
        assert_eq!(u8::from(Rcode::ServFail), 2);
        assert_eq!(u8::from(Rcode::NxDomain), 3);
    }

    #[test]
    fn cancellation_maps_to_servfail() {
        let ctx = RequestContext::new();
        ctx.cancel();

        // A cancelled context fails record queries, which surfaces as
        // SERVFAIL once the zone has been located.
        struct CancelAware;
        impl Authority for CancelAware {
            fn query(
                &self,
                ctx: &RequestContext,
                _zone: &Name,
                _qname: &Name,
                _rr_type: Type,
                _do_bit: bool,
            ) -> Result<Vec<Rr>, QueryError> {
                if ctx.is_cancelled() {
                    Err(QueryError::Cancelled)
                } else {
                    Ok(Vec::new())
                }
            }

            fn has_records(
                &self,
                _ctx: &RequestContext,
                _zone: &Name,
                _qname: &Name,
            ) -> Result<bool, QueryError> {
                Ok(true)
            }

            fn is_authoritative(&self, _ctx: &RequestContext, _domain: &Name) -> bool {
                true
            }
        }

        match handle(&CancelAware, &ctx, &request("a.b.test.", Type::A), true) {
            Disposition::Answer(reply) => assert_eq!(reply.rcode, Rcode::ServFail),
            Disposition::NextHandler => panic!("expected an answer"),
        }
    }
}
