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

//! An authoritative DNS engine for names registered on-chain.
//!
//! `ethlink` bridges the conventional DNS namespace to a
//! blockchain-based naming registry. Given a DNS question, it decides
//! whether it is authoritative for the name (the chain records an
//! owner for it), then either serves the wire-format RRSETs stored in
//! the name's on-chain resolver contract or synthesizes records that
//! steer web traffic to a content gateway, based on the content hash
//! recorded for the name.
//!
//! The crate is an embeddable engine, not a server: the DNS serving
//! framework owns sockets and message codecs and talks to this crate
//! through the shapes in [`handler`], while the blockchain RPC client
//! implements the capability traits in [`chain`]. In between sit the
//! [`lookup`] driver (DNAME rewriting, CNAME chasing, wildcard
//! synthesis, NS glue) and the [`engine`], which combines the
//! resolver [`cache`]s with the record-synthesis policies.

pub mod cache;
pub mod chain;
pub mod class;
pub mod config;
pub mod contenthash;
pub mod ctx;
pub mod engine;
pub mod handler;
pub mod lookup;
pub mod name;
pub mod rr;

mod util;

#[cfg(test)]
mod testing;
