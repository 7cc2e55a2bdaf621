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

//! A bounded cache of per-domain resolver handles.
//!
//! Discovering a domain's resolver costs a registry RPC plus contract
//! validation, so handles are cached per domain. Domains that
//! definitively have no resolver of a given kind are negative-cached,
//! so that repeated queries for unregistered names do not hammer the
//! chain. The engine keeps two caches: DNS resolvers and text
//! resolvers are separate contract kinds, and a domain may have either
//! one without the other.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::chain;
use crate::name::Name;

/// The default number of entries kept per cache.
pub const DEFAULT_CAPACITY: usize = 16;

/// A cached state for one domain.
enum Entry<R: ?Sized> {
    /// A live resolver handle.
    Live(Arc<R>),

    /// The domain definitively has no resolver of this kind.
    Absent,
}

/// Why a [`ResolverCache::get`] produced no handle.
#[derive(Debug)]
pub enum Miss {
    /// The domain has no resolver of this kind (negative-cached).
    Absent,

    /// Construction failed for a reason that may not persist; nothing
    /// was cached.
    Transient(chain::Error),
}

/// A bounded LRU cache of domain → resolver handle.
///
/// `R` is the handle trait object type. The cache is shared across
/// request handlers and internally synchronized.
pub struct ResolverCache<R: ?Sized> {
    entries: Mutex<LruCache<Name, Entry<R>>>,
}

impl<R: ?Sized> ResolverCache<R> {
    /// Creates a cache bounded to `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up the handle for `domain`, constructing it with `create`
    /// on a miss.
    ///
    /// `create` runs without the cache lock held, so a slow chain RPC
    /// for one domain does not stall lookups of others. Its outcome is
    /// recorded as follows:
    ///
    /// * success inserts the live handle;
    /// * a definitive absence ([`chain::Error::is_absent`]) inserts
    ///   the negative sentinel, unless a concurrent call already
    ///   inserted a live handle, which takes precedence;
    /// * any other error inserts nothing and is reported as
    ///   [`Miss::Transient`].
    pub fn get<F>(&self, domain: &Name, create: F) -> Result<Arc<R>, Miss>
    where
        F: FnOnce() -> Result<Arc<R>, chain::Error>,
    {
        {
            let mut entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get(domain) {
                match entry {
                    Entry::Live(handle) => return Ok(handle.clone()),
                    Entry::Absent => return Err(Miss::Absent),
                }
            }
        }

        match create() {
            Ok(handle) => {
                let mut entries = self.entries.lock().unwrap();
                entries.put(domain.clone(), Entry::Live(handle.clone()));
                Ok(handle)
            }
            Err(e) if e.is_absent() => {
                let mut entries = self.entries.lock().unwrap();
                match entries.get(domain) {
                    Some(Entry::Live(handle)) => Ok(handle.clone()),
                    _ => {
                        entries.put(domain.clone(), Entry::Absent);
                        Err(Miss::Absent)
                    }
                }
            }
            Err(e) => Err(Miss::Transient(e)),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
