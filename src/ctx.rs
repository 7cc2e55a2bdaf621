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

//! The ambient per-request context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The ambient context of one inbound query.
///
/// The serving framework creates one `RequestContext` per query and may
/// keep a clone; calling [`cancel`](RequestContext::cancel) on any
/// clone aborts the lookup at the next backend call boundary. The
/// context is propagated to every
/// [`ChainBackend`](crate::chain::ChainBackend) call so that backend
/// implementations can abandon in-flight RPCs.
///
/// Timeouts are deliberately not modeled here; the backend and the
/// serving framework own them.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    /// Creates a fresh, uncancelled context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the request as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
