//! Per-category single-flight registry.
//!
//! At most one regeneration pass runs per category. The first caller to find
//! a category stale starts the pass and registers its shared handle; every
//! caller arriving while it runs awaits the same handle. Each entry records
//! the limit its pass was started for, so a joiner asking for more can tell
//! the pass may leave it short. The pass itself
//! releases the entry when it finishes, whether or not anyone is still
//! waiting on it.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, Shared};
use papercards_core::Category;

use crate::{Error, pass::PassReport};

pub(crate) type PassOutcome = Result<PassReport, Arc<Error>>;
pub(crate) type PassHandle = Shared<BoxFuture<'static, PassOutcome>>;

/// How a caller got hold of a pass handle.
pub(crate) enum Lease {
  Started(PassHandle),
  /// Joined a pass started by another caller for `limit` cards.
  Joined { handle: PassHandle, limit: usize },
}

#[derive(Clone)]
struct InFlight {
  handle: PassHandle,
  limit:  usize,
}

#[derive(Default)]
pub(crate) struct Leases {
  passes: Mutex<HashMap<Category, InFlight>>,
}

impl Leases {
  /// Join the in-flight pass for `category`, or register the one produced by
  /// `start`. `start` runs under the registry lock, so two callers can never
  /// both start a pass for the same category.
  pub fn acquire(
    &self,
    category: Category,
    limit: usize,
    start: impl FnOnce() -> PassHandle,
  ) -> Lease {
    let mut passes = self.lock();
    if let Some(InFlight { handle, limit }) = passes.get(&category).cloned() {
      return Lease::Joined { handle, limit };
    }
    let handle = start();
    passes.insert(category, InFlight { handle: handle.clone(), limit });
    Lease::Started(handle)
  }

  pub fn release(&self, category: Category) { self.lock().remove(&category); }

  pub fn in_flight(&self) -> usize { self.lock().len() }

  fn lock(&self) -> MutexGuard<'_, HashMap<Category, InFlight>> {
    self.passes.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Releases a category's lease when dropped, including when the pass task
/// unwinds.
pub(crate) struct LeaseGuard {
  pub leases:   Arc<Leases>,
  pub category: Category,
}

impl Drop for LeaseGuard {
  fn drop(&mut self) { self.leases.release(self.category); }
}
