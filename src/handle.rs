//! Native handles and the live-handle table.
//!
//! A [`NativeHandle`] is only a revocable reference: the bridge keeps the
//! native state in its [`HandleTable`] and checks the handle against it on
//! every access. Ids are never reused, so a released handle can not alias a
//! newer object.

use crate::error::{BridgeError, Result};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Unique id of a native object within one bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleState {
    /// Native state is alive and callable
    Live,
    /// Native state is gone; terminal
    Released,
}

/// Script-visible reference to a native object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeHandle {
    id: HandleId,
    type_name: String,
    bridge: Uuid,
}

impl NativeHandle {
    pub(crate) fn new(id: HandleId, type_name: impl Into<String>, bridge: Uuid) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            bridge,
        }
    }

    /// Object id
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Registered type the object was constructed as
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Bridge that issued this handle
    pub fn bridge_id(&self) -> Uuid {
        self.bridge
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.type_name, self.id)
    }
}

/// Native state owned by the bridge
pub(crate) struct LiveObject {
    pub(crate) state: Box<dyn Any + Send>,
}

/// Shared slot for one live object
pub(crate) type ObjectSlot = Arc<Mutex<LiveObject>>;

thread_local! {
    /// Objects locked further up this thread's stack
    static HELD: RefCell<Vec<(Uuid, HandleId)>> = const { RefCell::new(Vec::new()) };
}

/// Exclusive access to a live object, registered as held by this thread
pub(crate) struct HeldObject<'a> {
    guard: MutexGuard<'a, LiveObject>,
    key: (Uuid, HandleId),
}

impl Deref for HeldObject<'_> {
    type Target = LiveObject;

    fn deref(&self) -> &LiveObject {
        &self.guard
    }
}

impl DerefMut for HeldObject<'_> {
    fn deref_mut(&mut self) -> &mut LiveObject {
        &mut self.guard
    }
}

impl Drop for HeldObject<'_> {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|key| *key == self.key) {
                held.remove(pos);
            }
        });
    }
}

/// Lock the object behind `handle`, waiting for calls on other threads.
///
/// Locking an object this thread already holds is `Reentrant`.
pub(crate) fn lock_object<'a>(slot: &'a ObjectSlot, handle: &NativeHandle) -> Result<HeldObject<'a>> {
    let key = (handle.bridge_id(), handle.id());
    if HELD.with(|held| held.borrow().contains(&key)) {
        return Err(BridgeError::Reentrant {
            handle: handle.to_string(),
        });
    }
    let guard = slot.lock();
    HELD.with(|held| held.borrow_mut().push(key));
    Ok(HeldObject { guard, key })
}

/// A live-table slot claimed ahead of construction
pub(crate) struct Reservation<'a> {
    table: &'a HandleTable,
    filled: bool,
}

impl Reservation<'_> {
    /// Store the constructed object in the claimed slot
    pub(crate) fn fill(mut self, state: Box<dyn Any + Send>) -> HandleId {
        self.filled = true;
        let id = HandleId(self.table.next_id.fetch_add(1, Ordering::Relaxed));
        self.table
            .slots
            .insert(id, Arc::new(Mutex::new(LiveObject { state })));
        id
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.filled {
            self.table.reserved.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Live-handle table
///
/// Table mutation goes through the sharded map; native calls run under the
/// per-object mutex only, never under a table shard lock.
pub(crate) struct HandleTable {
    slots: DashMap<HandleId, ObjectSlot>,
    next_id: AtomicU64,
    /// Live objects plus constructions in flight
    reserved: AtomicUsize,
    limit: usize,
}

impl HandleTable {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU64::new(1),
            reserved: AtomicUsize::new(0),
            limit,
        }
    }

    /// Claim a slot under the live limit
    pub(crate) fn reserve(&self) -> Result<Reservation<'_>> {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .map_err(|_| BridgeError::HandleLimit { limit: self.limit })?;
        Ok(Reservation {
            table: self,
            filled: false,
        })
    }

    /// Store a new object, returning its fresh id
    pub(crate) fn insert(&self, state: Box<dyn Any + Send>) -> Result<HandleId> {
        Ok(self.reserve()?.fill(state))
    }

    /// Look up a live object
    pub(crate) fn get(&self, id: HandleId) -> Option<ObjectSlot> {
        self.slots.get(&id).map(|slot| Arc::clone(slot.value()))
    }

    /// Remove an object from the table
    pub(crate) fn remove(&self, id: HandleId) -> Option<ObjectSlot> {
        let (_, slot) = self.slots.remove(&id)?;
        self.reserved.fetch_sub(1, Ordering::AcqRel);
        Some(slot)
    }

    pub(crate) fn contains(&self, id: HandleId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Remove every object, returning how many were live
    pub(crate) fn drain(&self) -> usize {
        let ids: Vec<HandleId> = self.slots.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.remove(id))
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
