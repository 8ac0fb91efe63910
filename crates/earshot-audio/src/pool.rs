//! Pool of proxy playback handles.

use std::collections::VecDeque;

use earshot_core::{ExhaustionPolicy, PoolConfig, Result};
use glam::Vec3;

use crate::backend::{NativeHandleId, PlaybackBackend};

/// Index of a proxy inside its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProxyId(u32);

impl ProxyId {
    /// Raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// A proxy lent to one voice.
///
/// Each acquisition gets a fresh lease number, so a lease that was released
/// or stolen can never act on the proxy's next borrower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProxyLease {
    id: ProxyId,
    lease: u64,
}

impl ProxyLease {
    /// Proxy this lease refers to.
    #[must_use]
    pub const fn id(self) -> ProxyId {
        self.id
    }
}

#[derive(Debug)]
struct ProxySlot {
    handle: NativeHandleId,
    /// Lease number while lent out.
    lease: Option<u64>,
}

/// Recycles native playback handles used as proxies.
///
/// Proxies are created lazily on a pool miss and live as long as the pool.
/// Idle proxies are stopped, have no clip and are deactivated.
#[derive(Debug)]
pub struct ProxyPool {
    slots: Vec<ProxySlot>,
    free: VecDeque<ProxyId>,
    next_lease: u64,
    config: PoolConfig,
}

impl Default for ProxyPool {
    fn default() -> Self {
        Self::new(PoolConfig::unbounded())
    }
}

impl ProxyPool {
    /// Create an empty pool.
    ///
    /// A bounded pool holds at least one proxy; a capacity of zero is raised to one.
    #[must_use]
    pub fn new(mut config: PoolConfig) -> Self {
        if config.capacity == Some(0) {
            tracing::warn!("Proxy pool capacity of 0 raised to 1");
            config.capacity = Some(1);
        }
        Self {
            slots: Vec::with_capacity(config.capacity.unwrap_or(0)),
            free: VecDeque::new(),
            next_lease: 0,
            config,
        }
    }

    /// Total number of proxies created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no proxy has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of idle proxies.
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Number of proxies currently lent out.
    #[must_use]
    pub fn lent_len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Pool sizing.
    #[must_use]
    pub const fn config(&self) -> PoolConfig {
        self.config
    }

    /// Check whether a lease still owns its proxy.
    #[must_use]
    pub fn is_current(&self, lease: ProxyLease) -> bool {
        self.slots
            .get(lease.id.0 as usize)
            .is_some_and(|slot| slot.lease == Some(lease.lease))
    }

    /// Native handle behind a lease, if the lease is still current.
    #[must_use]
    pub fn handle(&self, lease: ProxyLease) -> Option<NativeHandleId> {
        self.slots
            .get(lease.id.0 as usize)
            .filter(|slot| slot.lease == Some(lease.lease))
            .map(|slot| slot.handle)
    }

    /// Lend out a proxy.
    ///
    /// Reuses an idle proxy when possible, otherwise creates one parked at
    /// `park_at`. Returns `Ok(None)` only when a bounded pool is exhausted and
    /// its policy is [`ExhaustionPolicy::Refuse`].
    pub fn acquire<B: PlaybackBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        park_at: Vec3,
    ) -> Result<Option<ProxyLease>> {
        if let Some(id) = self.free.pop_front() {
            backend.set_active(self.slots[id.0 as usize].handle, true);
            return Ok(Some(self.lend(id)));
        }

        let exhausted = self
            .config
            .capacity
            .is_some_and(|capacity| self.slots.len() >= capacity);
        if !exhausted {
            let handle = backend.create_handle()?;
            backend.set_position(handle, park_at);
            backend.set_active(handle, true);
            let id = ProxyId(self.slots.len() as u32);
            self.slots.push(ProxySlot { handle, lease: None });
            tracing::debug!(proxies = self.slots.len(), "Created proxy voice");
            return Ok(Some(self.lend(id)));
        }

        match self.config.on_exhausted {
            ExhaustionPolicy::Refuse => {
                tracing::debug!(
                    capacity = self.slots.len(),
                    "Proxy pool exhausted, refusing voice"
                );
                Ok(None)
            }
            ExhaustionPolicy::StealOldest => {
                let oldest = self
                    .slots
                    .iter()
                    .enumerate()
                    .filter_map(|(i, slot)| slot.lease.map(|lease| (i, lease)))
                    .min_by_key(|(_, lease)| *lease)
                    .map(|(i, _)| ProxyId(i as u32));
                let Some(id) = oldest else {
                    tracing::debug!("Proxy pool exhausted with nothing to steal");
                    return Ok(None);
                };
                let handle = self.slots[id.0 as usize].handle;
                backend.stop(handle);
                backend.set_clip(handle, None);
                tracing::debug!(proxy = id.0, "Stealing oldest proxy voice");
                Ok(Some(self.lend(id)))
            }
        }
    }

    /// Return a proxy to the pool.
    ///
    /// Stops it, clears its clip and deactivates it. Releasing a lease that is
    /// no longer current is a no-op, so the free list never holds duplicates.
    /// Returns whether the proxy was actually returned.
    pub fn release<B: PlaybackBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        lease: ProxyLease,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(lease.id.0 as usize) else {
            return false;
        };
        if slot.lease != Some(lease.lease) {
            tracing::trace!(proxy = lease.id.0, "Ignoring release of stale lease");
            return false;
        }

        backend.stop(slot.handle);
        backend.set_clip(slot.handle, None);
        backend.set_active(slot.handle, false);
        slot.lease = None;
        self.free.push_back(lease.id);
        true
    }

    /// Reset every lent proxy and return it to the free list.
    pub fn release_all<B: PlaybackBackend + ?Sized>(&mut self, backend: &mut B) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.lease.take().is_some() {
                backend.stop(slot.handle);
                backend.set_clip(slot.handle, None);
                backend.set_active(slot.handle, false);
                self.free.push_back(ProxyId(i as u32));
            }
        }
    }

    fn lend(&mut self, id: ProxyId) -> ProxyLease {
        let lease = self.next_lease;
        self.next_lease += 1;
        self.slots[id.0 as usize].lease = Some(lease);
        ProxyLease { id, lease }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;

    #[test]
    fn grows_on_miss_and_recycles() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::default();

        let a = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        let b = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.lent_len(), 2);

        assert!(pool.release(&mut backend, a));
        assert_eq!(pool.free_len(), 1);

        let c = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        assert_eq!(c.id(), a.id());
        assert_eq!(pool.len(), 2);
        assert_eq!(backend.handle_count(), 2);
    }

    #[test]
    fn release_resets_handle() {
        let mut backend = HeadlessBackend::new();
        let clip = backend.add_clip(3.0);
        let mut pool = ProxyPool::default();

        let lease = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        let handle = pool.handle(lease).unwrap();
        assert!(backend.handle(handle).unwrap().active);
        backend.set_clip(handle, Some(clip));
        backend.play(handle).unwrap();

        pool.release(&mut backend, lease);
        let state = backend.handle(handle).unwrap();
        assert!(!state.playing);
        assert!(state.clip.is_none());
        assert!(!state.active);
        assert!(pool.handle(lease).is_none());
    }

    #[test]
    fn double_release_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::default();

        let lease = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        assert!(pool.release(&mut backend, lease));
        assert!(!pool.release(&mut backend, lease));
        assert_eq!(pool.free_len(), 1);

        // The stale lease cannot release the proxy's next borrower.
        let next = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        assert_eq!(next.id(), lease.id());
        assert!(!pool.release(&mut backend, lease));
        assert!(pool.is_current(next));
        assert_eq!(pool.free_len(), 0);
    }

    #[test]
    fn bounded_refuse() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::new(PoolConfig::bounded(1, ExhaustionPolicy::Refuse));

        let first = pool.acquire(&mut backend, Vec3::ZERO).unwrap();
        assert!(first.is_some());
        assert!(pool.acquire(&mut backend, Vec3::ZERO).unwrap().is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn bounded_steal_oldest() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::new(PoolConfig::bounded(2, ExhaustionPolicy::StealOldest));

        let a = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        let b = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        let c = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();

        assert_eq!(c.id(), a.id());
        assert!(!pool.is_current(a));
        assert!(pool.is_current(b));
        assert!(pool.is_current(c));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn zero_capacity_holds_one_proxy() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::new(PoolConfig::bounded(0, ExhaustionPolicy::StealOldest));
        assert_eq!(pool.config().capacity, Some(1));

        let first = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        let second = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        assert_eq!(first.id(), second.id());
        assert!(!pool.is_current(first));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn new_proxy_parked_at_anchor() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::default();
        let origin = Vec3::new(0.0, -500.0, 0.0);
        let lease = pool.acquire(&mut backend, origin).unwrap().unwrap();
        let handle = pool.handle(lease).unwrap();
        assert_eq!(backend.handle(handle).unwrap().position, origin);
    }

    #[test]
    fn release_all_returns_everything() {
        let mut backend = HeadlessBackend::new();
        let mut pool = ProxyPool::default();
        let a = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        let _b = pool.acquire(&mut backend, Vec3::ZERO).unwrap().unwrap();
        pool.release(&mut backend, a);

        pool.release_all(&mut backend);
        assert_eq!(pool.free_len(), 2);
        assert_eq!(pool.lent_len(), 0);
    }
}
