// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    engine::{ContextFactory, ExecutionContext},
    errors::ServicesShutDownError,
};
use debug_ignore::DebugIgnore;
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use tracing::debug;

/// Process-wide engine services shared by every assembly in a run.
///
/// Created with [`initialize`](Self::initialize) and torn down with [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct EngineServices {
    factory: DebugIgnore<Arc<dyn ContextFactory>>,
    channels: ChannelRegistry,
    shut_down: AtomicBool,
}

impl EngineServices {
    /// Initializes engine services backed by the given context factory.
    pub fn initialize(factory: Arc<dyn ContextFactory>) -> Arc<Self> {
        debug!("initializing engine services");
        Arc::new(Self {
            factory: DebugIgnore(factory),
            channels: ChannelRegistry::default(),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Creates a fresh, isolated execution context.
    ///
    /// Fails once [`shutdown`](Self::shutdown) has been called.
    pub fn create_context(&self) -> Result<Arc<dyn ExecutionContext>, ServicesShutDownError> {
        if self.is_shut_down() {
            debug!("refusing to create an execution context after shutdown");
            return Err(ServicesShutDownError);
        }
        Ok(self.factory.create_context())
    }

    /// Returns the registry of listener channels.
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Returns true if [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Shuts down engine services. Every registered channel is revoked, and no further contexts
    /// or channels can be created. Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("shutting down engine services");
            self.channels.close();
        }
    }
}

/// The set of listener channels currently registered with the engine.
///
/// A listener registers a channel for the duration of a run so the engine can call back into it
/// across the isolation boundary. Registrations are revoked when their
/// [`ChannelRegistration`] guard is dropped, or all at once with [`clear`](Self::clear).
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    closed: AtomicBool,
    channels: Mutex<BTreeMap<u64, String>>,
}

impl ChannelRegistry {
    /// Registers a channel under the given name.
    ///
    /// Once the registry is closed, the returned registration is inert.
    pub fn register(&self, name: impl Into<String>) -> ChannelRegistration {
        let name = name.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.lock();
        if self.inner.closed.load(Ordering::Acquire) {
            debug!(id, %name, "registry closed, not registering listener channel");
        } else {
            debug!(id, %name, "registering listener channel");
            channels.insert(id, name);
        }
        drop(channels);
        ChannelRegistration {
            registry: self.clone(),
            id,
        }
    }

    /// Returns the names of the currently registered channels, in registration order.
    pub fn registered(&self) -> Vec<String> {
        self.lock().values().cloned().collect()
    }

    /// Returns true if no channels are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Revokes every registered channel.
    pub fn clear(&self) {
        let mut channels = self.lock();
        if !channels.is_empty() {
            debug!(count = channels.len(), "clearing registered listener channels");
            channels.clear();
        }
    }

    fn close(&self) {
        let mut channels = self.lock();
        self.inner.closed.store(true, Ordering::Release);
        channels.clear();
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, String>> {
        // The map is always left in a consistent state, so a poisoned lock is safe to reuse.
        self.inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered listener channel. The channel is revoked when this is dropped.
#[derive(Debug)]
#[must_use = "the channel is revoked as soon as the registration is dropped"]
pub struct ChannelRegistration {
    registry: ChannelRegistry,
    id: u64,
}

impl Drop for ChannelRegistration {
    fn drop(&mut self) {
        if self.registry.lock().remove(&self.id).is_some() {
            debug!(id = self.id, "revoked listener channel");
        }
    }
}
