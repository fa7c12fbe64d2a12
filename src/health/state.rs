//! Router failover state machine.
//!
//! # States
//! - OnPrimary: every connection comes from the primary pool
//! - OnStandby: every connection comes from the standby pool
//!
//! # State Transitions
//! ```text
//! OnPrimary → OnStandby: primary probe unhealthy (failover)
//! OnStandby → OnPrimary: primary probe healthy (failback)
//! ```
//!
//! # Design Decisions
//! - The transition table is a pure function of (state, probe result)
//! - The active pool lives in an `ArcSwap`: readers never lock and never see
//!   a partial value; writers replace the whole reference
//! - Writers serialize on an async mutex that readers never touch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, MutexGuard};

use crate::pool::{Connector, EndpointPool, EndpointRole};

/// Which endpoint the router is serving from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterState {
    OnPrimary,
    OnStandby,
}

impl RouterState {
    /// Apply one primary probe result.
    pub fn on_probe(self, primary_healthy: bool) -> Transition {
        match (self, primary_healthy) {
            (RouterState::OnPrimary, true) => Transition::Stay(RouterState::OnPrimary),
            (RouterState::OnPrimary, false) => Transition::Failover,
            (RouterState::OnStandby, true) => Transition::Failback,
            (RouterState::OnStandby, false) => Transition::Stay(RouterState::OnStandby),
        }
    }

    /// The pool role serving traffic in this state.
    pub fn active_role(self) -> EndpointRole {
        match self {
            RouterState::OnPrimary => EndpointRole::Primary,
            RouterState::OnStandby => EndpointRole::Standby,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouterState::OnPrimary => "on_primary",
            RouterState::OnStandby => "on_standby",
        }
    }
}

impl From<EndpointRole> for RouterState {
    fn from(role: EndpointRole) -> Self {
        match role {
            EndpointRole::Primary => RouterState::OnPrimary,
            EndpointRole::Standby => RouterState::OnStandby,
        }
    }
}

impl std::fmt::Display for RouterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken by one monitor cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No switch; the router stays in the given state.
    Stay(RouterState),
    /// Primary → standby.
    Failover,
    /// Standby → primary.
    Failback,
}

impl Transition {
    /// State the router is in after this transition.
    pub fn next_state(self) -> RouterState {
        match self {
            Transition::Stay(state) => state,
            Transition::Failover => RouterState::OnStandby,
            Transition::Failback => RouterState::OnPrimary,
        }
    }

    pub fn is_switch(self) -> bool {
        !matches!(self, Transition::Stay(_))
    }
}

/// The single shared designation of the active pool.
pub struct FailoverState<C: Connector> {
    primary: ArcSwap<EndpointPool<C>>,
    standby: Arc<EndpointPool<C>>,
    active: ArcSwap<EndpointPool<C>>,
    writer: Mutex<()>,
    torn_down: AtomicBool,
}

impl<C: Connector> FailoverState<C> {
    pub fn new(
        primary: Arc<EndpointPool<C>>,
        standby: Arc<EndpointPool<C>>,
        initial: RouterState,
    ) -> Self {
        let active = match initial {
            RouterState::OnPrimary => primary.clone(),
            RouterState::OnStandby => standby.clone(),
        };
        Self {
            primary: ArcSwap::new(primary),
            standby,
            active: ArcSwap::new(active),
            writer: Mutex::new(()),
            torn_down: AtomicBool::new(false),
        }
    }

    /// The pool currently serving traffic. Lock-free.
    pub fn current(&self) -> Arc<EndpointPool<C>> {
        self.active.load_full()
    }

    /// The state implied by the active pool.
    pub fn state(&self) -> RouterState {
        RouterState::from(self.active.load().role())
    }

    pub fn primary(&self) -> Arc<EndpointPool<C>> {
        self.primary.load_full()
    }

    pub fn standby(&self) -> Arc<EndpointPool<C>> {
        self.standby.clone()
    }

    /// Serialize writers. Readers never take this lock.
    pub(crate) async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Point traffic at the pool for `target`. Caller holds the write lock.
    pub(crate) fn activate(&self, target: RouterState) {
        let pool = match target {
            RouterState::OnPrimary => self.primary.load_full(),
            RouterState::OnStandby => self.standby.clone(),
        };
        self.active.store(pool);
    }

    /// Swap in a new primary pool and return the old one.
    ///
    /// If the old primary was serving traffic, the new one takes over.
    /// Caller holds the write lock.
    pub(crate) fn replace_primary(&self, pool: Arc<EndpointPool<C>>) -> Arc<EndpointPool<C>> {
        let old = self.primary.swap(pool.clone());
        if Arc::ptr_eq(&self.active.load(), &old) {
            self.active.store(pool);
        }
        old
    }

    /// Close both pools. Nothing may switch pools afterwards.
    pub(crate) fn close_all(&self) {
        self.torn_down.store(true, Ordering::Release);
        self.primary.load().close();
        self.standby.close();
    }

    /// True once `close_all` has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}

impl<C: Connector> std::fmt::Debug for FailoverState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverState")
            .field("state", &self.state())
            .field("primary", &self.primary.load().address())
            .field("standby", &self.standby.address())
            .finish()
    }
}
