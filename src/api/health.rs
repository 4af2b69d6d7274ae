//! Shared health state for the /health endpoint.
//! Updated by the monitor loop, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True while a document session is held by the current cycle.
    pub session_active: AtomicBool,
    /// Nanosecond timestamp of the last completed cycle (0 = none).
    pub last_cycle_at_ns: AtomicU64,
    pub cycles_ok: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub alerts_sent: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_session_active(&self, v: bool) {
        self.session_active.store(v, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, ok: bool, at_ns: u64) {
        if ok {
            self.cycles_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.last_cycle_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn inc_alerts_sent(&self) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_active(&self) -> bool {
        self.session_active.load(Ordering::Relaxed)
    }

    pub fn last_cycle_at_ns(&self) -> u64 {
        self.last_cycle_at_ns.load(Ordering::Relaxed)
    }

    pub fn cycles_ok(&self) -> u64 {
        self.cycles_ok.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent.load(Ordering::Relaxed)
    }
}
