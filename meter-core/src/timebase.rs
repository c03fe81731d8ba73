// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::mutex::{IrqCtx, MainCtx, Mutex, MutexCell};
use core::cell::Cell;

/// Number of timer interrupts per second.
pub const TICKS_PER_SECOND: u16 = 1000;

/// Seconds since boot.
///
/// Comparisons are plain integer comparisons.
/// There is no wrap-around correction, which is fine for 136 years of uptime.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Timestamp(pub u32);

impl Timestamp {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    #[inline]
    pub const fn secs(self) -> u32 {
        self.0
    }
}

impl core::ops::Add<u32> for Timestamp {
    type Output = Self;

    #[inline]
    fn add(self, secs: u32) -> Self::Output {
        Self(self.0.wrapping_add(secs))
    }
}

/// Receiver of the per-tick notification.
///
/// Called from the timer interrupt.
pub trait TickNotify {
    fn tick(&self, c: &IrqCtx<'_>);
}

pub trait Watchdog {
    /// Restart the watchdog timeout.
    fn poke(&self);
    /// Switch the watchdog to its longest timeout.
    /// The system is reset when it runs out.
    fn arm_shutdown(&self);
}

pub struct TimeBase<'a> {
    tick: Mutex<Cell<u16>>,
    seconds: Mutex<Cell<u32>>,
    notify: Mutex<Cell<Option<&'a (dyn TickNotify + Sync)>>>,
    shutting_down: MutexCell<bool>,
}

impl<'a> TimeBase<'a> {
    pub const fn new() -> Self {
        Self {
            tick: Mutex::new(Cell::new(0)),
            seconds: Mutex::new(Cell::new(0)),
            notify: Mutex::new(Cell::new(None)),
            shutting_down: MutexCell::new(false),
        }
    }

    pub fn init(&self, m: &MainCtx<'_>) {
        critical_section::with(|cs| {
            self.tick.borrow(cs).set(0);
            self.seconds.borrow(cs).set(0);
            self.notify.borrow(cs).set(None);
        });
        self.shutting_down.set(m, false);
    }

    /// Current time in whole seconds.
    pub fn now(&self) -> Timestamp {
        critical_section::with(|cs| Timestamp(self.seconds.borrow(cs).get()))
    }

    /// Sub-second tick counter in the range `0..TICKS_PER_SECOND`.
    pub fn current_tick(&self) -> u16 {
        critical_section::with(|cs| self.tick.borrow(cs).get())
    }

    pub fn future_deadline(&self, secs_from_now: u32) -> Timestamp {
        self.now() + secs_from_now
    }

    pub fn has_arrived(&self, deadline: Timestamp) -> bool {
        self.now() >= deadline
    }

    /// Install the tick notification.
    /// Replaces any previously installed one.
    pub fn register_tick_notify(&self, notify: &'a (dyn TickNotify + Sync)) {
        critical_section::with(|cs| self.notify.borrow(cs).set(Some(notify)));
    }

    pub fn run(&self, m: &MainCtx<'_>, wdt: &impl Watchdog) {
        if !self.shutting_down.get(m) {
            wdt.poke();
        }
    }

    /// Stop servicing the watchdog and let it reset the system.
    pub fn commence_shutdown(&self, m: &MainCtx<'_>, wdt: &impl Watchdog) {
        if !self.shutting_down.replace(m, true) {
            wdt.arm_shutdown();
        }
    }

    pub fn is_shutting_down(&self, m: &MainCtx<'_>) -> bool {
        self.shutting_down.get(m)
    }

    /// Timer interrupt handler.
    pub fn irq_tick(&self, c: &IrqCtx<'_>) {
        let cs = c.cs();
        let tick = self.tick.borrow(cs).get() + 1;
        if tick >= TICKS_PER_SECOND {
            self.tick.borrow(cs).set(0);
            let seconds = self.seconds.borrow(cs);
            seconds.set(seconds.get().wrapping_add(1));
        } else {
            self.tick.borrow(cs).set(tick);
        }
        if let Some(notify) = self.notify.borrow(cs).get() {
            notify.tick(c);
        }
    }
}

impl Default for TimeBase<'_> {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
