// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::mutex::{MainCtx, MutexCell};

/// One report of the sampler.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Report {
    /// Ticks since the last accumulator reset.
    pub elapsed_ticks: i32,
    /// Mean bias corrected sensor reading over the report interval.
    pub mean_current: i32,
    /// Accumulated charge in hundredths of mAh.
    pub charge: i32,
}

/// Diagnostic events.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Event {
    /// The sensor configuration word is being written.
    Configuring(u16),
    ConfigDone,
    ConfigFailed(u8),
    Starting,
    Stopped,
    /// A sensor transaction failed with the given bus status.
    BusError(u8),
    Reset,
    UnknownCommand,
    BadArgument,
    /// New ticks per sample. Effective on the next start.
    SampleRate(u16),
    /// New ticks per report. Effective on the next start.
    ReportRate(u16),
    EeData { addr: u16, value: u8 },
    RxOverrun,
    ShuttingDown,
    /// Number of frames dropped because the transmitter was full.
    TxOverrun(u16),
}

impl Event {
    /// Wire representation: code, argument, extra byte.
    #[rustfmt::skip]
    pub fn to_raw(self) -> (u8, u16, u8) {
        match self {
            Event::Configuring(word)          => (1, word, 0),
            Event::ConfigDone                 => (2, 0, 0),
            Event::ConfigFailed(status)       => (3, 0, status),
            Event::Starting                   => (4, 0, 0),
            Event::Stopped                    => (5, 0, 0),
            Event::BusError(status)           => (6, 0, status),
            Event::Reset                      => (7, 0, 0),
            Event::UnknownCommand             => (8, 0, 0),
            Event::BadArgument                => (9, 0, 0),
            Event::SampleRate(ticks)          => (10, ticks, 0),
            Event::ReportRate(ticks)          => (11, ticks, 0),
            Event::EeData { addr, value }     => (12, addr, value),
            Event::RxOverrun                  => (13, 0, 0),
            Event::ShuttingDown               => (14, 0, 0),
            Event::TxOverrun(dropped)         => (15, dropped, 0),
        }
    }

    #[rustfmt::skip]
    pub fn from_raw(code: u8, arg: u16, extra: u8) -> Option<Self> {
        Some(match code {
            1 => Event::Configuring(arg),
            2 => Event::ConfigDone,
            3 => Event::ConfigFailed(extra),
            4 => Event::Starting,
            5 => Event::Stopped,
            6 => Event::BusError(extra),
            7 => Event::Reset,
            8 => Event::UnknownCommand,
            9 => Event::BadArgument,
            10 => Event::SampleRate(arg),
            11 => Event::ReportRate(arg),
            12 => Event::EeData { addr: arg, value: extra },
            13 => Event::RxOverrun,
            14 => Event::ShuttingDown,
            15 => Event::TxOverrun(arg),
            _ => return None,
        })
    }
}

/// Destination of reports and diagnostic events.
pub trait ReportSink {
    fn report(&self, m: &MainCtx<'_>, report: &Report);
    fn event(&self, m: &MainCtx<'_>, event: Event);
}

/// Count of frames the transmitter could not take.
pub struct DropCounter {
    dropped: MutexCell<u16>,
}

impl DropCounter {
    pub const fn new() -> Self {
        Self {
            dropped: MutexCell::new(0),
        }
    }

    /// Record the outcome of one transmit attempt.
    pub fn record(&self, m: &MainCtx<'_>, sent: bool) {
        if !sent {
            self.dropped
                .set(m, self.dropped.get(m).saturating_add(1));
        }
    }

    /// Take the pending count as a [Event::TxOverrun].
    pub fn take_event(&self, m: &MainCtx<'_>) -> Option<Event> {
        match self.dropped.replace(m, 0) {
            0 => None,
            dropped => Some(Event::TxOverrun(dropped)),
        }
    }
}

impl Default for DropCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{mutex::Mutex, ring::Ring};
    use core::cell::Cell;

    #[test]
    fn test_drop_counter() {
        // SAFETY: The test thread is the main context.
        let m = unsafe { MainCtx::new() };
        let tx: Ring<u8, 16> = Ring::new([const { Mutex::new(Cell::new(0)) }; 16]);
        let drops = DropCounter::new();
        let frame = [0xA5_u8; 7];

        for _ in 0..4 {
            let sent = critical_section::with(|cs| tx.insert_all(cs, &frame));
            drops.record(&m, sent);
        }
        // Two frames fit.
        assert_eq!(drops.take_event(&m), Some(Event::TxOverrun(2)));
        assert_eq!(drops.take_event(&m), None);

        critical_section::with(|cs| tx.clear(cs));
        let sent = critical_section::with(|cs| tx.insert_all(cs, &frame));
        drops.record(&m, sent);
        assert_eq!(drops.take_event(&m), None);
    }

    #[test]
    fn test_tx_overrun_code() {
        let event = Event::TxOverrun(300);
        let (code, arg, extra) = event.to_raw();
        assert_eq!((code, arg, extra), (15, 300, 0));
        assert_eq!(Event::from_raw(code, arg, extra), Some(event));
    }
}

// vim: ts=4 sw=4 expandtab
