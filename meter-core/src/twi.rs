// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Non-blocking two-wire bus (TWI/I2C) master.
//!
//! One transaction (write, read, or write followed by a repeated start and read)
//! is in flight at a time. [TwiMaster::run] must be called from the main loop.
//! It advances the transaction by at most one bus phase per call and never waits
//! for the hardware.

use crate::{
    mutex::{MainCtx, MutexCell},
    timebase::{TimeBase, Timestamp},
};

/// Maximum number of bytes written or read in one transaction.
pub const TWI_BUF_LEN: usize = 8;

/// Time in seconds the hardware may stay busy in one phase.
///
/// The deadline has a resolution of one second.
/// Two seconds guarantee at least one full second.
pub const TWI_TIMEOUT_SECS: u32 = 2;

/// Bus status code as reported by the TWI engine, with prescaler bits masked.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TwiStatus(pub u8);

impl TwiStatus {
    pub const START: Self = Self(0x08);
    pub const REP_START: Self = Self(0x10);
    pub const SLAW_ACK: Self = Self(0x18);
    pub const SLAW_NACK: Self = Self(0x20);
    pub const DATA_TX_ACK: Self = Self(0x28);
    pub const DATA_TX_NACK: Self = Self(0x30);
    pub const ARB_LOST: Self = Self(0x38);
    pub const SLAR_ACK: Self = Self(0x40);
    pub const SLAR_NACK: Self = Self(0x48);
    pub const DATA_RX_ACK: Self = Self(0x50);
    pub const DATA_RX_NACK: Self = Self(0x58);
    /// Not a hardware code. The engine did not finish a phase in time.
    pub const TIMEOUT: Self = Self(0x7F);
}

/// Register level access to the TWI engine.
pub trait TwiHw {
    /// Generate a start (or repeated start) condition.
    fn send_start(&self);
    /// Generate a stop condition.
    fn send_stop(&self);
    /// Load a byte into the data register and send it.
    fn transmit(&self, data: u8);
    /// Receive the next byte. `ack` tells whether it is acknowledged.
    fn receive(&self, ack: bool);
    /// The last received byte.
    fn data(&self) -> u8;
    fn status(&self) -> TwiStatus;
    /// The engine is still working on the current phase.
    fn is_busy(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

/// Outcome of a finished transaction.
pub struct TwiResult<'b> {
    pub ok: bool,
    /// The last observed bus status.
    pub status: TwiStatus,
    /// The bytes read. Empty for failed and write-only transactions.
    pub data: &'b [u8],
}

pub trait TwiHandler {
    /// Called exactly once per transaction from within [TwiMaster::run].
    /// The master is idle again at this point.
    fn twi_complete(&self, m: &MainCtx<'_>, result: &TwiResult<'_>);
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TwiState {
    Idle,
    WriteStart,
    AddrWrite,
    DataWrite,
    ReadStart,
    AddrRead,
    DataRead,
}

pub struct TwiMaster<'a> {
    state: MutexCell<TwiState>,
    addr: MutexCell<u8>,
    wr_buf: [MutexCell<u8>; TWI_BUF_LEN],
    wr_len: MutexCell<u8>,
    rd_buf: [MutexCell<u8>; TWI_BUF_LEN],
    rd_len: MutexCell<u8>,
    count: MutexCell<u8>,
    deadline: MutexCell<Timestamp>,
    handler: MutexCell<Option<&'a (dyn TwiHandler + Sync)>>,
}

impl<'a> TwiMaster<'a> {
    pub const fn new() -> Self {
        Self {
            state: MutexCell::new(TwiState::Idle),
            addr: MutexCell::new(0),
            wr_buf: [const { MutexCell::new(0) }; TWI_BUF_LEN],
            wr_len: MutexCell::new(0),
            rd_buf: [const { MutexCell::new(0) }; TWI_BUF_LEN],
            rd_len: MutexCell::new(0),
            count: MutexCell::new(0),
            deadline: MutexCell::new(Timestamp::new()),
            handler: MutexCell::new(None),
        }
    }

    pub fn init(&self, m: &MainCtx<'_>, hw: &impl TwiHw) {
        self.state.set(m, TwiState::Idle);
        self.handler.set(m, None);
        hw.set_enabled(true);
    }

    pub fn is_idle(&self, m: &MainCtx<'_>) -> bool {
        self.state.get(m) == TwiState::Idle
    }

    pub fn state(&self, m: &MainCtx<'_>) -> TwiState {
        self.state.get(m)
    }

    /// Start a transaction with the 7-bit address `addr`.
    ///
    /// The bytes in `write` are sent first. Then `read_len` bytes are read.
    /// Either part may be empty, but not both.
    ///
    /// Returns `false` without any side effect, if another transaction
    /// is in flight or if the request is invalid.
    /// Otherwise `handler` will be called exactly once.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer(
        &self,
        m: &MainCtx<'_>,
        tb: &TimeBase<'_>,
        hw: &impl TwiHw,
        addr: u8,
        write: &[u8],
        read_len: usize,
        handler: &'a (dyn TwiHandler + Sync),
    ) -> bool {
        if !self.is_idle(m) {
            return false;
        }
        if (write.is_empty() && read_len == 0)
            || write.len() > TWI_BUF_LEN
            || read_len > TWI_BUF_LEN
        {
            return false;
        }

        for (dst, src) in self.wr_buf.iter().zip(write) {
            dst.set(m, *src);
        }
        self.addr.set(m, addr);
        self.wr_len.set(m, write.len() as u8);
        self.rd_len.set(m, read_len as u8);
        self.count.set(m, 0);
        self.handler.set(m, Some(handler));

        let next = if write.is_empty() {
            TwiState::ReadStart
        } else {
            TwiState::WriteStart
        };
        hw.send_start();
        self.enter(m, tb, next);
        true
    }

    fn enter(&self, m: &MainCtx<'_>, tb: &TimeBase<'_>, state: TwiState) {
        self.state.set(m, state);
        self.deadline.set(m, tb.future_deadline(TWI_TIMEOUT_SECS));
    }

    fn abort(&self, m: &MainCtx<'_>, hw: &impl TwiHw, status: TwiStatus) {
        hw.send_stop();
        self.complete(m, false, status, 0);
    }

    fn complete(&self, m: &MainCtx<'_>, ok: bool, status: TwiStatus, rd_len: usize) {
        self.state.set(m, TwiState::Idle);

        let mut data = [0_u8; TWI_BUF_LEN];
        for (dst, src) in data.iter_mut().zip(&self.rd_buf[..rd_len]) {
            *dst = src.get(m);
        }

        // Take the handler out before calling it.
        // It may start the next transaction right away.
        if let Some(handler) = self.handler.replace(m, None) {
            let result = TwiResult {
                ok,
                status,
                data: &data[..rd_len],
            };
            handler.twi_complete(m, &result);
        }
    }

    /// Advance the transaction by at most one phase.
    pub fn run(&self, m: &MainCtx<'_>, tb: &TimeBase<'_>, hw: &impl TwiHw) {
        let state = self.state.get(m);
        if state == TwiState::Idle {
            return;
        }

        if hw.is_busy() {
            if tb.has_arrived(self.deadline.get(m)) {
                hw.send_stop();
                hw.set_enabled(false);
                self.complete(m, false, TwiStatus::TIMEOUT, 0);
            }
            return;
        }

        let status = hw.status();
        let addr = self.addr.get(m) << 1;
        let count = self.count.get(m);
        let wr_len = self.wr_len.get(m);
        let rd_len = self.rd_len.get(m);

        match state {
            TwiState::Idle => (),
            TwiState::WriteStart => {
                if status != TwiStatus::START {
                    return self.abort(m, hw, status);
                }
                hw.transmit(addr);
                self.enter(m, tb, TwiState::AddrWrite);
            }
            TwiState::AddrWrite => {
                if status != TwiStatus::SLAW_ACK {
                    return self.abort(m, hw, status);
                }
                hw.transmit(self.wr_buf[0].get(m));
                self.count.set(m, 1);
                self.enter(m, tb, TwiState::DataWrite);
            }
            TwiState::DataWrite => {
                if status != TwiStatus::DATA_TX_ACK {
                    return self.abort(m, hw, status);
                }
                if count < wr_len {
                    hw.transmit(self.wr_buf[count as usize].get(m));
                    self.count.set(m, count + 1);
                    self.enter(m, tb, TwiState::DataWrite);
                } else if rd_len > 0 {
                    // Repeated start. The bus is not released between write and read.
                    hw.send_start();
                    self.enter(m, tb, TwiState::ReadStart);
                } else {
                    hw.send_stop();
                    self.complete(m, true, status, 0);
                }
            }
            TwiState::ReadStart => {
                if status != TwiStatus::START && status != TwiStatus::REP_START {
                    return self.abort(m, hw, status);
                }
                hw.transmit(addr | 1);
                self.enter(m, tb, TwiState::AddrRead);
            }
            TwiState::AddrRead => {
                if status != TwiStatus::SLAR_ACK {
                    return self.abort(m, hw, status);
                }
                self.count.set(m, 0);
                // The last byte is not acknowledged.
                hw.receive(rd_len > 1);
                self.enter(m, tb, TwiState::DataRead);
            }
            TwiState::DataRead => {
                let last = count + 1 >= rd_len;
                let expected = if last {
                    TwiStatus::DATA_RX_NACK
                } else {
                    TwiStatus::DATA_RX_ACK
                };
                if status != expected {
                    return self.abort(m, hw, status);
                }
                self.rd_buf[count as usize].set(m, hw.data());
                let count = count + 1;
                self.count.set(m, count);
                if last {
                    hw.send_stop();
                    self.complete(m, true, status, rd_len as usize);
                } else {
                    hw.receive(count + 1 < rd_len);
                    self.enter(m, tb, TwiState::DataRead);
                }
            }
        }
    }
}

impl Default for TwiMaster<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything needed to start a transaction.
pub struct TwiBus<'r, 'a, H> {
    pub twi: &'r TwiMaster<'a>,
    pub tb: &'r TimeBase<'a>,
    pub hw: &'r H,
}

impl<'a, H: TwiHw> TwiBus<'_, 'a, H> {
    pub fn transfer(
        &self,
        m: &MainCtx<'_>,
        addr: u8,
        write: &[u8],
        read_len: usize,
        handler: &'a (dyn TwiHandler + Sync),
    ) -> bool {
        self.twi
            .transfer(m, self.tb, self.hw, addr, write, read_len, handler)
    }
}


// vim: ts=4 sw=4 expandtab
