// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated board for the unit tests.
//!
//! The TWI engine is modelled together with one slave device
//! at [SIM_ADDR] that acknowledges everything and answers reads
//! with a repeating byte pattern.

use crate::{
    console::{ConsoleRx, NvStore},
    mutex::{IrqCtx, MainCtx},
    report::{Event, Report, ReportSink},
    system::System,
    timebase::Watchdog,
    twi::{TwiHw, TwiStatus},
};
use core::cell::{Cell, RefCell};
use std::{collections::VecDeque, vec::Vec};

pub const SIM_ADDR: u8 = 0x40;

const EEPROM_SIZE: usize = 64;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    Start,
    Stop,
    Tx(u8),
    Rx { ack: bool },
    Disable,
}

pub struct SimBoard {
    // TWI engine
    enabled: Cell<bool>,
    busy_polls: Cell<u32>,
    latency: Cell<u32>,
    stalled: Cell<bool>,
    status: Cell<TwiStatus>,
    data: Cell<u8>,
    in_transfer: Cell<bool>,
    expect_addr: Cell<bool>,
    reading: Cell<bool>,
    repeated_starts: Cell<u32>,
    op_index: Cell<usize>,
    fault: Cell<Option<(usize, TwiStatus)>>,
    nack_addresses: Cell<u32>,
    response: RefCell<Vec<u8>>,
    response_pos: Cell<usize>,
    ops: RefCell<Vec<Op>>,

    // Watchdog
    wdt_pokes: Cell<u32>,
    wdt_armed: Cell<bool>,

    reports: RefCell<Vec<Report>>,
    events: RefCell<Vec<Event>>,
    eeprom: RefCell<[u8; EEPROM_SIZE]>,
    rx: RefCell<VecDeque<u8>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            enabled: Cell::new(false),
            busy_polls: Cell::new(0),
            latency: Cell::new(0),
            stalled: Cell::new(false),
            status: Cell::new(TwiStatus(0xF8)),
            data: Cell::new(0xFF),
            in_transfer: Cell::new(false),
            expect_addr: Cell::new(false),
            reading: Cell::new(false),
            repeated_starts: Cell::new(0),
            op_index: Cell::new(0),
            fault: Cell::new(None),
            nack_addresses: Cell::new(0),
            response: RefCell::new(Vec::new()),
            response_pos: Cell::new(0),
            ops: RefCell::new(Vec::new()),
            wdt_pokes: Cell::new(0),
            wdt_armed: Cell::new(false),
            reports: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            eeprom: RefCell::new([0xFF; EEPROM_SIZE]),
            rx: RefCell::new(VecDeque::new()),
        }
    }

    /// Number of busy polls after each bus operation.
    pub fn set_latency(&self, polls: u32) {
        self.latency.set(polls);
    }

    /// Keep the engine busy forever.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.set(stalled);
    }

    /// Replace the status of the bus operation number `op_index`.
    /// Start, transmit and receive operations are counted from zero.
    pub fn inject_fault(&self, op_index: usize, status: TwiStatus) {
        self.fault.set(Some((op_index, status)));
    }

    /// Don't acknowledge the next `count` address bytes.
    pub fn nack_addresses(&self, count: u32) {
        self.nack_addresses.set(count);
    }

    /// Bytes returned by reads. Restarts at every addressing.
    pub fn set_response(&self, data: &[u8]) {
        *self.response.borrow_mut() = data.to_vec();
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn rx_count(&self) -> usize {
        self.ops
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Rx { .. }))
            .count()
    }

    pub fn repeated_starts(&self) -> u32 {
        self.repeated_starts.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn wdt_pokes(&self) -> u32 {
        self.wdt_pokes.get()
    }

    pub fn wdt_armed(&self) -> bool {
        self.wdt_armed.get()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.borrow().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn type_bytes(&self, bytes: &[u8]) {
        self.rx.borrow_mut().extend(bytes);
    }

    /// Run the main loop `count` times.
    pub fn run<'a>(&self, m: &MainCtx<'_>, sys: &'a System<'a>, count: usize) {
        for _ in 0..count {
            sys.run(m, self);
        }
    }

    /// Fire the timer interrupt `ticks` times.
    /// Run the main loop `runs` times after each tick.
    pub fn tick_and_run<'a>(&self, m: &MainCtx<'_>, sys: &'a System<'a>, ticks: usize, runs: usize) {
        for _ in 0..ticks {
            // SAFETY: This simulates the timer interrupt.
            let c = unsafe { IrqCtx::new() };
            sys.irq_tick(&c);
            drop(c);
            self.run(m, sys, runs);
        }
    }

    fn op(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    /// Finish a bus operation with `status`, unless a fault is injected.
    fn complete(&self, status: TwiStatus) {
        let index = self.op_index.get();
        self.op_index.set(index + 1);
        let status = match self.fault.get() {
            Some((fault_index, fault_status)) if fault_index == index => {
                self.fault.set(None);
                fault_status
            }
            _ => status,
        };
        self.status.set(status);
        self.busy_polls.set(self.latency.get());
    }

    fn address(&self, byte: u8) {
        self.expect_addr.set(false);
        let read = byte & 1 != 0;
        self.reading.set(read);
        self.response_pos.set(0);

        let nack = self.nack_addresses.get();
        let ack = if nack > 0 {
            self.nack_addresses.set(nack - 1);
            false
        } else {
            byte >> 1 == SIM_ADDR
        };
        self.complete(match (read, ack) {
            (false, true) => TwiStatus::SLAW_ACK,
            (false, false) => TwiStatus::SLAW_NACK,
            (true, true) => TwiStatus::SLAR_ACK,
            (true, false) => TwiStatus::SLAR_NACK,
        });
    }
}

impl TwiHw for SimBoard {
    fn send_start(&self) {
        self.op(Op::Start);
        self.enabled.set(true);
        if self.in_transfer.get() {
            self.repeated_starts.set(self.repeated_starts.get() + 1);
            self.complete(TwiStatus::REP_START);
        } else {
            self.complete(TwiStatus::START);
        }
        self.in_transfer.set(true);
        self.expect_addr.set(true);
    }

    fn send_stop(&self) {
        self.op(Op::Stop);
        self.in_transfer.set(false);
    }

    fn transmit(&self, data: u8) {
        self.op(Op::Tx(data));
        if self.expect_addr.get() {
            self.address(data);
        } else {
            self.complete(TwiStatus::DATA_TX_ACK);
        }
    }

    fn receive(&self, ack: bool) {
        self.op(Op::Rx { ack });
        let response = self.response.borrow();
        let pos = self.response_pos.get();
        let byte = if response.is_empty() {
            0xFF
        } else {
            response[pos % response.len()]
        };
        self.response_pos.set(pos + 1);
        self.data.set(byte);
        self.complete(if ack {
            TwiStatus::DATA_RX_ACK
        } else {
            TwiStatus::DATA_RX_NACK
        });
    }

    fn data(&self) -> u8 {
        self.data.get()
    }

    fn status(&self) -> TwiStatus {
        self.status.get()
    }

    fn is_busy(&self) -> bool {
        if self.stalled.get() {
            return true;
        }
        let polls = self.busy_polls.get();
        if polls > 0 {
            self.busy_polls.set(polls - 1);
            true
        } else {
            false
        }
    }

    fn set_enabled(&self, enabled: bool) {
        if !enabled {
            self.op(Op::Disable);
            self.in_transfer.set(false);
        }
        self.enabled.set(enabled);
    }
}

impl Watchdog for SimBoard {
    fn poke(&self) {
        self.wdt_pokes.set(self.wdt_pokes.get() + 1);
    }

    fn arm_shutdown(&self) {
        self.wdt_armed.set(true);
    }
}

impl ReportSink for SimBoard {
    fn report(&self, _m: &MainCtx<'_>, report: &Report) {
        self.reports.borrow_mut().push(*report);
    }

    fn event(&self, _m: &MainCtx<'_>, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl NvStore for SimBoard {
    fn read(&self, addr: u16) -> u8 {
        self.eeprom
            .borrow()
            .get(addr as usize)
            .copied()
            .unwrap_or(0xFF)
    }

    fn write(&self, addr: u16, value: u8) {
        if let Some(cell) = self.eeprom.borrow_mut().get_mut(addr as usize) {
            *cell = value;
        }
    }
}

impl ConsoleRx for SimBoard {
    fn rx_byte(&self) -> Option<u8> {
        self.rx.borrow_mut().pop_front()
    }
}

// vim: ts=4 sw=4 expandtab
