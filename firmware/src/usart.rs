// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::hw::{FCPU, Hw, interrupt, mcu};
use avr_atomic::AvrAtomic;
use core::cell::Cell;
use meter_core::{
    console::ConsoleRx,
    mutex::{CriticalSection, IrqCtx, LazyMainInit, MainCtx, Mutex},
    ring::Ring,
};

#[allow(non_snake_case)]
pub struct Dp {
    pub USART1: mcu::USART1,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static DP: LazyMainInit<Dp> = unsafe { LazyMainInit::uninit() };

const BAUD: u32 = 19_200;
const UBRR: u16 = (FCPU / (16 * BAUD) - 1) as u16;

const RXCIE1: u8 = 1 << 7;
const UDRIE1: u8 = 1 << 5;
const RXEN1: u8 = 1 << 4;
const TXEN1: u8 = 1 << 3;
const UCSZ_8BIT: u8 = (1 << 2) | (1 << 1);

const TX_SIZE: usize = 64;
const RX_SIZE: usize = 16;

static TX: Ring<u8, TX_SIZE> = Ring::new([const { Mutex::new(Cell::new(0)) }; TX_SIZE]);
static RX: Ring<u8, RX_SIZE> = Ring::new([const { Mutex::new(Cell::new(0)) }; RX_SIZE]);
static RX_OVERRUN: AvrAtomic<bool> = AvrAtomic::new();

pub fn usart_init(_m: &MainCtx) {
    let usart = &DP.USART1;
    // SAFETY: Raw register values as described in the datasheet.
    //         8 data bits, no parity, 1 stop bit.
    unsafe {
        usart.ubrr1().write(|w| w.bits(UBRR));
        usart.ucsr1a().write(|w| w.bits(0));
        usart.ucsr1c().write(|w| w.bits(UCSZ_8BIT));
        usart.ucsr1b().write(|w| w.bits(RXCIE1 | RXEN1 | TXEN1));
    }
}

fn set_udrie(enable: bool) {
    DP.USART1.ucsr1b().modify(|r, w| {
        let bits = if enable {
            r.bits() | UDRIE1
        } else {
            r.bits() & !UDRIE1
        };
        // SAFETY: Only the UDRIE1 bit is changed.
        unsafe { w.bits(bits) }
    });
}

/// Queue `data` for transmission.
///
/// Returns `false` and queues nothing, if there is not enough room.
pub fn uart_tx_cs(cs: CriticalSection<'_>, data: &[u8]) -> bool {
    if TX.insert_all(cs, data) {
        set_udrie(true);
        true
    } else {
        false
    }
}

pub fn uart_tx(data: &[u8]) -> bool {
    interrupt::free(|cs| uart_tx_cs(cs, data))
}

/// Returns `true` once after receive bytes have been lost.
pub fn take_rx_overrun() -> bool {
    let overrun = RX_OVERRUN.load();
    if overrun {
        RX_OVERRUN.store(false);
    }
    overrun
}

pub fn irq_handler_usart1_rx(c: &IrqCtx) {
    let data = DP.USART1.udr1().read().bits();
    if !RX.insert(c.cs(), data) {
        RX_OVERRUN.store(true);
    }
}

pub fn irq_handler_usart1_udre(c: &IrqCtx) {
    match TX.get(c.cs()) {
        // SAFETY: Any byte may be sent.
        Some(data) => DP.USART1.udr1().write(|w| unsafe { w.bits(data) }),
        None => set_udrie(false),
    }
}

impl ConsoleRx for Hw {
    fn rx_byte(&self) -> Option<u8> {
        interrupt::free(|cs| RX.get(cs))
    }
}

// vim: ts=4 sw=4 expandtab
