// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::hw::{FCPU, mcu};
use meter_core::{
    mutex::{IrqCtx, LazyMainInit, MainCtx},
    timebase::TICKS_PER_SECOND,
};

#[allow(non_snake_case)]
pub struct Dp {
    pub TC3: mcu::TC3,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static DP: LazyMainInit<Dp> = unsafe { LazyMainInit::uninit() };

const TIMER_PS: u32 = 64;
const TIMER_TOP: u16 = (FCPU / TIMER_PS / TICKS_PER_SECOND as u32 - 1) as u16;

const WGM32: u8 = 1 << 3;
const CS31: u8 = 1 << 1;
const CS30: u8 = 1 << 0;
const OCF3A: u8 = 1 << 1;
const OCIE3A: u8 = 1 << 1;

pub fn timer_init(_m: &MainCtx) {
    let tc = &DP.TC3;
    // Timer 3 configuration:
    // CTC mode, CS: 64 -> one compare match every millisecond.
    // SAFETY: Raw register values as described in the datasheet.
    unsafe {
        tc.tccr3b().write(|w| w.bits(0));
        tc.tccr3a().write(|w| w.bits(0));
        tc.tcnt3().write(|w| w.bits(0));
        tc.ocr3a().write(|w| w.bits(TIMER_TOP));
        tc.tifr3().write(|w| w.bits(OCF3A));
        tc.timsk3().write(|w| w.bits(OCIE3A));
        tc.tccr3b().write(|w| w.bits(WGM32 | CS31 | CS30));
    }
}

pub fn irq_handler_timer3_compa(c: &IrqCtx) {
    crate::SYSTEM.irq_tick(c);
}

// vim: ts=4 sw=4 expandtab
