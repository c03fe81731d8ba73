// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::hw::{FCPU, Hw, mcu};
use meter_core::{
    mutex::{LazyMainInit, MainCtx},
    twi::{TwiHw, TwiStatus},
};

#[allow(non_snake_case)]
pub struct Dp {
    pub TWI: mcu::TWI,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static DP: LazyMainInit<Dp> = unsafe { LazyMainInit::uninit() };

const SCL_FREQ: u32 = 400_000;
const TWBR_VAL: u8 = ((FCPU / SCL_FREQ - 16) / 2) as u8;

const TWINT: u8 = 1 << 7;
const TWEA: u8 = 1 << 6;
const TWSTA: u8 = 1 << 5;
const TWSTO: u8 = 1 << 4;
const TWEN: u8 = 1 << 2;

const TWSR_STATUS_MASK: u8 = 0xF8;

fn twcr_write(val: u8) {
    // SAFETY: All TWCR bit combinations are valid.
    DP.TWI.twcr().write(|w| unsafe { w.bits(val) });
}

pub fn twi_init(_m: &MainCtx) {
    // SAFETY: Prescaler 1. TWBR selects the SCL frequency.
    DP.TWI.twsr().write(|w| unsafe { w.bits(0) });
    // SAFETY: See above.
    DP.TWI.twbr().write(|w| unsafe { w.bits(TWBR_VAL) });
}

impl TwiHw for Hw {
    fn send_start(&self) {
        twcr_write(TWINT | TWSTA | TWEN);
    }

    fn send_stop(&self) {
        twcr_write(TWINT | TWSTO | TWEN);
    }

    fn transmit(&self, data: u8) {
        // SAFETY: Any byte may be sent.
        DP.TWI.twdr().write(|w| unsafe { w.bits(data) });
        twcr_write(TWINT | TWEN);
    }

    fn receive(&self, ack: bool) {
        twcr_write(TWINT | TWEN | if ack { TWEA } else { 0 });
    }

    fn data(&self) -> u8 {
        DP.TWI.twdr().read().bits()
    }

    fn status(&self) -> TwiStatus {
        TwiStatus(DP.TWI.twsr().read().bits() & TWSR_STATUS_MASK)
    }

    fn is_busy(&self) -> bool {
        // TWINT is set by hardware when the current phase is done.
        // It is never set after a stop condition. The master
        // does not poll after a stop.
        DP.TWI.twcr().read().bits() & TWINT == 0
    }

    fn set_enabled(&self, enabled: bool) {
        twcr_write(if enabled { TWEN } else { 0 });
    }
}

// vim: ts=4 sw=4 expandtab
