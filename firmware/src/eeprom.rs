// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::hw::{Hw, interrupt, mcu};
use meter_core::{console::NvStore, mutex::LazyMainInit};

#[allow(non_snake_case)]
pub struct Dp {
    pub EEPROM: mcu::EEPROM,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static DP: LazyMainInit<Dp> = unsafe { LazyMainInit::uninit() };

const EEPROM_SIZE: u16 = 1024;

const EERE: u8 = 1 << 0;
const EEPE: u8 = 1 << 1;
const EECR: u8 = 0x1F; // I/O address

fn wait_ready() {
    while DP.EEPROM.eecr().read().bits() & EEPE != 0 {}
}

fn set_address(addr: u16) {
    // SAFETY: The address is checked against the EEPROM size.
    DP.EEPROM.eear().write(|w| unsafe { w.bits(addr) });
}

/// Byte access to the on-chip EEPROM.
///
/// Accesses wait for a previous write to finish.
/// Addresses beyond the EEPROM read as 0xFF and ignore writes.
impl NvStore for Hw {
    fn read(&self, addr: u16) -> u8 {
        if addr >= EEPROM_SIZE {
            return 0xFF;
        }
        wait_ready();
        set_address(addr);
        // SAFETY: Starts the read. The data is available right after.
        DP.EEPROM.eecr().write(|w| unsafe { w.bits(EERE) });
        DP.EEPROM.eedr().read().bits()
    }

    fn write(&self, addr: u16, value: u8) {
        if addr >= EEPROM_SIZE {
            return;
        }
        wait_ready();
        set_address(addr);
        // SAFETY: Any byte may be stored.
        DP.EEPROM.eedr().write(|w| unsafe { w.bits(value) });
        interrupt::free(|_| {
            // SAFETY: EEPE must be set within four cycles after EEMPE.
            //         Interrupts are disabled for the timed sequence.
            unsafe {
                core::arch::asm!(
                    "sbi {EECR}, 2", // EEMPE
                    "sbi {EECR}, 1", // EEPE
                    EECR = const EECR,
                    options(nostack, preserves_flags)
                );
            }
        });
    }
}

// vim: ts=4 sw=4 expandtab
