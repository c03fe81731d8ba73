// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

pub use avr_device::atmega32u4::{self as mcu, Peripherals};
pub use avr_device::interrupt;

use meter_core::{mutex::IrqCtx, timebase::Watchdog};

pub const FCPU: u32 = 16_000_000;

macro_rules! define_isr {
    ($name:ident, $handler:path) => {
        #[avr_device::interrupt(atmega32u4)]
        fn $name() {
            // SAFETY: We are inside of an interrupt handler.
            // Therefore, it is safe to construct an `IrqCtx`.
            let c = unsafe { IrqCtx::new() };
            $handler(&c);
        }
    };
}

define_isr!(TIMER3_COMPA, crate::timer::irq_handler_timer3_compa);
define_isr!(USART1_RX, crate::usart::irq_handler_usart1_rx);
define_isr!(USART1_UDRE, crate::usart::irq_handler_usart1_udre);

/// The board.
///
/// The hardware traits are implemented in the modules
/// that own the corresponding peripheral.
pub struct Hw;

const MCUSR: u8 = 0x34; // I/O address
const WDTCSR: u16 = 0x60; // Data address
const WDCE_WDE: u8 = 0x18;
const WDT_500MS: u8 = 0x0D; // WDE=1, WDP2=1, WDP0=1
const WDT_8S: u8 = 0x29; // WDE=1, WDP3=1, WDP0=1

fn wdt_configure(wdtcsr: u8) {
    interrupt::free(|_| {
        // SAFETY: The asm code only accesses the WDT registers
        //         which are not accessed from anywhere else in the program.
        //         Interrupts are disabled for the timed sequence.
        unsafe {
            core::arch::asm!(
                "wdr",
                "sts {WDTCSR}, {ce}",
                "sts {WDTCSR}, {val}",
                ce = in(reg) WDCE_WDE,
                val = in(reg) wdtcsr,
                WDTCSR = const WDTCSR,
                options(nostack, preserves_flags)
            );
        }
    });
}

pub fn wdt_init() {
    // SAFETY: Clearing the reset flags only affects the WDT.
    //         WDRF must be cleared before WDE can be changed.
    unsafe {
        core::arch::asm!(
            "out {MCUSR}, {zero}",
            zero = in(reg) 0_u8,
            MCUSR = const MCUSR,
            options(nostack, preserves_flags)
        );
    }
    wdt_configure(WDT_500MS);
}

impl Watchdog for Hw {
    fn poke(&self) {
        avr_device::asm::wdr();
    }

    fn arm_shutdown(&self) {
        wdt_configure(WDT_8S);
    }
}

/// Cheaper Option::unwrap() alternative.
///
/// This is cheaper, because it doesn't call into the panic unwind path.
/// Therefore, it does not impose caller-saves overhead onto the calling function.
#[inline(always)]
pub fn unwrap_option<T>(value: Option<T>) -> T {
    match value {
        Some(value) => value,
        None => reset_system(),
    }
}

/// Reset the system.
#[inline(always)]
#[allow(clippy::empty_loop)]
pub fn reset_system() -> ! {
    loop {
        // Wait for the watchdog timer to trigger and reset the system.
        // No interrupt will reset the watchdog timer.
    }
}

#[inline(always)]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    reset_system();
}

// vim: ts=4 sw=4 expandtab
