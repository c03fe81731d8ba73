// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod debug;
mod eeprom;
mod hw;
mod timer;
mod twi;
mod usart;

use crate::hw::{Hw, Peripherals, interrupt, unwrap_option, wdt_init};
use meter_core::{
    mutex::MainCtx,
    report::{Event, ReportSink as _},
    system::System,
};

pub static SYSTEM: System<'static> = System::new();

#[avr_device::entry]
fn main() -> ! {
    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    let init_static_vars = |ctx| {
        timer::DP.init(ctx, timer::Dp { TC3: dp.TC3 });
        twi::DP.init(ctx, twi::Dp { TWI: dp.TWI });
        usart::DP.init(ctx, usart::Dp { USART1: dp.USART1 });
        eeprom::DP.init(ctx, eeprom::Dp { EEPROM: dp.EEPROM });
    };

    // # SAFETY
    //
    // This is the context handle for the main() function.
    // Holding a reference to this object proves that the holder
    // is running in main() context.
    let m = unsafe { MainCtx::new_with_init(init_static_vars) };

    let hw = Hw;
    twi::twi_init(&m);
    usart::usart_init(&m);
    SYSTEM.init(&m, &hw);
    timer::timer_init(&m);

    // SAFETY: This must be after construction of MainCtx
    //         and after initialization of static MainInit variables.
    unsafe { interrupt::enable() };

    loop {
        if usart::take_rx_overrun() {
            hw.event(&m, Event::RxOverrun);
        }
        if let Some(event) = debug::TX_DROPS.take_event(&m) {
            hw.event(&m, event);
        }
        SYSTEM.run(&m, &hw);
    }
}

// vim: ts=4 sw=4 expandtab
