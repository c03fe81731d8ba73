// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    command::{Command, ParseError},
    console::{Console, ConsoleRx, NvStore},
    mutex::{IrqCtx, MainCtx},
    report::{Event, ReportSink},
    sampler::Sampler,
    timebase::{TimeBase, Watchdog},
    twi::{TwiBus, TwiHw, TwiMaster},
};

/// All hardware the system needs.
pub trait Board: TwiHw + Watchdog + ReportSink + NvStore + ConsoleRx {}

impl<T: TwiHw + Watchdog + ReportSink + NvStore + ConsoleRx> Board for T {}

pub struct System<'a> {
    pub timebase: TimeBase<'a>,
    pub twi: TwiMaster<'a>,
    pub sampler: Sampler,
    pub console: Console,
}

impl<'a> System<'a> {
    pub const fn new() -> Self {
        Self {
            timebase: TimeBase::new(),
            twi: TwiMaster::new(),
            sampler: Sampler::new(),
            console: Console::new(),
        }
    }

    pub fn init(&'a self, m: &MainCtx<'_>, hw: &impl Board) {
        self.timebase.init(m);
        self.twi.init(m, hw);
        self.sampler.init(m);
        self.console.init(m);
        self.timebase.register_tick_notify(&self.sampler);
    }

    /// Timer interrupt.
    pub fn irq_tick(&self, c: &IrqCtx<'_>) {
        self.timebase.irq_tick(c);
    }

    /// One main loop iteration.
    pub fn run(&'a self, m: &MainCtx<'_>, hw: &impl Board) {
        self.timebase.run(m, hw);

        let bus = TwiBus {
            twi: &self.twi,
            tb: &self.timebase,
            hw,
        };
        self.sampler.run(m, &bus, hw);

        self.twi.run(m, &self.timebase, hw);

        if let Some(cmd) = self.console.run(m, hw) {
            self.execute(m, hw, cmd);
        }
    }

    fn execute(&self, m: &MainCtx<'_>, hw: &impl Board, cmd: Result<Command, ParseError>) {
        match cmd {
            Ok(Command::Reset) => {
                self.sampler.reset(m);
                hw.event(m, Event::Reset);
            }
            Ok(Command::Start) => self.sampler.start(m),
            Ok(Command::Stop) => self.sampler.stop(m),
            Ok(Command::SampleRate(rate)) => match self.sampler.set_sample_rate(m, rate) {
                Some(ticks) => hw.event(m, Event::SampleRate(ticks)),
                None => hw.event(m, Event::BadArgument),
            },
            Ok(Command::ReportRate(rate)) => match self.sampler.set_report_rate(m, rate) {
                Some(ticks) => hw.event(m, Event::ReportRate(ticks)),
                None => hw.event(m, Event::BadArgument),
            },
            Ok(Command::EeRead(addr)) => {
                let value = hw.read(addr);
                hw.event(m, Event::EeData { addr, value });
            }
            Ok(Command::EeWrite(addr, value)) => hw.write(addr, value),
            Ok(Command::Shutdown) => {
                hw.event(m, Event::ShuttingDown);
                self.timebase.commence_shutdown(m, hw);
            }
            Err(ParseError::UnknownCommand) => hw.event(m, Event::UnknownCommand),
            Err(ParseError::BadArgument) => hw.event(m, Event::BadArgument),
        }
    }
}

impl Default for System<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{sampler::SamplerState, sim::SimBoard};

    #[test]
    fn test_console_control() {
        // SAFETY: The test thread is the main context.
        let m = unsafe { MainCtx::new() };
        let board = SimBoard::new();
        let sys = System::new();
        sys.init(&m, &board);
        board.set_response(&[0x00, 0x64]);
        board.run(&m, &sys, 20);
        board.clear_events();

        board.type_bytes(b"report 5\rsample 50\rstart\r");
        board.run(&m, &sys, 20);
        assert!(sys.sampler.is_enabled(&m));
        assert_eq!(sys.sampler.state(&m), SamplerState::WaitTick);
        assert_eq!(
            board.events(),
            [
                Event::ReportRate(200),
                Event::SampleRate(20),
                Event::Starting,
            ]
        );

        board.tick_and_run(&m, &sys, 200, 10);
        assert_eq!(board.reports().len(), 1);
        assert_eq!(board.reports()[0].mean_current, 105);
        assert_eq!(board.rx_count(), 10 * 2);

        board.type_bytes(b"RESET\rstop\r");
        board.run(&m, &sys, 20);
        assert_eq!(sys.sampler.accumulated_current(&m), 0);
        assert_eq!(sys.sampler.state(&m), SamplerState::Stopped);
    }

    #[test]
    fn test_console_diagnostics() {
        // SAFETY: The test thread is the main context.
        let m = unsafe { MainCtx::new() };
        let board = SimBoard::new();
        let sys = System::new();
        sys.init(&m, &board);
        board.run(&m, &sys, 20);
        board.clear_events();

        board.type_bytes(b"eewrite 3 42\reeread 3\rbogus\rsample 0\reeread\r");
        board.run(&m, &sys, 10);
        assert_eq!(
            board.events(),
            [
                Event::EeData { addr: 3, value: 42 },
                Event::UnknownCommand,
                Event::BadArgument,
                Event::BadArgument,
            ]
        );
        assert_eq!(sys.sampler.state(&m), SamplerState::Stopped);
    }

    #[test]
    fn test_watchdog() {
        // SAFETY: The test thread is the main context.
        let m = unsafe { MainCtx::new() };
        let board = SimBoard::new();
        let sys = System::new();
        sys.init(&m, &board);

        board.run(&m, &sys, 10);
        assert_eq!(board.wdt_pokes(), 10);
        assert!(!board.wdt_armed());

        board.type_bytes(b"shutdown\r");
        board.run(&m, &sys, 10);
        assert!(sys.timebase.is_shutting_down(&m));
        assert!(board.wdt_armed());
        assert_eq!(board.wdt_pokes(), 11);
        assert_eq!(board.events().last(), Some(&Event::ShuttingDown));
    }
}

// vim: ts=4 sw=4 expandtab
