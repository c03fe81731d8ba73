// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Current sampling and charge accumulation.
//!
//! The sensor is read once per sample tick through the TWI master.
//! Every report tick the mean of the interval is added to the
//! accumulated current and a [Report] is emitted.

use crate::{
    ina219::{self, DEFAULT_CONFIG, Register},
    mutex::{IrqCtx, MainCtx, Mutex, MutexCell},
    report::{Event, Report, ReportSink},
    timebase::{TICKS_PER_SECOND, TickNotify},
    twi::{TwiBus, TwiHandler, TwiHw, TwiResult, TwiStatus},
};
use core::cell::Cell;

pub const DEFAULT_TICKS_PER_SAMPLE: u16 = 1;
pub const DEFAULT_TICKS_PER_REPORT: u16 = 100;

/// Offset of the sensor ADC.
pub const ADC_BIAS: i16 = 5;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SamplerState {
    InitialConfig,
    WaitConfig,
    Stopped,
    WaitRegisterPtrSet,
    WaitTick,
    WaitReading,
}

/// Convert an event rate per second into a tick period.
fn rate_to_ticks(per_second: u16) -> Option<u16> {
    if (1..=TICKS_PER_SECOND).contains(&per_second) {
        Some(TICKS_PER_SECOND / per_second)
    } else {
        None
    }
}

pub struct Sampler {
    state: MutexCell<SamplerState>,
    enabled: MutexCell<bool>,

    // Result of the last sensor operation.
    op_done: MutexCell<bool>,
    op_ok: MutexCell<bool>,
    op_status: MutexCell<TwiStatus>,
    reading: MutexCell<i16>,

    num_samples: MutexCell<u16>,
    sample_sum: MutexCell<i32>,
    acc_current: MutexCell<i32>,
    read_errors: MutexCell<u16>,

    /// Report period of the current run.
    run_ticks_per_report: MutexCell<u16>,
    next_ticks_per_sample: MutexCell<u16>,
    next_ticks_per_report: MutexCell<u16>,

    // Shared with the timer interrupt.
    running: Mutex<Cell<bool>>,
    tick_due: Mutex<Cell<bool>>,
    /// Report boundaries not yet handled.
    reports_due: Mutex<Cell<u8>>,
    sample_count: Mutex<Cell<u16>>,
    report_count: Mutex<Cell<u16>>,
    ticks_per_sample: Mutex<Cell<u16>>,
    ticks_per_report: Mutex<Cell<u16>>,
    elapsed: Mutex<Cell<i32>>,
}

impl Sampler {
    pub const fn new() -> Self {
        Self {
            state: MutexCell::new(SamplerState::InitialConfig),
            enabled: MutexCell::new(false),
            op_done: MutexCell::new(false),
            op_ok: MutexCell::new(false),
            op_status: MutexCell::new(TwiStatus(0)),
            reading: MutexCell::new(0),
            num_samples: MutexCell::new(0),
            sample_sum: MutexCell::new(0),
            acc_current: MutexCell::new(0),
            read_errors: MutexCell::new(0),
            run_ticks_per_report: MutexCell::new(DEFAULT_TICKS_PER_REPORT),
            next_ticks_per_sample: MutexCell::new(DEFAULT_TICKS_PER_SAMPLE),
            next_ticks_per_report: MutexCell::new(DEFAULT_TICKS_PER_REPORT),
            running: Mutex::new(Cell::new(false)),
            tick_due: Mutex::new(Cell::new(false)),
            reports_due: Mutex::new(Cell::new(0)),
            sample_count: Mutex::new(Cell::new(0)),
            report_count: Mutex::new(Cell::new(0)),
            ticks_per_sample: Mutex::new(Cell::new(DEFAULT_TICKS_PER_SAMPLE)),
            ticks_per_report: Mutex::new(Cell::new(DEFAULT_TICKS_PER_REPORT)),
            elapsed: Mutex::new(Cell::new(0)),
        }
    }

    pub fn init(&self, m: &MainCtx<'_>) {
        self.state.set(m, SamplerState::InitialConfig);
        self.enabled.set(m, false);
        self.read_errors.set(m, 0);
        self.next_ticks_per_sample.set(m, DEFAULT_TICKS_PER_SAMPLE);
        self.next_ticks_per_report.set(m, DEFAULT_TICKS_PER_REPORT);
        critical_section::with(|cs| self.running.borrow(cs).set(false));
        self.reset(m);
    }

    pub fn start(&self, m: &MainCtx<'_>) {
        self.enabled.set(m, true);
    }

    /// Stop sampling.
    ///
    /// A sensor read in flight is completed first.
    pub fn stop(&self, m: &MainCtx<'_>) {
        self.enabled.set(m, false);
    }

    pub fn is_enabled(&self, m: &MainCtx<'_>) -> bool {
        self.enabled.get(m)
    }

    /// Zero all accumulators. Sampling continues, if enabled.
    pub fn reset(&self, m: &MainCtx<'_>) {
        self.num_samples.set(m, 0);
        self.sample_sum.set(m, 0);
        self.acc_current.set(m, 0);
        critical_section::with(|cs| self.elapsed.borrow(cs).set(0));
    }

    /// Set the number of sensor reads per second.
    ///
    /// Takes effect on the next start.
    /// Returns the resulting tick period.
    /// A sample period longer than the report period is rejected.
    pub fn set_sample_rate(&self, m: &MainCtx<'_>, per_second: u16) -> Option<u16> {
        let ticks = rate_to_ticks(per_second)?;
        if ticks > self.next_ticks_per_report.get(m) {
            return None;
        }
        self.next_ticks_per_sample.set(m, ticks);
        Some(ticks)
    }

    /// Set the number of reports per second.
    ///
    /// Takes effect on the next start.
    /// Returns the resulting tick period.
    /// A report period shorter than the sample period is rejected.
    pub fn set_report_rate(&self, m: &MainCtx<'_>, per_second: u16) -> Option<u16> {
        let ticks = rate_to_ticks(per_second)?;
        if ticks < self.next_ticks_per_sample.get(m) {
            return None;
        }
        self.next_ticks_per_report.set(m, ticks);
        Some(ticks)
    }

    pub fn state(&self, m: &MainCtx<'_>) -> SamplerState {
        self.state.get(m)
    }

    pub fn accumulated_current(&self, m: &MainCtx<'_>) -> i32 {
        self.acc_current.get(m)
    }

    /// Interval sample count and sum.
    pub fn interval(&self, m: &MainCtx<'_>) -> (u16, i32) {
        (self.num_samples.get(m), self.sample_sum.get(m))
    }

    pub fn elapsed_ticks(&self) -> i32 {
        critical_section::with(|cs| self.elapsed.borrow(cs).get())
    }

    /// Number of failed sensor reads since boot.
    pub fn read_errors(&self, m: &MainCtx<'_>) -> u16 {
        self.read_errors.get(m)
    }

    /// Start the tick source with the pending cadence.
    fn arm_ticks(&self, m: &MainCtx<'_>) {
        let tps = self.next_ticks_per_sample.get(m);
        let tpr = self.next_ticks_per_report.get(m);
        self.run_ticks_per_report.set(m, tpr);
        critical_section::with(|cs| {
            self.ticks_per_sample.borrow(cs).set(tps);
            self.ticks_per_report.borrow(cs).set(tpr);
            self.sample_count.borrow(cs).set(0);
            self.report_count.borrow(cs).set(0);
            self.tick_due.borrow(cs).set(false);
            self.reports_due.borrow(cs).set(0);
            self.running.borrow(cs).set(true);
        });
    }

    fn disarm_ticks(&self) {
        critical_section::with(|cs| {
            self.running.borrow(cs).set(false);
            self.tick_due.borrow(cs).set(false);
            self.reports_due.borrow(cs).set(0);
        });
    }

    fn take_report_due(&self) -> Option<i32> {
        critical_section::with(|cs| {
            let due = self.reports_due.borrow(cs);
            if due.get() == 0 {
                None
            } else {
                due.set(due.get() - 1);
                Some(self.elapsed.borrow(cs).get())
            }
        })
    }

    /// Fold the finished read into the interval.
    /// Returns `false` for a failed read.
    fn complete_reading(&self, m: &MainCtx<'_>) -> bool {
        let ok = self.op_ok.get(m);
        if ok {
            let value = self.reading.get(m) as i32 + ADC_BIAS as i32;
            self.num_samples
                .set(m, self.num_samples.get(m).saturating_add(1));
            self.sample_sum
                .set(m, self.sample_sum.get(m).saturating_add(value));
        } else {
            self.read_errors
                .set(m, self.read_errors.get(m).wrapping_add(1));
        }
        ok
    }

    /// Emit one report for every report boundary that has passed.
    fn emit_due_reports(&self, m: &MainCtx<'_>, sink: &impl ReportSink) {
        while let Some(elapsed_ticks) = self.take_report_due() {
            let num_samples = self.num_samples.get(m);
            let mean_current = if num_samples == 0 {
                0
            } else {
                self.sample_sum.get(m) / num_samples as i32
            };
            let acc_current = self.acc_current.get(m).saturating_add(mean_current);
            self.acc_current.set(m, acc_current);

            // Hundredths of mAh.
            let reports_per_second = TICKS_PER_SECOND / self.run_ticks_per_report.get(m);
            let divisor = 360 * reports_per_second as i32;
            let report = Report {
                elapsed_ticks,
                mean_current,
                charge: acc_current / divisor,
            };
            sink.report(m, &report);

            self.num_samples.set(m, 0);
            self.sample_sum.set(m, 0);
        }
    }

    pub fn run<'a, H: TwiHw>(
        &'a self,
        m: &MainCtx<'_>,
        bus: &TwiBus<'_, 'a, H>,
        sink: &impl ReportSink,
    ) {
        match self.state.get(m) {
            SamplerState::InitialConfig => {
                self.op_done.set(m, false);
                if ina219::set_configuration(m, bus, &DEFAULT_CONFIG, self) {
                    sink.event(m, Event::Configuring(DEFAULT_CONFIG.word()));
                    self.state.set(m, SamplerState::WaitConfig);
                }
            }
            SamplerState::WaitConfig => {
                if self.op_done.get(m) {
                    if self.op_ok.get(m) {
                        sink.event(m, Event::ConfigDone);
                    } else {
                        sink.event(m, Event::ConfigFailed(self.op_status.get(m).0));
                    }
                    self.state.set(m, SamplerState::Stopped);
                }
            }
            SamplerState::Stopped => {
                if self.enabled.get(m) {
                    self.op_done.set(m, false);
                    if ina219::set_register_ptr(m, bus, Register::ShuntVoltage, self) {
                        self.num_samples.set(m, 0);
                        self.sample_sum.set(m, 0);
                        self.arm_ticks(m);
                        sink.event(m, Event::Starting);
                        self.state.set(m, SamplerState::WaitRegisterPtrSet);
                    }
                }
            }
            SamplerState::WaitRegisterPtrSet => {
                if self.op_done.get(m) {
                    if !self.op_ok.get(m) {
                        sink.event(m, Event::BusError(self.op_status.get(m).0));
                    }
                    self.state.set(m, SamplerState::WaitTick);
                }
            }
            SamplerState::WaitTick => {
                if self.enabled.get(m) {
                    let tick_due = critical_section::with(|cs| self.tick_due.borrow(cs).get());
                    // A read due on a report boundary belongs to that report.
                    // Start it before the report is emitted.
                    self.op_done.set(m, false);
                    if tick_due && ina219::read_register(m, bus, self) {
                        critical_section::with(|cs| self.tick_due.borrow(cs).set(false));
                        self.state.set(m, SamplerState::WaitReading);
                    } else {
                        self.emit_due_reports(m, sink);
                    }
                } else {
                    self.disarm_ticks();
                    sink.event(m, Event::Stopped);
                    self.state.set(m, SamplerState::Stopped);
                }
            }
            SamplerState::WaitReading => {
                if self.op_done.get(m) {
                    if !self.complete_reading(m) {
                        sink.event(m, Event::BusError(self.op_status.get(m).0));
                    }
                    self.emit_due_reports(m, sink);
                    self.state.set(m, SamplerState::WaitTick);
                }
            }
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiHandler for Sampler {
    fn twi_complete(&self, m: &MainCtx<'_>, result: &TwiResult<'_>) {
        self.op_ok.set(m, result.ok);
        self.op_status.set(m, result.status);
        if let Some(value) = ina219::register_value(result.data) {
            self.reading.set(m, value);
        }
        self.op_done.set(m, true);
    }
}

impl TickNotify for Sampler {
    fn tick(&self, c: &IrqCtx<'_>) {
        let cs = c.cs();
        if !self.running.borrow(cs).get() {
            return;
        }

        let elapsed = self.elapsed.borrow(cs);
        elapsed.set(elapsed.get().wrapping_add(1));

        let count = self.sample_count.borrow(cs);
        let n = count.get() + 1;
        if n >= self.ticks_per_sample.borrow(cs).get() {
            self.tick_due.borrow(cs).set(true);
            count.set(0);
        } else {
            count.set(n);
        }

        let count = self.report_count.borrow(cs);
        let n = count.get() + 1;
        if n >= self.ticks_per_report.borrow(cs).get() {
            let due = self.reports_due.borrow(cs);
            due.set(due.get().saturating_add(1));
            count.set(0);
        } else {
            count.set(n);
        }
    }
}


// vim: ts=4 sw=4 expandtab
