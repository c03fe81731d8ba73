// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! INA219 high side current sensor.
//!
//! Only one request may be outstanding at a time.
//! The handler passed to each request is called when it finishes.

use crate::{
    mutex::MainCtx,
    twi::{TwiBus, TwiHandler, TwiHw},
};

pub const INA219_ADDR: u8 = 0x40;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Register {
    Configuration = 0,
    ShuntVoltage = 1,
    BusVoltage = 2,
    Power = 3,
    Current = 4,
    Calibration = 5,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum BusRange {
    V16 = 0,
    V32 = 1,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum Pga {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
}

/// ADC resolution or averaging.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum Adc {
    Bits9 = 0,
    Bits10 = 1,
    Bits11 = 2,
    Bits12 = 3,
    Samples1 = 8,
    Samples2 = 9,
    Samples4 = 10,
    Samples8 = 11,
    Samples16 = 12,
    Samples32 = 13,
    Samples64 = 14,
    Samples128 = 15,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum Mode {
    PowerDown = 0,
    ShuntTriggered = 1,
    BusTriggered = 2,
    ShuntBusTriggered = 3,
    AdcOff = 4,
    ShuntContinuous = 5,
    BusContinuous = 6,
    ShuntBusContinuous = 7,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Config {
    pub reset: bool,
    pub bus_range: BusRange,
    pub pga: Pga,
    pub bus_adc: Adc,
    pub shunt_adc: Adc,
    pub mode: Mode,
}

impl Config {
    /// Configuration register value.
    pub const fn word(&self) -> u16 {
        (self.reset as u16) << 15
            | (self.bus_range as u16) << 13
            | (self.pga as u16) << 11
            | (self.bus_adc as u16) << 7
            | (self.shunt_adc as u16) << 3
            | self.mode as u16
    }
}

/// Shunt voltage sampled continuously at the full 320 mV range.
pub const DEFAULT_CONFIG: Config = Config {
    reset: false,
    bus_range: BusRange::V32,
    pga: Pga::Div8,
    bus_adc: Adc::Bits12,
    shunt_adc: Adc::Samples2,
    mode: Mode::ShuntContinuous,
};

pub fn set_configuration<'a, H: TwiHw>(
    m: &MainCtx<'_>,
    bus: &TwiBus<'_, 'a, H>,
    config: &Config,
    handler: &'a (dyn TwiHandler + Sync),
) -> bool {
    let word = config.word().to_be_bytes();
    bus.transfer(
        m,
        INA219_ADDR,
        &[Register::Configuration as u8, word[0], word[1]],
        0,
        handler,
    )
}

/// Select the register that subsequent [read_register] calls read.
pub fn set_register_ptr<'a, H: TwiHw>(
    m: &MainCtx<'_>,
    bus: &TwiBus<'_, 'a, H>,
    reg: Register,
    handler: &'a (dyn TwiHandler + Sync),
) -> bool {
    bus.transfer(m, INA219_ADDR, &[reg as u8], 0, handler)
}

pub fn read_register<'a, H: TwiHw>(
    m: &MainCtx<'_>,
    bus: &TwiBus<'_, 'a, H>,
    handler: &'a (dyn TwiHandler + Sync),
) -> bool {
    bus.transfer(m, INA219_ADDR, &[], 2, handler)
}

/// Decode the data of a finished [read_register].
pub fn register_value(data: &[u8]) -> Option<i16> {
    match data {
        [hi, lo] => Some(i16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}


// vim: ts=4 sw=4 expandtab
