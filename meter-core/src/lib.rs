// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware independent core of the current meter firmware.
//!
//! Everything in here runs on the AVR target as well as on the host.
//! The hardware is reached only through the traits in [system::Board].

#![no_std]

#[cfg(test)]
extern crate std;

pub mod command;
pub mod console;
pub mod frame;
pub mod ina219;
pub mod mutex;
pub mod report;
pub mod ring;
pub mod sampler;
pub mod system;
pub mod timebase;
pub mod twi;

#[cfg(test)]
mod sim;

// vim: ts=4 sw=4 expandtab
