// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![forbid(unsafe_code)]

mod render;
mod serial;

use crate::serial::run_serial;
use anyhow as ah;
use clap::Parser;
use critical_section as _;
use std::{io::BufRead as _, sync::mpsc, thread, time::Duration};

/// Monitor for the power meter.
///
/// Prints the measurement reports and events sent by the device.
/// Lines typed on stdin are sent to the device console.
#[derive(Parser, Debug)]
struct Opts {
    /// Serial port of the device.
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = 19_200)]
    baud: u32,
}

fn main() -> ah::Result<()> {
    let opts = Opts::parse();

    let (cmd_tx, cmd_rx) = mpsc::channel::<String>();

    thread::scope(|s| -> ah::Result<()> {
        s.spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if cmd_tx.send(line).is_err() {
                    break;
                }
            }
        });

        loop {
            if let Err(e) = run_serial(opts.port.as_deref(), opts.baud, &cmd_rx) {
                eprintln!("Serial error: {e:?}");
            }
            thread::sleep(Duration::from_millis(5000));
        }
    })
}

// vim: ts=4 sw=4 expandtab
