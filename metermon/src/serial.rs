// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::render::render;
use anyhow::{self as ah, Context as _};
use meter_core::frame::FrameDecoder;
use std::{
    io::{ErrorKind, Read as _, Write as _},
    sync::mpsc,
    time::Duration,
};

const DEFAULT_PORT: &str = "/dev/ttyACM0";

pub fn run_serial(port: Option<&str>, baud: u32, cmd_rx: &mpsc::Receiver<String>) -> ah::Result<()> {
    let port = port.unwrap_or(DEFAULT_PORT);
    let mut serial = serialport::new(port, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(Duration::from_millis(100))
        .open()
        .context("Open serial port")?;
    eprintln!("Connected to {port} at {baud} baud.");

    let mut decoder = FrameDecoder::new();
    let mut buf = [0_u8; 64];
    loop {
        match serial.read(&mut buf) {
            Ok(count) => {
                for byte in &buf[..count] {
                    if let Some(msg) = decoder.push(*byte) {
                        println!("{}", render(&msg));
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => (),
            Err(e) => return Err(e).context("Serial port read"),
        }

        while let Ok(mut line) = cmd_rx.try_recv() {
            line.push('\r');
            serial
                .write_all(line.as_bytes())
                .context("Serial port write")?;
        }
    }
}

// vim: ts=4 sw=4 expandtab
