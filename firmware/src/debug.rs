// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{hw::Hw, usart::uart_tx};
use meter_core::{
    frame::Frame,
    mutex::MainCtx,
    report::{DropCounter, Event, Report, ReportSink},
};

/// Frames that did not fit into the UART transmit buffer.
pub static TX_DROPS: DropCounter = DropCounter::new();

fn send(m: &MainCtx, frame: &Frame) {
    // A frame is queued completely or not at all.
    TX_DROPS.record(m, uart_tx(frame.as_bytes()));
}

impl ReportSink for Hw {
    fn report(&self, m: &MainCtx, report: &Report) {
        send(m, &Frame::report(report));
    }

    #[cfg(feature = "debug")]
    fn event(&self, m: &MainCtx, event: Event) {
        send(m, &Frame::event(event));
    }

    #[cfg(not(feature = "debug"))]
    fn event(&self, m: &MainCtx, event: Event) {
        // Only events answering a console request or reporting lost data are sent.
        if matches!(event, Event::EeData { .. } | Event::TxOverrun(_)) {
            send(m, &Frame::event(event));
        }
    }
}

// vim: ts=4 sw=4 expandtab
