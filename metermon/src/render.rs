// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use meter_core::{
    frame::Message,
    report::{Event, Report},
    timebase::TICKS_PER_SECOND,
};

/// Format `value` as a decimal number with `frac` fractional digits.
/// `value` is in units of the last fractional digit.
fn fixed(value: i32, frac: u32) -> String {
    let div = 10_i64.pow(frac);
    let v = i64::from(value);
    let sign = if v < 0 { "-" } else { "" };
    let v = v.abs();
    format!(
        "{sign}{}.{:0width$}",
        v / div,
        v % div,
        width = frac as usize
    )
}

fn render_report(report: &Report) -> String {
    // Ticks to milliseconds.
    let ms = i64::from(report.elapsed_ticks) * 1000 / i64::from(TICKS_PER_SECOND);
    let ms = i32::try_from(ms).unwrap_or(i32::MAX);
    format!(
        "{}, {}, {}",
        fixed(ms, 3),
        fixed(report.mean_current, 1),
        fixed(report.charge, 2)
    )
}

fn render_event(event: &Event) -> String {
    match event {
        Event::Configuring(word) => format!("configuring sensor: {word:#06X}"),
        Event::ConfigDone => "sensor configured".to_string(),
        Event::ConfigFailed(status) => format!("sensor configuration failed: status {status:#04X}"),
        Event::Starting => "starting".to_string(),
        Event::Stopped => "stopped".to_string(),
        Event::BusError(status) => format!("bus error: status {status:#04X}"),
        Event::Reset => "accumulators reset".to_string(),
        Event::UnknownCommand => "unrecognized command".to_string(),
        Event::BadArgument => "bad argument".to_string(),
        Event::SampleRate(ticks) => format!("ticks per sample: {ticks}"),
        Event::ReportRate(ticks) => format!("ticks per report: {ticks}"),
        Event::EeData { addr, value } => format!("{addr}:{value}"),
        Event::RxOverrun => "console receive overrun".to_string(),
        Event::ShuttingDown => "shutting down".to_string(),
        Event::TxOverrun(dropped) => format!("{dropped} frames dropped by the device"),
    }
}

pub fn render(msg: &Message) -> String {
    match msg {
        Message::Report(report) => render_report(report),
        Message::Event(event) => render_event(event),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fixed() {
        assert_eq!(fixed(1005, 1), "100.5");
        assert_eq!(fixed(7, 2), "0.07");
        assert_eq!(fixed(-1234, 2), "-12.34");
        assert_eq!(fixed(0, 3), "0.000");
    }

    #[test]
    fn test_report() {
        let msg = Message::Report(Report {
            elapsed_ticks: 12_345,
            mean_current: 1005,
            charge: 279,
        });
        assert_eq!(render(&msg), "12.345, 100.5, 2.79");
    }

    #[test]
    fn test_event() {
        assert_eq!(
            render(&Message::Event(Event::EeData { addr: 3, value: 42 })),
            "3:42"
        );
        assert_eq!(
            render(&Message::Event(Event::BusError(0x20))),
            "bus error: status 0x20"
        );
        assert_eq!(
            render(&Message::Event(Event::Configuring(0x39CD))),
            "configuring sensor: 0x39CD"
        );
        assert_eq!(
            render(&Message::Event(Event::TxOverrun(3))),
            "3 frames dropped by the device"
        );
    }
}

// vim: ts=4 sw=4 expandtab
