// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary frames on the serial line.
//!
//! `SYNC, kind, len, payload[len], check`
//!
//! `check` is the XOR of `kind`, `len` and all payload bytes.
//! Multi-byte values are little endian.

use crate::report::{Event, Report};

pub const SYNC: u8 = 0xA5;
pub const KIND_REPORT: u8 = 0x01;
pub const KIND_EVENT: u8 = 0x02;

const REPORT_LEN: usize = 12;
const EVENT_LEN: usize = 4;
const MAX_PAYLOAD: usize = REPORT_LEN;

pub const MAX_FRAME_LEN: usize = 3 + MAX_PAYLOAD + 1;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Message {
    Report(Report),
    Event(Event),
}

/// An encoded frame.
pub struct Frame {
    buf: [u8; MAX_FRAME_LEN],
    len: u8,
}

impl Frame {
    fn new(kind: u8, payload: &[u8]) -> Self {
        let mut buf = [0; MAX_FRAME_LEN];
        let len = payload.len();
        buf[0] = SYNC;
        buf[1] = kind;
        buf[2] = len as u8;
        buf[3..3 + len].copy_from_slice(payload);
        buf[3 + len] = checksum(&buf[1..3 + len]);
        Self {
            buf,
            len: (len + 4) as u8,
        }
    }

    pub fn report(report: &Report) -> Self {
        let mut p = [0; REPORT_LEN];
        p[0..4].copy_from_slice(&report.elapsed_ticks.to_le_bytes());
        p[4..8].copy_from_slice(&report.mean_current.to_le_bytes());
        p[8..12].copy_from_slice(&report.charge.to_le_bytes());
        Self::new(KIND_REPORT, &p)
    }

    pub fn event(event: Event) -> Self {
        let (code, arg, extra) = event.to_raw();
        let arg = arg.to_le_bytes();
        Self::new(KIND_EVENT, &[code, arg[0], arg[1], extra])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

fn i32_at(p: &[u8], offs: usize) -> i32 {
    i32::from_le_bytes([p[offs], p[offs + 1], p[offs + 2], p[offs + 3]])
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum DecState {
    Sync,
    Kind,
    Len,
    Payload,
    Check,
}

/// Byte-wise frame decoder.
///
/// Garbage and corrupted frames are skipped.
/// Decoding continues at the next sync byte.
pub struct FrameDecoder {
    state: DecState,
    kind: u8,
    len: u8,
    count: u8,
    payload: [u8; MAX_PAYLOAD],
    errors: u32,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            state: DecState::Sync,
            kind: 0,
            len: 0,
            count: 0,
            payload: [0; MAX_PAYLOAD],
            errors: 0,
        }
    }

    /// Number of discarded frames.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    fn discard(&mut self, byte: u8) {
        self.errors = self.errors.wrapping_add(1);
        // The offending byte may be the start of the next frame.
        self.state = if byte == SYNC {
            DecState::Kind
        } else {
            DecState::Sync
        };
    }

    pub fn push(&mut self, byte: u8) -> Option<Message> {
        match self.state {
            DecState::Sync => {
                if byte == SYNC {
                    self.state = DecState::Kind;
                }
            }
            DecState::Kind => {
                self.kind = byte;
                self.state = DecState::Len;
            }
            DecState::Len => {
                let expected = match self.kind {
                    KIND_REPORT => REPORT_LEN,
                    KIND_EVENT => EVENT_LEN,
                    _ => 0,
                };
                if expected == 0 || byte as usize != expected {
                    self.discard(byte);
                } else {
                    self.len = byte;
                    self.count = 0;
                    self.state = DecState::Payload;
                }
            }
            DecState::Payload => {
                self.payload[self.count as usize] = byte;
                self.count += 1;
                if self.count >= self.len {
                    self.state = DecState::Check;
                }
            }
            DecState::Check => {
                self.state = DecState::Sync;
                let p = &self.payload[..self.len as usize];
                if checksum(p) ^ self.kind ^ self.len != byte {
                    self.discard(byte);
                    return None;
                }
                return match self.kind {
                    KIND_REPORT => Some(Message::Report(Report {
                        elapsed_ticks: i32_at(p, 0),
                        mean_current: i32_at(p, 4),
                        charge: i32_at(p, 8),
                    })),
                    _ => {
                        let msg = Event::from_raw(p[0], u16::from_le_bytes([p[1], p[2]]), p[3])
                            .map(Message::Event);
                        if msg.is_none() {
                            self.errors = self.errors.wrapping_add(1);
                        }
                        msg
                    }
                };
            }
        }
        None
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::vec::Vec;

    fn decode_all(dec: &mut FrameDecoder, bytes: &[u8]) -> Vec<Message> {
        bytes.iter().filter_map(|b| dec.push(*b)).collect()
    }

    #[test]
    fn test_report_layout() {
        let f = Frame::report(&Report {
            elapsed_ticks: 100,
            mean_current: 1005,
            charge: -2,
        });
        assert_eq!(
            f.as_bytes(),
            [
                0xA5, 0x01, 12, //
                100, 0, 0, 0, //
                0xED, 0x03, 0, 0, //
                0xFE, 0xFF, 0xFF, 0xFF, //
                0x01 ^ 12 ^ 100 ^ 0xED ^ 0x03 ^ 0xFE ^ 0xFF ^ 0xFF ^ 0xFF,
            ]
        );
    }

    #[test]
    fn test_resync() {
        let report = Report {
            elapsed_ticks: 123_456,
            mean_current: -40,
            charge: 77,
        };
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x00, 0x13, SYNC, 0x77]);
        stream.extend_from_slice(Frame::event(Event::Starting).as_bytes());

        let mut bad = Frame::report(&report).as_bytes().to_vec();
        bad[5] ^= 0x40;
        stream.extend_from_slice(&bad);

        stream.extend_from_slice(Frame::report(&report).as_bytes());
        stream.extend_from_slice(Frame::event(Event::BusError(0x48)).as_bytes());

        let mut dec = FrameDecoder::new();
        let msgs = decode_all(&mut dec, &stream);
        assert_eq!(
            msgs,
            [
                Message::Event(Event::Starting),
                Message::Report(report),
                Message::Event(Event::BusError(0x48)),
            ]
        );
        assert_eq!(dec.errors(), 2);
    }

    #[test]
    fn test_unknown_event() {
        let mut dec = FrameDecoder::new();
        let frame = Frame::new(KIND_EVENT, &[0xEE, 0, 0, 0]);
        assert!(decode_all(&mut dec, frame.as_bytes()).is_empty());
        assert_eq!(dec.errors(), 1);
        let frame = Frame::event(Event::EeData {
            addr: 513,
            value: 9,
        });
        assert_eq!(
            decode_all(&mut dec, frame.as_bytes()),
            [Message::Event(Event::EeData {
                addr: 513,
                value: 9
            })]
        );
    }
}

// vim: ts=4 sw=4 expandtab
