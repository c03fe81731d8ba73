// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    command::{Command, ParseError, parse},
    mutex::{MainCtx, MutexCell},
};

/// Maximum length of a command line.
/// Excess characters are dropped.
pub const LINE_LEN: usize = 40;

const CR: u8 = b'\r';
const BS: u8 = 0x08;
const DEL: u8 = 0x7F;

/// Source of received console bytes.
pub trait ConsoleRx {
    fn rx_byte(&self) -> Option<u8>;
}

/// Byte addressable non-volatile memory.
pub trait NvStore {
    fn read(&self, addr: u16) -> u8;
    fn write(&self, addr: u16, value: u8);
}

pub struct Console {
    line: [MutexCell<u8>; LINE_LEN],
    len: MutexCell<u8>,
}

impl Console {
    pub const fn new() -> Self {
        Self {
            line: [const { MutexCell::new(0) }; LINE_LEN],
            len: MutexCell::new(0),
        }
    }

    pub fn init(&self, m: &MainCtx<'_>) {
        self.len.set(m, 0);
    }

    /// Consume received bytes until a line is complete.
    ///
    /// Returns the parse result of a complete, non-blank line.
    pub fn run(
        &self,
        m: &MainCtx<'_>,
        rx: &impl ConsoleRx,
    ) -> Option<Result<Command, ParseError>> {
        while let Some(byte) = rx.rx_byte() {
            let len = self.len.get(m) as usize;
            match byte {
                CR => {
                    let mut buf = [0; LINE_LEN];
                    for (dst, src) in buf.iter_mut().zip(&self.line[..len]) {
                        *dst = src.get(m);
                    }
                    self.len.set(m, 0);
                    if let Some(res) = parse(&buf[..len]).transpose() {
                        return Some(res);
                    }
                }
                BS | DEL => {
                    self.len.set(m, len.saturating_sub(1) as u8);
                }
                _ => {
                    if len < LINE_LEN {
                        self.line[len].set(m, byte);
                        self.len.set(m, (len + 1) as u8);
                    }
                }
            }
        }
        None
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
