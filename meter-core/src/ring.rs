// -*- coding: utf-8 -*-
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::mutex::{CriticalSection, Mutex};
use core::cell::Cell;

/// Fixed size FIFO shared between main and interrupt context.
///
/// `SIZE` must be a power of two and at most 128.
pub struct Ring<T, const SIZE: usize> {
    buf: [Mutex<Cell<T>>; SIZE],
    wr: Mutex<Cell<u8>>,
    rd: Mutex<Cell<u8>>,
}

impl<T, const SIZE: usize> Ring<T, SIZE> {
    const MASK: u8 = {
        assert!(SIZE.is_power_of_two() && SIZE <= 128);
        (SIZE - 1) as u8
    };

    pub const fn new(buf: [Mutex<Cell<T>>; SIZE]) -> Self {
        Self {
            buf,
            wr: Mutex::new(Cell::new(0)),
            rd: Mutex::new(Cell::new(0)),
        }
    }
}

impl<T: Copy, const SIZE: usize> Ring<T, SIZE> {
    pub fn len(&self, cs: CriticalSection<'_>) -> usize {
        let wr = self.wr.borrow(cs).get();
        let rd = self.rd.borrow(cs).get();
        wr.wrapping_sub(rd) as usize
    }

    pub fn free(&self, cs: CriticalSection<'_>) -> usize {
        SIZE - self.len(cs)
    }

    pub fn is_empty(&self, cs: CriticalSection<'_>) -> bool {
        self.len(cs) == 0
    }

    pub fn insert(&self, cs: CriticalSection<'_>, value: T) -> bool {
        if self.free(cs) == 0 {
            false
        } else {
            let wr = self.wr.borrow(cs).get();
            self.buf[(wr & Self::MASK) as usize].borrow(cs).set(value);
            self.wr.borrow(cs).set(wr.wrapping_add(1));
            true
        }
    }

    /// Insert all of `values` or nothing.
    pub fn insert_all(&self, cs: CriticalSection<'_>, values: &[T]) -> bool {
        if self.free(cs) < values.len() {
            return false;
        }
        for value in values {
            self.insert(cs, *value);
        }
        true
    }

    pub fn get(&self, cs: CriticalSection<'_>) -> Option<T> {
        if self.is_empty(cs) {
            None
        } else {
            let rd = self.rd.borrow(cs).get();
            let value = self.buf[(rd & Self::MASK) as usize].borrow(cs).get();
            self.rd.borrow(cs).set(rd.wrapping_add(1));
            Some(value)
        }
    }

    pub fn clear(&self, cs: CriticalSection<'_>) {
        let wr = self.wr.borrow(cs).get();
        self.rd.borrow(cs).set(wr);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fifo() {
        let ring: Ring<u8, 4> = Ring::new([const { Mutex::new(Cell::new(0)) }; 4]);
        critical_section::with(|cs| {
            assert!(ring.is_empty(cs));
            assert_eq!(ring.get(cs), None);

            // Run the indices across the u8 wrap.
            for i in 0..300_u16 {
                assert!(ring.insert(cs, i as u8));
                assert!(ring.insert(cs, (i + 1) as u8));
                assert_eq!(ring.len(cs), 2);
                assert_eq!(ring.get(cs), Some(i as u8));
                assert_eq!(ring.get(cs), Some((i + 1) as u8));
            }

            for i in 0..4 {
                assert!(ring.insert(cs, i));
            }
            assert!(!ring.insert(cs, 99));
            assert_eq!(ring.free(cs), 0);
            for i in 0..4 {
                assert_eq!(ring.get(cs), Some(i));
            }
            assert!(ring.is_empty(cs));
        });
    }

    #[test]
    fn test_insert_all() {
        let ring: Ring<u8, 8> = Ring::new([const { Mutex::new(Cell::new(0)) }; 8]);
        critical_section::with(|cs| {
            assert!(ring.insert_all(cs, &[1, 2, 3, 4, 5]));
            assert!(!ring.insert_all(cs, &[6, 7, 8, 9]));
            assert_eq!(ring.len(cs), 5);
            assert!(ring.insert_all(cs, &[6, 7, 8]));
            assert_eq!(ring.free(cs), 0);
            ring.clear(cs);
            assert!(ring.is_empty(cs));
        });
    }
}

// vim: ts=4 sw=4 expandtab
