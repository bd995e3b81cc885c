//! Big-endian cursor over a datagram slice.
//!
//! Every read is bounds-checked and reports a [`DecodeError::Truncated`]
//! naming the structure being read, so malformed packets never panic.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error_handling::types::DecodeError;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Takes the next `len` bytes as a borrowed slice.
    pub fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                what,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Splits off a sub-reader over the next `len` bytes.
    pub fn sub(&mut self, len: usize, what: &'static str) -> Result<ByteReader<'a>, DecodeError> {
        self.take(len, what).map(ByteReader::new)
    }

    pub fn skip(&mut self, len: usize, what: &'static str) -> Result<(), DecodeError> {
        self.take(len, what).map(|_| ())
    }

    pub fn u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, what)?[0])
    }

    pub fn u16(&mut self, what: &'static str) -> Result<u16, DecodeError> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn ipv4(&mut self, what: &'static str) -> Result<Ipv4Addr, DecodeError> {
        self.u32(what).map(Ipv4Addr::from)
    }

    pub fn ipv6(&mut self, what: &'static str) -> Result<Ipv6Addr, DecodeError> {
        let b = self.take(16, what)?;
        let mut octets = [0u8; 16];
        octets.copy_from_slice(b);
        Ok(Ipv6Addr::from(octets))
    }
}

/// Reads an unsigned big-endian integer of up to eight octets.
pub fn be_uint(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}
