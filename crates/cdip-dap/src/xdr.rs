//! XDR primitive reads over a `.dods` binary payload
//!
//! XDR is big-endian and 4-byte aligned: 16-bit integers travel as 32-bit
//! words, byte runs and strings are padded out to a multiple of four.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{DapError, Result};

pub struct XdrReader<'a> {
    cur: Cursor<&'a [u8]>,
}

impl<'a> XdrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cur: Cursor::new(buf),
        }
    }

    pub fn remaining(&self) -> usize {
        self.cur.get_ref().len() - self.cur.position() as usize
    }

    pub fn read_u32(&mut self, ctx: &str) -> Result<u32> {
        self.cur
            .read_u32::<BigEndian>()
            .map_err(|_| DapError::Truncated(ctx.to_string()))
    }

    pub fn read_i32(&mut self, ctx: &str) -> Result<i32> {
        self.cur
            .read_i32::<BigEndian>()
            .map_err(|_| DapError::Truncated(ctx.to_string()))
    }

    pub fn read_f32(&mut self, ctx: &str) -> Result<f32> {
        self.cur
            .read_f32::<BigEndian>()
            .map_err(|_| DapError::Truncated(ctx.to_string()))
    }

    pub fn read_f64(&mut self, ctx: &str) -> Result<f64> {
        self.cur
            .read_f64::<BigEndian>()
            .map_err(|_| DapError::Truncated(ctx.to_string()))
    }

    pub fn read_bytes(&mut self, n: usize, ctx: &str) -> Result<Vec<u8>> {
        if n > self.remaining() {
            return Err(DapError::Truncated(ctx.to_string()));
        }
        let mut buf = vec![0u8; n];
        self.cur
            .read_exact(&mut buf)
            .map_err(|_| DapError::Truncated(ctx.to_string()))?;
        Ok(buf)
    }

    /// Skip the alignment padding after a run of `consumed` raw bytes
    pub fn skip_pad(&mut self, consumed: usize, ctx: &str) -> Result<()> {
        let pad = (4 - consumed % 4) % 4;
        if pad > 0 {
            self.read_bytes(pad, ctx)?;
        }
        Ok(())
    }

    /// A counted string: u32 length, bytes, padding
    pub fn read_string(&mut self, ctx: &str) -> Result<String> {
        let len = self.read_u32(ctx)? as usize;
        let bytes = self.read_bytes(len, ctx)?;
        self.skip_pad(len, ctx)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
