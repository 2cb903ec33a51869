//! Little-endian wire encoding helpers shared by all framed payloads.
//!
//! Decoding is performed against a `Buf` and fails with
//! [`Error::MalformedPayload`](crate::error::Error::MalformedPayload) on short
//! input instead of panicking, so a streaming codec can retry once more bytes
//! have arrived.

use bytes::{Buf, BufMut};

use crate::error::{self, Result};
use snafu::ensure;

pub fn ensure_remaining<B: Buf>(buf: &B, required: usize) -> Result<()> {
    ensure!(
        buf.remaining() >= required,
        error::MalformedPayload {
            required: required - buf.remaining(),
            available: buf.remaining(),
        }
    );
    Ok(())
}

pub fn get_u8<B: Buf>(buf: &mut B) -> Result<u8> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn get_u16<B: Buf>(buf: &mut B) -> Result<u16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16_le())
}

pub fn get_u32<B: Buf>(buf: &mut B) -> Result<u32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_u32_le())
}

pub fn get_f64<B: Buf>(buf: &mut B) -> Result<f64> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_f64_le())
}

/// Writes a `u32` length prefix followed by the raw UTF-8 bytes.
pub fn put_string<B: BufMut>(buf: &mut B, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

pub fn get_string<B: Buf>(buf: &mut B) -> Result<String> {
    let len = get_u32(buf)? as usize;
    ensure_remaining(buf, len)?;
    let mut bytes = vec![0_u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|source| error::Error::InvalidUtf8 { source })
}
