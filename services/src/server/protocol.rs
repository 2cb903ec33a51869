//! The framed wire protocol.
//!
//! A request is `command u8`, the query rectangle (fixed width), the
//! `u32`-length-prefixed graph JSON and a querymode byte. A response is a
//! status byte followed by either a framed result or a length-prefixed error
//! message. All integers little-endian.

use bytes::{Buf, BufMut, BytesMut};
use snafu::ensure;
use tokio_util::codec::{Decoder, Encoder};

use geoproc_datatypes::primitives::QueryRectangle;
use geoproc_datatypes::results::TypedQueryResult;
use geoproc_datatypes::wire;

use crate::error::{self, Error, Result};

pub const COMMAND_GET_RASTER: u8 = 1;

pub const RESPONSE_OK: u8 = 1;
/// reserved for streamed partial responses
pub const RESPONSE_PARTIAL: u8 = 2;
pub const RESPONSE_ERROR: u8 = 9;

/// Cap on the declared graph JSON length; larger frames are a protocol error
/// instead of an allocation.
pub const MAX_GRAPH_BYTES: usize = 16 * 1024 * 1024;

/// Whether the producer may round the result outward to whole pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryMode {
    Loose,
    Exact,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CacheRequest {
    GetRaster {
        query: QueryRectangle,
        graph_json: String,
        query_mode: QueryMode,
    },
}

impl CacheRequest {
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            CacheRequest::GetRaster {
                query,
                graph_json,
                query_mode,
            } => {
                buf.put_u8(COMMAND_GET_RASTER);
                query.encode(buf);
                wire::put_string(buf, graph_json);
                buf.put_u8(match query_mode {
                    QueryMode::Loose => 0,
                    QueryMode::Exact => 1,
                });
            }
        }
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let command = wire::get_u8(buf).map_err(Error::from)?;
        ensure!(
            command == COMMAND_GET_RASTER,
            error::UnknownCommand { command }
        );

        let query = QueryRectangle::decode(buf).map_err(Error::from)?;

        let len = wire::get_u32(buf).map_err(Error::from)? as usize;
        ensure!(
            len <= MAX_GRAPH_BYTES,
            error::GraphTooLarge {
                len,
                max: MAX_GRAPH_BYTES,
            }
        );
        wire::ensure_remaining(buf, len).map_err(Error::from)?;
        let mut bytes = vec![0_u8; len];
        buf.copy_to_slice(&mut bytes);
        let graph_json = String::from_utf8(bytes)
            .map_err(|source| geoproc_datatypes::error::Error::InvalidUtf8 { source })
            .map_err(Error::from)?;

        let query_mode = match wire::get_u8(buf).map_err(Error::from)? {
            0 => QueryMode::Loose,
            _ => QueryMode::Exact,
        };

        Ok(CacheRequest::GetRaster {
            query,
            graph_json,
            query_mode,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CacheResponse {
    Ok(TypedQueryResult),
    Error(String),
}

impl CacheResponse {
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            CacheResponse::Ok(result) => {
                buf.put_u8(RESPONSE_OK);
                result.encode(buf);
            }
            CacheResponse::Error(message) => {
                buf.put_u8(RESPONSE_ERROR);
                wire::put_string(buf, message);
            }
        }
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let status = wire::get_u8(buf).map_err(Error::from)?;
        match status {
            RESPONSE_OK => Ok(CacheResponse::Ok(
                TypedQueryResult::decode(buf).map_err(Error::from)?,
            )),
            RESPONSE_ERROR => Ok(CacheResponse::Error(
                wire::get_string(buf).map_err(Error::from)?,
            )),
            _ => Err(Error::UnknownResponseStatus { status }),
        }
    }
}

/// A decode that ran out of bytes is not an error on a stream socket, the
/// frame is simply not complete yet.
fn is_incomplete(error: &Error) -> bool {
    matches!(
        error,
        Error::DataType {
            source: geoproc_datatypes::error::Error::MalformedPayload { .. },
        }
    )
}

pub struct ProtocolCodec;

impl Decoder for ProtocolCodec {
    type Item = CacheRequest;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<CacheRequest>> {
        let mut slice: &[u8] = &src[..];
        match CacheRequest::decode(&mut slice) {
            Ok(request) => {
                let consumed = src.len() - slice.len();
                src.advance(consumed);
                Ok(Some(request))
            }
            Err(ref error) if is_incomplete(error) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl Encoder<CacheResponse> for ProtocolCodec {
    type Error = Error;

    fn encode(&mut self, response: CacheResponse, dst: &mut BytesMut) -> Result<()> {
        response.encode(dst);
        Ok(())
    }
}
