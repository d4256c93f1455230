//! Response/request body type shared by the static and proxy handlers.
//!
//! Generated responses are buffered, files are read in chunks and proxied
//! responses stream the upstream body; all are erased into one boxed body type.

use crate::error::BoxError;
use futures_util::stream;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

pub type GatewayBody = BoxBody<Bytes, BoxError>;

/// Largest frame produced by [`file_body`]
pub const FILE_CHUNK_SIZE: u64 = 64 * 1024;

/// Body holding `data` in memory
pub fn full(data: impl Into<Bytes>) -> GatewayBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty() -> GatewayBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Body streaming the next `len` bytes of `file` from its current position
pub fn file_body(file: File, len: u64) -> GatewayBody {
    StreamBody::new(stream::try_unfold((file, len), next_chunk)).boxed()
}

async fn next_chunk(
    (mut file, remaining): (File, u64),
) -> Result<Option<(Frame<Bytes>, (File, u64))>, BoxError> {
    if remaining == 0 {
        return Ok(None);
    }

    let want = usize::try_from(remaining.min(FILE_CHUNK_SIZE)).unwrap_or(1);
    let mut buf = vec![0; want];
    let read = file.read(&mut buf).await?;
    if read == 0 {
        // File shrank after Content-Length was sent
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    buf.truncate(read);

    let remaining = remaining.saturating_sub(u64::try_from(read).unwrap_or(remaining));
    Ok(Some((Frame::data(Bytes::from(buf)), (file, remaining))))
}
