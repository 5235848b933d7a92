use bytes::{Buf, Bytes};
use std::io::{self, Read};
use tokio::runtime::Handle;

/// Blocking [`Read`] over a streaming HTTP response body.
///
/// Chunks are pulled from the async response on demand through the runtime
/// handle, so the caller must not be running inside that runtime.
pub struct BodyReader {
    response: reqwest::Response,
    runtime: Handle,
    pending: Bytes,
    finished: bool,
}

impl BodyReader {
    pub fn new(response: reqwest::Response, runtime: Handle) -> Self {
        Self {
            response,
            runtime,
            pending: Bytes::new(),
            finished: false,
        }
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            if self.finished {
                return Ok(0);
            }
            match self.runtime.block_on(self.response.chunk()) {
                Ok(Some(chunk)) => self.pending = chunk,
                Ok(None) => self.finished = true,
                Err(e) => return Err(io::Error::other(e)),
            }
        }
        Ok(drain_into(&mut self.pending, buf))
    }
}

fn drain_into(pending: &mut Bytes, buf: &mut [u8]) -> usize {
    let n = buf.len().min(pending.len());
    buf[..n].copy_from_slice(&pending[..n]);
    pending.advance(n);
    n
}
