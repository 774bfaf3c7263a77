//! The FLAP/SNAC framing layer over a live TCP connection: buffers partial
//! reads until a whole FLAP frame is available, assigns outgoing sequence
//! numbers, and feeds outgoing SNACs through the rate manager.

use crate::error::{Error, Result};
use crate::rate::RateManager;
use bytes::BytesMut;
use icq_wire::{FlapBuffer, SnacBuffer};
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How much to grow the read buffer by when a partial frame needs more data.
const READ_CHUNK: usize = 4096;

/// A connected OSCAR socket: FLAP framing plus outbound rate limiting.
pub struct OscarSocket {
    stream: TcpStream,
    read_buf: BytesMut,
    out_sequence: u16,
    rates: RateManager,
}

impl OscarSocket {
    /// Wraps an already-connected stream.
    pub fn new(stream: TcpStream) -> OscarSocket {
        OscarSocket { stream, read_buf: BytesMut::new(), out_sequence: 0, rates: RateManager::new() }
    }

    /// The socket's rate manager, for feeding server rate updates into and
    /// draining queued sends from.
    pub fn rates(&mut self) -> &mut RateManager {
        &mut self.rates
    }

    /// Reads from the socket until one complete FLAP frame is available,
    /// then returns it.
    pub async fn read_frame(&mut self) -> Result<FlapBuffer> {
        loop {
            if let Some((frame, consumed)) = FlapBuffer::try_decode(&self.read_buf)? {
                let _ = self.read_buf.split_to(consumed);
                return Ok(frame);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| Error::Transport(format!("reading from socket: {e}")))?;
            if n == 0 {
                return Err(Error::Transport("connection closed by peer".into()));
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Writes a FLAP frame, stamping it with the next outgoing sequence
    /// number.
    pub async fn send_flap(&mut self, mut flap: FlapBuffer) -> Result<()> {
        self.out_sequence = self.out_sequence.wrapping_add(1);
        flap.set_sequence(self.out_sequence);
        self.stream
            .write_all(&flap.to_bytes())
            .await
            .map_err(|e| Error::Transport(format!("writing to socket: {e}")))
    }

    /// Sends a SNAC, queuing it with the rate manager if its governing
    /// class is over its safety margin. Queued SNACs are drained by the
    /// caller via [`OscarSocket::drain_rate_queue`] once their class's
    /// timer fires.
    pub async fn send_snac(&mut self, snac: SnacBuffer) -> Result<()> {
        match self.rates.dispatch(snac, Instant::now()) {
            Some(ready) => self.send_flap(ready.to_flap()).await,
            None => Ok(()),
        }
    }

    /// Sends a SNAC immediately, bypassing rate-class bookkeeping. Used
    /// during login, before the server has announced any rate classes.
    pub async fn send_snac_now(&mut self, snac: SnacBuffer) -> Result<()> {
        self.send_flap(snac.to_flap()).await
    }

    /// Flushes every SNAC waiting in every rate class's queue that can now
    /// be sent, one class's oldest entry at a time.
    pub async fn drain_rate_queue(&mut self) -> Result<()> {
        loop {
            let mut sent_any = false;
            let class_ids: Vec<u16> = self.rates.classes().iter().map(|c| c.id()).collect();
            for id in class_ids {
                let now = Instant::now();
                let Some(class) = self.rates.find_class_by_id(id) else { continue };
                if class.queued_len() == 0 || !class.can_send_now(now) {
                    continue;
                }
                if let Some(snac) = class.dequeue() {
                    class.update_rate_info(now);
                    self.send_flap(snac.to_flap()).await?;
                    sent_any = true;
                }
            }
            if !sent_any {
                break;
            }
        }
        Ok(())
    }
}
