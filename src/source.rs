//! Payload sources.
//!
//! A source hands raw payloads to the run loop over an mpsc channel, so the
//! loop does not care whether they arrive from stdin, a socket or a test.

use crate::ingest::RawPayload;
use log::{debug, error};
use std::future::Future;
use std::io;
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Channel buffer size for raw payloads.
const PAYLOAD_CHANNEL_BUFFER_SIZE: usize = 100;

/// Source abstraction to enable deterministic unit tests without real I/O.
pub trait PayloadSource: Send + Sync {
    fn start(
        &self,
    ) -> Pin<Box<dyn Future<Output = io::Result<mpsc::Receiver<RawPayload>>> + Send + '_>>;
}

/// Reads one JSON payload per line from standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinSource;

impl PayloadSource for StdinSource {
    fn start(
        &self,
    ) -> Pin<Box<dyn Future<Output = io::Result<mpsc::Receiver<RawPayload>>> + Send + '_>> {
        Box::pin(async move { Ok(read_lines(tokio::io::stdin())) })
    }
}

/// Spawn a task forwarding every non-blank line of `reader` as a payload.
///
/// The channel closes at end of input, on a read error, or when the receiver
/// is dropped.
pub fn read_lines<R>(reader: R) -> mpsc::Receiver<RawPayload>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(PAYLOAD_CHANNEL_BUFFER_SIZE);

    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if tx.send(line.as_bytes().to_vec()).await.is_err() {
                        debug!("Payload receiver dropped, stopping reader");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read payload: {e}");
                    break;
                }
            }
        }
    });

    rx
}
