//! Queue Adapter boundary
//!
//! Workers see the queueing substrate only through [`QueueAdapter`]. Two
//! adapters ship with the library:
//! - [`MemoryQueue`]: named in-process queues backed by `tokio::sync::mpsc`
//! - [`LineQueue`] / [`StdioQueue`]: line-delimited JSON over a reader/writer
//!   pair, one message per line

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Split};
use tokio::sync::mpsc;
use tracing::debug;

/// Minimal contract a worker needs from the queueing substrate
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Declare a durable queue. Declaring an existing queue is a no-op.
    async fn declare_durable_queue(&self, name: &str) -> Result<()>;

    /// Wait for the next message on `queue`
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - next message body
    /// * `Ok(None)` - the inbound stream is closed, no more messages will arrive
    async fn receive(&self, queue: &str) -> Result<Option<Vec<u8>>>;

    /// Publish a message body to `queue`
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()>;
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

struct MemoryChannel {
    /// `None` once the queue has been closed
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: SharedReceiver,
}

/// In-process queues, addressed by name
#[derive(Default)]
pub struct MemoryQueue {
    queues: Mutex<HashMap<String, MemoryChannel>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close a queue: receivers drain what is buffered, then see `None`
    pub fn close(&self, name: &str) -> Result<()> {
        let mut queues = self.lock_queues()?;
        let channel = queues
            .get_mut(name)
            .ok_or_else(|| Error::Queue(format!("Queue not declared: {}", name)))?;
        channel.tx = None;
        Ok(())
    }

    /// Take every message currently buffered on `name` without waiting
    pub async fn drain(&self, name: &str) -> Result<Vec<Vec<u8>>> {
        let rx = self.receiver(name)?;
        let mut rx = rx.lock().await;
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        Ok(messages)
    }

    fn lock_queues(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryChannel>>> {
        self.queues
            .lock()
            .map_err(|_| Error::Queue("Queue registry lock poisoned".to_string()))
    }

    fn receiver(&self, name: &str) -> Result<SharedReceiver> {
        let queues = self.lock_queues()?;
        queues
            .get(name)
            .map(|channel| Arc::clone(&channel.rx))
            .ok_or_else(|| Error::Queue(format!("Queue not declared: {}", name)))
    }
}

#[async_trait]
impl QueueAdapter for MemoryQueue {
    async fn declare_durable_queue(&self, name: &str) -> Result<()> {
        let mut queues = self.lock_queues()?;
        queues.entry(name.to_string()).or_insert_with(|| {
            debug!(queue = name, "Declared in-memory queue");
            let (tx, rx) = mpsc::unbounded_channel();
            MemoryChannel {
                tx: Some(tx),
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            }
        });
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Vec<u8>>> {
        // The registry lock is released before awaiting
        let rx = self.receiver(queue)?;
        let mut rx = rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        let queues = self.lock_queues()?;
        let channel = queues
            .get(queue)
            .ok_or_else(|| Error::Queue(format!("Queue not declared: {}", queue)))?;
        let tx = channel
            .tx
            .as_ref()
            .ok_or_else(|| Error::Queue(format!("Queue closed: {}", queue)))?;
        tx.send(payload)
            .map_err(|_| Error::Queue(format!("Queue receiver dropped: {}", queue)))
    }
}

/// Line-delimited JSON adapter over any async reader/writer pair
///
/// Only the configured inbound queue can be received from; each non-blank
/// input line is one message, handed over as raw bytes (a trailing `\r` is
/// dropped, the encoding is left to the consumer). Published payloads are
/// written one per line, for any declared queue.
pub struct LineQueue<R, W> {
    inbound: String,
    declared: Mutex<HashSet<String>>,
    reader: tokio::sync::Mutex<Split<BufReader<R>>>,
    writer: tokio::sync::Mutex<W>,
}

/// [`LineQueue`] bound to the process stdin/stdout
pub type StdioQueue = LineQueue<tokio::io::Stdin, tokio::io::Stdout>;

impl<R, W> LineQueue<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inbound: &str, reader: R, writer: W) -> Self {
        Self {
            inbound: inbound.to_string(),
            declared: Mutex::new(HashSet::new()),
            reader: tokio::sync::Mutex::new(BufReader::new(reader).split(b'\n')),
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    /// Recover the writer, e.g. to inspect what was published
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    fn ensure_declared(&self, name: &str) -> Result<()> {
        let declared = self
            .declared
            .lock()
            .map_err(|_| Error::Queue("Queue registry lock poisoned".to_string()))?;
        if declared.contains(name) {
            Ok(())
        } else {
            Err(Error::Queue(format!("Queue not declared: {}", name)))
        }
    }
}

impl StdioQueue {
    /// Read requests for `inbound` from stdin, write reports to stdout
    pub fn stdio(inbound: &str) -> Self {
        Self::new(inbound, tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> QueueAdapter for LineQueue<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn declare_durable_queue(&self, name: &str) -> Result<()> {
        let mut declared = self
            .declared
            .lock()
            .map_err(|_| Error::Queue("Queue registry lock poisoned".to_string()))?;
        if declared.insert(name.to_string()) {
            debug!(queue = name, "Declared line-delimited queue");
        }
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_declared(queue)?;
        if queue != self.inbound {
            return Err(Error::Queue(format!(
                "Queue {} is not readable (inbound queue is {})",
                queue, self.inbound
            )));
        }

        let mut segments = self.reader.lock().await;
        while let Some(mut line) = segments.next_segment().await? {
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        self.ensure_declared(queue)?;
        if payload.contains(&b'\n') {
            return Err(Error::Queue(
                "Payload contains a newline and cannot be line-delimited".to_string(),
            ));
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(&payload).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
