//! A read cursor on a single partition: a dedicated connection to the
//! partition's leader and a worker thread streaming fetched messages
//! to the caller through a bounded channel.

use std::net::{Shutdown, TcpStream};
use std::result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, trace, warn};

use crate::error::{Error, FetchError, KafkaCode, Result};
use crate::protocol::fetch::FetchResponseParser;
use crate::protocol::{self, records::Message};

use super::network::KafkaConnection;
use super::{KafkaClient, __z_send_receive};

pub struct PartitionCursor {
    topic: String,
    partition: i32,
    rx: Option<Receiver<Result<Message>>>,
    stop: Arc<AtomicBool>,
    // a second handle onto the worker's socket to interrupt a
    // blocking read
    interrupt: Option<TcpStream>,
    worker: Option<JoinHandle<()>>,
}

impl PartitionCursor {
    /// Opens a cursor at `offset` which must lie within the offsets
    /// currently available in the partition. `capacity` bounds the
    /// number of messages buffered ahead of the caller.
    pub fn open(
        client: &KafkaClient,
        topic: &str,
        partition: i32,
        offset: i64,
        capacity: usize,
    ) -> result::Result<PartitionCursor, FetchError> {
        let host = client.leader_of(topic, partition)?;
        let mut conn = client.conn_pool.config().new_conn(&host)?;

        let range = client.list_offset_range(&mut conn, topic, partition)?;
        if offset < range.low || offset > range.high {
            let _ = conn.shutdown();
            return Err(FetchError::OffsetOutOfRange {
                offset,
                low: range.low,
                high: range.high,
            });
        }

        let interrupt = conn.try_clone_stream()?;
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let config = &client.config;
        let worker = FetchWorker {
            conn,
            topic: topic.to_owned(),
            partition,
            offset,
            client_id: config.client_id.clone(),
            max_wait_time: config.fetch_max_wait_time,
            min_bytes: config.fetch_min_bytes,
            max_bytes: config.fetch_max_bytes_per_partition,
            default_max_bytes: config.fetch_max_bytes_per_partition,
            retry_max_bytes_limit: config.retry_max_bytes_limit,
            parser: FetchResponseParser {
                validate_crc: config.fetch_crc_validation,
            },
            correlation: client.next_correlation_id(),
            stop: Arc::clone(&stop),
        };
        debug!("opened cursor on {}:{} at offset {} ({:?})", topic, partition, offset, range);
        let worker = thread::Builder::new()
            .name(format!("fetch-{}-{}", topic, partition))
            .spawn(move || worker.run(tx))
            .map_err(Error::from)?;

        Ok(PartitionCursor {
            topic: topic.to_owned(),
            partition,
            rx: Some(rx),
            stop,
            interrupt: Some(interrupt),
            worker: Some(worker),
        })
    }

    /// Waits for the next message until `deadline` (`None` waits
    /// indefinitely.) Delivers `Ok(None)` if the deadline passed or
    /// the worker stopped without reporting an error.
    pub fn next_before(&self, deadline: Option<Instant>) -> Result<Option<Message>> {
        let rx = match self.rx {
            Some(ref rx) => rx,
            None => return Ok(None),
        };
        let r = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                rx.recv_timeout(deadline - now)
            }
        };
        match r {
            Ok(Ok(msg)) => Ok(Some(msg)),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("fetch worker for {}:{} has finished", self.topic, self.partition);
                Ok(None)
            }
        }
    }
}

impl Drop for PartitionCursor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // ~ unblocks a worker waiting for space in the channel
        drop(self.rx.take());
        // ~ unblocks a worker waiting for a response
        if let Some(s) = self.interrupt.take() {
            if let Err(e) = s.shutdown(Shutdown::Both) {
                if e.kind() != std::io::ErrorKind::NotConnected {
                    warn!(
                        "failed to shut down connection of cursor {}:{}: {}",
                        self.topic, self.partition, e
                    );
                }
            }
        }
        if let Some(w) = self.worker.take() {
            if w.join().is_err() {
                warn!("fetch worker for {}:{} panicked", self.topic, self.partition);
            }
        }
        debug!("released cursor on {}:{}", self.topic, self.partition);
    }
}

// --------------------------------------------------------------------

struct FetchWorker {
    conn: KafkaConnection,
    topic: String,
    partition: i32,
    // the next offset to request
    offset: i64,
    client_id: String,
    max_wait_time: i32,
    min_bytes: i32,
    max_bytes: i32,
    default_max_bytes: i32,
    retry_max_bytes_limit: i32,
    parser: FetchResponseParser,
    correlation: i32,
    stop: Arc<AtomicBool>,
}

impl FetchWorker {
    fn run(mut self, tx: SyncSender<Result<Message>>) {
        if let Err(e) = self.fetch_loop(&tx) {
            if self.stopped() {
                trace!("fetch worker for {}:{} interrupted: {}", self.topic, self.partition, e);
            } else {
                // ~ the receiving side logs the error
                let _ = tx.send(Err(e));
            }
        }
        let _ = self.conn.shutdown();
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn fetch_loop(&mut self, tx: &SyncSender<Result<Message>>) -> Result<()> {
        while !self.stopped() {
            self.correlation = self.correlation.wrapping_add(1) & 0x3fff_ffff;
            let mut req = protocol::FetchRequest::new(
                self.correlation,
                &self.client_id,
                self.max_wait_time,
                self.min_bytes,
            );
            req.add(&self.topic, self.partition, self.offset, self.max_bytes);
            let mut resp = __z_send_receive(&mut self.conn, req, &self.parser)?;

            let p = resp
                .take_partition(&self.topic, self.partition)
                .ok_or(Error::Kafka(KafkaCode::UnknownTopicOrPartition))?;
            if let Some(code) = p.error {
                return Err(Error::TopicPartitionError {
                    topic_name: self.topic.clone(),
                    partition_id: self.partition,
                    error_code: code,
                });
            }

            match p.records.next_offset {
                Some(next_offset) => {
                    if self.max_bytes != self.default_max_bytes {
                        debug!(
                            "reset max_bytes for {}:{} from {} to {}",
                            self.topic, self.partition, self.max_bytes, self.default_max_bytes
                        );
                        self.max_bytes = self.default_max_bytes;
                    }
                    for msg in p.records.messages {
                        // ~ brokers deliver whole batches which may
                        // start before the requested offset
                        if msg.offset < self.offset {
                            continue;
                        }
                        if tx.send(Ok(msg)).is_err() {
                            // ~ the cursor is gone
                            return Ok(());
                        }
                    }
                    if next_offset > self.offset {
                        self.offset = next_offset;
                    }
                }
                None if p.has_data => self.increase_max_bytes()?,
                None => {
                    trace!(
                        "no new data for {}:{} at offset {} (high watermark: {})",
                        self.topic,
                        self.partition,
                        self.offset,
                        p.high_watermark
                    );
                }
            }
        }
        Ok(())
    }

    // ~ the response carried data but not a single complete batch
    fn increase_max_bytes(&mut self) -> Result<()> {
        if self.max_bytes >= self.retry_max_bytes_limit {
            return Err(Error::TopicPartitionError {
                topic_name: self.topic.clone(),
                partition_id: self.partition,
                error_code: KafkaCode::MessageSizeTooLarge,
            });
        }
        let prev_max_bytes = self.max_bytes;
        self.max_bytes = prev_max_bytes
            .saturating_add(prev_max_bytes)
            .min(self.retry_max_bytes_limit);
        debug!(
            "increased max_bytes for {}:{} from {} to {}",
            self.topic, self.partition, prev_max_bytes, self.max_bytes
        );
        Ok(())
    }
}
