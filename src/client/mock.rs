//! An in-process stand-in for a kafka cluster answering Metadata v1,
//! ListOffsets v1, Fetch v4 and ListGroups v0 over real TCP
//! connections.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::codecs::ToByte;
use crate::error::{KafkaCode, Result};
use crate::protocol::records::testing::{batch, rec};
use crate::protocol::zreader::ZReader;
use crate::protocol::{API_KEY_FETCH, API_KEY_LIST_GROUPS, API_KEY_METADATA, API_KEY_OFFSET};

#[derive(Default)]
struct Partition {
    leader: i32,
    log_start: i64,
    values: Vec<String>,
}

impl Partition {
    fn high(&self) -> i64 {
        self.log_start + self.values.len() as i64
    }
}

#[derive(Default)]
struct ClusterData {
    // (node_id, port)
    brokers: Vec<(i32, u16)>,
    topics: BTreeMap<String, Vec<Partition>>,
    groups: BTreeMap<i32, Vec<(String, String)>>,
    list_groups_error: i16,
}

struct Listener {
    node_id: i32,
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
}

/// A cluster of mock brokers sharing their data.
pub struct MockCluster {
    data: Arc<Mutex<ClusterData>>,
    listeners: Vec<Listener>,
    stop: Arc<AtomicBool>,
}

impl MockCluster {
    /// Starts `n` brokers with node ids `1..=n`.
    pub fn start(n: i32) -> MockCluster {
        let data = Arc::new(Mutex::new(ClusterData::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let mut listeners = Vec::new();
        for node_id in 1..=n {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = l.local_addr().unwrap();
            data.lock().unwrap().brokers.push((node_id, addr.port()));
            let accepted = Arc::new(AtomicUsize::new(0));
            {
                let data = Arc::clone(&data);
                let stop = Arc::clone(&stop);
                let accepted = Arc::clone(&accepted);
                thread::spawn(move || accept_loop(l, node_id, data, stop, accepted));
            }
            listeners.push(Listener {
                node_id,
                addr,
                accepted,
            });
        }
        MockCluster {
            data,
            listeners,
            stop,
        }
    }

    /// The "host:port" of the first broker.
    pub fn bootstrap(&self) -> String {
        self.listeners[0].addr.to_string()
    }

    /// The number of connections accepted so far by all brokers.
    pub fn accepted(&self) -> usize {
        self.listeners
            .iter()
            .map(|l| l.accepted.load(Ordering::SeqCst))
            .sum()
    }

    /// Adds a topic whose partitions are all led by the first broker.
    pub fn add_topic(&self, name: &str, partitions: usize) {
        let leader = self.listeners[0].node_id;
        let ps = (0..partitions)
            .map(|_| Partition {
                leader,
                ..Default::default()
            })
            .collect();
        self.data.lock().unwrap().topics.insert(name.to_owned(), ps);
    }

    pub fn set_leader(&self, topic: &str, partition: usize, leader: i32) {
        self.data.lock().unwrap().topics.get_mut(topic).unwrap()[partition].leader = leader;
    }

    pub fn set_log_start(&self, topic: &str, partition: usize, log_start: i64) {
        self.data.lock().unwrap().topics.get_mut(topic).unwrap()[partition].log_start = log_start;
    }

    pub fn append(&self, topic: &str, partition: usize, values: &[&str]) {
        let mut data = self.data.lock().unwrap();
        let p = &mut data.topics.get_mut(topic).unwrap()[partition];
        p.values.extend(values.iter().map(|v| v.to_string()));
    }

    pub fn add_group(&self, node_id: i32, group_id: &str, protocol_type: &str) {
        self.data
            .lock()
            .unwrap()
            .groups
            .entry(node_id)
            .or_default()
            .push((group_id.to_owned(), protocol_type.to_owned()));
    }

    pub fn fail_list_groups(&self, code: KafkaCode) {
        self.data.lock().unwrap().list_groups_error = code as i16;
    }
}

impl Drop for MockCluster {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for l in &self.listeners {
            // ~ wake up the accept loop
            let _ = TcpStream::connect(l.addr);
        }
    }
}

fn accept_loop(
    l: TcpListener,
    node_id: i32,
    data: Arc<Mutex<ClusterData>>,
    stop: Arc<AtomicBool>,
    accepted: Arc<AtomicUsize>,
) {
    for stream in l.incoming() {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let Ok(stream) = stream else { continue };
        accepted.fetch_add(1, Ordering::SeqCst);
        let data = Arc::clone(&data);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let _ = serve(stream, node_id, &data, &stop);
        });
    }
}

fn serve(
    mut stream: TcpStream,
    node_id: i32,
    data: &Mutex<ClusterData>,
    stop: &AtomicBool,
) -> Result<()> {
    loop {
        let mut size = [0u8; 4];
        stream.read_exact(&mut size)?;
        let mut req = vec![0u8; i32::from_be_bytes(size) as usize];
        stream.read_exact(&mut req)?;

        let mut r = ZReader::new(&req);
        let api_key = r.read_i16()?;
        let _api_version = r.read_i16()?;
        let correlation = r.read_i32()?;
        let _client_id = r.read_str()?;

        let mut out = Vec::new();
        correlation.encode(&mut out)?;
        match api_key {
            API_KEY_METADATA => metadata(&mut r, data, &mut out)?,
            API_KEY_OFFSET => list_offsets(&mut r, node_id, data, &mut out)?,
            API_KEY_FETCH => fetch(&mut r, node_id, data, stop, &mut out)?,
            API_KEY_LIST_GROUPS => list_groups(node_id, data, &mut out)?,
            _ => return Ok(()),
        }

        let mut frame = (out.len() as i32).to_be_bytes().to_vec();
        frame.extend(out);
        stream.write_all(&frame)?;
    }
}

fn metadata(r: &mut ZReader<'_>, data: &Mutex<ClusterData>, out: &mut Vec<u8>) -> Result<()> {
    let n = r.read_i32()?;
    let mut requested = Vec::new();
    for _ in 0..n.max(0) {
        requested.push(r.read_str()?.to_owned());
    }
    let data = data.lock().unwrap();
    if n < 0 {
        requested = data.topics.keys().cloned().collect();
    }

    (data.brokers.len() as i32).encode(out)?;
    for &(node_id, port) in &data.brokers {
        node_id.encode(out)?;
        "127.0.0.1".encode(out)?;
        i32::from(port).encode(out)?;
        (-1i16).encode(out)?; // null rack
    }
    data.brokers[0].0.encode(out)?; // controller

    (requested.len() as i32).encode(out)?;
    for t in &requested {
        match data.topics.get(t) {
            None => {
                (KafkaCode::UnknownTopicOrPartition as i16).encode(out)?;
                t.encode(out)?;
                0i8.encode(out)?;
                0i32.encode(out)?;
            }
            Some(ps) => {
                0i16.encode(out)?;
                t.encode(out)?;
                0i8.encode(out)?;
                (ps.len() as i32).encode(out)?;
                // ~ report partitions in descending order
                for (id, p) in ps.iter().enumerate().rev() {
                    let error = if p.leader < 0 {
                        KafkaCode::LeaderNotAvailable as i16
                    } else {
                        0
                    };
                    error.encode(out)?;
                    (id as i32).encode(out)?;
                    p.leader.encode(out)?;
                    vec![p.leader.max(1)].encode(out)?;
                    vec![p.leader.max(1)].encode(out)?;
                }
            }
        }
    }
    Ok(())
}

fn list_offsets(
    r: &mut ZReader<'_>,
    node_id: i32,
    data: &Mutex<ClusterData>,
    out: &mut Vec<u8>,
) -> Result<()> {
    let _replica = r.read_i32()?;
    let data = data.lock().unwrap();
    let n_topics = r.read_array_len()?;
    (n_topics as i32).encode(out)?;
    for _ in 0..n_topics {
        let topic = r.read_str()?;
        topic.encode(out)?;
        let n_partitions = r.read_array_len()?;
        (n_partitions as i32).encode(out)?;
        for _ in 0..n_partitions {
            let partition = r.read_i32()?;
            let time = r.read_i64()?;
            let p = data
                .topics
                .get(topic)
                .and_then(|ps| ps.get(partition as usize));
            let (error, offset) = match p {
                None => (KafkaCode::UnknownTopicOrPartition as i16, -1),
                Some(p) if p.leader != node_id => (KafkaCode::NotLeaderForPartition as i16, -1),
                Some(p) if time == -2 => (0, p.log_start),
                Some(p) => (0, p.high()),
            };
            partition.encode(out)?;
            error.encode(out)?;
            (-1i64).encode(out)?;
            offset.encode(out)?;
        }
    }
    Ok(())
}

fn fetch(
    r: &mut ZReader<'_>,
    node_id: i32,
    data: &Mutex<ClusterData>,
    stop: &AtomicBool,
    out: &mut Vec<u8>,
) -> Result<()> {
    let _replica = r.read_i32()?;
    let max_wait = Duration::from_millis(r.read_i32()?.max(0) as u64);
    let _min_bytes = r.read_i32()?;
    let _max_bytes = r.read_i32()?;
    let _isolation = r.read_i8()?;
    let _n_topics = r.read_i32()?;
    let topic = r.read_str()?;
    let _n_partitions = r.read_i32()?;
    let partition = r.read_i32()?;
    let offset = r.read_i64()?;
    let _partition_max_bytes = r.read_i32()?;

    // ~ long poll until there is data to deliver
    let deadline = Instant::now() + max_wait;
    let (error, high, records) = loop {
        let resp = {
            let data = data.lock().unwrap();
            match data.topics.get(topic).and_then(|ps| ps.get(partition as usize)) {
                None => Some((KafkaCode::UnknownTopicOrPartition as i16, -1, Vec::new())),
                Some(p) if p.leader != node_id => {
                    Some((KafkaCode::NotLeaderForPartition as i16, -1, Vec::new()))
                }
                Some(p) if offset < p.log_start || offset > p.high() => {
                    Some((KafkaCode::OffsetOutOfRange as i16, p.high(), Vec::new()))
                }
                Some(p) if offset < p.high() => {
                    // ~ one batch per message starting with the
                    // requested one
                    let mut records = Vec::new();
                    for (i, v) in p.values.iter().enumerate() {
                        let o = p.log_start + i as i64;
                        if o >= offset {
                            records.extend(batch(o, 1_000 + o, 0, &[rec(v).key(&o.to_string())]));
                        }
                    }
                    Some((0, p.high(), records))
                }
                Some(p) if Instant::now() >= deadline => Some((0, p.high(), Vec::new())),
                Some(_) => None,
            }
        };
        match resp {
            Some(resp) => break resp,
            None if stop.load(Ordering::SeqCst) => return Ok(()),
            None => thread::sleep(Duration::from_millis(5)),
        }
    };

    0i32.encode(out)?; // throttle time
    1i32.encode(out)?;
    topic.encode(out)?;
    1i32.encode(out)?;
    partition.encode(out)?;
    error.encode(out)?;
    high.encode(out)?;
    high.encode(out)?;
    (-1i32).encode(out)?; // no aborted transactions
    (records.len() as i32).encode(out)?;
    out.extend(records);
    Ok(())
}

fn list_groups(node_id: i32, data: &Mutex<ClusterData>, out: &mut Vec<u8>) -> Result<()> {
    let data = data.lock().unwrap();
    data.list_groups_error.encode(out)?;
    let groups = data.groups.get(&node_id).cloned().unwrap_or_default();
    (groups.len() as i32).encode(out)?;
    for (id, protocol_type) in groups {
        id.encode(out)?;
        protocol_type.encode(out)?;
    }
    Ok(())
}
