use std::env;
use std::process;
use std::str;
use std::time::Duration;

use kafka_inspect::{FetchOffset, KafkaClient};

/// Prints a bounded number of messages of a partition starting at a
/// given offset (or at the earliest one.)
fn main() {
    env_logger::init();

    let cfg = match Config::from_cmdline() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = browse(cfg) {
        println!("{}", e);
        process::exit(1);
    }
}

fn browse(cfg: Config) -> Result<(), String> {
    let client = KafkaClient::connect(&cfg.brokers).map_err(|e| e.to_string())?;
    let offset = match cfg.offset {
        Some(offset) => offset,
        None => client
            .fetch_offset(&cfg.topic, cfg.partition, FetchOffset::Earliest)
            .map_err(|e| e.to_string())?,
    };

    let msgs = client
        .fetch(&cfg.topic, cfg.partition, offset, cfg.count, cfg.timeout)
        .map_err(|e| e.to_string())?;
    for m in &msgs {
        println!(
            "{}:{}@{} key={} value={}",
            cfg.topic,
            cfg.partition,
            m.offset,
            m.key.as_deref().map(lossy).unwrap_or_else(|| "-".to_owned()),
            lossy(&m.value)
        );
        for h in &m.headers {
            println!(
                "    {}={}",
                h.key,
                h.value.as_deref().map(lossy).unwrap_or_else(|| "-".to_owned())
            );
        }
    }
    if msgs.len() < cfg.count {
        println!("({} messages within {:?})", msgs.len(), cfg.timeout);
    }
    Ok(())
}

fn lossy(bs: &[u8]) -> String {
    match str::from_utf8(bs) {
        Ok(s) => s.to_owned(),
        Err(_) => format!("{:?}", bs),
    }
}

// --------------------------------------------------------------------

struct Config {
    brokers: Vec<String>,
    topic: String,
    partition: i32,
    offset: Option<i64>,
    count: usize,
    timeout: Duration,
}

impl Config {
    fn from_cmdline() -> Result<Config, String> {
        let args: Vec<_> = env::args().collect();
        let mut opts = getopts::Options::new();
        opts.optflag("h", "help", "Print this help screen");
        opts.optopt("", "brokers", "Specify kafka brokers (comma separated)", "HOSTS");
        opts.optopt("", "topic", "Specify the topic to read from", "NAME");
        opts.optopt("", "partition", "Specify the partition (default: 0)", "ID");
        opts.optopt("", "offset", "Start at this offset (default: earliest)", "OFFSET");
        opts.optopt("", "count", "Read at most this many messages (default: 10)", "N");
        opts.optopt("", "timeout", "Give up after this many millis (default: 5000)", "MILLIS");
        let m = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(e) => return Err(e.to_string()),
        };
        if m.opt_present("help") {
            let brief = format!("{} [options]", &args[0]);
            return Err(opts.usage(&brief));
        }
        let topic = m
            .opt_str("topic")
            .ok_or_else(|| "Missing --topic".to_owned())?;
        Ok(Config {
            brokers: m
                .opt_str("brokers")
                .unwrap_or_else(|| "localhost:9092".to_owned())
                .split(',')
                .map(|s| s.trim().to_owned())
                .collect(),
            topic,
            partition: m
                .opt_get_default::<i32>("partition", 0)
                .map_err(|e| e.to_string())?,
            offset: m.opt_get::<i64>("offset").map_err(|e| e.to_string())?,
            count: m.opt_get_default::<usize>("count", 10).map_err(|e| e.to_string())?,
            timeout: Duration::from_millis(
                m.opt_get_default::<u64>("timeout", 5_000).map_err(|e| e.to_string())?,
            ),
        })
    }
}
