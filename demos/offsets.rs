use std::cmp;
use std::env;
use std::process;

use kafka_inspect::KafkaClient;

/// Prints the earliest and latest offsets of every partition of the
/// given topics.
fn main() {
    env_logger::init();

    let cfg = match Config::from_cmdline() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = dump_offsets(cfg) {
        println!("{}", e);
        process::exit(1);
    }
}

fn dump_offsets(cfg: Config) -> Result<(), String> {
    let client = KafkaClient::connect(&cfg.brokers).map_err(|e| e.to_string())?;
    let topics = client.topic_metadata(&cfg.topics).map_err(|e| e.to_string())?;

    let topic_width = 2 + topics.iter().map(|t| t.name().len()).fold(5, cmp::max);
    println!(
        "{1:0$} {2:>4} {3:>12} {4:>12} {5:>12}",
        topic_width, "topic", "p-id", "earliest", "latest", "(size)"
    );
    for t in &topics {
        let mut ids: Vec<i32> = t.partitions().iter().map(|p| p.id()).collect();
        ids.sort();
        for id in ids {
            match client.offset_range(t.name(), id) {
                Ok(r) => println!(
                    "{1:0$} {2:>4} {3:>12} {4:>12} {5:>12}",
                    topic_width,
                    t.name(),
                    id,
                    r.low,
                    r.high,
                    format!("({})", r.high - r.low)
                ),
                Err(e) => println!("{1:0$} {2:>4} - {3}", topic_width, t.name(), id, e),
            }
        }
    }
    Ok(())
}

// --------------------------------------------------------------------

struct Config {
    brokers: Vec<String>,
    topics: Vec<String>,
}

impl Config {
    fn from_cmdline() -> Result<Config, String> {
        let args: Vec<_> = env::args().collect();
        let mut opts = getopts::Options::new();
        opts.optflag("h", "help", "Print this help screen");
        opts.optopt("", "brokers", "Specify kafka brokers (comma separated)", "HOSTS");
        opts.optopt("", "topics", "Specify topics (comma separated)", "NAMES");
        let m = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(e) => return Err(e.to_string()),
        };
        if m.opt_present("help") {
            let brief = format!("{} [options]", &args[0]);
            return Err(opts.usage(&brief));
        }
        Ok(Config {
            brokers: m
                .opt_str("brokers")
                .unwrap_or_else(|| "localhost:9092".to_owned())
                .split(',')
                .map(|s| s.trim().to_owned())
                .collect(),
            topics: match m.opt_str("topics") {
                None => Vec::new(),
                Some(s) => s.split(',').map(|s| s.trim().to_owned()).collect(),
            },
        })
    }
}
