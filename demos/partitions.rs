use std::cmp;
use std::env;
use std::process;

use kafka_inspect::KafkaClient;

/// Prints the partitions of the given topics sorted by id together
/// with their leaders and replicas.
fn main() {
    env_logger::init();

    let cfg = match Config::from_cmdline() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = dump_partitions(cfg) {
        println!("{}", e);
        process::exit(1);
    }
}

fn dump_partitions(cfg: Config) -> Result<(), String> {
    let client = KafkaClient::connect(&cfg.brokers).map_err(|e| e.to_string())?;
    let topics = client.topic_metadata(&cfg.topics).map_err(|e| e.to_string())?;

    let topic_width = 2 + topics.iter().map(|t| t.name().len()).fold(5, cmp::max);
    if cfg.header {
        println!(
            "{1:0$} {2:>4} {3:>6} {4:>12} {5:>12}",
            topic_width, "topic", "p-id", "leader", "replicas", "isr"
        );
    }
    for t in &topics {
        if let Some(e) = t.error() {
            println!("{1:0$} - not available ({2:?})", topic_width, t.name(), e);
            continue;
        }
        let mut partitions: Vec<_> = t.partitions().iter().collect();
        partitions.sort_by_key(|p| p.id());
        for p in partitions {
            let leader = p
                .leader()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_owned());
            println!(
                "{1:0$} {2:>4} {3:>6} {4:>12} {5:>12}",
                topic_width,
                t.name(),
                p.id(),
                leader,
                format!("{:?}", p.replicas()),
                format!("{:?}", p.isr())
            );
        }
    }
    Ok(())
}

// --------------------------------------------------------------------

struct Config {
    brokers: Vec<String>,
    topics: Vec<String>,
    header: bool,
}

impl Config {
    fn from_cmdline() -> Result<Config, String> {
        let args: Vec<_> = env::args().collect();
        let mut opts = getopts::Options::new();
        opts.optflag("h", "help", "Print this help screen");
        opts.optflag("", "no-header", "Don't print headers");
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
            header: !m.opt_present("no-header"),
        })
    }
}
