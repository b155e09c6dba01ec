use std::env;
use std::process;

use kafka_inspect::KafkaClient;

/// Lists the names of all topics of a cluster, one per line.
fn main() {
    env_logger::init();

    let args: Vec<_> = env::args().collect();
    let mut opts = getopts::Options::new();
    opts.optflag("h", "help", "Print this help screen");
    opts.optopt("", "brokers", "Specify kafka brokers (comma separated)", "HOSTS");
    opts.optflag("", "no-internal", "Don't list internal topics");
    let m = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            println!("{}", e);
            process::exit(1);
        }
    };
    if m.opt_present("help") {
        println!("{}", opts.usage(&format!("{} [options]", args[0])));
        return;
    }
    let brokers: Vec<String> = m
        .opt_str("brokers")
        .unwrap_or_else(|| "localhost:9092".to_owned())
        .split(',')
        .map(|s| s.trim().to_owned())
        .collect();

    if let Err(e) = list_topics(&brokers, m.opt_present("no-internal")) {
        println!("{}", e);
        process::exit(1);
    }
}

fn list_topics(brokers: &[String], skip_internal: bool) -> Result<(), String> {
    let client = KafkaClient::connect(brokers).map_err(|e| e.to_string())?;
    if skip_internal {
        for t in client.topic_metadata::<&str>(&[]).map_err(|e| e.to_string())? {
            if !t.is_internal() {
                println!("{}", t.name());
            }
        }
    } else {
        for name in client.topic_names().map_err(|e| e.to_string())? {
            println!("{}", name);
        }
    }
    Ok(())
}
