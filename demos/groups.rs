use std::env;
use std::process;

use kafka_inspect::KafkaClient;

/// Lists the consumer groups known to a cluster.
fn main() {
    env_logger::init();

    let args: Vec<_> = env::args().collect();
    let mut opts = getopts::Options::new();
    opts.optflag("h", "help", "Print this help screen");
    opts.optopt("", "brokers", "Specify kafka brokers (comma separated)", "HOSTS");
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

    if let Err(e) = list_groups(&brokers) {
        println!("{}", e);
        process::exit(1);
    }
}

fn list_groups(brokers: &[String]) -> Result<(), String> {
    let client = KafkaClient::connect(brokers).map_err(|e| e.to_string())?;
    for g in client.list_groups().map_err(|e| e.to_string())? {
        let proto = if g.protocol_type.is_empty() { "-" } else { g.protocol_type.as_str() };
        println!("{:40} {}", g.group_id, proto);
    }
    Ok(())
}
