use std::time::{Duration, Instant};

use kafka_inspect::{FetchError, FetchOffset, MetadataError};

use super::*;

#[test]
fn test_kafka_client_topic_names() {
    let client = new_ready_kafka_client();

    let topic_names: Vec<String> = client
        .topic_names()
        .unwrap()
        .into_iter()
        // don't count the consumer offsets internal topic
        .filter(|name| name != KAFKA_CONSUMER_OFFSETS_TOPIC_NAME)
        .collect();
    assert_eq!(vec![TEST_TOPIC_NAME.to_owned()], topic_names);
}

#[test]
fn test_kafka_client_topic_metadata() {
    let client = new_ready_kafka_client();

    let md = client.topic_metadata(&[TEST_TOPIC_NAME]).unwrap();
    assert_eq!(1, md.len());
    assert_eq!(TEST_TOPIC_NAME, md[0].name());
    assert!(md[0].error().is_none());

    let mut ids: Vec<i32> = md[0].partitions().iter().map(|p| p.id()).collect();
    ids.sort();
    assert_eq!(TEST_TOPIC_PARTITIONS.to_vec(), ids);
    for p in md[0].partitions() {
        let leader = p.leader().unwrap();
        assert!(client.brokers().iter().any(|b| b.id() == leader));
    }
}

#[test]
fn test_kafka_client_topic_metadata_invalid_name() {
    let client = new_ready_kafka_client();
    assert!(matches!(
        client.topic_metadata(&["not a topic"]),
        Err(MetadataError::InvalidTopicName(_))
    ));
}

#[test]
fn test_kafka_client_offset_range() {
    let client = new_ready_kafka_client();
    for &p in &TEST_TOPIC_PARTITIONS {
        let range = client.offset_range(TEST_TOPIC_NAME, p).unwrap();
        assert!(range.low <= range.high);
        assert_eq!(
            range.high,
            client.fetch_offset(TEST_TOPIC_NAME, p, FetchOffset::Latest).unwrap()
        );
    }
}

#[test]
fn test_kafka_client_fetch_range() {
    let client = new_ready_kafka_client();
    let p = TEST_TOPIC_PARTITIONS[0];
    let range = client.offset_range(TEST_TOPIC_NAME, p).unwrap();

    let count = (range.high - range.low).min(10) as usize;
    let msgs = client
        .fetch(TEST_TOPIC_NAME, p, range.low, count, Duration::from_secs(10))
        .unwrap();
    // ~ transactional markers occupy offsets without being delivered
    assert!(msgs.len() <= count);
    for w in msgs.windows(2) {
        assert!(w[0].offset < w[1].offset);
    }
    assert!(msgs.iter().all(|m| m.offset >= range.low && m.offset < range.high));
}

#[test]
fn test_kafka_client_fetch_at_high_watermark_times_out() {
    let client = new_ready_kafka_client();
    let p = TEST_TOPIC_PARTITIONS[1];
    let range = client.offset_range(TEST_TOPIC_NAME, p).unwrap();

    let timeout = Duration::from_millis(500);
    let start = Instant::now();
    let msgs = client
        .fetch(TEST_TOPIC_NAME, p, range.high, 1, timeout)
        .unwrap();
    assert!(start.elapsed() >= timeout);
    // ~ nobody else writes to the test topic
    assert!(msgs.is_empty());
}

#[test]
fn test_kafka_client_fetch_out_of_range() {
    let client = new_ready_kafka_client();
    let p = TEST_TOPIC_PARTITIONS[0];
    let range = client.offset_range(TEST_TOPIC_NAME, p).unwrap();
    assert!(matches!(
        client.fetch(TEST_TOPIC_NAME, p, range.high + 1, 1, Duration::from_secs(1)),
        Err(FetchError::OffsetOutOfRange { .. })
    ));
}

#[test]
fn test_kafka_client_list_groups() {
    let client = new_ready_kafka_client();
    let groups = client.list_groups().unwrap();
    for w in groups.windows(2) {
        assert!(w[0].group_id < w[1].group_id);
    }
}
