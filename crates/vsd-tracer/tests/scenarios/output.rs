use test_log::test;
use vsd_tracer::supervisor::{ChannelMode, RunConfig};

use crate::common::client::Record;
use crate::common::mock::{Out, Step};
use crate::common::{ROOT, run_script};

fn wrapped(mut steps: Vec<Step>) -> Vec<Step> {
    steps.insert(
        0,
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
    );
    steps.push(Step::Exited { pid: ROOT, code: 0 });
    steps
}

#[test(tokio::test)]
async fn merged_channels_share_one_pipe() {
    let script = wrapped(vec![
        Step::Output(Out::Stdout, b"out\n".to_vec()),
        Step::Output(Out::Stderr, b"err\n".to_vec()),
    ]);

    let (_, client, journal) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.stdout(), "out\nerr\n");
    assert_eq!(client.stderr(), "");

    let journal = journal.lock();
    assert_eq!(journal.pipes_created, 1);
    assert!(journal.launched.as_ref().unwrap().merged);
}

#[test(tokio::test)]
async fn separate_channels_are_reported_apart() {
    let script = wrapped(vec![
        Step::Output(Out::Stdout, b"out\n".to_vec()),
        Step::Output(Out::Stderr, b"err\n".to_vec()),
    ]);

    let config = RunConfig {
        channel_mode: ChannelMode::Separate,
        ..RunConfig::default()
    };

    let (_, client, journal) = run_script(script, config).await;

    assert_eq!(client.stdout(), "out\n");
    assert_eq!(client.stderr(), "err\n");

    let journal = journal.lock();
    assert_eq!(journal.pipes_created, 2);
    assert!(!journal.launched.as_ref().unwrap().merged);
}

#[test(tokio::test)]
async fn sequence_split_across_reads_is_decoded_once() {
    let script = wrapped(vec![
        Step::Output(Out::Stdout, b"caf\xc3".to_vec()),
        Step::Timeout,
        Step::Output(Out::Stdout, b"\xa9\n".to_vec()),
    ]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.stdout(), "café\n");
}

#[test(tokio::test)]
async fn incomplete_sequence_is_flushed_at_end() {
    let script = wrapped(vec![Step::Output(Out::Stdout, b"end\xc3".to_vec())]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.stdout(), "end\u{FFFD}");
}

#[test(tokio::test)]
async fn output_is_delivered_before_exit() {
    let script = wrapped(vec![Step::Output(Out::Stdout, b"last words".to_vec())]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    let records = client.records();
    let output = records
        .iter()
        .position(|record| matches!(record, Record::Stdout(_)))
        .unwrap();
    let stopped = records
        .iter()
        .position(|record| matches!(record, Record::Stopped { .. }))
        .unwrap();

    assert!(output < stopped);
}

#[test(tokio::test)]
async fn debug_strings_keep_whitespace() {
    let script = wrapped(vec![
        Step::narrow_string(ROOT, "narrow line \n"),
        Step::wide_string(ROOT, "wide èéøÞǽлљΣæča\n"),
    ]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(
        client.debug_strings(),
        [
            (ROOT, "narrow line \n".to_owned()),
            (ROOT, "wide èéøÞǽлљΣæča\n".to_owned()),
        ]
    );
}

#[test(tokio::test)]
async fn wide_string_length_in_bytes_is_tolerated() {
    let text: Vec<u8> = "bytes\0"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();

    let script = wrapped(vec![Step::DebugString {
        pid: ROOT,
        len: text.len() as u32,
        bytes: text,
        wide: true,
    }]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.debug_strings(), [(ROOT, "bytes".to_owned())]);
}

#[test(tokio::test)]
async fn unreadable_debug_string_is_skipped() {
    let script = wrapped(vec![
        Step::DebugString {
            pid: ROOT,
            len: 64,
            bytes: b"short\0".to_vec(),
            wide: false,
        },
        Step::narrow_string(ROOT, "readable"),
    ]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.debug_strings(), [(ROOT, "readable".to_owned())]);
}

#[test(tokio::test)]
async fn empty_debug_strings_are_not_forwarded() {
    let script = wrapped(vec![
        Step::DebugString {
            pid: ROOT,
            len: 0,
            bytes: Vec::new(),
            wide: false,
        },
        Step::narrow_string(ROOT, ""),
        Step::wide_string(ROOT, ""),
        Step::narrow_string(ROOT, "after"),
    ]);

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.debug_strings(), [(ROOT, "after".to_owned())]);
}

#[test(tokio::test)]
async fn narrow_text_follows_configured_encoding() {
    let script = wrapped(vec![
        Step::DebugString {
            pid: ROOT,
            len: 5,
            bytes: b"caf\xe9\0".to_vec(),
            wide: false,
        },
        Step::Output(Out::Stdout, b"na\xefve\r\n".to_vec()),
    ]);

    let config = RunConfig {
        text_encoding: Some(encoding_rs::WINDOWS_1252),
        ..RunConfig::default()
    };

    let (_, client, _) = run_script(script, config).await;

    assert_eq!(client.debug_strings(), [(ROOT, "café".to_owned())]);
    assert_eq!(client.stdout(), "naïve\r\n");
}
