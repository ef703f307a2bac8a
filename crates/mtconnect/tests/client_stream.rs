// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::too_many_lines)] // Scripted scenarios
#![allow(clippy::match_wildcard_for_single_variants)] // Test patterns

//! Streaming client scenarios against a scripted agent
//!
//! Each test scripts the agent's answers to probe/current/sample and checks
//! the events and requests the client produces.

mod common;

use common::*;
use mtconnect::client::ClientStats;
use mtconnect::model::{ErrorCode, StreamsDocument};
use mtconnect::{ClientConfig, ClientEvent, ClientHandler, ClientState, MTConnectClient, SampleMode};
use std::net::TcpListener as StdListener;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(10);

fn config(url: String) -> ClientConfig {
    ClientConfig::new(url)
        .interval(Duration::from_millis(20))
        .retry_interval(Duration::from_millis(50))
}

/// Poll `cond` until it holds. Panics after `TIMEOUT`.
fn eventually<F: FnMut() -> bool>(what: &str, mut cond: F) {
    let deadline = Instant::now() + TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_probe_current_then_stream() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" => Reply::stream(&[
            streams(1, 1, 12, &[position(10, 1.0), position(11, 1.5)], &[]),
            streams(1, 1, 12, &[], &[]),
            streams(1, 1, 14, &[position(12, 2.0), position(13, 2.5)], &[]),
        ]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let mut seen = 0;
    let events = wait_until(&handle, TIMEOUT, |e| {
        if let ClientEvent::Sample(doc) = e {
            seen += doc.observation_count();
        }
        seen == 4
    });

    assert!(matches!(events[0], ClientEvent::StateChanged(ClientState::Probing)));
    assert!(events.iter().any(|e| matches!(e, ClientEvent::Probe(doc) if doc.devices[0].name == "Mill")));
    assert!(events.iter().any(|e| matches!(e, ClientEvent::Current(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, ClientEvent::StreamStarted { from: 10 })));
    assert_eq!(sample_sequences(&events), vec![10, 11, 12, 13]);

    assert_eq!(
        handle.state(),
        ClientState::Sampling {
            instance_id: 1,
            from: 14
        }
    );
    assert!(agent
        .requests()
        .contains(&"/sample?from=10&count=1000&interval=20&heartbeat=10000".to_string()));

    let stats = handle.stats();
    assert!(stats.documents_received >= 5);
    assert_eq!(stats.reconnects, 0);

    client.shutdown();
    assert!(!handle.is_running());
    assert_eq!(handle.state(), ClientState::Stopped);
}

#[test]
fn test_instance_change_restarts_from_probe() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(if req.nth == 0 { 1 } else { 2 })),
        "/current" => Reply::ok(if req.nth == 0 {
            current(1, 10)
        } else {
            current(2, 5)
        }),
        "/sample" if req.nth == 0 => Reply::stream(&[streams(
            2,
            1,
            3,
            &[position(1, 0.5), position(2, 0.7)],
            &[],
        )]),
        "/sample" => Reply::stream(&[streams(
            2,
            1,
            7,
            &[position(5, 3.0), position(6, 3.5)],
            &[],
        )]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::Sample(_)));

    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::InstanceChanged {
            previous: 1,
            current: 2
        }
    )));
    let probes = events
        .iter()
        .filter(|e| matches!(e, ClientEvent::Probe(_)))
        .count();
    assert_eq!(probes, 2);

    // Observations from the restarted agent are only delivered once the
    // window has been rebuilt.
    assert_eq!(sample_sequences(&events), vec![5, 6]);
    assert!(agent
        .requests()
        .iter()
        .any(|r| r.starts_with("/sample?from=5&")));

    let stats = handle.stats();
    assert_eq!(stats.instance_resets, 1);
    assert_eq!(stats.reconnects, 1);
}

#[test]
fn test_out_of_range_resyncs_from_current() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, if req.nth == 0 { 10 } else { 40 })),
        "/sample" if req.nth == 0 => Reply::Document {
            status: 400,
            body: error("OUT_OF_RANGE", "'from' must be greater than 30"),
        },
        "/sample" => Reply::stream(&[streams(
            1,
            30,
            42,
            &[position(40, 1.0), position(41, 1.1)],
            &[],
        )]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::Sample(_)));

    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::AgentError(doc) if doc.has_code(&ErrorCode::OutOfRange)
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ClientEvent::StateChanged(ClientState::Retrying { .. }))));
    assert_eq!(sample_sequences(&events), vec![40, 41]);
    assert_eq!(agent.count("/probe"), 1);
    assert_eq!(agent.count("/current"), 2);
    assert!(agent
        .requests()
        .iter()
        .any(|r| r.starts_with("/sample?from=40&")));
}

#[test]
fn test_buffer_overrun_resyncs_from_current() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, if req.nth == 0 { 10 } else { 60 })),
        // Agent buffer already starts past the requested window.
        "/sample" if req.nth == 0 => {
            Reply::stream(&[streams(1, 50, 56, &[position(55, 9.0)], &[])])
        }
        "/sample" => Reply::stream(&[streams(1, 50, 61, &[position(60, 1.0)], &[])]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::Sample(_)));

    assert_eq!(sample_sequences(&events), vec![60]);
    assert_eq!(agent.count("/probe"), 1);
    assert_eq!(agent.count("/current"), 2);
    assert_eq!(handle.stats().reconnects, 1);
}

#[test]
fn test_malformed_stream_reports_xml_error_and_retries() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" if req.nth == 0 => Reply::Stream {
            body: format!(
                "{}this is not framing\r\n{}",
                multipart(&[streams(1, 1, 11, &[position(10, 1.0)], &[])]),
                multipart(&[streams(1, 1, 12, &[position(11, 2.0)], &[])]),
            ),
            hold_open: true,
        },
        "/sample" => Reply::stream(&[streams(1, 1, 12, &[position(11, 2.0)], &[])]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::XmlError { .. }));
    assert_eq!(sample_sequences(&events), vec![10]);
    match events.last() {
        Some(ClientEvent::XmlError { message }) => {
            assert!(message.contains("this is not framing"), "{}", message)
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // After the retry delay the client starts over from probe.
    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::Sample(_)));
    assert!(events
        .iter()
        .any(|e| matches!(e, ClientEvent::StateChanged(ClientState::Retrying { .. }))));
    assert!(events.iter().any(|e| matches!(e, ClientEvent::Probe(_))));
    assert_eq!(sample_sequences(&events), vec![11]);
    assert!(handle.stats().xml_errors >= 1);
}

#[test]
fn test_closed_stream_reopens_from_cursor() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" if req.nth == 0 => Reply::finished_stream(&[streams(
            1,
            1,
            12,
            &[position(10, 1.0), position(11, 1.1)],
            &[],
        )]),
        "/sample" => Reply::stream(&[streams(1, 1, 13, &[position(12, 1.2)], &[])]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let mut seen = 0;
    let events = wait_until(&handle, TIMEOUT, |e| {
        if let ClientEvent::Sample(doc) = e {
            seen += doc.observation_count();
        }
        seen == 3
    });

    assert_eq!(sample_sequences(&events), vec![10, 11, 12]);
    assert!(events
        .iter()
        .any(|e| matches!(e, ClientEvent::StreamStopped)));
    assert_eq!(agent.count("/probe"), 1);
    assert_eq!(agent.count("/current"), 1);
    assert!(agent
        .requests()
        .iter()
        .any(|r| r.starts_with("/sample?from=12&")));
    assert_eq!(handle.stats().reconnects, 1);
}

#[test]
fn test_asset_changed_fetches_asset() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" => Reply::stream(&[
            streams(1, 1, 11, &[position(10, 1.0)], &[]),
            streams(1, 1, 12, &[], &[asset_changed(11, "T1")]),
        ]),
        "/asset/T1" => Reply::ok(asset("T1")),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::Assets(_)));
    match events.last() {
        Some(ClientEvent::Assets(doc)) => {
            assert_eq!(doc.assets.len(), 1);
            assert_eq!(doc.assets[0].asset_id, "T1");
            assert_eq!(doc.assets[0].asset_type, "CuttingTool");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(agent.count("/asset/T1"), 1);
}

#[test]
fn test_asset_baseline_resets_after_instance_change() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(if req.nth == 0 { 1 } else { 2 })),
        "/current" => Reply::ok(if req.nth == 0 {
            streams(1, 1, 100, &[], &[asset_changed(99, "T1")])
        } else {
            current(2, 5)
        }),
        "/sample" if req.nth == 0 => {
            Reply::stream(&[streams(2, 1, 3, &[position(1, 0.5)], &[])])
        }
        "/sample" => Reply::stream(&[streams(
            2,
            1,
            7,
            &[position(5, 1.0)],
            &[asset_changed(6, "T9")],
        )]),
        "/asset/T9" => Reply::ok(asset("T9")),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url())).expect("spawn");
    let handle = client.handle();

    let events = wait_until(&handle, TIMEOUT, |e| matches!(e, ClientEvent::Assets(_)));
    assert!(events
        .iter()
        .any(|e| matches!(e, ClientEvent::InstanceChanged { .. })));
    match events.last() {
        Some(ClientEvent::Assets(doc)) => assert_eq!(doc.assets[0].asset_id, "T9"),
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(agent.count("/asset/T9"), 1);
    // Changed before the first snapshot, never fetched.
    assert_eq!(agent.count("/asset/T1"), 0);
}

#[test]
fn test_asset_follow_up_disabled() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" => Reply::stream(&[
            streams(1, 1, 11, &[], &[asset_changed(10, "T1")]),
            streams(1, 1, 12, &[position(11, 1.0)], &[]),
        ]),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url()).follow_assets(false)).expect("spawn");
    let handle = client.handle();

    let mut seen = 0;
    wait_until(&handle, TIMEOUT, |e| {
        if let ClientEvent::Sample(_) = e {
            seen += 1;
        }
        seen == 2
    });
    assert_eq!(agent.count("/asset"), 0);
}

#[test]
fn test_poll_mode_pages_through_buffer() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" => Reply::ok(match req.param("from") {
            Some("10") => streams(1, 1, 12, &[position(10, 1.0), position(11, 1.1)], &[]),
            Some("12") => streams(1, 1, 13, &[position(12, 1.2)], &[]),
            _ => streams(1, 1, 13, &[], &[]),
        }),
        _ => not_found(),
    });

    let client = MTConnectClient::spawn(config(agent.url()).mode(SampleMode::Poll).count(2))
        .expect("spawn");
    let handle = client.handle();

    let mut seen = 0;
    let events = wait_until(&handle, TIMEOUT, |e| {
        if let ClientEvent::Sample(doc) = e {
            seen += doc.observation_count();
        }
        seen == 3
    });
    assert_eq!(sample_sequences(&events), vec![10, 11, 12]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ClientEvent::StreamStarted { .. })));

    eventually("poll at the end of the buffer", || {
        agent.count("/sample?from=13&count=2") >= 2
    });
    let requests = agent.requests();
    assert!(requests.contains(&"/sample?from=10&count=2".to_string()));
    assert!(requests.contains(&"/sample?from=12&count=2".to_string()));
    assert!(!requests.iter().any(|r| r.contains("interval=")));
}

#[test]
fn test_current_mode_polls_snapshots() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10 + req.nth as u64)),
        _ => not_found(),
    });

    let client =
        MTConnectClient::spawn(config(agent.url()).mode(SampleMode::Current)).expect("spawn");
    let handle = client.handle();

    eventually("three current requests", || agent.count("/current") >= 3);
    assert_eq!(handle.state(), ClientState::PollingCurrent { instance_id: 1 });
    assert_eq!(agent.count("/sample"), 0);

    let currents = handle
        .poll()
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::Current(_)))
        .count();
    assert!(currents >= 2);
}

#[test]
fn test_unreachable_agent_retries() {
    let port = {
        let listener = StdListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };

    let client = MTConnectClient::spawn(config(format!("http://127.0.0.1:{}", port)))
        .expect("spawn");
    let handle = client.handle();

    let mut errors = 0;
    wait_until(&handle, TIMEOUT, |e| {
        if let ClientEvent::ConnectionError { .. } = e {
            errors += 1;
        }
        errors == 2
    });

    assert!(handle.stats().connection_errors >= 2);
    assert!(handle.is_running());
    assert!(matches!(
        handle.state(),
        ClientState::Retrying { .. } | ClientState::Probing
    ));
}

#[derive(Default)]
struct Recorder {
    observations: AtomicU64,
    states: Mutex<Vec<&'static str>>,
}

impl ClientHandler for Recorder {
    fn on_sample(&self, doc: &StreamsDocument) {
        self.observations
            .fetch_add(doc.observation_count() as u64, Ordering::Relaxed);
    }

    fn on_state_changed(&self, state: &ClientState) {
        self.states.lock().expect("states").push(state.name());
    }
}

#[test]
fn test_custom_handler() {
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        "/current" => Reply::ok(current(1, 10)),
        "/sample" => Reply::stream(&[
            streams(1, 1, 11, &[position(10, 1.0)], &[]),
            streams(1, 1, 13, &[position(11, 1.1), position(12, 1.2)], &[]),
        ]),
        _ => not_found(),
    });

    let recorder = Arc::new(Recorder::default());
    let client = MTConnectClient::spawn_with_handler(config(agent.url()), recorder.clone())
        .expect("spawn");
    let handle = client.handle();

    eventually("three observations", || {
        recorder.observations.load(Ordering::Relaxed) == 3
    });
    // No channel behind a custom handler.
    assert!(handle.poll().is_empty());

    client.shutdown();
    let states = recorder.states.lock().expect("states").clone();
    assert_eq!(states, vec!["probing", "sampling", "stopped"]);
}

#[test]
fn test_stats_are_shared_with_agent_client() {
    let stats = Arc::new(ClientStats::new());
    let agent = MockAgent::start(|req| match req.path.as_str() {
        "/probe" => Reply::ok(probe(1)),
        _ => not_found(),
    });

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let client = mtconnect::AgentClient::with_stats(&config(agent.url()), Arc::clone(&stats))
        .expect("client");
    rt.block_on(client.probe()).expect("probe");

    let snap = stats.snapshot();
    assert_eq!(snap.documents_received, 1);
    assert!(snap.bytes_received > 0);
}
