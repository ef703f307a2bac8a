// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scripted in-process agent for integration tests.
//!
//! Serves canned HTTP/1.1 responses from a responder closure. Sample streams
//! are written as `multipart/x-mixed-replace` bodies with chunked transfer
//! encoding, cut into small pieces so documents straddle chunk boundaries.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use mtconnect::{ClientEvent, ClientHandle};

pub const BOUNDARY: &str = "MTCBOUNDARY";

/// One request seen by the agent.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub query: String,
    /// Number of earlier requests for the same path.
    pub nth: usize,
}

impl Request {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Scripted response.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Single document with a status code.
    Document { status: u16, body: String },
    /// Chunked stream body. `hold_open` keeps the connection open after the
    /// last byte instead of terminating the body.
    Stream { body: String, hold_open: bool },
}

impl Reply {
    pub fn ok(body: String) -> Self {
        Reply::Document { status: 200, body }
    }

    pub fn stream(docs: &[String]) -> Self {
        Reply::Stream {
            body: multipart(docs),
            hold_open: true,
        }
    }

    pub fn finished_stream(docs: &[String]) -> Self {
        Reply::Stream {
            body: multipart(docs),
            hold_open: false,
        }
    }
}

type Responder = dyn Fn(&Request) -> Reply + Send + Sync;

pub struct MockAgent {
    addr: SocketAddr,
    log: Arc<Mutex<Vec<String>>>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MockAgent {
    pub fn start<F>(responder: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock agent");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("local addr");

        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let responder: Arc<Responder> = Arc::new(responder);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let thread = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("mock agent runtime");
            rt.block_on(async move {
                let listener = TcpListener::from_std(listener).expect("tokio listener");
                let counts = Arc::new(Mutex::new(HashMap::<String, usize>::new()));
                let accept = async {
                    loop {
                        let Ok((socket, _)) = listener.accept().await else {
                            continue;
                        };
                        let responder = Arc::clone(&responder);
                        let counts = Arc::clone(&counts);
                        let log = Arc::clone(&log_clone);
                        tokio::spawn(async move {
                            let _ = serve(socket, responder, counts, log).await;
                        });
                    }
                };
                tokio::select! {
                    _ = shutdown_rx => {}
                    _ = accept => {}
                }
            });
        });

        Self {
            addr,
            log,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().expect("log").clone()
    }

    /// Requests whose path starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }
}

impl Drop for MockAgent {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(
    mut socket: TcpStream,
    responder: Arc<Responder>,
    counts: Arc<Mutex<HashMap<String, usize>>>,
    log: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head).to_string();
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));

    let nth = {
        let mut counts = counts.lock().expect("counts");
        let entry = counts.entry(path.to_string()).or_insert(0);
        *entry += 1;
        *entry - 1
    };
    log.lock().expect("log").push(target.clone());

    let request = Request {
        path: path.to_string(),
        query: query.to_string(),
        nth,
    };

    match responder(&request) {
        Reply::Document { status, body } => {
            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await?;
            socket.flush().await?;
        }
        Reply::Stream { body, hold_open } => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace;boundary={}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                BOUNDARY
            );
            socket.write_all(header.as_bytes()).await?;
            for piece in body.as_bytes().chunks(97) {
                socket
                    .write_all(format!("{:x}\r\n", piece.len()).as_bytes())
                    .await?;
                socket.write_all(piece).await?;
                socket.write_all(b"\r\n").await?;
                socket.flush().await?;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            if hold_open {
                tokio::time::sleep(Duration::from_secs(60)).await;
            } else {
                socket.write_all(b"0\r\n\r\n").await?;
                socket.flush().await?;
            }
        }
    }
    Ok(())
}

/// Frame documents as a multipart stream body.
pub fn multipart(docs: &[String]) -> String {
    let mut out = String::new();
    for doc in docs {
        out.push_str(&format!("--{}\r\n", BOUNDARY));
        out.push_str("Content-type: text/xml\r\n");
        out.push_str(&format!("Content-length: {}\r\n\r\n", doc.len()));
        out.push_str(doc);
        out.push_str("\r\n");
    }
    out
}

// ============================================================================
// Documents
// ============================================================================

pub fn probe(instance: u64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MTConnectDevices xmlns="urn:mtconnect.org:MTConnectDevices:1.7">
  <Header creationTime="2024-03-01T12:00:00Z" sender="mock" instanceId="{instance}" version="1.7.0.3" bufferSize="1024" assetBufferSize="16" assetCount="1"/>
  <Devices>
    <Device id="mill" name="Mill" uuid="mill-1">
      <DataItems>
        <DataItem category="EVENT" id="avail" type="AVAILABILITY"/>
        <DataItem category="EVENT" id="asset_chg" type="ASSET_CHANGED"/>
      </DataItems>
      <Components>
        <Axes id="ax" name="Axes">
          <Components>
            <Linear id="x" name="X">
              <DataItems>
                <DataItem category="SAMPLE" id="Xact" type="POSITION" subType="ACTUAL" units="MILLIMETER"/>
              </DataItems>
            </Linear>
          </Components>
        </Axes>
      </Components>
    </Device>
  </Devices>
</MTConnectDevices>"#
    )
}

pub fn position(sequence: u64, value: f64) -> String {
    format!(
        r#"<Position dataItemId="Xact" timestamp="2024-03-01T12:00:01Z" sequence="{sequence}" subType="ACTUAL">{value}</Position>"#
    )
}

pub fn asset_changed(sequence: u64, asset_id: &str) -> String {
    format!(
        r#"<AssetChanged dataItemId="asset_chg" timestamp="2024-03-01T12:00:01Z" sequence="{sequence}" assetType="CuttingTool">{asset_id}</AssetChanged>"#
    )
}

pub fn availability(sequence: u64) -> String {
    format!(
        r#"<Availability dataItemId="avail" timestamp="2024-03-01T12:00:00Z" sequence="{sequence}">AVAILABLE</Availability>"#
    )
}

/// Streams document. `samples` go under the axis, `events` under the device.
pub fn streams(
    instance: u64,
    first: u64,
    next: u64,
    samples: &[String],
    events: &[String],
) -> String {
    let mut components = String::new();
    if !samples.is_empty() {
        components.push_str(&format!(
            r#"<ComponentStream component="Linear" name="X" componentId="x"><Samples>{}</Samples></ComponentStream>"#,
            samples.concat()
        ));
    }
    if !events.is_empty() {
        components.push_str(&format!(
            r#"<ComponentStream component="Device" name="Mill" componentId="mill"><Events>{}</Events></ComponentStream>"#,
            events.concat()
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MTConnectStreams xmlns="urn:mtconnect.org:MTConnectStreams:1.7">
  <Header creationTime="2024-03-01T12:00:01Z" sender="mock" instanceId="{instance}" version="1.7.0.3" bufferSize="1024" firstSequence="{first}" lastSequence="{last}" nextSequence="{next}"/>
  <Streams>
    <DeviceStream name="Mill" uuid="mill-1">{components}</DeviceStream>
  </Streams>
</MTConnectStreams>"#,
        last = next.saturating_sub(1),
    )
}

/// Snapshot whose window starts at `next`.
pub fn current(instance: u64, next: u64) -> String {
    streams(instance, 1, next, &[], &[availability(next - 1)])
}

pub fn error(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MTConnectError xmlns="urn:mtconnect.org:MTConnectError:1.7">
  <Header creationTime="2024-03-01T12:00:01Z" sender="mock" instanceId="1" version="1.7.0.3" bufferSize="1024"/>
  <Errors><Error errorCode="{code}">{message}</Error></Errors>
</MTConnectError>"#
    )
}

pub fn asset(asset_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MTConnectAssets xmlns="urn:mtconnect.org:MTConnectAssets:1.7">
  <Header creationTime="2024-03-01T12:00:01Z" sender="mock" instanceId="1" version="1.7.0.3" assetBufferSize="16" assetCount="1"/>
  <Assets><CuttingTool assetId="{asset_id}" deviceUuid="mill-1" timestamp="2024-03-01T12:00:01Z"><CuttingToolLifeCycle/></CuttingTool></Assets>
</MTConnectAssets>"#
    )
}

pub fn not_found() -> Reply {
    Reply::Document {
        status: 404,
        body: error("INVALID_REQUEST", "unknown path"),
    }
}

// ============================================================================
// Event helpers
// ============================================================================

/// Collect events until `done` returns true for one of them.
///
/// Panics after `timeout`.
pub fn wait_until<F>(handle: &ClientHandle, timeout: Duration, mut done: F) -> Vec<ClientEvent>
where
    F: FnMut(&ClientEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            panic!("timed out waiting for event; got {:#?}", events);
        }
        if let Some(event) = handle.wait(remaining.min(Duration::from_millis(100))) {
            let finished = done(&event);
            events.push(event);
            if finished {
                return events;
            }
        }
    }
}

/// Sequence numbers of all observations in `Sample` events.
pub fn sample_sequences(events: &[ClientEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::Sample(doc) => Some(doc.observations().map(|o| o.sequence).collect::<Vec<_>>()),
            _ => None,
        })
        .flatten()
        .collect()
}
