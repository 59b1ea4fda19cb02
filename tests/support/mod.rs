//! In-memory transports and recording sinks for driving the RPC
//! machinery without a server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use histoview::pipeline::{Page, RenderOutput};
use histoview::rpc::{Dialer, Receiver, RequestHandle, Transport};

pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
}

// ---------------------------------------------------------------------------
// Reply-frame builders
// ---------------------------------------------------------------------------

pub fn progress_frame(id: u64, fraction: f64) -> String {
    json!({"requestId": id, "kind": "progress", "progress": fraction}).to_string()
}

pub fn data_frame(id: u64, payload: Value) -> String {
    json!({"requestId": id, "kind": "data", "payload": payload}).to_string()
}

pub fn data_frame_with_progress(id: u64, fraction: f64, payload: Value) -> String {
    json!({"requestId": id, "kind": "data", "progress": fraction, "payload": payload}).to_string()
}

pub fn completion_frame(id: u64) -> String {
    json!({"requestId": id, "kind": "completion"}).to_string()
}

pub fn error_frame(id: u64, message: &str) -> String {
    json!({"requestId": id, "kind": "error", "errorMessage": message}).to_string()
}

// ---------------------------------------------------------------------------
// Manual transport: the test body feeds frames one by one
// ---------------------------------------------------------------------------

pub struct ManualTransport {
    sent: Arc<Mutex<Vec<Value>>>,
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Transport for ManualTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        let value: Value = serde_json::from_str(&text)?;
        self.sent.lock().unwrap().push(value);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) {}
}

/// Hands out one pre-registered channel per dial, in order.
pub struct ManualDialer {
    sent: Arc<Mutex<Vec<Value>>>,
    feeds: Mutex<VecDeque<mpsc::UnboundedReceiver<String>>>,
    dials: Arc<Mutex<usize>>,
}

impl ManualDialer {
    pub fn with_channels(
        count: usize,
    ) -> (Self, Vec<mpsc::UnboundedSender<String>>, Arc<Mutex<Vec<Value>>>) {
        let mut senders = Vec::new();
        let mut feeds = VecDeque::new();
        for _ in 0..count {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            feeds.push_back(rx);
        }
        let sent = Arc::new(Mutex::new(Vec::new()));
        let dialer = Self {
            sent: Arc::clone(&sent),
            feeds: Mutex::new(feeds),
            dials: Arc::new(Mutex::new(0)),
        };
        (dialer, senders, sent)
    }

    pub fn dial_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.dials)
    }
}

#[async_trait]
impl Dialer for ManualDialer {
    async fn dial(&self) -> Result<Box<dyn Transport>> {
        *self.dials.lock().unwrap() += 1;
        let rx = self
            .feeds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted channel left"))?;
        Ok(Box::new(ManualTransport { sent: Arc::clone(&self.sent), rx }))
    }
}

// ---------------------------------------------------------------------------
// Responder: answers every request from a script, like a tiny server
// ---------------------------------------------------------------------------

pub struct Responder {
    pub requests: Arc<Mutex<Vec<Value>>>,
    script: Arc<dyn Fn(&Value) -> Vec<String> + Send + Sync>,
}

impl Responder {
    pub fn new(script: impl Fn(&Value) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(script),
        }
    }
}

#[async_trait]
impl Dialer for Responder {
    async fn dial(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(ResponderTransport {
            requests: Arc::clone(&self.requests),
            script: Arc::clone(&self.script),
            queue: VecDeque::new(),
        }))
    }
}

struct ResponderTransport {
    requests: Arc<Mutex<Vec<Value>>>,
    script: Arc<dyn Fn(&Value) -> Vec<String> + Send + Sync>,
    queue: VecDeque<String>,
}

#[async_trait]
impl Transport for ResponderTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        let request: Value = serde_json::from_str(&text)?;
        self.queue = (self.script)(&request).into();
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.queue.pop_front().map(Ok)
    }

    async fn close(&mut self) {}
}

// ---------------------------------------------------------------------------
// Recording receiver and page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(f64),
    Next(Value),
    Completed,
    Error(String),
}

pub struct RecordingReceiver {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingReceiver {
    pub fn new() -> (Self, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (Self { events: Arc::clone(&events) }, events)
    }
}

impl Receiver for RecordingReceiver {
    type Item = Value;

    fn on_progress(&mut self, fraction: f64) {
        self.events.lock().unwrap().push(Event::Progress(fraction));
    }

    fn on_next(&mut self, value: Value) {
        self.events.lock().unwrap().push(Event::Next(value));
    }

    fn on_completed(self) {
        self.events.lock().unwrap().push(Event::Completed);
    }

    fn on_error(self, message: String) {
        self.events.lock().unwrap().push(Event::Error(message));
    }
}

pub struct RecordingPage {
    pub area: (f64, f64),
    pub progress: Mutex<Vec<f64>>,
    pub errors: Mutex<Vec<String>>,
    pub renders: Mutex<Vec<RenderOutput>>,
    pub operations: Mutex<Vec<(String, RequestHandle)>>,
}

impl RecordingPage {
    pub fn new(width: f64, height: f64) -> Arc<Self> {
        Arc::new(Self {
            area: (width, height),
            progress: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            renders: Mutex::new(Vec::new()),
            operations: Mutex::new(Vec::new()),
        })
    }
}

impl Page for RecordingPage {
    fn stage_started(&self, stage: &str, operation: &RequestHandle) {
        self.operations
            .lock()
            .unwrap()
            .push((stage.to_string(), operation.clone()));
    }

    fn set_progress(&self, fraction: f64) {
        self.progress.lock().unwrap().push(fraction);
    }

    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn render(&self, output: RenderOutput) {
        self.renders.lock().unwrap().push(output);
    }

    fn available_area(&self) -> (f64, f64) {
        self.area
    }
}
