#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use runtime_report::{Config, CounterStore, ListPage, LogStore, ReportError, Result};
use serde_json::{json, Value};
use tracing::Level;

pub const PREFIX: &str = "logs/AWSLogs/626492997873/CloudTrail/us-east-1/2018/05/29";

pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Same as `block_on` but with a paused clock, so long sleeps resolve instantly.
pub fn block_on_paused<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

/// Collects formatted log lines from everything run inside `capture_logs`.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

/// Runs `f` with a subscriber that writes into the returned buffer.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer)
}

pub fn test_config(concurrency: usize) -> Config {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.concurrency = concurrency;
    config
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub fn create_function(name: &str, runtime: Option<&str>) -> Value {
    let mut params = json!({"functionName": "my-function"});
    if let Some(runtime) = runtime {
        params["runtime"] = json!(runtime);
    }
    json!({
        "eventSource": "lambda.amazonaws.com",
        "eventName": name,
        "requestParameters": params
    })
}

pub fn other_event(source: &str, name: &str) -> Value {
    json!({"eventSource": source, "eventName": name, "requestParameters": {"runtime": "python3.8"}})
}

pub fn archive(records: Vec<Value>) -> Vec<u8> {
    gzip(&json!({ "Records": records }).to_string())
}

/// In-memory bucket that pages keys in lexical order, using the last key of a page as the marker.
pub struct MemoryLogStore {
    objects: BTreeMap<String, Vec<u8>>,
    page_size: usize,
    fail_list_call: Option<usize>,
    slow_list_call: Option<usize>,
    slow_keys: HashSet<String>,
    list_calls: Mutex<Vec<Option<String>>>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryLogStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            objects: BTreeMap::new(),
            page_size,
            fail_list_call: None,
            slow_list_call: None,
            slow_keys: HashSet::new(),
            list_calls: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_object(mut self, key: &str, body: Vec<u8>) -> Self {
        self.objects.insert(key.to_string(), body);
        self
    }

    /// Makes the n-th (zero based) listing request fail.
    pub fn failing_list_call(mut self, call: usize) -> Self {
        self.fail_list_call = Some(call);
        self
    }

    /// Makes the n-th (zero based) listing request hang.
    pub fn slow_list_call(mut self, call: usize) -> Self {
        self.slow_list_call = Some(call);
        self
    }

    pub fn slow_object(mut self, key: &str) -> Self {
        self.slow_keys.insert(key.to_string());
        self
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl LogStore for MemoryLogStore {
    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage> {
        let call = {
            let mut calls = self.list_calls.lock().unwrap();
            calls.push(marker.map(str::to_owned));
            calls.len() - 1
        };
        if self.fail_list_call == Some(call) {
            return Err(ReportError::Listing {
                prefix: prefix.to_string(),
                reason: "access denied".to_string(),
            });
        }
        if self.slow_list_call == Some(call) {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        let mut remaining = self
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| marker.map_or(true, |m| k.as_str() > m));
        let keys: Vec<String> = remaining.by_ref().take(self.page_size).cloned().collect();
        let next_marker = if remaining.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage { keys, next_marker })
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(key.to_string());
        if self.slow_keys.contains(key) {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        self.objects.get(key).cloned().ok_or_else(|| ReportError::Fetch {
            key: key.to_string(),
            reason: "no such key".to_string(),
        })
    }
}

/// In-memory report table applying additive updates.
#[derive(Default)]
pub struct MemoryCounterStore {
    creates: Mutex<HashMap<String, u64>>,
    calls: Mutex<usize>,
    failing: HashSet<String>,
    slow: HashSet<String>,
}

impl MemoryCounterStore {
    pub fn failing_for(runtimes: &[&str]) -> Self {
        Self {
            failing: runtimes.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow_for(runtimes: &[&str]) -> Self {
        Self {
            slow: runtimes.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn creates(&self, runtime: &str) -> Option<u64> {
        self.creates.lock().unwrap().get(runtime).copied()
    }

    pub fn rows(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl CounterStore for MemoryCounterStore {
    async fn add_creates(&self, runtime: &str, delta: u64) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        if self.slow.contains(runtime) {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        if self.failing.contains(runtime) {
            return Err(ReportError::Persist {
                runtime: runtime.to_string(),
                reason: "provisioned throughput exceeded".to_string(),
            });
        }
        *self.creates.lock().unwrap().entry(runtime.to_string()).or_insert(0) += delta;
        Ok(())
    }
}
