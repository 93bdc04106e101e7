//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Request, Response};

use crate::api::HttpTransport;
use crate::auth::{Clock, MemoryStorage, SessionStore};
use crate::routes::{NavigationMode, Navigator};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        }
    }
}

impl ManualClock {
    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        ManualClock::now(self)
    }
}

pub fn memory_session() -> (Arc<SessionStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let session = SessionStore::with_clock(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryStorage::new()),
        clock.clone(),
    );
    (Arc::new(session), clock)
}

/// What a recorded request looked like on the way out.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

enum Canned {
    Reply(u16, String),
    Fail,
}

/// Transport that replays canned responses in order and records requests.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Canned>>,
    seen: Mutex<Vec<SeenRequest>>,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, status: u16, body: &str) -> Arc<Self> {
        self.replies
            .lock()
            .unwrap()
            .push_back(Canned::Reply(status, body.to_string()));
        Arc::clone(self)
    }

    pub fn fail(self: &Arc<Self>) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Canned::Fail);
        Arc::clone(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// A genuine `reqwest::Error`, produced by building a request with a bad URL.
pub fn transport_error() -> reqwest::Error {
    reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid URL must fail to build")
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .and_then(|b| serde_json::from_slice(b).ok());
        self.seen.lock().unwrap().push(SeenRequest {
            method: request.method().clone(),
            url: request.url().to_string(),
            authorization: request
                .headers()
                .get(reqwest::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });

        let canned = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no canned reply left");
        match canned {
            Canned::Reply(status, body) => {
                let response = http::Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap();
                Ok(Response::from(response))
            }
            Canned::Fail => Err(transport_error()),
        }
    }
}

/// Navigator that records every navigation.
#[derive(Default)]
pub struct RecordingNavigator {
    pub location: Mutex<String>,
    pub visits: Mutex<Vec<(String, NavigationMode)>>,
}

impl RecordingNavigator {
    pub fn at(location: &str) -> Arc<Self> {
        let navigator = Self::default();
        *navigator.location.lock().unwrap() = location.to_string();
        Arc::new(navigator)
    }

    pub fn visits(&self) -> Vec<(String, NavigationMode)> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn navigate(&self, target: &str, mode: NavigationMode) {
        *self.location.lock().unwrap() = target.to_string();
        self.visits.lock().unwrap().push((target.to_string(), mode));
    }
}
