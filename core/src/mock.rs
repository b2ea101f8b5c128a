//! Scripted in-process transport for unit tests.
//!
//! Replies are keyed by `"METHOD /path"`, where the path is relative to the
//! client's base URL and excludes the query string. Deferred replies are
//! consumed first, in the order they were registered, and let a test decide
//! exactly when (and in which order) in-flight requests complete.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

type Reply = Result<HttpResponse, TransportError>;

struct PendingReply {
    arrived: oneshot::Sender<HttpRequest>,
    reply: oneshot::Receiver<Reply>,
}

#[derive(Default)]
struct Script {
    fixed: HashMap<String, Reply>,
    deferred: HashMap<String, VecDeque<PendingReply>>,
    sent: Vec<(String, HttpRequest)>,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<Script>,
}

/// Test-side handle of a deferred reply.
pub(crate) struct Deferred {
    arrived: oneshot::Receiver<HttpRequest>,
    reply: oneshot::Sender<Reply>,
}

impl Deferred {
    /// Wait until the transport has received the request this reply answers.
    pub(crate) async fn arrived(&mut self) -> HttpRequest {
        (&mut self.arrived).await.expect("transport dropped before the request arrived")
    }

    pub(crate) fn respond(self, response: HttpResponse) {
        let _ = self.reply.send(Ok(response));
    }

    pub(crate) fn respond_json(self, status: u16, value: serde_json::Value) {
        self.respond(HttpResponse::json(status, &value));
    }

    pub(crate) fn fail(self, msg: &str) {
        let _ = self.reply.send(Err(TransportError::new(msg)));
    }
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, key: &str, response: HttpResponse) {
        self.script.lock().unwrap().fixed.insert(key.to_string(), Ok(response));
    }

    pub(crate) fn reply_json(&self, key: &str, status: u16, value: serde_json::Value) {
        self.reply(key, HttpResponse::json(status, &value));
    }

    pub(crate) fn fail(&self, key: &str, msg: &str) {
        self.script
            .lock()
            .unwrap()
            .fixed
            .insert(key.to_string(), Err(TransportError::new(msg)));
    }

    pub(crate) fn defer(&self, key: &str) -> Deferred {
        let (arrived_tx, arrived_rx) = oneshot::channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.script
            .lock()
            .unwrap()
            .deferred
            .entry(key.to_string())
            .or_default()
            .push_back(PendingReply {
                arrived: arrived_tx,
                reply: reply_rx,
            });
        Deferred {
            arrived: arrived_rx,
            reply: reply_tx,
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.script.lock().unwrap().sent.len()
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.script.lock().unwrap().sent.iter().filter(|(k, _)| k == key).count()
    }

    pub(crate) fn last_request(&self, key: &str) -> Option<HttpRequest> {
        self.script
            .lock()
            .unwrap()
            .sent
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r.clone())
    }
}

/// `"GET /tvshows"` for `GET http://host/api/tvshows?page=2`.
fn route_key(request: &HttpRequest) -> String {
    let without_scheme = request
        .url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&request.url);
    let path = without_scheme
        .find('/')
        .map(|i| &without_scheme[i..])
        .unwrap_or("/");
    let path = path.split('?').next().unwrap_or(path);
    let path = path.strip_prefix("/api").unwrap_or(path);
    format!("{} {path}", request.method)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = route_key(&request);
        let pending = {
            let mut script = self.script.lock().unwrap();
            script.sent.push((key.clone(), request.clone()));
            match script.deferred.get_mut(&key).and_then(VecDeque::pop_front) {
                Some(pending) => Err(pending),
                None => Ok(script.fixed.get(&key).cloned()),
            }
        };

        match pending {
            Ok(Some(reply)) => reply,
            Ok(None) => Ok(HttpResponse::json(
                404,
                &serde_json::json!({ "error": format!("no scripted response for {key}") }),
            )),
            Err(pending) => {
                let _ = pending.arrived.send(request);
                pending
                    .reply
                    .await
                    .unwrap_or_else(|_| Err(TransportError::new("deferred reply dropped")))
            }
        }
    }
}
