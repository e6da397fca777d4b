use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::client::{
    ApiClient, ApiRequest, ApiResponse, RetryPolicy, Sleeper, Transport, TransportError,
};

pub struct SentRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays a fixed script of responses and records everything sent.
pub struct ScriptedTransport {
    script: RefCell<VecDeque<Result<ApiResponse, TransportError>>>,
    log: Rc<RefCell<Vec<SentRequest>>>,
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.borrow_mut().push(SentRequest {
            method: request.method.to_string(),
            url: request.url.to_string(),
            headers: request.headers,
            body: request.body,
        });
        self.script
            .borrow_mut()
            .pop_front()
            .expect("transport script exhausted")
    }
}

pub struct RecordingSleeper {
    log: Rc<RefCell<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.log.borrow_mut().push(duration);
    }
}

/// A sleeper appending to the same log as an existing client's, so backoff
/// and gameplay waits land in one ordered record.
pub fn sleeper_of(log: &Rc<RefCell<Vec<Duration>>>) -> RecordingSleeper {
    RecordingSleeper {
        log: Rc::clone(log),
    }
}

pub fn response(status: u16, body: &str) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse {
        status,
        body: body.to_owned(),
    })
}

pub fn network_error() -> Result<ApiResponse, TransportError> {
    Err(TransportError("connection refused".to_owned()))
}

/// An `ApiClient` wired to a scripted transport and a recording sleeper,
/// returned together with handles to the request and sleep logs.
pub fn test_client(
    script: Vec<Result<ApiResponse, TransportError>>,
) -> (
    ApiClient,
    Rc<RefCell<Vec<SentRequest>>>,
    Rc<RefCell<Vec<Duration>>>,
) {
    let requests = Rc::new(RefCell::new(Vec::new()));
    let sleeps = Rc::new(RefCell::new(Vec::new()));

    let transport = ScriptedTransport {
        script: RefCell::new(script.into()),
        log: Rc::clone(&requests),
    };
    let sleeper = RecordingSleeper {
        log: Rc::clone(&sleeps),
    };

    let base = Url::parse("https://app.overnads.xyz").unwrap();
    let client = ApiClient::with_transport(
        Box::new(transport),
        Box::new(sleeper),
        "test-token".to_owned(),
        vec!["test-agent".to_owned()],
        &base,
        RetryPolicy::default(),
    )
    .unwrap();

    (client, requests, sleeps)
}
