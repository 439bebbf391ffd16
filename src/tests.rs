use crate::errors::ConnectionError;
use crate::transport::{Request, Response, Transport};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Records every request and answers with queued responses, falling back to an empty `200`.
///
/// Clones share the recorded requests and the queue, so a test may keep one to inspect what a client sent.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    requests: Rc<RefCell<Vec<Request>>>,
    responses: Rc<RefCell<VecDeque<Response>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.responses.borrow_mut().push_back(Response::new(status, body));
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    pub(crate) fn last_request(&self) -> Request {
        self.requests.borrow().last().cloned().expect("no request was sent")
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &Request) -> Result<Response, ConnectionError> {
        self.requests.borrow_mut().push(request.clone());

        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Response::new(200, "")))
    }
}

#[derive(Debug)]
pub(crate) struct FailingTransport;

impl Transport for FailingTransport {
    fn execute(&self, request: &Request) -> Result<Response, ConnectionError> {
        Err(ConnectionError::Unreachable {
            url: request.url.clone(),
            message: "connection refused".to_owned(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct TimingOutTransport;

impl Transport for TimingOutTransport {
    fn execute(&self, request: &Request) -> Result<Response, ConnectionError> {
        Err(ConnectionError::Timeout {
            url: request.url.clone(),
        })
    }
}
