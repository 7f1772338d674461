//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

enum Step {
    Ready(Result<HttpResponse, ApiError>),
    Gated(oneshot::Receiver<HttpResponse>),
}

/// Answers requests from a queue, recording every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn push(&self, response: HttpResponse) {
        self.steps.lock().unwrap().push_back(Step::Ready(Ok(response)));
    }

    pub(crate) fn push_error(&self, err: ApiError) {
        self.steps.lock().unwrap().push_back(Step::Ready(Err(err)));
    }

    /// The matching request stays pending until the returned sender fires.
    pub(crate) fn push_gated(&self) -> oneshot::Sender<HttpResponse> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().unwrap().push_back(Step::Gated(rx));
        tx
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Gated(rx)) => rx
                .await
                .map_err(|_| ApiError::Transport("connection closed".to_string())),
            None => Err(ApiError::Transport("no scripted response".to_string())),
        }
    }
}

pub(crate) fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string(),
    }
}
