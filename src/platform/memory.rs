// src/platform/memory.rs

//! Scripted in-process transport for tests and offline runs

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::platform::network::{HttpMethod, NetworkProvider, NetworkRequest, NetworkResponse};

#[derive(Debug, Clone)]
enum Reply {
    Respond(NetworkResponse),
    Unreachable,
}

#[derive(Debug)]
struct Route {
    method: HttpMethod,
    path: String,
    replies: VecDeque<Reply>,
}

/// Answers requests from registered routes and records every request.
///
/// Routes are matched on method and the path after the base URL. Replies
/// queued on one route are consumed in order; the last one keeps answering.
/// Unmatched requests get a 404.
#[derive(Debug)]
pub struct MemoryNetwork {
    base_url: String,
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<NetworkRequest>>,
}

impl MemoryNetwork {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, method: HttpMethod, path: &str, response: NetworkResponse) -> &Self {
        self.push(method, path, Reply::Respond(response));
        self
    }

    pub fn respond_json(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
        self.respond(method, path, NetworkResponse::json(status, &body))
    }

    /// Makes the route fail at the transport level
    pub fn unreachable(&self, method: HttpMethod, path: &str) -> &Self {
        self.push(method, path, Reply::Unreachable);
        self
    }

    pub fn requests(&self) -> Vec<NetworkRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<NetworkRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && self.path_of(&r.url) == path)
            .cloned()
            .collect()
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) {
        let mut routes = self.routes.lock();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    fn path_of<'a>(&self, url: &'a str) -> &'a str {
        url.strip_prefix(&self.base_url).unwrap_or(url)
    }
}

#[async_trait]
impl NetworkProvider for MemoryNetwork {
    async fn request(&self, request: NetworkRequest) -> Result<NetworkResponse> {
        let path = self.path_of(&request.url).to_string();
        let method = request.method;
        self.requests.lock().push(request);

        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .find(|r| r.method == method && r.path == path)
                .and_then(|route| {
                    if route.replies.len() > 1 {
                        route.replies.pop_front()
                    } else {
                        route.replies.front().cloned()
                    }
                })
        };

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Unreachable) => Err(Error::network(
                path,
                "Connection refused",
            )),
            None => Ok(NetworkResponse::json(
                404,
                &serde_json::json!({ "message": format!("No route for {} {}", method, path) }),
            )),
        }
    }
}
