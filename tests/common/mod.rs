#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use unifiedx::core::errors::ExchangeError;
use unifiedx::core::kernel::{HttpRequest, HttpResponse, RestClient};

struct Route {
    method: Method,
    fragment: String,
    responses: Vec<(u16, String)>,
}

#[derive(Default)]
struct Script {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// In-memory transport. Each request goes to the first route whose method
/// matches and whose fragment occurs in the URL. Queued responses are
/// replayed in order and the last one repeats.
#[derive(Clone, Default)]
pub struct MockRest {
    script: Arc<Mutex<Script>>,
}

impl MockRest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, fragment: &str, status: u16, body: impl Into<String>) -> &Self {
        let mut script = self.script.lock();
        let body = body.into();
        if let Some(route) = script
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.fragment == fragment)
        {
            route.responses.push((status, body));
        } else {
            script.routes.push(Route {
                method,
                fragment: fragment.to_string(),
                responses: vec![(status, body)],
            });
        }
        self
    }

    pub fn get(&self, fragment: &str, body: Value) -> &Self {
        self.on(Method::GET, fragment, 200, body.to_string())
    }

    pub fn post(&self, fragment: &str, body: Value) -> &Self {
        self.on(Method::POST, fragment, 200, body.to_string())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().requests.clone()
    }

    /// Recorded requests whose URL contains `fragment`.
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(fragment))
            .collect()
    }

    pub fn last_request_to(&self, fragment: &str) -> HttpRequest {
        self.requests_to(fragment)
            .pop()
            .unwrap_or_else(|| panic!("no request sent to {}", fragment))
    }
}

#[async_trait]
impl RestClient for MockRest {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError> {
        let mut script = self.script.lock();
        script.requests.push(request.clone());
        let route = script
            .routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.contains(&r.fragment))
            .ok_or_else(|| {
                ExchangeError::NetworkError(format!("no scripted response for {} {}", request.method, request.url))
            })?;
        let (status, body) = if route.responses.len() > 1 {
            route.responses.remove(0)
        } else {
            route.responses[0].clone()
        };
        Ok(HttpResponse::new(status, body))
    }
}

/// Decode a query string or form body into sorted key/value pairs.
pub fn form_pairs(encoded: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = encoded
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(v).unwrap().into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
}

pub fn query_value(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    form_pairs(query).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

pub fn form_value(body: &str, key: &str) -> Option<String> {
    form_pairs(body).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

pub fn json_body(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap_or("null")).unwrap()
}
