use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Response, Server, StatusCode};

/// Prefix the stub mounts the gateway under, so base-path joining is exercised.
const MOUNT: &str = "/api";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

#[derive(Debug, Clone)]
pub struct Canned {
    pub path: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Canned {
    pub fn json(path: &'static str, body: serde_json::Value) -> Self {
        Self {
            path,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn raw(path: &'static str, content_type: &'static str, body: &str) -> Self {
        Self {
            path,
            content_type,
            body: body.to_string(),
        }
    }
}

/// Answers canned bodies by path and records every request it sees.
pub struct StubGateway {
    server: Arc<Server>,
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
}

impl StubGateway {
    pub fn start(routes: Vec<Canned>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("http server"));
        let base_url = format!("http://{}{}", server.server_addr(), MOUNT);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    request
                        .as_reader()
                        .read_to_string(&mut body)
                        .expect("read request body");
                    let header = |name: &'static str| {
                        request
                            .headers()
                            .iter()
                            .find(|h| h.field.equiv(name))
                            .map(|h| h.value.as_str().to_string())
                    };
                    let url = request.url().to_string();
                    let recorded = Recorded {
                        method: request.method().as_str().to_string(),
                        url: url.clone(),
                        authorization: header("Authorization"),
                        content_type: header("Content-Type"),
                        body,
                    };
                    requests.lock().expect("requests lock").push(recorded);

                    let path = url.strip_prefix(MOUNT).unwrap_or(&url);
                    let route = routes
                        .iter()
                        .find(|r| r.path == path)
                        .or_else(|| routes.iter().find(|r| path.split('?').next() == Some(r.path)));
                    let response = match route {
                        Some(route) => Response::from_data(route.body.clone().into_bytes())
                            .with_header(
                                Header::from_bytes("Content-Type", route.content_type)
                                    .expect("content type header"),
                            ),
                        None => Response::from_data(b"<html>Not Found</html>".to_vec())
                            .with_status_code(StatusCode(404))
                            .with_header(
                                Header::from_bytes("Content-Type", "text/html")
                                    .expect("content type header"),
                            ),
                    };
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            base_url,
            requests,
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for StubGateway {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
