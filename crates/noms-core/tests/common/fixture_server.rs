//! Minimal HTTP/1.1 fixture server for integration tests.
//!
//! Serves a small "do not call" list plus the redirect and Basic-auth routes
//! the user agent is exercised against. Every response closes the connection.

#![allow(dead_code)]

use base64::Engine;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const USERNAME: &str = "testuser";
pub const PASSWORD: &str = "testpass";
pub const REALM: &str = "Authorization Required";

const DNC: &str = r#"[
  {"id": 1, "name": "Frances Wong", "phone": "555-123-4567", "city": "Boston"},
  {"id": 2, "name": "Ivan Petrov", "phone": "555-987-6543", "city": "Denver"},
  {"id": 3, "name": "Amara Okafor", "phone": "555-246-8101", "city": "Boston"}
]"#;

const DOC: &str = r#"{
  "$doctype": "noms-v2",
  "$script": [{"$source": "/static/dnc.js"}],
  "$body": [{"$type": "object-list", "$data": []}]
}"#;

/// Per-server state. `generated` is echoed by `/static/generated`.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub generated: String,
}

/// Starts the fixture in a background thread and returns its base URL
/// (e.g. "http://127.0.0.1:12345/"). The server runs until the process exits.
pub fn start(generated: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let fixture = Arc::new(Fixture {
        generated: generated.to_string(),
    });
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let fixture = Arc::clone(&fixture);
            thread::spawn(move || handle(stream, &fixture));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

struct Request {
    method: String,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
}

fn handle(mut stream: TcpStream, fixture: &Fixture) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let reply = route(&request, fixture);
    let _ = stream.write_all(reply.as_bytes());
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let text = std::str::from_utf8(&buf).ok()?;
    let mut lines = text.lines();
    let mut start = lines.next()?.split_whitespace();
    let method = start.next()?.to_string();
    let target = start.next()?;
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), Some(q.to_string())),
        None => (target.to_string(), None),
    };
    let mut authorization = None;
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }
    Some(Request {
        method,
        path,
        query,
        authorization,
    })
}

fn authorized(request: &Request) -> bool {
    let expected = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", USERNAME, PASSWORD));
    request.authorization.as_deref() == Some(format!("Basic {}", expected).as_str())
}

fn route(request: &Request, fixture: &Fixture) -> String {
    if request.method != "GET" && request.method != "HEAD" {
        return reply("405 Method Not Allowed", &[], "text/plain", "");
    }
    let path = request.path.as_str();
    let challenge = format!("Basic realm=\"{}\"", REALM);
    match path {
        "/dnc.json" | "/files/data.json" => reply("200 OK", &[], "application/json", DNC),
        "/dnc" => {
            let body = match &request.query {
                Some(q) => filter(q),
                None => DNC.to_string(),
            };
            reply("200 OK", &[], "application/json", &body)
        }
        "/alt/dnc.json" => redirect("302 Found", "/dnc.json"),
        "/auth/dnc.json" if authorized(request) => redirect("302 Found", "/dnc.json"),
        "/auth/ok" if authorized(request) => reply("200 OK", &[], "text/plain", "SUCCESS"),
        "/auth/dnc.json" | "/auth/ok" => reply(
            "401 Unauthorized",
            &[("WWW-Authenticate", challenge.as_str())],
            "text/plain",
            "Not authorized\n",
        ),
        "/moved" => redirect("301 Moved Permanently", "/dnc.json"),
        "/doc.json" => reply("200 OK", &[], "application/json", DOC),
        "/static/dnc.js" => reply(
            "200 OK",
            &[],
            "application/javascript",
            "document.body[0]['$data'] = [];\n",
        ),
        "/static/generated" => {
            let body = format!("{{\"generated\": {:?}}}\n", fixture.generated);
            reply("200 OK", &[], "application/json", &body)
        }
        _ => {
            if let Some(n) = path.strip_prefix("/loop/").and_then(|n| n.parse::<u64>().ok()) {
                return redirect("302 Found", &format!("/loop/{}", n + 1));
            }
            if let Some(id) = path.strip_prefix("/dnc/").and_then(|n| n.parse::<u64>().ok()) {
                return match item(id) {
                    Some(body) => reply("200 OK", &[], "application/json", &body),
                    None => reply("404 Not Found", &[], "text/plain", ""),
                };
            }
            reply("404 Not Found", &[], "text/plain", "")
        }
    }
}

fn records() -> Vec<serde_json::Value> {
    serde_json::from_str(DNC).unwrap()
}

fn item(id: u64) -> Option<String> {
    records()
        .into_iter()
        .find(|r| r["id"].as_u64() == Some(id))
        .map(|r| r.to_string())
}

/// `?city=Boston&name=...`: every pair must match the record's field text.
fn filter(query: &str) -> String {
    let pairs: Vec<(&str, &str)> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    let matching: Vec<serde_json::Value> = records()
        .into_iter()
        .filter(|r| {
            pairs.iter().all(|(k, v)| match &r[*k] {
                serde_json::Value::String(s) => s == *v,
                serde_json::Value::Null => false,
                other => other.to_string() == *v,
            })
        })
        .collect();
    serde_json::Value::Array(matching).to_string()
}

fn redirect(status: &str, location: &str) -> String {
    reply(status, &[("Location", location)], "text/plain", "")
}

fn reply(status: &str, headers: &[(&str, &str)], content_type: &str, body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        content_type,
        body.len()
    );
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}
