use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::TapError;
use crate::pattern::UrlPattern;
use crate::tap::{ArmedTap, InterceptStrategy};
use crate::types::InterceptedRequest;

const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 512 * 1024;
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Captures at the socket: a loopback HTTP proxy the browser is launched
/// against. The matching request is answered with `403 Forbidden` and never
/// forwarded; everything else is tunneled or forwarded untouched.
///
/// TLS traffic only exposes its authority via `CONNECT`, so patterns that
/// rely on the URL path can only match plain-HTTP requests here.
pub struct ProxyCaptureStrategy {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
}

impl ProxyCaptureStrategy {
    /// Binds the proxy socket. Bind before launching the browser and point
    /// its proxy setting at [`proxy_addr`](Self::proxy_addr).
    pub async fn bind(bind_addr: &str) -> Result<Self, TapError> {
        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener: Mutex::new(Some(listener)),
            local_addr,
        })
    }

    /// Address the browser must use as its HTTP(S) proxy.
    pub fn proxy_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Arms against the bound socket. The socket can be armed once.
    pub async fn arm_listener(&self, pattern: &UrlPattern) -> Result<ArmedTap, TapError> {
        let listener = self
            .listener
            .lock()
            .await
            .take()
            .ok_or(TapError::AlreadyArmed)?;

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let watch_cancel = cancel.clone();
        let watch_pattern = pattern.clone();
        let task = tokio::spawn(accept_loop(listener, watch_pattern, tx, watch_cancel));

        info!(addr = %self.local_addr, pattern = %pattern, "request tap armed via loopback proxy");
        Ok(ArmedTap::new(rx, cancel, task))
    }
}

#[async_trait]
impl InterceptStrategy for ProxyCaptureStrategy {
    async fn arm(&self, _page: &Page, pattern: &UrlPattern) -> Result<ArmedTap, TapError> {
        // The page plays no part here; the browser was launched against the
        // proxy address.
        self.arm_listener(pattern).await
    }
}

async fn accept_loop(
    listener: TcpListener,
    pattern: UrlPattern,
    tx: oneshot::Sender<InterceptedRequest>,
    cancel: CancellationToken,
) {
    let mut slot = Some(tx);
    let mut conn_seq: u64 = 0;
    loop {
        let (stream, _peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    warn!("proxy accept failed: {}", err);
                    continue;
                }
            },
        };
        conn_seq += 1;

        match serve(stream, &pattern, conn_seq, &cancel).await {
            Ok(Some(captured)) => {
                if let Some(tx) = slot.take() {
                    info!(url = %captured.url, method = %captured.method, "captured matching request");
                    let _ = tx.send(captured);
                }
                break;
            }
            Ok(None) => {}
            Err(err) => debug!("proxy connection ended with error: {}", err),
        }
    }
    // Dropping the listener makes later requests fail fast instead of
    // queueing against a watch that no longer exists. Forward tasks already
    // in flight wind down on the shared token.
}

/// Handles one accepted connection up to the capture decision. Non-matching
/// traffic is handed off to a background tunnel or forward task.
async fn serve(
    mut stream: TcpStream,
    pattern: &UrlPattern,
    conn_seq: u64,
    cancel: &CancellationToken,
) -> std::io::Result<Option<InterceptedRequest>> {
    let (raw_head, leftover) = match timeout(HEAD_TIMEOUT, read_head(&mut stream)).await {
        Ok(Ok(parts)) => parts,
        Ok(Err(err)) => return Err(err),
        Err(_) => {
            debug!("dropping connection that stalled mid-head");
            return Ok(None);
        }
    };

    let head_text = String::from_utf8_lossy(&raw_head).into_owned();
    let Some(head) = RequestHead::parse(&head_text) else {
        refuse(&mut stream, "400 Bad Request").await?;
        return Ok(None);
    };

    if head.method.eq_ignore_ascii_case("CONNECT") {
        let authority = if head.target.contains(':') {
            head.target.clone()
        } else {
            format!("{}:443", head.target)
        };
        // A TLS tunnel only exposes its authority.
        let url = format!("https://{}", authority);
        if pattern.matches(&url) {
            refuse(&mut stream, "403 Forbidden").await?;
            return Ok(Some(InterceptedRequest {
                url,
                method: "CONNECT".to_string(),
                body: None,
                request_id: format!("proxy-{}", conn_seq),
            }));
        }
        tokio::spawn(tunnel(stream, authority, leftover, cancel.clone()));
        return Ok(None);
    }

    if pattern.matches(&head.target) {
        let body = read_body(&mut stream, leftover, head.content_length).await?;
        refuse(&mut stream, "403 Forbidden").await?;
        return Ok(Some(InterceptedRequest {
            url: head.target,
            method: head.method,
            body,
            request_id: format!("proxy-{}", conn_seq),
        }));
    }

    match authority_of(&head.target) {
        Some((host, port)) => {
            tokio::spawn(forward(stream, host, port, raw_head, leftover, cancel.clone()));
            Ok(None)
        }
        None => {
            debug!(target = %head.target, "refusing request that is not in proxy form");
            refuse(&mut stream, "400 Bad Request").await?;
            Ok(None)
        }
    }
}

/// Reads until the end of the request head. Returns the raw head including
/// its terminator plus any body bytes that arrived with it.
async fn read_head(stream: &mut TcpStream) -> std::io::Result<(Vec<u8>, Vec<u8>)> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let leftover = buf.split_off(end + 4);
            return Ok((buf, leftover));
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-head",
            ));
        }
    }
}

async fn read_body(
    stream: &mut TcpStream,
    mut pending: Vec<u8>,
    content_length: usize,
) -> std::io::Result<Option<String>> {
    if content_length == 0 {
        return Ok(None);
    }
    let want = content_length.min(MAX_BODY_BYTES);
    while pending.len() < want {
        let n = stream.read_buf(&mut pending).await?;
        if n == 0 {
            break;
        }
    }
    pending.truncate(want);
    Ok(Some(String::from_utf8_lossy(&pending).into_owned()))
}

async fn refuse(stream: &mut TcpStream, status: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        status
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

async fn tunnel(
    mut client: TcpStream,
    authority: String,
    leftover: Vec<u8>,
    cancel: CancellationToken,
) {
    let mut upstream = match TcpStream::connect(&authority).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(authority = %authority, "tunnel connect failed: {}", err);
            let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
            return;
        }
    };
    if client
        .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
        .await
        .is_err()
    {
        return;
    }
    if !leftover.is_empty() && upstream.write_all(&leftover).await.is_err() {
        return;
    }
    relay(client, upstream, cancel).await;
}

async fn forward(
    mut client: TcpStream,
    host: String,
    port: u16,
    raw_head: Vec<u8>,
    leftover: Vec<u8>,
    cancel: CancellationToken,
) {
    let mut upstream = match TcpStream::connect((host.as_str(), port)).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(host = %host, port, "forward connect failed: {}", err);
            let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
            return;
        }
    };
    // The absolute-form request line is forwarded as-is.
    if upstream.write_all(&raw_head).await.is_err() {
        return;
    }
    if !leftover.is_empty() && upstream.write_all(&leftover).await.is_err() {
        return;
    }
    relay(client, upstream, cancel).await;
}

async fn relay(mut client: TcpStream, mut upstream: TcpStream, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        result = tokio::io::copy_bidirectional(&mut client, &mut upstream) => {
            if let Err(err) = result {
                debug!("relay closed with error: {}", err);
            }
        }
    }
}

struct RequestHead {
    method: String,
    target: String,
    content_length: usize,
}

impl RequestHead {
    fn parse(raw: &str) -> Option<Self> {
        let mut lines = raw.split("\r\n");
        let request_line = lines.next()?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next()?.to_string();
        let target = parts.next()?.to_string();
        parts.next()?;

        let mut content_length = 0;
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        Some(Self {
            method,
            target,
            content_length,
        })
    }
}

fn authority_of(target: &str) -> Option<(String, u16)> {
    let rest = target.strip_prefix("http://")?;
    let authority = rest.split('/').next()?;
    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host.to_string(), port.parse().ok()?)),
        None => Some((authority.to_string(), 80)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn armed_proxy(pattern: &str) -> (ProxyCaptureStrategy, ArmedTap, SocketAddr) {
        let strategy = ProxyCaptureStrategy::bind("127.0.0.1:0").await.unwrap();
        let addr = strategy.proxy_addr();
        let tap = strategy
            .arm_listener(&UrlPattern::new(pattern))
            .await
            .unwrap();
        (strategy, tap, addr)
    }

    async fn send_raw(addr: SocketAddr, payload: &[u8]) -> String {
        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(payload).await.unwrap();
        let mut response = Vec::new();
        let _ = conn.read_to_end(&mut response).await;
        String::from_utf8_lossy(&response).into_owned()
    }

    #[test]
    fn request_head_parses_method_target_and_length() {
        let head =
            RequestHead::parse("POST http://h.example/x HTTP/1.1\r\nContent-Length: 42\r\nHost: h")
                .unwrap();
        assert_eq!(head.method, "POST");
        assert_eq!(head.target, "http://h.example/x");
        assert_eq!(head.content_length, 42);
    }

    #[test]
    fn authority_defaults_the_http_port() {
        assert_eq!(
            authority_of("http://h.example/x"),
            Some(("h.example".to_string(), 80))
        );
        assert_eq!(
            authority_of("http://h.example:8080/x"),
            Some(("h.example".to_string(), 8080))
        );
        assert_eq!(authority_of("/origin-form"), None);
    }

    #[tokio::test]
    async fn matching_plain_request_is_recorded_and_refused() {
        let (_strategy, mut tap, addr) = armed_proxy("*new-message*").await;

        let response = send_raw(
            addr,
            b"POST http://portal.example.com/svc/new-message HTTP/1.1\r\n\
              Host: portal.example.com\r\n\
              Content-Length: 11\r\n\r\nhello=world",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 403"), "got: {response}");

        let captured = tap.wait_for_capture(Duration::from_secs(2)).await.unwrap();
        assert_eq!(captured.url, "http://portal.example.com/svc/new-message");
        assert_eq!(captured.method, "POST");
        assert_eq!(captured.body.as_deref(), Some("hello=world"));
        assert_eq!(captured.request_id, "proxy-1");
        tap.disarm().await.unwrap();
    }

    #[tokio::test]
    async fn matching_connect_is_refused_with_host_url() {
        let (_strategy, mut tap, addr) = armed_proxy("*portal.example.com*").await;

        let response = send_raw(
            addr,
            b"CONNECT portal.example.com:443 HTTP/1.1\r\n\
              Host: portal.example.com:443\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 403"), "got: {response}");

        let captured = tap.wait_for_capture(Duration::from_secs(2)).await.unwrap();
        assert_eq!(captured.url, "https://portal.example.com:443");
        assert_eq!(captured.method, "CONNECT");
        assert_eq!(captured.body, None);
        tap.disarm().await.unwrap();
    }

    #[tokio::test]
    async fn only_the_first_match_is_captured() {
        let (_strategy, mut tap, addr) = armed_proxy("*new-message*").await;

        let first = send_raw(
            addr,
            b"POST http://h.example/new-message HTTP/1.1\r\nContent-Length: 5\r\n\r\nfirst",
        )
        .await;
        assert!(first.starts_with("HTTP/1.1 403"));

        let captured = tap.wait_for_capture(Duration::from_secs(2)).await.unwrap();
        assert_eq!(captured.body.as_deref(), Some("first"));

        // The watch shut down after its capture; a later matching request is
        // refused at the socket or dropped, never answered with a capture.
        let mut late = Vec::new();
        if let Ok(mut conn) = TcpStream::connect(addr).await {
            let _ = conn
                .write_all(
                    b"POST http://h.example/new-message HTTP/1.1\r\nContent-Length: 6\r\n\r\nsecond",
                )
                .await;
            let _ = conn.read_to_end(&mut late).await;
        }
        assert!(!String::from_utf8_lossy(&late).starts_with("HTTP/1.1 403"));
        tap.disarm().await.unwrap();
    }

    #[tokio::test]
    async fn non_matching_request_is_forwarded_upstream() {
        let origin = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin_addr = origin.local_addr().unwrap();
        let origin_task = tokio::spawn(async move {
            let (mut conn, _) = origin.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = conn.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).starts_with("GET http://"));
            conn.write_all(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            conn.shutdown().await.unwrap();
        });

        let (_strategy, mut tap, addr) = armed_proxy("*new-message*").await;
        let request = format!(
            "GET http://{origin_addr}/health HTTP/1.1\r\nHost: {origin_addr}\r\n\r\n"
        );
        let response = send_raw(addr, request.as_bytes()).await;
        assert!(response.starts_with("HTTP/1.1 204"), "got: {response}");

        origin_task.await.unwrap();
        assert!(tap.try_take_capture().is_none());
        tap.disarm().await.unwrap();
    }

    #[tokio::test]
    async fn arming_twice_is_rejected() {
        let strategy = ProxyCaptureStrategy::bind("127.0.0.1:0").await.unwrap();
        let pattern = UrlPattern::new("*new-message*");
        let tap = strategy.arm_listener(&pattern).await.unwrap();

        let second = strategy.arm_listener(&pattern).await;
        assert!(matches!(second, Err(TapError::AlreadyArmed)));
        tap.disarm().await.unwrap();
    }
}
