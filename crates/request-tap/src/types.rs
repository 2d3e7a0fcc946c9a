use serde::{Deserialize, Serialize};

/// A single outgoing request recorded by an armed tap.
///
/// The request never reached the origin server; it was blocked the moment it
/// was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    /// Full request URL as the browser issued it.
    pub url: String,
    /// HTTP method, e.g. `POST`.
    pub method: String,
    /// Request body, when one was present and readable.
    pub body: Option<String>,
    /// Identifier of the request within the capturing strategy.
    pub request_id: String,
}

/// Which capture mechanism a tap should arm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Pause and abort inside the browser via the CDP `Fetch` domain.
    #[default]
    CdpFetch,
    /// Observe at the socket through a loopback HTTP proxy.
    ProxyCapture,
}
