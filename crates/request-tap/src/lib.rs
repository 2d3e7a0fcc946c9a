//! Observation of a single outgoing browser request.
//!
//! A tap is armed before a page flow starts, watches traffic for the first
//! request whose URL matches a glob pattern, records it, and prevents it from
//! reaching the origin server. Two capture strategies exist behind the
//! [`InterceptStrategy`] seam:
//!
//! * [`CdpFetchStrategy`] pauses requests inside the browser via the CDP
//!   `Fetch` domain and aborts the matching one.
//! * [`ProxyCaptureStrategy`] runs a loopback HTTP proxy the browser is
//!   launched against and refuses the matching request at the socket.
//!
//! Whichever strategy is used, at most one request is ever captured per
//! armed tap and the watch machinery is torn down on every exit path.

pub mod cdp_fetch;
pub mod errors;
pub mod pattern;
pub mod proxy;
pub mod tap;
mod types;

pub use cdp_fetch::CdpFetchStrategy;
pub use errors::TapError;
pub use pattern::UrlPattern;
pub use proxy::ProxyCaptureStrategy;
pub use tap::{ArmedTap, InterceptStrategy, PageTap, RequestTap};
pub use types::{InterceptedRequest, StrategyKind};
