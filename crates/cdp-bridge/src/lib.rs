//! Chromium lifecycle and shared page helpers.
//!
//! Every other crate in the workspace talks to the browser through a [`Page`]
//! handed out by [`BrowserHandle`]; nothing else launches or owns a browser
//! process. The handle keeps the event handler drained for the lifetime of
//! the browser and joins it on close.

pub mod browser;
pub mod config;
pub mod errors;
pub mod page;

pub use browser::{launch, BrowserHandle, ContextHandle};
pub use config::BridgeConfig;
pub use errors::BridgeError;
pub use page::{eval_bool, eval_opt_string, navigate, reload};

pub use chromiumoxide::Page;
