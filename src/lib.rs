//! fix-broken-img: replace plain `<img>` elements with a self-healing
//! `fix-broken-img` element that shows a spinner while loading and a
//! fallback label when the image fails.
//!
//! - [`dom`]: arena document with a mutation feed and custom element reactions
//! - [`element`]: the per-element controller state machine
//! - [`scanner`]: converts each plain image exactly once
//! - [`host`]: the page and event loop tying them together
//!
//! ```ignore
//! let mut page = Page::load(r#"<body><img src="cat.png"></body>"#)?;
//! page.boot();
//! page.resolve_loads(|_| LoadOutcome::Error);
//! ```

pub mod bundle;
pub mod cli;
pub mod config;
pub mod dom;
pub mod element;
pub mod host;
pub mod logger;
pub mod scanner;
pub mod utils;

pub use config::{ConfigHandle, WidgetConfig};
pub use element::{FixBrokenImg, LoadOutcome, LoadState};
pub use host::{Page, auto_init, init};
