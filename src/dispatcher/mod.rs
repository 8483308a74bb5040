//! # Dispatcher Module
//!
//! Coroutine-based handler dispatch. Each generated endpoint has a handler
//! coroutine (spawned with `may`) reading [`HandlerRequest`]s from a channel;
//! the dispatcher sends the matched request, runs the middleware chain around
//! it and waits for the [`HandlerResponse`] on a reply channel.
//!
//! ```rust,ignore
//! use tablegate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
//!
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.register_handler("read_artist", |req: HandlerRequest| {
//!         let id = req.get_path_param("id").unwrap_or_default().to_string();
//!         let _ = req.reply_tx.send(HandlerResponse::json(200, serde_json::json!({ "id": id })));
//!     });
//! }
//! ```
//!
//! Handler panics are caught and answered with 500; a handler that drops its
//! reply channel yields 503.

mod core;

pub use core::{
    Dispatcher, HandlerRequest, HandlerResponse, HandlerSender, HeaderVec, StaticHeaders,
    MAX_INLINE_HEADERS,
};
