//! # Handlers Module
//!
//! The CRUD handlers behind every generated route. One handler coroutine is
//! registered per route; it captures the route's table and action and runs
//! them against the shared [`Store`].
//!
//! | Action  | Success                | Failure                                   |
//! |---------|------------------------|-------------------------------------------|
//! | List    | 200 `{"resources": []}`| 400 unknown column / bad page             |
//! | Read    | 200 row                | 404                                       |
//! | Create  | 201 row                | 400 no body / already exists, 403 missing |
//! | Replace | 204, or 201 row        | 400 no body, 403 missing column           |
//! | Update  | 204, or 201 row        | 400 no body / unknown column              |
//! | Delete  | 204                    | 404                                       |
//! | Options | 204 + `Allow`          |                                           |

mod crud;

pub use crud::handle;

use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use crate::routes::RouteMeta;
use crate::store::Store;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Register a handler coroutine for every route.
///
/// # Safety
///
/// Spawns coroutines through [`Dispatcher::register_handler`]; the `may`
/// runtime must be configured first.
pub unsafe fn register_from_routes(dispatcher: &mut Dispatcher, routes: &[RouteMeta], store: Arc<Store>) {
    let mut seen = HashSet::with_capacity(routes.len());
    for route in routes {
        // Collection and item OPTIONS share one handler.
        if !seen.insert(route.handler_name.as_str()) {
            continue;
        }
        let table = Arc::clone(&route.table);
        let action = route.action;
        let store = Arc::clone(&store);
        // SAFETY: forwarded from the caller.
        unsafe {
            dispatcher.register_handler(&route.handler_name, move |req: HandlerRequest| {
                let response = match handle(&store, &table, action, &req) {
                    Ok(resp) => resp,
                    Err(err) => {
                        if err.status() >= 500 {
                            warn!(
                                request_id = %req.request_id,
                                table = %table.name,
                                action = %action,
                                error = %err,
                                "Handler failed"
                            );
                        }
                        HandlerResponse::from(err)
                    }
                };
                let _ = req.reply_tx.send(response);
            });
        }
    }
    info!(handlers = dispatcher.handlers.len(), "Table handlers registered");
}
