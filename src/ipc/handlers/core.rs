use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataDir": state.session.data_dir().to_string_lossy(),
        }),
    )
}

fn handle_data_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dir = state.session.data_dir().to_path_buf();
    match open::that(&dir) {
        Ok(()) => ok(&req.id, json!({ "path": dir.to_string_lossy() })),
        Err(e) => err(&req.id, "open_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "data.open" => Some(handle_data_open(state, req)),
        _ => None,
    }
}
