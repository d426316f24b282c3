use crate::ipc::error::{err, ok};
use crate::ipc::params::str_param;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_log_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let count = state.session.sent_log.entries().len();
    ok(&req.id, json!({ "hasEntries": count > 0, "count": count }))
}

fn handle_log_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = str_param(req, "path") else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    if !state.session.sent_log.has_entries() {
        return err(&req.id, "log_empty", "No sent emails to export yet.", None);
    }
    let out = PathBuf::from(path);
    match state.session.sent_log.export_to(&out) {
        Ok(lines) => ok(&req.id, json!({ "path": path, "lines": lines })),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

fn handle_log_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.sent_log.clear() {
        Ok(()) => ok(&req.id, json!({ "hasEntries": false })),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "log.status" => Some(handle_log_status(state, req)),
        "log.export" => Some(handle_log_export(state, req)),
        "log.clear" => Some(handle_log_clear(state, req)),
        _ => None,
    }
}
