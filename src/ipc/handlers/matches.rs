use crate::ipc::error::{err, ok};
use crate::ipc::params::{str_param, typed_param};
use crate::ipc::types::{AppState, Request};
use crate::matcher::MatchRecord;
use crate::template::{fill_template, normalize_body_text};
use serde_json::json;

fn handle_matches_compute(state: &mut AppState, req: &Request) -> serde_json::Value {
    let matches = state.session.matches();
    ok(&req.id, json!({ "matches": matches }))
}

fn handle_template_render(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let record: MatchRecord = match typed_param(req, "match") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let subject = str_param(req, "subject").unwrap_or("");
    let body = str_param(req, "body").unwrap_or("");
    ok(
        &req.id,
        json!({
            "subject": fill_template(subject, &record),
            "body": normalize_body_text(&fill_template(body, &record)),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "matches.compute" => Some(handle_matches_compute(state, req)),
        "template.render" => Some(handle_template_render(state, req)),
        _ => None,
    }
}
