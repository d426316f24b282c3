use crate::ipc::error::{err, ok};
use crate::ipc::params::{str_param, typed_param};
use crate::ipc::types::{AppState, Request};
use crate::store::MessageTemplate;
use serde_json::json;

fn handle_templates_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "templates": state.session.templates.list() }))
}

fn handle_templates_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let template: MessageTemplate = match typed_param(req, "") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    if template.name.trim().is_empty() {
        return err(&req.id, "bad_params", "Template name is required.", None);
    }
    match state.session.templates.save(template) {
        Ok(templates) => ok(&req.id, json!({ "templates": templates })),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

fn handle_templates_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = str_param(req, "name") else {
        return err(&req.id, "bad_params", "missing params.name", None);
    };
    match state.session.templates.delete(name) {
        Ok(templates) => ok(&req.id, json!({ "templates": templates })),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "templates.list" => Some(handle_templates_list(state, req)),
        "templates.save" => Some(handle_templates_save(state, req)),
        "templates.delete" => Some(handle_templates_delete(state, req)),
        _ => None,
    }
}
