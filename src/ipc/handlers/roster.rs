use crate::ipc::error::{err, ok};
use crate::ipc::params::{decode_base64, str_param};
use crate::ipc::types::{AppState, Request};
use crate::roster::{parse_roster, RosterError};
use serde_json::json;

fn handle_roster_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let bytes = if let Some(data) = str_param(req, "dataBase64") {
        match decode_base64(data) {
            Ok(b) => b,
            Err(msg) => return err(&req.id, "bad_params", msg, None),
        }
    } else if let Some(path) = str_param(req, "path") {
        match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                return err(
                    &req.id,
                    "unreadable_file",
                    format!("Error reading file: {e}"),
                    Some(json!({ "path": path })),
                )
            }
        }
    } else {
        return err(&req.id, "bad_params", "missing params.path or params.dataBase64", None);
    };

    match parse_roster(&bytes) {
        Ok(roster) => {
            let result = json!({
                "students": roster.students,
                "count": roster.students.len(),
                "sourceLanguage": roster.source_language,
            });
            state.session.roster = Some(roster);
            ok(&req.id, result)
        }
        Err(e) => {
            let details = match &e {
                RosterError::MissingColumns(columns) => Some(json!({ "columns": columns })),
                _ => None,
            };
            err(&req.id, e.code(), e.to_string(), details)
        }
    }
}

fn handle_roster_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (students, language) = match &state.session.roster {
        Some(r) => (json!(r.students), json!(r.source_language)),
        None => (json!([]), serde_json::Value::Null),
    };
    ok(&req.id, json!({ "students": students, "sourceLanguage": language }))
}

fn handle_roster_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.roster = None;
    ok(&req.id, json!({}))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.import" => Some(handle_roster_import(state, req)),
        "roster.get" => Some(handle_roster_get(state, req)),
        "roster.clear" => Some(handle_roster_clear(state, req)),
        _ => None,
    }
}
