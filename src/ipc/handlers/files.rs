use crate::ipc::error::{err, ok};
use crate::ipc::params::{decode_base64, str_param, typed_param};
use crate::ipc::types::{AppState, Request};
use crate::resolver::DropEntry;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryParam {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data_base64: Option<String>,
}

fn to_drop_entry(param: EntryParam) -> Result<Option<DropEntry>, String> {
    if let Some(data) = param.data_base64 {
        let data = decode_base64(&data)?;
        let name = param.name.unwrap_or_default();
        return Ok(Some(DropEntry::Blob { name, data }));
    }
    match param.path {
        Some(path) => Ok(DropEntry::from_location(&path)),
        None => Err("entry needs either path or dataBase64".to_string()),
    }
}

fn handle_files_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let params: Vec<EntryParam> = match typed_param(req, "entries") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let mut entries = Vec::with_capacity(params.len());
    for param in params {
        match to_drop_entry(param) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(msg) => return err(&req.id, "bad_params", msg, None),
        }
    }

    let resolution = state.session.add_entries(&entries);
    let skipped: Vec<serde_json::Value> = resolution
        .skipped
        .iter()
        .map(|e| {
            json!({
                "entry": e.entry(),
                "kind": e.code(),
                "message": e.to_string(),
            })
        })
        .collect();
    ok(
        &req.id,
        json!({
            "files": state.session.files,
            "added": resolution.files,
            "skipped": skipped,
        }),
    )
}

fn handle_files_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "files": state.session.files }))
}

fn handle_files_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = str_param(req, "path") else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    state.session.remove_file(path);
    ok(&req.id, json!({ "files": state.session.files }))
}

fn handle_files_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.clear_files();
    ok(&req.id, json!({}))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "files.add" => Some(handle_files_add(state, req)),
        "files.list" => Some(handle_files_list(state, req)),
        "files.remove" => Some(handle_files_remove(state, req)),
        "files.clear" => Some(handle_files_clear(state, req)),
        _ => None,
    }
}
