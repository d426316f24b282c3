use crate::ipc::error::{err, ok};
use crate::ipc::params::{str_param, typed_param};
use crate::ipc::types::{AppState, Request};
use crate::mailer::{send_batch, OutgoingMatch, ScriptTransport};
use crate::matcher::MatchRecord;
use crate::template::{fill_template, normalize_body_text};
use serde_json::json;

/// Re-renders subject and body from the given templates for every item
/// that did not arrive with its own text.
fn apply_templates(batch: &mut [OutgoingMatch], subject: Option<&str>, body: Option<&str>) {
    for item in batch.iter_mut() {
        let record = MatchRecord {
            firstname: item.firstname.clone(),
            lastname: item.lastname.clone(),
            email: item.email.clone(),
            studentid: item.studentid.clone(),
            file_path: item.file_path.clone(),
            ..Default::default()
        };
        if let Some(t) = subject {
            if item.subject.is_empty() {
                item.subject = fill_template(t, &record);
            }
        }
        if let Some(t) = body {
            if item.body.is_empty() {
                item.body = normalize_body_text(&fill_template(t, &record));
            }
        }
    }
}

fn handle_send_batch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut batch: Vec<OutgoingMatch> = match typed_param(req, "matches") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    if batch.is_empty() {
        return err(&req.id, "bad_params", "No matched recipients to send.", None);
    }
    apply_templates(
        &mut batch,
        str_param(req, "subjectTemplate"),
        str_param(req, "bodyTemplate"),
    );

    let Some(script) = state.session.prepared_script() else {
        return err(
            &req.id,
            "script_unavailable",
            "Outlook AppleScript not available.",
            Some(json!({ "hasLogEntries": state.session.sent_log.has_entries() })),
        );
    };
    let transport = ScriptTransport::new(state.session.config.mail_runner.clone(), script);

    match send_batch(&transport, &batch, &state.session.sent_log) {
        Ok(outcome) => {
            let has_log_entries = state.session.sent_log.has_entries();
            match outcome.failure {
                None => ok(
                    &req.id,
                    json!({ "sent": outcome.sent, "hasLogEntries": has_log_entries }),
                ),
                Some(message) => err(
                    &req.id,
                    "send_failed",
                    message,
                    Some(json!({ "sent": outcome.sent, "hasLogEntries": has_log_entries })),
                ),
            }
        }
        Err(e) => err(&req.id, "log_write_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "send.batch" => Some(handle_send_batch(state, req)),
        _ => None,
    }
}
