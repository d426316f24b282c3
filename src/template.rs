use quick_xml::escape::escape;
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::matcher::MatchRecord;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\{\{\s*(firstname|lastname|email|studentid)\s*\}\}")
            .expect("placeholder pattern is valid")
    })
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"))
}

/// Substitutes `{{firstname}}`, `{{lastname}}`, `{{email}}` and
/// `{{studentid}}`, case-insensitively. Unknown placeholders stay as typed.
pub fn fill_template(template: &str, record: &MatchRecord) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            match caps[1].to_ascii_lowercase().as_str() {
                "firstname" => record.firstname.clone(),
                "lastname" => record.lastname.clone(),
                "email" => record.email.clone(),
                _ => record.studentid.clone(),
            }
        })
        .into_owned()
}

/// Unifies line endings and `<br>` tags, then emits carriage returns, which
/// is what the mail client expects for plain-text bodies.
pub fn normalize_body_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    line_break_re()
        .replace_all(&unified, "\n")
        .replace('\n', "\r")
}

/// Mail clients handle `&apos;` unevenly, so apostrophes use `&#39;`.
fn escape_html(text: &str) -> String {
    escape(text).replace("&apos;", "&#39;")
}

/// HTML body for the mail client: escaped text, blank lines kept as
/// `&nbsp;`, line breaks as `<br>`.
pub fn format_email_body(text: &str) -> String {
    escape_html(text)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(|line| if line.is_empty() { "&nbsp;" } else { line })
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MatchRecord {
        MatchRecord {
            id: "jan|bakker|/f/jan.pdf".into(),
            firstname: "Jan".into(),
            lastname: "Bakker".into(),
            email: "jan@x.nl".into(),
            studentid: String::new(),
            file_name: "jan.pdf".into(),
            file_path: "/f/jan.pdf".into(),
        }
    }

    #[test]
    fn placeholders_are_case_and_space_insensitive() {
        let out = fill_template(
            "Rubric - {{firstname}} {{ LastName }} <{{EMAIL}}> [{{studentid}}] {{unknown}}",
            &record(),
        );
        assert_eq!(out, "Rubric - Jan Bakker <jan@x.nl> [] {{unknown}}");
    }

    #[test]
    fn body_text_uses_carriage_returns() {
        assert_eq!(normalize_body_text("a\r\nb<br/>c<BR >d\ne"), "a\rb\rc\rd\re");
        assert_eq!(normalize_body_text(""), "");
    }

    #[test]
    fn email_body_is_escaped_and_keeps_blank_lines() {
        assert_eq!(
            format_email_body("Dag Jan,\r\rZie <bijlage> & \"cijfer\"'s"),
            "Dag Jan,<br>&nbsp;<br>Zie &lt;bijlage&gt; &amp; &quot;cijfer&quot;&#39;s"
        );
    }
}
