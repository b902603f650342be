//! vCard 3.0 rendering of a contact.
//!
//! Only non-empty fields produce a property line. Values are inserted verbatim;
//! `;`, `,` and `\` are not escaped. Name order is `N:Last;First;;;` and the
//! second phone is labelled `TYPE=HOME`.

use crate::pipeline::normalize::normalize_phone;
use common::model::contact::ContactFields;

const CRLF: &str = "\r\n";

pub fn encode(fields: &ContactFields) -> String {
    let mut lines: Vec<String> = vec!["BEGIN:VCARD".into(), "VERSION:3.0".into()];

    if !fields.name.is_empty() {
        let (first, last) = split_name(&fields.name);
        lines.push(format!("FN:{}", fields.name));
        lines.push(format!("N:{};{};;;", last, first));
    }
    if !fields.phone.is_empty() {
        lines.push(format!("TEL;TYPE=CELL:{}", normalize_phone(&fields.phone)));
    }
    if !fields.phone2.is_empty() {
        lines.push(format!("TEL;TYPE=HOME:{}", normalize_phone(&fields.phone2)));
    }
    if !fields.email.is_empty() {
        lines.push(format!("EMAIL;TYPE=INTERNET:{}", fields.email));
    }
    if !fields.company.is_empty() {
        lines.push(format!("ORG:{}", fields.company));
    }
    if !fields.position.is_empty() {
        lines.push(format!("TITLE:{}", fields.position));
    }
    if !fields.website.is_empty() {
        lines.push(format!("URL:{}", website_url(&fields.website)));
    }
    lines.push("END:VCARD".into());

    let mut out = lines.join(CRLF);
    out.push_str(CRLF);
    out
}

/// First whitespace token is the first name, the rest (single-spaced) the last name.
fn split_name(name: &str) -> (&str, String) {
    let mut tokens = name.split_whitespace();
    let first = tokens.next().unwrap_or_default();
    let last = tokens.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn website_url(website: &str) -> String {
    if website.starts_with("http") {
        website.to_string()
    } else {
        format!("https://{}", website)
    }
}
