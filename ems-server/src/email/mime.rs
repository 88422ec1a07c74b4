//! Minimal `multipart/mixed` builder for SES raw messages

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// RFC 2045 line length for base64 bodies
const B64_LINE: usize = 76;

fn encode_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / B64_LINE * 2 + 2);
    for chunk in encoded.as_bytes().chunks(B64_LINE) {
        // base64 output is ASCII
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str("\r\n");
    }
    out
}

/// RFC 2047 encoded-word for non-ASCII header values
fn header_value(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

pub fn build_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
    attachments: &[Attachment],
) -> Vec<u8> {
    let boundary = format!("=_ems_{}", uuid::Uuid::new_v4().simple());
    let mut out = String::new();

    out.push_str(&format!("From: {from}\r\n"));
    out.push_str(&format!("To: {to}\r\n"));
    out.push_str(&format!("Subject: {}\r\n", header_value(subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&encode_wrapped(body.as_bytes()));

    for a in attachments {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            a.content_type, a.filename
        ));
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            a.filename
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&encode_wrapped(&a.data));
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_with_attachment() {
        let att = Attachment {
            filename: "ticket-EMS-AAAA2222.txt".to_string(),
            content_type: "text/plain; charset=utf-8",
            data: b"hello ticket".to_vec(),
        };
        let raw = String::from_utf8(build_message(
            "tickets@example.com",
            "maria@example.com",
            "Your tickets",
            "Body text",
            &[att],
        ))
        .unwrap();

        assert!(raw.contains("Subject: Your tickets\r\n"));
        assert!(raw.contains("multipart/mixed; boundary=\"=_ems_"));
        assert!(raw.contains("filename=\"ticket-EMS-AAAA2222.txt\""));
        assert!(raw.contains(&STANDARD.encode(b"hello ticket")));
        assert!(raw.contains(&STANDARD.encode(b"Body text")));
        assert!(raw.trim_end().ends_with("--"));
    }

    #[test]
    fn long_bodies_are_wrapped() {
        let wrapped = encode_wrapped(&[b'x'; 500]);
        assert!(wrapped.lines().all(|l| l.len() <= B64_LINE));
        let joined: String = wrapped.lines().collect();
        assert_eq!(STANDARD.decode(joined).unwrap(), vec![b'x'; 500]);
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        assert_eq!(header_value("Tickets"), "Tickets");
        assert!(header_value("Biljetti għall-EMS").starts_with("=?UTF-8?B?"));
    }
}
