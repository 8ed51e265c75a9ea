//! MIME message assembly
//!
//! Builds a `multipart/mixed` message with a plain-text body and an
//! optional base64 attachment, CRLF line endings throughout.

use super::OutgoingMail;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Local};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Base64 body lines are wrapped at this width
const LINE_WIDTH: usize = 76;

/// Random multipart boundary
pub fn boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("zoltar-{}", token)
}

/// Render `mail` as an RFC 5322 message
pub fn render(mail: &OutgoingMail, boundary: &str, date: DateTime<Local>) -> String {
    let mut out = String::new();
    let mut line = |text: &str| {
        out.push_str(text);
        out.push_str("\r\n");
    };

    line(&format!("From: {}", mail.from));
    line(&format!("To: {}", mail.to));
    line(&format!("Subject: {}", encode_header(&mail.subject)));
    line(&format!("Date: {}", date.to_rfc2822()));
    line("MIME-Version: 1.0");
    line(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"",
        boundary
    ));
    line("");

    line(&format!("--{}", boundary));
    line("Content-Type: text/plain; charset=utf-8");
    line("Content-Transfer-Encoding: 8bit");
    line("");
    for body_line in mail.body.lines() {
        line(body_line);
    }

    if let Some(ref attachment) = mail.attachment {
        line(&format!("--{}", boundary));
        line("Content-Type: application/octet-stream");
        line("Content-Transfer-Encoding: base64");
        line(&format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            attachment.filename.replace('"', "")
        ));
        line("");
        let encoded = BASE64_STANDARD.encode(&attachment.data);
        // base64 output is ASCII, so byte chunks are valid str slices
        for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
            line(std::str::from_utf8(chunk).unwrap_or_default());
        }
    }

    line(&format!("--{}--", boundary));
    out
}

/// RFC 2047 encoded-word for non-ASCII header values
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", BASE64_STANDARD.encode(value.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::Attachment;
    use chrono::TimeZone;

    fn mail(attachment: Option<Attachment>) -> OutgoingMail {
        OutgoingMail {
            from: "photobooth@umich.edu".to_string(),
            to: "jdoe@umich.edu".to_string(),
            subject: "Hello from PCAS!".to_string(),
            body: "Thanks for trying the PCAS SuperHero Booth!".to_string(),
            attachment,
        }
    }

    fn date() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn test_headers_and_body() {
        let text = render(&mail(None), "b1", date());
        assert!(text.starts_with("From: photobooth@umich.edu\r\nTo: jdoe@umich.edu\r\n"));
        assert!(text.contains("Subject: Hello from PCAS!\r\n"));
        assert!(text.contains("Content-Type: multipart/mixed; boundary=\"b1\"\r\n"));
        assert!(text.contains("\r\n\r\nThanks for trying the PCAS SuperHero Booth!\r\n"));
        assert!(text.ends_with("--b1--\r\n"));
        assert!(!text.contains("attachment;"));
    }

    #[test]
    fn test_attachment_is_wrapped_base64() {
        let data = vec![0xABu8; 200];
        let text = render(
            &mail(Some(Attachment {
                filename: "jdoe_alice_Y_N_cart.jpg".to_string(),
                data: data.clone(),
            })),
            "b2",
            date(),
        );

        assert!(text.contains("filename=\"jdoe_alice_Y_N_cart.jpg\""));
        let start = text.find("base64\r\nContent-Disposition").unwrap();
        let body = &text[start..];
        let payload: String = body
            .split("\r\n")
            .skip(3)
            .take_while(|l| !l.starts_with("--"))
            .collect();
        assert!(body
            .split("\r\n")
            .skip(3)
            .all(|l| l.len() <= LINE_WIDTH));
        assert_eq!(BASE64_STANDARD.decode(payload).unwrap(), data);
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let mut m = mail(None);
        m.subject = "Hallo aus Zürich".to_string();
        let text = render(&m, "b3", date());
        assert!(text.contains("Subject: =?utf-8?B?"));
    }

    #[test]
    fn test_boundary_is_random() {
        assert_ne!(boundary(), boundary());
        assert!(boundary().starts_with("zoltar-"));
    }
}
