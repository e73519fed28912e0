//! Webhook signature calculation and parsing.
//!
//! Stripe signs each webhook delivery with HMAC-SHA256 over `"{timestamp}.{raw body}"`, using the endpoint's
//! signing secret as the key. The result is sent hex-encoded in the `Stripe-Signature` header as
//! `t=<timestamp>,v1=<signature>`. The header may carry several `v1` entries (after a secret rotation); the
//! check passes if any of them matches.

use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The hex-encoded HMAC-SHA256 signature of `"{timestamp}.{body}"` under `secret`.
pub fn calculate_signature(secret: &str, timestamp: i64, body: &[u8]) -> String {
    // HMAC keys can be any length, so new_from_slice cannot fail
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    to_hex(&mac.finalize().into_bytes())
}

/// A parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl FromStr for SignatureHeader {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in s.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => {
                    timestamp = Some(v.parse::<i64>().map_err(|e| format!("Invalid timestamp: {e}"))?);
                },
                Some(("v1", v)) => signatures.push(v.to_string()),
                // Unknown schemes (e.g. the legacy v0) are ignored
                Some(_) => {},
                None => return Err(format!("Malformed signature element: {part}")),
            }
        }
        let timestamp = timestamp.ok_or_else(|| "No timestamp in signature header".to_string())?;
        if signatures.is_empty() {
            return Err("No v1 signature in signature header".to_string());
        }
        Ok(Self { timestamp, signatures })
    }
}

/// Check the signature header against the request body. Returns false for malformed headers.
pub fn verify_signature(secret: &str, header_value: &str, body: &[u8]) -> bool {
    let Ok(header) = header_value.parse::<SignatureHeader>() else {
        return false;
    };
    let expected = calculate_signature(secret, header.timestamp, body);
    header.signatures.iter().any(|sig| sig == &expected)
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
