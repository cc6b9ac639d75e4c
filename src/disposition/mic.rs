//! Message integrity check (MIC) calculation and comparison.

use base64::Engine;
use sha2::Digest;

use crate::error::{As2Error, Result};
use crate::message::MimeBody;

/// Digest used when the partner's options name none.
pub const DEFAULT_MIC_ALGORITHM: &str = "sha1";

/// Compute `"<base64 digest>, <algorithm>"` over a body part.
///
/// With `include_headers` the digest covers the canonical header block
/// followed by the content; otherwise the content alone. The algorithm
/// name is echoed exactly as given.
pub fn calculate_mic(body: &MimeBody, algorithm: &str, include_headers: bool) -> Result<String> {
    let headers = if include_headers {
        body.headers.to_canonical_bytes()
    } else {
        Vec::new()
    };
    let parts: [&[u8]; 2] = [&headers, &body.content];

    let digest = match algorithm.to_ascii_lowercase().as_str() {
        "sha1" | "sha-1" => digest_parts::<sha1::Sha1>(&parts),
        "sha256" | "sha-256" => digest_parts::<sha2::Sha256>(&parts),
        "sha384" | "sha-384" => digest_parts::<sha2::Sha384>(&parts),
        "sha512" | "sha-512" => digest_parts::<sha2::Sha512>(&parts),
        _ => {
            return Err(As2Error::Crypto(format!(
                "Unsupported MIC algorithm: {algorithm}"
            )))
        },
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(digest);
    Ok(format!("{encoded}, {algorithm}"))
}

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// Remove all whitespace from a MIC string.
pub fn normalize_mic(mic: &str) -> String {
    mic.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Compare two MICs after removing all whitespace.
///
/// Case and algorithm spelling stay significant.
pub fn mic_matches(expected: &str, received: &str) -> bool {
    normalize_mic(expected) == normalize_mic(received)
}

/// Check a returned MIC against the expected one.
///
/// A missing MIC is a mismatch.
pub fn verify_mic(expected: &str, received: Option<&str>) -> Result<()> {
    match received {
        Some(received) if mic_matches(expected, received) => Ok(()),
        received => Err(As2Error::MicMismatch {
            expected: expected.to_string(),
            received: received.unwrap_or_default().to_string(),
        }),
    }
}
