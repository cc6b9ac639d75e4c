//! `Disposition-Notification-Options` header parsing.
//!
//! ```text
//! signed-receipt-protocol=optional, pkcs7-signature; signed-receipt-micalg=optional, sha256, sha1
//! ```

use crate::error::{As2Error, Result};

const PROTOCOL_PARAM: &str = "signed-receipt-protocol";
const MICALG_PARAM: &str = "signed-receipt-micalg";

/// Parsed receipt options requested by the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispositionOptions {
    /// `required` / `optional` for the signature protocol
    pub protocol_importance: Option<String>,
    /// Signature protocol (e.g. `pkcs7-signature`)
    pub protocol: Option<String>,
    /// `required` / `optional` for the MIC algorithm
    pub micalg_importance: Option<String>,
    /// Acceptable MIC algorithms in preference order
    pub micalgs: Vec<String>,
}

impl DispositionOptions {
    /// Parse the header value. An empty value yields empty options.
    pub fn parse(options: &str) -> Result<Self> {
        let mut parsed = Self::default();

        for param in options.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = param.split_once('=').ok_or_else(|| {
                As2Error::Mdn(format!("Malformed disposition option: {param:?}"))
            })?;
            let mut values = value.split(',').map(str::trim).filter(|v| !v.is_empty());
            let importance = values.next().map(str::to_string);

            match name.trim().to_ascii_lowercase().as_str() {
                PROTOCOL_PARAM => {
                    parsed.protocol_importance = importance;
                    parsed.protocol = values.next().map(str::to_string);
                },
                MICALG_PARAM => {
                    parsed.micalg_importance = importance;
                    parsed.micalgs = values.map(str::to_string).collect();
                },
                other => {
                    tracing::debug!(option = other, "ignoring unknown disposition option");
                },
            }
        }

        Ok(parsed)
    }

    /// Preferred MIC algorithm, if any was requested
    pub fn micalg(&self) -> Option<&str> {
        self.micalgs.first().map(String::as_str)
    }

    /// Whether a signed receipt was requested
    pub fn wants_signed_receipt(&self) -> bool {
        self.protocol.is_some()
    }
}

impl std::str::FromStr for DispositionOptions {
    type Err = As2Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
