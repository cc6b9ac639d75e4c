//! In-memory partnership and certificate resolvers.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Certificate, CertificateResolver, PartnershipResolver, PrivateKey};
use crate::error::{As2Error, Result};
use crate::message::{PartnerRole, Partnership, PID_AS2, PID_X509_ALIAS};

/// Partnerships keyed by `(sender AS2 ID, receiver AS2 ID)`.
#[derive(Debug, Default)]
pub struct PartnershipDirectory {
    partnerships: RwLock<HashMap<(String, String), Partnership>>,
}

impl PartnershipDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a partnership. It must carry sender and receiver AS2 IDs.
    pub fn insert(&self, partnership: Partnership) -> Result<()> {
        let key = Self::key(&partnership)?;
        self.partnerships
            .write()
            .map_err(|_| As2Error::Partnership("Partnership directory poisoned".to_string()))?
            .insert(key, partnership);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(self, partnership: Partnership) -> Result<Self> {
        self.insert(partnership)?;
        Ok(self)
    }

    /// Number of registered partnerships
    pub fn len(&self) -> usize {
        self.partnerships.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(partnership: &Partnership) -> Result<(String, String)> {
        let sender = partnership
            .sender_id(PID_AS2)
            .ok_or_else(|| As2Error::Partnership("Partnership has no sender AS2 ID".to_string()))?;
        let receiver = partnership.receiver_id(PID_AS2).ok_or_else(|| {
            As2Error::Partnership("Partnership has no receiver AS2 ID".to_string())
        })?;
        Ok((sender.to_string(), receiver.to_string()))
    }
}

impl PartnershipResolver for PartnershipDirectory {
    fn resolve(&self, partnership: &mut Partnership) -> Result<()> {
        let key = Self::key(partnership)?;
        let partnerships = self
            .partnerships
            .read()
            .map_err(|_| As2Error::Partnership("Partnership directory poisoned".to_string()))?;
        let stored = partnerships.get(&key).ok_or_else(|| {
            As2Error::Partnership(format!("No partnership from {} to {}", key.0, key.1))
        })?;
        partnership.merge_from(stored);
        Ok(())
    }
}

/// Certificates and keys keyed by alias.
///
/// The alias for a role comes from the partnership's `x509_alias` identifier.
#[derive(Debug, Default)]
pub struct CertificateStore {
    certificates: HashMap<String, Certificate>,
    keys: HashMap<String, PrivateKey>,
}

impl CertificateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate under `alias`
    pub fn with_certificate(mut self, alias: &str, cert: Certificate) -> Self {
        self.certificates.insert(alias.to_string(), cert);
        self
    }

    /// Add a certificate and its private key under `alias`
    pub fn with_key_pair(mut self, alias: &str, cert: Certificate, key: PrivateKey) -> Self {
        self.certificates.insert(alias.to_string(), cert);
        self.keys.insert(alias.to_string(), key);
        self
    }

    fn alias(partnership: &Partnership, role: PartnerRole) -> Result<&str> {
        partnership.id(role, PID_X509_ALIAS).ok_or_else(|| {
            As2Error::Certificate(format!("Partnership has no {role:?} certificate alias"))
        })
    }
}

impl CertificateResolver for CertificateStore {
    fn certificate(&self, partnership: &Partnership, role: PartnerRole) -> Result<Certificate> {
        let alias = Self::alias(partnership, role)?;
        self.certificates
            .get(alias)
            .cloned()
            .ok_or_else(|| As2Error::Certificate(format!("No certificate for alias {alias}")))
    }

    fn private_key(&self, _partnership: &Partnership, cert: &Certificate) -> Result<PrivateKey> {
        let alias = self
            .certificates
            .iter()
            .find(|(_, c)| *c == cert)
            .map(|(alias, _)| alias)
            .ok_or_else(|| As2Error::Certificate("Certificate not in store".to_string()))?;
        self.keys
            .get(alias)
            .cloned()
            .ok_or_else(|| As2Error::Certificate(format!("No private key for alias {alias}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PA_AS2_URL;

    fn alpha_beta() -> Partnership {
        Partnership::named("alpha-beta")
            .with_sender_id(PID_AS2, "alpha")
            .with_receiver_id(PID_AS2, "beta")
            .with_sender_id(PID_X509_ALIAS, "alpha-cert")
            .with_receiver_id(PID_X509_ALIAS, "beta-cert")
            .with_attribute(PA_AS2_URL, "http://beta.example/as2")
    }

    #[test]
    fn test_directory_resolves_by_ids() {
        let directory = PartnershipDirectory::new().with(alpha_beta()).unwrap();
        assert_eq!(directory.len(), 1);

        let mut partial = Partnership::new()
            .with_sender_id(PID_AS2, "alpha")
            .with_receiver_id(PID_AS2, "beta");
        directory.resolve(&mut partial).unwrap();
        assert_eq!(partial.url(), Some("http://beta.example/as2"));
        assert_eq!(partial.name.as_deref(), Some("alpha-beta"));
    }

    #[test]
    fn test_directory_unknown_pair() {
        let directory = PartnershipDirectory::new().with(alpha_beta()).unwrap();
        let mut reversed = Partnership::new()
            .with_sender_id(PID_AS2, "beta")
            .with_receiver_id(PID_AS2, "alpha");
        assert!(matches!(
            directory.resolve(&mut reversed),
            Err(As2Error::Partnership(_))
        ));
    }

    #[test]
    fn test_directory_rejects_incomplete() {
        let directory = PartnershipDirectory::new();
        assert!(directory
            .insert(Partnership::new().with_sender_id(PID_AS2, "alpha"))
            .is_err());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_certificate_store_by_role() {
        let store = CertificateStore::new()
            .with_key_pair(
                "alpha-cert",
                Certificate(b"alpha".to_vec()),
                PrivateKey(b"alpha-key".to_vec()),
            )
            .with_certificate("beta-cert", Certificate(b"beta".to_vec()));
        let p = alpha_beta();

        let sender = store.certificate(&p, PartnerRole::Sender).unwrap();
        assert_eq!(sender, Certificate(b"alpha".to_vec()));
        assert_eq!(
            store.private_key(&p, &sender).unwrap(),
            PrivateKey(b"alpha-key".to_vec())
        );

        let receiver = store.certificate(&p, PartnerRole::Receiver).unwrap();
        assert!(store.private_key(&p, &receiver).is_err());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let key = PrivateKey(vec![1, 2, 3]);
        assert_eq!(format!("{key:?}"), "PrivateKey([REDACTED; 3 bytes])");
    }
}
