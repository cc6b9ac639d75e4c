//! Trading-partner pairing and policy attributes.

use std::collections::BTreeMap;

/// Identifier key for AS2 names (`AS2-From` / `AS2-To`).
pub const PID_AS2: &str = "as2_id";
/// Identifier key for email addresses (`From`).
pub const PID_EMAIL: &str = "email";
/// Identifier key for the certificate alias of a party.
pub const PID_X509_ALIAS: &str = "x509_alias";

/// Partner receive URL.
pub const PA_AS2_URL: &str = "as2_url";
/// `Disposition-Notification-To` value.
pub const PA_AS2_MDN_TO: &str = "as2_mdn_to";
/// `Disposition-Notification-Options` value.
pub const PA_AS2_MDN_OPTIONS: &str = "as2_mdn_options";
/// `Receipt-delivery-option` URL; its presence selects asynchronous receipts.
pub const PA_AS2_RECEIPT_OPTION: &str = "as2_receipt_option";
/// Signing digest (e.g. `sha256`); its presence enables signing.
pub const PA_SIGN: &str = "sign";
/// Encryption cipher (e.g. `aes256`); its presence enables encryption.
pub const PA_ENCRYPT: &str = "encrypt";

/// Which side of a partnership a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartnerRole {
    /// The party sending the message
    Sender,
    /// The party receiving the message
    Receiver,
}

/// A resolved sender/receiver pair with policy attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partnership {
    /// Partnership name (informational)
    pub name: Option<String>,
    sender_ids: BTreeMap<String, String>,
    receiver_ids: BTreeMap<String, String>,
    attributes: BTreeMap<String, String>,
}

impl Partnership {
    /// Create an empty partnership
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named partnership
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Sender identifier of the given kind
    pub fn sender_id(&self, key: &str) -> Option<&str> {
        self.sender_ids.get(key).map(String::as_str)
    }

    /// Receiver identifier of the given kind
    pub fn receiver_id(&self, key: &str) -> Option<&str> {
        self.receiver_ids.get(key).map(String::as_str)
    }

    /// Identifier for either role
    pub fn id(&self, role: PartnerRole, key: &str) -> Option<&str> {
        match role {
            PartnerRole::Sender => self.sender_id(key),
            PartnerRole::Receiver => self.receiver_id(key),
        }
    }

    /// Set a sender identifier
    pub fn set_sender_id(&mut self, key: &str, value: impl Into<String>) {
        self.sender_ids.insert(key.to_string(), value.into());
    }

    /// Set a receiver identifier
    pub fn set_receiver_id(&mut self, key: &str, value: impl Into<String>) {
        self.receiver_ids.insert(key.to_string(), value.into());
    }

    /// Policy attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set a policy attribute
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Remove a policy attribute
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    /// Builder form of [`set_sender_id`](Self::set_sender_id)
    pub fn with_sender_id(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_sender_id(key, value);
        self
    }

    /// Builder form of [`set_receiver_id`](Self::set_receiver_id)
    pub fn with_receiver_id(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_receiver_id(key, value);
        self
    }

    /// Builder form of [`set_attribute`](Self::set_attribute)
    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Copy identifiers and attributes from `other`, overwriting on conflict.
    pub fn merge_from(&mut self, other: &Partnership) {
        if other.name.is_some() {
            self.name.clone_from(&other.name);
        }
        for (k, v) in &other.sender_ids {
            self.sender_ids.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.receiver_ids {
            self.receiver_ids.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.attributes {
            self.attributes.insert(k.clone(), v.clone());
        }
    }

    /// Partner URL
    pub fn url(&self) -> Option<&str> {
        self.attribute(PA_AS2_URL)
    }

    /// Receipt-delivery-option URL (asynchronous receipts)
    pub fn receipt_option(&self) -> Option<&str> {
        self.attribute(PA_AS2_RECEIPT_OPTION)
    }

    /// Whether receipts are delivered on a separate, later connection
    pub fn is_async_mdn(&self) -> bool {
        self.receipt_option().is_some()
    }

    /// Whether an MDN is requested at all
    pub fn is_requesting_mdn(&self) -> bool {
        self.attribute(PA_AS2_MDN_TO).is_some() || self.attribute(PA_AS2_MDN_OPTIONS).is_some()
    }
}
