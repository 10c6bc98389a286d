// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! SOS contact registry

use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SafetyError, SafetyResult};

/// An emergency contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SosContact {
    id: String,
    /// Display name
    pub name: String,
    /// Empty means the contact cannot receive an SOS
    pub phone: String,
    /// Kept for display; not used for SOS
    pub email: String,
}

impl SosContact {
    /// Assigned by the registry
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Contacts without a phone number are kept for editing but never messaged
    pub fn is_usable(&self) -> bool {
        !self.phone.is_empty()
    }
}

/// Field-level contact edit; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactUpdate {
    /// New name
    pub name: Option<String>,
    /// New phone number
    pub phone: Option<String>,
    /// New email
    pub email: Option<String>,
}

impl ContactUpdate {
    /// Set the name
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set the phone number
    pub fn phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    /// Set the email
    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// Ordered, shared list of SOS contacts
#[derive(Debug, Clone, Default)]
pub struct ContactRegistry {
    contacts: Arc<RwLock<Vec<SosContact>>>,
}

impl ContactRegistry {
    /// Empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contact under a freshly generated id
    pub fn add(&self, name: &str, phone: &str, email: &str) -> SosContact {
        let contact = SosContact {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            email: email.trim().to_string(),
        };

        self.contacts.write().push(contact.clone());
        info!("Added SOS contact: {} ({})", contact.name, contact.id);
        contact
    }

    /// Apply the set fields; `NotFound` for an unknown id
    pub fn update(&self, id: &str, update: ContactUpdate) -> SafetyResult<SosContact> {
        let mut contacts = self.contacts.write();
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SafetyError::NotFound(id.to_string()))?;

        if let Some(name) = update.name {
            contact.name = name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            contact.phone = phone.trim().to_string();
        }
        if let Some(email) = update.email {
            contact.email = email.trim().to_string();
        }

        info!("Updated SOS contact: {}", id);
        Ok(contact.clone())
    }

    /// `NotFound` for an unknown id
    pub fn remove(&self, id: &str) -> SafetyResult<SosContact> {
        let mut contacts = self.contacts.write();
        let index = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| SafetyError::NotFound(id.to_string()))?;

        let removed = contacts.remove(index);
        info!("Removed SOS contact: {}", id);
        Ok(removed)
    }

    /// Contact by id
    pub fn get(&self, id: &str) -> Option<SosContact> {
        self.contacts.read().iter().find(|c| c.id == id).cloned()
    }

    /// All contacts in insertion order
    pub fn list(&self) -> Vec<SosContact> {
        self.contacts.read().clone()
    }

    /// Contacts with a phone number
    pub fn usable(&self) -> Vec<SosContact> {
        self.contacts.read().iter().filter(|c| c.is_usable()).cloned().collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.contacts.read().len()
    }

    /// Whether there are none
    pub fn is_empty(&self) -> bool {
        self.contacts.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_unique_ids_in_order() {
        let registry = ContactRegistry::new();
        let a = registry.add("Mom", "+1555", "");
        let b = registry.add("Mom", "+1555", "mom@example.com");

        assert_ne!(a.id(), b.id());
        let list = registry.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id(), a.id());
        assert_eq!(list[1].id(), b.id());
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let registry = ContactRegistry::new();
        let contact = registry.add("Alex", " +1555 ", "alex@example.com");
        assert_eq!(contact.phone, "+1555");

        let updated = registry
            .update(contact.id(), ContactUpdate::default().phone("+1666"))
            .unwrap();
        assert_eq!(updated.id(), contact.id());
        assert_eq!(updated.name, "Alex");
        assert_eq!(updated.phone, "+1666");
        assert_eq!(updated.email, "alex@example.com");
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let registry = ContactRegistry::new();
        registry.add("Sam", "+1555", "");

        let err = registry.update("missing", ContactUpdate::default().name("x")).unwrap_err();
        assert_eq!(err, SafetyError::NotFound("missing".to_string()));
        assert_eq!(registry.remove("missing").unwrap_err(), SafetyError::NotFound("missing".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].name, "Sam");
    }

    #[test]
    fn test_contact_without_phone_is_kept_but_unusable() {
        let registry = ContactRegistry::new();
        let email_only = registry.add("Pat", "", "pat@example.com");
        registry.add("Jo", "+1777", "");

        assert_eq!(registry.len(), 2);
        assert!(!email_only.is_usable());
        let usable = registry.usable();
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].name, "Jo");

        let removed = registry.remove(email_only.id()).unwrap();
        assert_eq!(removed.name, "Pat");
        assert!(registry.get(email_only.id()).is_none());
    }
}
