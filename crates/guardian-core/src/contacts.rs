use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A user-registered guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// Contact details as submitted, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

impl NewContact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            relation: relation.into(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.phone.trim().is_empty() {
            return Err(ValidationError::EmptyField("phone"));
        }
        if self.relation.trim().is_empty() {
            return Err(ValidationError::EmptyField("relation"));
        }
        Ok(())
    }
}

/// Ordered set of emergency contacts. No uniqueness constraint on name or phone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactRegistry {
    contacts: Vec<EmergencyContact>,
}

impl ContactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the stock guardians.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for seed in default_contacts() {
            // Stock entries are non-empty.
            let _ = registry.add(seed);
        }
        registry
    }

    /// Validate and append. On error the registry is unchanged.
    pub fn add(&mut self, contact: NewContact) -> Result<&EmergencyContact, ValidationError> {
        contact.validate()?;
        let NewContact {
            name,
            phone,
            relation,
        } = contact;
        self.contacts.push(EmergencyContact {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            relation: relation.trim().to_string(),
        });
        Ok(&self.contacts[self.contacts.len() - 1])
    }

    pub fn remove(&mut self, id: &str) -> Option<EmergencyContact> {
        let idx = self.contacts.iter().position(|c| c.id == id)?;
        Some(self.contacts.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&EmergencyContact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn list(&self) -> &[EmergencyContact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

pub fn default_contacts() -> Vec<NewContact> {
    vec![
        NewContact::new("Dad", "+1 555-0123", "Family"),
        NewContact::new("Sarah", "+1 555-0199", "Partner"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_preserves_insertion_order() {
        let mut reg = ContactRegistry::new();
        reg.add(NewContact::new("Ana", "1", "Friend")).unwrap();
        reg.add(NewContact::new("Ben", "2", "Brother")).unwrap();
        reg.add(NewContact::new("Ana", "1", "Friend")).unwrap();

        let names: Vec<_> = reg.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Ben", "Ana"]);
        assert_ne!(reg.list()[0].id, reg.list()[2].id);
    }

    #[test]
    fn empty_fields_are_rejected() {
        let mut reg = ContactRegistry::new();
        assert_eq!(
            reg.add(NewContact::new("Ana", "", "Friend")).unwrap_err(),
            ValidationError::EmptyField("phone")
        );
        assert_eq!(
            reg.add(NewContact::new("  ", "1", "Friend")).unwrap_err(),
            ValidationError::EmptyField("name")
        );
        assert_eq!(
            reg.add(NewContact::new("Ana", "1", "")).unwrap_err(),
            ValidationError::EmptyField("relation")
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_by_id() {
        let mut reg = ContactRegistry::with_defaults();
        assert_eq!(reg.len(), 2);
        let id = reg.list()[0].id.clone();

        let removed = reg.remove(&id).unwrap();
        assert_eq!(removed.name, "Dad");
        assert_eq!(reg.len(), 1);
        assert!(reg.get(&id).is_none());
        assert!(reg.remove(&id).is_none());
    }
}
