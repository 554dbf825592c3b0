//! Directory entities involved in a return.

use serde::{Deserialize, Serialize};
use strum::Display;

/// What a directory record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContractorKind {
    Customer,
    Seller,
    Employee,
}

/// A reseller, client or employee as returned by the directory.
///
/// All parties share one shape; `kind` tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: i64,
    pub kind: ContractorKind,
    /// Raw name as stored.
    pub name: String,
    /// Formatted full name. May be empty.
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    /// Owning seller, for customers.
    #[serde(default)]
    pub seller_id: Option<i64>,
}

impl Contractor {
    pub fn new(id: i64, kind: ContractorKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            kind,
            full_name: name.clone(),
            name,
            email: None,
            mobile: None,
            seller_id: None,
        }
    }

    pub fn seller(id: i64, name: impl Into<String>) -> Self {
        Self::new(id, ContractorKind::Seller, name)
    }

    pub fn employee(id: i64, name: impl Into<String>) -> Self {
        Self::new(id, ContractorKind::Employee, name)
    }

    /// A customer owned by `seller_id`.
    pub fn customer(id: i64, seller_id: i64, name: impl Into<String>) -> Self {
        Self {
            seller_id: Some(seller_id),
            ..Self::new(id, ContractorKind::Customer, name)
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = Some(mobile.into());
        self
    }

    /// Full name, or the raw name when no full name is known.
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.name
        } else {
            &self.full_name
        }
    }

    pub fn is_customer_of(&self, reseller_id: i64) -> bool {
        self.kind == ContractorKind::Customer && self.seller_id == Some(reseller_id)
    }

    /// Email address if one is set and non-empty.
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.is_empty())
    }

    /// Mobile number if one is set and non-empty.
    pub fn mobile_number(&self) -> Option<&str> {
        self.mobile.as_deref().filter(|mobile| !mobile.is_empty())
    }
}

/// Everything the directory resolved for one request.
#[derive(Debug, Clone)]
pub struct ResolvedParties {
    pub reseller: Contractor,
    pub client: Contractor,
    pub creator: Contractor,
    pub expert: Contractor,
}
