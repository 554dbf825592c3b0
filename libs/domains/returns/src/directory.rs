//! Contractor directory: resellers, clients and employees by id.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ReturnResult;
use crate::parties::{Contractor, ContractorKind};

/// Lookup of resellers, clients and employees by id.
///
/// `Ok(None)` means the record does not exist; `Err` is reserved for
/// backend failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    /// Get a reseller by ID
    async fn resolve_reseller(&self, id: i64) -> ReturnResult<Option<Contractor>>;

    /// Get a client by ID
    async fn resolve_client(&self, id: i64) -> ReturnResult<Option<Contractor>>;

    /// Get an employee by ID
    async fn resolve_employee(&self, id: i64) -> ReturnResult<Option<Contractor>>;
}

/// Directory backed by in-process maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    resellers: HashMap<i64, Contractor>,
    clients: HashMap<i64, Contractor>,
    employees: HashMap<i64, Contractor>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reseller(mut self, reseller: Contractor) -> Self {
        self.resellers.insert(reseller.id, reseller);
        self
    }

    pub fn with_client(mut self, client: Contractor) -> Self {
        self.clients.insert(client.id, client);
        self
    }

    pub fn with_employee(mut self, employee: Contractor) -> Self {
        self.employees.insert(employee.id, employee);
        self
    }

    fn lookup(
        records: &HashMap<i64, Contractor>,
        id: i64,
        kinds: &[ContractorKind],
    ) -> Option<Contractor> {
        records
            .get(&id)
            .filter(|record| kinds.contains(&record.kind))
            .cloned()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn resolve_reseller(&self, id: i64) -> ReturnResult<Option<Contractor>> {
        Ok(Self::lookup(&self.resellers, id, &[ContractorKind::Seller]))
    }

    // Clients keep whatever kind they were stored with; the orchestrator
    // decides whether a non-customer may be addressed.
    async fn resolve_client(&self, id: i64) -> ReturnResult<Option<Contractor>> {
        Ok(self.clients.get(&id).cloned())
    }

    async fn resolve_employee(&self, id: i64) -> ReturnResult<Option<Contractor>> {
        Ok(Self::lookup(&self.employees, id, &[ContractorKind::Employee]))
    }
}
