//! Local store seam and an in-memory implementation

use crate::error::{StoreError, StoreResult};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local persistence used by the gateway
///
/// Customer, order, ledger, note and settings storage. Implementations back
/// this with whatever the host application persists to.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Find a customer by email (case-insensitive)
    async fn find_customer_by_email(&self, email: &str) -> StoreResult<Option<LocalCustomer>>;

    /// Insert a customer; the email must be unused
    async fn insert_customer(&self, customer: NewCustomer) -> StoreResult<LocalCustomer>;

    /// Set one metadata entry on a customer
    async fn set_customer_meta(&self, customer_id: u64, key: &str, value: &str)
    -> StoreResult<()>;

    /// Fetch an order
    async fn get_order(&self, id: u64) -> StoreResult<Option<LocalOrder>>;

    /// Overwrite an order
    async fn update_order(&self, order: &LocalOrder) -> StoreResult<()>;

    /// Resolve a discount code
    async fn find_discount(&self, code: &str) -> StoreResult<Option<Discount>>;

    /// Find a ledger row by processor-side id
    async fn find_transaction_by_remote_id(
        &self,
        transaction_id: &str,
    ) -> StoreResult<Option<Transaction>>;

    /// Insert a ledger row
    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction>;

    /// Append a human-readable order note
    async fn add_order_note(&self, order_id: u64, note: &str) -> StoreResult<()>;

    /// Append a note at the domain-event (audit) layer
    async fn add_event_note(&self, object_id: u64, note: &str) -> StoreResult<()>;

    /// Read a mode-scoped setting
    async fn get_setting(&self, mode: Mode, key: &str) -> StoreResult<Option<String>>;
}

/// Stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub object_id: u64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    customers: HashMap<u64, LocalCustomer>,
    orders: HashMap<u64, LocalOrder>,
    discounts: HashMap<String, Discount>,
    transactions: Vec<Transaction>,
    order_notes: Vec<Note>,
    event_notes: Vec<Note>,
    settings: HashMap<(Mode, String), String>,
    next_customer_id: u64,
    next_transaction_id: u64,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an order
    pub fn put_order(&self, order: LocalOrder) {
        self.state.write().orders.insert(order.id, order);
    }

    /// Seed a discount
    pub fn put_discount(&self, code: impl Into<String>, name: impl Into<String>) {
        let code = code.into();
        let discount = Discount {
            code: code.clone(),
            name: name.into(),
        };
        self.state.write().discounts.insert(code, discount);
    }

    /// Remove a discount, as if it was deleted after the cart was computed
    pub fn remove_discount(&self, code: &str) {
        self.state.write().discounts.remove(code);
    }

    /// Seed a setting
    pub fn put_setting(&self, mode: Mode, key: impl Into<String>, value: impl Into<String>) {
        self.state
            .write()
            .settings
            .insert((mode, key.into()), value.into());
    }

    pub fn order(&self, id: u64) -> Option<LocalOrder> {
        self.state.read().orders.get(&id).cloned()
    }

    pub fn customers(&self) -> Vec<LocalCustomer> {
        let mut customers: Vec<_> = self.state.read().customers.values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        customers
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.read().transactions.clone()
    }

    pub fn order_notes(&self, order_id: u64) -> Vec<Note> {
        notes_for(&self.state.read().order_notes, order_id)
    }

    pub fn event_notes(&self, object_id: u64) -> Vec<Note> {
        notes_for(&self.state.read().event_notes, object_id)
    }
}

fn notes_for(notes: &[Note], object_id: u64) -> Vec<Note> {
    notes
        .iter()
        .filter(|n| n.object_id == object_id)
        .cloned()
        .collect()
}

fn note(object_id: u64, body: &str) -> Note {
    Note {
        object_id,
        body: body.to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn find_customer_by_email(&self, email: &str) -> StoreResult<Option<LocalCustomer>> {
        Ok(self
            .state
            .read()
            .customers
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_customer(&self, customer: NewCustomer) -> StoreResult<LocalCustomer> {
        if customer.email.trim().is_empty() {
            return Err(StoreError::Backend("customer email is required".to_string()));
        }

        let mut state = self.state.write();
        if state
            .customers
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&customer.email))
        {
            return Err(StoreError::Conflict(customer.email));
        }

        state.next_customer_id += 1;
        let record = LocalCustomer {
            id: state.next_customer_id,
            email: customer.email,
            name: customer.name,
            user_id: customer.user_id,
            metadata: HashMap::new(),
        };
        state.customers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_customer_meta(
        &self,
        customer_id: u64,
        key: &str,
        value: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        let customer = state
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| StoreError::NotFound(format!("customer {customer_id}")))?;
        customer.metadata.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_order(&self, id: u64) -> StoreResult<Option<LocalOrder>> {
        Ok(self.order(id))
    }

    async fn update_order(&self, order: &LocalOrder) -> StoreResult<()> {
        let mut state = self.state.write();
        match state.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("order {}", order.id))),
        }
    }

    async fn find_discount(&self, code: &str) -> StoreResult<Option<Discount>> {
        Ok(self.state.read().discounts.get(code).cloned())
    }

    async fn find_transaction_by_remote_id(
        &self,
        transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(self
            .state
            .read()
            .transactions
            .iter()
            .find(|t| t.transaction_id == transaction_id)
            .cloned())
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        let mut state = self.state.write();
        state.next_transaction_id += 1;
        let record = Transaction {
            id: state.next_transaction_id,
            object_id: transaction.object_id,
            object_type: transaction.object_type,
            total: transaction.total,
            currency: transaction.currency,
            status: transaction.status,
            gateway: transaction.gateway,
            transaction_id: transaction.transaction_id,
            mode: transaction.mode,
            created_at: Utc::now(),
        };
        state.transactions.push(record.clone());
        Ok(record)
    }

    async fn add_order_note(&self, order_id: u64, body: &str) -> StoreResult<()> {
        self.state.write().order_notes.push(note(order_id, body));
        Ok(())
    }

    async fn add_event_note(&self, object_id: u64, body: &str) -> StoreResult<()> {
        self.state.write().event_notes.push(note(object_id, body));
        Ok(())
    }

    async fn get_setting(&self, mode: Mode, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .state
            .read()
            .settings
            .get(&(mode, key.to_string()))
            .cloned())
    }
}
