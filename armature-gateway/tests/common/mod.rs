//! Shared fixtures for gateway integration tests

#![allow(dead_code)]

use armature_gateway::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Recording processor that answers like the remote API would
#[derive(Default)]
pub struct FakeProcessor {
    state: Mutex<FakeState>,
}

#[derive(Default, Clone)]
pub struct FakeState {
    pub customers: Vec<CreateCustomerRequest>,
    pub orders: Vec<CreateOrderRequest>,
    pub order_fetches: Vec<String>,
    pub order_updates: Vec<(String, i64, OrderPatch)>,
    pub payments: Vec<CreatePaymentRequest>,
    pub refunds: Vec<CreateRefundRequest>,
    pub fail_customer: Option<ProcessorErrors>,
    pub fail_order: Option<ProcessorErrors>,
    pub fail_payment: Option<ProcessorErrors>,
    pub fail_refund: Option<ProcessorErrors>,
    pub fail_order_fetch: Option<ProcessorErrors>,
    /// Currency reported back on refunds instead of the requested one
    pub refund_currency: Option<String>,
    refund_ids: HashMap<String, String>,
    created_orders: HashMap<String, RemoteOrder>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_payment(code: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().fail_payment = Some(errors(code));
        fake
    }

    pub fn failing_customer(code: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().fail_customer = Some(errors(code));
        fake
    }

    pub fn failing_order(code: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().fail_order = Some(errors(code));
        fake
    }

    pub fn failing_refund(code: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().fail_refund = Some(errors(code));
        fake
    }

    /// Payment fails and the follow-up order fetch fails too
    pub fn failing_payment_and_fetch(code: &str) -> Self {
        let fake = Self::failing_payment(code);
        fake.state.lock().fail_order_fetch = Some(errors("SERVICE_UNAVAILABLE"));
        fake
    }

    /// Refunds come back in `currency`
    pub fn refunding_in(currency: &str) -> Self {
        let fake = Self::new();
        fake.state.lock().refund_currency = Some(currency.to_string());
        fake
    }

    /// Snapshot of everything recorded so far
    pub fn calls(&self) -> FakeState {
        self.state.lock().clone()
    }
}

pub fn errors(code: &str) -> ProcessorErrors {
    ProcessorErrors::single(ProcessorError::new(code, "rejected by fake processor"))
}

#[async_trait]
impl ProcessorApi for FakeProcessor {
    fn name(&self) -> &'static str {
        "square"
    }

    async fn create_customer(&self, request: CreateCustomerRequest) -> ApiResult<RemoteCustomer> {
        let mut state = self.state.lock();
        state.customers.push(request.clone());
        if let Some(errors) = state.fail_customer.clone() {
            return Err(errors);
        }
        Ok(RemoteCustomer {
            id: format!("CUST-{}", state.customers.len()),
            email_address: request.email_address,
            reference_id: request.reference_id,
        })
    }

    async fn create_order(&self, request: CreateOrderRequest) -> ApiResult<RemoteOrder> {
        let mut state = self.state.lock();
        state.orders.push(request.clone());
        if let Some(errors) = state.fail_order.clone() {
            return Err(errors);
        }
        let currency = request
            .order
            .line_items
            .first()
            .map(|line| line.base_price_money.currency.clone())
            .unwrap_or_else(|| "USD".to_string());
        let order = RemoteOrder {
            id: format!("ORD-{}", state.orders.len()),
            location_id: request.order.location_id.clone(),
            version: 1,
            state: OrderState::Open,
            total_money: Money::new(request.expected_total(), currency),
            customer_id: request.order.customer_id.clone(),
        };
        state.created_orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: &str) -> ApiResult<RemoteOrder> {
        let mut state = self.state.lock();
        state.order_fetches.push(id.to_string());
        if let Some(errors) = state.fail_order_fetch.clone() {
            return Err(errors);
        }
        // Payment attempts bump the version on the remote side
        match state.created_orders.get(id) {
            Some(order) => Ok(RemoteOrder {
                version: order.version + 1,
                ..order.clone()
            }),
            None => Err(errors("NOT_FOUND")),
        }
    }

    async fn update_order(&self, id: &str, version: i64, patch: OrderPatch) -> ApiResult<RemoteOrder> {
        let mut state = self.state.lock();
        state.order_updates.push((id.to_string(), version, patch.clone()));
        let order = state
            .created_orders
            .get_mut(id)
            .ok_or_else(|| errors("NOT_FOUND"))?;
        order.version = version + 1;
        if let Some(next) = patch.state {
            order.state = next;
        }
        Ok(order.clone())
    }

    async fn create_payment(&self, request: CreatePaymentRequest) -> ApiResult<RemotePayment> {
        let mut state = self.state.lock();
        state.payments.push(request.clone());
        if let Some(errors) = state.fail_payment.clone() {
            return Err(errors);
        }
        Ok(RemotePayment {
            id: format!("PAY-{}", state.payments.len()),
            amount_money: request.amount_money,
            status: "COMPLETED".to_string(),
            order_id: Some(request.order_id),
        })
    }

    async fn create_refund(&self, request: CreateRefundRequest) -> ApiResult<RemoteRefund> {
        let mut state = self.state.lock();
        state.refunds.push(request.clone());
        if let Some(errors) = state.fail_refund.clone() {
            return Err(errors);
        }
        let next = state.refund_ids.len() + 1;
        let id = state
            .refund_ids
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| format!("REF-{}", next))
            .clone();
        let amount_money = match &state.refund_currency {
            Some(currency) => Money::new(request.amount_money.amount, currency.clone()),
            None => request.amount_money,
        };
        Ok(RemoteRefund {
            id,
            amount_money,
            status: "PENDING".to_string(),
            payment_id: Some(request.payment_id),
        })
    }
}

/// Store operations that should fail
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreFailures {
    pub insert_customer: bool,
    pub customer_meta: bool,
    pub update_order: bool,
    pub insert_transaction: bool,
}

/// `MemoryStore` with switchable write failures
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failures: Mutex<StoreFailures>,
}

impl FlakyStore {
    pub fn new(failures: StoreFailures) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: Mutex::new(failures),
        }
    }

    pub fn set_failures(&self, failures: StoreFailures) {
        *self.failures.lock() = failures;
    }

    fn check(&self, failing: impl Fn(&StoreFailures) -> bool) -> StoreResult<()> {
        let failures = *self.failures.lock();
        if failing(&failures) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Deref for FlakyStore {
    type Target = MemoryStore;

    fn deref(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl LocalStore for FlakyStore {
    async fn find_customer_by_email(&self, email: &str) -> StoreResult<Option<LocalCustomer>> {
        self.inner.find_customer_by_email(email).await
    }

    async fn insert_customer(&self, customer: NewCustomer) -> StoreResult<LocalCustomer> {
        self.check(|f| f.insert_customer)?;
        self.inner.insert_customer(customer).await
    }

    async fn set_customer_meta(&self, customer_id: u64, key: &str, value: &str) -> StoreResult<()> {
        self.check(|f| f.customer_meta)?;
        self.inner.set_customer_meta(customer_id, key, value).await
    }

    async fn get_order(&self, id: u64) -> StoreResult<Option<LocalOrder>> {
        self.inner.get_order(id).await
    }

    async fn update_order(&self, order: &LocalOrder) -> StoreResult<()> {
        self.check(|f| f.update_order)?;
        self.inner.update_order(order).await
    }

    async fn find_discount(&self, code: &str) -> StoreResult<Option<Discount>> {
        self.inner.find_discount(code).await
    }

    async fn find_transaction_by_remote_id(&self, transaction_id: &str) -> StoreResult<Option<Transaction>> {
        self.inner.find_transaction_by_remote_id(transaction_id).await
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        self.check(|f| f.insert_transaction)?;
        self.inner.insert_transaction(transaction).await
    }

    async fn add_order_note(&self, order_id: u64, note: &str) -> StoreResult<()> {
        self.inner.add_order_note(order_id, note).await
    }

    async fn add_event_note(&self, object_id: u64, note: &str) -> StoreResult<()> {
        self.inner.add_event_note(object_id, note).await
    }

    async fn get_setting(&self, mode: Mode, key: &str) -> StoreResult<Option<String>> {
        self.inner.get_setting(mode, key).await
    }
}

/// Gateway over a `FlakyStore` holding one pending USD order
pub fn flaky_gateway(
    processor: FakeProcessor,
    order_id: u64,
    total: Decimal,
    failures: StoreFailures,
) -> Gateway<FakeProcessor, FlakyStore> {
    let store = Arc::new(FlakyStore::new(failures));
    store.put_order(LocalOrder::pending(order_id, "USD", total, Mode::Sandbox));
    Gateway::new(processor, store, config("USD")).unwrap()
}

pub fn config(currency: &str) -> GatewayConfig {
    GatewayConfig::new(Mode::Sandbox, "sandbox-token", "LOC-1", currency)
}

/// Gateway over a fresh store holding one pending order
pub fn gateway_with_order(
    processor: FakeProcessor,
    order_id: u64,
    currency: &str,
    total: Decimal,
) -> Gateway<FakeProcessor, MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put_order(LocalOrder::pending(order_id, currency, total, Mode::Sandbox));
    Gateway::new(processor, store, config(currency)).unwrap()
}

pub fn profile() -> CustomerProfile {
    CustomerProfile::new("ada@example.com", "Ada Lovelace").phone("+15550100")
}

pub fn checkout_request(order_id: u64, cart: Cart) -> CheckoutRequest {
    CheckoutRequest {
        order_id,
        cart,
        profile: profile(),
        source_token: "cnon:card-nonce-ok".to_string(),
    }
}
