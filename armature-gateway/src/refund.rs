//! Refund reconciliation
//!
//! Pushes a locally issued refund to the processor and records the result
//! against the local refund object. Safe to run more than once for the same
//! refund: the idempotency key is derived from the local ids and the ledger
//! is checked for the remote refund id before anything is written.

use crate::classify::classify;
use crate::error::{GatewayError, GatewayResult, StoreError, reference_code};
use crate::money::{Money, format_amount, from_minor_units, to_minor_units};
use crate::provider::ProcessorApi;
use crate::remote::{CreateRefundRequest, RemoteRefund};
use crate::store::LocalStore;
use crate::types::*;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Reason sent with every refund
pub const REFUND_REASON: &str = "Refunded from store";

/// What the reconciler did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Order was never charged remotely
    Skipped,
    /// Remote refund already has a local transaction
    AlreadyRecorded(Transaction),
    /// Remote refund submitted and recorded locally
    Recorded { transaction: Transaction, partial: bool },
}

/// Idempotency key for a refund, stable across retried deliveries
pub fn refund_key(order: &LocalOrder, refund: &RefundRecord) -> String {
    let name = format!("refund:{}:{}", order.id, refund.id);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Refund reconciler
pub struct RefundReconciler<'a, P: ?Sized, S: ?Sized> {
    processor: &'a P,
    store: &'a S,
}

impl<'a, P, S> RefundReconciler<'a, P, S>
where
    P: ProcessorApi + ?Sized,
    S: LocalStore + ?Sized,
{
    pub fn new(processor: &'a P, store: &'a S) -> Self {
        Self { processor, store }
    }

    /// Reconcile a local refund with the processor
    pub async fn refund(
        &self,
        order: &LocalOrder,
        refund: &RefundRecord,
    ) -> GatewayResult<RefundOutcome> {
        let Some(payment_id) = order.gateway_transaction_id.as_deref() else {
            info!(order = order.id, refund = refund.id, "Order has no processor transaction, nothing to refund remotely");
            return Ok(RefundOutcome::Skipped);
        };

        let amount = refund.total.abs();
        let partial = amount != order.total.abs();
        if partial {
            info!(order = order.id, amount = %amount, total = %order.total, "Processing partial refund");
        } else {
            info!(order = order.id, amount = %amount, "Processing full refund");
        }

        let request = CreateRefundRequest {
            idempotency_key: refund_key(order, refund),
            payment_id: payment_id.to_string(),
            amount_money: Money::new(to_minor_units(amount, &order.currency)?, &order.currency),
            reason: REFUND_REASON.to_string(),
        };

        let remote = match self.processor.create_refund(request).await {
            Ok(remote) => remote,
            Err(errors) => {
                let reference = reference_code();
                let classification = classify(errors.first_code());
                error!(
                    reference = %reference,
                    order = order.id,
                    refund = refund.id,
                    payment = payment_id,
                    code = ?classification.code,
                    "Refund submission failed, manual follow-up required"
                );
                debug!(reference = %reference, errors = %errors, "Processor error detail");
                return Err(GatewayError::RefundFailed {
                    reference,
                    message: classification.message.to_string(),
                    errors,
                });
            }
        };

        if let Some(existing) = self.store.find_transaction_by_remote_id(&remote.id).await? {
            info!(order = order.id, remote_refund = %remote.id, "Refund already recorded");
            return Ok(RefundOutcome::AlreadyRecorded(existing));
        }

        let transaction = self.record(order, refund, &remote).await?;
        Ok(RefundOutcome::Recorded {
            transaction,
            partial,
        })
    }

    async fn record(
        &self,
        order: &LocalOrder,
        refund: &RefundRecord,
        remote: &RemoteRefund,
    ) -> GatewayResult<Transaction> {
        let currency = &remote.amount_money.currency;
        if !currency.eq_ignore_ascii_case(&order.currency) {
            warn!(
                order = order.id,
                order_currency = %order.currency,
                refund_currency = %currency,
                "Refund currency differs from order currency"
            );
        }
        let refunded: Decimal = from_minor_units(remote.amount_money.amount, currency);
        let note = format!(
            "Refunded {} via {} (refund id: {})",
            format_amount(refunded, currency),
            self.processor.name(),
            remote.id
        );

        let persisted = async {
            self.store.add_order_note(order.id, &note).await?;
            let transaction = self
                .store
                .insert_transaction(NewTransaction {
                    object_id: refund.id,
                    object_type: ObjectType::Order,
                    total: -refunded,
                    currency: currency.to_uppercase(),
                    status: TransactionStatus::Complete,
                    gateway: self.processor.name().to_string(),
                    transaction_id: remote.id.clone(),
                    mode: order.mode,
                })
                .await?;
            self.store.add_event_note(refund.id, &note).await?;
            Ok::<_, StoreError>(transaction)
        }
        .await;

        match persisted {
            Ok(transaction) => {
                info!(order = order.id, refund = refund.id, remote_refund = %remote.id, "Refund recorded");
                Ok(transaction)
            }
            Err(source) => {
                let reference = reference_code();
                error!(
                    target: "armature_gateway::reconcile",
                    reference = %reference,
                    order = order.id,
                    refund = refund.id,
                    remote_refund = %remote.id,
                    error = %source,
                    "Refund issued remotely but not recorded locally"
                );
                Err(GatewayError::Persistence {
                    reference,
                    context: format!("refund {} for order {}", remote.id, order.id),
                    source,
                })
            }
        }
    }
}
