//! Local and remote customer resolution

use crate::classify::classify;
use crate::error::{GatewayError, GatewayResult, reference_code};
use crate::provider::ProcessorApi;
use crate::remote::{CreateCustomerRequest, RemoteAddress, idempotency_key};
use crate::store::LocalStore;
use crate::types::{CustomerProfile, LocalCustomer, Mode, NewCustomer};
use tracing::{debug, error, info, warn};

/// Finds or creates the local customer and its remote counterpart
pub struct CustomerResolver<'a, P: ?Sized, S: ?Sized> {
    processor: &'a P,
    store: &'a S,
    mode: Mode,
}

impl<'a, P, S> CustomerResolver<'a, P, S>
where
    P: ProcessorApi + ?Sized,
    S: LocalStore + ?Sized,
{
    pub fn new(processor: &'a P, store: &'a S, mode: Mode) -> Self {
        Self {
            processor,
            store,
            mode,
        }
    }

    /// Resolve a checkout profile to `(local customer, remote customer id)`
    ///
    /// A mapping already recorded for the current mode is trusted without a
    /// remote call.
    pub async fn resolve(&self, profile: &CustomerProfile) -> GatewayResult<(LocalCustomer, String)> {
        let mut customer = self.find_or_create_local(profile).await?;

        if let Some(remote_id) = customer.remote_id(self.mode) {
            debug!(customer = customer.id, mode = %self.mode, "Using cached remote customer");
            let remote_id = remote_id.to_string();
            return Ok((customer, remote_id));
        }

        let (given_name, family_name) = profile.split_name();
        let request = CreateCustomerRequest {
            idempotency_key: idempotency_key(),
            given_name,
            family_name,
            email_address: Some(profile.email.clone()),
            phone_number: profile.phone.clone(),
            address: profile.billing_address.as_ref().map(RemoteAddress::from),
            reference_id: Some(customer.id.to_string()),
        };

        let remote = match self.processor.create_customer(request).await {
            Ok(remote) => remote,
            Err(errors) => {
                let reference = reference_code();
                let classification = classify(errors.first_code());
                warn!(
                    reference = %reference,
                    customer = customer.id,
                    code = ?classification.code,
                    "Remote customer creation failed"
                );
                debug!(reference = %reference, errors = %errors, "Processor error detail");
                return Err(GatewayError::RemoteCustomerCreationFailed {
                    reference,
                    message: classification.message.to_string(),
                    errors,
                });
            }
        };

        let key = self.mode.customer_meta_key();
        if let Err(source) = self.store.set_customer_meta(customer.id, &key, &remote.id).await {
            let reference = reference_code();
            error!(
                target: "armature_gateway::reconcile",
                reference = %reference,
                customer = customer.id,
                remote_customer = %remote.id,
                mode = %self.mode,
                error = %source,
                "Remote customer created but local mapping was not saved"
            );
            return Err(GatewayError::Persistence {
                reference,
                context: format!("customer {} mapping to {}", customer.id, remote.id),
                source,
            });
        }

        info!(customer = customer.id, remote_customer = %remote.id, mode = %self.mode, "Created remote customer");
        customer.metadata.insert(key, remote.id.clone());
        Ok((customer, remote.id))
    }

    async fn find_or_create_local(&self, profile: &CustomerProfile) -> GatewayResult<LocalCustomer> {
        if let Some(customer) = self.store.find_customer_by_email(&profile.email).await? {
            return Ok(customer);
        }

        let new = NewCustomer {
            email: profile.email.clone(),
            name: profile.name.clone(),
            user_id: profile.user_id,
        };
        match self.store.insert_customer(new).await {
            Ok(customer) => {
                info!(customer = customer.id, "Created local customer");
                Ok(customer)
            }
            Err(source) => {
                let reference = reference_code();
                error!(reference = %reference, error = %source, "Local customer creation failed");
                Err(GatewayError::CustomerCreationFailed { reference, source })
            }
        }
    }
}
