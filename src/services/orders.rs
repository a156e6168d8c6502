// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order lifecycle: local validation, queuing, vendor submission and
//! postback handling.
//!
//! ```text
//! create_order ──► invalid (stored, never sent)
//!      │
//!      └─► pending ──► /tasks/submit-order ──► approved | declined | error
//!                                    ▲  transient failure: task retried
//! ```

use crate::db::{submission_claim_live, FirestoreDb, GuardedUpdate, OrderQuery, OrderScope};
use crate::error::{AppError, Result};
use crate::middleware::auth::Actor;
use crate::models::{Order, OrderForm, PaymentDetails, PendingPayment, Permission, ValidationStatus};
use crate::services::kms::{payment_aad, KmsService};
use crate::services::password::new_id;
use crate::services::tasks::{SubmitOrderPayload, TasksService};
use crate::time_utils::now_sortable;
use crate::vendors::validation::{normalize_phone, violation_message};
use crate::vendors::{validate_order, VendorError, VendorGateway, VendorKind, VendorOutcome};
use crate::AppState;
use validator::Validate;

pub const QUEUE_FAILURE_MESSAGE: &str = "Failed to queue vendor submission";

/// Result of a submission task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    /// Order already final, missing, or claimed by another delivery
    Skipped,
    Completed(ValidationStatus),
}

/// Result of applying a vendor postback.
#[derive(Debug, Clone)]
pub enum PostbackResult {
    Applied(Order),
    /// Reference does not match any order of this vendor
    UnknownOrder,
    /// Order is in a state postbacks do not change
    Ignored(ValidationStatus),
    /// A submission is in flight; the vendor should deliver again later
    Deferred,
}

/// Order operations over the shared application services.
pub struct OrderService<'a> {
    db: &'a FirestoreDb,
    kms: &'a KmsService,
    tasks: &'a TasksService,
    gateway: &'a VendorGateway,
    api_url: &'a str,
}

impl<'a> OrderService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            db: &state.db,
            kms: &state.kms,
            tasks: &state.tasks_service,
            gateway: &state.vendor_gateway,
            api_url: &state.config.api_url,
        }
    }

    /// Validate and store a new order, queuing it for submission when it
    /// passes the vendor's rules.
    pub async fn create_order(&self, actor: &Actor, form: OrderForm) -> Result<Order> {
        actor.require(Permission::SubmitOrders)?;
        form.validate()?;
        self.check_group_access(actor, &form).await?;

        let mut form = form;
        form.payment = form.payment.normalized();
        if let Some(phone) = form.customer.phone.as_deref().and_then(normalize_phone) {
            form.customer.phone = Some(phone);
        }

        let today = chrono::Utc::now().date_naive();
        let violations = validate_order(form.vendor, &form, today);

        let now = now_sortable();
        let id = new_id("ord")?;

        let mut order = Order {
            id,
            vendor: form.vendor,
            created_by: actor.user.id.clone(),
            group_id: form.group_id.clone(),
            customer: form.customer.clone(),
            payment: form.payment.summary(),
            product: form.product.clone(),
            notes: form.notes.clone(),
            validation_status: ValidationStatus::Pending,
            validation_message: None,
            vendor_order_id: None,
            vendor_response_code: None,
            created_at: now.clone(),
            updated_at: now.clone(),
            submitted_at: None,
        };

        if !violations.is_empty() {
            order.validation_status = ValidationStatus::Invalid;
            order.validation_message = Some(violation_message(&violations));
            self.db.upsert_order(&order).await?;

            tracing::info!(
                order_id = %order.id,
                vendor = %order.vendor,
                violations = violations.len(),
                "Order failed vendor rules"
            );
            return Ok(order);
        }

        self.store_pending_payment(&order, &form.payment, &now).await?;
        if let Err(e) = self.db.upsert_order(&order).await {
            self.discard_pending_payment(&order.id).await;
            return Err(e);
        }

        let payload = SubmitOrderPayload {
            order_id: order.id.clone(),
        };
        if let Err(e) = self.tasks.queue_submit_order(self.api_url, payload).await {
            tracing::error!(order_id = %order.id, error = %e, "Failed to queue vendor submission");

            order.validation_status = ValidationStatus::Error;
            order.validation_message = Some(QUEUE_FAILURE_MESSAGE.to_string());
            order.updated_at = now_sortable();
            self.db.upsert_order(&order).await?;
            self.discard_pending_payment(&order.id).await;
            return Ok(order);
        }

        tracing::info!(order_id = %order.id, vendor = %order.vendor, "Order queued for submission");
        Ok(order)
    }

    /// Submit a pending order to its vendor (task handler body).
    ///
    /// Returns `Err` only for failures worth retrying.
    pub async fn submit_pending(&self, order_id: &str) -> Result<SubmitResult> {
        let Some(order) = self
            .db
            .claim_order_submission(order_id, &now_sortable())
            .await?
        else {
            tracing::info!(order_id, "Order not pending, skipping submission");
            return Ok(SubmitResult::Skipped);
        };

        let Some(pending) = self.db.get_pending_payment(order_id).await? else {
            tracing::error!(order_id, "Pending order has no payment details");
            let outcome = VendorOutcome::error(Some("Payment details unavailable".to_string()), None);
            return self.finish(&order, outcome).await;
        };

        let payment = match self.decrypt_payment(&pending).await {
            Ok(payment) => payment,
            Err(e) => {
                self.release_claim(&order).await;
                return Err(e);
            }
        };

        match self.gateway.submit(&order, &payment).await {
            Ok(outcome) => self.finish(&order, outcome).await,
            Err(VendorError::Transient(reason)) => {
                tracing::warn!(order_id, reason = %reason, "Transient vendor failure, will retry");
                self.release_claim(&order).await;
                Err(AppError::Internal(anyhow::anyhow!(
                    "Vendor temporarily unavailable: {}",
                    reason
                )))
            }
            Err(e) => {
                let outcome = VendorOutcome::error(Some(e.to_string()), None);
                self.finish(&order, outcome).await
            }
        }
    }

    /// Apply an asynchronous vendor status update.
    pub async fn apply_postback(
        &self,
        vendor: VendorKind,
        body: &serde_json::Value,
    ) -> Result<PostbackResult> {
        let postback = vendor
            .contract()
            .parse_postback(body)
            .ok_or_else(|| AppError::BadRequest("Unrecognized postback".to_string()))?;

        let now = now_sortable();
        let outcome = postback.outcome;
        let result = self
            .db
            .update_order_if(&postback.order_ref, move |current| {
                if current.vendor != vendor || !accepts_postback(current, &now) {
                    return None;
                }
                let mut updated = current.clone();
                apply_outcome(&mut updated, outcome.clone(), &now);
                Some(updated)
            })
            .await?;

        let (before, order) = match result {
            GuardedUpdate::Written { before, after } => (before, after),
            GuardedUpdate::Unchanged(current) if current.vendor == vendor => {
                if current.validation_status == ValidationStatus::Pending {
                    tracing::info!(order_id = %current.id, "Deferring postback during submission");
                    return Ok(PostbackResult::Deferred);
                }
                tracing::info!(
                    order_id = %current.id,
                    status = current.validation_status.as_str(),
                    "Ignoring postback for settled order"
                );
                return Ok(PostbackResult::Ignored(current.validation_status));
            }
            GuardedUpdate::Unchanged(_) | GuardedUpdate::Missing => {
                tracing::warn!(vendor = %vendor, order_ref = %postback.order_ref, "Postback for unknown order");
                return Ok(PostbackResult::UnknownOrder);
            }
        };

        if before.validation_status == ValidationStatus::Pending {
            self.discard_pending_payment(&order.id).await;
        }

        tracing::info!(
            order_id = %order.id,
            vendor = %vendor,
            from = before.validation_status.as_str(),
            to = order.validation_status.as_str(),
            "Applied vendor postback"
        );
        Ok(PostbackResult::Applied(order))
    }

    /// Orders the actor may see, newest first.
    pub async fn list_orders(
        &self,
        actor: &Actor,
        vendor: Option<VendorKind>,
        status: Option<ValidationStatus>,
        before: Option<String>,
        limit: u32,
    ) -> Result<Vec<Order>> {
        let query = OrderQuery {
            scope: order_scope(actor)?,
            vendor,
            status,
            before,
            limit,
        };
        self.db.list_orders(&query).await
    }

    /// A single order, if the actor may see it.
    pub async fn get_order(&self, actor: &Actor, order_id: &str) -> Result<Order> {
        order_scope(actor)?;
        match self.db.get_order(order_id).await? {
            Some(order) if can_view(actor, &order) => Ok(order),
            _ => Err(AppError::NotFound(format!("Order {}", order_id))),
        }
    }

    /// Group and vendor checks for a new order.
    async fn check_group_access(&self, actor: &Actor, form: &OrderForm) -> Result<()> {
        if actor.user.group_ids.is_empty() {
            if form.group_id.is_some() {
                return Err(AppError::Forbidden("You are not a member of that group".to_string()));
            }
            return Ok(());
        }

        let group_id = form
            .group_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("group_id is required".to_string()))?;

        if !actor.user.group_ids.iter().any(|g| g == group_id) {
            return Err(AppError::Forbidden("You are not a member of that group".to_string()));
        }

        let group = self
            .db
            .get_group(group_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Unknown group {}", group_id)))?;

        if !group.allows(form.vendor) {
            return Err(AppError::Forbidden(format!(
                "Group {} may not submit orders to {}",
                group.name,
                form.vendor.display_name()
            )));
        }
        Ok(())
    }

    async fn store_pending_payment(
        &self,
        order: &Order,
        payment: &PaymentDetails,
        now: &str,
    ) -> Result<()> {
        let plaintext = serde_json::to_string(payment)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;
        let encrypted_details = self.kms.encrypt(&plaintext, &payment_aad(&order.id)).await?;

        self.db
            .set_pending_payment(&PendingPayment {
                order_id: order.id.clone(),
                vendor: order.vendor,
                encrypted_details,
                created_at: now.to_string(),
            })
            .await
    }

    async fn decrypt_payment(&self, pending: &PendingPayment) -> Result<PaymentDetails> {
        let plaintext = self
            .kms
            .decrypt(&pending.encrypted_details, &payment_aad(&pending.order_id))
            .await?;
        serde_json::from_str(&plaintext)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt payment details: {}", e)))
    }

    /// Record a final outcome and drop the payment secrets.
    ///
    /// Only written while the order still holds this task's claim; a
    /// postback or a takeover that got there first wins.
    async fn finish(&self, claimed: &Order, outcome: VendorOutcome) -> Result<SubmitResult> {
        let claim = claimed.submitted_at.clone();
        let now = now_sortable();
        let result = self
            .db
            .update_order_if(&claimed.id, move |current| {
                holds_claim(current, claim.as_deref()).then(|| {
                    let mut updated = current.clone();
                    apply_outcome(&mut updated, outcome.clone(), &now);
                    updated
                })
            })
            .await?;

        let GuardedUpdate::Written { after: order, .. } = result else {
            tracing::warn!(order_id = %claimed.id, "Submission claim lost, outcome not recorded");
            return Ok(SubmitResult::Skipped);
        };
        self.discard_pending_payment(&order.id).await;

        tracing::info!(
            order_id = %order.id,
            vendor = %order.vendor,
            status = order.validation_status.as_str(),
            "Order submission finished"
        );
        Ok(SubmitResult::Completed(order.validation_status))
    }

    /// Give up a submission claim so a retry can take it.
    async fn release_claim(&self, claimed: &Order) {
        let claim = claimed.submitted_at.clone();
        let now = now_sortable();
        let result = self
            .db
            .update_order_if(&claimed.id, move |current| {
                holds_claim(current, claim.as_deref()).then(|| {
                    let mut released = current.clone();
                    released.submitted_at = None;
                    released.updated_at = now.clone();
                    released
                })
            })
            .await;
        if let Err(e) = result {
            tracing::error!(order_id = %claimed.id, error = %e, "Failed to release submission claim");
        }
    }

    async fn discard_pending_payment(&self, order_id: &str) {
        if let Err(e) = self.db.delete_pending_payment(order_id).await {
            tracing::error!(order_id, error = %e, "Failed to delete pending payment");
        }
    }
}

/// Copy a vendor outcome onto the order record.
pub fn apply_outcome(order: &mut Order, outcome: VendorOutcome, now: &str) {
    order.validation_status = outcome.status;
    order.validation_message = outcome.message;
    if outcome.vendor_order_id.is_some() {
        order.vendor_order_id = outcome.vendor_order_id;
    }
    if outcome.response_code.is_some() {
        order.vendor_response_code = outcome.response_code;
    }
    order.updated_at = now.to_string();
}

/// Whether `order` is still pending under the claim taken at `claim`.
fn holds_claim(order: &Order, claim: Option<&str>) -> bool {
    order.validation_status == ValidationStatus::Pending
        && claim.is_some()
        && order.submitted_at.as_deref() == claim
}

/// Postbacks update approved orders and pending orders no task is working on.
pub fn accepts_postback(order: &Order, now: &str) -> bool {
    match order.validation_status {
        ValidationStatus::Approved => true,
        ValidationStatus::Pending => !submission_claim_live(order, now),
        _ => false,
    }
}

/// Listing scope from the actor's permissions.
pub fn order_scope(actor: &Actor) -> Result<OrderScope> {
    if actor.can(Permission::ViewAllOrders) {
        Ok(OrderScope::All)
    } else if actor.can(Permission::ViewOrders) {
        Ok(OrderScope::Visible {
            user_id: actor.user.id.clone(),
            group_ids: actor.user.group_ids.clone(),
        })
    } else {
        Err(AppError::Forbidden(format!(
            "Requires {} or {}",
            Permission::ViewOrders,
            Permission::ViewAllOrders
        )))
    }
}

pub fn can_view(actor: &Actor, order: &Order) -> bool {
    match order_scope(actor) {
        Ok(OrderScope::All) => true,
        Ok(OrderScope::Visible { user_id, group_ids }) => {
            order.created_by == user_id
                || order
                    .group_id
                    .as_ref()
                    .is_some_and(|g| group_ids.contains(g))
        }
        Err(_) => false,
    }
}
