// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users, roles and groups (admin data)
//! - Orders (normalized order records)
//! - Pending payments (encrypted payment details awaiting submission)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Group, Order, PendingPayment, Role, User, ValidationStatus};
use crate::vendors::VendorKind;
use chrono::{DateTime, Utc};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

// Firestore allows at most 30 values in an `in` filter.
const MAX_IN_VALUES: usize = 30;

/// A submission claim older than this is considered abandoned (instance died
/// mid-request) and may be taken over by a task retry.
const SUBMISSION_CLAIM_TTL_SECS: i64 = 600;

/// Which orders a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order (`view_all_orders`)
    All,
    /// Orders created by the user or filed under one of the user's groups
    Visible {
        user_id: String,
        group_ids: Vec<String>,
    },
}

/// Order listing filters, newest first.
#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub scope: OrderScope,
    pub vendor: Option<VendorKind>,
    pub status: Option<ValidationStatus>,
    /// Only orders created strictly before this timestamp (pagination cursor)
    pub before: Option<String>,
    pub limit: u32,
}

/// Result of [`FirestoreDb::update_order_if`].
#[derive(Debug, Clone)]
pub enum GuardedUpdate {
    Missing,
    /// The guard declined; carries the current document
    Unchanged(Order),
    Written { before: Order, after: Order },
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by (already normalized) email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().next())
    }

    /// All users, sorted by email.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("email", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Whether any user is assigned `role_id`.
    pub async fn role_in_use(&self, role_id: &str) -> Result<bool, AppError> {
        let role_id = role_id.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("role_id").eq(role_id.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(!users.is_empty())
    }

    /// Users whose `group_ids` contain `group_id`.
    pub async fn list_users_in_group(&self, group_id: &str) -> Result<Vec<User>, AppError> {
        let group_id = group_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("group_ids").array_contains(group_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Role Operations ─────────────────────────────────────────

    pub async fn get_role(&self, role_id: &str) -> Result<Option<Role>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROLES)
            .obj()
            .one(role_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ROLES)
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_role(&self, role: &Role) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ROLES)
            .document_id(&role.id)
            .object(role)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_role(&self, role_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ROLES)
            .document_id(role_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Group Operations ────────────────────────────────────────

    pub async fn get_group(&self, group_id: &str) -> Result<Option<Group>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::GROUPS)
            .obj()
            .one(group_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::GROUPS)
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_group(&self, group: &Group) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GROUPS)
            .document_id(&group.id)
            .object(group)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a group and remove it from every member.
    ///
    /// Members are rewritten in transactions of up to `BATCH_SIZE` writes;
    /// the group document goes last so a failure leaves it retryable.
    /// Returns the number of members updated.
    pub async fn delete_group(&self, group_id: &str, now: &str) -> Result<usize, AppError> {
        let client = self.get_client()?;
        let members = self.list_users_in_group(group_id).await?;

        for chunk in members.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for member in chunk {
                let mut member = member.clone();
                member.group_ids.retain(|g| g != group_id);
                member.updated_at = now.to_string();

                client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&member.id)
                    .object(&member)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add member update to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit group member updates: {}", e))
            })?;
        }

        client
            .fluent()
            .delete()
            .from(collections::GROUPS)
            .document_id(group_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(group_id, members = members.len(), "Group deleted");
        Ok(members.len())
    }

    // ─── Order Operations ────────────────────────────────────────

    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ORDERS)
            .obj()
            .one(order_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn upsert_order(&self, order: &Order) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ORDERS)
            .document_id(&order.id)
            .object(order)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List orders matching `query`, newest first.
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, AppError> {
        let scope = query.scope.clone();
        let vendor = query.vendor.map(|v| v.slug());
        let status = query.status.map(|s| s.as_str());
        let before = query.before.clone();

        if let OrderScope::Visible { group_ids, .. } = &scope {
            if group_ids.len() > MAX_IN_VALUES {
                tracing::warn!(
                    groups = group_ids.len(),
                    "User has more groups than an `in` filter allows; truncating"
                );
            }
        }

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ORDERS)
            .filter(move |q| {
                let visibility = match &scope {
                    OrderScope::All => None,
                    OrderScope::Visible { user_id, group_ids } if group_ids.is_empty() => {
                        q.field("created_by").eq(user_id.clone())
                    }
                    OrderScope::Visible { user_id, group_ids } => {
                        let groups: Vec<String> =
                            group_ids.iter().take(MAX_IN_VALUES).cloned().collect();
                        q.for_any([
                            q.field("created_by").eq(user_id.clone()),
                            q.field("group_id").is_in(groups),
                        ])
                    }
                };

                q.for_all([
                    visibility,
                    vendor.and_then(|v| q.field("vendor").eq(v)),
                    status.and_then(|s| q.field("validation_status").eq(s)),
                    before
                        .clone()
                        .and_then(|b| q.field("created_at").less_than(b)),
                ])
            })
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(query.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read-modify-write of one order inside a Firestore transaction.
    ///
    /// `update` sees the current document and returns the replacement, or
    /// `None` to leave it alone. The read happens in the transaction, so a
    /// concurrent writer makes the commit fail and the closure runs again
    /// on fresh data.
    pub async fn update_order_if<F>(
        &self,
        order_id: &str,
        update: F,
    ) -> Result<GuardedUpdate, AppError>
    where
        F: Fn(&Order) -> Option<Order> + Clone + Send + Sync + 'static,
    {
        let order_id = order_id.to_string();

        self.get_client()?
            .run_transaction(|db, transaction| {
                let order_id = order_id.clone();
                let update = update.clone();
                Box::pin(async move {
                    let current: Option<Order> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ORDERS)
                        .obj()
                        .one(&order_id)
                        .await?;

                    let Some(current) = current else {
                        return Ok(GuardedUpdate::Missing);
                    };
                    let Some(replacement) = update(&current) else {
                        return Ok(GuardedUpdate::Unchanged(current));
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::ORDERS)
                        .document_id(&order_id)
                        .object(&replacement)
                        .add_to_transaction(transaction)?;

                    Ok(GuardedUpdate::Written {
                        before: current,
                        after: replacement,
                    })
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Order transaction failed: {}", e)))
    }

    /// Claim a pending order for vendor submission.
    ///
    /// Sets `submitted_at` and returns the claimed order. Returns `None` when
    /// the order is missing, no longer pending, or claimed by another
    /// delivery of the same task.
    pub async fn claim_order_submission(
        &self,
        order_id: &str,
        now: &str,
    ) -> Result<Option<Order>, AppError> {
        let now = now.to_string();
        let result = self
            .update_order_if(order_id, move |order| {
                if order.validation_status != ValidationStatus::Pending
                    || submission_claim_live(order, &now)
                {
                    return None;
                }
                let mut claimed = order.clone();
                claimed.submitted_at = Some(now.clone());
                claimed.updated_at = now.clone();
                Some(claimed)
            })
            .await?;

        match result {
            GuardedUpdate::Written { after, .. } => Ok(Some(after)),
            GuardedUpdate::Unchanged(order) => {
                tracing::debug!(
                    order_id,
                    status = order.validation_status.as_str(),
                    "Order not claimable for submission"
                );
                Ok(None)
            }
            GuardedUpdate::Missing => Ok(None),
        }
    }

    // ─── Pending Payment Operations ──────────────────────────────

    pub async fn set_pending_payment(&self, pending: &PendingPayment) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PENDING_PAYMENTS)
            .document_id(&pending.order_id)
            .object(pending)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn get_pending_payment(
        &self,
        order_id: &str,
    ) -> Result<Option<PendingPayment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PENDING_PAYMENTS)
            .obj()
            .one(order_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn delete_pending_payment(&self, order_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PENDING_PAYMENTS)
            .document_id(order_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Whether `order` carries a submission claim that has not lapsed by `now`.
pub fn submission_claim_live(order: &Order, now: &str) -> bool {
    order
        .submitted_at
        .as_deref()
        .is_some_and(|claimed| !claim_expired(claimed, now))
}

/// Whether a submission claim taken at `claimed` has lapsed by `now`.
/// Unparseable timestamps count as lapsed.
fn claim_expired(claimed: &str, now: &str) -> bool {
    match (
        DateTime::parse_from_rfc3339(claimed),
        DateTime::parse_from_rfc3339(now),
    ) {
        (Ok(claimed), Ok(now)) => {
            now.with_timezone(&Utc) - claimed.with_timezone(&Utc)
                >= chrono::Duration::seconds(SUBMISSION_CLAIM_TTL_SECS)
        }
        _ => true,
    }
}
