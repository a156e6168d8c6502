// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks queue for asynchronous vendor submission.
//!
//! Orders that pass local validation are queued here and submitted to the
//! vendor by the `/tasks/submit-order` handler. The queue's rate limits keep
//! us under each vendor's throttle, and its retry policy absorbs transient
//! vendor outages.

use crate::error::{AppError, Result};
use google_cloud_tasks_v2::client::CloudTasks;
use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::OnceCell;

/// Handler path for vendor submission tasks.
pub const SUBMIT_ORDER_PATH: &str = "/tasks/submit-order";

/// Body of a submission task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderPayload {
    pub order_id: String,
}

pub struct TasksService {
    project_id: String,
    queue_path: String,
    client: OnceCell<CloudTasks>,
    /// Offline mode: every enqueue fails. Debug builds only.
    #[cfg(debug_assertions)]
    offline: bool,
}

impl TasksService {
    pub fn new(project_id: &str, region: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            queue_path: format!(
                "projects/{}/locations/{}/queues/{}",
                project_id,
                region,
                crate::config::ORDER_QUEUE_NAME
            ),
            client: OnceCell::new(),
            #[cfg(debug_assertions)]
            offline: false,
        }
    }

    /// A queue that is never reachable, for tests that run without GCP.
    #[cfg(debug_assertions)]
    pub fn new_mock(project_id: &str, region: &str) -> Self {
        Self {
            offline: true,
            ..Self::new(project_id, region)
        }
    }

    pub fn queue_path(&self) -> &str {
        &self.queue_path
    }

    /// Service account Cloud Tasks signs OIDC tokens as.
    pub fn service_account_email(&self) -> String {
        super::google_oidc::task_service_account(&self.project_id)
    }

    /// The client is built on first use so that offline tests never need credentials.
    async fn client(&self) -> Result<&CloudTasks> {
        self.client
            .get_or_try_init(|| async {
                CloudTasks::builder().build().await.map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Cloud Tasks client error: {}", e))
                })
            })
            .await
    }

    /// HTTP target of a submission task, authenticated with an OIDC token
    /// whose audience is the API's own URL.
    fn submit_request(&self, service_url: &str, payload: &SubmitOrderPayload) -> Result<HttpRequest> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        Ok(HttpRequest::default()
            .set_url(format!("{}{}", service_url, SUBMIT_ORDER_PATH))
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]))
            .set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(self.service_account_email())
                    .set_audience(service_url.to_string()),
            ))
    }

    /// Queue vendor submission of one order.
    pub async fn queue_submit_order(
        &self,
        service_url: &str,
        payload: SubmitOrderPayload,
    ) -> Result<()> {
        #[cfg(debug_assertions)]
        if self.offline {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Cloud Tasks offline, cannot queue {}",
                payload.order_id
            )));
        }

        let request = self.submit_request(service_url, &payload)?;
        self.client()
            .await?
            .create_task()
            .set_parent(self.queue_path.clone())
            .set_task(Task::default().set_http_request(request))
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks create error: {}", e)))?;

        tracing::info!(order_id = %payload.order_id, queue = %self.queue_path, "Queued vendor submission");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_path_uses_order_queue() {
        let service = TasksService::new("test-project", "us-west1");
        assert_eq!(
            service.queue_path(),
            "projects/test-project/locations/us-west1/queues/order-submission"
        );
        assert_eq!(
            service.service_account_email(),
            "order-desk-api@test-project.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn submit_request_targets_handler() {
        let service = TasksService::new("test-project", "us-west1");
        let request = service
            .submit_request(
                "https://api.example.com",
                &SubmitOrderPayload {
                    order_id: "ord_9".to_string(),
                },
            )
            .unwrap();

        assert_eq!(request.url, "https://api.example.com/tasks/submit-order");
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&request.body).unwrap(),
            serde_json::json!({"order_id": "ord_9"})
        );
    }

    #[tokio::test]
    async fn offline_queue_reports_failure() {
        let service = TasksService::new_mock("test-project", "us-west1");

        let result = service
            .queue_submit_order(
                "http://localhost",
                SubmitOrderPayload {
                    order_id: "ord_1".to_string(),
                },
            )
            .await;
        assert!(result.is_err());
    }
}
