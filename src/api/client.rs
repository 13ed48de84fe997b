use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::models::{
    Badge, BadgeProgress, ChatMessage, Complaint, Conversation, DonationStatus, EarnedBadge,
    LoginResponse, NotificationBatch, Product, Profile, ReceivedDonation,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| HttpClient::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(base_url: &str, token: &str) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.to_string());
        client
    }

    pub fn from_session(session: &crate::app::Session) -> Self {
        match &session.token {
            Some(token) => Self::with_token(&session.base_url, token),
            None => Self::new(&session.base_url),
        }
    }

    fn api_url(&self, path: &str) -> String {
        if self.base_url.ends_with("/api/v1") {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/api/v1{}", self.base_url, path)
        }
    }

    fn with_auth(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(t) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", t));
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let req = self.with_auth(self.http.get(self.api_url(path)));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let req = self.with_auth(self.http.post(self.api_url(path)).json(body));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST where the client only cares about success, not the response body.
    async fn post_ack(&self, path: &str, body: &serde_json::Value) -> Result<(), ApiError> {
        let req = self.with_auth(self.http.post(self.api_url(path)).json(body));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post_json("/auth/login", &body).await
    }

    /// All pending notifications for the current account, grouped by
    /// category. The server fills only the lists that apply to the
    /// account's role.
    pub async fn notifications(&self) -> Result<NotificationBatch, ApiError> {
        self.get_json("/notifications").await
    }

    /// Idempotent; the server only tracks a read flag for the message
    /// category, everything else is handled by the local read store.
    pub async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.post_ack(&format!("/notifications/{}/read", id), &serde_json::json!({}))
            .await
    }

    pub async fn product(&self, id: &str) -> Result<Product, ApiError> {
        self.get_json(&format!("/products/{}", id)).await
    }

    pub async fn badge_catalog(&self) -> Result<Vec<Badge>, ApiError> {
        self.get_json("/badges").await
    }

    pub async fn earned_badges(&self, account_id: &str) -> Result<Vec<EarnedBadge>, ApiError> {
        self.get_json(&format!("/accounts/{}/badges", account_id)).await
    }

    pub async fn badge_progress(&self, account_id: &str) -> Result<Vec<BadgeProgress>, ApiError> {
        self.get_json(&format!("/accounts/{}/badges/progress", account_id))
            .await
    }

    pub async fn profile(&self, account_id: &str) -> Result<Profile, ApiError> {
        self.get_json(&format!("/accounts/{}", account_id)).await
    }

    pub async fn received_donations(&self) -> Result<Vec<ReceivedDonation>, ApiError> {
        self.get_json("/donations/received").await
    }

    /// Submit the next tracking status. The caller computes it with
    /// `DonationStatus::next`; the server rejects skipped steps as well.
    pub async fn advance_donation(
        &self,
        donation_id: &str,
        next: DonationStatus,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "status": next });
        self.post_ack(&format!("/donations/{}/status", donation_id), &body)
            .await
    }

    pub async fn complaints(&self) -> Result<Vec<Complaint>, ApiError> {
        self.get_json("/complaints").await
    }

    pub async fn reply_complaint(&self, complaint_id: &str, body: &str) -> Result<(), ApiError> {
        let payload = serde_json::json!({ "body": body });
        self.post_ack(&format!("/complaints/{}/replies", complaint_id), &payload)
            .await
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get_json("/chats").await
    }

    pub async fn messages(&self, peer_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.get_json(&format!("/chats/{}/messages", peer_id)).await
    }

    pub async fn send_message(&self, peer_id: &str, text: &str) -> Result<ChatMessage, ApiError> {
        let body = serde_json::json!({ "text": text });
        self.post_json(&format!("/chats/{}/messages", peer_id), &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_appends_prefix_once() {
        let plain = ApiClient::new("https://crumbshare.example/");
        assert_eq!(
            plain.api_url("/notifications"),
            "https://crumbshare.example/api/v1/notifications"
        );
        let prefixed = ApiClient::new("https://crumbshare.example/api/v1");
        assert_eq!(
            prefixed.api_url("/notifications"),
            "https://crumbshare.example/api/v1/notifications"
        );
    }

    #[test]
    fn with_token_sets_bearer() {
        let client = ApiClient::with_token("https://crumbshare.example", "tok");
        assert_eq!(client.token.as_deref(), Some("tok"));
    }
}
