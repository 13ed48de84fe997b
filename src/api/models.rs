use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bakery,
    Charity,
    Admin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub account_id: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    ProductAlert,
    Message,
    Donation,
    ReceivedDonation,
}

/// One pending alert for the logged-in account. For product alerts
/// `timestamp` carries the product expiration; for everything else the
/// creation time. `read` is only authoritative for messages — the server
/// keeps no flag for the other categories, so the synchronizer recomputes
/// it from the local read store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub category: NotificationCategory,
    pub message: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Per-category lists as returned by the notifications endpoint. Which
/// lists are populated depends on the account role; absent lists decode
/// as empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationBatch {
    #[serde(default)]
    pub product_alerts: Vec<Notification>,
    #[serde(default)]
    pub messages: Vec<Notification>,
    #[serde(default)]
    pub donations: Vec<Notification>,
    #[serde(default)]
    pub received_donations: Vec<Notification>,
}

impl NotificationBatch {
    pub fn flatten(self) -> Vec<Notification> {
        let mut all = self.product_alerts;
        all.extend(self.messages);
        all.extend(self.donations);
        all.extend(self.received_donations);
        all
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Tracking status of a donation in transit between a bakery and a
/// charity. Advancing always moves exactly one step; the client computes
/// the successor with `next()` and submits it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Preparing,
    ReadyForPickup,
    InTransit,
    Received,
    Completed,
}

impl DonationStatus {
    pub fn next(self) -> Option<DonationStatus> {
        match self {
            DonationStatus::Preparing => Some(DonationStatus::ReadyForPickup),
            DonationStatus::ReadyForPickup => Some(DonationStatus::InTransit),
            DonationStatus::InTransit => Some(DonationStatus::Received),
            DonationStatus::Received => Some(DonationStatus::Completed),
            DonationStatus::Completed => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DonationStatus::Preparing => "Preparing",
            DonationStatus::ReadyForPickup => "Ready for pickup",
            DonationStatus::InTransit => "In transit",
            DonationStatus::Received => "Received",
            DonationStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationItem {
    pub name: String,
    pub quantity: u32,
}

/// A donation on the receiving side. Bakery-initiated direct donations and
/// accepted charity requests come from different backend tables with
/// different field sets; the `kind` tag keeps them apart on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceivedDonation {
    Direct {
        id: String,
        bakery_name: String,
        #[serde(default)]
        items: Vec<DonationItem>,
        status: DonationStatus,
        updated_at: DateTime<Utc>,
    },
    AcceptedRequest {
        id: String,
        request_title: String,
        bakery_name: String,
        status: DonationStatus,
        updated_at: DateTime<Utc>,
    },
}

impl ReceivedDonation {
    pub fn id(&self) -> &str {
        match self {
            ReceivedDonation::Direct { id, .. } => id,
            ReceivedDonation::AcceptedRequest { id, .. } => id,
        }
    }

    pub fn status(&self) -> DonationStatus {
        match self {
            ReceivedDonation::Direct { status, .. } => *status,
            ReceivedDonation::AcceptedRequest { status, .. } => *status,
        }
    }

    /// The bakery on the other side of this donation.
    pub fn counterparty(&self) -> &str {
        match self {
            ReceivedDonation::Direct { bakery_name, .. } => bakery_name,
            ReceivedDonation::AcceptedRequest { bakery_name, .. } => bakery_name,
        }
    }

    pub fn title(&self) -> String {
        match self {
            ReceivedDonation::Direct { items, .. } => {
                if items.is_empty() {
                    "Direct donation".to_string()
                } else {
                    items
                        .iter()
                        .map(|i| format!("{}× {}", i.quantity, i.name))
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            }
            ReceivedDonation::AcceptedRequest { request_title, .. } => request_title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplaintStatus {
    Pending,
    #[serde(rename = "In Review")]
    InReview,
    Resolved,
}

impl ComplaintStatus {
    pub fn is_open(self) -> bool {
        self != ComplaintStatus::Resolved
    }

    pub fn label(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "Pending",
            ComplaintStatus::InReview => "In Review",
            ComplaintStatus::Resolved => "Resolved",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplaintReply {
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Complaint {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<ComplaintReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EarnedBadge {
    pub badge: Badge,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BadgeProgress {
    pub badge_id: String,
    percent: f32,
    #[serde(default)]
    pub achieved: bool,
}

impl BadgeProgress {
    /// Progress for display, clamped to 0..=100. The backend has been seen
    /// returning slightly-over-100 values for freshly awarded badges.
    pub fn percent(&self) -> f32 {
        self.percent.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub peer_id: String,
    pub peer_name: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub unread: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_missing_lists_decode_empty() {
        let batch: NotificationBatch =
            serde_json::from_str(r#"{"messages": []}"#).expect("decode");
        assert!(batch.product_alerts.is_empty());
        assert!(batch.donations.is_empty());
        assert!(batch.received_donations.is_empty());
    }

    #[test]
    fn notification_read_defaults_to_false() {
        let n: Notification = serde_json::from_str(
            r#"{
                "id": "7",
                "category": "product_alert",
                "message": "Sourdough expires soon",
                "timestamp": "2024-01-03T00:00:00Z"
            }"#,
        )
        .expect("decode");
        assert_eq!(n.category, NotificationCategory::ProductAlert);
        assert!(!n.read);
        assert!(n.sender_name.is_none());
    }

    #[test]
    fn donation_status_advances_one_step_only() {
        assert_eq!(
            DonationStatus::Preparing.next(),
            Some(DonationStatus::ReadyForPickup)
        );
        assert_eq!(
            DonationStatus::ReadyForPickup.next(),
            Some(DonationStatus::InTransit)
        );
        assert_eq!(
            DonationStatus::InTransit.next(),
            Some(DonationStatus::Received)
        );
        assert_eq!(
            DonationStatus::Received.next(),
            Some(DonationStatus::Completed)
        );
        assert_eq!(DonationStatus::Completed.next(), None);
    }

    #[test]
    fn donation_status_chain_visits_every_state_once() {
        let mut seen = vec![DonationStatus::Preparing];
        while let Some(next) = seen.last().unwrap().next() {
            assert!(!seen.contains(&next), "cycle at {next:?}");
            seen.push(next);
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn received_donations_decode_by_kind() {
        let json = r#"[
            {
                "kind": "direct",
                "id": "d-1",
                "bakery_name": "Ofenfrisch",
                "items": [{"name": "Rye loaf", "quantity": 6}],
                "status": "preparing",
                "updated_at": "2024-02-01T08:00:00Z"
            },
            {
                "kind": "accepted_request",
                "id": "r-9",
                "request_title": "Weekend pastries",
                "bakery_name": "Ofenfrisch",
                "status": "in_transit",
                "updated_at": "2024-02-02T08:00:00Z"
            }
        ]"#;
        let list: Vec<ReceivedDonation> = serde_json::from_str(json).expect("decode");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id(), "d-1");
        assert_eq!(list[0].status(), DonationStatus::Preparing);
        assert_eq!(list[0].title(), "6× Rye loaf");
        assert_eq!(list[1].counterparty(), "Ofenfrisch");
        assert_eq!(list[1].title(), "Weekend pastries");
    }

    #[test]
    fn received_donation_unknown_kind_is_an_error() {
        let json = r#"{"kind": "mystery", "id": "x"}"#;
        assert!(serde_json::from_str::<ReceivedDonation>(json).is_err());
    }

    #[test]
    fn complaint_status_uses_display_spelling_on_the_wire() {
        let s: ComplaintStatus = serde_json::from_str(r#""In Review""#).expect("decode");
        assert_eq!(s, ComplaintStatus::InReview);
        assert!(s.is_open());
        assert_eq!(serde_json::to_string(&s).expect("encode"), r#""In Review""#);
        assert!(!ComplaintStatus::Resolved.is_open());
    }

    #[test]
    fn badge_progress_percent_is_clamped() {
        let over: BadgeProgress =
            serde_json::from_str(r#"{"badge_id": "b1", "percent": 104.2, "achieved": true}"#)
                .expect("decode");
        assert_eq!(over.percent(), 100.0);
        let under: BadgeProgress =
            serde_json::from_str(r#"{"badge_id": "b2", "percent": -3.0}"#).expect("decode");
        assert_eq!(under.percent(), 0.0);
        assert!(!under.achieved);
    }
}
