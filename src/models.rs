use serde::{Deserialize, Serialize};

/// Payment lifecycle of an order: created -> pending -> paid | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(OrderStatus::Created),
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Order total in cents; formatted with two decimals on the wire.
    pub total_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub billing_email: String,
    pub billing_street: String,
    pub billing_zipcode: String,
    pub billing_city: String,
    pub billing_country: String,
    /// Provider slip id, captured from the creation response.
    pub slip_id: Option<String>,
    /// First transaction id from the creation response. Set at most once per
    /// order; its presence is the idempotency guard for slip creation.
    pub transaction_id: Option<String>,
    /// Opaque token for the client-side payment widget.
    pub checkout_token: Option<String>,
    /// Monotonic latch: once true it is never reset.
    pub is_paid: bool,
    pub stock_reduced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub product_id: String,
    pub quantity: i64,
    pub total_cents: i64,
    pub currency: String,
    pub billing_email: String,
    pub billing_street: String,
    pub billing_zipcode: String,
    pub billing_city: String,
    pub billing_country: String,
}

/// Per-order transaction record, persisted on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub slip_id: Option<String>,
    pub transaction_id: Option<String>,
    pub checkout_token: Option<String>,
    pub is_paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderNote {
    pub order_id: String,
    pub note: String,
    pub created_at: i64,
}

/// Format a cent amount as a signed two-decimal string ("4999" -> "49.99",
/// "-4999" -> "-49.99"), the shape the provider expects.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
