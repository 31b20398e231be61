//! Order data models and API request/response types.
//!
//! This module defines:
//! - `OrderStatus`: the linear order lifecycle
//! - `Order` / `OrderLineView`: database entities
//! - `OrderSnapshot`: display-ready order with lines priced from the current catalog
//! - Request types for placing orders and changing their status

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::actor::Actor;

/// Order lifecycle: `PENDING -> COOKING -> DELIVERED -> COMPLETED`.
///
/// Stored as the Postgres enum `order_status` (lowercase labels) and sent over
/// the wire in uppercase. Lowercase input is accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "cooking")]
    Cooking,
    #[serde(alias = "delivered")]
    Delivered,
    #[serde(alias = "completed")]
    Completed,
}

impl OrderStatus {
    /// The only status this one may move to, `None` once completed.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Cooking),
            OrderStatus::Cooking => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => Some(OrderStatus::Completed),
            OrderStatus::Completed => None,
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.next() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Cooking => "COOKING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents an order record from the database.
///
/// Owned by its customer, referenced by its restaurant. Only `status` ever
/// changes after creation.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub delivery_address: String,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
}

/// An order line joined with the dish's current catalog values.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrderLineView {
    pub order_id: i64,
    pub dish_id: i64,

    /// Frozen at order creation
    pub quantity: i32,

    /// Read from `dishes` at query time
    pub name: String,
    pub price_cents: i64,
    pub image: String,
}

/// An order together with its lines, as returned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order: Order,
    pub lines: Vec<OrderLineView>,
}

/// Ownership filter applied when listing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOwner {
    /// Orders paid by this customer
    Customer(i64),
    /// Orders placed against this restaurant
    Restaurant(i64),
}

impl From<&Actor> for OrderOwner {
    fn from(actor: &Actor) -> Self {
        match actor {
            Actor::Customer(c) => OrderOwner::Customer(c.id),
            Actor::Restaurant(r) => OrderOwner::Restaurant(r.id),
        }
    }
}

/// One requested line of a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDishRequest {
    pub dish_id: i64,
    pub amount: i32,
}

/// Request body for `POST /api/order`.
///
/// ```json
/// {
///   "restaurant_id": 1,
///   "address": "Lenina 1, apt 5",
///   "dishes": [
///     { "dish_id": 5, "amount": 2 },
///     { "dish_id": 7, "amount": 1 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: i64,
    pub address: String,
    pub dishes: Vec<OrderDishRequest>,
}

impl CreateOrderRequest {
    pub fn dish_ids(&self) -> Vec<i64> {
        self.dishes.iter().map(|d| d.dish_id).collect()
    }
}

/// Request body for `PATCH /api/order/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// A display line of an order snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLineSnapshot {
    pub dish_id: i64,
    pub name: String,
    pub price_cents: i64,
    pub image: String,
    pub count: i32,
}

/// Display-ready order returned by `GET /api/order`.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 12,
///   "status": "COOKING",
///   "delivery_address": "Lenina 1",
///   "placed_at": "2025-12-21T16:00:00Z",
///   "dishes": [
///     { "dish_id": 5, "name": "Borscht", "price_cents": 999, "image": "/images/empty.jpg", "count": 3 }
///   ],
///   "total_cents": 2997
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSnapshot {
    pub id: i64,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub placed_at: DateTime<Utc>,
    pub dishes: Vec<OrderLineSnapshot>,
    pub total_cents: i64,
}

impl OrderSnapshot {
    pub fn from_record(record: OrderRecord, media_url: &str) -> Self {
        let dishes: Vec<OrderLineSnapshot> = record
            .lines
            .into_iter()
            .map(|line| OrderLineSnapshot {
                dish_id: line.dish_id,
                name: line.name,
                price_cents: line.price_cents,
                image: format!("{media_url}{}", line.image),
                count: line.quantity,
            })
            .collect();

        let total_cents = dishes
            .iter()
            .map(|d| d.price_cents * i64::from(d.count))
            .sum();

        Self {
            id: record.order.id,
            status: record.order.status,
            delivery_address: record.order.delivery_address,
            placed_at: record.order.placed_at,
            dishes,
            total_cents,
        }
    }
}
