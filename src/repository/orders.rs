//! Order repository.
//!
//! Orders and their lines are written inside the caller's unit of work.
//! Listing reconstructs each order's snapshot by joining the frozen
//! `(dish_id, quantity)` pairs against the dishes' current catalog values.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::order::{Order, OrderLineView, OrderOwner, OrderRecord, OrderStatus},
};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, AppError>;

    async fn order_exists(&self, order_id: i64) -> Result<bool, AppError>;

    /// Orders of one customer or one restaurant, newest first, each with its
    /// lines ordered by dish id.
    async fn list_orders(&self, owner: OrderOwner) -> Result<Vec<OrderRecord>, AppError>;
}

#[async_trait]
pub trait OrderWriter: Send {
    /// Insert a `PENDING` order. Lines are added separately in the same unit of work.
    async fn create_order(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
        delivery_address: &str,
    ) -> Result<Order, AppError>;

    /// # Errors
    ///
    /// - `Conflict`: the order already has a line for this dish
    /// - `Validation`: the order or dish does not exist
    async fn add_line(&mut self, order_id: i64, dish_id: i64, quantity: i32)
    -> Result<(), AppError>;

    /// Set `to` only if the order belongs to `restaurant_id` and is still in
    /// `from`, as one conditional write. Returns whether a row changed.
    async fn update_status(
        &mut self,
        order_id: i64,
        restaurant_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, AppError>;
}

/// Attach lines to their orders, keeping the orders' sequence.
pub(crate) fn assemble_records(orders: Vec<Order>, lines: Vec<OrderLineView>) -> Vec<OrderRecord> {
    let mut by_order: HashMap<i64, Vec<OrderLineView>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line);
    }

    orders
        .into_iter()
        .map(|order| {
            let mut lines = by_order.remove(&order.id).unwrap_or_default();
            lines.sort_by_key(|l| l.dish_id);
            OrderRecord { order, lines }
        })
        .collect()
}
