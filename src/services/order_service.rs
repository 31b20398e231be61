//! Order service - placing orders, advancing their status, listing them.
//!
//! # Atomicity Guarantees
//!
//! An order and all of its lines are written in one unit of work: either
//! every line is stored or the order does not exist. A status change is a
//! single conditional write that only succeeds from the status it was
//! validated against, so two concurrent changes cannot both win.

use std::collections::HashSet;

use crate::{
    error::AppError,
    models::{
        actor::{Actor, Customer, Restaurant},
        order::{CreateOrderRequest, Order, OrderOwner, OrderSnapshot, OrderStatus},
    },
    repository::Store,
};

/// Reject malformed orders before touching storage.
fn validate_request(request: &CreateOrderRequest) -> Result<(), AppError> {
    if request.address.trim().is_empty() {
        return Err(AppError::Validation(
            "Delivery address is required".to_string(),
        ));
    }
    if request.dishes.is_empty() {
        return Err(AppError::Validation(
            "Order must contain at least one dish".to_string(),
        ));
    }
    if let Some(line) = request.dishes.iter().find(|d| d.amount <= 0) {
        return Err(AppError::Validation(format!(
            "Amount of dish {} must be positive",
            line.dish_id
        )));
    }

    let mut seen = HashSet::new();
    if let Some(line) = request.dishes.iter().find(|d| !seen.insert(d.dish_id)) {
        return Err(AppError::Conflict(format!(
            "Dish {} is listed more than once",
            line.dish_id
        )));
    }

    Ok(())
}

/// Place an order for `customer`.
///
/// # Process
///
/// 1. Validate the request shape
/// 2. Check the restaurant exists and owns every dish
/// 3. Create the order and its lines in one unit of work
/// 4. Commit and reload the stored order
///
/// # Errors
///
/// - `Validation`: empty address or line list, non-positive amount, unknown
///   restaurant, or a dish of another restaurant
/// - `Conflict`: a dish appears twice
/// - `Database`: storage failure, nothing is stored
pub async fn place_order(
    store: &dyn Store,
    customer: &Customer,
    request: CreateOrderRequest,
) -> Result<Order, AppError> {
    validate_request(&request)?;

    if !store.restaurant_exists(request.restaurant_id).await? {
        return Err(AppError::Validation(format!(
            "Unknown restaurant {}",
            request.restaurant_id
        )));
    }

    let dish_ids = request.dish_ids();
    let owned = store
        .count_restaurant_dishes(request.restaurant_id, &dish_ids)
        .await?;
    if owned != dish_ids.len() {
        return Err(AppError::Validation(
            "Every dish must belong to the ordered restaurant".to_string(),
        ));
    }

    let mut uow = store.begin().await?;
    let order = uow
        .create_order(customer.id, request.restaurant_id, request.address.trim())
        .await?;
    for line in &request.dishes {
        uow.add_line(order.id, line.dish_id, line.amount).await?;
    }
    uow.commit().await?;

    tracing::info!(
        order_id = order.id,
        customer_id = customer.id,
        restaurant_id = order.restaurant_id,
        lines = request.dishes.len(),
        "order placed"
    );

    store
        .find_order(order.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("order {} vanished after commit", order.id)))
}

/// Move an order of `restaurant` to `new_status`.
///
/// # Errors
///
/// - `NotFound`: no such order
/// - `Forbidden`: the order belongs to another restaurant
/// - `InvalidTransition`: `new_status` is not the direct successor
/// - `Conflict`: the status changed concurrently
pub async fn set_status(
    store: &dyn Store,
    restaurant: &Restaurant,
    order_id: i64,
    new_status: OrderStatus,
) -> Result<Order, AppError> {
    let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if order.restaurant_id != restaurant.id {
        tracing::warn!(
            order_id,
            restaurant_id = restaurant.id,
            "status change attempted on another restaurant's order"
        );
        return Err(AppError::Forbidden(
            "Order belongs to another restaurant".to_string(),
        ));
    }

    if !order.status.can_transition_to(new_status) {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: new_status,
        });
    }

    let mut uow = store.begin().await?;
    let changed = uow
        .update_status(order_id, restaurant.id, order.status, new_status)
        .await?;
    if !changed {
        // Release the unit of work before reading again
        drop(uow);
        if !store.order_exists(order_id).await? {
            return Err(AppError::not_found("Order"));
        }
        return Err(AppError::Conflict(
            "Order status changed concurrently".to_string(),
        ));
    }
    uow.commit().await?;

    tracing::info!(order_id, from = %order.status, to = %new_status, "order status changed");

    Ok(Order {
        status: new_status,
        ..order
    })
}

/// Orders visible to `actor`: paid by a customer, or placed against a
/// restaurant. Lines show the dishes' current catalog values.
pub async fn list_for_actor(
    store: &dyn Store,
    actor: &Actor,
    media_url: &str,
) -> Result<Vec<OrderSnapshot>, AppError> {
    let records = store.list_orders(OrderOwner::from(actor)).await?;

    Ok(records
        .into_iter()
        .map(|record| OrderSnapshot::from_record(record, media_url))
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::{
        auth::password::test_verifier,
        models::{
            actor::{JoinCustomerRequest, JoinRestaurantRequest},
            catalog::{CreateCategoryRequest, CreateDishRequest, Dish, DishPatch},
            order::OrderDishRequest,
        },
        repository::{CatalogRepository, OrderRepository, memory::MemoryStore},
        services::{account_service, catalog_service},
    };

    const MEDIA: &str = "http://media.test";

    struct Fixture {
        store: MemoryStore,
        alice: Customer,
        bob: Customer,
        r1: Restaurant,
        r2: Restaurant,
        soup: Dish,
        bread: Dish,
        r2_dish: Dish,
    }

    async fn customer(store: &MemoryStore, email: &str) -> Customer {
        account_service::register_customer(
            store,
            &test_verifier(),
            JoinCustomerRequest {
                email: email.into(),
                password: "secret1".into(),
                first_name: "Name".into(),
                last_name: "Surname".into(),
                city_id: 1,
            },
        )
        .await
        .unwrap()
    }

    async fn restaurant(store: &MemoryStore, email: &str) -> Restaurant {
        account_service::register_restaurant(
            store,
            &test_verifier(),
            JoinRestaurantRequest {
                name: "Kitchen".into(),
                email: email.into(),
                password: "secret1".into(),
                description: String::new(),
                cities: vec![1],
                open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                close_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap()
    }

    async fn dish(store: &MemoryStore, owner: &Restaurant, name: &str, price_cents: i64) -> Dish {
        let categories = store.list_categories(owner.id).await.unwrap();
        let category = match categories.into_iter().next() {
            Some(c) => c,
            None => catalog_service::create_category(
                store,
                owner,
                CreateCategoryRequest {
                    name: "Main".into(),
                },
            )
            .await
            .unwrap(),
        };

        catalog_service::create_dish(
            store,
            owner,
            CreateDishRequest {
                name: name.into(),
                description: String::new(),
                price_cents,
                category_id: category.id,
            },
        )
        .await
        .unwrap()
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let alice = customer(&store, "alice@example.com").await;
        let bob = customer(&store, "bob@example.com").await;
        let r1 = restaurant(&store, "r1@example.com").await;
        let r2 = restaurant(&store, "r2@example.com").await;
        let soup = dish(&store, &r1, "Soup", 450).await;
        let bread = dish(&store, &r1, "Bread", 100).await;
        let r2_dish = dish(&store, &r2, "Blini", 300).await;

        Fixture {
            store,
            alice,
            bob,
            r1,
            r2,
            soup,
            bread,
            r2_dish,
        }
    }

    fn request(restaurant_id: i64, lines: &[(i64, i32)]) -> CreateOrderRequest {
        CreateOrderRequest {
            restaurant_id,
            address: "Lenina 1".into(),
            dishes: lines
                .iter()
                .map(|&(dish_id, amount)| OrderDishRequest { dish_id, amount })
                .collect(),
        }
    }

    #[tokio::test]
    async fn two_line_order_is_listed_with_total() {
        let f = fixture().await;
        let order = place_order(
            &f.store,
            &f.alice,
            request(f.r1.id, &[(f.soup.id, 2), (f.bread.id, 1)]),
        )
        .await
        .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let listed = list_for_actor(&f.store, &Actor::Customer(f.alice.clone()), MEDIA)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, order.id);
        assert_eq!(listed[0].dishes.len(), 2);
        assert_eq!(listed[0].total_cents, 2 * 450 + 100);
        assert_eq!(listed[0].dishes[0].image, "http://media.test/images/empty.jpg");
    }

    #[tokio::test]
    async fn repeated_dish_conflicts_and_stores_nothing() {
        let f = fixture().await;
        let result = place_order(
            &f.store,
            &f.alice,
            request(f.r1.id, &[(f.soup.id, 1), (f.soup.id, 2)]),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let listed = list_for_actor(&f.store, &Actor::Customer(f.alice.clone()), MEDIA)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_orders() {
        let f = fixture().await;

        let mut no_address = request(f.r1.id, &[(f.soup.id, 1)]);
        no_address.address = "   ".into();
        let no_lines = request(f.r1.id, &[]);
        let zero_amount = request(f.r1.id, &[(f.soup.id, 0)]);
        let unknown_restaurant = request(999, &[(f.soup.id, 1)]);
        let foreign_dish = request(f.r1.id, &[(f.soup.id, 1), (f.r2_dish.id, 1)]);
        let unknown_dish = request(f.r1.id, &[(12345, 1)]);

        for bad in [
            no_address,
            no_lines,
            zero_amount,
            unknown_restaurant,
            foreign_dish,
            unknown_dish,
        ] {
            let result = place_order(&f.store, &f.alice, bad).await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{result:?}");
        }
    }

    #[tokio::test]
    async fn listing_is_filtered_by_actor() {
        let f = fixture().await;
        place_order(&f.store, &f.alice, request(f.r1.id, &[(f.soup.id, 1)]))
            .await
            .unwrap();
        place_order(&f.store, &f.bob, request(f.r2.id, &[(f.r2_dish.id, 1)]))
            .await
            .unwrap();
        place_order(&f.store, &f.bob, request(f.r1.id, &[(f.bread.id, 3)]))
            .await
            .unwrap();

        let count = |actor: Actor| {
            let store = f.store.clone();
            async move { list_for_actor(&store, &actor, MEDIA).await.unwrap().len() }
        };

        assert_eq!(count(Actor::Customer(f.alice.clone())).await, 1);
        assert_eq!(count(Actor::Customer(f.bob.clone())).await, 2);
        assert_eq!(count(Actor::Restaurant(f.r1.clone())).await, 2);
        assert_eq!(count(Actor::Restaurant(f.r2.clone())).await, 1);
    }

    #[tokio::test]
    async fn newest_orders_come_first() {
        let f = fixture().await;
        let first = place_order(&f.store, &f.alice, request(f.r1.id, &[(f.soup.id, 1)]))
            .await
            .unwrap();
        let second = place_order(&f.store, &f.alice, request(f.r1.id, &[(f.bread.id, 1)]))
            .await
            .unwrap();

        let listed = list_for_actor(&f.store, &Actor::Customer(f.alice.clone()), MEDIA)
            .await
            .unwrap();
        let ids: Vec<i64> = listed.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn status_advances_one_step_at_a_time() {
        let f = fixture().await;
        let order = place_order(&f.store, &f.alice, request(f.r1.id, &[(f.soup.id, 1)]))
            .await
            .unwrap();

        let skipped = set_status(&f.store, &f.r1, order.id, OrderStatus::Delivered).await;
        assert!(matches!(
            skipped,
            Err(AppError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered
            })
        ));

        for next in [
            OrderStatus::Cooking,
            OrderStatus::Delivered,
            OrderStatus::Completed,
        ] {
            let updated = set_status(&f.store, &f.r1, order.id, next).await.unwrap();
            assert_eq!(updated.status, next);
        }

        let backwards = set_status(&f.store, &f.r1, order.id, OrderStatus::Pending).await;
        assert!(matches!(backwards, Err(AppError::InvalidTransition { .. })));

        let stored = f.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn another_restaurants_order_is_forbidden() {
        let f = fixture().await;
        let order = place_order(&f.store, &f.alice, request(f.r1.id, &[(f.soup.id, 1)]))
            .await
            .unwrap();

        let result = set_status(&f.store, &f.r2, order.id, OrderStatus::Cooking).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let stored = f.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);

        let missing = set_status(&f.store, &f.r1, 999, OrderStatus::Cooking).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn reads_are_repeatable() {
        let f = fixture().await;
        place_order(&f.store, &f.alice, request(f.r1.id, &[(f.soup.id, 2)]))
            .await
            .unwrap();

        let actor = Actor::Customer(f.alice.clone());
        let first = list_for_actor(&f.store, &actor, MEDIA).await.unwrap();
        let second = list_for_actor(&f.store, &actor, MEDIA).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn listing_shows_the_current_dish_price() {
        let f = fixture().await;
        place_order(&f.store, &f.alice, request(f.r1.id, &[(f.soup.id, 2)]))
            .await
            .unwrap();

        catalog_service::update_dish(
            &f.store,
            &f.r1,
            f.soup.id,
            DishPatch {
                price_cents: Some(500),
                ..DishPatch::default()
            },
        )
        .await
        .unwrap();

        let listed = list_for_actor(&f.store, &Actor::Customer(f.alice.clone()), MEDIA)
            .await
            .unwrap();
        assert_eq!(listed[0].dishes[0].price_cents, 500);
        assert_eq!(listed[0].total_cents, 1000);
    }
}
