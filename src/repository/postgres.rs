//! PostgreSQL backend.
//!
//! Reads run directly on the pool. A [`PgUnitOfWork`] wraps one
//! `sqlx::Transaction`; sqlx rolls it back when dropped uncommitted.

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{Postgres, Transaction};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        actor::{Customer, NewCustomer, NewRestaurant, Restaurant},
        catalog::{Category, City, Dish, DishPatch, NewDish, RestaurantListing},
        order::{Order, OrderLineView, OrderOwner, OrderRecord, OrderStatus},
    },
    repository::{
        ActorRepository, ActorWriter, CatalogRepository, CatalogWriter, OrderRepository,
        OrderWriter, Store, UnitOfWork, orders::assemble_records,
    },
};

/// Listing columns shared by the browse and menu queries.
///
/// `$1` is the city, `$2` the viewing customer (NULL when anonymous).
const LISTING_SELECT: &str = r#"
    SELECT r.id, r.name, r.description, r.image,
           rc.opening_time, rc.closing_time,
           CASE WHEN $2::BIGINT IS NULL THEN NULL
                ELSE EXISTS (
                    SELECT 1 FROM favorite_restaurants f
                    WHERE f.customer_id = $2 AND f.restaurant_id = r.id
                )
           END AS is_favorite
    FROM restaurants r
    JOIN restaurant_cities rc ON rc.restaurant_id = r.id
    WHERE rc.city_id = $1 AND r.is_active
"#;

/// Map a unique violation to `Conflict(reason)`, anything else to `Database`.
fn unique_or(err: sqlx::Error, reason: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(reason.to_string())
        }
        _ => AppError::Database(err),
    }
}

fn count_to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or_default()
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ActorRepository for PgStore {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    async fn find_restaurant_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Restaurant>, AppError> {
        let restaurant =
            sqlx::query_as::<_, Restaurant>("SELECT * FROM restaurants WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(restaurant)
    }
}

#[async_trait]
impl ActorWriter for PgUnitOfWork {
    async fn insert_customer(&mut self, customer: NewCustomer) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (email, password_hash, password_salt, first_name, last_name, city_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(customer.email)
        .bind(customer.password_hash)
        .bind(customer.password_salt)
        .bind(customer.first_name)
        .bind(customer.last_name)
        .bind(customer.city_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, "Email already registered"))
    }

    async fn insert_restaurant(
        &mut self,
        restaurant: NewRestaurant,
    ) -> Result<Restaurant, AppError> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurants (email, password_hash, password_salt, name, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(restaurant.email)
        .bind(restaurant.password_hash)
        .bind(restaurant.password_salt)
        .bind(restaurant.name)
        .bind(restaurant.description)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, "Email already registered"))
    }

    async fn add_restaurant_city(
        &mut self,
        restaurant_id: i64,
        city_id: i64,
        opening_time: NaiveTime,
        closing_time: NaiveTime,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO restaurant_cities (restaurant_id, city_id, opening_time, closing_time)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(restaurant_id)
        .bind(city_id)
        .bind(opening_time)
        .bind(closing_time)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, "City listed more than once"))?;

        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn list_cities(&self) -> Result<Vec<City>, AppError> {
        let cities = sqlx::query_as::<_, City>("SELECT id, name FROM cities ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(cities)
    }

    async fn count_cities(&self, city_ids: &[i64]) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cities WHERE id = ANY($1)")
            .bind(city_ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(count_to_usize(count))
    }

    async fn restaurant_exists(&self, restaurant_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM restaurants WHERE id = $1 AND is_active)",
        )
        .bind(restaurant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_restaurants(
        &self,
        city_id: i64,
        viewer: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RestaurantListing>, AppError> {
        let sql = format!("{LISTING_SELECT} ORDER BY r.id LIMIT $3 OFFSET $4");

        let listings = sqlx::query_as::<_, RestaurantListing>(&sql)
            .bind(city_id)
            .bind(viewer)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(listings)
    }

    async fn find_restaurant_listing(
        &self,
        restaurant_id: i64,
        city_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<RestaurantListing>, AppError> {
        let sql = format!("{LISTING_SELECT} AND r.id = $3");

        let listing = sqlx::query_as::<_, RestaurantListing>(&sql)
            .bind(city_id)
            .bind(viewer)
            .bind(restaurant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(listing)
    }

    async fn list_categories(&self, restaurant_id: i64) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, restaurant_id, name FROM categories WHERE restaurant_id = $1 ORDER BY id",
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn list_dishes(&self, restaurant_id: i64) -> Result<Vec<Dish>, AppError> {
        let dishes = sqlx::query_as::<_, Dish>(
            "SELECT * FROM dishes WHERE restaurant_id = $1 ORDER BY id",
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(dishes)
    }

    async fn find_category(
        &self,
        restaurant_id: i64,
        category_id: i64,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, restaurant_id, name FROM categories WHERE id = $1 AND restaurant_id = $2",
        )
        .bind(category_id)
        .bind(restaurant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn category_name_taken(&self, restaurant_id: i64, name: &str) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE restaurant_id = $1 AND name = $2)",
        )
        .bind(restaurant_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn dish_name_taken(&self, restaurant_id: i64, name: &str) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM dishes WHERE restaurant_id = $1 AND name = $2)",
        )
        .bind(restaurant_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn count_restaurant_dishes(
        &self,
        restaurant_id: i64,
        dish_ids: &[i64],
    ) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dishes WHERE restaurant_id = $1 AND id = ANY($2)",
        )
        .bind(restaurant_id)
        .bind(dish_ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(count_to_usize(count))
    }

    async fn favorite_exists(
        &self,
        customer_id: i64,
        restaurant_id: i64,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM favorite_restaurants
                WHERE customer_id = $1 AND restaurant_id = $2
            )
            "#,
        )
        .bind(customer_id)
        .bind(restaurant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl CatalogWriter for PgUnitOfWork {
    async fn insert_category(
        &mut self,
        restaurant_id: i64,
        name: &str,
    ) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (restaurant_id, name) VALUES ($1, $2) RETURNING id, restaurant_id, name",
        )
        .bind(restaurant_id)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, "Category already exists"))
    }

    async fn delete_category(
        &mut self,
        restaurant_id: i64,
        category_id: i64,
    ) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1 AND restaurant_id = $2")
            .bind(category_id)
            .bind(restaurant_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn insert_dish(&mut self, restaurant_id: i64, dish: NewDish) -> Result<Dish, AppError> {
        sqlx::query_as::<_, Dish>(
            r#"
            INSERT INTO dishes (restaurant_id, category_id, name, description, price_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(restaurant_id)
        .bind(dish.category_id)
        .bind(dish.name)
        .bind(dish.description)
        .bind(dish.price_cents)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, "Dish already exists"))
    }

    async fn update_dish(
        &mut self,
        restaurant_id: i64,
        dish_id: i64,
        patch: DishPatch,
    ) -> Result<Option<Dish>, AppError> {
        sqlx::query_as::<_, Dish>(
            r#"
            UPDATE dishes
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                price_cents = COALESCE($5, price_cents)
            WHERE id = $1 AND restaurant_id = $2
            RETURNING *
            "#,
        )
        .bind(dish_id)
        .bind(restaurant_id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.price_cents)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| unique_or(e, "Dish already exists"))
    }

    async fn delete_dish(&mut self, restaurant_id: i64, dish_id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM dishes WHERE id = $1 AND restaurant_id = $2")
            .bind(dish_id)
            .bind(restaurant_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn insert_favorite(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO favorite_restaurants (customer_id, restaurant_id) VALUES ($1, $2)")
            .bind(customer_id)
            .bind(restaurant_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| unique_or(e, "Restaurant is already a favorite"))?;

        Ok(())
    }

    async fn delete_favorite(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
    ) -> Result<bool, AppError> {
        let deleted = sqlx::query(
            "DELETE FROM favorite_restaurants WHERE customer_id = $1 AND restaurant_id = $2",
        )
        .bind(customer_id)
        .bind(restaurant_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(deleted > 0)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    async fn order_exists(&self, order_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn list_orders(&self, owner: OrderOwner) -> Result<Vec<OrderRecord>, AppError> {
        let (column, owner_id) = match owner {
            OrderOwner::Customer(id) => ("customer_id", id),
            OrderOwner::Restaurant(id) => ("restaurant_id", id),
        };
        let sql = format!("SELECT * FROM orders WHERE {column} = $1 ORDER BY placed_at DESC, id DESC");

        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let lines = sqlx::query_as::<_, OrderLineView>(
            r#"
            SELECT ol.order_id, ol.dish_id, ol.quantity, d.name, d.price_cents, d.image
            FROM order_lines ol
            JOIN dishes d ON d.id = ol.dish_id
            WHERE ol.order_id = ANY($1)
            ORDER BY ol.order_id, ol.dish_id
            "#,
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_records(orders, lines))
    }
}

#[async_trait]
impl OrderWriter for PgUnitOfWork {
    async fn create_order(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
        delivery_address: &str,
    ) -> Result<Order, AppError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (customer_id, restaurant_id, delivery_address, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(restaurant_id)
        .bind(delivery_address)
        .bind(OrderStatus::Pending)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(order)
    }

    async fn add_line(
        &mut self,
        order_id: i64,
        dish_id: i64,
        quantity: i32,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO order_lines (order_id, dish_id, quantity) VALUES ($1, $2, $3)")
            .bind(order_id)
            .bind(dish_id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(|err| match &err {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::Validation(format!("Unknown dish {dish_id}"))
                }
                _ => unique_or(err, &format!("Dish {dish_id} is listed more than once")),
            })?;

        Ok(())
    }

    async fn update_status(
        &mut self,
        order_id: i64,
        restaurant_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $4
            WHERE id = $1 AND restaurant_id = $2 AND status = $3
            "#,
        )
        .bind(order_id)
        .bind(restaurant_id)
        .bind(from)
        .bind(to)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }
}
