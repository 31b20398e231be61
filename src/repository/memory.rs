//! In-process backend used by the test suites.
//!
//! A unit of work takes the store lock for its whole lifetime and edits a
//! private copy of the state, which replaces the shared state on commit.
//! Reading through the store while a unit of work is open in the same task
//! therefore waits forever; services do all their reads first.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
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

const DEFAULT_IMAGE: &str = "/images/empty.jpg";

#[derive(Debug, Clone, Copy)]
struct Hours {
    opening: NaiveTime,
    closing: NaiveTime,
}

/// Per-table id sequences, never reused after deletes.
#[derive(Debug, Clone, Default)]
struct Sequences {
    customers: i64,
    restaurants: i64,
    categories: i64,
    dishes: i64,
    orders: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct State {
    seq: Sequences,
    cities: BTreeMap<i64, City>,
    customers: BTreeMap<i64, Customer>,
    restaurants: BTreeMap<i64, Restaurant>,
    /// (restaurant_id, city_id)
    restaurant_cities: BTreeMap<(i64, i64), Hours>,
    /// (customer_id, restaurant_id)
    favorites: BTreeSet<(i64, i64)>,
    categories: BTreeMap<i64, Category>,
    dishes: BTreeMap<i64, Dish>,
    orders: BTreeMap<i64, Order>,
    /// (order_id, dish_id) -> quantity
    order_lines: BTreeMap<(i64, i64), i32>,
}

impl State {
    fn seeded() -> Self {
        let mut state = State::default();
        for (id, name) in [(1, "Tambov"), (2, "Moscow")] {
            state.cities.insert(
                id,
                City {
                    id,
                    name: name.to_string(),
                },
            );
        }
        state
    }

    fn listing(
        &self,
        restaurant: &Restaurant,
        hours: Hours,
        viewer: Option<i64>,
    ) -> RestaurantListing {
        RestaurantListing {
            id: restaurant.id,
            name: restaurant.name.clone(),
            description: restaurant.description.clone(),
            image: restaurant.image.clone(),
            opening_time: hours.opening,
            closing_time: hours.closing,
            is_favorite: viewer.map(|c| self.favorites.contains(&(c, restaurant.id))),
        }
    }

    /// Active restaurants serving `city_id`, ordered by id.
    fn serving(&self, city_id: i64) -> impl Iterator<Item = (&Restaurant, Hours)> {
        self.restaurant_cities
            .iter()
            .filter(move |((_, city), _)| *city == city_id)
            .filter_map(move |((restaurant_id, _), hours)| {
                self.restaurants
                    .get(restaurant_id)
                    .filter(|r| r.is_active)
                    .map(|r| (r, *hours))
            })
    }

    fn remove_dishes(&mut self, dish_ids: &HashSet<i64>) {
        self.dishes.retain(|id, _| !dish_ids.contains(id));
        self.order_lines
            .retain(|(_, dish_id), _| !dish_ids.contains(dish_id));
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the two seed cities (1 Tambov, 2 Moscow).
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::seeded())),
        }
    }

    /// Mark a customer inactive. Returns whether the customer existed.
    pub async fn deactivate_customer(&self, email: &str) -> bool {
        let mut state = self.state.lock().await;
        match state.customers.values_mut().find(|c| c.email == email) {
            Some(customer) => {
                customer.is_active = false;
                true
            }
            None => false,
        }
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl ActorRepository for MemoryStore {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, AppError> {
        let state = self.state.lock().await;
        Ok(state.customers.values().find(|c| c.email == email).cloned())
    }

    async fn find_restaurant_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Restaurant>, AppError> {
        let state = self.state.lock().await;
        Ok(state.restaurants.values().find(|r| r.email == email).cloned())
    }
}

#[async_trait]
impl ActorWriter for MemoryUnitOfWork {
    async fn insert_customer(&mut self, customer: NewCustomer) -> Result<Customer, AppError> {
        let state = &mut self.working;
        if state.customers.values().any(|c| c.email == customer.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if !state.cities.contains_key(&customer.city_id) {
            return Err(AppError::Validation(format!(
                "Unknown city {}",
                customer.city_id
            )));
        }

        let id = next(&mut state.seq.customers);
        let customer = Customer {
            id,
            email: customer.email,
            password_hash: customer.password_hash,
            password_salt: customer.password_salt,
            is_active: true,
            first_name: customer.first_name,
            last_name: customer.last_name,
            city_id: customer.city_id,
        };
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn insert_restaurant(
        &mut self,
        restaurant: NewRestaurant,
    ) -> Result<Restaurant, AppError> {
        let state = &mut self.working;
        if state
            .restaurants
            .values()
            .any(|r| r.email == restaurant.email)
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let id = next(&mut state.seq.restaurants);
        let restaurant = Restaurant {
            id,
            email: restaurant.email,
            password_hash: restaurant.password_hash,
            password_salt: restaurant.password_salt,
            is_active: true,
            name: restaurant.name,
            description: restaurant.description,
            image: DEFAULT_IMAGE.to_string(),
        };
        state.restaurants.insert(id, restaurant.clone());
        Ok(restaurant)
    }

    async fn add_restaurant_city(
        &mut self,
        restaurant_id: i64,
        city_id: i64,
        opening_time: NaiveTime,
        closing_time: NaiveTime,
    ) -> Result<(), AppError> {
        let state = &mut self.working;
        if !state.cities.contains_key(&city_id) {
            return Err(AppError::Validation(format!("Unknown city {city_id}")));
        }
        if state
            .restaurant_cities
            .contains_key(&(restaurant_id, city_id))
        {
            return Err(AppError::Conflict("City listed more than once".to_string()));
        }

        state.restaurant_cities.insert(
            (restaurant_id, city_id),
            Hours {
                opening: opening_time,
                closing: closing_time,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list_cities(&self) -> Result<Vec<City>, AppError> {
        let state = self.state.lock().await;
        Ok(state.cities.values().cloned().collect())
    }

    async fn count_cities(&self, city_ids: &[i64]) -> Result<usize, AppError> {
        let state = self.state.lock().await;
        let distinct: HashSet<&i64> = city_ids.iter().collect();
        Ok(distinct
            .into_iter()
            .filter(|id| state.cities.contains_key(*id))
            .count())
    }

    async fn restaurant_exists(&self, restaurant_id: i64) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .restaurants
            .get(&restaurant_id)
            .is_some_and(|r| r.is_active))
    }

    async fn list_restaurants(
        &self,
        city_id: i64,
        viewer: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RestaurantListing>, AppError> {
        let state = self.state.lock().await;
        let skip = usize::try_from(offset).unwrap_or_default();
        let take = usize::try_from(limit).unwrap_or_default();

        Ok(state
            .serving(city_id)
            .skip(skip)
            .take(take)
            .map(|(r, hours)| state.listing(r, hours, viewer))
            .collect())
    }

    async fn find_restaurant_listing(
        &self,
        restaurant_id: i64,
        city_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<RestaurantListing>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .serving(city_id)
            .find(|(r, _)| r.id == restaurant_id)
            .map(|(r, hours)| state.listing(r, hours, viewer)))
    }

    async fn list_categories(&self, restaurant_id: i64) -> Result<Vec<Category>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .values()
            .filter(|c| c.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn list_dishes(&self, restaurant_id: i64) -> Result<Vec<Dish>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .dishes
            .values()
            .filter(|d| d.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn find_category(
        &self,
        restaurant_id: i64,
        category_id: i64,
    ) -> Result<Option<Category>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .get(&category_id)
            .filter(|c| c.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn category_name_taken(&self, restaurant_id: i64, name: &str) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .values()
            .any(|c| c.restaurant_id == restaurant_id && c.name == name))
    }

    async fn dish_name_taken(&self, restaurant_id: i64, name: &str) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .dishes
            .values()
            .any(|d| d.restaurant_id == restaurant_id && d.name == name))
    }

    async fn count_restaurant_dishes(
        &self,
        restaurant_id: i64,
        dish_ids: &[i64],
    ) -> Result<usize, AppError> {
        let state = self.state.lock().await;
        let distinct: HashSet<&i64> = dish_ids.iter().collect();
        Ok(distinct
            .into_iter()
            .filter(|id| {
                state
                    .dishes
                    .get(*id)
                    .is_some_and(|d| d.restaurant_id == restaurant_id)
            })
            .count())
    }

    async fn favorite_exists(
        &self,
        customer_id: i64,
        restaurant_id: i64,
    ) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state.favorites.contains(&(customer_id, restaurant_id)))
    }
}

#[async_trait]
impl CatalogWriter for MemoryUnitOfWork {
    async fn insert_category(
        &mut self,
        restaurant_id: i64,
        name: &str,
    ) -> Result<Category, AppError> {
        let state = &mut self.working;
        if state
            .categories
            .values()
            .any(|c| c.restaurant_id == restaurant_id && c.name == name)
        {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }

        let id = next(&mut state.seq.categories);
        let category = Category {
            id,
            restaurant_id,
            name: name.to_string(),
        };
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(
        &mut self,
        restaurant_id: i64,
        category_id: i64,
    ) -> Result<bool, AppError> {
        let state = &mut self.working;
        let owned = state
            .categories
            .get(&category_id)
            .is_some_and(|c| c.restaurant_id == restaurant_id);
        if !owned {
            return Ok(false);
        }

        state.categories.remove(&category_id);
        let dish_ids: HashSet<i64> = state
            .dishes
            .values()
            .filter(|d| d.category_id == category_id)
            .map(|d| d.id)
            .collect();
        state.remove_dishes(&dish_ids);
        Ok(true)
    }

    async fn insert_dish(&mut self, restaurant_id: i64, dish: NewDish) -> Result<Dish, AppError> {
        let state = &mut self.working;
        if !state.categories.contains_key(&dish.category_id) {
            return Err(AppError::Validation(format!(
                "Unknown category {}",
                dish.category_id
            )));
        }
        if state
            .dishes
            .values()
            .any(|d| d.restaurant_id == restaurant_id && d.name == dish.name)
        {
            return Err(AppError::Conflict("Dish already exists".to_string()));
        }

        let id = next(&mut state.seq.dishes);
        let dish = Dish {
            id,
            restaurant_id,
            category_id: dish.category_id,
            name: dish.name,
            description: dish.description,
            price_cents: dish.price_cents,
            image: DEFAULT_IMAGE.to_string(),
        };
        state.dishes.insert(id, dish.clone());
        Ok(dish)
    }

    async fn update_dish(
        &mut self,
        restaurant_id: i64,
        dish_id: i64,
        patch: DishPatch,
    ) -> Result<Option<Dish>, AppError> {
        let state = &mut self.working;
        if let Some(name) = &patch.name {
            let clash = state
                .dishes
                .values()
                .any(|d| d.restaurant_id == restaurant_id && d.id != dish_id && &d.name == name);
            if clash {
                return Err(AppError::Conflict("Dish already exists".to_string()));
            }
        }

        let Some(dish) = state
            .dishes
            .get_mut(&dish_id)
            .filter(|d| d.restaurant_id == restaurant_id)
        else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            dish.name = name;
        }
        if let Some(description) = patch.description {
            dish.description = description;
        }
        if let Some(price_cents) = patch.price_cents {
            dish.price_cents = price_cents;
        }
        Ok(Some(dish.clone()))
    }

    async fn delete_dish(&mut self, restaurant_id: i64, dish_id: i64) -> Result<bool, AppError> {
        let state = &mut self.working;
        let owned = state
            .dishes
            .get(&dish_id)
            .is_some_and(|d| d.restaurant_id == restaurant_id);
        if owned {
            state.remove_dishes(&HashSet::from([dish_id]));
        }
        Ok(owned)
    }

    async fn insert_favorite(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
    ) -> Result<(), AppError> {
        if !self.working.favorites.insert((customer_id, restaurant_id)) {
            return Err(AppError::Conflict(
                "Restaurant is already a favorite".to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_favorite(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
    ) -> Result<bool, AppError> {
        Ok(self.working.favorites.remove(&(customer_id, restaurant_id)))
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, AppError> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn order_exists(&self, order_id: i64) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state.orders.contains_key(&order_id))
    }

    async fn list_orders(&self, owner: OrderOwner) -> Result<Vec<OrderRecord>, AppError> {
        let state = self.state.lock().await;

        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| match owner {
                OrderOwner::Customer(id) => o.customer_id == id,
                OrderOwner::Restaurant(id) => o.restaurant_id == id,
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));

        let wanted: HashSet<i64> = orders.iter().map(|o| o.id).collect();
        let lines: Vec<OrderLineView> = state
            .order_lines
            .iter()
            .filter(|((order_id, _), _)| wanted.contains(order_id))
            .filter_map(|(&(order_id, dish_id), &quantity)| {
                state.dishes.get(&dish_id).map(|dish| OrderLineView {
                    order_id,
                    dish_id,
                    quantity,
                    name: dish.name.clone(),
                    price_cents: dish.price_cents,
                    image: dish.image.clone(),
                })
            })
            .collect();

        Ok(assemble_records(orders, lines))
    }
}

#[async_trait]
impl OrderWriter for MemoryUnitOfWork {
    async fn create_order(
        &mut self,
        customer_id: i64,
        restaurant_id: i64,
        delivery_address: &str,
    ) -> Result<Order, AppError> {
        let state = &mut self.working;
        let id = next(&mut state.seq.orders);
        let order = Order {
            id,
            customer_id,
            restaurant_id,
            delivery_address: delivery_address.to_string(),
            placed_at: Utc::now(),
            status: OrderStatus::Pending,
        };
        state.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn add_line(
        &mut self,
        order_id: i64,
        dish_id: i64,
        quantity: i32,
    ) -> Result<(), AppError> {
        let state = &mut self.working;
        if !state.orders.contains_key(&order_id) || !state.dishes.contains_key(&dish_id) {
            return Err(AppError::Validation(format!("Unknown dish {dish_id}")));
        }
        if state.order_lines.contains_key(&(order_id, dish_id)) {
            return Err(AppError::Conflict(format!(
                "Dish {dish_id} is listed more than once"
            )));
        }

        state.order_lines.insert((order_id, dish_id), quantity);
        Ok(())
    }

    async fn update_status(
        &mut self,
        order_id: i64,
        restaurant_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, AppError> {
        match self.working.orders.get_mut(&order_id) {
            Some(order) if order.restaurant_id == restaurant_id && order.status == from => {
                order.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
