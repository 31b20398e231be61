//! Catalog models: cities, restaurant listings, categories and dishes.
//!
//! Catalog rows are mutable by their owning restaurant. Order lines reference
//! dishes by id and read name, price and image from here at query time.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A city restaurants can serve and customers can live in.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, PartialEq, Eq)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// A menu category owned by one restaurant. Names are unique per restaurant.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
}

/// A dish owned by one restaurant and filed under one of its categories.
///
/// # Price Storage
///
/// Prices are stored as `i64` cents, the same way the ledger stores money.
/// `9.99` is stored as `999`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Dish {
    pub id: i64,
    pub restaurant_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct NewDish {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
}

/// Partial update of a dish; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DishPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

impl DishPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price_cents.is_none()
    }
}

/// A restaurant as seen when browsing one city.
///
/// `is_favorite` is `None` unless the caller is an authenticated customer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestaurantListing {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub is_favorite: Option<bool>,
}

/// Query string of `GET /api/restaurant`.
#[derive(Debug, Deserialize)]
pub struct RestaurantListQuery {
    pub city_id: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Query string of `GET /api/restaurant/{id}`.
#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub city_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// Request body for `POST /api/restaurant/dish`.
///
/// ```json
/// {
///   "name": "Borscht",
///   "description": "Beet soup",
///   "price_cents": 999,
///   "category_id": 3
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateDishRequest {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DishResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub image: String,
}

impl DishResponse {
    pub fn new(dish: Dish, media_url: &str) -> Self {
        Self {
            id: dish.id,
            name: dish.name,
            description: dish.description,
            price_cents: dish.price_cents,
            image: format!("{media_url}{}", dish.image),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RestaurantListingResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub is_favorite: Option<bool>,
}

impl RestaurantListingResponse {
    pub fn new(listing: RestaurantListing, media_url: &str) -> Self {
        Self {
            id: listing.id,
            name: listing.name,
            description: listing.description,
            image: format!("{media_url}{}", listing.image),
            opening_time: listing.opening_time,
            closing_time: listing.closing_time,
            is_favorite: listing.is_favorite,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuCategoryResponse {
    pub id: i64,
    pub name: String,
    pub dishes: Vec<DishResponse>,
}

/// Restaurant listing plus its full menu grouped by category.
#[derive(Debug, Serialize)]
pub struct RestaurantMenuResponse {
    #[serde(flatten)]
    pub restaurant: RestaurantListingResponse,
    pub categories: Vec<MenuCategoryResponse>,
}
