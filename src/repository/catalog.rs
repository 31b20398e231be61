//! Catalog storage: cities, restaurant listings, categories, dishes, favorites.
//!
//! Every mutating call is scoped to the owning restaurant (or customer for
//! favorites) so ownership is part of the write itself.

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::catalog::{Category, City, Dish, DishPatch, NewDish, RestaurantListing},
};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_cities(&self) -> Result<Vec<City>, AppError>;

    /// Number of distinct ids in `city_ids` that exist.
    async fn count_cities(&self, city_ids: &[i64]) -> Result<usize, AppError>;

    async fn restaurant_exists(&self, restaurant_id: i64) -> Result<bool, AppError>;

    /// Active restaurants serving `city_id`, ordered by id.
    ///
    /// `viewer` is the customer whose favorites fill `is_favorite`.
    async fn list_restaurants(
        &self,
        city_id: i64,
        viewer: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RestaurantListing>, AppError>;

    async fn find_restaurant_listing(
        &self,
        restaurant_id: i64,
        city_id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<RestaurantListing>, AppError>;

    /// Categories of a restaurant, ordered by id.
    async fn list_categories(&self, restaurant_id: i64) -> Result<Vec<Category>, AppError>;

    /// Dishes of a restaurant, ordered by id.
    async fn list_dishes(&self, restaurant_id: i64) -> Result<Vec<Dish>, AppError>;

    async fn find_category(
        &self,
        restaurant_id: i64,
        category_id: i64,
    ) -> Result<Option<Category>, AppError>;

    async fn category_name_taken(&self, restaurant_id: i64, name: &str) -> Result<bool, AppError>;

    async fn dish_name_taken(&self, restaurant_id: i64, name: &str) -> Result<bool, AppError>;

    /// Number of distinct ids in `dish_ids` that belong to the restaurant.
    async fn count_restaurant_dishes(
        &self,
        restaurant_id: i64,
        dish_ids: &[i64],
    ) -> Result<usize, AppError>;

    async fn favorite_exists(&self, customer_id: i64, restaurant_id: i64)
    -> Result<bool, AppError>;
}

#[async_trait]
pub trait CatalogWriter: Send {
    /// # Errors
    ///
    /// `Conflict` if the restaurant already has a category with that name.
    async fn insert_category(&mut self, restaurant_id: i64, name: &str)
    -> Result<Category, AppError>;

    /// Deletes the category and, by cascade, its dishes. Returns whether a row was removed.
    async fn delete_category(&mut self, restaurant_id: i64, category_id: i64)
    -> Result<bool, AppError>;

    /// # Errors
    ///
    /// `Conflict` if the restaurant already has a dish with that name.
    async fn insert_dish(&mut self, restaurant_id: i64, dish: NewDish) -> Result<Dish, AppError>;

    /// `None` if the dish does not exist or belongs to another restaurant.
    async fn update_dish(
        &mut self,
        restaurant_id: i64,
        dish_id: i64,
        patch: DishPatch,
    ) -> Result<Option<Dish>, AppError>;

    /// Deletes the dish and, by cascade, its order lines.
    async fn delete_dish(&mut self, restaurant_id: i64, dish_id: i64) -> Result<bool, AppError>;

    /// # Errors
    ///
    /// `Conflict` if already a favorite.
    async fn insert_favorite(&mut self, customer_id: i64, restaurant_id: i64)
    -> Result<(), AppError>;

    async fn delete_favorite(&mut self, customer_id: i64, restaurant_id: i64)
    -> Result<bool, AppError>;
}
