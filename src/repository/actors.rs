//! Credential store: customers and restaurants.
//!
//! Emails are unique within each kind only; a customer and a restaurant may
//! register with the same address.

use async_trait::async_trait;
use chrono::NaiveTime;

use crate::{
    error::AppError,
    models::actor::{ActorKind, Customer, NewCustomer, NewRestaurant, Restaurant},
};

#[async_trait]
pub trait ActorRepository: Send + Sync {
    /// Lookup by email, active or not.
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, AppError>;

    /// Lookup by email, active or not.
    async fn find_restaurant_by_email(&self, email: &str)
    -> Result<Option<Restaurant>, AppError>;

    async fn email_registered(&self, kind: ActorKind, email: &str) -> Result<bool, AppError> {
        Ok(match kind {
            ActorKind::Customer => self.find_customer_by_email(email).await?.is_some(),
            ActorKind::Restaurant => self.find_restaurant_by_email(email).await?.is_some(),
        })
    }
}

#[async_trait]
pub trait ActorWriter: Send {
    /// # Errors
    ///
    /// `Conflict` if a customer with the same email exists.
    async fn insert_customer(&mut self, customer: NewCustomer) -> Result<Customer, AppError>;

    /// # Errors
    ///
    /// `Conflict` if a restaurant with the same email exists.
    async fn insert_restaurant(&mut self, restaurant: NewRestaurant)
    -> Result<Restaurant, AppError>;

    async fn add_restaurant_city(
        &mut self,
        restaurant_id: i64,
        city_id: i64,
        opening_time: NaiveTime,
        closing_time: NaiveTime,
    ) -> Result<(), AppError>;
}
