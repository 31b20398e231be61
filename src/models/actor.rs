//! Actor models: the two principal kinds that can authenticate.
//!
//! This module defines:
//! - `ActorKind`: the kind claim carried by every access token
//! - `Customer` / `Restaurant`: database entities for each kind
//! - `Actor`: tagged union of both, produced by the actor resolver
//! - `Principal`: capability shared by both kinds (identity + password check)
//! - Registration and login request/response types

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::auth::password::PasswordVerifier;

/// Kind of authenticated principal.
///
/// Serialized as `"user"` for customers and `"restaurant"` for restaurants,
/// both in token claims and in the login `scope` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    #[serde(rename = "user")]
    Customer,
    #[serde(rename = "restaurant")]
    Restaurant,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Customer => "user",
            ActorKind::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ActorKind::Customer),
            "restaurant" => Ok(ActorKind::Restaurant),
            _ => Err(()),
        }
    }
}

/// Capability shared by every actor kind.
pub trait Principal {
    fn id(&self) -> i64;
    fn email(&self) -> &str;
    fn kind(&self) -> ActorKind;
    fn password_salt(&self) -> &str;
    fn password_hash(&self) -> &str;

    fn verify_password(&self, verifier: &PasswordVerifier, password: &str) -> bool {
        verifier.verify(self.password_salt(), password, self.password_hash())
    }
}

/// Represents a customer record from the `customers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub is_active: bool,
    pub first_name: String,
    pub last_name: String,

    /// Home city, used as the default city for restaurant browsing
    pub city_id: i64,
}

/// Represents a restaurant record from the `restaurants` table.
///
/// Served cities and opening hours live in `restaurant_cities`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Restaurant {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub is_active: bool,
    pub name: String,
    pub description: String,

    /// Path of the restaurant image relative to `MEDIA_URL`
    pub image: String,
}

impl Principal for Customer {
    fn id(&self) -> i64 {
        self.id
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn kind(&self) -> ActorKind {
        ActorKind::Customer
    }
    fn password_salt(&self) -> &str {
        &self.password_salt
    }
    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl Principal for Restaurant {
    fn id(&self) -> i64 {
        self.id
    }
    fn email(&self) -> &str {
        &self.email
    }
    fn kind(&self) -> ActorKind {
        ActorKind::Restaurant
    }
    fn password_salt(&self) -> &str {
        &self.password_salt
    }
    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

/// An authenticated principal of either kind.
#[derive(Debug, Clone)]
pub enum Actor {
    Customer(Customer),
    Restaurant(Restaurant),
}

impl Actor {
    pub fn as_principal(&self) -> &dyn Principal {
        match self {
            Actor::Customer(c) => c,
            Actor::Restaurant(r) => r,
        }
    }

    pub fn kind(&self) -> ActorKind {
        self.as_principal().kind()
    }

    pub fn id(&self) -> i64 {
        self.as_principal().id()
    }

    pub fn as_customer(&self) -> Option<&Customer> {
        match self {
            Actor::Customer(c) => Some(c),
            Actor::Restaurant(_) => None,
        }
    }
}

/// Optional actor placed in request extensions on routes open to anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct MaybeActor(pub Option<Actor>);

impl MaybeActor {
    /// Customer id when the caller is an authenticated customer.
    pub fn customer_id(&self) -> Option<i64> {
        self.0.as_ref().and_then(Actor::as_customer).map(|c| c.id)
    }
}

/// Values needed to insert a customer; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub first_name: String,
    pub last_name: String,
    pub city_id: i64,
}

/// Values needed to insert a restaurant; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub name: String,
    pub description: String,
}

/// Request body for `POST /api/users/join`.
///
/// ```json
/// {
///   "email": "alice@example.com",
///   "password": "secret1",
///   "first_name": "Alice",
///   "last_name": "Smith",
///   "city_id": 1
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct JoinCustomerRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub city_id: i64,
}

/// Request body for `POST /api/restaurant/join`.
///
/// The same opening hours apply to every listed city.
#[derive(Debug, Deserialize)]
pub struct JoinRestaurantRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub description: String,
    pub cities: Vec<i64>,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RestaurantResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
}

impl RestaurantResponse {
    pub fn new(restaurant: Restaurant, media_url: &str) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name,
            description: restaurant.description,
            image: format!("{media_url}{}", restaurant.image),
        }
    }
}

/// OAuth2 password-grant style login form (`application/x-www-form-urlencoded`).
///
/// `scope` must name exactly one actor kind: `user` or `restaurant`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}
