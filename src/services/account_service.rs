//! Registration of customers and restaurants.
//!
//! # Validation
//!
//! - email must contain `@`, compared as given
//! - password between 6 and 50 characters
//! - names between 2 and 50 characters
//! - referenced cities must exist
//!
//! Emails are unique per actor kind; a duplicate is a `Conflict`.

use std::collections::BTreeSet;

use crate::{
    auth::password::PasswordVerifier,
    error::AppError,
    models::actor::{
        ActorKind, Customer, JoinCustomerRequest, JoinRestaurantRequest, NewCustomer,
        NewRestaurant, Restaurant,
    },
    repository::Store,
};

const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=50;
const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;

fn check_email(email: &str) -> Result<(), AppError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation("Invalid email".to_string())),
    }
}

fn check_length(
    field: &str,
    value: &str,
    range: std::ops::RangeInclusive<usize>,
) -> Result<(), AppError> {
    let len = value.chars().count();
    if range.contains(&len) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{field} must be between {} and {} characters",
            range.start(),
            range.end()
        )))
    }
}

async fn ensure_email_free(
    store: &dyn Store,
    kind: ActorKind,
    email: &str,
) -> Result<(), AppError> {
    if store.email_registered(kind, email).await? {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    Ok(())
}

/// Register a customer living in `city_id`.
///
/// # Errors
///
/// - `Validation`: malformed field or unknown city
/// - `Conflict`: email already used by another customer
pub async fn register_customer(
    store: &dyn Store,
    passwords: &PasswordVerifier,
    request: JoinCustomerRequest,
) -> Result<Customer, AppError> {
    check_email(&request.email)?;
    check_length("Password", &request.password, PASSWORD_LEN)?;
    check_length("First name", &request.first_name, NAME_LEN)?;
    check_length("Last name", &request.last_name, NAME_LEN)?;

    if store.count_cities(&[request.city_id]).await? == 0 {
        return Err(AppError::Validation(format!(
            "Unknown city {}",
            request.city_id
        )));
    }
    ensure_email_free(store, ActorKind::Customer, &request.email).await?;

    let (password_salt, password_hash) = passwords.derive(&request.password)?;

    let mut uow = store.begin().await?;
    let customer = uow
        .insert_customer(NewCustomer {
            email: request.email,
            password_hash,
            password_salt,
            first_name: request.first_name,
            last_name: request.last_name,
            city_id: request.city_id,
        })
        .await?;
    uow.commit().await?;

    tracing::info!(customer_id = customer.id, "customer registered");
    Ok(customer)
}

/// Register a restaurant serving `cities`, all with the same opening hours.
///
/// # Errors
///
/// - `Validation`: malformed field, no cities, or an unknown city
/// - `Conflict`: email already used by another restaurant
pub async fn register_restaurant(
    store: &dyn Store,
    passwords: &PasswordVerifier,
    request: JoinRestaurantRequest,
) -> Result<Restaurant, AppError> {
    check_email(&request.email)?;
    check_length("Password", &request.password, PASSWORD_LEN)?;
    check_length("Name", &request.name, NAME_LEN)?;

    let cities: BTreeSet<i64> = request.cities.iter().copied().collect();
    if cities.is_empty() {
        return Err(AppError::Validation(
            "At least one city is required".to_string(),
        ));
    }
    let city_ids: Vec<i64> = cities.into_iter().collect();
    if store.count_cities(&city_ids).await? != city_ids.len() {
        return Err(AppError::Validation("Unknown city".to_string()));
    }
    ensure_email_free(store, ActorKind::Restaurant, &request.email).await?;

    let (password_salt, password_hash) = passwords.derive(&request.password)?;

    let mut uow = store.begin().await?;
    let restaurant = uow
        .insert_restaurant(NewRestaurant {
            email: request.email,
            password_hash,
            password_salt,
            name: request.name,
            description: request.description,
        })
        .await?;
    for city_id in city_ids {
        uow.add_restaurant_city(restaurant.id, city_id, request.open_time, request.close_time)
            .await?;
    }
    uow.commit().await?;

    tracing::info!(restaurant_id = restaurant.id, "restaurant registered");
    Ok(restaurant)
}
