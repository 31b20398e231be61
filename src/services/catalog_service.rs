//! Catalog service: browsing, favorites, and menu management.
//!
//! Browsing is open to anonymous callers. Favorites belong to customers.
//! Categories and dishes are managed only by the restaurant that owns them;
//! another restaurant's category or dish looks the same as a missing one.

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::{
        actor::{Customer, MaybeActor, Restaurant},
        catalog::{
            Category, City, CreateCategoryRequest, CreateDishRequest, Dish, DishPatch,
            DishResponse, MenuCategoryResponse, NewDish, RestaurantListQuery,
            RestaurantListingResponse, RestaurantMenuResponse,
        },
    },
    repository::Store,
};

/// Largest page accepted by the restaurant listing.
pub const MAX_PAGE_SIZE: i64 = 100;

fn check_name(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn check_price(price_cents: i64) -> Result<(), AppError> {
    if price_cents < 0 {
        return Err(AppError::Validation("Price must not be negative".to_string()));
    }
    Ok(())
}

pub async fn list_cities(store: &dyn Store) -> Result<Vec<City>, AppError> {
    store.list_cities().await
}

/// One page of the restaurants serving a city.
///
/// `is_favorite` is filled only when the caller is a customer.
pub async fn list_restaurants(
    store: &dyn Store,
    viewer: &MaybeActor,
    query: RestaurantListQuery,
    media_url: &str,
) -> Result<Vec<RestaurantListingResponse>, AppError> {
    if query.offset < 0 || !(0..=MAX_PAGE_SIZE).contains(&query.limit) {
        return Err(AppError::Validation(format!(
            "offset must be >= 0 and limit between 0 and {MAX_PAGE_SIZE}"
        )));
    }

    let listings = store
        .list_restaurants(
            query.city_id,
            viewer.customer_id(),
            query.limit,
            query.offset,
        )
        .await?;

    Ok(listings
        .into_iter()
        .map(|l| RestaurantListingResponse::new(l, media_url))
        .collect())
}

/// A restaurant as served in `city_id` with its menu grouped by category.
///
/// Categories without dishes are included with an empty list.
pub async fn restaurant_menu(
    store: &dyn Store,
    viewer: &MaybeActor,
    restaurant_id: i64,
    city_id: i64,
    media_url: &str,
) -> Result<RestaurantMenuResponse, AppError> {
    let listing = store
        .find_restaurant_listing(restaurant_id, city_id, viewer.customer_id())
        .await?
        .ok_or_else(|| AppError::not_found("Restaurant"))?;

    let categories = store.list_categories(restaurant_id).await?;
    let mut dishes_by_category: HashMap<i64, Vec<DishResponse>> = HashMap::new();
    for dish in store.list_dishes(restaurant_id).await? {
        dishes_by_category
            .entry(dish.category_id)
            .or_default()
            .push(DishResponse::new(dish, media_url));
    }

    let categories = categories
        .into_iter()
        .map(|c| MenuCategoryResponse {
            dishes: dishes_by_category.remove(&c.id).unwrap_or_default(),
            id: c.id,
            name: c.name,
        })
        .collect();

    Ok(RestaurantMenuResponse {
        restaurant: RestaurantListingResponse::new(listing, media_url),
        categories,
    })
}

/// # Errors
///
/// - `NotFound`: no such restaurant
/// - `Conflict`: already a favorite
pub async fn add_favorite(
    store: &dyn Store,
    customer: &Customer,
    restaurant_id: i64,
) -> Result<(), AppError> {
    if !store.restaurant_exists(restaurant_id).await? {
        return Err(AppError::not_found("Restaurant"));
    }
    if store.favorite_exists(customer.id, restaurant_id).await? {
        return Err(AppError::Conflict(
            "Restaurant is already a favorite".to_string(),
        ));
    }

    let mut uow = store.begin().await?;
    uow.insert_favorite(customer.id, restaurant_id).await?;
    uow.commit().await?;

    tracing::info!(customer_id = customer.id, restaurant_id, "favorite added");
    Ok(())
}

/// # Errors
///
/// `NotFound` if the restaurant was not a favorite.
pub async fn remove_favorite(
    store: &dyn Store,
    customer: &Customer,
    restaurant_id: i64,
) -> Result<(), AppError> {
    let mut uow = store.begin().await?;
    if !uow.delete_favorite(customer.id, restaurant_id).await? {
        return Err(AppError::not_found("Favorite"));
    }
    uow.commit().await?;

    tracing::info!(customer_id = customer.id, restaurant_id, "favorite removed");
    Ok(())
}

/// # Errors
///
/// `Conflict` if the restaurant already has a category with this name.
pub async fn create_category(
    store: &dyn Store,
    restaurant: &Restaurant,
    request: CreateCategoryRequest,
) -> Result<Category, AppError> {
    let name = request.name.trim();
    check_name("Category name", name)?;
    if store.category_name_taken(restaurant.id, name).await? {
        return Err(AppError::Conflict("Category already exists".to_string()));
    }

    let mut uow = store.begin().await?;
    let category = uow.insert_category(restaurant.id, name).await?;
    uow.commit().await?;

    tracing::info!(restaurant_id = restaurant.id, category_id = category.id, "category created");
    Ok(category)
}

/// Delete a category together with its dishes.
pub async fn delete_category(
    store: &dyn Store,
    restaurant: &Restaurant,
    category_id: i64,
) -> Result<(), AppError> {
    let mut uow = store.begin().await?;
    if !uow.delete_category(restaurant.id, category_id).await? {
        return Err(AppError::not_found("Category"));
    }
    uow.commit().await?;

    tracing::info!(restaurant_id = restaurant.id, category_id, "category deleted");
    Ok(())
}

/// # Errors
///
/// - `Validation`: empty name, negative price, or a category of another restaurant
/// - `Conflict`: the restaurant already has a dish with this name
pub async fn create_dish(
    store: &dyn Store,
    restaurant: &Restaurant,
    request: CreateDishRequest,
) -> Result<Dish, AppError> {
    let name = request.name.trim().to_string();
    check_name("Dish name", &name)?;
    check_price(request.price_cents)?;

    if store
        .find_category(restaurant.id, request.category_id)
        .await?
        .is_none()
    {
        return Err(AppError::Validation(format!(
            "Unknown category {}",
            request.category_id
        )));
    }
    if store.dish_name_taken(restaurant.id, &name).await? {
        return Err(AppError::Conflict("Dish already exists".to_string()));
    }

    let mut uow = store.begin().await?;
    let dish = uow
        .insert_dish(
            restaurant.id,
            NewDish {
                category_id: request.category_id,
                name,
                description: request.description,
                price_cents: request.price_cents,
            },
        )
        .await?;
    uow.commit().await?;

    tracing::info!(restaurant_id = restaurant.id, dish_id = dish.id, "dish created");
    Ok(dish)
}

/// Apply a partial edit. Existing orders show the new values from then on.
pub async fn update_dish(
    store: &dyn Store,
    restaurant: &Restaurant,
    dish_id: i64,
    mut patch: DishPatch,
) -> Result<Dish, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    if let Some(name) = patch.name.take() {
        let name = name.trim().to_string();
        check_name("Dish name", &name)?;
        patch.name = Some(name);
    }
    if let Some(price_cents) = patch.price_cents {
        check_price(price_cents)?;
    }

    let mut uow = store.begin().await?;
    let dish = uow
        .update_dish(restaurant.id, dish_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Dish"))?;
    uow.commit().await?;

    tracing::info!(restaurant_id = restaurant.id, dish_id, "dish updated");
    Ok(dish)
}

/// Delete a dish. Order lines referencing it are removed with it.
pub async fn delete_dish(
    store: &dyn Store,
    restaurant: &Restaurant,
    dish_id: i64,
) -> Result<(), AppError> {
    let mut uow = store.begin().await?;
    if !uow.delete_dish(restaurant.id, dish_id).await? {
        return Err(AppError::not_found("Dish"));
    }
    uow.commit().await?;

    tracing::info!(restaurant_id = restaurant.id, dish_id, "dish deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::{
        auth::password::test_verifier,
        models::actor::{Actor, JoinCustomerRequest, JoinRestaurantRequest},
        repository::memory::MemoryStore,
        services::account_service,
    };

    const MEDIA: &str = "http://media.test";

    struct Fixture {
        store: MemoryStore,
        customer: Customer,
        restaurant: Restaurant,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let passwords = test_verifier();

        let customer = account_service::register_customer(
            &store,
            &passwords,
            JoinCustomerRequest {
                email: "alice@example.com".into(),
                password: "secret1".into(),
                first_name: "Alice".into(),
                last_name: "Smith".into(),
                city_id: 1,
            },
        )
        .await
        .unwrap();
        let restaurant = register_restaurant(&store, "r1@example.com", "Pelmeni").await;

        Fixture {
            store,
            customer,
            restaurant,
        }
    }

    async fn register_restaurant(store: &MemoryStore, email: &str, name: &str) -> Restaurant {
        account_service::register_restaurant(
            store,
            &test_verifier(),
            JoinRestaurantRequest {
                name: name.into(),
                email: email.into(),
                password: "secret1".into(),
                description: "Dumplings".into(),
                cities: vec![1],
                open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                close_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap()
    }

    fn list_query(limit: i64, offset: i64) -> RestaurantListQuery {
        RestaurantListQuery {
            city_id: 1,
            offset,
            limit,
        }
    }

    #[tokio::test]
    async fn favorite_flag_is_only_reported_to_customers() {
        let f = fixture().await;
        add_favorite(&f.store, &f.customer, f.restaurant.id)
            .await
            .unwrap();

        let as_customer = MaybeActor(Some(Actor::Customer(f.customer.clone())));
        let listed = list_restaurants(&f.store, &as_customer, list_query(10, 0), MEDIA)
            .await
            .unwrap();
        assert_eq!(listed[0].is_favorite, Some(true));
        assert_eq!(listed[0].image, "http://media.test/images/empty.jpg");

        let anonymous = list_restaurants(&f.store, &MaybeActor(None), list_query(10, 0), MEDIA)
            .await
            .unwrap();
        assert_eq!(anonymous[0].is_favorite, None);

        let as_restaurant = MaybeActor(Some(Actor::Restaurant(f.restaurant.clone())));
        let listed = list_restaurants(&f.store, &as_restaurant, list_query(10, 0), MEDIA)
            .await
            .unwrap();
        assert_eq!(listed[0].is_favorite, None);
    }

    #[tokio::test]
    async fn favorites_reject_duplicates_and_unknowns() {
        let f = fixture().await;

        add_favorite(&f.store, &f.customer, f.restaurant.id)
            .await
            .unwrap();
        assert!(matches!(
            add_favorite(&f.store, &f.customer, f.restaurant.id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            add_favorite(&f.store, &f.customer, 999).await,
            Err(AppError::NotFound(_))
        ));

        remove_favorite(&f.store, &f.customer, f.restaurant.id)
            .await
            .unwrap();
        assert!(matches!(
            remove_favorite(&f.store, &f.customer, f.restaurant.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_pages_through_restaurants() {
        let f = fixture().await;
        let second = register_restaurant(&f.store, "r2@example.com", "Blini").await;

        let page = list_restaurants(&f.store, &MaybeActor(None), list_query(1, 1), MEDIA)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, second.id);

        let too_big = list_restaurants(&f.store, &MaybeActor(None), list_query(101, 0), MEDIA).await;
        assert!(matches!(too_big, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn menu_groups_dishes_by_category() {
        let f = fixture().await;
        let soups = create_category(
            &f.store,
            &f.restaurant,
            CreateCategoryRequest {
                name: "Soups".into(),
            },
        )
        .await
        .unwrap();
        create_category(
            &f.store,
            &f.restaurant,
            CreateCategoryRequest {
                name: "Drinks".into(),
            },
        )
        .await
        .unwrap();
        create_dish(
            &f.store,
            &f.restaurant,
            CreateDishRequest {
                name: "Borscht".into(),
                description: "Beet soup".into(),
                price_cents: 999,
                category_id: soups.id,
            },
        )
        .await
        .unwrap();

        let menu = restaurant_menu(&f.store, &MaybeActor(None), f.restaurant.id, 1, MEDIA)
            .await
            .unwrap();
        assert_eq!(menu.categories.len(), 2);
        assert_eq!(menu.categories[0].dishes[0].name, "Borscht");
        assert!(menu.categories[1].dishes.is_empty());

        let elsewhere =
            restaurant_menu(&f.store, &MaybeActor(None), f.restaurant.id, 2, MEDIA).await;
        assert!(matches!(elsewhere, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn menu_is_managed_by_its_owner_only() {
        let f = fixture().await;
        let other = register_restaurant(&f.store, "r2@example.com", "Blini").await;
        let soups = create_category(
            &f.store,
            &f.restaurant,
            CreateCategoryRequest {
                name: "Soups".into(),
            },
        )
        .await
        .unwrap();
        let dish = create_dish(
            &f.store,
            &f.restaurant,
            CreateDishRequest {
                name: "Borscht".into(),
                description: String::new(),
                price_cents: 999,
                category_id: soups.id,
            },
        )
        .await
        .unwrap();

        let foreign_category = create_dish(
            &f.store,
            &other,
            CreateDishRequest {
                name: "Kvass".into(),
                description: String::new(),
                price_cents: 100,
                category_id: soups.id,
            },
        )
        .await;
        assert!(matches!(foreign_category, Err(AppError::Validation(_))));

        let patch = DishPatch {
            price_cents: Some(1),
            ..DishPatch::default()
        };
        assert!(matches!(
            update_dish(&f.store, &other, dish.id, patch).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_category(&f.store, &other, soups.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_dish(&f.store, &other, dish.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let f = fixture().await;
        let request = || CreateCategoryRequest {
            name: "Soups".into(),
        };

        create_category(&f.store, &f.restaurant, request())
            .await
            .unwrap();
        assert!(matches!(
            create_category(&f.store, &f.restaurant, request()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn dish_edit_rejects_empty_patch() {
        let f = fixture().await;
        assert!(matches!(
            update_dish(&f.store, &f.restaurant, 1, DishPatch::default()).await,
            Err(AppError::Validation(_))
        ));
    }
}
