// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surfaces of the internal services.
//!
//! Each service is assembled from a [`RouteTable`], so every route carries an
//! explicit access rule, and is wrapped in the header trust filter that turns
//! gateway-issued `X-User-*` headers into a [`RequestIdentity`].
//!
//! [`RequestIdentity`]: crate::auth::RequestIdentity

use axum::{http::Method, middleware::from_fn_with_state, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{header_trust, Access, HeaderTrust, Role},
    models::{
        LoginRequest, LoginResponse, Notification, Order, OrderRequest, OrderStatus, Restaurant,
        RestaurantRequest,
    },
    state::{AuthState, NotificationState, OrderState, RestaurantState},
};

pub mod auth;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod policy;
pub mod restaurants;

pub use health::HealthState;
pub use policy::{PolicyError, RoutePolicy, RouteTable};

const OWNERS: &[Role] = &[Role::RestaurantOwner, Role::Admin];
const CUSTOMERS: &[Role] = &[Role::Customer];

// =============================================================================
// Route tables
// =============================================================================

pub fn auth_routes() -> RouteTable<AuthState> {
    RouteTable::new().route(Method::POST, "/api/v1/auth/signin", Access::Public, auth::sign_in)
}

pub fn order_routes() -> RouteTable<OrderState> {
    RouteTable::new()
        .route(Method::POST, "/api/v1/orders", Access::Roles(CUSTOMERS), orders::create_order)
        .route(
            Method::GET,
            "/api/v1/orders/resilience-checker",
            Access::Public,
            orders::resilience_checker,
        )
        .route(Method::GET, "/api/v1/orders/{order_id}", Access::Authenticated, orders::get_order)
        .route(
            Method::GET,
            "/api/v1/orders/customer/{customer_id}",
            Access::Authenticated,
            orders::list_customer_orders,
        )
        .route(
            Method::GET,
            "/api/v1/orders/restaurant/{restaurant_id}",
            Access::Authenticated,
            orders::list_restaurant_orders,
        )
}

pub fn restaurant_routes() -> RouteTable<RestaurantState> {
    RouteTable::new()
        .route(Method::GET, "/api/v1/restaurants", Access::Public, restaurants::list_restaurants)
        .route(
            Method::POST,
            "/api/v1/restaurants",
            Access::Roles(OWNERS),
            restaurants::create_restaurant,
        )
        .route(
            Method::GET,
            "/api/v1/restaurants/my-restaurants",
            Access::Roles(OWNERS),
            restaurants::my_restaurants,
        )
        .route(
            Method::GET,
            "/api/v1/restaurants/count",
            Access::Public,
            restaurants::restaurant_count,
        )
        .route(
            Method::GET,
            "/api/v1/restaurants/{restaurant_id}",
            Access::Public,
            restaurants::get_restaurant,
        )
        .route(
            Method::PUT,
            "/api/v1/restaurants/{restaurant_id}",
            Access::Owner(OWNERS),
            restaurants::update_restaurant,
        )
        .route(
            Method::DELETE,
            "/api/v1/restaurants/{restaurant_id}",
            Access::Owner(OWNERS),
            restaurants::delete_restaurant,
        )
        .route(
            Method::GET,
            "/api/v1/restaurants/{restaurant_id}/exists",
            Access::Public,
            restaurants::restaurant_exists,
        )
}

pub fn notification_routes() -> RouteTable<NotificationState> {
    RouteTable::new()
        .route(
            Method::GET,
            "/api/v1/notifications",
            Access::Authenticated,
            notifications::list_notifications,
        )
        .route(
            Method::GET,
            "/api/v1/notifications/recipient/{recipient_id}",
            Access::Authenticated,
            notifications::list_recipient_notifications,
        )
}

// =============================================================================
// Service routers
// =============================================================================

fn assemble<S>(
    table: RouteTable<S>,
    state: S,
    health: HealthState,
    trust: HeaderTrust,
    doc: utoipa::openapi::OpenApi,
) -> Result<Router, PolicyError>
where
    S: Clone + Send + Sync + 'static,
{
    let service = health.service;
    let routes = table.policies().len();
    let router = table
        .into_router()?
        .with_state(state)
        .merge(health::router(health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", doc))
        .layer(from_fn_with_state(trust, header_trust))
        .layer(TraceLayer::new_for_http());

    tracing::debug!(service, routes, "Service router assembled");
    Ok(router)
}

pub fn auth_service(
    state: AuthState,
    health: HealthState,
    trust: HeaderTrust,
) -> Result<Router, PolicyError> {
    assemble(auth_routes(), state, health, trust, AuthApiDoc::openapi())
}

pub fn order_service(
    state: OrderState,
    health: HealthState,
    trust: HeaderTrust,
) -> Result<Router, PolicyError> {
    assemble(order_routes(), state, health, trust, OrderApiDoc::openapi())
}

pub fn restaurant_service(
    state: RestaurantState,
    health: HealthState,
    trust: HeaderTrust,
) -> Result<Router, PolicyError> {
    assemble(restaurant_routes(), state, health, trust, RestaurantApiDoc::openapi())
}

pub fn notification_service(
    state: NotificationState,
    health: HealthState,
    trust: HeaderTrust,
) -> Result<Router, PolicyError> {
    assemble(notification_routes(), state, health, trust, NotificationApiDoc::openapi())
}

// =============================================================================
// OpenAPI documents
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(auth::sign_in, health::health, health::liveness, health::readiness),
    components(schemas(LoginRequest, LoginResponse, Role)),
    tags((name = "Auth", description = "Credential sign-in and token issuance"))
)]
struct AuthApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order,
        orders::get_order,
        orders::list_customer_orders,
        orders::list_restaurant_orders,
        orders::resilience_checker,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(schemas(Order, OrderRequest, OrderStatus, orders::ResilienceResponse)),
    tags((name = "Orders", description = "Order placement and lookup"))
)]
struct OrderApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        restaurants::create_restaurant,
        restaurants::list_restaurants,
        restaurants::my_restaurants,
        restaurants::get_restaurant,
        restaurants::update_restaurant,
        restaurants::delete_restaurant,
        restaurants::restaurant_exists,
        restaurants::restaurant_count,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(schemas(Restaurant, RestaurantRequest)),
    tags((name = "Restaurants", description = "Restaurant catalogue and ownership"))
)]
struct RestaurantApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        notifications::list_notifications,
        notifications::list_recipient_notifications,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(schemas(Notification)),
    tags((name = "Notifications", description = "Customer notifications from order events"))
)]
struct NotificationApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DurableQueue;
    use crate::storage::{RecordStore, RestaurantRepository, ORDERS, RESTAURANTS};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[test]
    fn every_table_validates() {
        auth_routes().validate().unwrap();
        order_routes().validate().unwrap();
        restaurant_routes().validate().unwrap();
        notification_routes().validate().unwrap();
    }

    #[test]
    fn order_placement_is_customer_only() {
        let table = order_routes();
        assert_eq!(
            table.access_for(&Method::POST, "/api/v1/orders"),
            Some(Access::Roles(&[Role::Customer]))
        );
        assert_eq!(
            table.access_for(&Method::GET, "/api/v1/orders/resilience-checker"),
            Some(Access::Public)
        );
    }

    #[test]
    fn restaurant_writes_need_owner_or_admin() {
        let table = restaurant_routes();
        assert_eq!(
            table.access_for(&Method::POST, "/api/v1/restaurants"),
            Some(Access::Roles(OWNERS))
        );
        for method in [Method::PUT, Method::DELETE] {
            assert_eq!(
                table.access_for(&method, "/api/v1/restaurants/{restaurant_id}"),
                Some(Access::Owner(OWNERS))
            );
        }
        assert_eq!(
            table.access_for(&Method::GET, "/api/v1/restaurants/{restaurant_id}"),
            Some(Access::Public)
        );
    }

    struct Fixture {
        router: Router,
        restaurants: RecordStore,
        _dir: tempfile::TempDir,
    }

    fn restaurant_fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let restaurants =
            RecordStore::open(&dir.path().join("restaurants.redb"), &[RESTAURANTS]).unwrap();
        let router = restaurant_service(
            RestaurantState {
                restaurants: restaurants.clone(),
            },
            HealthState {
                service: "restaurant-service",
                store: restaurants.clone(),
                data_dir: dir.path().to_path_buf(),
            },
            HeaderTrust::Network,
        )
        .unwrap();
        Fixture {
            router,
            restaurants,
            _dir: dir,
        }
    }

    fn request(
        method: Method,
        uri: &str,
        caller: Option<(&str, &str)>,
        body: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = caller {
            builder = builder
                .header("x-user-id", id)
                .header("x-user-role", role)
                .header("x-user-email", "someone@x.com");
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn owner_can_create_and_other_owner_cannot_update() {
        let fixture = restaurant_fixture();

        let created = fixture
            .router
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/v1/restaurants",
                Some(("2", "RESTAURANT_OWNER")),
                Some(r#"{"name":"Burger Barn"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let restaurant = RestaurantRepository::new(&fixture.restaurants).get(1).unwrap().unwrap();
        assert_eq!(restaurant.owner, 2);

        let intruder = fixture
            .router
            .clone()
            .oneshot(request(
                Method::PUT,
                "/api/v1/restaurants/1",
                Some(("3", "ROLE_RESTAURANT_OWNER")),
                Some(r#"{"name":"Hijacked Barn"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(intruder.status(), StatusCode::FORBIDDEN);

        let admin = fixture
            .router
            .clone()
            .oneshot(request(
                Method::DELETE,
                "/api/v1/restaurants/1",
                Some(("1", "ADMIN")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(admin.status(), StatusCode::NO_CONTENT);
        assert!(!RestaurantRepository::new(&fixture.restaurants).exists(1).unwrap());
    }

    #[tokio::test]
    async fn customers_cannot_list_owned_restaurants() {
        let fixture = restaurant_fixture();
        let response = fixture
            .router
            .oneshot(request(
                Method::GET,
                "/api/v1/restaurants/my-restaurants",
                Some(("7", "CUSTOMER")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn public_reads_need_no_identity() {
        let fixture = restaurant_fixture();
        let missing = fixture
            .router
            .clone()
            .oneshot(request(Method::GET, "/api/v1/restaurants/42", None, None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let count = fixture
            .router
            .oneshot(request(Method::GET, "/api/v1/restaurants/count", None, None))
            .await
            .unwrap();
        assert_eq!(count.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_order_placement_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let orders = RecordStore::open(&dir.path().join("orders.redb"), &[ORDERS]).unwrap();
        let queue = DurableQueue::open(&dir.path().join("queue.redb")).unwrap();
        let router = order_service(
            OrderState::new(orders.clone(), queue.clone()),
            HealthState {
                service: "order-service",
                store: orders,
                data_dir: dir.path().to_path_buf(),
            },
            HeaderTrust::Network,
        )
        .unwrap();

        let response = router
            .oneshot(request(
                Method::POST,
                "/api/v1/orders",
                None,
                Some(r#"{"restaurantId":1,"description":"soup"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(queue.depth(crate::pipeline::ORDER_QUEUE).unwrap(), 0);
    }
}
