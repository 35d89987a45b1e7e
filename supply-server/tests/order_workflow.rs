//! Order placement, repetition and status changes against the in-memory store

mod common;

use common::Fixture;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, ProductCreate, ProductUpdate};
use supply_server::db::AuditStore;

#[tokio::test]
async fn test_order_total_and_stock_decrement() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, Some(10)).await;
    let cups = fx.product("Cups", 450, None).await;

    let order = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 2), (cups.id, 3)]))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::new(3850, 2));
    assert_eq!(order.total_amount, order.calculated_total());
    assert_eq!(order.institution_name, "Or Shalom Primary School");
    assert_eq!(order.user_full_name, "Dvora Levi");
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_name, "Markers");
    assert_eq!(order.items[0].unit.as_deref(), Some("box"));

    assert_eq!(fx.stock_of(markers.id).await, Some(8));
    // Untracked stock stays untracked
    assert_eq!(fx.stock_of(cups.id).await, None);
}

#[tokio::test]
async fn test_stock_never_goes_negative() {
    let fx = Fixture::new().await;
    let soap = fx.product("Hand soap", 2450, Some(5)).await;

    let mut placed = 0;
    for quantity in [2, 2, 2, 1] {
        if fx
            .state
            .orders
            .create_order(fx.order_request(&[(soap.id, quantity)]))
            .await
            .is_ok()
        {
            placed += quantity;
        }
        let stock = fx.stock_of(soap.id).await.unwrap();
        assert!(stock >= 0);
        assert_eq!(stock, 5 - placed);
    }
    assert_eq!(placed, 5);
    assert_eq!(fx.stock_of(soap.id).await, Some(0));
}

#[tokio::test]
async fn test_insufficient_stock_names_product_and_changes_nothing() {
    let fx = Fixture::new().await;
    let paper = fx.product("Toilet paper", 1890, Some(10)).await;
    let bleach = fx.product("Bleach", 990, Some(1)).await;

    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[(paper.id, 4), (bleach.id, 2)]))
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert!(err.message.contains("Bleach"));
    let details = err.details.unwrap();
    assert_eq!(details["product_id"], bleach.id);
    assert_eq!(details["available"], 1);

    assert_eq!(fx.stock_of(paper.id).await, Some(10));
    assert_eq!(fx.stock_of(bleach.id).await, Some(1));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_lines_are_checked_together() {
    let fx = Fixture::new().await;
    let snack = fx.product("Snack box", 3200, Some(5)).await;

    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[(snack.id, 3), (snack.id, 3)]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    let order = fx
        .state
        .orders
        .create_order(fx.order_request(&[(snack.id, 2), (snack.id, 3)]))
        .await
        .unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 5);
    assert_eq!(fx.stock_of(snack.id).await, Some(0));
}

#[tokio::test]
async fn test_validation_failures() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, Some(10)).await;

    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::OrderEmpty);

    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 0)]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::InvalidQuantity);

    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 1), (9999, 1)]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::ProductNotFound);
    assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);

    let mut req = fx.order_request(&[(markers.id, 1)]);
    req.institution_id = 9999;
    let err: AppError = fx.state.orders.create_order(req).await.unwrap_err().into();
    assert_eq!(err.code, ErrorCode::InstitutionNotFound);

    let mut req = fx.order_request(&[(markers.id, 1)]);
    req.user_id = 9999;
    let err: AppError = fx.state.orders.create_order(req).await.unwrap_err().into();
    assert_eq!(err.code, ErrorCode::UserNotFound);

    assert_eq!(fx.stock_of(markers.id).await, Some(10));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_total_above_column_limit_is_rejected() {
    let fx = Fixture::new().await;
    // 1,000,000.00 per unit, untracked so stock never limits the quantity
    let press = fx.product("Printing press", 100_000_000, None).await;
    let markers = fx.product("Markers", 1250, Some(10)).await;

    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 1), (press.id, 10_000)]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);

    assert_eq!(fx.stock_of(markers.id).await, Some(10));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_product_prices_keep_two_decimal_places() {
    let fx = Fixture::new().await;
    let create = |price: Decimal| ProductCreate {
        category_id: fx.category_id,
        name: "Glue sticks".into(),
        description: None,
        price,
        unit: None,
        image_url: None,
        is_active: true,
        stock: None,
    };

    let err: AppError = fx
        .state
        .catalog
        .create_product(create(Decimal::new(12345, 3)))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::ProductInvalidPrice);

    let err: AppError = fx
        .state
        .catalog
        .create_product(create(Decimal::new(100_000_001, 2)))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::ProductInvalidPrice);

    let glue = fx
        .state
        .catalog
        .create_product(create(Decimal::new(125, 1)))
        .await
        .unwrap();
    assert_eq!(glue.price, Decimal::new(1250, 2));
    assert_eq!(glue.price.scale(), 2);

    let err: AppError = fx
        .state
        .catalog
        .update_product(
            glue.id,
            ProductUpdate {
                price: Some(Decimal::new(9999, 3)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::ProductInvalidPrice);

    let order = fx
        .state
        .orders
        .create_order(fx.order_request(&[(glue.id, 3)]))
        .await
        .unwrap();
    assert_eq!(order.total_amount, Decimal::new(3750, 2));
    assert_eq!(order.total_amount.scale(), 2);
}

#[tokio::test]
async fn test_failed_commit_rolls_everything_back() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, Some(10)).await;
    let cups = fx.product("Cups", 450, Some(50)).await;

    fx.store.fail_next_commit();
    let err: AppError = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 3), (cups.id, 10)]))
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::DatabaseError);

    assert_eq!(fx.stock_of(markers.id).await, Some(10));
    assert_eq!(fx.stock_of(cups.id).await, Some(50));
    assert_eq!(fx.store.order_count().await, 0);

    // The injected failure is one-shot
    fx.state
        .orders
        .create_order(fx.order_request(&[(markers.id, 3)]))
        .await
        .unwrap();
    assert_eq!(fx.stock_of(markers.id).await, Some(7));
}

#[tokio::test]
async fn test_concurrent_orders_cannot_oversell() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, Some(10)).await;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let orders = fx.state.orders.clone();
        let req = fx.order_request(&[(markers.id, 1)]);
        handles.push(tokio::spawn(async move { orders.create_order(req).await }));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => {
                let err: AppError = e.into();
                assert_eq!(err.code, ErrorCode::InsufficientStock);
                rejected += 1;
            }
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(rejected, 15);
    assert_eq!(fx.stock_of(markers.id).await, Some(0));
    assert_eq!(fx.store.order_count().await, 10);
}

#[tokio::test]
async fn test_repeat_order_uses_current_prices() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1000, Some(20)).await;

    let first = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 2)]))
        .await
        .unwrap();
    assert_eq!(first.total_amount, Decimal::new(2000, 2));

    fx.state
        .catalog
        .update_product(
            markers.id,
            ProductUpdate {
                price: Some(Decimal::new(1500, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let repeated = fx
        .state
        .orders
        .repeat_order(first.id, fx.admin_id)
        .await
        .unwrap();
    assert_ne!(repeated.id, first.id);
    assert_eq!(repeated.user_id, fx.admin_id);
    assert_eq!(repeated.institution_id, fx.institution_id);
    assert_eq!(repeated.status, OrderStatus::Pending);
    assert_eq!(repeated.items[0].price, Decimal::new(1500, 2));
    assert_eq!(repeated.total_amount, Decimal::new(3000, 2));
    assert_eq!(fx.stock_of(markers.id).await, Some(16));

    // The original keeps its price snapshot
    let original = fx.state.orders.get_order(first.id).await.unwrap().unwrap();
    assert_eq!(original.items[0].price, Decimal::new(1000, 2));
    assert_eq!(original.total_amount, Decimal::new(2000, 2));
}

#[tokio::test]
async fn test_repeat_missing_order() {
    let fx = Fixture::new().await;
    let err: AppError = fx
        .state
        .orders
        .repeat_order(4242, fx.user_id)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::OrderNotFound);
    assert_eq!(err.http_status(), http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repeat_revalidates_stock() {
    let fx = Fixture::new().await;
    let soap = fx.product("Hand soap", 2450, Some(3)).await;

    let first = fx
        .state
        .orders
        .create_order(fx.order_request(&[(soap.id, 2)]))
        .await
        .unwrap();

    let err: AppError = fx
        .state
        .orders
        .repeat_order(first.id, fx.user_id)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert_eq!(fx.stock_of(soap.id).await, Some(1));
}

#[tokio::test]
async fn test_status_lifecycle() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, Some(10)).await;
    let order = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 1)]))
        .await
        .unwrap();
    let orders = &fx.state.orders;

    assert!(orders.update_order_status(order.id, OrderStatus::Approved).await.unwrap());
    // Re-applying the current status is a no-op
    assert!(orders.update_order_status(order.id, OrderStatus::Approved).await.unwrap());
    assert!(orders.update_order_status(order.id, OrderStatus::Shipped).await.unwrap());
    assert!(orders.update_order_status(order.id, OrderStatus::Completed).await.unwrap());

    let err: AppError = orders
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    assert_eq!(err.http_status(), http::StatusCode::CONFLICT);

    let stored = orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    // Completed orders keep their stock consumed
    assert_eq!(fx.stock_of(markers.id).await, Some(9));
}

#[tokio::test]
async fn test_status_of_missing_order() {
    let fx = Fixture::new().await;
    assert!(
        !fx.state
            .orders
            .update_order_status(777, OrderStatus::Approved)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_cancel_and_reject_restock() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, Some(10)).await;
    let cups = fx.product("Cups", 450, None).await;
    let orders = &fx.state.orders;

    let a = orders
        .create_order(fx.order_request(&[(markers.id, 4), (cups.id, 7)]))
        .await
        .unwrap();
    let b = orders
        .create_order(fx.order_request(&[(markers.id, 3)]))
        .await
        .unwrap();
    assert_eq!(fx.stock_of(markers.id).await, Some(3));

    assert!(orders.update_order_status(a.id, OrderStatus::Cancelled).await.unwrap());
    assert_eq!(fx.stock_of(markers.id).await, Some(7));
    assert_eq!(fx.stock_of(cups.id).await, None);

    assert!(orders.update_order_status(b.id, OrderStatus::Rejected).await.unwrap());
    assert_eq!(fx.stock_of(markers.id).await, Some(10));

    // Terminal: no double restock
    let err: AppError = orders
        .update_order_status(a.id, OrderStatus::Rejected)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    assert_eq!(fx.stock_of(markers.id).await, Some(10));
}

#[tokio::test]
async fn test_listing_filters_newest_first() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, None).await;
    let orders = &fx.state.orders;

    let first = orders
        .create_order(fx.order_request(&[(markers.id, 1)]))
        .await
        .unwrap();
    let second = orders
        .create_order(fx.order_request(&[(markers.id, 2)]))
        .await
        .unwrap();
    let mut other = fx.order_request(&[(markers.id, 3)]);
    other.institution_id = fx.other_institution_id;
    other.user_id = fx.admin_id;
    let third = orders.create_order(other).await.unwrap();

    let all = orders.list_orders(None).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let mine = orders.list_orders(Some(fx.institution_id)).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|o| o.institution_id == fx.institution_id));

    let by_admin = orders.list_orders_by_user(fx.admin_id).await.unwrap();
    assert_eq!(by_admin.len(), 1);
    assert_eq!(by_admin[0].id, third.id);

    assert!(orders.get_order(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_placement_is_audited() {
    let fx = Fixture::new().await;
    let markers = fx.product("Markers", 1250, None).await;
    let order = fx
        .state
        .orders
        .create_order(fx.order_request(&[(markers.id, 1)]))
        .await
        .unwrap();

    let entries = fx.store.list_audit(10).await.unwrap();
    assert_eq!(entries[0].action, "order_created");
    assert_eq!(entries[0].user_id, Some(fx.user_id));
    assert!(entries[0].details.contains(&format!("order={}", order.id)));
}
