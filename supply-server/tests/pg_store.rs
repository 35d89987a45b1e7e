//! PostgreSQL store against a live database
//!
//! Ignored by default. Run with a disposable database:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/supply_test cargo test -p supply-server --test pg_store -- --ignored
//! ```
//!
//! Every test creates its own rows under a unique suffix, so reruns against
//! the same database do not collide.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CategoryCreate, CreateOrderRequest, InstitutionCreate, OrderItemInput, OrderStatus, Product,
    ProductCreate, Role,
};
use supply_server::db::pg::PgStore;
use supply_server::db::{CatalogStore, InstitutionStore, NewUser, RepoError, UserStore};
use supply_server::email::LogNotifier;
use supply_server::util::now_millis;
use supply_server::{AppState, Config};

static SEQ: AtomicU32 = AtomicU32::new(0);

fn unique(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{}",
        now_millis(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// `None` when no PostgreSQL URL is configured
async fn connect() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|u| u.starts_with("postgres"))?;
    Some(PgStore::connect(&url).await.unwrap())
}

struct Seeded {
    store: PgStore,
    state: AppState,
    institution_id: i64,
    user_id: i64,
    category_id: i64,
}

impl Seeded {
    async fn new(store: PgStore) -> Self {
        let state = AppState::with_parts(
            Arc::new(store.clone()),
            Arc::new(LogNotifier),
            Config::in_memory(),
        );
        let now = now_millis();
        let institution = store
            .insert_institution(
                InstitutionCreate {
                    name: unique("Beit Sefer"),
                    address: None,
                    phone: None,
                    contact_name: None,
                },
                now,
            )
            .await
            .unwrap();
        let user = store
            .insert_user(NewUser {
                institution_id: Some(institution.id),
                full_name: "Noa Katz".into(),
                email: format!("{}@school.test", unique("noa")),
                password_hash: "$argon2id$unused".into(),
                role: Role::Institution,
                created_at: now,
            })
            .await
            .unwrap();
        let category = store
            .insert_category(CategoryCreate {
                name: unique("Stationery"),
                description: None,
            })
            .await
            .unwrap();

        Self {
            store,
            state,
            institution_id: institution.id,
            user_id: user.id,
            category_id: category.id,
        }
    }

    async fn product(&self, name: &str, cents: i64, stock: Option<i32>) -> Product {
        self.store
            .insert_product(ProductCreate {
                category_id: self.category_id,
                name: name.into(),
                description: None,
                price: Decimal::new(cents, 2),
                unit: Some("pack".into()),
                image_url: None,
                is_active: true,
                stock,
            })
            .await
            .unwrap()
    }

    fn order_request(&self, items: &[(i64, i32)]) -> CreateOrderRequest {
        CreateOrderRequest {
            institution_id: self.institution_id,
            user_id: self.user_id,
            items: items
                .iter()
                .map(|&(product_id, quantity)| OrderItemInput {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    async fn stock_of(&self, product_id: i64) -> Option<i32> {
        self.store
            .find_product(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_concurrent_orders_cannot_oversell() {
    let Some(store) = connect().await else { return };
    let db = Seeded::new(store).await;
    let paper = db.product("A4 paper", 2390, Some(5)).await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let orders = db.state.orders.clone();
        let req = db.order_request(&[(paper.id, 1)]);
        handles.push(tokio::spawn(async move { orders.create_order(req).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => {
                let err: AppError = e.into();
                assert_eq!(err.code, ErrorCode::InsufficientStock);
            }
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(db.stock_of(paper.id).await, Some(0));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_order_lines_round_trip_and_restock() {
    let Some(store) = connect().await else { return };
    let db = Seeded::new(store).await;
    let pens = db.product("Pens", 1250, Some(40)).await;
    let tape = db.product("Tape", 399, None).await;
    let folders = db.product("Folders", 875, Some(10)).await;

    let order = db
        .state
        .orders
        .create_order(db.order_request(&[(pens.id, 3), (tape.id, 2), (folders.id, 4), (pens.id, 1)]))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::new(9298, 2));
    assert_eq!(order.total_amount, order.calculated_total());

    let mut lines: Vec<(i64, i32, Decimal)> = order
        .items
        .iter()
        .map(|i| (i.product_id, i.quantity, i.price))
        .collect();
    lines.sort();
    let mut expected = vec![
        (pens.id, 4, Decimal::new(1250, 2)),
        (tape.id, 2, Decimal::new(399, 2)),
        (folders.id, 4, Decimal::new(875, 2)),
    ];
    expected.sort();
    assert_eq!(lines, expected);

    assert_eq!(db.stock_of(pens.id).await, Some(36));
    assert_eq!(db.stock_of(tape.id).await, None);
    assert_eq!(db.stock_of(folders.id).await, Some(6));

    // Re-read through the store matches what create returned
    let reread = db.state.orders.get_order(order.id).await.unwrap();
    assert_eq!(reread, Some(order.clone()));

    assert!(
        db.state
            .orders
            .update_order_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap()
    );
    assert_eq!(db.stock_of(pens.id).await, Some(40));
    assert_eq!(db.stock_of(folders.id).await, Some(10));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_duplicate_email_is_reported() {
    let Some(store) = connect().await else { return };
    let db = Seeded::new(store).await;
    let email = format!("{}@school.test", unique("dup"));
    let new_user = || NewUser {
        institution_id: Some(db.institution_id),
        full_name: "Yael Mor".into(),
        email: email.clone(),
        password_hash: "$argon2id$unused".into(),
        role: Role::Institution,
        created_at: now_millis(),
    };

    db.store.insert_user(new_user()).await.unwrap();
    let err = db.store.insert_user(new_user()).await.unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)), "{err:?}");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_referenced_category_is_in_use() {
    let Some(store) = connect().await else { return };
    let db = Seeded::new(store).await;
    db.product("Crayons", 650, None).await;

    let err = db.store.delete_category(db.category_id).await.unwrap_err();
    assert!(matches!(err, RepoError::InUse(_)), "{err:?}");

    let err: AppError = db
        .state
        .catalog
        .delete_category(db.category_id)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code, ErrorCode::ResourceInUse);
    assert!(db.store.find_category(db.category_id).await.unwrap().is_some());
}
