//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    CategoryCreate, CreateOrderRequest, InstitutionCreate, OrderItemInput, Product, ProductCreate,
    Role,
};
use supply_server::db::memory::MemoryStore;
use supply_server::db::{CatalogStore, InstitutionStore, NewUser, UserStore};
use supply_server::email::{BoxError, Notifier};
use supply_server::util::{hash_password, now_millis};
use supply_server::{AppState, Config};

pub const PASSWORD: &str = "correct-horse-battery";

/// Records every reset mail instead of sending it
#[derive(Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    /// (recipient, token) pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send_password_reset(
        &self,
        to: &str,
        _full_name: &str,
        token: &str,
    ) -> Result<(), BoxError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), token.to_string()));
        Ok(())
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub state: AppState,
    pub notifier: Arc<CapturingNotifier>,
    pub institution_id: i64,
    pub other_institution_id: i64,
    /// Institution-role user of `institution_id`
    pub user_id: i64,
    pub user_email: String,
    pub admin_id: i64,
    pub admin_email: String,
    pub category_id: i64,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(CapturingNotifier::default());
        let state = AppState::with_parts(
            Arc::new(store.clone()),
            notifier.clone(),
            Config::in_memory(),
        );

        let now = now_millis();
        let institution = store
            .insert_institution(
                InstitutionCreate {
                    name: "Or Shalom Primary School".into(),
                    address: Some("12 HaChinuch St".into()),
                    phone: None,
                    contact_name: Some("Israel Cohen".into()),
                },
                now,
            )
            .await
            .unwrap();
        let other = store
            .insert_institution(
                InstitutionCreate {
                    name: "Atid Kindergarten".into(),
                    address: None,
                    phone: None,
                    contact_name: None,
                },
                now,
            )
            .await
            .unwrap();

        let password_hash = hash_password(PASSWORD).unwrap();
        let user = store
            .insert_user(NewUser {
                institution_id: Some(institution.id),
                full_name: "Dvora Levi".into(),
                email: "dvora@orshalom.org".into(),
                password_hash: password_hash.clone(),
                role: Role::Institution,
                created_at: now,
            })
            .await
            .unwrap();
        let admin = store
            .insert_user(NewUser {
                institution_id: None,
                full_name: "Supply Admin".into(),
                email: "admin@supply.local".into(),
                password_hash,
                role: Role::Admin,
                created_at: now,
            })
            .await
            .unwrap();

        let category = store
            .insert_category(CategoryCreate {
                name: "Office".into(),
                description: None,
            })
            .await
            .unwrap();

        Self {
            store,
            state,
            notifier,
            institution_id: institution.id,
            other_institution_id: other.id,
            user_id: user.id,
            user_email: user.email,
            admin_id: admin.id,
            admin_email: admin.email,
            category_id: category.id,
        }
    }

    pub async fn product(&self, name: &str, cents: i64, stock: Option<i32>) -> Product {
        self.store
            .insert_product(ProductCreate {
                category_id: self.category_id,
                name: name.into(),
                description: None,
                price: Decimal::new(cents, 2),
                unit: Some("box".into()),
                image_url: None,
                is_active: true,
                stock,
            })
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, product_id: i64) -> Option<i32> {
        self.store
            .find_product(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    pub fn order_request(&self, items: &[(i64, i32)]) -> CreateOrderRequest {
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
}
