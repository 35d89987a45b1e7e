//! In-memory store
//!
//! All tables live in one [`MemState`] behind a `tokio::sync::Mutex`. An
//! [`OrderTx`] takes the owned guard for its whole lifetime, works on a
//! staged copy and swaps it in on commit, so transactions are serialized
//! and a dropped transaction leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shared::models::{
    AuditLog, Category, CategoryCreate, CategoryUpdate, Institution, InstitutionCreate,
    InstitutionUpdate, OrderDto, OrderItemDto, OrderStatus, Product, ProductCreate,
    ProductUpdate, User,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    AuditStore, CatalogStore, InstitutionStore, NewOrder, NewUser, OrderFilter, OrderRecord,
    OrderStore, OrderTx, PasswordResetToken, RepoError, RepoResult, UserChanges, UserStore,
};

#[derive(Debug, Clone, Default)]
struct Sequences {
    institution: i64,
    user: i64,
    category: i64,
    product: i64,
    order: i64,
    reset_token: i64,
    audit: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct MemState {
    institutions: BTreeMap<i64, Institution>,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, OrderRecord>,
    reset_tokens: BTreeMap<i64, PasswordResetToken>,
    audit: Vec<AuditLog>,
    seq: Sequences,
}

impl MemState {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn with_category_name(&self, mut product: Product) -> Product {
        product.category_name = self
            .categories
            .get(&product.category_id)
            .map(|c| c.name.clone());
        product
    }

    fn view(&self, order: &OrderRecord) -> OrderDto {
        let items = order
            .items
            .iter()
            .map(|item| {
                let product = self.products.get(&item.product_id);
                OrderItemDto {
                    product_id: item.product_id,
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    price: item.price,
                    quantity: item.quantity,
                    unit: product.and_then(|p| p.unit.clone()),
                    image_url: product.and_then(|p| p.image_url.clone()),
                }
            })
            .collect();

        OrderDto {
            id: order.id,
            institution_id: order.institution_id,
            institution_name: self
                .institutions
                .get(&order.institution_id)
                .map(|i| i.name.clone())
                .unwrap_or_default(),
            user_id: order.user_id,
            user_full_name: self
                .users
                .get(&order.user_id)
                .map(|u| u.full_name.clone())
                .unwrap_or_default(),
            created_at: order.created_at,
            status: order.status,
            total_amount: order.total_amount,
            items,
        }
    }
}

/// Process-local store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`OrderTx::commit`] fail after all its writes were staged
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of stored reset tokens (all users)
    pub async fn reset_token_count(&self) -> usize {
        self.state.lock().await.reset_tokens.len()
    }

    /// Number of stored orders
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.state.lock().await.users.values().cloned().collect())
    }

    async fn list_users_by_institution(&self, institution_id: i64) -> RepoResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.institution_id == Some(institution_id))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> RepoResult<User> {
        let mut state = self.state.lock().await;
        if state.email_taken(&user.email, None) {
            return Err(RepoError::Duplicate("email".into()));
        }
        let id = bump(&mut state.seq.user);
        let row = User {
            id,
            institution_id: user.institution_id,
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: user.created_at,
        };
        state.users.insert(id, row.clone());
        Ok(row)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.email_taken(&changes.email, Some(id)) {
            return Err(RepoError::Duplicate("email".into()));
        }
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        user.institution_id = changes.institution_id;
        user.full_name = changes.full_name;
        user.email = changes.email;
        user.role = changes.role;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        if state.orders.values().any(|o| o.user_id == id) {
            return Err(RepoError::InUse("user".into()));
        }
        state.users.remove(&id);
        state.reset_tokens.retain(|_, t| t.user_id != id);
        for entry in state.audit.iter_mut().filter(|a| a.user_id == Some(id)) {
            entry.user_id = None;
        }
        Ok(true)
    }

    async fn replace_reset_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: i64,
        created_at: i64,
    ) -> RepoResult<()> {
        let mut state = self.state.lock().await;
        state.reset_tokens.retain(|_, t| t.user_id != user_id);
        let id = bump(&mut state.seq.reset_token);
        state.reset_tokens.insert(
            id,
            PasswordResetToken {
                id,
                user_id,
                token_hash: token_hash.to_string(),
                expires_at,
                created_at,
            },
        );
        Ok(())
    }

    async fn find_reset_token(&self, token_hash: &str) -> RepoResult<Option<PasswordResetToken>> {
        let state = self.state.lock().await;
        Ok(state
            .reset_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn consume_reset_token(&self, token_id: i64, password_hash: &str) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        let Some(token) = state.reset_tokens.remove(&token_id) else {
            return Ok(false);
        };
        match state.users.get_mut(&token.user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl InstitutionStore for MemoryStore {
    async fn list_institutions(&self) -> RepoResult<Vec<Institution>> {
        Ok(self.state.lock().await.institutions.values().cloned().collect())
    }

    async fn find_institution(&self, id: i64) -> RepoResult<Option<Institution>> {
        Ok(self.state.lock().await.institutions.get(&id).cloned())
    }

    async fn insert_institution(
        &self,
        data: InstitutionCreate,
        now: i64,
    ) -> RepoResult<Institution> {
        let mut state = self.state.lock().await;
        let id = bump(&mut state.seq.institution);
        let row = Institution {
            id,
            name: data.name,
            address: data.address,
            phone: data.phone,
            contact_name: data.contact_name,
            created_at: now,
        };
        state.institutions.insert(id, row.clone());
        Ok(row)
    }

    async fn update_institution(
        &self,
        id: i64,
        data: InstitutionUpdate,
    ) -> RepoResult<Option<Institution>> {
        let mut state = self.state.lock().await;
        let Some(inst) = state.institutions.get_mut(&id) else {
            return Ok(None);
        };
        inst.name = data.name;
        inst.address = data.address;
        inst.phone = data.phone;
        inst.contact_name = data.contact_name;
        Ok(Some(inst.clone()))
    }

    async fn delete_institution(&self, id: i64) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        if !state.institutions.contains_key(&id) {
            return Ok(false);
        }
        let referenced = state.users.values().any(|u| u.institution_id == Some(id))
            || state.orders.values().any(|o| o.institution_id == id);
        if referenced {
            return Err(RepoError::InUse("institution".into()));
        }
        state.institutions.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .map(|p| state.with_category_name(p.clone()))
            .collect())
    }

    async fn find_product(&self, id: i64) -> RepoResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .get(&id)
            .map(|p| state.with_category_name(p.clone())))
    }

    async fn insert_product(&self, data: ProductCreate) -> RepoResult<Product> {
        let mut state = self.state.lock().await;
        let id = bump(&mut state.seq.product);
        let row = Product {
            id,
            category_id: data.category_id,
            name: data.name,
            description: data.description,
            price: data.price,
            unit: data.unit,
            image_url: data.image_url,
            is_active: data.is_active,
            stock: data.stock,
            category_name: None,
        };
        state.products.insert(id, row.clone());
        Ok(state.with_category_name(row))
    }

    async fn update_product(&self, id: i64, data: ProductUpdate) -> RepoResult<Option<Product>> {
        let mut state = self.state.lock().await;
        let Some(p) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = data.category_id {
            p.category_id = v;
        }
        if let Some(v) = data.name {
            p.name = v;
        }
        if let Some(v) = data.description {
            p.description = Some(v);
        }
        if let Some(v) = data.price {
            p.price = v;
        }
        if let Some(v) = data.unit {
            p.unit = Some(v);
        }
        if let Some(v) = data.image_url {
            p.image_url = Some(v);
        }
        if let Some(v) = data.is_active {
            p.is_active = v;
        }
        let updated = p.clone();
        Ok(Some(state.with_category_name(updated)))
    }

    async fn deactivate_product(&self, id: i64) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        match state.products.get_mut(&id) {
            Some(p) => {
                p.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_product_stock(&self, id: i64, stock: Option<i32>) -> RepoResult<Option<Product>> {
        let mut state = self.state.lock().await;
        let Some(p) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        p.stock = stock;
        let updated = p.clone();
        Ok(Some(state.with_category_name(updated)))
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(self.state.lock().await.categories.values().cloned().collect())
    }

    async fn find_category(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.state.lock().await.categories.get(&id).cloned())
    }

    async fn insert_category(&self, data: CategoryCreate) -> RepoResult<Category> {
        let mut state = self.state.lock().await;
        let id = bump(&mut state.seq.category);
        let row = Category {
            id,
            name: data.name,
            description: data.description,
        };
        state.categories.insert(id, row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        id: i64,
        data: CategoryUpdate,
    ) -> RepoResult<Option<Category>> {
        let mut state = self.state.lock().await;
        let Some(c) = state.categories.get_mut(&id) else {
            return Ok(None);
        };
        c.name = data.name;
        c.description = data.description;
        Ok(Some(c.clone()))
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let mut state = self.state.lock().await;
        if !state.categories.contains_key(&id) {
            return Ok(false);
        }
        if state.products.values().any(|p| p.category_id == id) {
            return Err(RepoError::InUse("category".into()));
        }
        state.categories.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn begin_order_tx(&self) -> RepoResult<Box<dyn OrderTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(MemOrderTx {
            guard,
            staged,
            fail_commit: self.fail_next_commit.clone(),
        }))
    }

    async fn find_order(&self, id: i64) -> RepoResult<Option<OrderRecord>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn order_view(&self, id: i64) -> RepoResult<Option<OrderDto>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|o| state.view(o)))
    }

    async fn list_order_views(&self, filter: OrderFilter) -> RepoResult<Vec<OrderDto>> {
        let state = self.state.lock().await;
        let mut orders: Vec<&OrderRecord> = state
            .orders
            .values()
            .filter(|o| match filter {
                OrderFilter::All => true,
                OrderFilter::Institution(id) => o.institution_id == id,
                OrderFilter::User(id) => o.user_id == id,
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders.into_iter().map(|o| state.view(o)).collect())
    }
}

struct MemOrderTx {
    guard: OwnedMutexGuard<MemState>,
    staged: MemState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl OrderTx for MemOrderTx {
    async fn institution_exists(&mut self, id: i64) -> RepoResult<bool> {
        Ok(self.staged.institutions.contains_key(&id))
    }

    async fn user_exists(&mut self, id: i64) -> RepoResult<bool> {
        Ok(self.staged.users.contains_key(&id))
    }

    async fn lock_products(&mut self, ids: &[i64]) -> RepoResult<Vec<Product>> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Ok(sorted
            .into_iter()
            .filter_map(|id| self.staged.products.get(&id).cloned())
            .collect())
    }

    async fn write_stock(&mut self, product_id: i64, stock: i32) -> RepoResult<()> {
        let product = self
            .staged
            .products
            .get_mut(&product_id)
            .ok_or(RepoError::NotFound)?;
        if stock < 0 {
            return Err(RepoError::Database(format!(
                "stock of product {product_id} would become negative"
            )));
        }
        product.stock = Some(stock);
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> RepoResult<i64> {
        if order.items.iter().any(|i| i.quantity <= 0) {
            return Err(RepoError::Database("order item quantity must be positive".into()));
        }
        let id = bump(&mut self.staged.seq.order);
        self.staged.orders.insert(
            id,
            OrderRecord {
                id,
                institution_id: order.institution_id,
                user_id: order.user_id,
                total_amount: order.total_amount,
                status: order.status,
                created_at: order.created_at,
                items: order.items,
            },
        );
        Ok(id)
    }

    async fn lock_order(&mut self, id: i64) -> RepoResult<Option<OrderRecord>> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn write_order_status(&mut self, id: i64, status: OrderStatus) -> RepoResult<()> {
        let order = self
            .staged
            .orders
            .get_mut(&id)
            .ok_or(RepoError::NotFound)?;
        order.status = status;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let MemOrderTx {
            mut guard,
            staged,
            fail_commit,
        } = *self;
        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Database("injected commit failure".into()));
        }
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: &str,
        now: i64,
    ) -> RepoResult<()> {
        let mut state = self.state.lock().await;
        let id = bump(&mut state.seq.audit);
        state.audit.push(AuditLog {
            id,
            user_id,
            action: action.to_string(),
            details: details.to_string(),
            created_at: now,
        });
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> RepoResult<Vec<AuditLog>> {
        let state = self.state.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state.audit.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::Role;

    async fn store_with_product(stock: Option<i32>) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let cat = store
            .insert_category(CategoryCreate {
                name: "Paper".into(),
                description: None,
            })
            .await
            .unwrap();
        let p = store
            .insert_product(ProductCreate {
                category_id: cat.id,
                name: "A4 ream".into(),
                description: None,
                price: Decimal::new(499, 2),
                unit: Some("ream".into()),
                image_url: None,
                is_active: true,
                stock,
            })
            .await
            .unwrap();
        (store, p.id)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            institution_id: None,
            full_name: "Test User".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::Institution,
            created_at: 1,
        }
    }

    #[tokio::test]
    async fn test_dropped_tx_rolls_back() {
        let (store, pid) = store_with_product(Some(10)).await;
        {
            let mut tx = store.begin_order_tx().await.unwrap();
            tx.write_stock(pid, 3).await.unwrap();
        }
        let p = store.find_product(pid).await.unwrap().unwrap();
        assert_eq!(p.stock, Some(10));
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let (store, pid) = store_with_product(Some(10)).await;
        let mut tx = store.begin_order_tx().await.unwrap();
        tx.write_stock(pid, 3).await.unwrap();
        tx.commit().await.unwrap();
        let p = store.find_product(pid).await.unwrap().unwrap();
        assert_eq!(p.stock, Some(3));
    }

    #[tokio::test]
    async fn test_injected_commit_failure_discards_writes() {
        let (store, pid) = store_with_product(Some(10)).await;
        store.fail_next_commit();
        let mut tx = store.begin_order_tx().await.unwrap();
        tx.write_stock(pid, 0).await.unwrap();
        assert!(tx.commit().await.is_err());
        let p = store.find_product(pid).await.unwrap().unwrap();
        assert_eq!(p.stock, Some(10));

        // only the next commit fails
        let mut tx = store.begin_order_tx().await.unwrap();
        tx.write_stock(pid, 9).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_negative_stock_rejected() {
        let (store, pid) = store_with_product(Some(1)).await;
        let mut tx = store.begin_order_tx().await.unwrap();
        assert!(tx.write_stock(pid, -1).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@x.org")).await.unwrap();
        let err = store.insert_user(new_user("a@x.org")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_replace_reset_token_drops_prior() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("a@x.org")).await.unwrap();
        store.replace_reset_token(user.id, "h1", 100, 1).await.unwrap();
        store.replace_reset_token(user.id, "h2", 100, 2).await.unwrap();
        assert_eq!(store.reset_token_count().await, 1);
        assert!(store.find_reset_token("h1").await.unwrap().is_none());

        let token = store.find_reset_token("h2").await.unwrap().unwrap();
        assert!(store.consume_reset_token(token.id, "new").await.unwrap());
        assert!(!store.consume_reset_token(token.id, "newer").await.unwrap());
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new");
    }

    #[tokio::test]
    async fn test_category_in_use() {
        let (store, _) = store_with_product(None).await;
        let err = store.delete_category(1).await.unwrap_err();
        assert!(matches!(err, RepoError::InUse(_)));
    }

    #[tokio::test]
    async fn test_audit_newest_first_with_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .append_audit(None, "login", &format!("n={i}"), i)
                .await
                .unwrap();
        }
        let logs = store.list_audit(2).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].details, "n=4");
        assert_eq!(logs[1].details, "n=3");
    }
}
