//! Demo data for an empty store
//!
//! Each table is seeded only while it is empty, so running against an
//! existing database is a no-op.

use rust_decimal::Decimal;
use shared::models::{CategoryCreate, InstitutionCreate, ProductCreate};

use crate::db::{Database, RepoResult};
use crate::util::now_millis;

const INSTITUTIONS: [(&str, &str, &str, &str); 3] = [
    ("Or Shalom Primary School", "12 HaChinuch St, Jerusalem", "02-5551234", "Israel Cohen"),
    ("Ner Tamid Elementary", "8 Mevo HaTikva St, Bnei Brak", "03-7774567", "Dvora Levi"),
    ("Atid Kindergarten", "3 HaYaldut St, Modiin", "08-6667890", "Sarah Friedman"),
];

const CATEGORIES: [(&str, &str); 5] = [
    ("Toiletries", "Cleaning and hygiene products"),
    ("Disposables", "Single-use everyday items"),
    ("Snacks", "Treats for the children"),
    ("Office", "Office supplies"),
    ("Maintenance", "Cleaning and maintenance materials"),
];

/// (category index, name, description, price in cents, unit, stock)
const PRODUCTS: [(usize, &str, &str, i64, &str, Option<i32>); 7] = [
    (0, "Toilet paper, 32 rolls", "Family pack", 1890, "pack", Some(200)),
    (0, "Hand soap, 4 l", "Lavender scent", 2450, "gallon", Some(80)),
    (1, "Disposable plates, 50 pcs", "23 cm diameter", 690, "pack", None),
    (1, "Plastic cups, 100 pcs", "White, 200 ml", 450, "pack", None),
    (2, "Peanut snack box, 50 pcs", "Kids snack", 3200, "box", Some(40)),
    (3, "Colored markers", "12 quality markers", 990, "box", None),
    (4, "Bleach, 4 l", "Institutional cleaner", 990, "gallon", Some(60)),
];

pub async fn seed_demo_data(db: &dyn Database) -> RepoResult<()> {
    if db.list_institutions().await?.is_empty() {
        let now = now_millis();
        for (name, address, phone, contact) in INSTITUTIONS {
            db.insert_institution(
                InstitutionCreate {
                    name: name.into(),
                    address: Some(address.into()),
                    phone: Some(phone.into()),
                    contact_name: Some(contact.into()),
                },
                now,
            )
            .await?;
        }
        tracing::info!(count = INSTITUTIONS.len(), "Seeded institutions");
    }

    let mut categories = db.list_categories().await?;
    if categories.is_empty() {
        for (name, description) in CATEGORIES {
            let category = db
                .insert_category(CategoryCreate {
                    name: name.into(),
                    description: Some(description.into()),
                })
                .await?;
            categories.push(category);
        }
        tracing::info!(count = CATEGORIES.len(), "Seeded categories");
    }

    if db.list_products().await?.is_empty() {
        let mut seeded = 0;
        for (category_idx, name, description, cents, unit, stock) in PRODUCTS {
            let Some(category) = categories.get(category_idx) else {
                continue;
            };
            db.insert_product(ProductCreate {
                category_id: category.id,
                name: name.into(),
                description: Some(description.into()),
                price: Decimal::new(cents, 2),
                unit: Some(unit.into()),
                image_url: None,
                is_active: true,
                stock,
            })
            .await?;
            seeded += 1;
        }
        tracing::info!(count = seeded, "Seeded products");
    }

    Ok(())
}
