// src/bin/seed.rs

use std::env;
use std::fs;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;

use bakery_backend::entities::{prelude::*, products, users};
use bakery_backend::models::user::Role;
use bakery_backend::services::price_utils::check_price;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedUser {
    email: String,
    full_name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default = "default_role")]
    role: Role,
}

fn default_role() -> Role {
    Role::Client
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    name: String,
    category: String,
    price: Decimal,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Default)]
struct SeedResult {
    imported: usize,
    skipped: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Usage: cargo run --bin seed -- seed.json
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <seed.json>", args[0]);
        std::process::exit(1);
    }

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let db = Database::connect(&database_url).await?;

    let raw = fs::read_to_string(&args[1])?;
    let seed: SeedFile = serde_json::from_str(&raw)?;
    println!(" Found {} users and {} products in {}", seed.users.len(), seed.products.len(), args[1]);

    let user_result = seed_users(&db, seed.users).await?;
    let product_result = seed_products(&db, seed.products).await?;

    println!("\n Seed complete!");
    println!("    Users imported: {} (skipped: {})", user_result.imported, user_result.skipped);
    println!("    Products imported: {} (skipped: {})", product_result.imported, product_result.skipped);

    Ok(())
}

/// Users are keyed by email
async fn seed_users(db: &DatabaseConnection, entries: Vec<SeedUser>) -> Result<SeedResult, sea_orm::DbErr> {
    let mut result = SeedResult::default();

    for entry in entries {
        let email = entry.email.trim().to_lowercase();
        let existing = Users::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            result.skipped += 1;
            continue;
        }

        users::ActiveModel {
            email: Set(email),
            full_name: Set(entry.full_name.trim().to_string()),
            phone: Set(entry.phone),
            role: Set(entry.role.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        result.imported += 1;
    }

    Ok(result)
}

/// Products are keyed by (category, name)
async fn seed_products(db: &DatabaseConnection, entries: Vec<SeedProduct>) -> Result<SeedResult, sea_orm::DbErr> {
    let mut result = SeedResult::default();

    for entry in entries {
        let existing = Products::find()
            .filter(products::Column::Name.eq(entry.name.trim()))
            .filter(products::Column::Category.eq(entry.category.trim()))
            .one(db)
            .await?;
        if existing.is_some() {
            result.skipped += 1;
            continue;
        }
        let price = match check_price(entry.price) {
            Ok(price) => price,
            Err(e) => {
                eprintln!("    Skipping '{}': {}", entry.name, e);
                result.skipped += 1;
                continue;
            }
        };

        let now = Utc::now();
        products::ActiveModel {
            name: Set(entry.name.trim().to_string()),
            category: Set(entry.category.trim().to_string()),
            price: Set(price),
            image: Set(entry.image),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        result.imported += 1;
    }

    Ok(result)
}
