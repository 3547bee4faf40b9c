use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let drinks = ensure_category(&pool, "Drinks", "drinks").await?;
    let snacks = ensure_category(&pool, "Snacks", "snacks").await?;

    seed_product(&pool, drinks, "Americano", dec!(3.50), 40).await?;
    seed_product(&pool, drinks, "Green Tea", dec!(2.75), 25).await?;
    seed_product(&pool, snacks, "Granola Bar", dec!(1.90), 60).await?;
    seed_product(&pool, snacks, "Trail Mix", dec!(4.20), 30).await?;

    println!("Seed completed.");
    Ok(())
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

async fn seed_product(
    pool: &sqlx::PgPool,
    category_id: Uuid,
    title: &str,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<()> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE title = $1")
        .bind(title)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO products (id, category_id, title, price, stock)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(category_id)
    .bind(title)
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await?;

    Ok(())
}
