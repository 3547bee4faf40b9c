use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartDto, CartItemDto, ClearCartRequest},
    dto::identity::Identity,
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        customers::Model as CustomerModel,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    services::{customer_service, product_service::product_from_entity},
    state::AppState,
};

/// Each customer owns exactly one cart; created lazily on first touch.
pub async fn get_or_create<C: ConnectionTrait>(
    conn: &C,
    customer: &CustomerModel,
) -> AppResult<CartModel> {
    if let Some(cart) = Carts::find()
        .filter(CartCol::CustomerId.eq(customer.id))
        .one(conn)
        .await?
    {
        return Ok(cart);
    }

    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        created_at: NotSet,
        updated_at: NotSet,
    })
    .on_conflict(
        OnConflict::column(CartCol::CustomerId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Carts::find()
        .filter(CartCol::CustomerId.eq(customer.id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart row missing after upsert")))
}

/// Derived total: current catalog price times quantity, summed over the
/// materialized item list. Recomputed on every read, never stored.
pub fn cart_total(items: &[CartItemDto]) -> Decimal {
    items.iter().map(|item| item.subtotal).sum()
}

pub async fn load_cart<C: ConnectionTrait>(conn: &C, cart: CartModel) -> AppResult<CartDto> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .find_also_related(Products)
        .order_by_asc(CartItemCol::CreatedAt)
        .all(conn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let product = product
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart item without product")))?;
        let subtotal = product.price * Decimal::from(item.quantity);
        items.push(CartItemDto {
            id: item.id,
            product: product_from_entity(product),
            quantity: item.quantity,
            subtotal,
        });
    }

    let total_amount = cart_total(&items);
    Ok(CartDto {
        id: cart.id,
        customer_id: cart.customer_id,
        created_at: cart.created_at.with_timezone(&Utc),
        updated_at: cart.updated_at.with_timezone(&Utc),
        items,
        total_amount,
    })
}

pub async fn get_cart(state: &AppState, identity: &Identity) -> AppResult<ApiResponse<CartDto>> {
    let customer = customer_service::resolve(&state.orm, identity).await?;
    let cart = get_or_create(&state.orm, &customer).await?;
    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("OK", cart, Some(Meta::empty())))
}

pub async fn add_item(
    state: &AppState,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartDto>> {
    let quantity = payload
        .quantity
        .as_ref()
        .ok_or_else(|| AppError::InvalidQuantity("quantity is required".into()))?
        .parse()?;
    let product_id = payload
        .product_id
        .ok_or_else(|| AppError::BadRequest("product_id is required".into()))?;

    let txn = state.orm.begin().await?;

    let customer = customer_service::resolve(&txn, &payload.identity).await?;
    let cart = get_or_create(&txn, &customer).await?;

    // Inactive products cannot be added even though they stay readable by id.
    let product = Products::find_by_id(product_id)
        .filter(ProdCol::IsActive.eq(true))
        .one(&txn)
        .await?
        .ok_or(AppError::ProductNotFound)?;

    // One row per (cart, product): repeated adds accumulate quantity.
    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    match existing {
        Some(item) => {
            let next = item.quantity + quantity;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(next);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(quantity),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }

    let cart = touch(&txn, cart).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(customer.id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": product.id, "quantity": quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("OK", cart, Some(Meta::empty())))
}

pub async fn clear(
    state: &AppState,
    payload: ClearCartRequest,
) -> AppResult<ApiResponse<CartDto>> {
    let txn = state.orm.begin().await?;

    let customer = customer_service::resolve(&txn, &payload.identity).await?;
    let cart = get_or_create(&txn, &customer).await?;

    // Clearing an empty or brand-new cart is a successful no-op.
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    let cart = touch(&txn, cart).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(customer.id),
        "cart_clear",
        Some("cart_items"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let cart = load_cart(&state.orm, cart).await?;
    Ok(ApiResponse::success("Cart cleared", cart, Some(Meta::empty())))
}

pub(crate) async fn touch<C: ConnectionTrait>(conn: &C, cart: CartModel) -> AppResult<CartModel> {
    let mut active: CartActive = cart.into();
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: i32) -> CartItemDto {
        CartItemDto {
            id: Uuid::new_v4(),
            product: crate::models::Product {
                id: Uuid::new_v4(),
                category_id: None,
                title: "widget".into(),
                description: None,
                price,
                image: None,
                stock: 10,
                is_active: true,
                created_at: Utc::now(),
            },
            quantity,
            subtotal: price * Decimal::from(quantity),
        }
    }

    #[test]
    fn total_sums_live_subtotals() {
        let items = vec![item(dec!(10.00), 3), item(dec!(2.50), 2)];
        assert_eq!(cart_total(&items), dec!(35.00));
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }
}
