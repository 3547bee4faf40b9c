use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::identity::Identity,
    dto::orders::{
        CheckoutRequest, OrderDto, OrderItemDto, OrderList, UpdateOrderStatusRequest,
    },
    entity::{
        cart_items::{self, Column as CartItemCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    services::{cart_service, customer_service},
    state::AppState,
};

pub const STATUS_PENDING: &str = "pending";

const ORDER_STATUSES: [&str; 5] = ["pending", "paid", "shipped", "completed", "cancelled"];

fn is_valid_transition(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("pending", "paid")
            | ("paid", "shipped")
            | ("shipped", "completed")
            | ("pending", "cancelled")
            | ("paid", "cancelled")
    )
}

/// Convert the customer's cart into an order. The whole transition runs in
/// one transaction: order and item creation, stock adjustment, and cart
/// clearing either all happen or none do.
pub async fn checkout(
    state: &AppState,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderDto>> {
    let txn = state.orm.begin().await?;

    let customer = customer_service::resolve(&txn, &payload.identity).await?;
    let cart = cart_service::get_or_create(&txn, &customer).await?;

    #[derive(Debug, FromQueryResult)]
    struct CheckoutRow {
        product_id: Uuid,
        quantity: i32,
        price: Decimal,
        stock: i32,
    }

    // Lock cart item and product rows together: a duplicate submission
    // serializes here and observes the already-emptied cart, and the stock
    // arithmetic below always runs against the value that was locked.
    let rows = CartItems::find()
        .select_only()
        .column_as(CartItemCol::ProductId, "product_id")
        .column_as(CartItemCol::Quantity, "quantity")
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::Stock, "stock")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .lock(LockType::Update)
        .into_model::<CheckoutRow>()
        .all(&txn)
        .await?;

    if rows.is_empty() {
        return Err(AppError::EmptyCart);
    }

    // Snapshot moment: the total and every item price freeze here.
    let total_amount: Decimal = rows
        .iter()
        .map(|row| row.price * Decimal::from(row.quantity))
        .sum();

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer.id),
        status: Set(STATUS_PENDING.into()),
        total_amount: Set(total_amount),
        phone: Set(payload.phone.unwrap_or_default()),
        address: Set(payload.address.unwrap_or_default()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            quantity: Set(row.quantity),
            price: Set(row.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));

        // Stock is advisory: clamp at zero instead of rejecting the order.
        let next_stock = (row.stock - row.quantity).max(0);
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::value(next_stock))
            .filter(ProdCol::Id.eq(row.product_id))
            .exec(&txn)
            .await?;
    }

    // Empty the cart; the cart row itself persists for reuse.
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    cart_service::touch(&txn, cart).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(customer.id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        order_dto(order, items),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    identity: &Identity,
) -> AppResult<ApiResponse<OrderList>> {
    let customer = customer_service::resolve(&state.orm, identity).await?;

    let orders = Orders::find()
        .filter(OrderCol::CustomerId.eq(customer.id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let items = load_items(&state.orm, order.id).await?;
        out.push(order_dto(order, items));
    }

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: out },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderDto>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::OrderNotFound)?;

    let items = load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        order_dto(order, items),
        Some(Meta::empty()),
    ))
}

/// Administrative status advance along the order lifecycle: pending → paid
/// → shipped → completed, with cancellation allowed from pending or paid.
pub async fn update_status(
    state: &AppState,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderDto>> {
    let status = payload.status.trim().to_ascii_lowercase();
    if !ORDER_STATUSES.contains(&status.as_str()) {
        return Err(AppError::BadRequest(format!("unknown status '{status}'")));
    }

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::OrderNotFound)?;

    if !is_valid_transition(&order.status, &status) {
        return Err(AppError::BadRequest(format!(
            "cannot transition from '{}' to '{status}'",
            order.status
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(status.clone());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "order_status",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let items = load_items(&state.orm, order.id).await?;
    Ok(ApiResponse::success(
        "Status updated",
        order_dto(order, items),
        Some(Meta::empty()),
    ))
}

async fn load_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemDto>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect())
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItemDto {
    OrderItemDto {
        id: model.id,
        product_id: model.product_id,
        quantity: model.quantity,
        subtotal: model.price * Decimal::from(model.quantity),
        price: model.price,
    }
}

fn order_dto(order: OrderModel, items: Vec<OrderItemDto>) -> OrderDto {
    OrderDto {
        id: order.id,
        customer_id: order.customer_id,
        status: order.status,
        total_amount: order.total_amount,
        phone: order.phone,
        address: order.address,
        created_at: order.created_at.with_timezone(&Utc),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_transition;

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(is_valid_transition("pending", "paid"));
        assert!(is_valid_transition("paid", "shipped"));
        assert!(is_valid_transition("shipped", "completed"));

        assert!(!is_valid_transition("pending", "shipped"));
        assert!(!is_valid_transition("completed", "pending"));
        assert!(!is_valid_transition("paid", "pending"));
    }

    #[test]
    fn cancellation_only_before_shipment() {
        assert!(is_valid_transition("pending", "cancelled"));
        assert!(is_valid_transition("paid", "cancelled"));

        assert!(!is_valid_transition("shipped", "cancelled"));
        assert!(!is_valid_transition("completed", "cancelled"));
        assert!(!is_valid_transition("cancelled", "pending"));
    }
}
