use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::identity::Identity,
    error::{AppError, AppResult},
    models::Product,
};

/// Quantity as it arrives over the wire; clients send integers, numeric
/// strings, and occasionally floats.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Quantity {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Quantity {
    pub fn parse(&self) -> AppResult<i32> {
        let value = match self {
            Quantity::Int(n) => *n,
            Quantity::Float(f) => {
                if f.fract() != 0.0 {
                    return Err(AppError::InvalidQuantity(
                        "quantity must be a positive integer".into(),
                    ));
                }
                *f as i64
            }
            Quantity::Text(raw) => raw.trim().parse::<i64>().map_err(|_| {
                AppError::InvalidQuantity("quantity must be a positive integer".into())
            })?,
        };
        if value <= 0 || value > i32::MAX as i64 {
            return Err(AppError::InvalidQuantity(
                "quantity must be a positive integer".into(),
            ));
        }
        Ok(value as i32)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    #[serde(flatten)]
    pub identity: Identity,
    pub product_id: Option<Uuid>,
    pub quantity: Option<Quantity>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearCartRequest {
    #[serde(flatten)]
    pub identity: Identity,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<CartItemDto>,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_integers_and_numeric_strings() {
        assert_eq!(Quantity::Int(3).parse().unwrap(), 3);
        assert_eq!(Quantity::Text("2".into()).parse().unwrap(), 2);
        assert_eq!(Quantity::Float(4.0).parse().unwrap(), 4);
    }

    #[test]
    fn rejects_non_positive_and_fractional() {
        assert!(Quantity::Int(0).parse().is_err());
        assert!(Quantity::Int(-1).parse().is_err());
        assert!(Quantity::Float(2.5).parse().is_err());
        assert!(Quantity::Text("two".into()).parse().is_err());
    }
}
