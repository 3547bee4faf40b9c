use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    dto::identity::Identity,
    entity::customers::{
        ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers,
        Model as CustomerModel,
    },
    error::{AppError, AppResult},
};

/// Resolve an external identity to a customer, creating the record on first
/// sight. Display fields are stored at creation only and never refreshed.
pub async fn resolve<C: ConnectionTrait>(
    conn: &C,
    identity: &Identity,
) -> AppResult<CustomerModel> {
    let external_id = identity.external_id()?;

    if let Some(existing) = Customers::find()
        .filter(CustomerCol::ExternalId.eq(external_id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    // Two first-sight resolves can race; the unique constraint picks the
    // winner and the re-select returns the surviving row.
    Customers::insert(CustomerActive {
        id: Set(Uuid::new_v4()),
        external_id: Set(external_id),
        username: Set(identity.username.clone()),
        full_name: Set(identity.full_name.clone()),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::column(CustomerCol::ExternalId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Customers::find()
        .filter(CustomerCol::ExternalId.eq(external_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("customer row missing after upsert")))
}
