use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// External account id as it arrives over the wire: a JSON integer, or a
/// string (query parameter values are always strings).
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ExternalId {
    Int(i64),
    Text(String),
}

impl ExternalId {
    pub fn parse(&self) -> AppResult<i64> {
        match self {
            ExternalId::Int(id) => Ok(*id),
            ExternalId::Text(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::InvalidIdentity("external_id must be an integer".into())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Identity {
    pub external_id: Option<ExternalId>,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl Identity {
    pub fn external_id(&self) -> AppResult<i64> {
        self.external_id
            .as_ref()
            .ok_or_else(|| AppError::InvalidIdentity("external_id is required".into()))?
            .parse()
    }
}

/// Identity fields for GET endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerQuery {
    pub external_id: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl From<CustomerQuery> for Identity {
    fn from(query: CustomerQuery) -> Self {
        Identity {
            external_id: query.external_id.map(ExternalId::Text),
            username: query.username,
            full_name: query.full_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_string_ids() {
        assert_eq!(ExternalId::Int(555).parse().unwrap(), 555);
        assert_eq!(ExternalId::Text("555".into()).parse().unwrap(), 555);
        assert_eq!(ExternalId::Text(" 42 ".into()).parse().unwrap(), 42);
    }

    #[test]
    fn rejects_non_integer_ids() {
        assert!(matches!(
            ExternalId::Text("abc".into()).parse(),
            Err(AppError::InvalidIdentity(_))
        ));
        assert!(matches!(
            ExternalId::Text("12.5".into()).parse(),
            Err(AppError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn missing_id_is_invalid_identity() {
        let identity = Identity::default();
        assert!(matches!(
            identity.external_id(),
            Err(AppError::InvalidIdentity(_))
        ));
    }
}
