// HTTP handlers, one module per resource. Each module exposes `routes()`;
// routes that need a caller are wrapped in the bearer middleware there.

pub mod auth;
pub mod root;
pub mod subscriptions;
pub mod trailers;
pub mod trucks;
pub mod users;

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::filter::{Filter, QueryConfig, QueryParams};
use crate::middleware::ListResponse;

pub(crate) async fn db() -> Result<PgPool, ApiError> {
    Ok(DatabaseManager::pool().await?)
}

/// Path ids are parsed by hand so a malformed id gets the JSON error envelope.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid id: {}", raw)))
}

/// Builds the listing query for `collection` from a raw query string.
pub(crate) fn listing(collection: QueryConfig, raw_query: Option<&str>) -> Filter {
    scoped_listing(collection, &[], raw_query)
}

/// Like [`listing`], with the collection pre-constrained to `field = value`
/// pairs before the request parameters are applied.
pub(crate) fn scoped_listing(collection: QueryConfig, scope: &[(&str, String)], raw_query: Option<&str>) -> Filter {
    let params = QueryParams::parse(raw_query);
    let mut filter = Filter::new(collection.with_max_limit(config().query.max_limit));
    for (field, value) in scope {
        filter.scope(field, value.clone());
    }
    filter.apply(&params);
    filter
}

pub(crate) async fn run_listing(filter: Filter) -> Result<ListResponse, ApiError> {
    let pool = db().await?;
    let page = filter.execute(&pool).await?;
    Ok(ListResponse::from(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::truck::TRUCK_QUERY;

    #[test]
    fn malformed_ids_are_bad_requests() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn listing_applies_query_string() {
        let filter = listing(TRUCK_QUERY, Some("make=Volvo&limit=5&page=2&sort=-price"));
        assert_eq!(filter.constraints().len(), 1);
        assert_eq!(filter.page().offset(), 5);
        assert_eq!(filter.sort_keys()[0].field, "price");
    }

    #[test]
    fn scope_is_counted_with_request_filters() {
        let owner = Uuid::new_v4().to_string();
        let filter = scoped_listing(TRUCK_QUERY, &[("owner", owner)], Some("status=active&sort=price"));
        assert_eq!(filter.constraints().len(), 2);
        assert!(filter.to_count_sql().query.contains("\"owner\" = $1::uuid"));
    }
}
