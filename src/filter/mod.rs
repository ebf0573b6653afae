pub mod types;
pub mod params;
pub mod filter;
pub mod filter_where;
pub mod filter_order;

pub use types::*;
pub use params::QueryParams;
pub use filter::{Filter, FilterPage, PageLink, Pagination, RecordSource};
