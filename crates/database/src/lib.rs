#[cfg(feature = "postgres")]
mod sqlx_postgres;
#[cfg(feature = "postgres")]
mod postgres_connect;

#[cfg(feature = "postgres")]
pub use sqlx_postgres::*;
