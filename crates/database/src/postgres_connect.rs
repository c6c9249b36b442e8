/// Initializes the connection pool for the application and, on request,
/// (re)creates the tables of the listed types.
///
/// # Arguments
/// - `default: [$($default_type:ty),*]`: types implementing `SqlxSchema` that live in `DATABASE_URL`.
///
/// # Generated Functions
/// - `async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static PgPool>`
///
/// The calling crate needs `tokio`, `sqlx`, `anyhow` and `tracing` in scope.
///
/// # Example
/// ```rust,ignore
/// init_databases!(
///     default: [WalletRow, PityRow]
/// );
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let pool = connect(false, true).await?;
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! init_databases {
    (
        default: [$($default_type:ty),* $(,)?]
    ) => {
        static POOL: tokio::sync::OnceCell<sqlx::PgPool> = tokio::sync::OnceCell::const_new();

        async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static sqlx::PgPool> {
            POOL.get_or_try_init(|| async {
                let database_url = std::env::var("DATABASE_URL")
                    .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

                let pool = sqlx::PgPool::connect(&database_url).await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to default database: {}", e))?;

                if drop_tables {
                    $(
                        let drop_table_sql_str = <$default_type as $crate::SqlxSchema>::drop_table_sql();
                        if let Err(e) = sqlx::query(&drop_table_sql_str).execute(&pool).await {
                            tracing::warn!("Failed to drop table for '{}'. Error: {:?}", stringify!($default_type), e);
                        }
                    )*
                }

                if create_tables {
                    $(
                        for statement in <$default_type as $crate::SqlxSchema>::schema_statements() {
                            sqlx::query(&statement).execute(&pool).await
                                .map_err(|e| anyhow::anyhow!("Failed to create schema for '{}'. SQL: {}. Error: {:?}", stringify!($default_type), statement, e))?;
                        }
                    )*
                }

                Ok::<_, anyhow::Error>(pool)
            }).await
        }
    };
}
