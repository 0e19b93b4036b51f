//! Compile-only checks: the execution helpers accept every supported client type.

#![allow(dead_code)]

use pgcompose::exec::{execute, get_int, get_json, get_string, proc_named_json};
use pgcompose::{GenericClient, Result, SchemaCatalog, Upsert, Value, select};

async fn run_all<C: GenericClient>(client: &C, upsert: &Upsert) -> Result<()> {
    let (sql, args) = select("1", ()).to_sql(&[]);
    execute(client, &sql, &args).await?;
    let _: i64 = get_int(client, &sql, &args).await?;
    let _: String = get_string(client, &sql, &args).await?;
    let _: Option<serde_json::Value> = get_json(client, &sql, &args).await?;
    let _: Option<Vec<String>> = proc_named_json(client, "f", [("a", Value::from(1))]).await?;
    upsert
        .insert_with(client, &pgcompose::FieldMap::new())
        .await?;
    Ok(())
}

async fn _client_compiles(client: &tokio_postgres::Client) -> Result<()> {
    let catalog = SchemaCatalog::new();
    let upsert = Upsert::load(&catalog, "main", client, "ads").await?;
    run_all(client, &upsert).await
}

async fn _transaction_compiles(client: &mut tokio_postgres::Client) -> Result<()> {
    let catalog = SchemaCatalog::new();
    let tx = client.transaction().await?;
    let upsert = Upsert::load(&catalog, "main", &tx, "ads").await?;
    run_all(&tx, &upsert).await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(feature = "pool")]
async fn _pool_client_compiles(pool: &deadpool_postgres::Pool) -> Result<()> {
    let client = pool.get().await?;
    let catalog = SchemaCatalog::new();
    let upsert = Upsert::load(&catalog, "main", &client, "ads").await?;
    run_all(&client, &upsert).await
}
