// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builds a cache from `STORE_*` environment variables and runs a few
//! operations against a live store.
//!
//! Requires a reachable store, by default at `localhost:6379`.

use failover_cache::{Cache, CacheConfig, load};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let config = CacheConfig::from_env()?;
    println!("primary: {}, replicas: {}", config.primary(), config.replicas().len());

    // No connection is opened until the first command.
    let cache = Cache::from_config(&config)?;

    cache.set("users", "42", r#"{"name":"Ann"}"#).await?;
    println!("get(users, 42): {:?}", cache.get("users", "42").await?);

    let loaded = cache
        .get_or_load(
            "users",
            "43",
            load::from_async(|| async { Ok::<_, std::io::Error>(r#"{"name":"Bo"}"#.to_string()) }),
        )
        .await?;
    println!("get_or_load(users, 43): {loaded}");

    cache.close().await?;
    Ok(())
}
