// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A primary with two replicas where one replica is unreachable.
//! Reads that land on the broken replica fall back to the primary.

use failover_cache::{Cache, CommandName, Signal, StoreErrorKind};
use failover_cache_node::testing::MockNode;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let primary = MockNode::new("primary:6379");
    let replica1 = primary.mirror("replica-1:6380");
    let replica2 = primary.mirror("replica-2:6380");
    replica1.fail_all(StoreErrorKind::ConnectionRefused);

    let cache = Cache::builder(primary.clone())
        .replica(replica1.clone())
        .replica(replica2.clone())
        .build();

    cache.set("users", "42", r#"{"name":"Ann"}"#).await.expect("write to primary");

    for _ in 0..4 {
        let value = cache.get("users", "42").await.expect("read with fallback");
        println!("get(users, 42): {value:?}");
    }

    println!(
        "reads: replica-1 {}, replica-2 {}, primary {}",
        replica1.count(CommandName::HGet),
        replica2.count(CommandName::HGet),
        primary.count(CommandName::HGet)
    );

    // Once the primary is down too, the caller sees the primary's failure.
    primary.fail_all(StoreErrorKind::TimedOut);
    replica2.fail_all(StoreErrorKind::TimedOut);
    let error = cache.get("users", "42").await.expect_err("every node is down");
    assert_eq!(error.signal(), Signal::GatewayTimeout);
    println!("get(users, 42) with every node down: {} ({})", error.signal(), error.status_code());

    cache.close().await.expect("close all nodes");
}
