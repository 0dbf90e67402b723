//! Tier 1 Mock RPC Demo
//!
//! Shows how code that talks to NEAR RPC can be tested without a node:
//! canned responses, view results, and call log assertions.
//!
//! Run with: `cargo run --example mock_rpc_demo`

use near_testing_framework::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("=== NEAR Testing Framework ===");
    println!("Tier 1: Mock RPC Demo\n");

    demo_1_accounts().await?;
    demo_2_view_functions().await?;
    demo_3_call_log().await?;

    println!("\nAll demos completed");
    Ok(())
}

async fn demo_1_accounts() -> anyhow::Result<()> {
    println!("--- Demo 1: Mocked accounts ---");

    let mock = MockDispatcher::new();
    mock.add_account("alice.near", 50.0)?;
    mock.add_account_with(MockAccount::new("contract.near", 5.0).with_storage_usage(120_000))?;

    let client = RpcClient::http("http://127.0.0.1:3030");
    let _guard = mock.install(&client);

    for account_id in ["alice.near", "contract.near"] {
        let view = client.view_account(account_id).await?;
        println!(
            "{}: {} yoctoNEAR, {} bytes of storage",
            account_id, view.amount, view.storage_usage
        );
    }

    match client.view_account("nobody.near").await {
        Ok(_) => println!("unexpected answer for nobody.near"),
        Err(e) => println!("nobody.near: {}", e),
    }

    Ok(())
}

async fn demo_2_view_functions() -> anyhow::Result<()> {
    println!("\n--- Demo 2: View functions ---");

    let mock = MockDispatcher::new();
    mock.add_view_result("counter.near", "get_count", &json!(42))?;
    mock.add_view_result("counter.near", "get_owner", "alice.near")?;

    let client = RpcClient::http("http://127.0.0.1:3030");
    let _guard = mock.install(&client);

    let count = client
        .view_function("counter.near", "get_count", &json!({}))
        .await?;
    let owner = client
        .view_function("counter.near", "get_owner", &json!({}))
        .await?;
    println!("count = {}, owner = {}", count, owner);

    Ok(())
}

async fn demo_3_call_log() -> anyhow::Result<()> {
    println!("\n--- Demo 3: Call log ---");

    let mock = MockDispatcher::new();
    mock.add_response("status", json!({"chain_id": "localnet"}));
    mock.add_error("broadcast_tx_commit", "InvalidNonce", None);

    let client = RpcClient::http("http://127.0.0.1:3030");
    let _guard = mock.install(&client);

    client.status().await?;
    let _ = client.call("broadcast_tx_commit", json!(["AAAA"])).await;

    for call in mock.calls() {
        println!("{} {}", call.method, call.params);
    }

    mock.assert_called("status", None)?;
    mock.assert_not_called("block")?;
    println!("{} call(s) recorded", mock.call_count());

    Ok(())
}
