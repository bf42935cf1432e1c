// ABOUTME: Minimal demonstration of connecting, joining, and listing cluster members.
// ABOUTME: Run against a real agent with `cargo run --example basic_client -- 127.0.0.1:7373`.

use std::env;

use meshrpc::{Client, Config};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> meshrpc::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(tracing::Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let addr = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:7373".to_string());
    let config = Config::builder(addr).build()?;
    let client = Client::connect(config).await?;

    let members = client.members().await?;
    println!("{} member(s):", members.len());
    for member in &members {
        println!("  {} ({})", member.name, member.status);
    }

    let (handle, mut log_lines) = client.monitor("INFO", 16).await?;
    tokio::spawn(async move {
        while let Some(line) = log_lines.recv().await {
            println!("[agent] {line}");
        }
    });
    client.stop(handle).await?;

    client.close().await;
    Ok(())
}
