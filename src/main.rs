#[tokio::main]
async fn main() -> anyhow::Result<()> {
    readypulse_gateway_lib::run().await
}
