#[tokio::main]
async fn main() -> anyhow::Result<()> {
    showroom_cli::run().await
}
