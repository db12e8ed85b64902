#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dumpit::run().await
}
