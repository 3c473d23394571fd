#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    subsdesk::server::run().await
}
