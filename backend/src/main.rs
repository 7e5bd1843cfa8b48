#[tokio::main]
async fn main() -> anyhow::Result<()> {
  jukebox_lib::run().await
}
