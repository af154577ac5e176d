#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reviewtrust_lib::run(std::env::args().collect()).await
}
