#[tokio::main]
async fn main() -> anyhow::Result<()> {
    thermal_logger_lib::run().await
}
