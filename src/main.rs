use influx_metrics_reporter::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
