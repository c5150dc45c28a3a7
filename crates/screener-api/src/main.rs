#[tokio::main]
async fn main() {
    if let Err(err) = screener_api::run().await {
        tracing::error!(error = %err, "screener-api failed");
        eprintln!("screener-api failed: {err}");
        std::process::exit(1);
    }
}
