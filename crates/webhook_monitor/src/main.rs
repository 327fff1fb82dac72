#[tokio::main]
async fn main() {
    if let Err(e) = lib_webhook_monitor::init().await {
        eprintln!("❌ Webhook monitor failed: {e}");
        std::process::exit(1);
    }
}
