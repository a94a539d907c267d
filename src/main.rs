#[tokio::main]
async fn main() {
    if let Err(err) = sourcing_api::run().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}
