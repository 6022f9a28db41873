use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = rask::cli::run().await {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
