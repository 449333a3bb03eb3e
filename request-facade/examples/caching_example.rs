use request_facade::config::Config;
use request_facade::{RequestClient, RequestConfig};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Reads request-facade.yaml if present, then REQUEST_FACADE_* variables
    let config = Config::load("request-facade.yaml")?;
    let client = RequestClient::from_config(&config)?;

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080/api/items".to_string());

    println!("=== Concurrent identical requests ===");
    let start = std::time::Instant::now();
    let first = client.get::<Value>(RequestConfig::new(url.clone()).with_cache(5000));
    let second = client.get::<Value>(RequestConfig::new(url.clone()).with_cache(5000));
    let (first, second) = futures::join!(first, second);
    println!("Both requests settled in {:?}", start.elapsed());
    println!("First: {:?}", first);
    println!("Second: {:?}", second);
    println!("Cache stats: {:?}", client.cache_stats());

    println!("\n=== Cancellation ===");
    let (key, handle) = client.create_abort();
    let request = client.get::<Value>(RequestConfig::new(url).with_abort_key(key));
    let cancel = async {
        handle.abort();
    };
    let (result, _) = futures::join!(request, cancel);
    println!("Cancelled request settled with: {:?}", result);

    Ok(())
}
