#[tokio::main]
async fn main() {
    dicestats::start_server().await;
}
