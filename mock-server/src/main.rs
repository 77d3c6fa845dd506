use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "6800".to_string());
    let addr = format!("127.0.0.1:{port}");
    let mut state = mock_server::MockState::new();
    if let (Ok(username), Ok(password)) = (std::env::var("SCRAPYD_USERNAME"), std::env::var("SCRAPYD_PASSWORD")) {
        state = state.with_credentials(&username, &password);
    }
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}");
    mock_server::run_with(listener, state).await
}
