use datasieve::server::build_app;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    // Determine web assets path
    let web_path = if std::path::Path::new("src/web").exists() {
        "src/web"
    } else if std::path::Path::new("/workspace/rust/datasieve/src/web").exists() {
        "/workspace/rust/datasieve/src/web"
    } else {
        "src/web"
    };

    let app = build_app(web_path);

    let addr = "0.0.0.0:3000";
    println!("Server starting on http://{addr}");
    println!("Web assets from: {web_path}");
    println!();

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
