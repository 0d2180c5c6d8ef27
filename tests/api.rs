use reqwest::multipart;
use reqwest::Client;
use serde_json::Value;
use tokio::net::TcpListener;

struct TestApp {
    base_url: String,
    client: Client,
}

fn web_path() -> String {
    // Make the path robust in CI and locally
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.join("src").join("web").to_string_lossy().to_string()
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let port = listener.local_addr().unwrap().port();
    let base_url = format!("http://127.0.0.1:{port}");

    let app = datasieve::server::build_app(&web_path());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    TestApp {
        base_url,
        client: Client::new(),
    }
}

fn csv_form(csv: &str, original_rate: &str, target_rate: &str) -> multipart::Form {
    multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(csv.as_bytes().to_vec()).file_name("data.csv"),
        )
        .text("original_rate", original_rate.to_string())
        .text("target_rate", target_rate.to_string())
}

fn sample_csv(rows: usize) -> String {
    let mut csv = String::from("t,v\n");
    for i in 0..rows {
        csv.push_str(&format!("{},{}\n", i, i));
    }
    csv
}

#[tokio::test]
async fn health_ok() {
    let app = spawn_app().await;

    let res = app
        .client
        .get(format!("{}/api/health", app.base_url))
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(!body["version"].as_str().unwrap_or("").is_empty());
}

#[tokio::test]
async fn decimate_returns_every_tenth_row() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(format!("{}/api/decimate", app.base_url))
        .multipart(csv_form(&sample_csv(100), "10", "1"))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["factor"], 10);
    assert_eq!(body["rows_in"], 100);
    assert_eq!(body["rows_out"], 10);
    assert_eq!(body["columns"][1], "v");
    assert_eq!(body["preview"][0][1], "0");
    assert_eq!(body["preview"][1][1], "10");
    assert!(body["warning"].is_null());

    let csv = body["csv"].as_str().unwrap();
    assert!(csv.starts_with("t,v"));
    assert!(csv.contains("90,90"));
}

#[tokio::test]
async fn decimate_rejects_equal_rates() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(format!("{}/api/decimate", app.base_url))
        .multipart(csv_form(&sample_csv(10), "1.0", "1.0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: Value = res.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("strictly less than original rate"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
async fn filtered_decimate_with_factor_one_is_a_warning_no_op() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(format!("{}/api/decimate/filtered", app.base_url))
        .multipart(csv_form(&sample_csv(20), "10", "6"))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["factor"], 1);
    assert_eq!(body["rows_out"], 20);
    assert!(body["warning"].as_str().unwrap().contains("unchanged"));
}

#[tokio::test]
async fn filtered_decimate_keeps_columns_aligned() {
    let app = spawn_app().await;

    let mut csv = String::from("v,tag\n");
    for i in 0..50 {
        csv.push_str(&format!("{},row{}\n", i, i));
    }

    let res = app
        .client
        .post(format!("{}/api/decimate/filtered", app.base_url))
        .multipart(csv_form(&csv, "7", "1"))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["factor"], 7);
    // ceil(50 / 7) on both the filtered numeric path and the strided text path
    assert_eq!(body["rows_out"], 8);
    assert_eq!(body["preview"][1][1], "row7");
}

#[tokio::test]
async fn heatmap_returns_png() {
    let app = spawn_app().await;

    let csv = "t,x,y,conversion\n\
               0,0,0,0\n\
               1,1,0,1\n\
               2,1,1,1\n\
               3,0,1,0\n\
               4,0.5,0.5,0.5\n";
    let form = multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(csv.as_bytes().to_vec()).file_name("data.csv"),
        )
        .text("resolution", "50");

    let res = app
        .client
        .post(format!("{}/api/heatmap", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );

    let bytes = res.bytes().await.unwrap();
    assert_eq!(&bytes[..4], b"\x89PNG");
}

#[tokio::test]
async fn heatmap_rejects_too_few_points() {
    let app = spawn_app().await;

    let csv = "t,x,y,v\n0,0,0,1\n1,1,1,2\n";
    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(csv.as_bytes().to_vec()).file_name("data.csv"),
    );

    let res = app
        .client
        .post(format!("{}/api/heatmap", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: Value = res.json().await.unwrap();
    assert!(
        body["error"].as_str().unwrap().contains("not enough points"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
async fn heatmap_rejects_tables_with_fewer_than_four_columns() {
    let app = spawn_app().await;

    let csv = "t,x,y\n0,0,0\n1,1,0\n2,1,1\n";
    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(csv.as_bytes().to_vec()).file_name("data.csv"),
    );

    let res = app
        .client
        .post(format!("{}/api/heatmap", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: Value = res.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("needs at least 4 columns"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
async fn web_assets_are_served() {
    let app = spawn_app().await;

    // index
    let res = app
        .client
        .get(format!("{}/", app.base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let html = res.text().await.unwrap();
    assert!(!html.trim().is_empty());

    assert!(
        html.contains("<title>Datasieve</title>"),
        "index.html should contain the expected <title>"
    );
    assert!(
        html.contains("<h1>Tabular Downsampling &amp; Heatmap</h1>"),
        "index.html should contain the expected <h1>"
    );
    assert!(
        html.contains("<p class=\"subtitle\">Decimate time series, interpolate scatter data</p>"),
        "index.html should contain the expected subtitle"
    );

    // Keep a generic HTML sanity check too
    assert!(
        html.contains("<html") || html.contains("<!DOCTYPE html>"),
        "expected HTML document"
    );

    // static files
    let res = app
        .client
        .get(format!("{}/style.css", app.base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let res = app
        .client
        .get(format!("{}/app.js", app.base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
}
