use std::collections::BTreeMap;

use axum::{
    extract::Multipart,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::{
    decimate, interpolate::interpolate_to_grid, render, stride_factor, Column, ErrorKind,
    SieveError, Table,
};

const PREVIEW_ROWS: usize = 10;
const DEFAULT_RESOLUTION: usize = 100;

// =====================
// API types
// =====================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DecimateResponse {
    pub factor: usize,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns: Vec<String>,
    pub preview: Vec<Vec<String>>,
    pub csv: String,
    pub warning: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn to_http(e: SieveError) -> ApiError {
    let status = match e.kind() {
        ErrorKind::Validation | ErrorKind::Parse => StatusCode::BAD_REQUEST,
        ErrorKind::Computation => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

// =====================
// Multipart handling
// =====================

struct Upload {
    filename: String,
    bytes: Vec<u8>,
    fields: BTreeMap<String, String>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> Result<Upload, ApiError> {
        let mut filename = None;
        let mut bytes = None;
        let mut fields = BTreeMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                filename = Some(field.file_name().unwrap_or("upload.csv").to_string());
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| bad_request(format!("failed to read upload: {e}")))?
                        .to_vec(),
                );
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("failed to read field '{name}': {e}")))?;
                fields.insert(name, value);
            }
        }

        match (filename, bytes) {
            (Some(filename), Some(bytes)) => Ok(Upload {
                filename,
                bytes,
                fields,
            }),
            _ => Err(bad_request("missing 'file' part")),
        }
    }

    fn rate(&self, name: &str) -> Result<f64, ApiError> {
        self.fields
            .get(name)
            .ok_or_else(|| bad_request(format!("missing '{name}' field")))?
            .trim()
            .parse::<f64>()
            .map_err(|_| bad_request(format!("'{name}' must be a number")))
    }

    fn table(&self) -> Result<Table, ApiError> {
        Table::from_upload(&self.filename, self.bytes.clone()).map_err(to_http)
    }
}

fn decimate_response(
    out: &Table,
    rows_in: usize,
    factor: usize,
    warning: Option<String>,
) -> Result<DecimateResponse, ApiError> {
    let preview = (0..out.num_rows().min(PREVIEW_ROWS))
        .map(|i| out.row(i))
        .collect();
    Ok(DecimateResponse {
        factor,
        rows_in,
        rows_out: out.num_rows(),
        columns: out.names.clone(),
        preview,
        csv: out.to_csv_string().map_err(to_http)?,
        warning,
    })
}

// =====================
// Router builder
// =====================

pub fn build_app(web_path: &str) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/decimate", post(decimate_stride))
        .route("/api/decimate/filtered", post(decimate_filtered))
        .route("/api/heatmap", post(heatmap))
        .nest_service("/", ServeDir::new(web_path))
}

// =====================
// Handlers
// =====================

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Upload a table plus a frequency pair, get back every k-th row.
pub async fn decimate_stride(
    multipart: Multipart,
) -> Result<Json<DecimateResponse>, ApiError> {
    let upload = Upload::read(multipart).await?;
    let factor = stride_factor(upload.rate("original_rate")?, upload.rate("target_rate")?)
        .map_err(to_http)?;

    let table = upload.table()?;
    let rows_in = table.num_rows();
    let out = crate::decimate_by_stride(&table, factor);

    Ok(Json(decimate_response(&out, rows_in, factor, None)?))
}

/// Same as [`decimate_stride`] but with the anti-aliasing filter on numeric
/// columns. A computed factor of 1 is a no-op: the table comes back unchanged
/// with a warning instead of an error.
pub async fn decimate_filtered(
    multipart: Multipart,
) -> Result<Json<DecimateResponse>, ApiError> {
    let upload = Upload::read(multipart).await?;
    let factor = stride_factor(upload.rate("original_rate")?, upload.rate("target_rate")?)
        .map_err(to_http)?;

    let table = upload.table()?;
    let rows_in = table.num_rows();

    if factor < 2 {
        let warning = format!("computed decimation factor is {factor}; table returned unchanged");
        return Ok(Json(decimate_response(&table, rows_in, factor, Some(warning))?));
    }

    let out = decimate::decimate_filtered(&table, factor).map_err(to_http)?;
    Ok(Json(decimate_response(&out, rows_in, factor, None)?))
}

/// Upload a table with [time, x, y, value] as its first four columns, get
/// back an interpolated heatmap PNG.
pub async fn heatmap(multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let upload = Upload::read(multipart).await?;
    let resolution = match upload.fields.get("resolution") {
        Some(raw) => {
            let res = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| bad_request("'resolution' must be a positive integer"))?;
            if !(2..=1000).contains(&res) {
                return Err(bad_request("'resolution' must be between 2 and 1000"));
            }
            res
        }
        None => DEFAULT_RESOLUTION,
    };

    let table = upload.table()?;
    if table.num_cols() < 4 {
        return Err(to_http(SieveError::NotEnoughColumns {
            needed: 4,
            found: table.num_cols(),
        }));
    }

    // Positional roles: column 0 is time (unused), then x, y, value.
    let mut coords: Vec<&Vec<f64>> = Vec::with_capacity(3);
    for idx in 1..=3 {
        match &table.columns[idx] {
            Column::Numeric(v) => coords.push(v),
            Column::Text(_) => {
                return Err(to_http(SieveError::ColumnNotNumeric {
                    column: table.names[idx].clone(),
                }))
            }
        }
    }
    let (x, y, z) = (coords[0], coords[1], coords[2]);

    let surface = interpolate_to_grid(x, y, z, resolution).map_err(to_http)?;
    let png = render::heatmap_png(
        &surface,
        x,
        y,
        z,
        &table.names[1],
        &table.names[2],
        &table.names[3],
    )
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("failed to render heatmap: {e}"),
            }),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
