//! Serve command - the single-page upload form.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Args;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use invex_core::models::document::ACCEPTED_EXTENSIONS;
use invex_core::models::invoice::{Field, InvoiceRecord};
use invex_core::ocr::TesseractEngine;
use invex_core::pdf::PopplerRasterizer;
use invex_core::pipeline::{Pipeline, ProcessReport};

use super::{describe_save, load_config};

/// Multipart field carrying the upload.
const UPLOAD_FIELD: &str = "document";

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.bind)
    #[arg(short, long)]
    bind: Option<String>,
}

/// Shared by all handlers. The mutex keeps submissions one at a time.
struct AppState {
    session: Mutex<Session>,
}

type SharedState = Arc<AppState>;

/// The pipeline plus the record waiting for the user's go-ahead.
struct Session {
    pipeline: Pipeline,
    /// Complete record from the latest extraction, not yet saved.
    pending: Option<InvoiceRecord>,
}

impl Session {
    fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            pending: None,
        }
    }

    /// Keep the report's record for saving, or forget the previous one.
    fn remember(&mut self, report: &ProcessReport) {
        self.pending = report.savable_record().cloned();
    }

    /// Save the pending record once and render the outcome.
    fn save_pending(&mut self) -> String {
        let Some(record) = self.pending.take() else {
            return error_block("Nothing to save. Extract an invoice first.");
        };
        match self.pipeline.save(&record) {
            Ok(outcome) => {
                info!("Saved {:?}", record.invoice_number);
                format!("<div class=\"ok\">{}.</div>", escape_html(&describe_save(&outcome)))
            }
            Err(e) => {
                warn!("Save failed: {}", e);
                // Left pending so the user can retry.
                self.pending = Some(record);
                error_block(&e.to_string())
            }
        }
    }
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    info!("Record table: {}", pipeline.table().path().display());
    if !TesseractEngine::new(config.ocr.clone()).is_available().await {
        warn!("tesseract not found at {}, uploads will fail", config.ocr.tesseract_cmd.display());
    }
    if !PopplerRasterizer::new(&config.pdf).is_available().await {
        warn!("pdftoppm not found at {}, PDF uploads will fail", config.pdf.pdftoppm_cmd.display());
    }
    let state = Arc::new(AppState {
        session: Mutex::new(Session::new(pipeline)),
    });

    let app = router(state, config.server.max_upload_bytes);

    let listener = TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    println!("Invoice extractor running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/extract", post(extract))
        .route("/save", post(save))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(page(""))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn extract(State(state): State<SharedState>, multipart: Multipart) -> Response {
    let (file_name, bytes) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err((status, message)) => {
            warn!("Rejected upload: {}", message);
            return (status, Html(page(&error_block(&message)))).into_response();
        }
    };

    let mut session = state.session.lock().await;
    let report = session.pipeline.process_upload(&file_name, bytes).await;
    session.remember(&report);
    drop(session);

    Html(page(&render_report(&report))).into_response()
}

async fn save(State(state): State<SharedState>) -> Html<String> {
    let body = state.session.lock().await.save_pending();
    Html(page(&body))
}

/// Pull the uploaded file out of the form.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        if file_name.is_empty() || bytes.is_empty() {
            break;
        }
        return Ok((file_name, bytes.to_vec()));
    }
    Err((StatusCode::BAD_REQUEST, "Please choose a file to upload.".to_string()))
}

fn render_report(report: &ProcessReport) -> String {
    let mut html = format!("<h2>{}</h2>", escape_html(&report.file_name));

    if let Some(text) = &report.text {
        let _ = write!(
            html,
            "<h3>Extracted Text:</h3><pre>{}</pre>",
            escape_html(&text.text)
        );
    }

    if let Some(raw) = &report.raw_response {
        let _ = write!(
            html,
            "<h3>Service Response:</h3><pre>{}</pre>",
            escape_html(raw)
        );
    }

    if let Some(record) = &report.record {
        html.push_str("<h3>Extracted Data:</h3><table>");
        for field in Field::ALL {
            let _ = write!(
                html,
                "<tr><th>{}</th><td>{}</td></tr>",
                field.label(),
                escape_html(record.get(field).unwrap_or("-"))
            );
        }
        html.push_str("</table>");
    }

    if let Some(e) = &report.error {
        html.push_str(&error_block(&format!("{}: {}", e.kind(), e)));
    } else if report.savable_record().is_some() {
        html.push_str(SAVE_FORM);
    } else if let Some(record) = &report.record {
        let missing: Vec<&str> = record.missing_fields().iter().map(|f| f.label()).collect();
        html.push_str(&error_block(&format!(
            "Record is incomplete and cannot be saved. Missing: {}",
            missing.join(", ")
        )));
    }

    html
}

/// Saves whatever the server holds as pending; the page posts no values.
const SAVE_FORM: &str =
    "<form action=\"/save\" method=\"post\"><button type=\"submit\">Save to spreadsheet</button></form>";

fn error_block(message: &str) -> String {
    format!("<div class=\"error\">{}</div>", escape_html(message))
}

fn page(body: &str) -> String {
    let accept: Vec<String> = ACCEPTED_EXTENSIONS.iter().map(|e| format!(".{e}")).collect();
    format!(
        "<!DOCTYPE html>\
         <html><head><meta charset=\"utf-8\"><title>Invoice Extractor</title>\
         <style>body{{font-family:sans-serif;max-width:50rem;margin:2rem auto}}\
         pre{{background:#f4f4f4;padding:1rem;white-space:pre-wrap}}\
         th{{text-align:left;padding-right:1rem}}\
         .error{{color:#a00}}.ok{{color:#070}}</style></head>\
         <body><h1>Invoice Extractor</h1>\
         <form action=\"/extract\" method=\"post\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"{}\" accept=\"{}\" required>\
         <button type=\"submit\">Extract</button></form>\
         {}</body></html>",
        UPLOAD_FIELD,
        accept.join(","),
        body
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
