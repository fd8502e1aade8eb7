use axum::{
    Json, Router,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use bytes::Bytes;
use include_dir::{include_dir, Dir};
use parking_lot::RwLock;
use serde::Serialize;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;
use chrono::Utc;

use crate::{
    archive::{build_report_archive, ARCHIVE_FILE_NAME},
    error::DesignError,
    models::{DesignContext, DesignForm, DesignOptions, FormOptions},
    palette::{mime_type_for, render_palette_svg, ColorPalette, ColorSwatch, PaletteService},
    pipeline::{run_on_dedicated_runtime, Pipeline},
    report::REPORT_FILE_NAME,
};

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, DesignContext>>>,
    pub pipeline: Arc<Pipeline>,
    pub palettes: Arc<PaletteService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/*path", get(static_asset))
        .route("/api/form-options", get(form_options))
        .route("/api/design", post(generate_design))
        .route("/api/design/:id", get(get_design))
        .route("/api/design/:id/reset", post(reset_design))
        .route("/api/design/:id/report", get(get_report))
        .route("/api/design/:id/files/:name", get(get_file))
        .route("/api/design/:id/download", get(download_archive))
        .route("/api/design/:id/colors/:name", post(analyze_colors))
        .route("/api/options", post(generate_options))
        .route("/api/options/:id/regenerate", post(regenerate_options))
        .route("/api/options/:id/select/:n", post(select_option))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ColorReport {
    pub file_name: String,
    pub swatches: Vec<ColorSwatch>,
    pub palette: ColorPalette,
    pub svg: String,
}

#[derive(Debug, Serialize)]
pub struct OptionsView {
    pub id: Uuid,
    pub concept_text: String,
    pub options: Vec<String>,
    pub selected_option: Option<usize>,
}

impl OptionsView {
    fn new(id: Uuid, options: &DesignOptions, selected_option: Option<usize>) -> Self {
        Self {
            id,
            concept_text: options.concept_text.clone(),
            options: options.options.iter().map(|p| base_name(p)).collect(),
            selected_option,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub id: Uuid,
    pub selected_option: usize,
    pub colors: ColorReport,
}

fn base_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn load_context(state: &AppState, id: Uuid) -> Result<DesignContext, DesignError> {
    state.store.read().get(&id).cloned().ok_or_else(|| DesignError::NotFound(format!("design {}", id)))
}

/// Resolves a bare file name inside the context's run directory.
fn run_file(ctx: &DesignContext, name: &str) -> Result<PathBuf, DesignError> {
    let not_found = || DesignError::NotFound(format!("file {}", name));
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(not_found());
    }
    let path = ctx.output_dir().ok_or_else(not_found)?.join(name);
    if !path.is_file() {
        return Err(not_found());
    }
    Ok(path)
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub async fn index() -> Result<Html<&'static str>, DesignError> {
    STATIC_DIR
        .get_file("index.html")
        .and_then(|f| f.contents_utf8())
        .map(Html)
        .ok_or_else(|| DesignError::NotFound("index.html".into()))
}

pub async fn static_asset(Path(path): Path<String>) -> Result<Response, DesignError> {
    let file = STATIC_DIR.get_file(&path).ok_or_else(|| DesignError::NotFound(path.clone()))?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], file.contents()).into_response())
}

pub async fn form_options() -> Json<FormOptions> {
    Json(FormOptions::default())
}

pub async fn generate_design(State(state): State<AppState>, Json(form): Json<DesignForm>) -> Result<Json<DesignContext>, DesignError> {
    let request = form.validate()?;
    let pipeline = state.pipeline.clone();
    let generated = run_on_dedicated_runtime(move || async move { pipeline.generate_report(&request).await }).await?;

    let mut ctx = DesignContext::new(Uuid::new_v4(), form);
    ctx.generated = Some(generated);
    state.store.write().insert(ctx.id, ctx.clone());
    tracing::info!("✅ Stored design {}", ctx.id);
    Ok(Json(ctx))
}

pub async fn get_design(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<DesignContext>, DesignError> {
    load_context(&state, id).map(Json)
}

pub async fn reset_design(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<DesignContext>, DesignError> {
    let mut guard = state.store.write();
    let ctx = guard.get(&id).ok_or_else(|| DesignError::NotFound(format!("design {}", id)))?;
    let fresh = ctx.reset();
    guard.insert(id, fresh.clone());
    tracing::info!("🔄 Reset design {}", id);
    Ok(Json(fresh))
}

/// Sends the browser to the report inside the files route so its relative
/// image links resolve.
pub async fn get_report(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Redirect, DesignError> {
    let ctx = load_context(&state, id)?;
    if ctx.generated.is_none() {
        return Err(DesignError::NotFound(format!("report for design {}", id)));
    }
    Ok(Redirect::temporary(&format!("/api/design/{}/files/{}", id, REPORT_FILE_NAME)))
}

pub async fn get_file(Path((id, name)): Path<(Uuid, String)>, State(state): State<AppState>) -> Result<Response, DesignError> {
    let ctx = load_context(&state, id)?;
    let path = run_file(&ctx, &name)?;
    let data = tokio::fs::read(&path).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], data).into_response())
}

pub async fn download_archive(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Response, DesignError> {
    let ctx = load_context(&state, id)?;
    let bundle = ctx
        .generated
        .map(|g| g.bundle)
        .ok_or_else(|| DesignError::NotFound(format!("report for design {}", id)))?;

    let data = build_report_archive(&bundle.html_path, &bundle.output_dir)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", ARCHIVE_FILE_NAME))
            .map_err(|e| DesignError::Internal(e.to_string()))?,
    );
    Ok((headers, Bytes::from(data)).into_response())
}

async fn color_report(state: &AppState, path: &std::path::Path) -> Result<ColorReport, DesignError> {
    let image = tokio::fs::read(path).await?;
    let swatches = state.palettes.analyze(&image, mime_type_for(path, &image)).await?;
    let palette = ColorPalette::group(&swatches);
    let svg = render_palette_svg(&palette);
    Ok(ColorReport { file_name: base_name(path), swatches, palette, svg })
}

pub async fn analyze_colors(Path((id, name)): Path<(Uuid, String)>, State(state): State<AppState>) -> Result<Json<ColorReport>, DesignError> {
    let ctx = load_context(&state, id)?;
    let path = run_file(&ctx, &name)?;
    tracing::info!("🎨 Analyzing colors of {} for design {}", name, id);
    Ok(Json(color_report(&state, &path).await?))
}

pub async fn generate_options(State(state): State<AppState>, Json(form): Json<DesignForm>) -> Result<Json<OptionsView>, DesignError> {
    let request = form.validate()?;
    let pipeline = state.pipeline.clone();
    let options = run_on_dedicated_runtime(move || async move { pipeline.generate_options(&request).await }).await?;

    let mut ctx = DesignContext::new(Uuid::new_v4(), form);
    let view = OptionsView::new(ctx.id, &options, None);
    ctx.options = Some(options);
    state.store.write().insert(ctx.id, ctx);
    Ok(Json(view))
}

pub async fn regenerate_options(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<OptionsView>, DesignError> {
    let ctx = load_context(&state, id)?;
    let request = ctx.form.validate()?;
    let concept_text = ctx
        .options
        .map(|o| o.concept_text)
        .ok_or_else(|| DesignError::NotFound(format!("options for design {}", id)))?;

    tracing::info!("🔁 Regenerating design options for {}", id);
    let pipeline = state.pipeline.clone();
    let options = run_on_dedicated_runtime(move || async move { pipeline.regenerate_options(&request, concept_text).await }).await?;

    let view = OptionsView::new(id, &options, None);
    let mut guard = state.store.write();
    let stored = guard.get_mut(&id).ok_or_else(|| DesignError::NotFound(format!("design {}", id)))?;
    stored.options = Some(options);
    stored.selected_option = None;
    stored.updated_at = Utc::now();
    Ok(Json(view))
}

pub async fn select_option(Path((id, n)): Path<(Uuid, usize)>, State(state): State<AppState>) -> Result<Json<SelectionView>, DesignError> {
    let path = {
        let ctx = load_context(&state, id)?;
        let options = ctx.options.ok_or_else(|| DesignError::NotFound(format!("options for design {}", id)))?;
        if n == 0 || n > options.options.len() {
            return Err(DesignError::Validation(format!(
                "Option {} does not exist; choose 1 to {}",
                n,
                options.options.len()
            )));
        }
        options.options[n - 1].clone()
    };

    tracing::info!("🎯 Design option {} selected for {}", n, id);
    let colors = color_report(&state, &path).await?;

    if let Some(stored) = state.store.write().get_mut(&id) {
        stored.selected_option = Some(n);
        stored.updated_at = Utc::now();
    }
    Ok(Json(SelectionView { id, selected_option: n, colors }))
}
