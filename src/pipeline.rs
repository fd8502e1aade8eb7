//! The report pipeline: prompt, text, sections, images, HTML.

use chrono::Local;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::DesignError;
use crate::images::{generate_option_images, ImageWriter, SectionImager};
use crate::models::{DesignOptions, DesignRequest, GeneratedContent, OutputBundle};
use crate::prompt::{build_concept_prompt, build_design_prompt};
use crate::report::{assemble_section, write_report};
use crate::sections::parse_sections;
use crate::store::TestResponseStore;
use crate::vertex::{ImageGenerator, TextGenerator};

pub const OUTPUT_DIR_PREFIX: &str = "generated_content_";

/// Creates a fresh `generated_content_YYYYMMDD_HHMMSS` directory under `root`.
/// A numeric suffix is appended when a run already claimed that second.
pub fn setup_output_directory(root: &Path) -> Result<PathBuf, DesignError> {
    std::fs::create_dir_all(root)?;
    let base = format!("{}{}", OUTPUT_DIR_PREFIX, Local::now().format("%Y%m%d_%H%M%S"));
    let mut candidate = root.join(&base);
    let mut attempt = 1;
    loop {
        match std::fs::create_dir(&candidate) {
            Ok(()) => {
                info!("📁 Created output directory: {}", candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                attempt += 1;
                candidate = root.join(format!("{base}_{attempt}"));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Runs `make()` to completion on a current-thread runtime owned by this
/// call alone, on a blocking worker thread.
pub async fn run_on_dedicated_runtime<F, Fut, T>(make: F) -> Result<T, DesignError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, DesignError>>,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(make())
    })
    .await
    .map_err(|e| DesignError::Internal(format!("pipeline task failed: {}", e)))?
}

fn non_blank(text: String) -> Result<String, DesignError> {
    if text.trim().is_empty() {
        return Err(DesignError::Generation("the text model returned an empty document".into()));
    }
    Ok(text)
}

pub struct Pipeline {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageGenerator>,
    store: TestResponseStore,
    test_mode: bool,
    output_root: PathBuf,
}

impl Pipeline {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        store: TestResponseStore,
        test_mode: bool,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self { text, images, store, test_mode, output_root: output_root.into() }
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    fn offline_store(&self) -> Option<&TestResponseStore> {
        self.test_mode.then_some(&self.store)
    }

    /// Text for `prompt`. In test mode the store is consulted first and a
    /// miss is written back after calling through. Blank text is a
    /// generation failure whichever source it came from.
    async fn cached_text(&self, request: &DesignRequest, key_suffix: &str, prompt: &str) -> Result<String, DesignError> {
        let key = self.offline_store().map(|store| {
            let key = store.fingerprint(&request.room_type, &request.styles(), &request.color_palette);
            format!("{key}{key_suffix}")
        });

        if let Some(key) = &key {
            if let Some(cached) = self.store.load(key)? {
                return non_blank(cached);
            }
            info!("No cached response for key {}, calling text model", key);
        }

        let text = non_blank(self.text.generate_text(prompt).await?)?;

        if let Some(key) = &key {
            if let Err(e) = self.store.save(key, &text) {
                warn!("⚠️ Could not cache response under {}: {}", key, e);
            }
        }
        Ok(text)
    }

    pub async fn design_text(&self, request: &DesignRequest) -> Result<String, DesignError> {
        self.cached_text(request, "", &build_design_prompt(request)).await
    }

    /// Full report run: one text call, then images section by section in
    /// document order, then `generated.html`.
    pub async fn generate_report(&self, request: &DesignRequest) -> Result<GeneratedContent, DesignError> {
        info!("🚀 Generating design for {} in {} style", request.room_type, request.styles());

        let text = self.design_text(request).await?;
        let sections = parse_sections(&text);
        if sections.is_empty() {
            return Err(DesignError::Parse { raw: text });
        }
        info!("Parsed {} sections", sections.len());

        let output_dir = setup_output_directory(&self.output_root)?;
        let mut writer = ImageWriter::new(&output_dir);
        let imager = SectionImager::new(self.images.as_ref(), self.offline_store());

        let mut report = Vec::with_capacity(sections.len());
        let mut image_paths = Vec::new();
        for section in &sections {
            let paths: Vec<PathBuf> = imager
                .generate(&mut writer, request, section)
                .await
                .into_iter()
                .filter(|p| p.is_file())
                .collect();
            report.push(assemble_section(section, &paths));
            image_paths.extend(paths);
        }

        let html_path = write_report(&report, &output_dir)?;
        info!("✅ Report complete with {} sections and {} images", report.len(), image_paths.len());
        Ok(GeneratedContent { bundle: OutputBundle { output_dir, html_path, image_paths }, sections: report })
    }

    /// Short concept plus three option images.
    pub async fn generate_options(&self, request: &DesignRequest) -> Result<DesignOptions, DesignError> {
        info!("🎯 Generating design options for {} in {} style", request.room_type, request.styles());
        let concept_text = self.cached_text(request, "_concept", &build_concept_prompt(request)).await?;
        self.regenerate_options(request, concept_text).await
    }

    /// New option images for an existing concept, in a new run directory.
    pub async fn regenerate_options(&self, request: &DesignRequest, concept_text: String) -> Result<DesignOptions, DesignError> {
        let output_dir = setup_output_directory(&self.output_root)?;
        let mut writer = ImageWriter::new(&output_dir);
        let options = generate_option_images(self.images.as_ref(), self.offline_store(), &mut writer, request).await?;
        info!("✅ Generated {} design options", options.len());
        Ok(DesignOptions { output_dir, concept_text, options })
    }
}
