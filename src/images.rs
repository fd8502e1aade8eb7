//! Image generation for report sections and design options, and the file
//! naming of everything written to a run directory.

use chrono::Local;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{info, warn, error};

use crate::error::DesignError;
use crate::models::DesignRequest;
use crate::prompt::{build_option_image_prompt, build_section_image_prompt};
use crate::sections::Section;
use crate::store::TestResponseStore;
use crate::vertex::{ImageGenerator, ImageRequest};

pub const SECTION_IMAGE_COUNT: u32 = 4;
pub const SECTION_ASPECT_RATIO: &str = "1:1";
pub const OPTION_IMAGE_COUNT: u32 = 3;
pub const OPTION_ASPECT_RATIO: &str = "4:3";

/// File extension for a generated image: the reported MIME type first, then
/// the image signature, then JPEG.
pub fn image_extension(mime_type: Option<&str>, bytes: &[u8]) -> &'static str {
    match mime_type.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
        Some("image/png") => return "png",
        Some("image/jpeg") | Some("image/jpg") => return "jpeg",
        _ => {}
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "png",
        _ => "jpeg",
    }
}

/// Extension a copied sample keeps.
fn sample_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "png",
        _ => "jpeg",
    }
}

pub fn sanitize_component(s: &str, max_chars: usize) -> String {
    s.chars()
        .take(max_chars)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Writes generated images into one run directory.
///
/// `seq` is never reused within a run, so two sections rendered in the same
/// second still get distinct file names.
pub struct ImageWriter {
    output_dir: PathBuf,
    seq: u32,
}

impl ImageWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), seq: 0 }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn next_seq(&mut self) -> u32 {
        self.seq += 1;
        self.seq
    }

    pub fn section_file_name(&mut self, section_title: &str, label: &str, extension: &str) -> String {
        let stamp = Local::now().format("%H%M%S");
        format!(
            "{}_{}_{}_{:02}.{}",
            sanitize_component(section_title, 30),
            sanitize_component(label, 10),
            stamp,
            self.next_seq(),
            extension
        )
    }

    pub fn write(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DesignError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, bytes)?;
        info!("Saved image as {}", file_name);
        Ok(path)
    }

    pub fn copy_in(&mut self, source: &Path, file_name: &str) -> Result<PathBuf, DesignError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        std::fs::copy(source, &path)?;
        info!("Copied sample image {} as {}", source.display(), file_name);
        Ok(path)
    }
}

/// Produces section images, either from the hosted model or, offline,
/// from the store's sample image.
pub struct SectionImager<'a> {
    generator: &'a dyn ImageGenerator,
    offline_store: Option<&'a TestResponseStore>,
    count: u32,
}

impl<'a> SectionImager<'a> {
    pub fn new(generator: &'a dyn ImageGenerator, offline_store: Option<&'a TestResponseStore>) -> Self {
        Self { generator, offline_store, count: SECTION_IMAGE_COUNT }
    }

    /// Saved image paths in generation order. Failures are logged and
    /// yield an empty list so the section falls back to text only.
    pub async fn generate(&self, writer: &mut ImageWriter, request: &DesignRequest, section: &Section) -> Vec<PathBuf> {
        info!("Generating images for section: {}", section.title);
        match self.try_generate(writer, request, section).await {
            Ok(paths) => {
                info!("Successfully generated {} images for section: {}", paths.len(), section.title);
                paths
            }
            Err(e) => {
                error!("❌ {}", e);
                Vec::new()
            }
        }
    }

    async fn try_generate(&self, writer: &mut ImageWriter, request: &DesignRequest, section: &Section) -> Result<Vec<PathBuf>, DesignError> {
        let failure = |reason: String| DesignError::ImageGeneration { section: section.title.clone(), reason };

        if let Some(store) = self.offline_store {
            let sample = store
                .sample_image()
                .ok_or_else(|| failure(format!("no sample image in {}", store.dir().display())))?;
            let name = writer.section_file_name(&section.title, "view_1", sample_extension(&sample));
            return Ok(vec![writer.copy_in(&sample, &name)?]);
        }

        let prompt = build_section_image_prompt(request, section);
        let images = self
            .generator
            .generate_images(&ImageRequest::new(prompt, self.count, SECTION_ASPECT_RATIO))
            .await
            .map_err(|e| failure(e.to_string()))?;

        let mut paths = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let extension = image_extension(image.mime_type.as_deref(), &image.bytes);
            let name = writer.section_file_name(&section.title, &format!("view_{}", i + 1), extension);
            match writer.write(&name, &image.bytes) {
                Ok(path) => paths.push(path),
                Err(e) => warn!("⚠️ Could not save image {} for '{}': {}", i + 1, section.title, e),
            }
        }
        if paths.is_empty() {
            return Err(failure("no images were saved".into()));
        }
        Ok(paths)
    }
}

pub fn option_file_name(n: usize, extension: &str) -> String {
    format!("design_option_{n}.{extension}")
}

/// Generates the design-option images. Unlike section images, failure here
/// is fatal to the request.
pub async fn generate_option_images(
    generator: &dyn ImageGenerator,
    offline_store: Option<&TestResponseStore>,
    writer: &mut ImageWriter,
    request: &DesignRequest,
) -> Result<Vec<PathBuf>, DesignError> {
    let failure = |reason: String| DesignError::ImageGeneration { section: "design options".into(), reason };

    if let Some(store) = offline_store {
        let sample = store
            .sample_image()
            .ok_or_else(|| failure(format!("no sample image in {}", store.dir().display())))?;
        return (1..=OPTION_IMAGE_COUNT as usize)
            .map(|n| writer.copy_in(&sample, &option_file_name(n, sample_extension(&sample))))
            .collect();
    }

    let prompt = build_option_image_prompt(request);
    let images = generator
        .generate_images(&ImageRequest::new(prompt, OPTION_IMAGE_COUNT, OPTION_ASPECT_RATIO))
        .await
        .map_err(|e| failure(e.to_string()))?;
    images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let extension = image_extension(image.mime_type.as_deref(), &image.bytes);
            writer.write(&option_file_name(i + 1, extension), &image.bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::SectionKind;
    use crate::vertex::{ImagePayload, VertexError};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct StubImages {
        count: usize,
        seen: Mutex<Vec<ImageRequest>>,
    }

    #[async_trait]
    impl ImageGenerator for StubImages {
        async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<ImagePayload>, VertexError> {
            self.seen.lock().push(request.clone());
            if self.count == 0 {
                return Err(VertexError::Empty("no image data in response".into()));
            }
            Ok((0..self.count).map(|i| ImagePayload { bytes: vec![i as u8], mime_type: None }).collect())
        }
    }

    fn request() -> DesignRequest {
        DesignRequest {
            room_type: "Kitchen".into(),
            design_style: vec!["Modern".into()],
            color_palette: "Neutral".into(),
            key_elements: None,
            inspirational_photo_details: None,
        }
    }

    fn section(title: &str) -> Section {
        Section { title: title.into(), body: "Warm oak.".into(), kind: SectionKind::Headed }
    }

    #[test]
    fn sanitizes_and_truncates_components() {
        assert_eq!(sanitize_component("Color Scheme & Materials", 30), "Color_Scheme___Materials");
        assert_eq!(sanitize_component("view_12345678", 10), "view_12345");
        assert_eq!(sanitize_component("Décor", 30), "D_cor");
    }

    #[test]
    fn file_names_are_unique_within_a_run() {
        let mut writer = ImageWriter::new("unused");
        let a = writer.section_file_name("Lighting", "view_1", "jpeg");
        let b = writer.section_file_name("Lighting", "view_1", "jpeg");
        assert_ne!(a, b);
        assert!(a.starts_with("Lighting_view_1_"));
        assert!(a.ends_with("_01.jpeg"));
    }

    #[tokio::test]
    async fn saves_every_returned_image() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubImages { count: 4, seen: Mutex::new(Vec::new()) };
        let imager = SectionImager::new(&stub, None);
        let mut writer = ImageWriter::new(dir.path());
        let paths = imager.generate(&mut writer, &request(), &section("Furniture Recommendations")).await;
        assert_eq!(paths.len(), 4);
        assert!(paths.iter().all(|p| p.is_file() && p.parent() == Some(dir.path())));

        let seen = stub.seen.lock();
        assert_eq!(seen[0].count, SECTION_IMAGE_COUNT);
        assert_eq!(seen[0].aspect_ratio, "1:1");
        assert!(seen[0].prompt.contains("Furniture Recommendations - Warm oak."));
    }

    #[tokio::test]
    async fn failure_yields_no_images() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubImages { count: 0, seen: Mutex::new(Vec::new()) };
        let imager = SectionImager::new(&stub, None);
        let mut writer = ImageWriter::new(dir.path());
        assert!(imager.generate(&mut writer, &request(), &section("Lighting")).await.is_empty());
    }

    #[tokio::test]
    async fn offline_mode_copies_sample_without_calling_model() {
        let store_dir = tempfile::tempdir().unwrap();
        std::fs::write(store_dir.path().join("sample.jpg"), b"jpeg").unwrap();
        let store = TestResponseStore::new(store_dir.path(), true);
        let out = tempfile::tempdir().unwrap();
        let stub = StubImages { count: 4, seen: Mutex::new(Vec::new()) };

        let imager = SectionImager::new(&stub, Some(&store));
        let mut writer = ImageWriter::new(out.path());
        let paths = imager.generate(&mut writer, &request(), &section("Lighting")).await;
        assert_eq!(paths.len(), 1);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"jpeg");
        assert!(stub.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn option_images_use_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubImages { count: 3, seen: Mutex::new(Vec::new()) };
        let mut writer = ImageWriter::new(dir.path());
        let paths = generate_option_images(&stub, None, &mut writer, &request()).await.unwrap();
        let names: Vec<_> = paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["design_option_1.jpeg", "design_option_2.jpeg", "design_option_3.jpeg"]);
        assert_eq!(stub.seen.lock()[0].aspect_ratio, "4:3");
    }

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    struct PngImages;

    #[async_trait]
    impl ImageGenerator for PngImages {
        async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<ImagePayload>, VertexError> {
            Ok((0..request.count)
                .map(|_| ImagePayload { bytes: PNG_SIGNATURE.to_vec(), mime_type: Some("image/png".into()) })
                .collect())
        }
    }

    #[test]
    fn extension_follows_mime_type_then_signature() {
        assert_eq!(image_extension(Some("image/png"), &[]), "png");
        assert_eq!(image_extension(Some("IMAGE/JPEG"), &PNG_SIGNATURE), "jpeg");
        assert_eq!(image_extension(None, &PNG_SIGNATURE), "png");
        assert_eq!(image_extension(None, &[0xFF, 0xD8, 0xFF]), "jpeg");
        assert_eq!(image_extension(Some("image/webp"), b"????"), "jpeg");
    }

    #[tokio::test]
    async fn png_payloads_are_saved_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let imager = SectionImager::new(&PngImages, None);
        let mut writer = ImageWriter::new(dir.path());
        let paths = imager.generate(&mut writer, &request(), &section("Lighting")).await;
        assert_eq!(paths.len(), 4);
        assert!(paths.iter().all(|p| p.extension().unwrap() == "png"));

        let options = generate_option_images(&PngImages, None, &mut writer, &request()).await.unwrap();
        assert_eq!(options[0].file_name().unwrap(), "design_option_1.png");
    }

    #[tokio::test]
    async fn offline_sample_keeps_png_extension() {
        let store_dir = tempfile::tempdir().unwrap();
        std::fs::write(store_dir.path().join("sample.PNG"), PNG_SIGNATURE).unwrap();
        let store = TestResponseStore::new(store_dir.path(), true);
        let out = tempfile::tempdir().unwrap();
        let imager = SectionImager::new(&PngImages, Some(&store));
        let mut writer = ImageWriter::new(out.path());
        let paths = imager.generate(&mut writer, &request(), &section("Lighting")).await;
        let name = paths[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Lighting_view_1_"));
        assert!(name.ends_with("_01.png"));
    }
}
