//! Color palette extraction from a generated room image.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::DesignError;
use crate::prompt::COLOR_ANALYSIS_PROMPT;
use crate::vertex::VertexClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prominence {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwatch {
    pub name: String,
    pub hex: String,
    pub prominence: Prominence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorPalette {
    pub primary: Vec<ColorSwatch>,
    pub secondary: Vec<ColorSwatch>,
}

impl ColorPalette {
    pub fn group(swatches: &[ColorSwatch]) -> Self {
        let (primary, secondary) = swatches.iter().cloned().partition(|s| s.prominence == Prominence::Primary);
        Self { primary, secondary }
    }
}

#[async_trait]
pub trait ColorAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<Vec<ColorSwatch>, DesignError>;
}

/// MIME type of an image file, from its signature, else its extension.
pub fn mime_type_for(path: &Path, bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => return "image/png",
        Ok(ImageFormat::Jpeg) => return "image/jpeg",
        _ => {}
    }
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

// --- Hosted analysis ---

#[derive(Debug, Deserialize)]
struct HostedColor {
    name: String,
    hex: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// JSON payload of a model answer: the first fenced ```json block, else the
/// outermost `[...]`.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let fenced = Regex::new(r"(?s)```json\s*(\{.*\}|\[.*\])\s*```").ok()?;
    if let Some(caps) = fenced.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if end > start => Some(&text[start..=end]),
        _ => None,
    }
}

pub fn parse_hosted_palette(text: &str) -> Result<Vec<ColorSwatch>, DesignError> {
    let json = extract_json_block(text)
        .ok_or_else(|| DesignError::Generation("No JSON block found in the color analysis response".into()))?;
    let colors: Vec<HostedColor> = serde_json::from_str(json)
        .map_err(|e| DesignError::Generation(format!("Invalid color palette JSON: {}", e)))?;

    let swatches = colors
        .into_iter()
        .filter_map(|c| {
            let prominence = match c.kind.trim().to_lowercase().as_str() {
                "primary" => Prominence::Primary,
                "secondary" => Prominence::Secondary,
                other => {
                    warn!("⚠️ Unknown color type '{}' for color '{}'. Skipping.", other, c.name);
                    return None;
                }
            };
            Some(ColorSwatch { name: c.name, hex: c.hex.to_uppercase(), prominence })
        })
        .collect();
    Ok(swatches)
}

pub struct HostedColorAnalyzer {
    client: Arc<VertexClient>,
}

impl HostedColorAnalyzer {
    pub fn new(client: Arc<VertexClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ColorAnalyzer for HostedColorAnalyzer {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<Vec<ColorSwatch>, DesignError> {
        let text = self.client.generate_with_image(COLOR_ANALYSIS_PROMPT, image, mime_type).await?;
        parse_hosted_palette(&text)
    }
}

// --- Local analysis ---

const LOCAL_SWATCHES: usize = 6;
const LOCAL_PRIMARY: usize = 3;

fn rgb_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

fn color_name(r: f64, g: f64, b: f64) -> String {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let brightness = ((r + g + b) / (255.0 * 3.0)).clamp(0.0, 1.0);
    if max - min < 18.0 {
        return if brightness > 0.78 {
            "Soft Neutral"
        } else if brightness < 0.22 {
            "Deep Neutral"
        } else {
            "Muted Neutral"
        }
        .to_string();
    }
    let name = if max == r && g > b {
        "Warm Orange"
    } else if max == r {
        "Crimson Red"
    } else if max == g && b > r {
        "Teal Green"
    } else if max == g {
        "Organic Green"
    } else if max == b && r > g {
        "Violet Blue"
    } else {
        "Cool Blue"
    };
    name.to_string()
}

/// Quantizes a downsampled copy of the image and reports the most
/// populated color bins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalColorAnalyzer;

impl LocalColorAnalyzer {
    pub fn extract(&self, image: &[u8]) -> Result<Vec<ColorSwatch>, DesignError> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| DesignError::Generation(format!("Could not decode image: {}", e)))?;
        let resized = decoded.resize_exact(96, 96, FilterType::Triangle).to_rgb8();

        // bin -> (population, channel sums)
        let mut bins: HashMap<(u8, u8, u8), (u64, [f64; 3])> = HashMap::new();
        for pixel in resized.pixels() {
            let key = (pixel[0] / 32, pixel[1] / 32, pixel[2] / 32);
            let entry = bins.entry(key).or_insert((0, [0.0; 3]));
            entry.0 += 1;
            for c in 0..3 {
                entry.1[c] += pixel[c] as f64;
            }
        }

        let mut ranked: Vec<_> = bins.into_iter().collect();
        ranked.sort_by(|left, right| right.1 .0.cmp(&left.1 .0).then(left.0.cmp(&right.0)));

        let swatches = ranked
            .into_iter()
            .take(LOCAL_SWATCHES)
            .enumerate()
            .map(|(i, (_, (count, sums)))| {
                let n = count as f64;
                let (r, g, b) = (sums[0] / n, sums[1] / n, sums[2] / n);
                ColorSwatch {
                    name: color_name(r, g, b),
                    hex: rgb_hex(r.round() as u8, g.round() as u8, b.round() as u8),
                    prominence: if i < LOCAL_PRIMARY { Prominence::Primary } else { Prominence::Secondary },
                }
            })
            .collect();
        Ok(swatches)
    }
}

#[async_trait]
impl ColorAnalyzer for LocalColorAnalyzer {
    async fn analyze(&self, image: &[u8], _mime_type: &str) -> Result<Vec<ColorSwatch>, DesignError> {
        self.extract(image)
    }
}

/// Tries the hosted analyzer first and falls back to local extraction.
pub struct PaletteService {
    hosted: Option<Arc<dyn ColorAnalyzer>>,
    local: LocalColorAnalyzer,
}

impl PaletteService {
    pub fn new(hosted: Option<Arc<dyn ColorAnalyzer>>) -> Self {
        Self { hosted, local: LocalColorAnalyzer }
    }

    pub async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<Vec<ColorSwatch>, DesignError> {
        if let Some(hosted) = &self.hosted {
            match hosted.analyze(image, mime_type).await {
                Ok(swatches) if !swatches.is_empty() => {
                    info!("✅ Hosted color analysis returned {} colors", swatches.len());
                    return Ok(swatches);
                }
                Ok(_) => warn!("⚠️ Hosted color analysis returned no colors, using local extraction"),
                Err(e) => warn!("⚠️ Hosted color analysis failed ({}), using local extraction", e),
            }
        }
        self.local.extract(image)
    }
}

/// Draws the palette as two rows of flush swatches with name and hex labels.
pub fn render_palette_svg(palette: &ColorPalette) -> String {
    const WIDTH: f64 = 1000.0;
    const BLOCK: f64 = 120.0;
    let esc = crate::report::escape_html;

    let mut rows = Vec::new();
    let mut y = 0.0;
    for (label, swatches) in [("Primary Colors", &palette.primary), ("Secondary Colors", &palette.secondary)] {
        if swatches.is_empty() {
            continue;
        }
        let mut row = format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"20\" font-weight=\"bold\" text-anchor=\"middle\">{}</text>",
            WIDTH / 2.0,
            y + 30.0,
            label
        );
        let w = WIDTH / swatches.len() as f64;
        for (i, s) in swatches.iter().enumerate() {
            let x = i as f64 * w;
            row.push_str(&format!(
                "<rect x=\"{x:.1}\" y=\"{}\" width=\"{w:.1}\" height=\"{BLOCK}\" fill=\"{}\"/>\
                 <text x=\"{:.1}\" y=\"{}\" font-size=\"14\" font-weight=\"bold\" text-anchor=\"middle\">{}</text>\
                 <text x=\"{:.1}\" y=\"{}\" font-size=\"12\" fill=\"#555555\" text-anchor=\"middle\">{}</text>",
                y + 45.0,
                esc(&s.hex),
                x + w / 2.0,
                y + 45.0 + BLOCK + 22.0,
                esc(&s.name),
                x + w / 2.0,
                y + 45.0 + BLOCK + 42.0,
                esc(&s.hex),
            ));
        }
        rows.push(row);
        y += 45.0 + BLOCK + 60.0;
    }

    format!(
        "<svg width=\"{WIDTH}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\" font-family=\"Arial, sans-serif\">{}</svg>",
        y.max(1.0),
        rows.join("")
    )
}
