//! Interleaves generated images with section text and renders the final
//! HTML report.

use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::DesignError;
use crate::sections::{Section, SectionKind};

pub const REPORT_FILE_NAME: &str = "generated.html";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Markdown { text: String },
    Image { file_name: String, caption: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl ReportSection {
    pub fn image_count(&self) -> usize {
        self.blocks.iter().filter(|b| matches!(b, Block::Image { .. })).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPosition {
    /// Directly under the heading.
    Top,
    /// After the section body.
    Bottom,
}

/// Where the n-th generated image of a section goes. A slot with a keyword
/// is only filled when the lowercased section title contains it.
#[derive(Debug, Clone, Copy)]
pub struct ImageSlot {
    pub index: usize,
    pub position: SlotPosition,
    pub keyword: Option<&'static str>,
}

pub const IMAGE_SLOTS: &[ImageSlot] = &[
    ImageSlot { index: 0, position: SlotPosition::Top, keyword: None },
    ImageSlot { index: 1, position: SlotPosition::Bottom, keyword: None },
    ImageSlot { index: 2, position: SlotPosition::Bottom, keyword: Some("furniture") },
    ImageSlot { index: 3, position: SlotPosition::Bottom, keyword: Some("lighting") },
];

fn caption(title: &str, index: usize) -> String {
    if index == 0 {
        title.to_string()
    } else {
        format!("{} - View {}", title, index + 1)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Builds the display blocks of one section. Images are referenced by base
/// name since they sit next to the HTML file.
pub fn assemble_section(section: &Section, image_paths: &[PathBuf]) -> ReportSection {
    assemble_with_slots(section, image_paths, IMAGE_SLOTS)
}

pub fn assemble_with_slots(section: &Section, image_paths: &[PathBuf], slots: &[ImageSlot]) -> ReportSection {
    let lowered = section.title.to_lowercase();
    let mut top = Vec::new();
    let mut bottom = Vec::new();
    for slot in slots {
        let Some(path) = image_paths.get(slot.index) else { continue };
        if let Some(keyword) = slot.keyword {
            if !lowered.contains(keyword) {
                continue;
            }
        }
        let block = Block::Image { file_name: file_name(path), caption: caption(&section.title, slot.index) };
        match slot.position {
            SlotPosition::Top => top.push(block),
            SlotPosition::Bottom => bottom.push(block),
        }
    }

    let mut blocks = Vec::new();
    if section.kind == SectionKind::Headed {
        blocks.push(Block::Heading { text: section.title.clone() });
    }
    blocks.extend(top);
    if !section.body.is_empty() {
        blocks.push(Block::Markdown { text: section.body.clone() });
    }
    blocks.extend(bottom);

    let report = ReportSection { title: section.title.clone(), blocks };
    info!("Assembled section '{}' with {} image(s)", report.title, report.image_count());
    report
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, s);
    out
}

fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(text, options));
    out
}

pub fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { text } => format!("<h2>{}</h2>\n", escape_html(text)),
        Block::Markdown { text } => markdown_to_html(text),
        Block::Image { file_name, caption } => format!(
            "<div class=\"section-image\">\n    <img src=\"{}\" alt=\"{}\">\n    <div class=\"image-caption\">{}</div>\n</div>\n",
            escape_html(file_name),
            escape_html(caption),
            escape_html(caption)
        ),
    }
}

pub fn render_section(section: &ReportSection) -> String {
    let inner: String = section.blocks.iter().map(render_block).collect();
    format!("<div class=\"section\">\n{}</div>", inner)
}

const STYLESHEET: &str = r#"
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            max-width: 1200px;
            margin: 0 auto;
            padding: 20px;
            color: #333;
        }
        h1, h2 {
            color: #2c3e50;
            margin-top: 1.5em;
            margin-bottom: 0.5em;
        }
        .section {
            margin-bottom: 40px;
            padding: 20px;
            background: #fff;
            border-radius: 8px;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
        }
        .section-image {
            margin-bottom: 20px;
            text-align: center;
        }
        .section-image img {
            max-width: 100%;
            height: auto;
            max-height: 500px;
            object-fit: cover;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .image-caption {
            margin-top: 8px;
            font-size: 1.1em;
            color: #666;
            font-style: italic;
        }
        p {
            margin-bottom: 1em;
        }
        @media (max-width: 768px) {
            .section-image img {
                max-height: 300px;
            }
        }
"#;

pub fn render_document(sections: &[ReportSection]) -> String {
    let body = sections.iter().map(render_section).collect::<Vec<_>>().join("\n\n");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>Generated Interior Design Content</title>\n    <style>{}    </style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        STYLESHEET, body
    )
}

pub fn write_report(sections: &[ReportSection], output_dir: &Path) -> Result<PathBuf, DesignError> {
    let html_path = output_dir.join(REPORT_FILE_NAME);
    std::fs::write(&html_path, render_document(sections))?;
    info!("Saved HTML content to: {}", html_path.display());
    Ok(html_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headed(title: &str) -> Section {
        Section { title: title.into(), body: "Some **bold** text.".into(), kind: SectionKind::Headed }
    }

    fn paths(n: usize) -> Vec<PathBuf> {
        (1..=n).map(|i| PathBuf::from(format!("/runs/generated_content_x/img_{i}.jpeg"))).collect()
    }

    #[test]
    fn furniture_section_takes_three_images() {
        let report = assemble_section(&headed("Furniture Recommendations"), &paths(3));
        assert_eq!(report.image_count(), 3);
    }

    #[test]
    fn unrelated_section_takes_only_two() {
        let report = assemble_section(&headed("Color Scheme"), &paths(4));
        assert_eq!(report.image_count(), 2);
    }

    #[test]
    fn lighting_slot_needs_four_images() {
        assert_eq!(assemble_section(&headed("Lighting Plan"), &paths(4)).image_count(), 3);
        assert_eq!(assemble_section(&headed("Lighting Plan"), &paths(3)).image_count(), 2);
        assert_eq!(assemble_section(&headed("Furniture and Lighting"), &paths(4)).image_count(), 4);
    }

    #[test]
    fn block_order_and_captions() {
        let report = assemble_section(&headed("Furniture Recommendations"), &paths(3));
        assert_eq!(
            report.blocks,
            vec![
                Block::Heading { text: "Furniture Recommendations".into() },
                Block::Image { file_name: "img_1.jpeg".into(), caption: "Furniture Recommendations".into() },
                Block::Markdown { text: "Some **bold** text.".into() },
                Block::Image { file_name: "img_2.jpeg".into(), caption: "Furniture Recommendations - View 2".into() },
                Block::Image { file_name: "img_3.jpeg".into(), caption: "Furniture Recommendations - View 3".into() },
            ]
        );
    }

    #[test]
    fn no_images_means_text_only() {
        let report = assemble_section(&headed("Decorative Elements"), &[]);
        assert_eq!(report.image_count(), 0);
        assert_eq!(report.blocks.len(), 2);
    }

    #[test]
    fn preamble_has_no_heading_block() {
        let section = Section { title: "Intro".into(), body: "Intro".into(), kind: SectionKind::Preamble };
        let report = assemble_section(&section, &[]);
        assert_eq!(report.blocks, vec![Block::Markdown { text: "Intro".into() }]);
    }

    #[test]
    fn custom_slot_table() {
        let slots = [ImageSlot { index: 0, position: SlotPosition::Bottom, keyword: Some("rug") }];
        assert_eq!(assemble_with_slots(&headed("Rugs and Textiles"), &paths(1), &slots).image_count(), 1);
        assert_eq!(assemble_with_slots(&headed("Color Scheme"), &paths(1), &slots).image_count(), 0);
    }

    #[test]
    fn renders_blocks_to_html() {
        let report = assemble_section(&headed("Kid's <Room>"), &paths(1));
        let html = render_section(&report);
        assert!(html.contains("<h2>Kid&#39;s &lt;Room&gt;</h2>"));
        assert!(html.contains("<img src=\"img_1.jpeg\" alt=\"Kid&#39;s &lt;Room&gt;\">"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn writes_generated_html() {
        let dir = tempfile::tempdir().unwrap();
        let sections = vec![assemble_section(&headed("Overall Concept and Style"), &[])];
        let path = write_report(&sections, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("generated.html"));
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(".image-caption"));
        assert!(html.contains("<h2>Overall Concept and Style</h2>"));
    }
}
