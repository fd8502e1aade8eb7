//! Prompt templates for the hosted text, image and vision models.

use crate::models::DesignRequest;
use crate::sections::Section;

pub const KEY_ELEMENTS_PLACEHOLDER: &str = "Not specified";
pub const PHOTO_DETAILS_PLACEHOLDER: &str = "None provided";

/// Maximum number of body characters folded into a section image prompt.
pub const IMAGE_PROMPT_BODY_CHARS: usize = 300;

pub const REPORT_SECTIONS: [&str; 4] = [
    "Overall Concept and Style",
    "Color Scheme and Materials",
    "Furniture Recommendations",
    "Decorative Elements",
];

pub fn build_design_prompt(request: &DesignRequest) -> String {
    let key_elements = request.key_elements.as_deref().unwrap_or(KEY_ELEMENTS_PLACEHOLDER);
    let photo_details = request.inspirational_photo_details.as_deref().unwrap_or(PHOTO_DETAILS_PLACEHOLDER);
    let plan = REPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Create a detailed interior design concept for a {room} in {styles} style with a {palette} color scheme.\n\n\
         Key design elements to incorporate: {key_elements}\n\n\
         Inspirational photo details: {photo_details}\n\n\
         Please provide a comprehensive design plan including:\n{plan}\n\n\
         Format the response in markdown with clear section headers (##) for each major component.\n",
        room = request.room_type,
        styles = request.styles(),
        palette = request.color_palette,
    )
}

/// Short single-section concept used by the design-options flow.
pub fn build_concept_prompt(request: &DesignRequest) -> String {
    let featuring = request
        .key_elements
        .as_deref()
        .map(|k| format!(" and featuring {k}"))
        .unwrap_or_default();
    format!(
        "Create a detailed interior design concept for a {} in {} style with a {} color scheme{featuring}.\n\n\
         Please provide a concise 5-sentence design plan focusing on the Overall Concept and Style section only. \
         Each sentence should be impactful and informative.\n\n\
         Format the response in markdown with a clear section header (##) for the Overall Concept and Style section.",
        request.room_type,
        request.styles(),
        request.color_palette,
    )
}

pub fn build_section_image_prompt(request: &DesignRequest, section: &Section) -> String {
    format!(
        "High-quality interior design photograph. Room type: {}. Design style: {}. Color palette: {}. \
         The image should visually represent: '{} - {}'",
        request.room_type,
        request.styles(),
        request.color_palette,
        section.title,
        truncate_chars(section.body.trim(), IMAGE_PROMPT_BODY_CHARS),
    )
}

pub fn build_option_image_prompt(request: &DesignRequest) -> String {
    let key_elements = request
        .key_elements
        .as_deref()
        .map(|k| format!(". Key elements: {k}"))
        .unwrap_or_default();
    format!(
        "High-quality interior design photograph. Room type: {}. Design style: {}. Color palette: {}{key_elements}. \
         The image should be a realistic, professional interior design photograph.",
        request.room_type,
        request.styles(),
        request.color_palette,
    )
}

pub const COLOR_ANALYSIS_PROMPT: &str = "Analyze the provided interior design image and evaluate the dominant colors. \
Provide a list of 5-7 key colors in JSON format. \
For each color, include: \
1. 'name' (common color name, e.g., 'Warm Brown') \
2. 'hex' (hexadecimal color code, e.g., '#RRGGBB') \
3. 'type' ('primary' or 'secondary' based on prominence). \
The JSON should be an array of objects. Do NOT include any additional text or markdown outside the JSON block. \
Example JSON format: \
```json\n\
[\n\
  {\"name\": \"Warm Brown\", \"hex\": \"#876C55\", \"type\": \"primary\"},\n\
  {\"name\": \"Light Beige\", \"hex\": \"#E3DACC\", \"type\": \"secondary\"}\n\
]\n\
```";

pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
