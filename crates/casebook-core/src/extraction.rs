//! Wire types of the PDF extraction service.
//!
//! Field names follow the service's camelCase JSON so responses deserialize
//! directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtractionOptions {
    pub extract_text: bool,
    pub extract_tables: bool,
    pub extract_images: bool,
    pub extract_formulas: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            extract_text: true,
            extract_tables: true,
            extract_images: true,
            extract_formulas: false,
        }
    }
}

impl ExtractionOptions {
    /// Multipart form fields understood by the extraction service
    pub fn form_fields(&self) -> [(&'static str, &'static str); 4] {
        let flag = |b: bool| if b { "true" } else { "false" };
        [
            ("extract_text", flag(self.extract_text)),
            ("extract_tables", flag(self.extract_tables)),
            ("extract_images", flag(self.extract_images)),
            ("extract_formulas", flag(self.extract_formulas)),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub tables: Vec<ExtractedTable>,
    #[serde(default)]
    pub images: Vec<ExtractedImage>,
    #[serde(default)]
    pub formulas: Vec<ExtractedFormula>,
    #[serde(default)]
    pub metadata: ExtractionMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub elements: Vec<LayoutElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTable {
    pub id: String,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<String>>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedImage {
    pub id: String,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub base64: String,
    #[serde(default, rename = "type")]
    pub image_type: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFormula {
    pub id: String,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub bbox: Vec<f64>,
    #[serde(default, rename = "type")]
    pub formula_type: String,
    #[serde(default)]
    pub latex: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_tables: u32,
    #[serde(default)]
    pub total_images: u32,
    #[serde(default)]
    pub total_formulas: u32,
    #[serde(default)]
    pub text_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl ExtractionResult {
    /// Build a text-only result, e.g. from OCR output
    pub fn from_text(text: String, pages: u32, method: &str) -> Self {
        let text_length = text.chars().count();
        Self {
            text,
            metadata: ExtractionMetadata {
                total_pages: pages,
                text_length,
                extraction_method: Some(method.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Count of non-whitespace characters in the extracted text
    pub fn meaningful_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }

    pub fn page_count(&self) -> u32 {
        if self.metadata.total_pages > 0 {
            self.metadata.total_pages
        } else {
            self.layout.pages.len() as u32
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Extracted Document\n\n");
        md.push_str(&format!("**Pages:** {}\n\n", self.page_count()));

        if !self.text.trim().is_empty() {
            md.push_str("## Text Content\n\n");
            md.push_str(self.text.trim());
            md.push_str("\n\n");
        }

        if !self.tables.is_empty() {
            md.push_str(&format!("## Tables ({})\n\n", self.tables.len()));
            for table in &self.tables {
                if table.markdown.is_empty() {
                    md.push_str(&table_to_markdown(table));
                } else {
                    md.push_str(&table.markdown);
                }
                md.push_str("\n\n");
            }
        }

        md
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<html><body>");
        html.push_str("<h1>Extracted Document</h1>");
        html.push_str(&format!("<p>Pages: {}</p>", self.page_count()));

        if !self.text.trim().is_empty() {
            html.push_str("<h2>Text Content</h2>");
            html.push_str(&format!("<p>{}</p>", escape_html(self.text.trim())));
        }

        if !self.tables.is_empty() {
            html.push_str(&format!("<h2>Tables ({})</h2>", self.tables.len()));
            for table in &self.tables {
                html.push_str(&table_to_html(table));
            }
        }

        html.push_str("</body></html>");
        html
    }
}

fn table_to_markdown(table: &ExtractedTable) -> String {
    let row = |cells: &[String]| {
        let cells: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(table.data.len() + 2);
    if !table.headers.is_empty() {
        lines.push(row(&table.headers));
        lines.push(format!("|{}|", vec![" --- "; table.headers.len()].join("|")));
    }
    lines.extend(table.data.iter().map(|r| row(r)));
    lines.join("\n")
}

fn table_to_html(table: &ExtractedTable) -> String {
    let mut html = String::from("<table>");
    if !table.headers.is_empty() {
        html.push_str("<tr>");
        for h in &table.headers {
            html.push_str(&format!("<th>{}</th>", escape_html(h)));
        }
        html.push_str("</tr>");
    }
    for row in &table.data {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE_RESPONSE: &str = r#"{
        "text": "Test Legal Document\nCase: Smith v. Jones\n",
        "layout": {"pages": [{"pageNumber": 1, "width": 612.0, "height": 792.0,
            "elements": [{"type": "text", "bbox": [100, 40, 300, 52], "content": "Test Legal Document", "confidence": 0.9}]}]},
        "tables": [{"id": "table_0_0", "pageNumber": 1, "bbox": [0, 0, 10, 10], "html": "", "markdown": "",
            "data": [["Smith", "Claimant"]], "headers": ["Name", "Role"], "confidence": 0.8, "rows": 1, "columns": 2}],
        "images": [],
        "formulas": [],
        "metadata": {"totalPages": 1, "totalTables": 1, "totalImages": 0, "totalFormulas": 0,
            "textLength": 41, "extractionMethod": "PyMuPDF-basic"}
    }"#;

    #[test]
    fn test_parses_service_response() {
        let result: ExtractionResult = serde_json::from_str(SERVICE_RESPONSE).unwrap();
        assert_eq!(result.page_count(), 1);
        assert_eq!(result.layout.pages[0].elements[0].element_type, "text");
        assert_eq!(result.tables[0].headers, vec!["Name", "Role"]);
        assert_eq!(result.metadata.extraction_method.as_deref(), Some("PyMuPDF-basic"));
    }

    #[test]
    fn test_markdown_renders_tables_without_markdown() {
        let result: ExtractionResult = serde_json::from_str(SERVICE_RESPONSE).unwrap();
        let md = result.to_markdown();
        assert!(md.contains("**Pages:** 1"));
        assert!(md.contains("| Name | Role |"));
        assert!(md.contains("| Smith | Claimant |"));
    }

    #[test]
    fn test_html_is_escaped() {
        let result = ExtractionResult::from_text("R <v> Smith & Co".to_string(), 1, "ocr");
        let html = result.to_html();
        assert!(html.contains("R &lt;v&gt; Smith &amp; Co"));
    }

    #[test]
    fn test_meaningful_chars_ignores_whitespace() {
        let result = ExtractionResult::from_text(" a \n b\t".to_string(), 1, "ocr");
        assert_eq!(result.meaningful_chars(), 2);
    }
}
