use futures::future::{BoxFuture, FutureExt};
use log::warn;
use textwrap::{Options, WrapAlgorithm};

use super::canvas::{SvgCanvas, escape_xml, render_png};
use super::fonts::{MONO_ADVANCE_EM, MONO_FAMILY, bundled_fonts};
use super::{OverflowPolicy, RasterArtifact, RasterContext, RasterOptions, RasterStrategy};
use crate::capture::PrescriptionPayload;
use crate::error::RasterError;
use crate::text::StructuredTextDocument;
use crate::util::time;

const TITLE: &str = "Prescription";
const TITLE_SIZE: f32 = 24.0;
const RULE_GAP: f32 = 8.0;

/// Fixed-page plain text layout with a patient header
#[derive(Debug, Clone, PartialEq)]
struct FallbackPage {
    width: f32,
    height: f32,
    margin: f32,
    font_size: f32,
    line_height: f32,
    header: Vec<String>,
    rule_y: f32,
    body_top: f32,
    body: Vec<String>,
    truncated: usize,
}

impl FallbackPage {
    fn of(plain: &str, subject: &str, date: &str, options: &RasterOptions) -> Self {
        let width = options.fallback_width.max(1) as f32;
        let margin = options.fallback_margin as f32;
        let font_size = options.fallback_font_size.max(1.0);
        let line_height = options.fallback_line_height.max(font_size);

        let title_height = TITLE_SIZE * 1.4;
        let header = vec![format!("Patient: {}", subject.trim()), format!("Date: {}", date)];
        let rule_y = margin + title_height + header.len() as f32 * line_height + RULE_GAP;
        let body_top = rule_y + RULE_GAP * 2.0;

        let content_width = (width - margin * 2.0).max(font_size);
        let columns = ((content_width / (font_size * MONO_ADVANCE_EM)).floor() as usize).max(1);
        let wrap = Options::new(columns).wrap_algorithm(WrapAlgorithm::FirstFit);
        let mut body: Vec<String> = plain
            .lines()
            .flat_map(|paragraph| {
                if paragraph.trim().is_empty() {
                    vec![String::new()]
                } else {
                    textwrap::wrap(paragraph, &wrap)
                        .into_iter()
                        .map(|line| line.into_owned())
                        .collect()
                }
            })
            .collect();

        let mut height = options.fallback_height.max(1) as f32;
        let mut truncated = 0;
        let needed = body_top + body.len() as f32 * line_height + margin;
        if needed > height {
            match options.overflow {
                OverflowPolicy::Extend => height = needed.ceil(),
                OverflowPolicy::Truncate => {
                    let fits = ((height - margin - body_top) / line_height).floor().max(0.0) as usize;
                    truncated = body.len().saturating_sub(fits);
                    body.truncate(fits);
                }
            }
        }

        Self {
            width,
            height,
            margin,
            font_size,
            line_height,
            header,
            rule_y,
            body_top,
            body,
            truncated,
        }
    }

    fn text_line(&self, baseline: f32, size: f32, bold: bool, text: &str) -> String {
        format!(
            "<text x=\"{}\" y=\"{}\" font-family=\"{}, monospace\" font-size=\"{}\"{} fill=\"#000000\" xml:space=\"preserve\">{}</text>",
            self.margin,
            baseline,
            MONO_FAMILY,
            size,
            if bold { " font-weight=\"bold\"" } else { "" },
            escape_xml(text)
        )
    }

    fn to_canvas(&self) -> SvgCanvas {
        let mut canvas = SvgCanvas::new(self.width, self.height);
        canvas.push(&self.text_line(self.margin + TITLE_SIZE, TITLE_SIZE, true, TITLE));

        let mut y = self.margin + TITLE_SIZE * 1.4;
        for line in &self.header {
            canvas.push(&self.text_line(y + self.font_size, self.font_size, false, line));
            y += self.line_height;
        }
        canvas.push(&format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"1\" fill=\"#000000\"/>",
            self.margin,
            self.rule_y,
            self.width - self.margin * 2.0
        ));

        let mut y = self.body_top;
        for line in &self.body {
            if !line.is_empty() {
                canvas.push(&self.text_line(y + self.font_size, self.font_size, false, line));
            }
            y += self.line_height;
        }
        canvas
    }
}

/// Plain-text rendition used when the styled capture is unavailable
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualLayout;

impl ManualLayout {
    fn render(&self, plain: &str, ctx: &RasterContext<'_>) -> Result<RasterArtifact, RasterError> {
        let date = time::header_date(&time::now());
        let page = FallbackPage::of(plain, ctx.subject, &date, ctx.options);
        if page.truncated > 0 {
            warn!(
                "Prescription text does not fit the page, {} lines truncated",
                page.truncated
            );
        }
        let (png, width, height) = render_png(&page.to_canvas().to_svg(), bundled_fonts(), 1.0)?;
        Ok(RasterArtifact::from_png(png, width, height, ctx).with_truncated_lines(page.truncated))
    }
}

impl RasterStrategy for ManualLayout {
    fn name(&self) -> &'static str {
        "manual-layout"
    }

    fn rasterize<'a>(
        &'a self,
        payload: &'a PrescriptionPayload,
        ctx: &'a RasterContext<'a>,
    ) -> BoxFuture<'a, Result<RasterArtifact, RasterError>> {
        async move {
            match payload {
                PrescriptionPayload::Text { plain, .. } if !plain.trim().is_empty() => {
                    self.render(plain, ctx)
                }
                PrescriptionPayload::Text { html, .. } => {
                    let plain = StructuredTextDocument::from_html(html).plain_text();
                    self.render(&plain, ctx)
                }
                other => Err(RasterError::UnsupportedPayload {
                    strategy: self.name(),
                    kind: other.kind(),
                }),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many_lines(n: usize) -> String {
        (0..n).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_wraps_to_monospace_columns() {
        let options = RasterOptions::default();
        let page = FallbackPage::of(&"word ".repeat(60), "Ann", "2024-01-01", &options);
        let columns = (720.0 / (16.0 * MONO_ADVANCE_EM)).floor() as usize;
        assert!(page.body.len() > 1);
        assert!(page.body.iter().all(|l| l.chars().count() <= columns));
    }

    #[test]
    fn test_truncate_keeps_page_height() {
        let options = RasterOptions {
            overflow: OverflowPolicy::Truncate,
            ..RasterOptions::default()
        };
        let page = FallbackPage::of(&many_lines(100), "Ann", "2024-01-01", &options);
        assert_eq!(page.height, 1000.0);
        assert!(page.truncated > 0);
        assert_eq!(page.body.len() + page.truncated, 100);
        let last_bottom = page.body_top + page.body.len() as f32 * page.line_height;
        assert!(last_bottom <= page.height - page.margin);
    }

    #[test]
    fn test_extend_grows_page() {
        let options = RasterOptions::default();
        let page = FallbackPage::of(&many_lines(100), "Ann", "2024-01-01", &options);
        assert!(page.height > 1000.0);
        assert_eq!(page.truncated, 0);
        assert_eq!(page.body.len(), 100);
    }

    #[test]
    fn test_header_lines() {
        let page = FallbackPage::of("x", " Ann Lee ", "2024-01-01", &RasterOptions::default());
        assert_eq!(page.header, vec!["Patient: Ann Lee", "Date: 2024-01-01"]);
        let svg = page.to_canvas().to_svg();
        assert!(svg.contains(">Prescription</text>"));
        assert!(svg.contains("<rect"));
    }
}
