use egui::Color32;
use scraper::{ElementRef, Html, Node};

use crate::event::MutationKind;
use crate::pen::PenConfiguration;

/// Writing direction of the root or of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
    Auto,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => Some(Self::Ltr),
            "rtl" => Some(Self::Rtl),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
            Self::Auto => "auto",
        }
    }
}

/// Attributes of the editable root element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootAttributes {
    pub dir: Direction,
    /// Per-paragraph direction detection from the first strong character
    pub auto_bidi: bool,
}

impl Default for RootAttributes {
    fn default() -> Self {
        Self {
            dir: Direction::Auto,
            auto_bidi: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    Paragraph,
    /// Level 1 to 6
    Heading(u8),
    ListItem { ordered: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<Color32>,
}

/// Styled span of text. Line breaks are stored as `'\n'`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

impl Run {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub kind: BlockKind,
    pub runs: Vec<Run>,
    pub dir: Option<Direction>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(|r| r.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Split runs so that one boundary falls exactly at `offset` chars.
    /// Returns the index of the first run after the boundary.
    fn split_runs_at(&mut self, offset: usize) -> usize {
        let mut remaining = offset;
        for i in 0..self.runs.len() {
            if remaining == 0 {
                return i;
            }
            let len = self.runs[i].text.chars().count();
            if remaining < len {
                let at = byte_offset(&self.runs[i].text, remaining);
                let tail = self.runs[i].text.split_off(at);
                let style = self.runs[i].style;
                self.runs.insert(i + 1, Run::new(tail, style));
                return i + 1;
            }
            remaining -= len;
        }
        self.runs.len()
    }

    /// Drop empty runs and merge neighbours with equal style
    fn normalize(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.text.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

/// Caret position: block index and char offset inside the block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Caret {
    pub block: usize,
    pub offset: usize,
}

/// Word and character counts of the plain-text projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextCounts {
    pub words: usize,
    pub chars: usize,
}

impl TextCounts {
    pub fn of(plain: &str) -> Self {
        Self {
            words: plain.split_whitespace().count(),
            chars: plain.chars().count(),
        }
    }
}

/// Rich text content: root attributes plus a flat list of blocks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredTextDocument {
    root: RootAttributes,
    blocks: Vec<Block>,
}

impl StructuredTextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an HTML fragment. Unknown tags are flattened into their text.
    pub fn from_html(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        let mut builder = Builder::default();
        builder.walk(fragment.root_element(), RunStyle::default());
        builder.finish_block();
        Self {
            root: RootAttributes::default(),
            blocks: builder.blocks,
        }
    }

    pub fn root(&self) -> &RootAttributes {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RootAttributes {
        &mut self.root
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Block::is_empty)
    }

    /// Blocks joined by newlines, styling dropped
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn counts(&self) -> TextCounts {
        TextCounts::of(&self.plain_text())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let mut open_list: Option<bool> = None;

        for block in &self.blocks {
            let list = match block.kind {
                BlockKind::ListItem { ordered } => Some(ordered),
                _ => None,
            };
            if open_list != list {
                if let Some(ordered) = open_list {
                    out.push_str(if ordered { "</ol>" } else { "</ul>" });
                }
                if let Some(ordered) = list {
                    out.push_str(if ordered { "<ol>" } else { "<ul>" });
                }
                open_list = list;
            }

            let tag = match block.kind {
                BlockKind::Paragraph => "p".to_string(),
                BlockKind::Heading(level) => format!("h{}", level.clamp(1, 6)),
                BlockKind::ListItem { .. } => "li".to_string(),
            };
            out.push('<');
            out.push_str(&tag);
            if let Some(dir) = block.dir {
                out.push_str(&format!(" dir=\"{}\"", dir.as_str()));
            }
            out.push('>');
            if block.is_empty() {
                out.push_str("<br>");
            } else {
                for run in &block.runs {
                    write_run(&mut out, run);
                }
            }
            out.push_str(&format!("</{}>", tag));
        }

        if let Some(ordered) = open_list {
            out.push_str(if ordered { "</ol>" } else { "</ul>" });
        }
        out
    }

    /// Resolved direction of a block, with auto detection applied
    pub fn effective_direction(&self, index: usize) -> Direction {
        let Some(block) = self.blocks.get(index) else {
            return Direction::Ltr;
        };
        let declared = block.dir.unwrap_or(self.root.dir);
        if self.root.auto_bidi || declared == Direction::Auto {
            return detect_direction(&block.text()).unwrap_or(Direction::Ltr);
        }
        declared
    }

    pub fn clamp_caret(&self, caret: Caret) -> Caret {
        let Some(last) = self.blocks.len().checked_sub(1) else {
            return Caret::default();
        };
        let block = caret.block.min(last);
        Caret {
            block,
            offset: caret.offset.min(self.blocks[block].char_len()),
        }
    }

    pub fn end_caret(&self) -> Caret {
        self.clamp_caret(Caret {
            block: usize::MAX,
            offset: usize::MAX,
        })
    }

    /// Insert text at `caret`; newlines start new blocks
    pub fn insert_text(&mut self, caret: Caret, text: &str, style: RunStyle) -> (Caret, MutationKind) {
        let mut kind = MutationKind::CharacterData;
        if self.blocks.is_empty() {
            self.blocks.push(Block::default());
            kind = MutationKind::ChildList;
        }
        let mut caret = self.clamp_caret(caret);

        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                caret = self.split_block(caret);
                kind = MutationKind::ChildList;
            }
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let block = &mut self.blocks[caret.block];
            let runs_before = block.runs.len();
            let at = block.split_runs_at(caret.offset);
            if at > 0 && block.runs[at - 1].style == style {
                block.runs[at - 1].text.push_str(line);
            } else {
                block.runs.insert(at, Run::new(line, style));
            }
            block.normalize();
            if block.runs.len() != runs_before {
                kind = MutationKind::ChildList;
            }
            caret.offset += line.chars().count();
        }
        (caret, kind)
    }

    /// Split the block under `caret` in two. Headings continue as paragraphs.
    pub fn split_block(&mut self, caret: Caret) -> Caret {
        if self.blocks.is_empty() {
            self.blocks.push(Block::default());
        }
        let caret = self.clamp_caret(caret);
        let block = &mut self.blocks[caret.block];
        let at = block.split_runs_at(caret.offset);
        let tail = Block {
            kind: match block.kind {
                BlockKind::Heading(_) => BlockKind::Paragraph,
                other => other,
            },
            runs: block.runs.split_off(at),
            dir: block.dir,
        };
        block.normalize();
        self.blocks.insert(caret.block + 1, tail);
        Caret {
            block: caret.block + 1,
            offset: 0,
        }
    }

    /// Remove the char before `caret`, merging into the previous block at offset 0.
    /// Returns `None` when there is nothing to delete.
    pub fn delete_backward(&mut self, caret: Caret) -> Option<(Caret, MutationKind)> {
        if self.blocks.is_empty() {
            return None;
        }
        let caret = self.clamp_caret(caret);

        if caret.offset > 0 {
            let block = &mut self.blocks[caret.block];
            let runs_before = block.runs.len();
            let start = block.split_runs_at(caret.offset - 1);
            let end = block.split_runs_at(caret.offset);
            block.runs.drain(start..end);
            block.normalize();
            let kind = if block.runs.len() == runs_before {
                MutationKind::CharacterData
            } else {
                MutationKind::ChildList
            };
            return Some((
                Caret {
                    block: caret.block,
                    offset: caret.offset - 1,
                },
                kind,
            ));
        }

        if caret.block == 0 {
            return None;
        }
        let removed = self.blocks.remove(caret.block);
        let previous = &mut self.blocks[caret.block - 1];
        let offset = previous.char_len();
        previous.runs.extend(removed.runs);
        previous.normalize();
        Some((
            Caret {
                block: caret.block - 1,
                offset,
            },
            MutationKind::ChildList,
        ))
    }

    /// Insert the blocks of another document at `caret` (paste)
    pub fn insert_fragment(&mut self, caret: Caret, fragment: StructuredTextDocument) -> Caret {
        let mut incoming = fragment.blocks;
        if incoming.is_empty() {
            return self.clamp_caret(caret);
        }
        if self.blocks.is_empty() {
            self.blocks = incoming;
            return self.end_caret();
        }
        let caret = self.clamp_caret(caret);

        if incoming.len() == 1 {
            let pasted = incoming.remove(0);
            let added = pasted.char_len();
            let target = &mut self.blocks[caret.block];
            if pasted.dir.is_some() {
                target.dir = pasted.dir;
            }
            let at = target.split_runs_at(caret.offset);
            target.runs.splice(at..at, pasted.runs);
            target.normalize();
            return Caret {
                block: caret.block,
                offset: caret.offset + added,
            };
        }

        let tail = self.split_block(caret);
        let count = incoming.len();
        let last_len = incoming.last().map(Block::char_len).unwrap_or(0);
        self.blocks.splice(tail.block..tail.block, incoming);

        let mut end = Caret {
            block: caret.block + count,
            offset: last_len,
        };
        if self.blocks[caret.block].is_empty() {
            self.blocks.remove(caret.block);
            end.block -= 1;
        }
        end
    }
}

/// Direction of the first strong character, if any
pub fn detect_direction(text: &str) -> Option<Direction> {
    text.chars().find_map(|c| {
        let code = c as u32;
        let rtl = (0x0590..=0x08FF).contains(&code)
            || (0xFB1D..=0xFDFF).contains(&code)
            || (0xFE70..=0xFEFF).contains(&code);
        if rtl {
            Some(Direction::Rtl)
        } else if c.is_alphabetic() {
            Some(Direction::Ltr)
        } else {
            None
        }
    })
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn write_run(out: &mut String, run: &Run) {
    let style = run.style;
    let mut closers: Vec<&str> = Vec::new();
    if let Some(color) = style.color {
        out.push_str(&format!(
            "<span style=\"color: #{:02x}{:02x}{:02x}\">",
            color.r(),
            color.g(),
            color.b()
        ));
        closers.push("</span>");
    }
    for (on, open, close) in [
        (style.bold, "<strong>", "</strong>"),
        (style.italic, "<em>", "</em>"),
        (style.underline, "<u>", "</u>"),
    ] {
        if on {
            out.push_str(open);
            closers.push(close);
        }
    }
    out.push_str(&escape_html(&run.text).replace('\n', "<br>"));
    for close in closers.iter().rev() {
        out.push_str(close);
    }
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    current: Option<Block>,
    /// Whether `current` came from an explicit block element
    explicit: bool,
    lists: Vec<bool>,
}

impl Builder {
    fn walk(&mut self, element: ElementRef<'_>, style: RunStyle) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text, style),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.visit(child, style);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef<'_>, style: RunStyle) {
        let name = element.value().name().to_ascii_lowercase();
        let dir = element.value().attr("dir").and_then(Direction::parse);
        let style = with_inline_color(element, style);

        match name.as_str() {
            "p" | "div" | "blockquote" | "pre" => {
                self.block(element, BlockKind::Paragraph, dir, style)
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(1);
                self.block(element, BlockKind::Heading(level), dir, style)
            }
            "li" => {
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.block(element, BlockKind::ListItem { ordered }, dir, style)
            }
            "ul" | "ol" => {
                self.finish_block();
                self.lists.push(name == "ol");
                self.walk(element, style);
                self.lists.pop();
            }
            "br" => self.push_raw("\n", style),
            "b" | "strong" => self.walk(element, RunStyle { bold: true, ..style }),
            "i" | "em" => self.walk(element, RunStyle { italic: true, ..style }),
            "u" | "ins" => self.walk(element, RunStyle { underline: true, ..style }),
            "script" | "style" | "head" | "title" => {}
            _ => self.walk(element, style),
        }
    }

    fn block(&mut self, element: ElementRef<'_>, kind: BlockKind, dir: Option<Direction>, style: RunStyle) {
        self.finish_block();
        self.current = Some(Block {
            kind,
            runs: Vec::new(),
            dir,
        });
        self.explicit = true;
        self.walk(element, style);
        self.finish_block();
    }

    fn push_text(&mut self, text: &str, style: RunStyle) {
        let mut collapsed = String::with_capacity(text.len());
        let mut in_space = false;
        for c in text.chars() {
            if c.is_whitespace() {
                if !in_space {
                    collapsed.push(' ');
                }
                in_space = true;
            } else {
                collapsed.push(c);
                in_space = false;
            }
        }

        let at_line_start = match &self.current {
            None => true,
            Some(block) => block
                .runs
                .last()
                .is_none_or(|r| r.text.ends_with(' ') || r.text.ends_with('\n')),
        };
        let collapsed = if at_line_start {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if collapsed.is_empty() {
            return;
        }
        self.push_raw(collapsed, style);
    }

    fn push_raw(&mut self, text: &str, style: RunStyle) {
        let block = self.current.get_or_insert_with(|| Block::new(BlockKind::Paragraph));
        match block.runs.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => block.runs.push(Run::new(text, style)),
        }
    }

    fn finish_block(&mut self) {
        let explicit = std::mem::take(&mut self.explicit);
        let Some(mut block) = self.current.take() else {
            return;
        };
        if let Some(last) = block.runs.last_mut() {
            let trimmed = last.text.trim_end_matches(' ').len();
            last.text.truncate(trimmed);
            // A lone trailing <br> does not render a line of its own
            if last.text.ends_with('\n') {
                last.text.pop();
            }
        }
        block.normalize();
        if explicit || !block.is_empty() {
            self.blocks.push(block);
        }
    }
}

fn with_inline_color(element: ElementRef<'_>, style: RunStyle) -> RunStyle {
    let from_style = element.value().attr("style").and_then(|css| {
        css.split(';').find_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            (key.trim().eq_ignore_ascii_case("color"))
                .then(|| PenConfiguration::parse_color(value).ok())
                .flatten()
        })
    });
    let from_attr = element
        .value()
        .attr("color")
        .and_then(|c| PenConfiguration::parse_color(c).ok());

    match from_style.or(from_attr) {
        Some(color) => RunStyle {
            color: Some(color),
            ..style
        },
        None => style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline_styles() {
        let doc = StructuredTextDocument::from_html("<p><b>Rx</b>: 500mg</p>");
        assert_eq!(doc.blocks().len(), 1);
        let runs = &doc.blocks()[0].runs;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Rx");
        assert!(runs[0].style.bold);
        assert_eq!(runs[1].text, ": 500mg");
        assert!(!runs[1].style.bold);
        assert_eq!(doc.plain_text(), "Rx: 500mg");
    }

    #[test]
    fn test_parse_collapses_whitespace_and_lists() {
        let doc = StructuredTextDocument::from_html(
            "<h2>  Plan </h2>\n  <ol>\n <li>Rest</li>\n <li>Fluids\n daily</li></ol>",
        );
        let kinds: Vec<BlockKind> = doc.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(2),
                BlockKind::ListItem { ordered: true },
                BlockKind::ListItem { ordered: true },
            ]
        );
        assert_eq!(doc.plain_text(), "Plan\nRest\nFluids daily");
    }

    #[test]
    fn test_html_output_groups_list_items() {
        let doc = StructuredTextDocument::from_html(
            "<ul><li>a</li><li><em>b</em></li></ul><p style=\"color: #ff0000\">c</p>",
        );
        assert_eq!(
            doc.to_html(),
            "<ul><li>a</li><li><em>b</em></li></ul><p><span style=\"color: #ff0000\">c</span></p>"
        );
    }

    #[test]
    fn test_empty_paragraph_survives_as_br() {
        let doc = StructuredTextDocument::from_html("<p><br></p>");
        assert_eq!(doc.blocks().len(), 1);
        assert!(doc.is_empty());
        assert_eq!(doc.to_html(), "<p><br></p>");
    }

    #[test]
    fn test_insert_text_merges_with_matching_style() {
        let mut doc = StructuredTextDocument::from_html("<p>Hello</p>");
        let end = doc.end_caret();
        let (caret, kind) = doc.insert_text(end, " there", RunStyle::default());
        assert_eq!(kind, MutationKind::CharacterData);
        assert_eq!(caret.offset, 11);
        assert_eq!(doc.plain_text(), "Hello there");

        let bold = RunStyle {
            bold: true,
            ..RunStyle::default()
        };
        let (_, kind) = doc.insert_text(Caret { block: 0, offset: 5 }, "!", bold);
        assert_eq!(kind, MutationKind::ChildList);
        assert_eq!(doc.to_html(), "<p>Hello<strong>!</strong> there</p>");
    }

    #[test]
    fn test_split_and_merge_blocks() {
        let mut doc = StructuredTextDocument::from_html("<h1>TitleBody</h1>");
        let caret = doc.split_block(Caret { block: 0, offset: 5 });
        assert_eq!(caret, Caret { block: 1, offset: 0 });
        assert_eq!(doc.blocks()[1].kind, BlockKind::Paragraph);
        assert_eq!(doc.plain_text(), "Title\nBody");

        let (caret, kind) = doc.delete_backward(caret).unwrap();
        assert_eq!(kind, MutationKind::ChildList);
        assert_eq!(caret, Caret { block: 0, offset: 5 });
        assert_eq!(doc.plain_text(), "TitleBody");
    }

    #[test]
    fn test_delete_backward_at_start_is_none() {
        let mut doc = StructuredTextDocument::from_html("<p>x</p>");
        assert!(doc.delete_backward(Caret::default()).is_none());
        let (caret, _) = doc.delete_backward(doc.end_caret()).unwrap();
        assert_eq!(caret.offset, 0);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_insert_multi_block_fragment() {
        let mut doc = StructuredTextDocument::from_html("<p>ab</p>");
        let fragment = StructuredTextDocument::from_html("<p>1</p><p>2</p>");
        let caret = doc.insert_fragment(Caret { block: 0, offset: 1 }, fragment);
        assert_eq!(doc.plain_text(), "a\n1\n2\nb");
        assert_eq!(caret, Caret { block: 2, offset: 1 });
    }

    #[test]
    fn test_detect_direction() {
        assert_eq!(detect_direction("123 abc"), Some(Direction::Ltr));
        assert_eq!(detect_direction("1 \u{05e9}\u{05dc}\u{05d5}\u{05dd}"), Some(Direction::Rtl));
        assert_eq!(detect_direction("123"), None);
    }
}
