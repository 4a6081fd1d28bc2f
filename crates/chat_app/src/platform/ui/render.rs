//! Plain-text rendering of the view model for the console front-end.

use chat_core::{
    split_incomplete_tail, AppViewModel, Incomplete, IncompleteKind, MarkerView, MessageRowView,
    Provenance, RenderBody, Role, RowBody, SidebarView, SourceTab, THINKING_TEXT,
};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

pub const WELCOME_TEXT: &str = "有什么可以帮您？输入问题后回车发送，/help 查看命令。";
const LOGIN_PROMPT: &str = "请输入访问密码：";
const LOGIN_PENDING: &str = "登录中...";
const INDENT: &str = "  ";

pub fn render_frame(view: &AppViewModel) -> String {
    let mut out = String::new();
    if !view.authenticated {
        render_login(view, &mut out);
        return out;
    }

    if view.empty {
        out.push_str(WELCOME_TEXT);
        out.push('\n');
    }
    for row in &view.rows {
        render_row(row, &mut out);
    }
    if let Some(sidebar) = &view.sidebar {
        render_sidebar(sidebar, &mut out);
    }
    if view.canvas_open {
        out.push_str("\n[canvas open]\n");
    }
    out.push('\n');
    if view.loading {
        out.push_str("(回复中，请稍候)\n");
    }
    out.push_str("> ");
    out
}

fn render_login(view: &AppViewModel, out: &mut String) {
    if let Some(error) = &view.login.error {
        out.push_str(error);
        out.push('\n');
    }
    if view.login.pending {
        out.push_str(LOGIN_PENDING);
        out.push('\n');
    } else {
        out.push_str(LOGIN_PROMPT);
    }
}

fn render_row(row: &MessageRowView, out: &mut String) {
    let who = match row.role {
        Role::User => "你",
        Role::Assistant => "助手",
    };
    out.push('\n');
    match &row.time_label {
        Some(label) => out.push_str(&format!("[{label}] {who}:\n")),
        None => out.push_str(&format!("{who}:\n")),
    }

    let body = match &row.body {
        RowBody::User { text } => text.clone(),
        RowBody::Assistant(body) => render_body(body, &row.markers),
    };
    for line in body.trim_end().lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(INDENT);
            out.push_str(line);
            out.push('\n');
        }
    }

    for (_, marker) in &row.markers {
        if let MarkerView::Linked {
            key,
            selected: true,
            preview,
            provenance,
        } = marker
        {
            out.push_str(&format!(
                "{INDENT}┌ [{key}] {} ({}, {})\n",
                preview.title,
                preview.site_name,
                provenance_label(*provenance)
            ));
            if let Some(snippet) = &preview.snippet {
                out.push_str(&format!("{INDENT}│ {snippet}\n"));
            }
            if let Some(url) = &preview.url {
                out.push_str(&format!("{INDENT}└ {url}\n"));
            }
        }
    }
}

pub fn render_body(body: &RenderBody, markers: &[(String, MarkerView)]) -> String {
    match body {
        RenderBody::Thinking => format!("{THINKING_TEXT}\n"),
        RenderBody::Error { content } => render_markdown(content, markers),
        RenderBody::Markdown { content, .. } => match body.streaming_tail() {
            Some(tail) => {
                let mut text = render_markdown(tail.complete, markers);
                if let Some(pending) = tail.pending {
                    let placeholder = pending_text(pending, markers);
                    if !placeholder.is_empty() {
                        if tail.complete.ends_with("\n\n") {
                            text.push('\n');
                        } else if !tail.complete.ends_with('\n') && text.ends_with('\n') {
                            text.pop();
                            if tail.complete.ends_with(' ') {
                                text.push(' ');
                            }
                        }
                        text.push_str(&placeholder);
                        text.push('\n');
                    }
                }
                text
            }
            None => render_markdown(content, markers),
        },
    }
}

/// Stand-in for an unterminated construct. An open emphasis run is drawn as
/// its inner text, which may itself end in a dangling link or marker.
fn pending_text(pending: Incomplete<'_>, markers: &[(String, MarkerView)]) -> String {
    match pending.kind {
        IncompleteKind::Image => "[图片加载中…]".to_string(),
        IncompleteKind::Link => "[链接加载中…]".to_string(),
        IncompleteKind::Table => "[表格加载中…]".to_string(),
        IncompleteKind::Html => String::new(),
        IncompleteKind::Emphasis => {
            let inner = pending.raw.trim_start_matches(['*', '_', '~']);
            let tail = split_incomplete_tail(inner);
            let mut text = render_markdown(tail.complete, markers)
                .trim_end()
                .to_string();
            if let Some(nested) = tail.pending {
                if tail.complete.ends_with(' ') && !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&pending_text(nested, markers));
            }
            text
        }
    }
}

fn render_sidebar(sidebar: &SidebarView, out: &mut String) {
    let tab = |which: SourceTab, label: &str, count: usize| {
        if sidebar.active_tab == which {
            format!("[{label} {count}]")
        } else {
            format!(" {label} {count} ")
        }
    };
    out.push_str("\n── 引用来源 ");
    out.push_str(&tab(SourceTab::External, "外部", sidebar.external_count));
    out.push_str(&tab(SourceTab::Internal, "内部", sidebar.internal_count));
    out.push('\n');
    if sidebar.items.is_empty() {
        out.push_str(INDENT);
        out.push_str("(无)\n");
    }
    for item in &sidebar.items {
        let cursor = if item.active { '>' } else { ' ' };
        out.push_str(&format!(
            "{cursor} {}. {} · {}\n",
            item.key, item.title, item.site_name
        ));
        if let Some(url) = &item.url {
            out.push_str(&format!("{INDENT}  {url}\n"));
        }
    }
}

fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::External => "外部",
        Provenance::Internal => "内部",
    }
}

/// Renders Markdown as plain text. `<sup>` markers are drawn from the
/// resolved marker list: `[n]` when linked, `(label)` otherwise.
pub fn render_markdown(input: &str, markers: &[(String, MarkerView)]) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(input, options);
    let mut w = Writer::new(parser, markers);
    w.run();
    w.out
}

struct Writer<'a, 'm, I>
where
    I: Iterator<Item = Event<'a>>,
{
    iter: I,
    markers: &'m [(String, MarkerView)],
    out: String,
    list_indices: Vec<Option<u64>>,
    link: Option<String>,
    marker_text: Option<String>,
    in_code_block: bool,
}

impl<'a, 'm, I> Writer<'a, 'm, I>
where
    I: Iterator<Item = Event<'a>>,
{
    fn new(iter: I, markers: &'m [(String, MarkerView)]) -> Self {
        Self {
            iter,
            markers,
            out: String::new(),
            list_indices: Vec::new(),
            link: None,
            marker_text: None,
            in_code_block: false,
        }
    }

    fn run(&mut self) {
        while let Some(ev) = self.iter.next() {
            self.handle_event(ev);
        }
    }

    fn handle_event(&mut self, event: Event<'a>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.out.push('`');
                self.out.push_str(&code);
                self.out.push('`');
            }
            Event::InlineHtml(html) => self.inline_html(&html),
            Event::SoftBreak => self.out.push(' '),
            Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.ensure_blank_line();
                self.out.push_str("────────\n\n");
            }
            Event::TaskListMarker(done) => self.out.push_str(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.ensure_blank_line();
                self.out.push_str(&"#".repeat(heading_depth(level)));
                self.out.push(' ');
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.ensure_blank_line();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                self.ensure_newline();
                let depth = self.list_indices.len().saturating_sub(1);
                self.out.push_str(&INDENT.repeat(depth));
                match self.list_indices.last_mut() {
                    Some(Some(index)) => {
                        self.out.push_str(&format!("{index}. "));
                        *index += 1;
                    }
                    _ => self.out.push_str("- "),
                }
            }
            Tag::CodeBlock(kind) => {
                self.ensure_blank_line();
                self.in_code_block = true;
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.out.push_str(&format!("```{lang}\n"));
            }
            Tag::BlockQuote => {
                self.ensure_blank_line();
                self.out.push_str("> ");
            }
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
            }
            Tag::Paragraph => {
                if self.list_indices.is_empty() {
                    self.ensure_blank_line();
                }
            }
            Tag::TableRow | Tag::TableHead => self.ensure_newline(),
            Tag::TableCell => self.out.push_str("| "),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::BlockQuote => {
                self.out.push('\n');
            }
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.ensure_newline();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.ensure_newline();
                self.out.push_str("```\n");
            }
            TagEnd::Link | TagEnd::Image => {
                if let Some(url) = self.link.take() {
                    self.out.push_str(&format!(" ({url})"));
                }
            }
            TagEnd::TableCell => self.out.push(' '),
            TagEnd::TableRow | TagEnd::TableHead => self.out.push_str("|\n"),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(buffer) = self.marker_text.as_mut() {
            buffer.push_str(text);
            return;
        }
        self.out.push_str(text);
    }

    fn inline_html(&mut self, html: &str) {
        if self.in_code_block {
            self.out.push_str(html);
            return;
        }
        match html.trim().to_ascii_lowercase().as_str() {
            "<sup>" => self.marker_text = Some(String::new()),
            "</sup>" => {
                let raw = self.marker_text.take().unwrap_or_default();
                let glyph = match self.markers.iter().find(|(text, _)| text == &raw) {
                    Some((_, view @ MarkerView::Linked { .. })) => format!("[{}]", view.label()),
                    Some((_, view)) => format!("({})", view.label()),
                    None => format!("({})", raw.trim()),
                };
                self.out.push_str(&glyph);
            }
            _ => {}
        }
    }

    fn ensure_newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn ensure_blank_line(&mut self) {
        if self.out.is_empty() {
            return;
        }
        self.ensure_newline();
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
