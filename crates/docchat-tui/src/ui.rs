use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use docchat_core::{NoticeKind, Sender};
use crate::app::{App, InputMode, LineInput};

/// Style `**bold**` and `` `code` `` runs in a line of model output.
///
/// Unclosed markers are kept as literal text.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold = rest.find("**");
        let code = rest.find('`');

        let (start, marker, style) = match (bold, code) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(Color::Green)),
            (Some(b), _) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(Color::Green)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        if end > 0 {
            spans.push(Span::styled(after[..end].to_string(), style));
        }
        rest = &after[end + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let banner_height = if app.session.notice().is_some() || app.session.flags().uploading {
        3
    } else {
        0
    };
    let input_height = if app.session.query_enabled() { 3 } else { 0 };

    // header, banner, chat, input, footer
    let [header_area, banner_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(banner_height),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    if banner_height > 0 {
        render_banner(app, frame, banner_area);
    }
    render_chat(app, frame, chat_area);
    if input_height > 0 {
        render_query_input(app, frame, input_area);
    }
    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::UploadPath {
        render_upload_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" 📄 Smart AI Document Assistant ", Style::default().fg(Color::Cyan).bold()),
    ];

    if let Some(name) = app.session.gate().file_name() {
        spans.push(Span::styled(
            format!(" Last upload: {} ", name),
            Style::default().fg(Color::White),
        ));
    }

    spans.extend([
        Span::styled(format!(" {} ", app.api_base), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_banner(app: &App, frame: &mut Frame, area: Rect) {
    let (text, color) = if app.session.flags().uploading {
        let name = app.session.gate().file_name().unwrap_or("file");
        (format!("Uploading {}...", name), Color::Yellow)
    } else if let Some(notice) = app.session.notice() {
        let color = match notice.kind {
            NoticeKind::Error => Color::Red,
            NoticeKind::Success => Color::Green,
        };
        (notice.text.clone(), color)
    } else {
        return;
    };

    let banner = Paragraph::new(text)
        .style(Style::default().fg(color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(banner, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let loading = app.session.flags().loading;

    let chat_text = if !app.session.chat_started() && !loading {
        let hint = if app.session.query_enabled() {
            "Ask a question about the uploaded document..."
        } else {
            "Press 'u' to upload a PDF, or drop one onto the terminal."
        };
        Text::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    } else {
        let copied = app.session.acknowledged(Instant::now());
        let mut lines: Vec<Line> = Vec::new();

        for (index, msg) in app.session.log().iter().enumerate() {
            let (label, color) = match msg.sender {
                Sender::User => ("You:", Color::Cyan),
                Sender::Assistant if msg.is_error() => ("AI:", Color::Red),
                Sender::Assistant => ("AI:", Color::Yellow),
            };

            let selected = app.selected_message == Some(index);
            let mut label_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
            if selected {
                label_style = label_style.add_modifier(Modifier::REVERSED);
            }

            let mut label_line = vec![Span::styled(label, label_style)];
            if copied == Some(index) {
                label_line.push(Span::styled(" ✓ copied", Style::default().fg(Color::Green)));
            } else if selected {
                label_line.push(Span::styled(" c: copy", Style::default().fg(Color::DarkGray)));
            }
            lines.push(Line::from(label_line));

            match msg.sender {
                Sender::User => {
                    lines.extend(msg.text.lines().map(|l| Line::from(l.to_string())));
                }
                Sender::Assistant => {
                    lines.extend(msg.text.lines().map(parse_markdown_line));
                }
            }
            lines.push(Line::default());
        }

        if loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Visible slice of a field plus the cursor column within it.
fn visible_slice(input: &LineInput, width: usize) -> (String, u16) {
    let scroll_offset = if width == 0 || input.cursor < width {
        0
    } else {
        input.cursor - width + 1
    };

    let visible: String = input.text.chars().skip(scroll_offset).take(width).collect();
    (visible, (input.cursor - scroll_offset) as u16)
}

fn render_query_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Query;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.session.flags().loading {
        " Thinking... "
    } else if app.session.flags().uploading {
        " Waiting for upload... "
    } else if editing {
        " Ask (Enter to send, Esc to stop typing) "
    } else {
        " Ask (i to type) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_slice(&app.query_input, inner_width);

    let input = if app.query_input.is_empty() && !editing {
        Paragraph::new("Ask about the uploaded document...")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(block), area);

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_upload_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Centered popup
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 6;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Upload PDF ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Path to a .pdf file. Enter to upload, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let (visible_text, cursor_x) = visible_slice(&app.path_input, input_area.width as usize);
    frame.render_widget(
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Query => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        InputMode::UploadPath => (" UPLOAD ", Style::default().bg(Color::Magenta).fg(Color::White)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    match app.input_mode {
        InputMode::Normal => {
            if app.can_upload() {
                hints.extend(hint(" u ", " upload "));
            }
            if app.session.query_enabled() {
                hints.extend(hint(" i ", " ask "));
            }
            if app.session.chat_started() {
                hints.extend(hint(" j/k ", " select "));
                hints.extend(hint(" c ", " copy "));
                hints.extend(hint(" PgUp/PgDn ", " scroll "));
            }
            hints.extend(hint(" q ", " quit "));
        }
        InputMode::Query => {
            hints.extend(hint(" Enter ", " send "));
            hints.extend(hint(" Esc ", " back "));
        }
        InputMode::UploadPath => {
            hints.extend(hint(" Enter ", " upload "));
            hints.extend(hint(" Esc ", " cancel "));
        }
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
