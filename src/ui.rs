use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::conversation::ImageSlot;
use crate::state::{Role, StatusIndicator};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(5),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    app.viewer_area = None;
    if app.notice.is_some() {
        render_notice(app, frame, area);
    } else if app.viewer.is_open() {
        render_viewer(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let [title_area, detail_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

    let mut title = vec![
        Span::styled(" PDF Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ];

    // Nothing is shown until the first poll settles
    if let Some(status) = app.status() {
        let dot_color = match status.indicator() {
            StatusIndicator::Indexing => Color::Yellow,
            StatusIndicator::Ready => Color::Green,
            StatusIndicator::NotReady => Color::Red,
        };
        title.push(Span::styled(" ● ", Style::default().fg(dot_color)));
        title.push(Span::styled(status.summary(), Style::default().fg(Color::White)));
    }

    let reindex_hint = if app.reindex.is_in_flight() {
        "  [reindexing...]"
    } else if app.can_reindex() {
        "  [Ctrl+R reindex PDFs]"
    } else {
        ""
    };
    title.push(Span::styled(reindex_hint, Style::default().fg(Color::Gray)));

    let header = Paragraph::new(Line::from(title)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, title_area);

    let detail = match app.status() {
        Some(status) => match status.index_error() {
            Some(err) => Line::from(Span::styled(
                format!(" Index error: {}", err),
                Style::default().fg(Color::Red),
            )),
            None => status
                .last_indexed_display()
                .map(|at| {
                    Line::from(Span::styled(
                        format!(" Last indexed {}", at),
                        Style::default().fg(Color::DarkGray),
                    ))
                })
                .unwrap_or_default(),
        },
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(detail), detail_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let text = if app.conversation.is_empty() && !app.chat.is_pending() {
        Text::from(vec![
            Line::from("Welcome! Ask me anything about the PDFs in the pdfs folder."),
            Line::default(),
            Line::from(Span::styled(
                "PDFs are indexed when the server starts. Add files to pdfs and press Ctrl+R to reindex if you add new ones.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for (msg_idx, msg) in app.conversation.messages().iter().enumerate() {
            let role_color = match msg.role {
                Role::User => Color::Cyan,
                Role::Assistant => Color::Yellow,
            };
            lines.push(Line::from(Span::styled(
                format!("{}:", msg.role.label()),
                Style::default().fg(role_color).add_modifier(Modifier::BOLD),
            )));
            match msg.role {
                Role::User => {
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                Role::Assistant => {
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }

            for (img_idx, reference) in msg.image_refs().iter().enumerate() {
                let slot = ImageSlot {
                    message: msg_idx,
                    image: img_idx,
                };
                let style = if app.selected_image == Some(slot) {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default().fg(Color::Magenta)
                };
                lines.push(Line::from(Span::styled(
                    format!("  [image {}] {}", img_idx + 1, reference),
                    style,
                )));
            }
            lines.push(Line::default());
        }

        if app.chat.is_pending() {
            lines.push(Line::from(Span::styled(
                "Assistant:",
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

    let chat = Paragraph::new(text).wrap(Wrap { trim: false });
    if app.follow_bottom {
        app.pin_scroll(chat.line_count(app.chat_width));
    }
    let chat = chat.block(block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();
    let title = if app.chat.is_pending() {
        " Waiting for answer... "
    } else if app.is_indexing() {
        " Indexing in progress, please wait "
    } else if app.can_send() {
        " Ask (Enter to send, Alt+Enter for newline) "
    } else {
        " Ask a question about your PDFs... "
    };

    let border_color = if !enabled {
        Color::DarkGray
    } else if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Cursor row/column from the text before it
    let before: String = app.input.chars().take(app.input_cursor).collect();
    let cursor_row = before.matches('\n').count();
    let cursor_col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());

    // Scroll offsets that keep the cursor visible
    let row_offset = (cursor_row + 1).saturating_sub(inner_height.max(1));
    let col_offset = if inner_width == 0 {
        0
    } else {
        (cursor_col + 1).saturating_sub(inner_width)
    };

    let visible: Vec<Line> = app
        .input
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|l| Line::from(l.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let text_color = if enabled { Color::Cyan } else { Color::DarkGray };
    let input = Paragraph::new(visible)
        .style(Style::default().fg(text_color))
        .block(block);
    frame.render_widget(input, area);

    // Show cursor when editing and no overlay is up
    if app.input_mode == InputMode::Editing
        && enabled
        && app.notice.is_none()
        && !app.viewer.is_open()
    {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            area.y + 1 + (cursor_row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = if app.notice.is_some() {
        " Enter/Esc: dismiss"
    } else if app.viewer.is_open() {
        " ←/→: prev/next  +/-: zoom  0: reset  y: copy link  Esc: close"
    } else {
        match app.input_mode {
            InputMode::Editing => " Enter: send  Tab: images  Esc: normal  Ctrl+R: reindex  Ctrl+C: quit",
            InputMode::Normal => " i: type  j/k: scroll  Tab: next image  Enter: view  r: reindex  q: quit",
        }
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

/// Centered popup rectangle, `percent` of the frame in each direction
fn centered(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let scale = |len: u16, percent: u16| (u32::from(len) * u32::from(percent) / 100) as u16;
    let width = scale(area.width, width_percent).max(20).min(area.width);
    let height = scale(area.height, height_percent).max(7).min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };

    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height.saturating_sub(2));
    let popup_area = Rect::new(
        (area.width.saturating_sub(popup_width)) / 2,
        (area.height.saturating_sub(popup_height)) / 2,
        popup_width,
        popup_height,
    );

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let color = if notice.success { Color::Green } else { Color::Red };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(" Reindex PDFs (Enter to close) ");

    let body = Paragraph::new(notice.message.as_str())
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, popup_area);
}

fn render_viewer(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(reference) = app.viewer.current() else {
        return;
    };
    let location = app.image_location(reference);
    let zoom = app.viewer.zoom().unwrap_or(1.0);

    // Overlay grows with zoom: 40% of the screen at 1.0x, full screen from 2.5x
    let percent = ((40.0 * zoom).round() as u16).min(100);
    let popup_area = centered(area, percent, percent);
    app.viewer_area = Some(popup_area);

    frame.render_widget(Clear, popup_area);

    let mut toolbar = Vec::new();
    if app.viewer.has_navigation() {
        if let Some(index) = app.viewer.index() {
            toolbar.push(Span::styled(
                format!(" {} / {} ", index + 1, app.viewer.len()),
                Style::default().fg(Color::Cyan).bold(),
            ));
        }
    }
    toolbar.push(Span::styled(
        format!(" {}% ", app.viewer.zoom_percent().unwrap_or(100)),
        Style::default().fg(Color::Yellow),
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Image ")
        .title_bottom(Line::from(toolbar));

    let body = Paragraph::new(vec![
        Line::from(Span::styled(
            "Related catalog item",
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )),
        Line::default(),
        Line::from(Span::styled(location, Style::default().fg(Color::White).underlined())),
    ])
    .block(block)
    .wrap(Wrap { trim: false });
    frame.render_widget(body, popup_area);
}
