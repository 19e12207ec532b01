use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use crate::app::{App, ConversationRow};
use crate::chat::ChatRole;
use crate::shell::{Panel, HEADER_HEIGHT};
use crate::upload::StatusTone;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.shell.active_panel() {
        Panel::Dashboard => render_dashboard(app, frame, body_area),
        Panel::Chat => render_chat(app, frame, body_area),
        Panel::Upload => render_upload(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Overlays
    if app.shell.mobile_menu_visible() {
        render_mobile_menu(app, frame, body_area);
    }
    if app.picker.is_some() {
        render_picker(app, frame, area);
    }
}

fn nav_item_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let title = Line::from(vec![
        Span::styled(" OBD SmartScan ", Style::default().fg(Color::White).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let active = app.shell.active_panel();
    let right = if app.shell.nav_list_visible() {
        let mut spans = Vec::new();
        for panel in Panel::ALL {
            spans.push(Span::styled(panel.label(), nav_item_style(panel == active)));
            spans.push(Span::raw("   "));
        }
        Line::from(spans)
    } else {
        let style = if app.shell.menu_open() {
            Style::default().fg(Color::Black).bg(Color::White).bold()
        } else {
            Style::default().fg(Color::White).bold()
        };
        Line::from(Span::styled(" ☰ ", style))
    };

    let [title_area, nav_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(right.width() as u16),
    ])
    .areas(inner);

    frame.render_widget(Paragraph::new(title), title_area);
    frame.render_widget(Paragraph::new(right).alignment(Alignment::Right), nav_area);
}

fn render_mobile_menu(app: &App, frame: &mut Frame, body_area: Rect) {
    let height = (Panel::ALL.len() as u16 + 2).min(body_area.height);
    let menu_area = Rect::new(body_area.x, body_area.y, body_area.width, height);

    frame.render_widget(Clear, menu_area);

    let active = app.shell.active_panel();
    let items: Vec<ListItem> = Panel::ALL
        .iter()
        .map(|panel| {
            let marker = if *panel == active { "● " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(panel.label(), nav_item_style(*panel == active)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .style(Style::default().bg(Color::Black)),
        )
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.shell.menu_cursor()));
    frame.render_stateful_widget(list, menu_area, &mut state);
}

fn render_dashboard(app: &App, frame: &mut Frame, area: Rect) {
    let viewport = app.shell.viewport();
    let dashboard = app.shell.dashboard_frame();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Metabase Dashboard ");

    let text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled(
            "The dashboard is an embedded document served by Metabase.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
        Line::from(Span::styled(
            app.config.dashboard_url.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        )),
        Line::default(),
        Line::from(format!(
            "Frame: {} × {} px  (viewport {} × {}, header {})",
            dashboard.width, dashboard.height, viewport.width, viewport.height, HEADER_HEIGHT
        )),
        Line::default(),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("o", Style::default().fg(Color::Yellow).bold()),
            Span::raw(" to open it in your browser."),
        ]),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Input grows with the draft, up to six lines
    let draft_lines = app.chat.draft().split('\n').count() as u16;
    let input_height = draft_lines.clamp(1, 6) + 2;

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_height),
    ])
    .areas(area);

    // Wrap once for the inner size; the same rows drive scrolling and drawing
    let rows = app.conversation.layout(
        &app.chat,
        chat_area.width.saturating_sub(2),
        chat_area.height.saturating_sub(2),
    );

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Assistant ");

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|row| match row {
            ConversationRow::Label(ChatRole::User) => Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            ConversationRow::Label(ChatRole::Assistant) => Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            ConversationRow::Text(text) => Line::raw(text),
            ConversationRow::Blank => Line::default(),
            ConversationRow::Typing => {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                Line::from(Span::styled(
                    format!("Assistant is typing{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                ))
            }
        })
        .collect();

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .scroll((app.conversation.scroll, 0));
    frame.render_widget(chat, chat_area);

    render_chat_input(app, frame, input_area);
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.chat.is_pending() { Color::DarkGray } else { Color::Yellow };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send, Shift+Enter for a new line) ");

    let inner_height = area.height.saturating_sub(2).max(1) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    // Row and column of the cursor within the draft
    let before_cursor: String = app.chat.draft().chars().take(app.chat.cursor()).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|line| line.chars().count())
        .unwrap_or(0);

    // Keep the cursor row visible
    let row_offset = (cursor_row + 1).saturating_sub(inner_height);
    // And the cursor column, with horizontal scrolling
    let col_offset = if inner_width == 0 { 0 } else { (cursor_col + 1).saturating_sub(inner_width) };

    let visible: Vec<Line> = app
        .chat
        .draft()
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::raw(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let input = Paragraph::new(Text::from(visible))
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if app.picker.is_none() && !app.shell.mobile_menu_visible() {
        let x = area.x + 1 + (cursor_col - col_offset) as u16;
        let y = area.y + 1 + (cursor_row - row_offset) as u16;
        frame.set_cursor_position((x, y));
    }
}

fn render_upload(app: &App, frame: &mut Frame, area: Rect) {
    let upload = &app.upload;
    let show_progress = upload.progress() > 0;

    let [heading_area, drop_area, action_area, progress_area, status_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(6),
        Constraint::Length(2),
        Constraint::Length(if show_progress { 2 } else { 0 }),
        Constraint::Min(0),
    ])
    .areas(area.inner(Margin::new(2, 1)));

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "📤 Upload CSV to OBD-II Backend",
            Style::default().add_modifier(Modifier::BOLD),
        ))),
        heading_area,
    );

    let selection = match upload.selected() {
        Some(file) => Line::from(format!("📎 Selected: {}", file.name)),
        None => Line::from("📂 Drop your CSV onto this terminal or browse for it"),
    };
    let drop_text = Text::from(vec![
        Line::default(),
        selection,
        Line::default(),
        Line::from(vec![
            Span::styled(" b ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::styled(" Browse", Style::default().fg(Color::LightBlue)),
        ]),
    ]);
    let drop_zone = Paragraph::new(drop_text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Gray)),
        );
    frame.render_widget(drop_zone, drop_area);

    let action = if upload.is_uploading() {
        Line::from(Span::styled(
            "Uploading...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(vec![
            Span::styled(" u ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::styled(" Upload ", Style::default().bg(Color::Black).fg(Color::White).bold()),
        ])
    };
    frame.render_widget(Paragraph::new(action), action_area);

    if show_progress {
        let color = if upload.progress() == 100 { Color::Green } else { Color::Blue };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::DarkGray))
            .percent(u16::from(upload.progress()));
        frame.render_widget(gauge, Rect { height: 1, ..progress_area });
    }

    let status_color = match upload.status().tone() {
        StatusTone::Positive => Color::Green,
        StatusTone::Negative => Color::Red,
        StatusTone::Neutral => Color::Reset,
    };
    let status = Paragraph::new(upload.status().message())
        .style(Style::default().fg(status_color))
        .wrap(Wrap { trim: false });
    frame.render_widget(status, status_area);
}

fn render_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(picker) = app.picker.as_mut() else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = (picker.entries.len().max(1) as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Choose a CSV file (Enter to select, Esc to cancel) ");

    if picker.entries.is_empty() {
        let empty = Paragraph::new(format!(" No CSV files in {}", picker.dir.display()))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, popup_area);
        return;
    }

    let items: Vec<ListItem> = picker
        .entries
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ListItem::new(format!(" {} ", name))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut picker.state);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = Style::default().bg(Color::Blue).fg(Color::White);
    let mode_text = match app.shell.active_panel() {
        Panel::Dashboard => " DASHBOARD ",
        Panel::Chat => " CHAT ",
        Panel::Upload => " UPLOAD ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.picker.is_some() {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else if app.shell.mobile_menu_visible() {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" open ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else {
        match app.shell.active_panel() {
            Panel::Chat => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Shift+Enter ", key_style),
                Span::styled(" newline ", label_style),
                Span::styled(" PgUp/PgDn ", key_style),
                Span::styled(" scroll ", label_style),
            ],
            Panel::Dashboard => vec![
                Span::styled(" o ", key_style),
                Span::styled(" open in browser ", label_style),
            ],
            Panel::Upload => vec![
                Span::styled(" b ", key_style),
                Span::styled(" browse ", label_style),
                Span::styled(" u ", key_style),
                Span::styled(" upload ", label_style),
            ],
        }
    };

    if app.picker.is_none() && !app.shell.mobile_menu_visible() {
        hints.extend(vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" panel ", label_style),
        ]);
        if app.shell.hamburger_visible() {
            hints.extend(vec![
                Span::styled(" F4 ", key_style),
                Span::styled(" menu ", label_style),
            ]);
        }
        hints.extend(vec![
            Span::styled(" Ctrl+C ", key_style),
            Span::styled(" quit ", label_style),
        ]);
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
