use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
};
use crate::app::{App, InputMode, Screen};
use crate::model::{FoiaStatus, Sender};
use crate::views::dashboard::{DashboardFocus, NewsState, NEWS_UNAVAILABLE};
use crate::views::planner::LineKind;
use crate::views::TextInput;

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
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
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

/// Show only the last four characters of a secret
fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let masked_len = len - 4;
    let last_four: String = secret.chars().skip(masked_len).collect();
    format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
}

/// Cursor column at the end of the masked key, kept inside the field
fn masked_cursor_x(masked: &str, width: u16) -> u16 {
    masked.chars().count().min(width as usize) as u16
}

fn status_color(status: FoiaStatus) -> Color {
    match status {
        FoiaStatus::Submitted => Color::Blue,
        FoiaStatus::InProgress => Color::Yellow,
        FoiaStatus::Completed => Color::Green,
        FoiaStatus::Denied => Color::Red,
    }
}

fn border_color(focused: bool) -> Color {
    if focused { Color::Cyan } else { Color::DarkGray }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, tabs, body, footer
    let [header_area, tabs_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.needs_setup() {
        render_footer(app, frame, footer_area);
        render_setup(app, frame, area);
        return;
    }

    render_tabs(app, frame, tabs_area);

    match app.screen {
        Screen::Dashboard => render_dashboard(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
        Screen::Planner => render_planner(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" UFO Research Hub ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}]", app.client.model()), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_tabs(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<String> = Screen::all()
        .iter()
        .enumerate()
        .map(|(i, screen)| format!(" {} {} ", i + 1, screen.title()))
        .collect();
    let selected = Screen::all().iter().position(|s| *s == app.screen).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .divider("|");
    frame.render_widget(tabs, area);
}

/// Footer (key, label) pairs for the current screen and mode
fn key_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    if app.needs_setup() {
        return vec![("Enter", "save key"), ("Esc", "quit")];
    }

    let mut hints = match (app.screen, app.input_mode) {
        (Screen::Dashboard, InputMode::Normal) => {
            let mut hints = vec![("Tab", "focus"), ("j/k", "scroll"), ("r", "refresh news"), ("o", "open file")];
            if app.dashboard.focus == DashboardFocus::Files && app.dashboard.files.selected.is_some() {
                hints.push(("Enter", "analyze"));
            }
            hints
        }
        (Screen::Dashboard, InputMode::Editing) => vec![("Enter", "analyze"), ("Esc", "cancel")],
        (Screen::Chat, InputMode::Normal) => vec![("i", "type"), ("j/k", "scroll"), ("G", "latest")],
        (Screen::Chat, InputMode::Editing) => vec![("Enter", "send"), ("Esc", "stop typing")],
        (Screen::Planner, InputMode::Normal) => vec![("i", "edit topic"), ("Enter", "generate"), ("j/k", "scroll")],
        (Screen::Planner, InputMode::Editing) => vec![("Enter", "generate"), ("Esc", "stop typing")],
    };
    if app.input_mode == InputMode::Normal {
        hints.extend([("1-3", "screen"), ("q", "quit")]);
    }
    hints
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = if app.needs_setup() {
        " SETUP "
    } else {
        match app.screen {
            Screen::Dashboard => " DASHBOARD ",
            Screen::Chat => " CHAT ",
            Screen::Planner => " PLANNER ",
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hints = key_hints(app).into_iter().flat_map(|(key, label)| {
        [
            Span::styled(format!(" {key} "), key_style),
            Span::styled(format!(" {label} "), label_style),
        ]
    });

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

/// Render a one-line input box, scrolling horizontally to keep the cursor visible
fn render_text_input(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    title: &str,
    editing: bool,
) {
    let border = if editing { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" {title} "));

    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || input.cursor < inner_width {
        0
    } else {
        input.cursor - inner_width + 1
    };

    let visible_text: String = input.value.chars().skip(scroll_offset).take(inner_width).collect();
    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(paragraph, area);

    if editing {
        let cursor_x = (input.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

// =============================================================================
// SETUP
// =============================================================================

fn render_setup(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 9;
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Gemini API Key Required ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new(
        "Paste your Gemini API key below. It is saved to your config file. Press Enter to save, Esc to quit.",
    )
    .style(Style::default().fg(Color::Gray))
    .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let key = &app.setup.input;
    let masked = mask_secret(&key.value);
    let cursor_x = masked_cursor_x(&masked, input_area.width);
    frame.render_widget(
        Paragraph::new(masked).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = match &app.setup.error {
        Some(error) => Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(format!("{} characters", key.value.chars().count()))
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, Rect::new(inner.x, inner.y + 5, inner.width, 1));
}

// =============================================================================
// DASHBOARD
// =============================================================================

fn render_dashboard(app: &mut App, frame: &mut Frame, area: Rect) {
    let [news_area, right_area] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(area);

    let foia_height = (app.dashboard.foia.len() as u16) + 2;
    let [foia_area, files_area] = Layout::vertical([
        Constraint::Length(foia_height),
        Constraint::Min(0),
    ])
    .areas(right_area);

    render_news(app, frame, news_area);
    render_foia(app, frame, foia_area);
    render_files(app, frame, files_area);
}

fn render_news(app: &App, frame: &mut Frame, area: Rect) {
    let news = &app.dashboard.news;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.dashboard.focus == DashboardFocus::News)))
        .title(" Latest News ");

    let text = match &news.state {
        NewsState::Loading => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Text::from(Span::styled(
                format!("Fetching recent reports{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
        }
        NewsState::Loaded(articles) if articles.is_empty() => {
            Text::from(Span::styled(NEWS_UNAVAILABLE, Style::default().fg(Color::DarkGray)))
        }
        NewsState::Loaded(articles) => {
            let mut lines: Vec<Line> = Vec::new();
            for article in articles {
                lines.push(Line::from(Span::styled(
                    article.title.clone(),
                    Style::default().fg(Color::Yellow).bold(),
                )));
                lines.push(Line::from(article.summary.clone()));
                lines.push(Line::from(Span::styled(
                    article.uri.clone(),
                    Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                )));
                lines.push(Line::default());
            }
            Text::from(lines)
        }
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((news.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_foia(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.dashboard.focus == DashboardFocus::Foia)))
        .title(" FOIA Tracker ");

    let items: Vec<ListItem> = app
        .dashboard
        .foia
        .iter()
        .map(|request| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", request.id), Style::default().fg(Color::DarkGray)),
                Span::raw(request.subject.clone()),
                Span::raw(" "),
                Span::styled(
                    format!("[{}]", request.status.label()),
                    Style::default().fg(status_color(request.status)).bold(),
                ),
                Span::styled(format!(" {}", request.date), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_files(app: &mut App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.screen == Screen::Dashboard;
    let files = &app.dashboard.files;

    let [list_area, status_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.dashboard.focus == DashboardFocus::Files)))
        .title(format!(" Research Files ({}) ", files.files.len()));

    let mut lines: Vec<Line> = Vec::new();
    for file in &files.files {
        lines.push(Line::from(vec![
            Span::styled(file.name.clone(), Style::default().fg(Color::Yellow).bold()),
            Span::styled(format!("  {} {}", file.id, file.added), Style::default().fg(Color::DarkGray)),
        ]));
        for line in file.description.lines() {
            lines.push(parse_markdown_line(line));
        }
        lines.push(Line::default());
    }

    let list = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((files.scroll, 0));
    frame.render_widget(list, list_area);

    let status = if files.analyzing {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Line::from(Span::styled(
            format!(" Analyzing{dots}"),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(error) = &files.error {
        Line::from(Span::styled(format!(" {error}"), Style::default().fg(Color::Red)))
    } else if let Some(path) = &files.selected {
        Line::from(Span::styled(
            format!(" Selected: {}", path.display()),
            Style::default().fg(Color::Green),
        ))
    } else {
        Line::from(Span::styled(" No file selected", Style::default().fg(Color::DarkGray)))
    };
    frame.render_widget(Paragraph::new(status), status_area);

    render_text_input(frame, input_area, &files.path_input, "Document path (.txt, .md)", editing);
}

// =============================================================================
// CHAT
// =============================================================================

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" AI Research Assistant: {} ", app.client.model()));

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.chat.messages {
        match msg.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Model => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                if msg.is_streaming && msg.text.is_empty() {
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("Thinking{dots}"),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                } else {
                    for line in msg.text.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    if msg.is_streaming {
                        let cursor = Span::styled("▌", Style::default().fg(Color::Yellow));
                        match lines.last_mut() {
                            Some(last) if !msg.text.ends_with('\n') => last.spans.push(cursor),
                            _ => lines.push(Line::from(cursor)),
                        }
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat.scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let title = if app.chat.is_loading() { "Waiting for reply" } else { "Ask (i to type)" };
    render_text_input(frame, input_area, &app.chat.input, title, editing);
}

// =============================================================================
// PLANNER
// =============================================================================

fn render_planner(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, ideas_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing;
    render_text_input(frame, input_area, &app.planner.topic, "Topic", editing);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Post Ideas ");

    let text = if app.planner.loading {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Text::from(Span::styled(
            format!("Generating ideas{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if app.planner.ideas.is_empty() {
        Text::from(Span::styled(
            "Enter a topic and press Enter to generate post ideas.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let lines: Vec<Line> = app
            .planner
            .lines()
            .map(|kind| match kind {
                LineKind::Bullet(rest) => Line::from(vec![
                    Span::styled("• ", Style::default().fg(Color::Cyan)),
                    Span::raw(rest.to_string()),
                ]),
                LineKind::Plain(line) => Line::from(line.to_string()),
            })
            .collect();
        Text::from(lines)
    };

    let ideas = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.planner.scroll, 0));
    frame.render_widget(ideas, ideas_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use crate::credentials::CredentialStore;
    use crate::service::GenerationClient;
    use crate::testing::FakeTransport;

    #[test]
    fn test_parse_markdown_line_bold() {
        let line = parse_markdown_line("The **Tic Tac** incident");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Tic Tac");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        // Unclosed markers stay literal
        let line = parse_markdown_line("**open");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "**open");
    }

    #[test]
    fn test_mask_secret_keeps_last_four() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("AIzaSyXYZ1234"), "*********...1234");
    }

    #[test]
    fn test_long_key_masks_to_fixed_width() {
        let key = "AIzaSy".to_string() + &"k".repeat(33);
        let masked = mask_secret(&key);
        assert_eq!(masked.chars().count(), 20 + 3 + 4);
        assert!(masked.ends_with("kkkk"));

        // The cursor sits after the visible text, not at the raw key length
        assert_eq!(masked_cursor_x(&masked, 60), 27);
        assert_eq!(masked_cursor_x(&masked, 10), 10);
    }

    fn mounted_app() -> App {
        let credentials = Arc::new(CredentialStore::in_memory(Some("key".to_string())));
        let client = Arc::new(GenerationClient::new(
            Arc::new(FakeTransport::replying("{}")),
            credentials.clone(),
            "gemini-2.5-flash",
        ));
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(credentials, client, tx)
    }

    #[tokio::test]
    async fn test_analyze_hint_only_with_files_focus() {
        let mut app = mounted_app();
        app.dashboard.files.selected = Some(PathBuf::from("memo.txt"));
        assert!(!key_hints(&app).contains(&("Enter", "analyze")));

        app.dashboard.focus = DashboardFocus::Files;
        assert!(key_hints(&app).contains(&("Enter", "analyze")));

        app.dashboard.files.selected = None;
        assert!(!key_hints(&app).contains(&("Enter", "analyze")));
    }

    #[tokio::test]
    async fn test_setup_hints_before_key_is_saved() {
        let credentials = Arc::new(CredentialStore::in_memory(None));
        let client = Arc::new(GenerationClient::new(
            Arc::new(FakeTransport::replying("{}")),
            credentials.clone(),
            "gemini-2.5-flash",
        ));
        let (tx, _rx) = mpsc::unbounded_channel();
        let app = App::new(credentials, client, tx);
        assert_eq!(key_hints(&app), vec![("Enter", "save key"), ("Esc", "quit")]);
    }
}
