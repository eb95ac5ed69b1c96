use lvc_core::{ChatMessage, ChatRole};
use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame,
};

use crate::app::{App, FocusPane, InputMode};

const ACCENT: Color = Color::Yellow;
const SIDEBAR_WIDTH: u16 = 30;
const MAX_OPTION_ROWS: usize = 8;
const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];
const RULE_WIDTH: usize = 40;

/// Render inline `**bold**` and `*italic*` on top of `base`.
/// Unclosed markers are kept as literal text.
fn parse_inline(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_text = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find('*') {
        current_text.push_str(&rest[..pos]);
        let after = &rest[pos..];

        let (marker, modifier) = if after.starts_with("**") {
            ("**", Modifier::BOLD)
        } else {
            ("*", Modifier::ITALIC)
        };
        let inner = &after[marker.len()..];

        // Emphasis can't open or close on whitespace
        let closing = inner.find(marker).filter(|&end| {
            let content = &inner[..end];
            end > 0
                && !content.starts_with(char::is_whitespace)
                && !content.ends_with(char::is_whitespace)
        });

        match closing {
            Some(end) => {
                if !current_text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut current_text), base));
                }
                spans.push(Span::styled(inner[..end].to_string(), base.add_modifier(modifier)));
                rest = &inner[end + marker.len()..];
            }
            _ => {
                // No closing marker, treat as literal
                current_text.push_str(marker);
                rest = inner;
            }
        }
    }

    current_text.push_str(rest);
    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }
    spans
}

/// Turn one line of a Markdown report into a styled line
fn markdown_line(text: &str) -> Line<'static> {
    if let Some(heading) = text.strip_prefix("### ") {
        let style = Style::default().fg(ACCENT).add_modifier(Modifier::BOLD);
        return Line::from(parse_inline(heading, style));
    }

    if let Some(quote) = text.strip_prefix("> ") {
        let mut spans = vec![Span::styled("▌ ", Style::default().fg(ACCENT))];
        spans.extend(parse_inline(quote, Style::default().fg(Color::Gray)));
        return Line::from(spans);
    }

    if let Some(item) = text.strip_prefix("- ") {
        let mut spans = vec![Span::styled("  • ", Style::default().fg(ACCENT))];
        spans.extend(parse_inline(item, Style::default()));
        return Line::from(spans);
    }

    if text.trim() == "---" {
        return Line::from(Span::styled(
            "─".repeat(RULE_WIDTH),
            Style::default().fg(Color::DarkGray),
        ));
    }

    Line::from(parse_inline(text, Style::default()))
}

/// Rows `lines` take once wrapped to `width` columns
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    // Same wrapping as the chat widget, so scrolling reaches the real last row
    let rows = Paragraph::new(lines.to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width.max(1));
    rows.min(u16::MAX as usize) as u16
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let main_area = if app.show_sidebar {
        let [sidebar_area, main_area] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                .areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        main_area
    } else {
        app.sidebar_area = None;
        body_area
    };

    render_main(app, frame, main_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Portal S Consult ", Style::default().fg(ACCENT).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(app.backend.base_url().to_string(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let focused = app.focus == FocusPane::Sidebar;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { ACCENT } else { Color::DarkGray }))
        .title(" Ferramentas ");

    let name_style = if focused {
        Style::default().fg(Color::Black).bg(ACCENT).bold()
    } else {
        Style::default().fg(Color::White).bold()
    };

    let text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled(" + Nova análise ", name_style)),
        Line::from(Span::styled(
            "   Limpar e iniciar nova conversa",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let sidebar = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(sidebar, area);
}

fn render_main(app: &mut App, frame: &mut Frame, area: Rect) {
    let options_height = if app.conversation.pending_options().is_empty() {
        0
    } else {
        (app.conversation.pending_options().len().min(MAX_OPTION_ROWS) + 2) as u16 // +2 for borders
    };

    let [chat_area, options_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(options_height),
        Constraint::Length(3),
    ])
    .areas(area);

    if app.conversation.has_started() || app.conversation.is_busy() {
        render_chat(app, frame, chat_area);
    } else {
        render_welcome(app, frame, chat_area);
    }

    if options_height > 0 {
        render_options(app, frame, options_area);
    } else {
        app.options_area = None;
    }

    render_input(app, frame, input_area);
}

fn render_welcome(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_total_lines = 0;
    app.chat_scroll = 0;

    let top_padding = area.height.saturating_sub(6) / 3;
    let mut lines: Vec<Line> = (0..top_padding).map(|_| Line::default()).collect();
    lines.extend([
        Line::from(Span::styled("📄", Style::default().fg(ACCENT))),
        Line::default(),
        Line::from(Span::styled(
            "Portal S Consult",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Inteligência Artificial para análise de LVCs.",
            Style::default().fg(Color::Gray),
        )),
    ]);

    let welcome = Paragraph::new(Text::from(lines).centered()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(welcome, area);
}

/// Styled transcript plus the line where each history message starts
fn chat_lines(app: &App) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut starts = Vec::with_capacity(app.conversation.history().len());

    for (i, msg) in app.conversation.history().iter().enumerate() {
        starts.push(lines.len());
        let selected = app.selected_message == Some(i);
        push_message(app, msg, selected, &mut lines);
    }

    if app.conversation.is_busy() {
        let spinner = SPINNER[app.animation_frame as usize % SPINNER.len()];
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", spinner), Style::default().fg(ACCENT)),
            Span::styled(
                "Analisando engenharia...",
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    (lines, starts)
}

fn push_message(app: &App, msg: &ChatMessage, selected: bool, lines: &mut Vec<Line<'static>>) {
    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "Você:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(msg.content.clone()));
        }
        ChatRole::Assistant => {
            let mut label_style = Style::default().fg(ACCENT).add_modifier(Modifier::BOLD);
            if selected {
                label_style = label_style.add_modifier(Modifier::REVERSED);
            }
            let marker = if selected { "▶ " } else { "" };
            lines.push(Line::from(Span::styled(
                format!("{}Relatório:", marker),
                label_style,
            )));

            for line in msg.content.lines() {
                lines.push(markdown_line(line));
            }

            if let Some(report) = &msg.report_ref {
                lines.push(Line::default());
                lines.push(Line::from(vec![
                    Span::styled("⤓ PDF original: ", Style::default().fg(Color::Gray)),
                    Span::styled(report.clone(), Style::default().fg(ACCENT)),
                ]));
                if let Ok(url) = app.backend.download_url(report) {
                    lines.push(Line::from(Span::styled(
                        url,
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::UNDERLINED),
                    )));
                }
            }
        }
    }
    lines.push(Line::default());
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);

    let (lines, starts) = chat_lines(app);
    let total = wrapped_height(&lines, inner_width);
    let max_scroll = total.saturating_sub(inner_height);

    app.chat_height = inner_height;
    app.chat_total_lines = total;

    if app.follow_bottom {
        app.chat_scroll = max_scroll;
    } else if app.reveal_selected {
        if let Some(start) = app.selected_message.and_then(|i| starts.get(i)) {
            app.chat_scroll = wrapped_height(&lines[..*start], inner_width);
        }
        app.reveal_selected = false;
    }
    app.chat_scroll = app.chat_scroll.min(max_scroll);

    let focused = app.focus == FocusPane::Chat && app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { ACCENT } else { Color::DarkGray }))
        .title(" Conversa ");

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if max_scroll > 0 {
        let mut scrollbar_state =
            ScrollbarState::new(max_scroll as usize).position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_options(app: &mut App, frame: &mut Frame, area: Rect) {
    app.options_area = Some(area);

    let focused = app.focus == FocusPane::Options;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { ACCENT } else { Color::Magenta }))
        .title(" Selecione o arquivo correto: ");

    let items: Vec<ListItem> = app
        .conversation
        .pending_options()
        .iter()
        .enumerate()
        .map(|(i, option)| ListItem::new(format!(" {}. {} ", i + 1, option)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(ACCENT)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("› ");

    frame.render_stateful_widget(list, area, &mut app.option_state);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.conversation.is_busy();
    let editing = app.input_mode == InputMode::Editing && !busy;

    let (title, border_color) = if busy {
        (" Aguarde a análise... ", Color::DarkGray)
    } else if editing {
        (" Pesquisar (Enter envia) ", ACCENT)
    } else {
        (" Pesquisar (i para digitar) ", Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let input = app.conversation.input();
    if input.is_empty() {
        let placeholder = if app.conversation.has_started() {
            "Faça outra pesquisa..."
        } else {
            "Pesquisar trecho ou código (Ex: arraial)"
        };
        let paragraph = Paragraph::new(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(paragraph, area);
    } else {
        // Scroll horizontally to keep the cursor visible
        let inner_width = area.width.saturating_sub(2) as usize;
        let cursor_pos = app.input_cursor;
        let scroll_offset = if inner_width == 0 {
            0
        } else if cursor_pos >= inner_width {
            cursor_pos - inner_width + 1
        } else {
            0
        };

        let visible_text: String = input.chars().skip(scroll_offset).take(inner_width).collect();
        let paragraph = Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(block);
        frame.render_widget(paragraph, area);
    }

    if editing {
        let cursor_x = app.input_cursor.min(area.width.saturating_sub(3) as usize) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" DIGITANDO ", Style::default().bg(ACCENT).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)];

    if let Some(status) = &app.status {
        let style = if status.is_error {
            Style::default().fg(Color::Red).bg(Color::Black).bold()
        } else {
            Style::default().fg(Color::Green).bg(Color::Black).bold()
        };
        spans.push(Span::styled(status.text.clone(), style));
    } else {
        let hints: Vec<[Span; 2]> = match (app.input_mode, app.focus) {
            (InputMode::Editing, _) => vec![hint("Enter", "enviar"), hint("Esc", "navegar")],
            (InputMode::Normal, FocusPane::Options) => vec![
                hint("j/k", "opção"),
                hint("Enter", "escolher"),
                hint("1-9", "atalho"),
                hint("Tab", "foco"),
            ],
            (InputMode::Normal, FocusPane::Sidebar) => {
                vec![hint("Enter", "nova análise"), hint("Tab", "foco")]
            }
            (InputMode::Normal, FocusPane::Chat) => {
                let mut hints = vec![hint("j/k", "resposta"), hint("c", "copiar")];
                if app.selected_report().is_some() {
                    hints.push(hint("d", "baixar PDF"));
                }
                hints.extend([hint("i", "digitar"), hint("Tab", "foco")]);
                hints
            }
        };
        spans.extend(hints.into_iter().flatten());

        if app.input_mode == InputMode::Normal {
            spans.extend(hint("n", "nova análise"));
            spans.extend(hint("b", "menu"));
            spans.extend(hint("q", "sair"));
        }
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use lvc_core::ChatResponse;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn screen_text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        screen_text(terminal.backend().buffer())
    }

    #[test]
    fn test_inline_bold_and_italic() {
        let spans = parse_inline("Ocorrências: **3** em *km 12*", Style::default());
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[1].content, "3");
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[3].content, "km 12");
        assert!(spans[3].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        let spans = parse_inline("2 * 3 = **6", Style::default());
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "2 * 3 = **6");
    }

    #[test]
    fn test_block_markers() {
        assert_eq!(plain(&markdown_line("### 1. PISTA")), "1. PISTA");
        assert_eq!(plain(&markdown_line("> *Erosões*")), "▌ Erosões");
        assert_eq!(plain(&markdown_line("- Área: **2 m²**")), "  • Área: 2 m²");
        assert_eq!(plain(&markdown_line("---")), "─".repeat(RULE_WIDTH));
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("a".repeat(25)), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 10), 3 + 1 + 1);

        // Words move to the next row whole
        let words = vec![Line::from("aaaaaa bbbbbb cccccc")];
        assert_eq!(wrapped_height(&words, 10), 3);
    }

    #[test]
    fn test_welcome_screen_before_first_query() {
        let (mut app, _rx) = test_app();
        let screen = draw(&mut app);

        assert!(screen.contains("Portal S Consult"));
        assert!(screen.contains("Nova análise"));
        assert!(screen.contains("Ex: arraial"));
    }

    #[tokio::test]
    async fn test_options_and_report_link_rendered() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("arraial");
        app.conversation.begin_submit(None);
        app.on_reply(Ok(ChatResponse::choose(
            "Qual arquivo?",
            vec!["a.pdf".into(), "b.pdf".into()],
        )));

        let screen = draw(&mut app);
        assert!(screen.contains("Qual arquivo?"));
        assert!(screen.contains("Selecione o arquivo correto"));
        assert!(screen.contains("2. b.pdf"));

        app.select_option(0);
        app.on_reply(Ok(ChatResponse::answer("### Resumo", Some("a.pdf".into()))));

        let screen = draw(&mut app);
        assert!(screen.contains("Resumo"));
        assert!(screen.contains("PDF original: a.pdf"));
        assert!(screen.contains("/download?filename=a.pdf"));
    }
}
