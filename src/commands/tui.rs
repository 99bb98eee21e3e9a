use std::io;
use std::time::{Duration, Instant};

use clap::Args;
use crossterm::cursor::Show;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::block::{Position, Title};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::Runtime;
use crate::errors::CliError;
use crate::modal::{DetailPane, sanitize_text};
use crate::store::{ConversationEntry, Role};
use crate::tui::handlers::{dispatch, handle_event, handle_tui_msg, spawn_effect};
use crate::tui::types::*;
use crate::tui::view::{CardView, CardsView, project_grid, project_selected};

#[derive(Debug, Args)]
pub struct TuiArgs {
    /// Open with this category already chosen.
    #[arg(short = 'c', long = "category")]
    pub category: Option<String>,
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, CliError> {
        enable_raw_mode()
            .map_err(|e| CliError::Generic(format!("Failed to enable raw mode: {e}")))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .map_err(|e| CliError::Generic(format!("Failed to enter alternate screen: {e}")))?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, DisableMouseCapture, Show, LeaveAlternateScreen);
    }
}

pub async fn handle(runtime: &Runtime, args: TuiArgs) -> Result<(), CliError> {
    if runtime.output.json {
        return Err(CliError::Usage(
            "`--json` is not supported for `glowguide tui`.".to_string(),
        ));
    }

    let api = runtime.api_client()?;
    let mut app = App::new(
        runtime.catalog_source(),
        runtime.selection_store()?,
        runtime.conversation_store()?,
        runtime.orchestrator()?,
    );
    tracing::info!(
        proxy = api.endpoint(),
        catalog = %app.catalog_source,
        persona = app.orchestrator.persona().key(),
        "starting tui"
    );

    let guard = TerminalGuard::enter()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| CliError::Generic(format!("Failed to init terminal: {e}")))?;
    terminal
        .clear()
        .map_err(|e| CliError::Generic(format!("Failed to clear terminal: {e}")))?;
    terminal
        .hide_cursor()
        .map_err(|e| CliError::Generic(format!("Failed to hide cursor: {e}")))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<TuiMsg>();
    app.loading_catalog = true;
    spawn_effect(
        &api,
        &app.catalog_source,
        &tx,
        Effect::FetchCatalog { category: None },
    );
    if let Some(category) = args.category {
        run_command(&mut app, Command::SelectCategory(category), |effect, app| {
            spawn_effect(&api, &app.catalog_source, &tx, effect)
        });
    }

    loop {
        update_spinner(&mut app);
        terminal
            .draw(|f| ui(f, &mut app))
            .map_err(|e| CliError::Generic(format!("Failed to draw: {e}")))?;

        if app.should_quit {
            break;
        }

        while let Ok(msg) = rx.try_recv() {
            handle_tui_msg(&mut app, msg);
        }

        let poll_ms = if app.waiting() || app.loading_catalog { 50 } else { 120 };
        if crossterm::event::poll(Duration::from_millis(poll_ms))
            .map_err(|e| CliError::Generic(format!("Event poll failed: {e}")))?
        {
            let event = crossterm::event::read()
                .map_err(|e| CliError::Generic(format!("Event read failed: {e}")))?;
            if let Some(command) = handle_event(&mut app, event) {
                run_command(&mut app, command, |effect, app| {
                    spawn_effect(&api, &app.catalog_source, &tx, effect)
                });
            }
        }
    }

    terminal
        .show_cursor()
        .map_err(|e| CliError::Generic(format!("Failed to restore cursor: {e}")))?;
    drop(guard);
    Ok(())
}

/// Dispatch one command to completion; failures land in the status line.
fn run_command(app: &mut App, command: Command, spawn: impl FnOnce(Effect, &App)) {
    match dispatch(app, command) {
        Ok(Some(effect)) => spawn(effect, app),
        Ok(None) => {}
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            app.status = format!("Error: {err}");
        }
    }
}

fn ui(f: &mut Frame<'_>, app: &mut App) {
    let size = f.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),      // header
            Constraint::Percentage(45), // product grid | selected list
            Constraint::Min(5),         // conversation
            Constraint::Length(3),      // chat input
            Constraint::Length(1),      // status
        ])
        .split(size);

    render_header(f, app, layout[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(layout[1]);
    app.hit.grid = cols[0];
    app.hit.selected = cols[1];
    render_grid(f, app, cols[0]);
    render_selected(f, app, cols[1]);

    let chat = render_chat(app, layout[2]);
    f.render_widget(chat, layout[2]);

    let input = render_input(app);
    f.render_widget(input, layout[3]);
    if app.focus == Focus::Chat && app.mode == Mode::Browse && !app.modal.is_open() {
        let prompt_cols = INPUT_PROMPT.width() as u16;
        let before: String = app.input[..app.cursor.min(app.input.len())].iter().collect();
        let x = layout[3]
            .x
            .saturating_add(1)
            .saturating_add(prompt_cols)
            .saturating_add(before.width() as u16);
        let y = layout[3].y.saturating_add(1);
        f.set_cursor_position((x.min(layout[3].x + layout[3].width.saturating_sub(2)), y));
    }

    render_status(f, app, layout[4]);

    app.hit.modal = None;
    app.hit.modal_close = None;
    match app.mode {
        Mode::CategoryPicker => {
            let area = centered_rect(50, 60, size);
            f.render_widget(Clear, area);
            render_category_picker_popup(f, app, area);
        }
        Mode::Help => {
            let area = centered_rect(70, 70, size);
            f.render_widget(Clear, area);
            f.render_widget(render_help(), area);
        }
        Mode::Browse => {}
    }

    if let Some(pane) = app.modal.pane() {
        let area = centered_rect(60, 60, size);
        f.render_widget(Clear, area);
        f.render_widget(render_details(pane), area);
        let close = Rect::new(
            area.x.saturating_add(1),
            area.y + area.height.saturating_sub(2),
            area.width.saturating_sub(2),
            1,
        );
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "[ Close ]  Enter/Esc",
                Style::default().fg(c_accent()).add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center),
            close,
        );
        app.hit.modal = Some(area);
        app.hit.modal_close = Some(close);
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let base = Style::default().fg(Color::Black).bg(Color::White);
    let left = Paragraph::new(Line::from(vec![
        Span::styled(" GlowGuide ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("skincare routine builder"),
    ]))
    .style(base);

    let category = app.category.as_deref().unwrap_or("-");
    let right = Paragraph::new(Line::from(format!(
        "category={category}  persona={}  catalog={} ",
        app.orchestrator.persona().key(),
        app.catalog_source
    )))
    .style(base)
    .alignment(Alignment::Right);

    f.render_widget(left, cols[0]);
    f.render_widget(right, cols[1]);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { c_accent() } else { c_muted() };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn render_grid(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let title = match (&app.category, app.loading_catalog) {
        (_, true) => "Products (loading...)".to_string(),
        (Some(category), false) => format!("Products: {category}"),
        (None, false) => "Products".to_string(),
    };
    let block = panel_block(title, app.focus == Focus::Grid);
    let view = project_grid(app.visible_products.as_deref(), &app.selection);
    render_cards(f, &view, block, area, &mut app.grid_state);
}

fn render_selected(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let title = format!("Selected ({})", app.selection.len());
    let block = panel_block(title, app.focus == Focus::Selected);
    let view = project_selected(&app.selection);
    render_cards(f, &view, block, area, &mut app.selected_state);
}

fn render_cards(
    f: &mut Frame<'_>,
    view: &CardsView,
    block: Block<'static>,
    area: Rect,
    state: &mut ratatui::widgets::ListState,
) {
    let cards = match view {
        CardsView::Placeholder(text) => {
            let placeholder = Paragraph::new(Line::from(Span::styled(
                *text,
                Style::default().fg(c_muted()).add_modifier(Modifier::ITALIC),
            )))
            .alignment(Alignment::Center)
            .block(block);
            f.render_widget(placeholder, area);
            return;
        }
        CardsView::Cards(cards) => cards,
    };

    let width = area.width.saturating_sub(2) as usize;
    let items = cards
        .iter()
        .map(|card| card_item(card, width))
        .collect::<Vec<_>>();
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(c_muted())
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );
    f.render_stateful_widget(list, area, state);
}

/// One card row; the last columns hold the info affordance the mouse hit test expects.
fn card_item(card: &CardView, width: usize) -> ListItem<'static> {
    let (text, info) = card_row_text(card, width);
    let style = if card.selected {
        Style::default().fg(c_accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    ListItem::new(Line::from(vec![
        Span::styled(text, style),
        Span::styled(info, Style::default().fg(c_info())),
    ]))
}

fn card_row_text(card: &CardView, width: usize) -> (String, String) {
    const INFO: &str = "[i]";
    let marker = if card.selected { "[x] " } else { "[ ] " };
    let body = format!("{marker}{} · {}", card.name, card.brand);
    let body = sanitize_text(&body).replace(['\n', '\t'], " ");
    let avail = width.saturating_sub(INFO.width());
    let mut text = truncate_to_width(&body, avail);
    let pad = avail.saturating_sub(text.width());
    text.push_str(&" ".repeat(pad));
    (text, INFO.to_string())
}

fn render_details(pane: &DetailPane) -> Paragraph<'static> {
    let label = Style::default().fg(c_muted()).add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            pane.name.clone(),
            Style::default().fg(c_accent()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::styled("Brand: ", label), Span::raw(pane.brand.clone())]),
        Line::from(vec![
            Span::styled("Category: ", label),
            Span::raw(pane.category.clone()),
        ]),
        Line::from(vec![Span::styled("Image: ", label), Span::raw(pane.image.clone())]),
        Line::from(""),
    ];
    for line in pane.description.lines() {
        lines.push(Line::from(line.to_string()));
    }

    Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(c_accent()))
                .title(format!("Product #{}", pane.id)),
        )
        .wrap(Wrap { trim: false })
}

fn render_chat(app: &App, area: Rect) -> Paragraph<'static> {
    let width = area.width.saturating_sub(2).max(1) as usize;
    let height = area.height.saturating_sub(2).max(1) as usize;

    let all_lines = build_chat_lines(
        app.conversation.visible(),
        width,
        app.waiting(),
        app.spinner_step,
        app.spinner_last,
    );
    let total = all_lines.len();
    let max_scroll = total.saturating_sub(height);
    let scroll = app.scroll_from_bottom.min(max_scroll);
    let top = max_scroll.saturating_sub(scroll);
    let end = (top + height).min(total);

    let text = Text::from(all_lines[top..end].to_vec());
    let title = format!("Advisor: {} (PgUp/PgDn scroll)", app.orchestrator.persona().label());
    let mut block = panel_block(title, app.focus == Focus::Chat);
    if app.waiting() {
        block = block.title(
            Title::from(Line::from(Span::styled(
                " thinking ",
                Style::default().fg(c_accent()),
            )))
            .alignment(Alignment::Right)
            .position(Position::Bottom),
        );
    }

    Paragraph::new(text).block(block).wrap(Wrap { trim: false })
}

const INPUT_PROMPT: &str = "> ";

fn render_input(app: &App) -> Paragraph<'static> {
    let input = app.input.iter().collect::<String>();
    let text = Text::from(Line::from(vec![
        Span::styled(
            INPUT_PROMPT,
            Style::default().fg(c_accent()).add_modifier(Modifier::BOLD),
        ),
        Span::raw(input),
    ]));

    let border = if app.waiting() {
        c_warn()
    } else if app.focus == Focus::Chat {
        c_accent()
    } else {
        c_muted()
    };
    let title = if app.waiting() {
        "Ask (waiting for reply)"
    } else {
        "Ask (Enter send, Ctrl+G routine)"
    };
    Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .title(title),
    )
}

fn render_status(f: &mut Frame<'_>, app: &App, area: Rect) {
    let right = format!(
        " {} selected  Tab focus  F2 category  F1 help ",
        app.selection.len()
    );
    let left_w = (area.width as usize).saturating_sub(right.width());
    let left = truncate_to_width(&format!(" {}", app.status), left_w);
    let pad = left_w.saturating_sub(left.width());
    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(pad)),
        Span::styled(right, Style::default().fg(c_muted())),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_category_picker_popup(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let items = app
        .categories
        .iter()
        .map(|c| ListItem::new(Line::from(c.clone())))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("Category (Enter choose, Esc cancel)"),
        )
        .highlight_style(
            Style::default()
                .bg(c_accent())
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, area, &mut app.category_state);
}

fn render_help() -> Paragraph<'static> {
    let lines = vec![
        Line::from(vec![Span::styled(
            "GlowGuide",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("F2: choose a category"),
        Line::from("Tab / Shift+Tab: move focus (products, selected, chat)"),
        Line::from("Up/Down: move within a list"),
        Line::from("Enter / Space: select or unselect a product"),
        Line::from("i or click [i]: product details"),
        Line::from("Enter twice / double click: remove from selected"),
        Line::from("Ctrl+G: generate a routine from the selection"),
        Line::from("F3: switch advisor voice"),
        Line::from("Ctrl+X: clear selections"),
        Line::from("Ctrl+K: clear conversation"),
        Line::from("PgUp/PgDn: scroll chat"),
        Line::from("Esc: close popup or quit"),
        Line::from("Ctrl+C: quit"),
    ];

    Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help (Esc to close)"),
        )
        .wrap(Wrap { trim: false })
}

fn c_accent() -> Color {
    Color::Rgb(255, 45, 149)
}

fn c_info() -> Color {
    Color::Rgb(0, 200, 220)
}

fn c_ok() -> Color {
    Color::Rgb(22, 163, 74)
}

fn c_warn() -> Color {
    Color::Rgb(245, 158, 11)
}

fn c_muted() -> Color {
    Color::Rgb(100, 116, 139)
}

const SPINNER_INTERVAL_MS: u64 = 275;

fn update_spinner(app: &mut App) {
    if !app.waiting() && !app.loading_catalog {
        return;
    }
    let now = Instant::now();
    if now.duration_since(app.spinner_last) >= Duration::from_millis(SPINNER_INTERVAL_MS) {
        app.spinner_last = now;
        app.spinner_step = app.spinner_step.wrapping_add(1);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    let vertical = popup_layout[1];
    let popup_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical);

    popup_layout[1]
}

/// Visible turns only; the "thinking" line is drawn here and never stored.
fn build_chat_lines<'a>(
    entries: impl Iterator<Item = &'a ConversationEntry>,
    width: usize,
    waiting: bool,
    spinner_step: u64,
    spinner_last: Instant,
) -> Vec<Line<'static>> {
    let mut out = Vec::new();

    for entry in entries {
        let (tag, tag_style) = match entry.role {
            Role::User => ("You ", Style::default().fg(c_ok()).add_modifier(Modifier::BOLD)),
            Role::Assistant => (
                "Advisor ",
                Style::default().fg(c_accent()).add_modifier(Modifier::BOLD),
            ),
        };
        let content = sanitize_text(&entry.content);
        push_wrapped(&mut out, tag, tag_style, &content, Style::default(), width);
        out.push(Line::from(""));
    }

    if waiting {
        let frame = typing_frame(spinner_step, spinner_last);
        push_wrapped(
            &mut out,
            "Advisor ",
            Style::default().fg(c_accent()).add_modifier(Modifier::BOLD),
            &format!("{frame} thinking..."),
            Style::default().fg(c_muted()).add_modifier(Modifier::ITALIC),
            width,
        );
    }
    out
}

fn push_wrapped(
    out: &mut Vec<Line<'static>>,
    tag: &'static str,
    tag_style: Style,
    content: &str,
    content_style: Style,
    width: usize,
) {
    let prefix_len = tag.width();
    let indent = " ".repeat(prefix_len);
    let avail = width.saturating_sub(prefix_len).max(1);
    let content = content.replace("\r\n", "\n");

    let mut first = true;
    for line in content.split('\n') {
        let wrapped = if line.trim().is_empty() {
            vec![String::new()]
        } else {
            wrap_line(line, avail)
        };
        for part in wrapped {
            let lead = if first {
                Span::styled(tag, tag_style)
            } else {
                Span::raw(indent.clone())
            };
            first = false;
            out.push(Line::from(vec![lead, Span::styled(part, content_style)]));
        }
    }
}

fn typing_frame(spinner_step: u64, spinner_last: Instant) -> &'static str {
    const FRAMES: &[&str] = &["⣤", "⣰", "⢸", "⠹", "⠛", "⠏", "⡇", "⣆"];
    const TYPING_INTERVAL_MS: u128 = 60;

    let elapsed_ms = (spinner_step as u128) * (SPINNER_INTERVAL_MS as u128)
        + Instant::now().duration_since(spinner_last).as_millis();
    let idx = ((elapsed_ms / TYPING_INTERVAL_MS) % (FRAMES.len() as u128)) as usize;
    FRAMES[idx]
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width <= 1 {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut cur = String::new();

    for word in line.split_whitespace() {
        if cur.is_empty() {
            cur.push_str(word);
            continue;
        }
        if cur.as_str().width() + 1 + word.width() <= width {
            cur.push(' ');
            cur.push_str(word);
        } else {
            out.push(cur);
            cur = word.to_string();
        }
    }

    if !cur.is_empty() {
        out.push(cur);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn truncate_to_width(input: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if input.width() <= max_width {
        return input.to_string();
    }

    const ELLIPSIS: &str = "…";
    let ell_w = ELLIPSIS.width();
    if max_width <= ell_w {
        return ELLIPSIS.to_string();
    }

    let mut out = String::new();
    let mut w = 0usize;
    for ch in input.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w + cw + ell_w > max_width {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out.push_str(ELLIPSIS);
    out
}
