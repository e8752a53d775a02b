mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
    Frame, Terminal,
};

use hoard_valley::config::Config;
use hoard_valley::highlight::highlight;
use hoard_valley::ClientContext;
use tui_app::{format_price, sparkline_points, truncate, AppState, ConnectionStatus, InputMode, CARD_WIDTH};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let ctx = ClientContext::connect(&cfg).map_err(|e| io::Error::other(e.to_string()))?;
    let watcher = ctx.spawn_identity_watcher();

    let mut app = AppState::new(ctx);

    // Initial fetch before rendering
    app.refresh().await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Layout settles before the rail is first measured.
    let container = f64::from(rail_width(terminal.size()?.width));
    let content = app.items().len() as f64 * f64::from(CARD_WIDTH);
    app.carousel.mount(|| (container, content)).await;

    let result = run_loop(&mut terminal, &mut app).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    watcher.abort();

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut AppState) -> io::Result<()> {
    let frame_interval = Duration::from_millis(33);
    let refresh_interval = Duration::from_secs(60);

    loop {
        terminal.draw(|f| render(f, app))?;
        app.tick();
        app.drain_changes().await;

        if event::poll(frame_interval)? {
            match event::read()? {
                Event::Resize(width, _) => app.measure(rail_width(width)),
                Event::Key(key) if key.kind == KeyEventKind::Press => match app.mode {
                    InputMode::Browse if app.message.is_some() && key.code == KeyCode::Esc => {
                        app.message = None;
                    }
                    InputMode::Search => match key.code {
                        KeyCode::Enter | KeyCode::Esc => app.mode = InputMode::Browse,
                        KeyCode::Backspace => {
                            app.search.pop();
                        }
                        KeyCode::Char(c) => app.search.push(c),
                        _ => {}
                    },
                    InputMode::TargetPrice => match key.code {
                        KeyCode::Enter => app.confirm_price_alert().await,
                        KeyCode::Esc => app.cancel_price_alert(),
                        KeyCode::Backspace => app.edit_target_price(None),
                        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => app.edit_target_price(Some(c)),
                        _ => {}
                    },
                    InputMode::Browse => match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh().await;
                            app.measure(rail_width(terminal.size()?.width));
                        }
                        KeyCode::Right | KeyCode::Char('l') => app.select_next().await,
                        KeyCode::Left | KeyCode::Char('h') => app.select_prev().await,
                        KeyCode::Char('>') => {
                            let cmd = app.carousel.scroll_right();
                            app.start_scroll(cmd);
                        }
                        KeyCode::Char('<') => {
                            let cmd = app.carousel.scroll_left();
                            app.start_scroll(cmd);
                        }
                        KeyCode::Char('w') => app.toggle_wishlist().await,
                        KeyCode::Char('p') => app.toggle_price_alert().await,
                        KeyCode::Char('/') => app.mode = InputMode::Search,
                        _ => {}
                    },
                },
                _ => {}
            }
        }

        if app.last_refresh.elapsed() >= refresh_interval {
            app.refresh().await;
            app.measure(rail_width(terminal.size()?.width));
        }
    }
}

/// Inner width of the rail block.
fn rail_width(terminal_width: u16) -> u16 {
    terminal_width.saturating_sub(4)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // Outer vertical split: header | rail | detail | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(6), // rail
            Constraint::Min(0),    // detail
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_rail(f, app, chunks[1]);
    render_detail(f, app, chunks[2]);
    render_footer(f, app, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };
    let (who, who_color) = if app.signed_in() {
        ("signed in", Color::White)
    } else {
        ("browsing signed out", Color::DarkGray)
    };
    let rail_title = app.rail.as_ref().map_or("—", |r| r.kind.title());

    let mut spans = vec![
        Span::styled(
            " Hoard Valley  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(who, Style::default().fg(who_color)),
        Span::raw("  │  "),
        Span::styled(rail_title, Style::default().fg(Color::White)),
    ];
    if !app.search.is_empty() || app.mode == InputMode::Search {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(format!("/{}", app.search), Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(paragraph, area);
}

/// Title split into highlighted spans for the current search term.
fn title_spans(title: &str, term: &str, base: Style) -> Vec<Span<'static>> {
    highlight(title, term)
        .into_iter()
        .map(|seg| {
            let style = if seg.matched {
                base.fg(Color::Black).bg(Color::Yellow)
            } else {
                base
            };
            Span::styled(seg.text, style)
        })
        .collect()
}

fn render_rail(f: &mut Frame, app: &AppState, area: Rect) {
    let left = if app.carousel.can_scroll_left() { "◀ " } else { "  " };
    let right = if app.carousel.can_scroll_right() { " ▶" } else { "  " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {left}RAIL{right} "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let offset = app.carousel.offset().round() as i64;
    for (i, item) in app.items().iter().enumerate() {
        let x = i as i64 * i64::from(CARD_WIDTH) - offset;
        // Only whole cards are drawn.
        if x < 0 || x + i64::from(CARD_WIDTH) > i64::from(inner.width) {
            continue;
        }
        let card = Rect {
            x: inner.x + x as u16,
            y: inner.y,
            width: CARD_WIDTH - 1,
            height: inner.height,
        };
        let selected = i == app.selected;
        let border = if selected { Color::Cyan } else { Color::DarkGray };
        let base = if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let lines = vec![
            Line::from(title_spans(&truncate(&item.title, (CARD_WIDTH - 3) as usize), &app.search, base)),
            Line::from(Span::styled(format_price(item.price), Style::default().fg(Color::Green))),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(border)));
        f.render_widget(paragraph, card);
    }
}

fn render_detail(f: &mut Frame, app: &AppState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let block = |title: &'static str| {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
    };

    let Some(sel) = app.selection.as_ref() else {
        f.render_widget(Paragraph::new("Nothing to show").block(block(" ITEM ")), halves[0]);
        f.render_widget(Paragraph::new("").block(block(" PRICE HISTORY ")), halves[1]);
        return;
    };

    let toggle_style = |armed: bool| {
        if armed {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        }
    };
    let mut lines = vec![
        Line::from(title_spans(&sel.item.title, &app.search, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled(format_price(sel.item.price), Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::styled(
                sel.item.condition.clone().unwrap_or_default(),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("[w] ", Style::default().fg(Color::Yellow)),
            Span::styled(sel.wishlist.label(), toggle_style(sel.wishlist.is_armed())),
        ]),
        Line::from(vec![
            Span::styled("[p] ", Style::default().fg(Color::Yellow)),
            Span::styled(sel.price_alert.label(), toggle_style(sel.price_alert.is_armed())),
        ]),
    ];
    if let Some(form) = sel.price_alert.form() {
        lines.push(Line::from(vec![
            Span::raw("    target: $"),
            Span::styled(form.target_price.clone(), Style::default().fg(Color::Yellow)),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]));
        if let Some(err) = &form.error {
            lines.push(Line::from(Span::styled(format!("    {err}"), Style::default().fg(Color::Red))));
        }
    }
    for err in [sel.wishlist.error(), sel.price_alert.error()].into_iter().flatten() {
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
    }
    f.render_widget(Paragraph::new(lines).block(block(" ITEM ")), halves[0]);

    let series = sel.history.series();
    if series.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("No price changes", Style::default().fg(Color::DarkGray)))
                .block(block(" PRICE HISTORY ")),
            halves[1],
        );
    } else {
        let sparkline = Sparkline::default()
            .block(block(" PRICE HISTORY "))
            .data(sparkline_points(&series))
            .style(Style::default().fg(Color::Cyan));
        f.render_widget(sparkline, halves[1]);
    }
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let line = match (&app.mode, &app.message) {
        (InputMode::Search, _) => Line::from(vec![
            Span::styled(" [enter/esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("done searching"),
        ]),
        (InputMode::TargetPrice, _) => Line::from(vec![
            Span::styled(" [enter] ", Style::default().fg(Color::Yellow)),
            Span::raw("set alert  "),
            Span::styled("[esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("cancel"),
        ]),
        (InputMode::Browse, Some(msg)) => Line::from(vec![
            Span::styled(format!(" {msg}  "), Style::default().fg(Color::Magenta)),
            Span::styled("[esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("dismiss"),
        ]),
        (InputMode::Browse, None) => Line::from(vec![
            Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
            Span::raw("quit  "),
            Span::styled("[r] ", Style::default().fg(Color::Yellow)),
            Span::raw("refresh  "),
            Span::styled("[←→ / h l] ", Style::default().fg(Color::Yellow)),
            Span::raw("select  "),
            Span::styled("[< >] ", Style::default().fg(Color::Yellow)),
            Span::raw("scroll  "),
            Span::styled("[w p] ", Style::default().fg(Color::Yellow)),
            Span::raw("wishlist / price alert  "),
            Span::styled("[/] ", Style::default().fg(Color::Yellow)),
            Span::raw("search"),
        ]),
    };
    f.render_widget(Paragraph::new(line).style(Style::default().fg(Color::White)), area);
}
