use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use province_timeline::{
    Control, FilterCategory, HiddenReason, MapBounds, Scene, Session, SessionEvent, SymbolState,
    MIN_RADIUS,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Map, MapResolution},
        Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use std::io;

/// Symbol radii are in screen pixels; the canvas works in degrees.
const DEGREES_PER_PIXEL: f64 = 0.08;

pub struct App {
    pub session: Session<Scene>,
    pub bounds: MapBounds,
    pub state: TableState,
    pub show_detail: bool,
}

impl App {
    pub fn new(session: Session<Scene>, bounds: MapBounds) -> Self {
        let mut state = TableState::default();
        if !session.features().is_empty() {
            state.select(Some(0));
        }

        Self {
            session,
            bounds,
            state,
            show_detail: false,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_state(&self) -> Option<&SymbolState> {
        self.state.selected().and_then(|i| self.session.states().get(i))
    }

    pub fn apply_filter(&mut self, filter: FilterCategory) {
        self.session.handle(SessionEvent::FilterClicked(filter));
    }

    pub fn next(&mut self) {
        let len = self.session.states().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.session.states().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn visible_count(&self) -> usize {
        self.session.states().iter().filter(|s| s.visible).count()
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Right | KeyCode::Char('l') => {
                    app.session.handle(SessionEvent::StepForward);
                }
                KeyCode::Left | KeyCode::Char('h') => {
                    app.session.handle(SessionEvent::StepBack);
                }
                KeyCode::Home => {
                    app.session.handle(SessionEvent::SliderMoved(0));
                }
                KeyCode::End => {
                    let last = app.session.years().len().saturating_sub(1);
                    app.session.handle(SessionEvent::SliderMoved(last));
                }
                KeyCode::Char('1') | KeyCode::Char('a') => app.apply_filter(FilterCategory::All),
                KeyCode::Char('2') | KeyCode::Char('g') => app.apply_filter(FilterCategory::Good),
                KeyCode::Char('3') | KeyCode::Char('b') => app.apply_filter(FilterCategory::Bad),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter buttons
            Constraint::Min(0),    // Map + side panel
            Constraint::Length(3), // Time slider
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(62), // Map
            Constraint::Percentage(38), // Provinces + legend
        ])
        .split(chunks[1]);

    render_map(f, content_chunks[0], app);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(7)])
        .split(content_chunks[1]);

    if app.show_detail {
        render_detail_panel(f, side_chunks[0], app);
    } else {
        render_table(f, side_chunks[0], app);
    }
    render_legend(f, side_chunks[1], app);

    render_slider(f, chunks[2], app);
    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let active = app.session.view().filter;

    let mut spans = vec![Span::raw(" Filter: ")];
    for (i, category) in FilterCategory::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *category == active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{} {}", i + 1, category), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Year: {}", app.session.current_year()),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Shown: {}/{}", app.visible_count(), app.session.features().len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_map(f: &mut Frame, area: Rect, app: &App) {
    let bounds = app.bounds;
    let selected = app.state.selected();
    let layer = app.session.layer();

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Map "),
        )
        .x_bounds([bounds.west, bounds.east])
        .y_bounds([bounds.south, bounds.north])
        .paint(move |ctx| {
            ctx.draw(&Map {
                resolution: MapResolution::High,
                color: Color::DarkGray,
            });
            ctx.layer();

            for scene_symbol in layer.visible() {
                let symbol = &scene_symbol.symbol;
                let is_selected = selected == Some(symbol.feature.0);
                ctx.draw(&Circle {
                    x: symbol.position.lon,
                    y: symbol.position.lat,
                    radius: symbol.radius * DEGREES_PER_PIXEL,
                    color: if is_selected { Color::Yellow } else { Color::White },
                });
            }
        });

    f.render_widget(canvas, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Province", "Value", "Radius", "Status"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.session.states().iter().map(|state| {
        let (status, color) = match state.hidden {
            None => ("shown", Color::Green),
            Some(HiddenReason::FilteredOut) => ("filtered", Color::DarkGray),
            Some(HiddenReason::MissingValue) => ("no data", Color::Red),
        };
        let value = state
            .value
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        let radius = if state.visible {
            format!("{:.1}", state.radius)
        } else {
            "-".to_string()
        };

        Row::new(vec![
            Cell::from(truncate(&state.province, 16)),
            Cell::from(value),
            Cell::from(radius),
            Cell::from(status).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Provinces "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Popup ");

    let popup = app
        .selected_state()
        .and_then(|state| app.session.layer().symbol(state.feature))
        .filter(|s| s.visible)
        .and_then(|s| s.popup.as_ref());

    let content = match popup {
        Some(popup) => {
            let mut lines = vec![Line::from("")];
            for part in popup.text.split("; ") {
                lines.push(Line::from(vec![Span::raw("  "), Span::raw(part.to_string())]));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  Press Enter to close",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
            lines
        }
        None => vec![Line::from("  Province not shown for this year/filter")],
    };

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_legend(f: &mut Frame, area: Rect, app: &App) {
    let legend = match app.session.surface().control(app.session.legend_control()) {
        Some(Control::Legend(legend)) => legend,
        _ => app.session.legend(),
    };

    // Dot width tracks each reference radius against the largest one
    let max_radius = legend.max_radius().max(MIN_RADIUS);
    let lines: Vec<Line> = legend
        .entries
        .iter()
        .map(|entry| {
            let dots = legend_dots(entry.reference_radius, max_radius);
            Line::from(vec![
                Span::styled(format!("  {:<4}", dots), Style::default().fg(Color::Gray)),
                Span::styled(format!("{:<5}", entry.key), Style::default().fg(Color::Yellow)),
                Span::raw(format!("{:>8}", entry.reference_label)),
                Span::styled(
                    format!("  r={:.1}", entry.reference_radius),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", legend.title)),
    );

    f.render_widget(paragraph, area);
}

/// One to four dots, scaled by `radius / max_radius`.
fn legend_dots(radius: f64, max_radius: f64) -> String {
    let count = ((radius / max_radius) * 4.0).ceil().clamp(1.0, 4.0) as usize;
    "●".repeat(count)
}

fn render_slider(f: &mut Frame, area: Rect, app: &App) {
    let view = app.session.view();
    let last = app.session.years().len().saturating_sub(1);
    let ratio = if last == 0 {
        1.0
    } else {
        view.index as f64 / last as f64
    };

    let first = app.session.years().first().map(|y| y.to_string()).unwrap_or_default();
    let end = app.session.years().last().map(|y| y.to_string()).unwrap_or_default();

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ◀ year ▶ {} ", first, end)),
        )
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{} ({}/{})", app.session.current_year(), view.index + 1, last + 1));

    f.render_widget(gauge, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.session.states().len();

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("←/→", Style::default().fg(Color::Yellow)),
        Span::raw(" Year | "),
        Span::styled("1-3", Style::default().fg(Color::Yellow)),
        Span::raw(" Filter | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Province | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Popup | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
