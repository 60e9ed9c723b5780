use std::io::stdout;

use color_eyre::eyre::Result;
use crossterm::event::{
    Event,
    EventStream,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use futures::StreamExt;
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::{
    client::AppSnapshot,
    ledger::format_units,
    wheel::ColorKey,
};

pub enum UserEvent {
    Quit,
    Spin,
    Approve,
    BuyTokens,
    Refresh,
    Redraw,
}

pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // One persistent Terminal so buffers survive across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn event_stream() -> EventStream {
    EventStream::new()
}

pub async fn next_event(
    events: &mut EventStream,
    state: &mut UiState,
) -> Result<UserEvent> {
    loop {
        let Some(event) = events.next().await else {
            return Ok(UserEvent::Quit);
        };
        let Event::Key(key) = event? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match &state.mode {
            Mode::QuitModal => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    return Ok(UserEvent::Redraw);
                }
                _ => {}
            },
            Mode::Normal => {
                return Ok(match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        state.mode = Mode::QuitModal;
                        UserEvent::Redraw
                    }
                    KeyCode::Char('s') => UserEvent::Spin,
                    KeyCode::Char('a') => UserEvent::Approve,
                    KeyCode::Char('b') => UserEvent::BuyTokens,
                    KeyCode::Char('r') => UserEvent::Refresh,
                    _ => continue,
                });
            }
        }
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // status
            Constraint::Length(5), // wheel strip
            Constraint::Length(4), // last outcome
            Constraint::Length(7), // errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    draw_wheel(f, chunks[1], snap);
    draw_outcome(f, chunks[2], snap);
    draw_errors(f, chunks[3], snap);
    draw_help(f, chunks[4]);
    draw_modals(f, state);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let balance = match snap.balance {
        Some(amount) => format!("{} RLT", format_units(amount)),
        None => String::from("unknown"),
    };
    let approval = if snap.allowance.is_sufficient() {
        "approved"
    } else {
        "approval required"
    };
    let gauge = Paragraph::new(format!(
        "Player: {} | Balance: {} | Tokens: {} | Wager: {} RLT | Session: {}\n{}",
        snap.player,
        balance,
        approval,
        format_units(snap.wager_unit),
        snap.phase.name(),
        snap.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(gauge, area);
}

fn draw_wheel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    // Sector strip with the pointer parked on the current visual slot. The
    // accumulated angle is reduced modulo 360 here and only here.
    let mut spans: Vec<Span> = Vec::new();
    for (i, sector) in snap.sectors.iter().enumerate() {
        let style = Style::default().fg(sector_color(&sector.color));
        if i == snap.pointer_index {
            spans.push(Span::styled(
                format!("▾{}▾", sector.label),
                style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED),
            ));
        } else {
            spans.push(Span::styled(format!(" {} ", sector.label), style));
        }
    }
    let lines = vec![
        Line::from(spans),
        Line::from(format!(
            "rotation: {:.1}° (total {:.1}°)",
            snap.accumulated_angle.rem_euclid(360.0),
            snap.accumulated_angle
        )),
    ];
    let wheel =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Wheel"));
    f.render_widget(wheel, area);
}

fn draw_outcome(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = Vec::new();
    match &snap.last_outcome {
        Some(settled) => {
            let sector = snap.sectors.get(settled.visual_index);
            let label = sector.map(|s| s.label.as_str()).unwrap_or("?");
            lines.push(Line::from(format!(
                "Last spin: {} ({}x), payout {} RLT",
                label,
                settled.outcome.multiplier,
                format_units(settled.outcome.payout)
            )));
            lines.push(Line::from(format!(
                "ledger sector index {}",
                settled.outcome.protocol_index
            )));
        }
        None => lines.push(Line::styled("None", Style::default().fg(Color::DarkGray))),
    }
    let outcome = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Last Outcome"));
    f.render_widget(outcome, area);
}

fn draw_errors(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    if snap.errors.is_empty() {
        lines.push(Line::from("No errors"));
    } else {
        for e in &snap.errors {
            lines.push(Line::from(e.clone()));
        }
    }
    let color = if snap.errors.is_empty() {
        Color::Green
    } else {
        Color::Red
    };
    let errors = Paragraph::new(lines)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    f.render_widget(errors, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "s spin | a approve tokens | b buy tokens | r refresh | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    if let Mode::QuitModal = state.mode {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
        let p = Paragraph::new("Quit the game? (Y/N)");
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}

fn sector_color(key: &ColorKey) -> Color {
    match key.as_str() {
        "red" => Color::Red,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "orange" => Color::LightRed,
        "yellow" => Color::Yellow,
        _ => Color::White,
    }
}
