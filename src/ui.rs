use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Table,
        canvas::{Canvas, Line as CanvasLine, Rectangle},
    },
};

use crate::candles::Candle;
use crate::config::{CANDLE_INTERVAL_MS, FEE_POLL_INTERVAL};
use crate::network::Network;
use crate::simulate::{TransactionKind, simulate};
use crate::store::{AppSnapshot, FeeStore, Mode};

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    None,
    Quit,
    /// Switched into live mode; pollers should be (re)started.
    GoLive,
}

pub struct Dashboard {
    pub should_quit: bool,
    sim_input: String,
    sim_kind: TransactionKind,
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            sim_input: String::new(),
            sim_kind: TransactionKind::default(),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn handle_key(&mut self, key: KeyCode, store: &FeeStore) -> UiAction {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.quit();
                UiAction::Quit
            }
            KeyCode::Tab => {
                store.set_selected_network(store.selected_network().next());
                UiAction::None
            }
            KeyCode::Char(c @ '1'..='9') if store.mode() == Mode::Live => {
                let idx = (c as usize) - ('1' as usize);
                if let Some(network) = Network::ALL.get(idx) {
                    store.set_selected_network(*network);
                }
                UiAction::None
            }
            KeyCode::Char('m') => match store.mode() {
                Mode::Live => {
                    store.set_mode(Mode::Simulation);
                    UiAction::None
                }
                Mode::Simulation => {
                    store.set_mode(Mode::Live);
                    UiAction::GoLive
                }
            },
            KeyCode::Char('t') if store.mode() == Mode::Simulation => {
                self.sim_kind = self.sim_kind.next();
                UiAction::None
            }
            KeyCode::Char(c) if store.mode() == Mode::Simulation && (c.is_ascii_digit() || c == '.') => {
                if c != '.' || !self.sim_input.contains('.') {
                    self.sim_input.push(c);
                }
                UiAction::None
            }
            KeyCode::Backspace if store.mode() == Mode::Simulation => {
                self.sim_input.pop();
                UiAction::None
            }
            _ => UiAction::None,
        }
    }

    pub fn render(&self, frame: &mut Frame, snapshot: &AppSnapshot, candles: &[Candle]) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // price
                Constraint::Length(7), // fees / simulation
                Constraint::Min(10),   // chart
                Constraint::Length(4), // help
            ])
            .split(frame.area());

        self.render_price(frame, chunks[0], snapshot);
        match snapshot.mode {
            Mode::Live => self.render_fee_table(frame, chunks[1], snapshot),
            Mode::Simulation => self.render_simulation(frame, chunks[1], snapshot),
        }
        self.render_chart(frame, chunks[2], snapshot.selected, candles);
        self.render_help(frame, chunks[3], snapshot.mode);
    }

    fn render_price(&self, frame: &mut Frame, area: Rect, snapshot: &AppSnapshot) {
        let mut parts = vec![
            Span::styled("ETH/USD: ", Style::default()),
            Span::styled(
                format!("${:.2}", snapshot.price.value),
                Style::default().fg(Color::Green),
            ),
        ];
        if !snapshot.price.healthy {
            parts.push(Span::styled(
                "  Warning: could not fetch live ETH/USD price, using a fallback value.",
                Style::default().fg(Color::Red),
            ));
        }
        let mode = match snapshot.mode {
            Mode::Live => Span::styled("  | Live", Style::default().fg(Color::Cyan)),
            Mode::Simulation => Span::styled("  | Simulation", Style::default().fg(Color::Magenta)),
        };
        parts.push(mode);

        let paragraph = Paragraph::new(Line::from(parts))
            .block(Block::default().title("Price").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_fee_table(&self, frame: &mut Frame, area: Rect, snapshot: &AppSnapshot) {
        let header = Row::new(vec!["Network", "Base Fee (Gwei)", "Priority Fee (Gwei)", "Samples"])
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = snapshot.networks.iter().map(|(network, state)| {
            let style = if *network == snapshot.selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(network.display_name()),
                Cell::from(format!("{:.2}", state.base_fee)),
                Cell::from(format!("{:.2}", state.priority_fee)),
                Cell::from(state.history.len().to_string()),
            ])
            .style(style)
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(18),
                Constraint::Length(22),
                Constraint::Min(8),
            ],
        )
        .header(header)
        .block(Block::default().title("Gas").borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn render_simulation(&self, frame: &mut Frame, area: Rect, snapshot: &AppSnapshot) {
        let value = self.sim_input.parse::<f64>().unwrap_or(0.0);
        let input = if self.sim_input.is_empty() {
            "(type a USD amount)".to_string()
        } else {
            format!("${}", self.sim_input)
        };

        let mut lines = vec![Line::from(vec![
            Span::styled("Value: ", Style::default()),
            Span::styled(input, Style::default().fg(Color::Cyan)),
            Span::raw("  |  Type: "),
            Span::styled(self.sim_kind.label(), Style::default().fg(Color::Yellow)),
        ])];

        match simulate(snapshot, value, self.sim_kind) {
            Some(result) => {
                lines.push(Line::from(vec![
                    Span::styled("Network: ", Style::default()),
                    Span::styled(result.network.display_name(), Style::default().fg(Color::Blue)),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Gas cost: ", Style::default()),
                    Span::styled(
                        format!("${:.4}", result.gas_cost_usd),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::styled(
                        format!("  ({:.8} native)", result.gas_cost_native),
                        Style::default().fg(Color::Gray),
                    ),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Total: ", Style::default()),
                    Span::styled(
                        format!("${:.2}", result.total_cost_usd),
                        Style::default().fg(Color::Green),
                    ),
                ]));
            }
            None => lines.push(Line::from(Span::styled(
                "Enter a positive value to simulate.",
                Style::default().fg(Color::DarkGray),
            ))),
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().title("Gas Simulator").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_chart(&self, frame: &mut Frame, area: Rect, network: Network, candles: &[Candle]) {
        let title = format!(
            "Base Fee - {} ({}s candles)",
            network.display_name(),
            CANDLE_INTERVAL_MS / 1000
        );
        let block = Block::default().title(title).borders(Borders::ALL);

        if candles.is_empty() {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                "(no samples yet)",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        // Keep as many of the newest candles as fit, one column pair each.
        let max_candles = (area.width.saturating_sub(2) / 2).max(1) as usize;
        let visible = &candles[candles.len().saturating_sub(max_candles)..];
        let (low, high) = y_range(visible);

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds([0.0, visible.len() as f64])
            .y_bounds([low, high])
            .paint(|ctx| {
                for (i, candle) in visible.iter().enumerate() {
                    let x = i as f64 + 0.5;
                    let color = if candle.is_rising() {
                        Color::Green
                    } else {
                        Color::Red
                    };
                    ctx.draw(&CanvasLine {
                        x1: x,
                        y1: candle.low,
                        x2: x,
                        y2: candle.high,
                        color,
                    });
                    let body_low = candle.open.min(candle.close);
                    let body_high = candle.open.max(candle.close);
                    ctx.draw(&Rectangle {
                        x: x - 0.3,
                        y: body_low,
                        width: 0.6,
                        height: body_high - body_low,
                        color,
                    });
                }
            });
        frame.render_widget(canvas, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect, mode: Mode) {
        let keys = match mode {
            Mode::Live => "'q' quit | Tab/1-3 network | 'm' simulation",
            Mode::Simulation => "'q' quit | Tab network | 'm' live | 't' type | digits/Backspace value",
        };
        let help_text = vec![
            Line::from(Span::styled(keys, Style::default().fg(Color::Yellow))),
            Line::from(vec![
                Span::styled("Fees update every ", Style::default()),
                Span::styled(
                    format!("{} seconds", FEE_POLL_INTERVAL.as_secs()),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
        ];
        let paragraph =
            Paragraph::new(help_text).block(Block::default().title("Help").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }
}

/// Vertical bounds with a little headroom so flat series stay visible.
fn y_range(candles: &[Candle]) -> (f64, f64) {
    let low = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((high - low) * 0.1).max(0.01);
    ((low - pad).max(0.0), high + pad)
}
