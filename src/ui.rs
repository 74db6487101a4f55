use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::journal::JournalReport;
use crate::scoring::CharState;
use crate::session::{SessionSnapshot, Status};
use crate::typing_policy::{BlockReason, InputDecision};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Renders a session snapshot. Purely presentational: everything shown is
/// derived from the snapshot and, once finished, the journal report.
pub struct TypingView<'a> {
    pub snapshot: &'a SessionSnapshot,
    pub report: Option<&'a JournalReport>,
}

impl<'a> TypingView<'a> {
    pub fn new(snapshot: &'a SessionSnapshot) -> Self {
        Self {
            snapshot,
            report: None,
        }
    }

    pub fn with_report(mut self, report: &'a JournalReport) -> Self {
        self.report = Some(report);
        self
    }

    fn prompt_lines(&self) -> Vec<Line<'static>> {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = bold_style.fg(Color::Green);
        let red_bold_style = bold_style.fg(Color::Red);
        let dim_bold_style = bold_style.add_modifier(Modifier::DIM);
        let cursor_style = dim_bold_style.add_modifier(Modifier::UNDERLINED);

        let mut lines = Vec::new();
        let mut spans = Vec::new();
        for (idx, cs) in self.snapshot.character_states.iter().enumerate() {
            let style = match cs.state {
                CharState::Correct => green_bold_style,
                CharState::Incorrect => red_bold_style,
                CharState::Default if idx == self.snapshot.cursor_pos => cursor_style,
                CharState::Default => dim_bold_style,
            };
            let shown = match (cs.ch, cs.state) {
                ('\n', _) => "↵".to_string(),
                (' ', CharState::Incorrect) => "·".to_string(),
                (c, _) => c.to_string(),
            };
            spans.push(Span::styled(shown, style));

            if cs.ch == '\n' {
                lines.push(Line::from(std::mem::take(&mut spans)));
            }
        }
        if !spans.is_empty() {
            lines.push(Line::from(spans));
        }
        lines
    }

    fn status_line(&self) -> Line<'static> {
        let stats = self.snapshot.stats;
        let mut spans = vec![Span::styled(
            format!("{} wpm   {}% acc", stats.wpm, stats.accuracy),
            Style::default().add_modifier(Modifier::BOLD),
        )];

        if let Some(InputDecision::Block(reason)) = self.snapshot.last_decision {
            let message = match reason {
                BlockReason::GateTyposPresent => "fix typos first",
                BlockReason::StrictSpaceBoundary => "type a space",
            };
            spans.push(Span::raw("   "));
            spans.push(Span::styled(
                message,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ));
        }
        Line::from(spans)
    }
}

impl Widget for TypingView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        if self.snapshot.status == Status::Idle {
            Paragraph::new(Span::styled("no text loaded", dim_style))
                .alignment(Alignment::Center)
                .render(area, buf);
            return;
        }

        let prompt = self.prompt_lines();
        let widest = prompt
            .iter()
            .map(|l| l.to_string().width())
            .max()
            .unwrap_or(0);
        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let wrapped_lines = prompt
            .iter()
            .map(|l| l.to_string().width().div_ceil(max_chars_per_line as usize).max(1))
            .fold(0usize, usize::saturating_add);
        let wrapped_lines = u16::try_from(wrapped_lines)
            .unwrap_or(u16::MAX)
            .min(area.height);

        let report_lines = self
            .report
            .map(|r| r.to_string().lines().count())
            .map_or(0, |n| u16::try_from(n).unwrap_or(u16::MAX));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(wrapped_lines),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(report_lines),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(prompt)
            // short prompts read better centered
            .alignment(if widest <= max_chars_per_line as usize {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(chunks[1], buf);

        Paragraph::new(self.status_line())
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        if let Some(report) = self.report {
            Paragraph::new(report.to_string())
                .alignment(Alignment::Left)
                .render(chunks[4], buf);
        }

        let legend = match self.snapshot.status {
            Status::Finished => "(ctrl-r) new text   (esc) quit",
            _ => "(ctrl-r) restart   (esc) quit",
        };
        Paragraph::new(Span::styled(legend, dim_style.add_modifier(Modifier::ITALIC)))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }
}
