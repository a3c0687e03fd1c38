use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::session::quiz::{Phase, SessionView};
use crate::ui::theme::Theme;

/// Prompt and response box for the current character.
pub struct QuizArea<'a> {
    view: &'a SessionView<'a>,
    theme: &'a Theme,
}

impl<'a> QuizArea<'a> {
    pub fn new(view: &'a SessionView<'a>, theme: &'a Theme) -> Self {
        Self { view, theme }
    }
}

/// Text shown as the prompt. Hidden between characters so the next one only
/// appears once input is accepted again.
fn prompt_text<'v>(view: &SessionView<'v>) -> Option<&'v str> {
    match view.phase {
        Phase::Presenting | Phase::AwaitingAdvance => view.character.map(|c| c.query()),
        Phase::Idle | Phase::Settling => None,
    }
}

impl Widget for QuizArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(inner);

        if self.view.phase == Phase::Idle {
            Paragraph::new(t!("quiz.idle").to_string())
                .alignment(Alignment::Center)
                .style(Style::default().fg(colors.pending()))
                .render(rows[0], buf);
            return;
        }

        let glyph_style = match self.view.phase {
            Phase::AwaitingAdvance => Style::default()
                .fg(colors.solved())
                .add_modifier(Modifier::BOLD),
            _ => Style::default()
                .fg(colors.glyph())
                .add_modifier(Modifier::BOLD),
        };
        let prompt = prompt_text(self.view).unwrap_or("");
        let top_pad = rows[0].height.saturating_sub(1) / 2;
        let mut prompt_lines: Vec<Line> = (0..top_pad).map(|_| Line::from("")).collect();
        prompt_lines.push(Line::from(Span::styled(prompt.to_string(), glyph_style)));
        Paragraph::new(prompt_lines)
            .alignment(Alignment::Center)
            .render(rows[0], buf);

        let response_block = Block::bordered()
            .title(format!(" {} ", t!("quiz.response")))
            .border_style(Style::default().fg(if self.view.phase == Phase::Presenting {
                colors.accent()
            } else {
                colors.accent_dim()
            }));
        let cursor = if self.view.phase == Phase::Presenting { "▏" } else { "" };
        Paragraph::new(Line::from(vec![
            Span::styled(
                self.view.response.to_string(),
                Style::default().fg(colors.response()),
            ),
            Span::styled(cursor, Style::default().fg(colors.accent())),
        ]))
        .block(response_block)
        .alignment(Alignment::Center)
        .render(rows[1], buf);

        if self.view.is_character_failed && self.view.phase == Phase::Presenting {
            Paragraph::new(t!("quiz.failed").to_string())
                .alignment(Alignment::Center)
                .style(Style::default().fg(colors.failed()))
                .render(rows[2], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::catalog::Catalog;
    use crate::session::quiz::QuizSession;
    use crate::session::speech::SilentSpeaker;
    use crate::store::json_store::MemoryStore;
    use crate::store::score_store::ScoreStore;

    fn session() -> QuizSession {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let store = ScoreStore::new(Box::new(MemoryStore::new()));
        QuizSession::new(catalog, store, Box::new(SilentSpeaker))
    }

    #[test]
    fn test_prompt_hidden_when_idle() {
        let s = session();
        assert_eq!(prompt_text(&s.view()), None);
    }

    #[test]
    fn test_prompt_shows_query() {
        let mut s = session();
        s.select_by_name("el-GR", "Lowercase", Instant::now()).unwrap();
        assert_eq!(prompt_text(&s.view()), Some("α"));
    }

    #[test]
    fn test_render_does_not_panic_on_small_area() {
        let mut s = session();
        s.select_by_name("ja-JP", "Hiragana", Instant::now()).unwrap();
        let theme = Theme::default();
        let view = s.view();
        let area = Rect::new(0, 0, 6, 4);
        let mut buf = Buffer::empty(area);
        QuizArea::new(&view, &theme).render(area, &mut buf);
    }
}
