use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::catalog::WritingSystem;
use crate::store::score_store::CharacterScores;
use crate::ui::theme::Theme;

/// Terminal cells per grid slot.
const CELL_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreLevel {
    Clean,
    Shaky,
    Weak,
}

impl ScoreLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0 => ScoreLevel::Clean,
            1..=2 => ScoreLevel::Shaky,
            _ => ScoreLevel::Weak,
        }
    }
}

/// Rows of character indices to draw: the writing system's own grid when it
/// has one, else the catalog order wrapped to `columns`.
pub fn grid_rows(writing_system: &WritingSystem, columns: usize) -> Vec<Vec<Option<usize>>> {
    if let Some(layout) = &writing_system.layout {
        return layout.cells.clone();
    }
    let columns = columns.max(1);
    (0..writing_system.len())
        .collect::<Vec<_>>()
        .chunks(columns)
        .map(|chunk| chunk.iter().copied().map(Some).collect())
        .collect()
}

/// Overview of every character in the writing system, colored by score.
pub struct CharacterGrid<'a> {
    writing_system: &'a WritingSystem,
    scores: Option<&'a CharacterScores>,
    current: Option<usize>,
    theme: &'a Theme,
}

impl<'a> CharacterGrid<'a> {
    pub fn new(
        writing_system: &'a WritingSystem,
        scores: Option<&'a CharacterScores>,
        current: Option<usize>,
        theme: &'a Theme,
    ) -> Self {
        Self {
            writing_system,
            scores,
            current,
            theme,
        }
    }
}

impl Widget for CharacterGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("quiz.characters")))
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let columns = (inner.width as usize / CELL_WIDTH).max(1);
        let lines: Vec<Line> = grid_rows(self.writing_system, columns)
            .into_iter()
            .map(|row| {
                let spans: Vec<Span> = row
                    .into_iter()
                    .map(|cell| {
                        let Some(index) = cell else {
                            return Span::raw(" ".repeat(CELL_WIDTH));
                        };
                        let Some(character) = self.writing_system.character(index) else {
                            return Span::raw(" ".repeat(CELL_WIDTH));
                        };
                        let score = self
                            .scores
                            .and_then(|s| s.get(character.id()))
                            .copied()
                            .unwrap_or(0);
                        let mut style = match ScoreLevel::from_score(score) {
                            ScoreLevel::Clean => Style::default().fg(colors.fg()),
                            ScoreLevel::Shaky => Style::default().fg(colors.warning()),
                            ScoreLevel::Weak => Style::default().fg(colors.failed()),
                        };
                        if self.current == Some(index) {
                            style = style.fg(colors.accent()).add_modifier(Modifier::REVERSED);
                        }
                        Span::styled(format!(" {:<3}", character.display()), style)
                    })
                    .collect();
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_score_levels() {
        assert_eq!(ScoreLevel::from_score(0), ScoreLevel::Clean);
        assert_eq!(ScoreLevel::from_score(2), ScoreLevel::Shaky);
        assert_eq!(ScoreLevel::from_score(7), ScoreLevel::Weak);
    }

    #[test]
    fn test_grid_rows_wraps_without_layout() {
        let catalog = Catalog::embedded().unwrap();
        let (l, w) = catalog.find("el-GR", "Uppercase").unwrap();
        let ws = catalog.writing_system(l, w).unwrap();
        let rows = grid_rows(ws, 10);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 10);
        assert_eq!(rows[2].len(), 4);
        assert_eq!(rows[2][3], Some(23));
    }

    #[test]
    fn test_grid_rows_uses_layout() {
        let catalog = Catalog::embedded().unwrap();
        let (l, w) = catalog.find("ja-JP", "Katakana").unwrap();
        let ws = catalog.writing_system(l, w).unwrap();
        let rows = grid_rows(ws, 3);
        assert_eq!(rows.len(), 11);
        assert!(rows.iter().all(|r| r.len() == 5));
    }
}
