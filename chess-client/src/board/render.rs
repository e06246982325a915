//! 终端渲染

use std::io::Write;

use super::{piece_glyph, BoardView, PlayerLine, Renderer, SquareView};
use crate::network::ConnectionState;

/// 以文本形式把棋盘写入终端
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_view(&mut self, view: &BoardView) -> std::io::Result<()> {
        writeln!(self.out, "{}", format_player(&view.top))?;
        for row in &view.rows {
            let rank = row.first().map(|cell| cell.square.rank_char()).unwrap_or(' ');
            write!(self.out, "{} ", rank)?;
            for cell in row {
                write!(self.out, "{}", format_cell(cell))?;
            }
            writeln!(self.out)?;
        }
        let files: String = view
            .rows
            .first()
            .map(|row| row.iter().map(|cell| format!(" {} ", cell.square.file_char())).collect())
            .unwrap_or_default();
        writeln!(self.out, "  {}", files)?;
        writeln!(self.out, "{}", format_player(&view.bottom))?;

        match (view.winner, view.turn) {
            (Some(winner), _) => writeln!(self.out, "Game over: {:?}", winner)?,
            (None, Some(_)) if view.my_turn => writeln!(self.out, "Your turn")?,
            (None, Some(turn)) => writeln!(self.out, "Waiting for {}", turn)?,
            (None, None) => {}
        }
        self.out.flush()
    }
}

fn format_player(line: &PlayerLine) -> String {
    let marker = if line.to_move { '>' } else { ' ' };
    format!("{} {} ({})", marker, line.name, line.color)
}

fn format_cell(cell: &SquareView) -> String {
    let glyph = match &cell.piece {
        Some(piece) => piece_glyph(piece.piece()),
        None if cell.light => '·',
        None => ' ',
    };
    let (open, close) = if cell.selected {
        ('[', ']')
    } else if cell.highlighted {
        ('(', ')')
    } else if cell.last_move {
        ('\'', '\'')
    } else {
        (' ', ' ')
    };
    format!("{}{}{}", open, glyph, close)
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, view: &BoardView) {
        if let Err(e) = self.write_view(view) {
            tracing::error!("Failed to render board: {}", e);
        }
    }

    fn show_error(&mut self, message: &str) {
        if let Err(e) = writeln!(self.out, "! {}", message) {
            tracing::error!("Failed to write error: {}", e);
        }
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        if let Err(e) = writeln!(self.out, "~ connection {:?}", state) {
            tracing::error!("Failed to write connection state: {}", e);
        }
    }
}
