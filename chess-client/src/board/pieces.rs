//! 棋子字符

use protocol::{Color, Piece, PieceKind};

/// 棋子的 Unicode 字符
pub fn piece_glyph(piece: Piece) -> char {
    match (piece.kind, piece.color) {
        (PieceKind::King, Color::White) => '♔',
        (PieceKind::Queen, Color::White) => '♕',
        (PieceKind::Rook, Color::White) => '♖',
        (PieceKind::Bishop, Color::White) => '♗',
        (PieceKind::Knight, Color::White) => '♘',
        (PieceKind::Pawn, Color::White) => '♙',
        (PieceKind::King, Color::Black) => '♚',
        (PieceKind::Queen, Color::Black) => '♛',
        (PieceKind::Rook, Color::Black) => '♜',
        (PieceKind::Bishop, Color::Black) => '♝',
        (PieceKind::Knight, Color::Black) => '♞',
        (PieceKind::Pawn, Color::Black) => '♟',
    }
}
