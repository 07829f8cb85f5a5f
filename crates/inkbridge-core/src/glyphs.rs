//! Single-stroke glyphs for writing text with the arm.
//!
//! Every glyph is one pen-down stroke described by offsets from the pen's
//! start position in a cell about two units wide. Offsets reach from
//! `y = -2.2` up to `y = 2`. Letters are case-insensitive.

use crate::geometry::{Point, Stroke};

/// Horizontal distance between consecutive cells, in glyph units.
pub const ADVANCE: f64 = 2.5;

type Offsets = &'static [(f64, f64)];

const GLYPHS: &[(char, Offsets)] = &[
    ('A', &[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0), (0.5, 1.0)]),
    ('B', &[(0.0, 0.0), (0.0, 2.0), (1.0, 1.0)]),
    ('C', &[(2.0, 2.0), (0.0, -2.0)]),
    ('D', &[(0.0, 0.0), (0.0, -2.0), (1.0, 0.0)]),
    ('E', &[(0.0, 0.0), (1.0, 0.0), (0.0, -1.0), (1.0, -2.0)]),
    ('F', &[(0.0, 0.0), (1.0, 0.0), (0.0, -1.0)]),
    ('G', &[(2.0, 2.0), (0.0, -2.0), (1.0, -1.0)]),
    ('H', &[(0.0, 0.0), (0.0, -2.0), (0.5, -1.0)]),
    ('I', &[(0.5, 0.0), (0.5, -2.0)]),
    ('J', &[(0.5, 0.0), (0.5, -1.0), (-0.5, -2.0)]),
    ('K', &[(0.0, 0.0), (1.0, -1.0), (1.0, 1.0)]),
    ('L', &[(0.0, 0.0), (0.0, -2.0), (1.0, -2.0)]),
    ('M', &[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0)]),
    ('N', &[(0.0, 0.0), (1.0, 2.0), (1.0, 0.0)]),
    ('O', &[(0.0, 0.0), (1.0, 1.0), (-1.0, -1.0)]),
    ('P', &[(0.0, 0.0), (0.0, 2.0), (1.0, 1.0)]),
    ('Q', &[(0.0, 0.0), (1.0, 1.0), (1.5, -1.5)]),
    ('R', &[(0.0, 0.0), (0.0, 2.0), (1.0, 1.0), (1.0, 0.0)]),
    ('S', &[(1.0, 0.0), (0.0, -1.0), (-1.0, 1.0)]),
    ('T', &[(0.5, 2.0), (0.5, 0.0), (0.0, 2.0)]),
    ('U', &[(0.5, 2.0), (0.5, 0.0), (1.0, 1.0)]),
    ('V', &[(0.0, 2.0), (1.0, 0.0), (2.0, 2.0)]),
    ('W', &[(0.0, 2.0), (1.0, 0.0), (2.0, 2.0)]),
    ('X', &[(0.0, 2.0), (1.0, 0.0), (0.0, 2.0)]),
    ('Y', &[(1.0, 2.0), (1.0, 0.0)]),
    ('Z', &[(0.0, 2.0), (1.0, 0.0), (0.0, 0.0)]),
    ('0', &[(0.0, 0.0), (1.0, -1.0), (-1.0, 1.0)]),
    ('1', &[(1.0, 0.0), (0.0, 2.0)]),
    ('2', &[(0.0, 0.0), (1.0, 0.0), (1.0, -1.0)]),
    ('3', &[(0.0, 0.0), (1.0, -1.0), (0.5, 0.0)]),
    ('4', &[(1.0, 0.0), (1.0, -2.0), (0.5, -1.0)]),
    ('5', &[(1.0, 2.0), (1.0, 0.0), (1.0, -1.0)]),
    ('6', &[(1.0, 2.0), (1.0, 0.0), (1.0, 2.0)]),
    ('7', &[(1.0, 2.0), (0.0, 0.0)]),
    ('8', &[(0.0, 0.0), (1.0, 2.0), (0.0, -2.0)]),
    ('9', &[(1.0, 2.0), (1.0, 0.0)]),
    ('!', &[(0.0, 0.0), (0.0, -2.0), (0.0, -2.2)]),
    ('@', &[(1.0, 0.0), (1.0, 1.0)]),
    ('#', &[(0.0, 1.0), (0.0, -2.0), (0.5, 0.5), (0.5, -0.5)]),
    ('$', &[(0.0, 1.0), (0.0, -1.0)]),
    ('%', &[(0.0, 1.0), (0.5, 1.0)]),
    ('^', &[(1.0, 0.0), (0.0, 2.0)]),
    ('&', &[(0.0, 2.0), (1.0, -1.0)]),
    ('*', &[(0.0, 1.0), (1.0, -1.0)]),
    ('(', &[(1.0, 2.0), (-1.0, -1.0)]),
    (')', &[(-1.0, 2.0), (1.0, -1.0)]),
    ('-', &[(0.0, -1.0), (1.0, -1.0)]),
    ('_', &[(0.0, -1.0), (1.0, -1.0)]),
    ('=', &[(0.0, -0.5), (1.0, -0.5), (1.0, -1.5)]),
    ('+', &[(0.5, 0.0), (0.5, -1.0), (0.0, -0.5)]),
    ('{', &[(1.0, 2.0), (0.0, -1.0)]),
    ('}', &[(-1.0, 2.0), (1.0, -1.0)]),
    ('[', &[(1.0, 2.0), (0.0, -2.0)]),
    (']', &[(1.0, 2.0), (0.0, -2.0), (1.0, -2.0)]),
    (':', &[(0.5, 1.0), (0.5, -1.0)]),
    (';', &[(0.5, 1.0), (0.5, -1.0), (0.2, -1.2)]),
    ('<', &[(1.0, 1.0), (0.0, 0.0)]),
    ('>', &[(0.0, 1.0), (1.0, 0.0)]),
    (',', &[(0.5, 0.0), (0.5, -0.5), (0.2, -1.0)]),
    ('.', &[(0.5, 0.0), (0.2, -1.0)]),
    ('?', &[(0.0, 2.0), (1.0, 1.0), (0.2, -1.0)]),
    ('/', &[(1.0, 2.0), (0.0, -1.0)]),
];

/// Pen offsets for `ch`, or `None` when there is no glyph for it.
pub fn glyph(ch: char) -> Option<Offsets> {
    let ch = ch.to_ascii_uppercase();
    GLYPHS
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, offsets)| *offsets)
}

/// Whether `ch` can appear in text: it has a glyph or is whitespace.
pub fn is_writable(ch: char) -> bool {
    ch.is_whitespace() || glyph(ch).is_some()
}

/// Lay `text` out left to right starting at `origin`, one stroke per glyph.
///
/// Whitespace and characters without a glyph leave an empty cell.
pub fn layout(text: &str, origin: Point, scale: f64) -> Vec<Stroke> {
    text.chars()
        .enumerate()
        .filter_map(|(cell, ch)| {
            let offsets = glyph(ch)?;
            let left = origin.x + cell as f64 * ADVANCE * scale;
            let points = offsets
                .iter()
                .map(|&(dx, dy)| Point::new(left + dx * scale, origin.y + dy * scale))
                .collect();
            Some(Stroke::new(points))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(glyph('a'), glyph('A'));
        assert!(glyph('z').is_some());
    }

    #[test]
    fn every_glyph_has_a_stroke() {
        for (ch, offsets) in GLYPHS {
            assert!(offsets.len() >= 2, "glyph {ch:?} is a single dot");
        }
    }

    #[test]
    fn table_has_no_duplicate_characters() {
        for (i, (a, _)) in GLYPHS.iter().enumerate() {
            assert!(GLYPHS[i + 1..].iter().all(|(b, _)| a != b), "duplicate {a:?}");
        }
    }

    #[test]
    fn writable_characters() {
        assert!(is_writable('k'));
        assert!(is_writable(' '));
        assert!(is_writable('?'));
        assert!(!is_writable('~'));
        assert!(!is_writable('é'));
    }

    #[test]
    fn layout_places_glyphs_in_cells() {
        let strokes = layout("I I", Point::new(1.0, 5.0), 1.0);
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].points(), &[Point::new(1.5, 5.0), Point::new(1.5, 3.0)]);
        // Third cell: the space still advances the pen.
        assert_eq!(strokes[1].points()[0], Point::new(1.0 + 2.0 * ADVANCE + 0.5, 5.0));
    }

    #[test]
    fn layout_scales_offsets_and_advance() {
        let strokes = layout("L1", Point::new(0.0, 0.0), 0.5);
        assert_eq!(
            strokes[0].points(),
            &[Point::new(0.0, 0.0), Point::new(0.0, -1.0), Point::new(0.5, -1.0)]
        );
        assert_eq!(strokes[1].points()[0], Point::new(ADVANCE * 0.5 + 0.5, 0.0));
    }

    #[test]
    fn layout_of_blank_text_is_empty() {
        assert!(layout("", Point::new(0.0, 7.0), 1.0).is_empty());
        assert!(layout("   ", Point::new(0.0, 7.0), 1.0).is_empty());
    }
}
