//! Theme-dependent colors and the decorative matrix drawn in the middle of
//! the face

use crate::{state::Theme, util::Color};
use itertools::Itertools;

/// Displays narrower than this get the small layout
pub const SMALL_SCREEN_WIDTH: u32 = 190;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
}

impl Palette {
    const LIGHT: Self = Self {
        background: Color::WHITE,
        foreground: Color::BLACK,
    };
    const DARK: Self = Self {
        background: Color::BLACK,
        foreground: Color::WHITE,
    };
    const COLOR: Self = Self {
        background: Color::PASTEL_YELLOW,
        foreground: Color::BLACK,
    };
}

/// Background/foreground for a theme. The color theme only differs from
/// light on displays that can actually show color.
pub fn palette_for(theme: Theme, color_display: bool) -> Palette {
    match theme {
        Theme::Light => Palette::LIGHT,
        Theme::Dark => Palette::DARK,
        Theme::Color if color_display => Palette::COLOR,
        Theme::Color => Palette::LIGHT,
    }
}

/// Which of the two bitmap grids gets drawn
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatrixVariant {
    /// 31x32, every set cell in the foreground color
    Monochrome31,
    /// 25x30, each cell picks a palette entry
    Palette25,
}

/// The palette-indexed grid only makes sense under the color theme, and
/// only on a display that can show it
pub fn matrix_variant_for(theme: Theme, color_display: bool) -> MatrixVariant {
    if theme == Theme::Color && color_display {
        MatrixVariant::Palette25
    } else {
        MatrixVariant::Monochrome31
    }
}

/// Size of one matrix cell, in pixels. Depends only on the display width.
pub fn pixel_pitch(display_width: u32) -> u32 {
    if display_width < SMALL_SCREEN_WIDTH {
        2
    } else {
        3
    }
}

impl MatrixVariant {
    /// Width in cells
    pub fn columns(self) -> usize {
        match self {
            Self::Monochrome31 => MONOCHROME_MATRIX[0].len(),
            Self::Palette25 => PALETTE_MATRIX[0].len(),
        }
    }

    /// Height in cells
    pub fn rows(self) -> usize {
        match self {
            Self::Monochrome31 => MONOCHROME_MATRIX.len(),
            Self::Palette25 => PALETTE_MATRIX.len(),
        }
    }

    fn cell(self, column: usize, row: usize) -> u8 {
        match self {
            Self::Monochrome31 => MONOCHROME_MATRIX[row][column],
            Self::Palette25 => PALETTE_MATRIX[row][column],
        }
    }

    /// Every painted cell as `(column, row, color)`, row-major. Transparent
    /// cells are skipped.
    pub fn cells(
        self,
        palette: Palette,
    ) -> impl Iterator<Item = (usize, usize, Color)> {
        (0..self.rows())
            .cartesian_product(0..self.columns())
            .filter_map(move |(row, column)| {
                let color = cell_color(self.cell(column, row), palette)?;
                Some((column, row, color))
            })
    }
}

/// Map a cell to its color. Outline and face cells follow the theme
/// foreground so the matrix stays legible on any background.
fn cell_color(cell: u8, palette: Palette) -> Option<Color> {
    match cell {
        b'#' | b'o' | b'f' => Some(palette.foreground),
        b'c' => Some(Color::LIGHT_GRAY),
        b'd' => Some(Color::DARK_GRAY),
        b's' => Some(Color::CELESTE),
        b'r' => Some(Color::RED),
        b'y' => Some(Color::CHROME_YELLOW),
        b'g' => Some(Color::GREEN),
        b'b' => Some(Color::BLUE_MOON),
        _ => None,
    }
}

const MONOCHROME_MATRIX: [&[u8; 31]; 32] = [
    b".....#####################.....",
    b"....#.....................#....",
    b"...#.......................#...",
    b"...#...#################...#...",
    b"...#..#.................#..#...",
    b"...#..#.................#..#...",
    b"...#..#.................#..#...",
    b"...#..#....#...#...#....#..#...",
    b"...#..#....#...#...#....#..#...",
    b"...#..#........#........#..#...",
    b"...#..#........#........#..#...",
    b"...#..#.......##........#..#...",
    b"...#..#.................#..#...",
    b"...#..#.....#....#......#..#...",
    b"...#..#......####.......#..#...",
    b"...#..#.................#..#...",
    b"...#..#.................#..#...",
    b"...#...#################...#...",
    b"...#.......................#...",
    b"...#.......................#...",
    b"...#.......................#...",
    b"...#.......................#...",
    b"...#..##..........######...#...",
    b"...#.......................#...",
    b"...#.......................#...",
    b"...#.......................#...",
    b"...#.......................#...",
    b"....#######################....",
    b"....#.....................#....",
    b"....#.....................#....",
    b"....#.....................#....",
    b"....#######################....",
];

const PALETTE_MATRIX: [&[u8; 25]; 30] = [
    b"..ooooooooooooooooooooo..",
    b".oocccccccccccccccccccoo.",
    b".occccccccccccccccccccdo.",
    b".occcoooooooooooooooccdo.",
    b".occosssssssssssssssocdo.",
    b".occosssssssssssssssocdo.",
    b".occossssfsssssfssssocdo.",
    b".occossssfsssssfssssocdo.",
    b".occosssssssfsssssssocdo.",
    b".occosssssssfsssssssocdo.",
    b".occossssssffsssssssocdo.",
    b".occosssssssssssssssocdo.",
    b".occosssfsssssssfsssocdo.",
    b".occossssfffffffssssocdo.",
    b".occosssssssssssssssocdo.",
    b".occcoooooooooooooooccdo.",
    b".occccccccccccccccccccdo.",
    b".occccccccccccccccccccdo.",
    b".occrrccccccccccccccccdo.",
    b".occyyccccccccccccccccdo.",
    b".occggcccccccoooooooccdo.",
    b".occbbccccccccccccccccdo.",
    b".occccccccccccccccccccdo.",
    b".occccccccccccccccccccdo.",
    b".oocccccccccccccccccccoo.",
    b"..ooooooooooooooooooooo..",
    b"...odddddddddddddddddo...",
    b"...occccccccccccccccco...",
    b"...occccccccccccccccco...",
    b"...ooooooooooooooooooo...",
];
