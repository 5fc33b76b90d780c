//! Frame composition - map template, HUD, pickups and cars

use bytes::Bytes;
use std::fmt::Write;
use std::sync::Arc;

use super::constants::{
    color, BOMB, DIVIDER_COLUMN, FRAMES_PER_SECOND, HEART, MAP_HEIGHT, MAP_WIDTH,
};
use super::player::Player;
use super::round::{Round, RoundState};
use super::sprites::SpriteSet;

/// Rightmost column usable for drawing; the two after it hold `\r\n`
const LAST_COLUMN: i32 = MAP_WIDTH - 3;

/// One colored cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub color: u8,
    pub glyph: char,
}

impl Symbol {
    pub const fn plain(glyph: char) -> Self {
        Self {
            color: color::RESET,
            glyph,
        }
    }

    pub const fn colored(glyph: char, color: u8) -> Self {
        Self { color, glyph }
    }
}

/// Row-major grid of `MAP_WIDTH x MAP_HEIGHT` symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    cells: Vec<Symbol>,
}

impl Frame {
    pub fn blank() -> Self {
        let mut cells = vec![Symbol::plain(' '); (MAP_WIDTH * MAP_HEIGHT) as usize];
        for y in 0..MAP_HEIGHT {
            let row = (y * MAP_WIDTH) as usize;
            cells[row + (MAP_WIDTH - 2) as usize] = Symbol::plain('\r');
            cells[row + (MAP_WIDTH - 1) as usize] = Symbol::plain('\n');
        }
        Self { cells }
    }

    fn index(x: i32, y: i32) -> Option<usize> {
        ((0..=LAST_COLUMN).contains(&x) && (0..MAP_HEIGHT).contains(&y))
            .then(|| (y * MAP_WIDTH + x) as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Symbol> {
        Self::index(x, y).map(|i| self.cells[i])
    }

    /// Set a cell; anything off the grid is clipped
    pub fn put(&mut self, x: i32, y: i32, symbol: Symbol) {
        if let Some(i) = Self::index(x, y) {
            self.cells[i] = symbol;
        }
    }

    pub fn write_text(&mut self, x: i32, y: i32, text: &str, color: u8) {
        for (offset, glyph) in text.chars().enumerate() {
            self.put(x + offset as i32, y, Symbol::colored(glyph, color));
        }
    }

    /// Glyphs of one row without colors, `\r\n` excluded
    pub fn row_text(&self, y: i32) -> String {
        (0..=LAST_COLUMN)
            .filter_map(|x| self.get(x, y))
            .map(|s| s.glyph)
            .collect()
    }

    /// Serialize with SGR color codes around every colored cell
    pub fn to_bytes(&self) -> Bytes {
        let mut out = String::with_capacity(self.cells.len() * 2);
        for symbol in &self.cells {
            if symbol.color == color::RESET {
                out.push(symbol.glyph);
            } else {
                let _ = write!(out, "\x1b[{}m{}\x1b[0m", symbol.color, symbol.glyph);
            }
        }
        Bytes::from(out)
    }
}

/// Banner shown while the round is paused before the start
pub fn get_ready_text(frames_left: u32) -> String {
    let count = match frames_left {
        n if n <= FRAMES_PER_SECOND => " 1",
        n if n <= 2 * FRAMES_PER_SECOND => " 2",
        n if n <= 3 * FRAMES_PER_SECOND => " 3",
        _ => "",
    };
    format!("GET READY!{count}")
}

/// Builds one frame per tick on top of a pre-rendered map
pub struct FrameBuilder {
    template: Frame,
    sprites: Arc<SpriteSet>,
    /// Rows between two players in the HUD
    spacing: i32,
}

impl FrameBuilder {
    pub fn new(players: &[Arc<Player>], sprites: Arc<SpriteSet>) -> Self {
        let spacing = MAP_HEIGHT / players.len().max(1) as i32;
        let mut template = Self::map();
        for (line, player) in players.iter().enumerate() {
            let label = format!("{}:", player.name);
            template.write_text(
                DIVIDER_COLUMN + 1,
                line as i32 * spacing + 1,
                &label,
                player.color(),
            );
        }
        Self {
            template,
            sprites,
            spacing,
        }
    }

    /// Border and HUD divider
    fn map() -> Frame {
        let mut frame = Frame::blank();
        let bottom = MAP_HEIGHT - 1;
        for x in 0..=LAST_COLUMN {
            frame.put(x, 0, Symbol::plain('\u{2500}'));
            frame.put(x, bottom, Symbol::plain('\u{2500}'));
        }
        for y in 1..bottom {
            for x in [0, DIVIDER_COLUMN, LAST_COLUMN] {
                frame.put(x, y, Symbol::plain('\u{2502}'));
            }
        }
        for (x, top, low) in [
            (0, '\u{250c}', '\u{2514}'),
            (DIVIDER_COLUMN, '\u{252c}', '\u{2534}'),
            (LAST_COLUMN, '\u{2510}', '\u{2518}'),
        ] {
            frame.put(x, 0, Symbol::plain(top));
            frame.put(x, bottom, Symbol::plain(low));
        }
        frame
    }

    /// Compose the current state of `round`
    pub fn compose(&self, round: &Round, banner: Option<&str>) -> Frame {
        let mut frame = self.template.clone();
        self.draw_hud(&mut frame, round.players());

        if round.state() != RoundState::Starting {
            if let Some(bonus) = round.bonus() {
                frame.put(bonus.x, bonus.y, Symbol::colored(HEART, color::RED));
            }
            for bomb in round.bombs().iter() {
                frame.put(bomb.x, bomb.y, Symbol::colored(BOMB, color::BOLD));
            }
        }

        for player in round.players() {
            self.draw_car(&mut frame, player);
        }

        if let Some(text) = banner {
            Self::overlay_banner(&mut frame, text, color::RESET);
        }
        frame
    }

    fn draw_hud(&self, frame: &mut Frame, players: &[Arc<Player>]) {
        for (line, player) in players.iter().enumerate() {
            let row = line as i32 * self.spacing;
            let health = format!("Health: {:3}", player.health().max(0));
            let bombs = format!("Bombs: {:4}", player.bombs());
            frame.write_text(LAST_COLUMN - health.len() as i32, row + 2, &health, player.color());
            frame.write_text(LAST_COLUMN - bombs.len() as i32, row + 3, &bombs, player.color());
        }
    }

    fn draw_car(&self, frame: &mut Frame, player: &Player) {
        let car = player.car();
        let wrecked = !player.is_alive();
        let color = player.color();
        let origin = car.borders.corner(super::geometry::Corner::LeftUp);
        for (dy, row) in self.sprites.car(car.direction).rows().iter().enumerate() {
            for (dx, &glyph) in row.iter().enumerate() {
                let glyph = if wrecked && glyph == 'o' { 'x' } else { glyph };
                frame.put(
                    origin.x + dx as i32,
                    origin.y + dy as i32,
                    Symbol::colored(glyph, color),
                );
            }
        }
    }

    /// Centered text across the arena, a few rows above the middle
    pub fn overlay_banner(frame: &mut Frame, text: &str, color: u8) {
        let width = text.chars().count() as i32;
        let x = ((DIVIDER_COLUMN - width) / 2).max(1);
        frame.write_text(x, MAP_HEIGHT / 2 - 2, text, color);
    }
}
