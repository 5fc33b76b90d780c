//! Car sprites and the splash screen

use std::path::Path;

use super::geometry::Direction;
use super::player::footprint;

const CAR_LEFT: &str = " o   o \n<[====]\n o   o ";
const CAR_RIGHT: &str = " o   o \n[====]>\n o   o ";
const CAR_UP: &str = " /^\\ \no| |o\no|_|o";
const CAR_DOWN: &str = "o|\u{203e}|o\no| |o\n \\v/ ";

const SPLASH: &str = concat!(
    "   ___              _        _                          \r\n",
    "  / __|_ _ __ _ ___| |_     /_\\  _ _ ___ _ _  __ _      \r\n",
    " | (__| '_/ _` (_-<| ' \\   / _ \\| '_/ -_) ' \\/ _` |     \r\n",
    "  \\___|_| \\__,_/__/|_||_| /_/ \\_\\_| \\___|_||_\\__,_|     \r\n",
    "\r\n",
    "  Arrows steer, space drops a bomb, Ctrl-C leaves.\r\n",
    "  Hearts heal, bombs hurt, walls hurt more. Last car wins.\r\n",
    "\r\n",
);

/// Errors while loading sprites from disk
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read sprite {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sprite {name} is {width}x{height}, larger than the {max_width}x{max_height} car")]
    TooLarge {
        name: &'static str,
        width: usize,
        height: usize,
        max_width: usize,
        max_height: usize,
    },
}

/// A multi-line block of glyphs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    rows: Vec<Vec<char>>,
}

impl Sprite {
    pub fn parse(text: &str) -> Self {
        let rows = text
            .trim_end_matches(['\r', '\n'])
            .split('\n')
            .map(|row| row.trim_end_matches('\r').chars().collect())
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<char>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Immutable sprite table handed to every round's renderer
#[derive(Debug, Clone)]
pub struct SpriteSet {
    left: Sprite,
    right: Sprite,
    up: Sprite,
    down: Sprite,
    splash: String,
}

impl SpriteSet {
    /// Sprites compiled into the binary
    pub fn builtin() -> Self {
        Self {
            left: Sprite::parse(CAR_LEFT),
            right: Sprite::parse(CAR_RIGHT),
            up: Sprite::parse(CAR_UP),
            down: Sprite::parse(CAR_DOWN),
            splash: SPLASH.to_string(),
        }
    }

    /// Load `car_{left,right,up,down}.txt` and `splash.txt` from `dir`
    pub fn load(dir: &Path) -> Result<Self, AssetError> {
        let read = |file: &str| {
            let path = dir.join(file);
            std::fs::read_to_string(&path).map_err(|source| AssetError::Read {
                path: path.display().to_string(),
                source,
            })
        };

        let set = Self {
            left: Sprite::parse(&read("car_left.txt")?),
            right: Sprite::parse(&read("car_right.txt")?),
            up: Sprite::parse(&read("car_up.txt")?),
            down: Sprite::parse(&read("car_down.txt")?),
            splash: read("splash.txt")?.replace("\r\n", "\n").replace('\n', "\r\n"),
        };
        set.validate()?;
        Ok(set)
    }

    /// Built-in sprites unless a directory is configured
    pub fn from_dir(dir: Option<&Path>) -> Result<Self, AssetError> {
        match dir {
            Some(dir) => Self::load(dir),
            None => Ok(Self::builtin()),
        }
    }

    fn validate(&self) -> Result<(), AssetError> {
        for (name, direction) in [
            ("car_left", Direction::Left),
            ("car_right", Direction::Right),
            ("car_up", Direction::Up),
            ("car_down", Direction::Down),
        ] {
            let sprite = self.car(direction);
            let (max_width, max_height) = footprint(direction);
            let (max_width, max_height) = (max_width as usize, max_height as usize);
            if sprite.width() > max_width || sprite.height() > max_height {
                return Err(AssetError::TooLarge {
                    name,
                    width: sprite.width(),
                    height: sprite.height(),
                    max_width,
                    max_height,
                });
            }
        }
        Ok(())
    }

    pub fn car(&self, direction: Direction) -> &Sprite {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    pub fn splash(&self) -> &str {
        &self.splash
    }
}

impl Default for SpriteSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sprites_fit_their_cars() {
        let set = SpriteSet::builtin();
        assert!(set.validate().is_ok());
        assert_eq!(set.car(Direction::Right).width(), 7);
        assert_eq!(set.car(Direction::Up).width(), 5);
        assert_eq!(set.car(Direction::Down).rows()[0][2], '\u{203e}');
    }

    #[test]
    fn parse_drops_trailing_newline_and_carriage_returns() {
        let sprite = Sprite::parse("ab\r\ncd\r\n");
        assert_eq!(sprite.height(), 2);
        assert_eq!(sprite.rows()[1], vec!['c', 'd']);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = SpriteSet::load(Path::new("/nonexistent/crash-arena-assets")).unwrap_err();
        assert!(matches!(err, AssetError::Read { .. }));
    }
}
