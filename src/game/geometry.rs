//! Grid geometry - points, directions and axis-aligned rectangles

use serde::Serialize;

/// Integer cell coordinate, x grows right and y grows down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Facing of a car, also used to name the sides of a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// All sides, in the order ties are broken
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// True when the two directions lie on different axes
    pub fn is_perpendicular(self, other: Direction) -> bool {
        self.is_vertical() != other.is_vertical()
    }

    /// Unit step along this direction
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }
}

/// Corner index into a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    LeftUp = 0,
    RightUp = 1,
    RightDown = 2,
    LeftDown = 3,
}

/// Axis-aligned rectangle of cells with inclusive bounds.
///
/// The four corners are kept in `Corner` order. Width and height are always
/// derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    corners: [Point; 4],
}

impl Rectangle {
    /// Rectangle whose top-left cell is `origin`
    pub fn new(origin: Point, width: i32, height: i32) -> Self {
        let right = origin.x + width.max(1) - 1;
        let bottom = origin.y + height.max(1) - 1;
        Self::from_bounds(origin.x, origin.y, right, bottom)
    }

    /// Single-cell rectangle
    pub fn cell(point: Point) -> Self {
        Self::new(point, 1, 1)
    }

    pub fn from_bounds(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            corners: [
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
        }
    }

    pub fn corner(&self, corner: Corner) -> Point {
        self.corners[corner as usize]
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    pub fn left(&self) -> i32 {
        self.corner(Corner::LeftUp).x
    }

    pub fn top(&self) -> i32 {
        self.corner(Corner::LeftUp).y
    }

    pub fn right(&self) -> i32 {
        self.corner(Corner::RightDown).x
    }

    pub fn bottom(&self) -> i32 {
        self.corner(Corner::RightDown).y
    }

    pub fn width(&self) -> i32 {
        self.right() - self.left() + 1
    }

    pub fn height(&self) -> i32 {
        self.bottom() - self.top() + 1
    }

    /// Copy shifted by `(dx, dy)`
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        let mut moved = *self;
        for corner in moved.corners.iter_mut() {
            *corner = corner.offset(dx, dy);
        }
        moved
    }

    /// Copy shifted `steps` cells along `direction`
    pub fn step(&self, direction: Direction, steps: i32) -> Self {
        let (dx, dy) = direction.delta();
        self.translate(dx * steps, dy * steps)
    }

    /// Same top-left corner, new size
    pub fn resize(&self, width: i32, height: i32) -> Self {
        Self::new(self.corner(Corner::LeftUp), width, height)
    }

    /// Middle cell, rounded towards the top-left
    pub fn center(&self) -> Point {
        Point::new(
            self.left() + (self.width() - 1) / 2,
            self.top() + (self.height() - 1) / 2,
        )
    }

    /// Smallest shift that moves `self` inside `bounds`.
    /// A rectangle larger than `bounds` is aligned to its top-left.
    pub fn clamp_within(&self, bounds: &Rectangle) -> Self {
        let dx = if self.right() > bounds.right() {
            bounds.right() - self.right()
        } else {
            0
        };
        let dy = if self.bottom() > bounds.bottom() {
            bounds.bottom() - self.bottom()
        } else {
            0
        };
        let moved = self.translate(dx, dy);
        let dx = (bounds.left() - moved.left()).max(0);
        let dy = (bounds.top() - moved.top()).max(0);
        moved.translate(dx, dy)
    }

    /// Overlap test with inclusive bounds, touching edges intersect
    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(self.right() < other.left()
            || other.right() < self.left()
            || self.bottom() < other.top()
            || other.bottom() < self.top())
    }

    /// True if every cell of `other` lies inside `self`
    pub fn contains(&self, other: &Rectangle) -> bool {
        other
            .corners
            .iter()
            .all(|p| p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom())
    }

    /// Edge strip of `self` on `side`, grown outward by `margin` cells
    pub fn probe(&self, side: Direction, margin: i32) -> Rectangle {
        let (left, top, right, bottom) = (self.left(), self.top(), self.right(), self.bottom());
        match side {
            Direction::Left => Self::from_bounds(left - margin, top, left, bottom),
            Direction::Right => Self::from_bounds(right, top, right + margin, bottom),
            Direction::Up => Self::from_bounds(left, top - margin, right, top),
            Direction::Down => Self::from_bounds(left, bottom, right, bottom + margin),
        }
    }

    /// How far `other` reaches into `self` when entering across `side`
    fn reach(&self, other: &Rectangle, side: Direction) -> i32 {
        match side {
            Direction::Left => other.right() - self.left(),
            Direction::Right => self.right() - other.left(),
            Direction::Up => other.bottom() - self.top(),
            Direction::Down => self.bottom() - other.top(),
        }
    }

    /// Side of `self` that `other` is on, within `margin` cells.
    ///
    /// Each side is probed with its edge strip grown by `margin`. When more
    /// than one side qualifies the one `other` penetrates least wins, so with
    /// a zero margin this names the face that was struck.
    pub fn next_to(&self, other: &Rectangle, margin: i32) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&side| self.probe(side, margin).intersects(other))
            .min_by_key(|&side| self.reach(other, side))
    }
}
