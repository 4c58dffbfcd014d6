use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where the watermark is anchored on the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Gravity {
    /// Top-left offset of an `overlay` sized box placed inside a `base` sized
    /// box. Odd remainders on centered axes round toward the far edge.
    ///
    /// Returns `None` when the overlay does not fit inside the base.
    pub fn offset(self, base: (u32, u32), overlay: (u32, u32)) -> Option<(i64, i64)> {
        let (base_w, base_h) = base;
        let (over_w, over_h) = overlay;
        if over_w > base_w || over_h > base_h {
            return None;
        }

        let free_x = i64::from(base_w - over_w);
        let free_y = i64::from(base_h - over_h);
        let mid_x = (free_x + 1) / 2;
        let mid_y = (free_y + 1) / 2;

        let position = match self {
            Gravity::Center => (mid_x, mid_y),
            Gravity::North => (mid_x, 0),
            Gravity::NorthEast => (free_x, 0),
            Gravity::East => (free_x, mid_y),
            Gravity::SouthEast => (free_x, free_y),
            Gravity::South => (mid_x, free_y),
            Gravity::SouthWest => (0, free_y),
            Gravity::West => (0, mid_y),
            Gravity::NorthWest => (0, 0),
        };
        Some(position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gravity `{0}`")]
pub struct UnknownGravity(pub String);

impl FromStr for Gravity {
    type Err = UnknownGravity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Gravity::Center),
            "north" => Ok(Gravity::North),
            "northeast" => Ok(Gravity::NorthEast),
            "east" => Ok(Gravity::East),
            "southeast" => Ok(Gravity::SouthEast),
            "south" => Ok(Gravity::South),
            "southwest" => Ok(Gravity::SouthWest),
            "west" => Ok(Gravity::West),
            "northwest" => Ok(Gravity::NorthWest),
            _ => Err(UnknownGravity(s.to_string())),
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gravity::Center => "center",
            Gravity::North => "north",
            Gravity::NorthEast => "northeast",
            Gravity::East => "east",
            Gravity::SouthEast => "southeast",
            Gravity::South => "south",
            Gravity::SouthWest => "southwest",
            Gravity::West => "west",
            Gravity::NorthWest => "northwest",
        };
        f.write_str(name)
    }
}
