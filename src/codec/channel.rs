//! Channel vocabulary and `<owner>_<channel>` identifiers.

use std::fmt;
use std::str::FromStr;

use crate::util::Error;

/// Separator between owner and channel in a channel id.
pub const CHANNEL_SEPARATOR: char = '_';

/// Shape of the flat array exchanged for a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelShape {
    /// `resolution` / `offset`: three values, never stored as layers.
    Pseudo,
    /// One value per voxel.
    Scalar,
    /// Three interleaved values per voxel.
    Vector,
    /// Three staggered components, concatenated.
    Staggered,
}

/// Every channel the cache understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    Resolution,
    Offset,
    Density,
    Pressure,
    Fuel,
    Temperature,
    Falloff,
    Color,
    Coord,
    Velocity,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 10] = [
        Self::Resolution,
        Self::Offset,
        Self::Density,
        Self::Pressure,
        Self::Fuel,
        Self::Temperature,
        Self::Falloff,
        Self::Color,
        Self::Coord,
        Self::Velocity,
    ];

    /// Channels stored as layers, in the order a full export writes them.
    pub const STORED: [ChannelKind; 8] = [
        Self::Density,
        Self::Pressure,
        Self::Fuel,
        Self::Temperature,
        Self::Falloff,
        Self::Color,
        Self::Coord,
        Self::Velocity,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Offset => "offset",
            Self::Density => "density",
            Self::Pressure => "pressure",
            Self::Fuel => "fuel",
            Self::Temperature => "temperature",
            Self::Falloff => "falloff",
            Self::Color => "color",
            Self::Coord => "coord",
            Self::Velocity => "velocity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub const fn shape(self) -> ChannelShape {
        match self {
            Self::Resolution | Self::Offset => ChannelShape::Pseudo,
            Self::Density | Self::Pressure | Self::Fuel | Self::Temperature | Self::Falloff => {
                ChannelShape::Scalar
            }
            Self::Color | Self::Coord => ChannelShape::Vector,
            Self::Velocity => ChannelShape::Staggered,
        }
    }

    #[inline]
    pub const fn is_pseudo(self) -> bool {
        matches!(self.shape(), ChannelShape::Pseudo)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::NotFound(format!("unknown channel '{}'", s)))
    }
}

/// A channel id split at its last separator.
///
/// `"fluid_Shape1_density"` has owner `"fluid_Shape1"` and channel
/// `"density"`. An id without separator has an empty owner and the whole
/// id as channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelId<'a> {
    pub owner: &'a str,
    pub channel: &'a str,
}

impl<'a> ChannelId<'a> {
    pub fn parse(id: &'a str) -> Self {
        match id.rsplit_once(CHANNEL_SEPARATOR) {
            Some((owner, channel)) => Self { owner, channel },
            None => Self { owner: "", channel: id },
        }
    }

    /// Known channel kind, if the suffix is part of the vocabulary.
    pub fn kind(&self) -> Option<ChannelKind> {
        ChannelKind::from_name(self.channel)
    }

    #[inline]
    pub fn has_owner(&self) -> bool {
        !self.owner.is_empty()
    }
}

/// Join an owner and a channel into an id.
pub fn channel_id(owner: &str, channel: &str) -> String {
    format!("{}{}{}", owner, CHANNEL_SEPARATOR, channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_last_separator() {
        for kind in ChannelKind::ALL {
            for owner in ["fluid1", "fluid_Shape1", "a_b_c"] {
                let id = channel_id(owner, kind.name());
                let parsed = ChannelId::parse(&id);
                assert_eq!(parsed.owner, owner);
                assert_eq!(parsed.channel, kind.name());
                assert_eq!(parsed.kind(), Some(kind));
                assert!(!parsed.channel.contains('-'));
            }
        }
    }

    #[test]
    fn test_no_separator() {
        let id = ChannelId::parse("density");
        assert_eq!(id.owner, "");
        assert_eq!(id.channel, "density");
        assert!(!id.has_owner());
    }

    #[test]
    fn test_unknown_suffix() {
        let id = ChannelId::parse("fluid1_viscosity");
        assert_eq!(id.kind(), None);
        assert!("viscosity".parse::<ChannelKind>().is_err());
        assert_eq!("coord".parse::<ChannelKind>().unwrap(), ChannelKind::Coord);
    }

    #[test]
    fn test_shapes() {
        assert_eq!(ChannelKind::Offset.shape(), ChannelShape::Pseudo);
        assert_eq!(ChannelKind::Falloff.shape(), ChannelShape::Scalar);
        assert_eq!(ChannelKind::Color.shape(), ChannelShape::Vector);
        assert_eq!(ChannelKind::Velocity.shape(), ChannelShape::Staggered);
        assert!(ChannelKind::STORED.iter().all(|k| !k.is_pseudo()));
    }
}
