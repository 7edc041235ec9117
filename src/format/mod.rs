//! TAR dialects and header construction.
//!
//! Parsing is delegated to the `tar` crate. Writing goes through
//! [`header::build`], which lays out names and numeric fields for the
//! session's [`Dialect`] and produces any extension records (pax `x`
//! headers, GNU `././@LongLink` entries) that must precede the entry.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

pub(crate) mod header;
pub(crate) mod pax;

/// TAR header dialect used for entries written by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// POSIX.1-1988 ustar. Names up to 255 bytes via the prefix field.
    Ustar,
    /// POSIX.1-2001 pax: ustar plus extended records for anything that does
    /// not fit.
    #[default]
    Pax,
    /// GNU tar. Long names through `././@LongLink` entries.
    Gnu,
    /// Unix V7. 100-byte names, no owner names, no special files.
    V7,
}

impl Dialect {
    /// All dialects, in declaration order.
    pub const ALL: [Dialect; 4] = [Self::Ustar, Self::Pax, Self::Gnu, Self::V7];

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ustar => "ustar",
            Self::Pax => "pax",
            Self::Gnu => "gnu",
            Self::V7 => "v7",
        }
    }

    pub(crate) fn new_header(self) -> tar::Header {
        match self {
            Self::Ustar | Self::Pax => tar::Header::new_ustar(),
            Self::Gnu => tar::Header::new_gnu(),
            Self::V7 => tar::Header::new_old(),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ustar" => Ok(Self::Ustar),
            "pax" | "posix" => Ok(Self::Pax),
            "gnu" | "gnutar" => Ok(Self::Gnu),
            "v7" => Ok(Self::V7),
            _ => Err(Error::InvalidFormat(format!("unknown tar dialect '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pax() {
        assert_eq!(Dialect::default(), Dialect::Pax);
    }

    #[test]
    fn test_parse() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.as_str().parse::<Dialect>().unwrap(), dialect);
        }
        assert_eq!("GNU".parse::<Dialect>().unwrap(), Dialect::Gnu);
        assert!("cpio".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_header_kinds() {
        assert!(Dialect::Ustar.new_header().as_ustar().is_some());
        assert!(Dialect::Pax.new_header().as_ustar().is_some());
        assert!(Dialect::Gnu.new_header().as_gnu().is_some());
        let v7 = Dialect::V7.new_header();
        assert!(v7.as_ustar().is_none() && v7.as_gnu().is_none());
    }
}
