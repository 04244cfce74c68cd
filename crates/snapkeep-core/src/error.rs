use std::fmt;

/// Machine-readable codes for fatal conditions reported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidPolicy,
    MissingPolicy,
    ConfigParseError,
    InvalidExtract,
    InputReadFailed,
    OutputWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidPolicy => "E1001",
            Self::MissingPolicy => "E1002",
            Self::ConfigParseError => "E1003",
            Self::InvalidExtract => "E2001",
            Self::InputReadFailed => "E3001",
            Self::OutputWriteFailed => "E3002",
        }
    }

    /// Short lowercase summary, used as the prefix of fatal messages.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidPolicy => "invalid policy",
            Self::MissingPolicy => "no retention policy",
            Self::ConfigParseError => "invalid config",
            Self::InvalidExtract => "--extract regexp is invalid",
            Self::InputReadFailed => "failed to read stdin",
            Self::OutputWriteFailed => "failed to write output",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidPolicy => {
                Some("Rules look like N@unit:X, e.g. `1@last 7@daily yearly`.")
            }
            Self::MissingPolicy => {
                Some("Pass policy rules as arguments or set `policy` in the config file.")
            }
            Self::ConfigParseError => Some("Fix the TOML syntax in the config file and retry."),
            Self::InvalidExtract => Some("Use a valid regexp with at most one capture group."),
            Self::InputReadFailed | Self::OutputWriteFailed => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
