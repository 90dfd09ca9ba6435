use std::fmt;

/// Machine-readable error codes shared by every ronlog failure.
///
/// Each module keeps its own typed error enum; those enums map onto this
/// table through a `code()` method so callers (and the CLI) can branch on a
/// stable identifier instead of on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadSyntax,
    BadDigest,
    NotImplemented,
    CausalBreak,
    Repeat,
    HashBreak,
    ChainBreak,
    BadState,
    ConfigParse,
    Internal,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadSyntax => "E1001",
            Self::BadDigest => "E1002",
            Self::NotImplemented => "E1003",
            Self::CausalBreak => "E2001",
            Self::Repeat => "E2002",
            Self::HashBreak => "E3001",
            Self::ChainBreak => "E3002",
            Self::BadState => "E4001",
            Self::ConfigParse => "E5001",
            Self::Internal => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::BadSyntax => "Malformed frame text",
            Self::BadDigest => "Malformed digest text",
            Self::NotImplemented => "Operation shape not supported",
            Self::CausalBreak => "Referenced op is missing",
            Self::Repeat => "Op id reused for different content",
            Self::HashBreak => "Op digest does not match its history",
            Self::ChainBreak => "Yarn ids went backwards",
            Self::BadState => "Operation not valid in the current state",
            Self::ConfigParse => "Config file parse error",
            Self::Internal => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::BadSyntax => Some("Check op punctuation near the reported offset."),
            Self::BadDigest => Some("Use 64 hex or 43 base64 symbols for a full digest."),
            Self::NotImplemented => None,
            Self::CausalBreak => {
                Some("Supply the frames holding the missing ancestors and retry the merge.")
            }
            Self::Repeat => Some("One of the inputs is corrupt; re-fetch the yarn that authored the id."),
            Self::HashBreak => Some("History was altered; re-fetch the ops from a trusted replica."),
            Self::ChainBreak => Some("Write ops in increasing id order on the commit's yarn."),
            Self::BadState => None,
            Self::ConfigParse => Some("Fix syntax in .ronlog/config.toml and retry."),
            Self::Internal => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 10] = [
        ErrorCode::BadSyntax,
        ErrorCode::BadDigest,
        ErrorCode::NotImplemented,
        ErrorCode::CausalBreak,
        ErrorCode::Repeat,
        ErrorCode::HashBreak,
        ErrorCode::ChainBreak,
        ErrorCode::BadState,
        ErrorCode::ConfigParse,
        ErrorCode::Internal,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn causal_break_has_a_hint() {
        assert!(ErrorCode::CausalBreak.hint().is_some());
        assert_eq!(ErrorCode::CausalBreak.to_string(), "E2001");
    }
}
