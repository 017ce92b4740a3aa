//! Request commands and response status codes.

use std::fmt;

/// Response code returned by the host when a request succeeded.
pub const SUCCESS: &str = "SUCCESS";

/// Response code returned by the host when a key does not exist.
pub const NOT_FOUND: &str = "NOTFOUND";

/// Request commands understood by the metadata host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Get,
    Put,
    Delete,
    Keys,
}

impl Command {
    /// Returns the wire code for this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Get => "GET",
            Command::Put => "PUT",
            Command::Delete => "DELETE",
            Command::Keys => "KEYS",
        }
    }

}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        assert_eq!(format!("{}", Command::Get), "GET");
        assert_eq!(format!("{}", Command::Put), "PUT");
        assert_eq!(format!("{}", Command::Delete), "DELETE");
        assert_eq!(format!("{}", Command::Keys), "KEYS");
    }
}
