//! Interactive playback commands: `<video> <count>` or `0` to quit.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play { video: String, count: u32 },
    Quit,
}

/// A line that is not a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCommand(pub String);

impl fmt::Display for InvalidCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input {:?}; use: <video> <frames> or 0 to exit", self.0)
    }
}

impl std::error::Error for InvalidCommand {}

impl std::str::FromStr for Command {
    type Err = InvalidCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line == "0" {
            return Ok(Command::Quit);
        }
        let parts: Vec<&str> = line.split(' ').collect();
        match parts.as_slice() {
            [video, count] if !video.is_empty() => count
                .parse::<u32>()
                .map(|count| Command::Play {
                    video: (*video).to_string(),
                    count,
                })
                .map_err(|_| InvalidCommand(line.to_string())),
            _ => Err(InvalidCommand(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_commands() {
        assert_eq!("0".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!(
            "marc 300\n".parse::<Command>().unwrap(),
            Command::Play {
                video: "marc".to_string(),
                count: 300
            }
        );
        assert!("marc".parse::<Command>().is_err());
        assert!("marc -3".parse::<Command>().is_err());
        assert!("marc 3 4".parse::<Command>().is_err());
        assert!(" 3".parse::<Command>().is_err());
    }
}
