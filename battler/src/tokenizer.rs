//! Operator-input tokenizer.
//!
//! A line is a command name followed by comma-separated argument groups.
//! Within a group, leading words form free text (for example a combatant
//! name) and `--flag value...` runs attach named flags, each collecting
//! every word up to the next flag or comma:
//!
//! ```text
//! cast fireball --lvl 5 --dc main 15, goblin --dosav 1 1, ogre --dosav 1 1 adv
//! ```

/// One tokenized operator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub name: String,
    pub groups: Vec<ArgGroup>,
}

/// One comma-separated argument group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgGroup {
    pub text: String,
    pub flags: Vec<Flag>,
}

/// One `--name value...` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub name: String,
    pub values: Vec<String>,
}

impl ArgGroup {
    /// First flag with the given name, if any.
    pub fn flag(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.name == name)
    }

    /// Every flag with the given name, for repeatable flags.
    pub fn flags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Flag> {
        self.flags.iter().filter(move |f| f.name == name)
    }
}

impl CommandLine {
    /// The first argument group, defaulting to empty.
    pub fn first_group(&self) -> ArgGroup {
        self.groups.first().cloned().unwrap_or_default()
    }
}

/// Tokenize one line of input. Everything is lowercased; blank lines
/// yield `None`.
pub fn tokenize(line: &str) -> Option<CommandLine> {
    let line = line.trim().to_lowercase();
    let mut segments = line.split(',');

    let first: Vec<&str> = segments.next()?.split_whitespace().collect();
    let (name, rest) = first.split_first()?;

    let mut groups = Vec::new();
    if !rest.is_empty() {
        groups.push(parse_group(rest));
    }
    for segment in segments {
        let tokens: Vec<&str> = segment.split_whitespace().collect();
        if !tokens.is_empty() {
            groups.push(parse_group(&tokens));
        }
    }

    Some(CommandLine {
        name: name.to_string(),
        groups,
    })
}

fn parse_group(tokens: &[&str]) -> ArgGroup {
    let mut text_words: Vec<&str> = Vec::new();
    let mut flags: Vec<Flag> = Vec::new();

    for token in tokens {
        if let Some(name) = token.strip_prefix("--") {
            flags.push(Flag {
                name: name.to_string(),
                values: Vec::new(),
            });
        } else if let Some(flag) = flags.last_mut() {
            flag.values.push((*token).to_string());
        } else {
            text_words.push(token);
        }
    }

    ArgGroup {
        text: text_words.join(" "),
        flags,
    }
}
