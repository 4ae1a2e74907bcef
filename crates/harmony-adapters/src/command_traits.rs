//! Classifies shell commands whose output tends to flood a context window.

use std::collections::BTreeSet;

/// One noisy shape a command line can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoiseTrait {
    /// `ls -R`, `ls --recursive`
    RecursiveListing,
    /// `grep -r`, `rg`
    RecursiveSearch,
    /// any grep/rg invocation
    BroadSearch,
    /// `find`, `tree`, `du`, `ls -a`, `cat`
    BulkListing,
    /// some pipeline stage is `head`
    PipedToHead,
}

/// Traits found in one command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTraits(BTreeSet<NoiseTrait>);

impl CommandTraits {
    pub fn has(&self, t: NoiseTrait) -> bool {
        self.0.contains(&t)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NoiseTrait> + '_ {
        self.0.iter().copied()
    }

    fn insert(&mut self, t: NoiseTrait) {
        self.0.insert(t);
    }
}

/// Line budgets picked by trait, read from `[output]` in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBudgets {
    pub default: usize,
    pub strict: usize,
    pub search: usize,
}

impl Default for LineBudgets {
    fn default() -> Self {
        Self {
            default: 120,
            strict: 40,
            search: 80,
        }
    }
}

impl CommandTraits {
    /// Model-view line budget for this command.
    pub fn line_budget(&self, budgets: &LineBudgets) -> usize {
        if self.has(NoiseTrait::RecursiveListing) || self.has(NoiseTrait::RecursiveSearch) {
            budgets.strict
        } else if self.has(NoiseTrait::BroadSearch) {
            budgets.search
        } else {
            budgets.default
        }
    }

    /// Short operator-facing hints for the display view.
    pub fn display_notes(&self) -> Vec<&'static str> {
        let mut notes = Vec::new();
        if self.has(NoiseTrait::RecursiveListing) {
            notes.push("Recursive directory listings are trimmed to protect the context window. Narrow the path, add a depth flag, or pipe into `head` for a quick peek.");
        }
        if self.has(NoiseTrait::BulkListing) {
            notes.push("Large file listings are abbreviated. Consider filters (e.g., `find ... -maxdepth`, `du -h`) or piping through `head`.");
        }
        if self.has(NoiseTrait::RecursiveSearch) && !self.has(NoiseTrait::PipedToHead) {
            notes.push("Recursive search results are clipped. Pipe the command into `head` or refine the pattern to keep output manageable.");
        }
        notes
    }
}

/// Classify a shell command line. Pure: looks only at the text.
pub fn analyze_command(command: &str) -> CommandTraits {
    let mut traits = CommandTraits::default();

    for stage in split_stages(command) {
        let stage = stage.trim();
        if stage.is_empty() {
            continue;
        }
        let tokens = shlex::split(stage)
            .unwrap_or_else(|| stage.split_whitespace().map(String::from).collect());
        let Some((cmd, args)) = tokens.split_first() else {
            continue;
        };
        classify_stage(cmd.as_str(), args, &mut traits);
    }

    traits
}

/// Split a command line at unquoted `;`, `&`, `|` and newlines. Redirections
/// such as `2>&1` and `&>file` stay inside their stage.
fn split_stages(command: &str) -> Vec<&str> {
    let mut stages = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    let mut prev = '\0';
    let mut chars = command.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        if escaped {
            escaped = false;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            } else if c == '\\' && q == '"' {
                escaped = true;
            }
        } else {
            match c {
                '\\' => escaped = true,
                '\'' | '"' => quote = Some(c),
                '&' if prev == '>' || prev == '<' || next == Some('>') => {}
                ';' | '&' | '|' | '\n' => {
                    stages.push(&command[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            }
        }
        prev = c;
    }
    stages.push(&command[start..]);
    stages
}

/// Options before `--`.
fn options(args: &[String]) -> impl Iterator<Item = &str> {
    args.iter()
        .map(String::as_str)
        .take_while(|a| *a != "--")
        .filter(|a| a.starts_with('-'))
}

fn short_flags_contain(opt: &str, flags: &[char]) -> bool {
    !opt.starts_with("--") && opt[1..].chars().any(|c| flags.contains(&c))
}

fn classify_stage(cmd: &str, args: &[String], traits: &mut CommandTraits) {
    match cmd {
        "head" => traits.insert(NoiseTrait::PipedToHead),
        "ls" => {
            for opt in options(args) {
                if opt == "--recursive" || opt.starts_with("--recursive=") || short_flags_contain(opt, &['R']) {
                    traits.insert(NoiseTrait::RecursiveListing);
                }
                if matches!(opt, "-a" | "-A" | "--all") {
                    traits.insert(NoiseTrait::BulkListing);
                }
            }
        }
        "find" | "tree" | "du" | "cat" | "bat" | "less" => traits.insert(NoiseTrait::BulkListing),
        "grep" | "egrep" | "fgrep" => {
            traits.insert(NoiseTrait::BroadSearch);
            for opt in options(args) {
                if opt.starts_with("--recursive") || short_flags_contain(opt, &['r', 'R', 'd']) {
                    traits.insert(NoiseTrait::RecursiveSearch);
                }
            }
        }
        "rg" | "ripgrep" => {
            traits.insert(NoiseTrait::BroadSearch);
            traits.insert(NoiseTrait::RecursiveSearch);
        }
        _ => {}
    }
}
