//! Conventional commit message parsing
//!
//! Only what PR validation needs: header parts, fixup/squash markers, and
//! `BREAKING CHANGE:` / `DEPRECATED:` notes.

/// A parsed commit message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommitMessage {
    /// First line, without `fixup!`/`squash!` markers
    pub header: String,
    /// Commit type (`fix`, `feat`, ...), empty if the header is not conventional
    pub commit_type: String,
    /// Scope between the parentheses, empty if absent
    pub scope: String,
    /// Text after `type(scope): `
    pub subject: String,
    /// Text between the header and the first note
    pub body: String,
    /// Contents of `BREAKING CHANGE:` notes
    pub breaking_changes: Vec<String>,
    /// Contents of `DEPRECATED:` notes
    pub deprecations: Vec<String>,
    /// Header starts with `fixup! `
    pub is_fixup: bool,
    /// Header starts with `squash! `
    pub is_squash: bool,
}

#[derive(Clone, Copy)]
enum NoteKind {
    BreakingChange,
    Deprecation,
}

/// Split `type(scope)!: subject` into its parts
fn split_header(header: &str) -> Option<(&str, &str, &str)> {
    let (prefix, subject) = header.split_once(": ")?;
    let prefix = prefix.strip_suffix('!').unwrap_or(prefix);
    let (commit_type, scope) = match prefix.split_once('(') {
        Some((commit_type, rest)) => (commit_type, rest.strip_suffix(')')?),
        None => (prefix, ""),
    };
    let is_word = commit_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if commit_type.is_empty() || !is_word || scope.contains(')') || subject.is_empty() {
        return None;
    }
    Some((commit_type, scope, subject))
}

fn note_start(line: &str) -> Option<(NoteKind, &str)> {
    for prefix in ["BREAKING CHANGES:", "BREAKING CHANGE:"] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some((NoteKind::BreakingChange, rest.trim_start()));
        }
    }
    line.strip_prefix("DEPRECATED:")
        .map(|rest| (NoteKind::Deprecation, rest.trim_start()))
}

/// Parse a full commit message
///
/// Lines starting with `#` are git comments and ignored.
pub fn parse_commit_message(text: &str) -> ParsedCommitMessage {
    let mut lines = text.lines().filter(|l| !l.starts_with('#'));
    let mut parsed = ParsedCommitMessage::default();

    let mut header = lines.next().unwrap_or_default().trim();
    loop {
        if let Some(rest) = header.strip_prefix("fixup! ") {
            parsed.is_fixup = true;
            header = rest;
        } else if let Some(rest) = header.strip_prefix("squash! ") {
            parsed.is_squash = true;
            header = rest;
        } else {
            break;
        }
    }
    parsed.header = header.to_string();

    if let Some((commit_type, scope, subject)) = split_header(header) {
        parsed.commit_type = commit_type.to_string();
        parsed.scope = scope.to_string();
        parsed.subject = subject.to_string();
    } else {
        parsed.subject = header.to_string();
    }

    let mut body = Vec::new();
    let mut current: Option<(NoteKind, Vec<&str>)> = None;
    for line in lines {
        if let Some((kind, first)) = note_start(line) {
            if let Some(note) = current.take() {
                push_note(&mut parsed, note);
            }
            current = Some((kind, vec![first]));
        } else if let Some((_, note_lines)) = current.as_mut() {
            note_lines.push(line);
        } else {
            body.push(line);
        }
    }
    if let Some(note) = current {
        push_note(&mut parsed, note);
    }
    parsed.body = body.join("\n").trim().to_string();
    parsed
}

fn push_note(parsed: &mut ParsedCommitMessage, (kind, lines): (NoteKind, Vec<&str>)) {
    let text = lines.join("\n").trim().to_string();
    match kind {
        NoteKind::BreakingChange => parsed.breaking_changes.push(text),
        NoteKind::Deprecation => parsed.deprecations.push(text),
    }
}
