//! Logic for [Action::LineInFile].
//!
//! [Action::LineInFile]: crate::core::Action::LineInFile

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

/// Ensures that `line` is present in the file at `path`.
///
/// In order of preference, a missing line:
/// 1. replaces the first line containing `pattern`,
/// 2. is inserted after the first line containing `after` (an empty `after` means the start of
///    the file), or
/// 3. is appended to the end of the file.
///
/// A file that does not exist is treated as empty and created.
///
/// # Returns
///
/// Returns whether the file was modified. Returns an error if the file cannot be read or
/// written.
pub fn line_in_file(
    path: impl AsRef<Path>,
    line: &str,
    pattern: Option<&str>,
    after: Option<&str>,
    indent: bool,
) -> io::Result<bool> {
    let path = path.as_ref();
    let mut file = match fs::read_to_string(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err),
    };

    if !edit(&mut file, line, pattern, after, indent) {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, &file)?;
    Ok(true)
}

/// Returns whether `line` is already present in the file at `path`. A missing file has no lines.
pub fn file_has_line(path: impl AsRef<Path>, line: &str, indent: bool) -> io::Result<bool> {
    match fs::read_to_string(path) {
        Ok(file) => Ok(line_is_present(&file, line, indent)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Applies the edit to an in-memory copy of the file. Returns whether `file` changed.
fn edit(
    file: &mut String,
    line: &str,
    pattern: Option<&str>,
    after: Option<&str>,
    indent: bool,
) -> bool {
    if line_is_present(file, line, indent) {
        return false;
    }
    if let Some(pattern) = pattern {
        if replace_pattern(file, line, pattern) {
            return true;
        }
    }
    if let Some(after) = after {
        if insert_after(file, line, after) {
            return true;
        }
    }
    append_line(file, line);
    true
}

/// Compares lines with trailing white space (including `\r`) ignored, and leading white space
/// ignored too when `indent` is set.
fn normalize(line: &str, indent: bool) -> &str {
    let line = line.trim_end();
    if indent {
        line.trim_start()
    } else {
        line
    }
}

/// Returns whether `line` is present in `file`.
fn line_is_present(file: &str, line: &str, indent: bool) -> bool {
    let line = normalize(line, indent);
    file.split('\n')
        .any(|file_line| normalize(file_line, indent) == line)
}

/// Yields each line of `file` along with the byte range it occupies, excluding its terminator.
fn lines_with_offsets(file: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut start = 0;
    file.split_inclusive('\n').map(move |raw| {
        let begin = start;
        start += raw.len();
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        (begin, begin + content.len(), content)
    })
}

/// If a line in `file` contains `pattern`, replaces that line with `line`, keeping its line
/// terminator. Returns whether a match occurred.
fn replace_pattern(file: &mut String, line: &str, pattern: &str) -> bool {
    let found = lines_with_offsets(file)
        .find(|(_, _, content)| content.contains(pattern))
        .map(|(begin, end, _)| (begin, end));
    match found {
        Some((begin, end)) => {
            let terminated = end < file.len();
            file.replace_range(begin..end, line);
            if !terminated {
                file.push('\n');
            }
            true
        }
        None => false,
    }
}

/// If a line in `file` contains `after`, inserts `line` right after it. An empty `after` inserts
/// at the start of the file. Returns whether a match occurred.
fn insert_after(file: &mut String, line: &str, after: &str) -> bool {
    if after.is_empty() {
        file.insert_str(0, &format!("{line}\n"));
        return true;
    }

    let found = lines_with_offsets(file)
        .find(|(_, _, content)| content.contains(after))
        .map(|(_, end, _)| end);
    let Some(end) = found else {
        return false;
    };

    // Step over the matched line's own terminator, which may be "\r\n", "\n", or nothing at EOF.
    let terminator_end = {
        let rest = &file[end..];
        if rest.starts_with("\r\n") {
            end + 2
        } else if rest.starts_with('\n') {
            end + 1
        } else {
            end
        }
    };

    if terminator_end == end {
        // The matched line is the last line and is unterminated.
        file.push('\n');
        file.push_str(line);
        file.push('\n');
    } else {
        file.insert_str(terminator_end, &format!("{line}\n"));
    }
    true
}

/// Adds `line` as a new line at the end of `file`.
fn append_line(file: &mut String, line: &str) {
    if file.trim_start().is_empty() && !line.trim_start().is_empty() {
        file.clear();
    } else if !file.ends_with('\n') && !file.is_empty() {
        file.push('\n');
    }
    file.push_str(line);
    file.push('\n');
}
