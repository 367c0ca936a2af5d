/// Source Assembler - Template + Snippet → Runnable Program
///
/// **Core Responsibility:**
/// Combine a question's per-language {header, starter, footer} template with
/// the candidate's snippet into one source string for the judge.
///
/// **Properties:**
/// - Pure and deterministic: identical inputs give byte-identical output
/// - Knows nothing about the judge or storage
///
/// **Assembly Rules:**
/// - Python: header gains `from typing import List` when it has no list-typing
///   import; every snippet line is indented by 8 spaces, blank lines included,
///   so error line numbers map back predictably
/// - C++ / Java: snippet inserted verbatim
/// - All parts joined with `\n`

use crate::error::{GraderError, Result};
use crate::types::{CodingQuestion, Language};

pub const PYTHON_LIST_IMPORT: &str = "from typing import List";
pub const PYTHON_BODY_INDENT: &str = "        ";

/// Safety limit to keep pathological snippets away from the judge
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB

pub fn check_source_size(user_code: &str) -> Result<()> {
    if user_code.len() > MAX_SOURCE_CODE_BYTES {
        return Err(GraderError::Validation(format!(
            "source code exceeds maximum size of {} bytes",
            MAX_SOURCE_CODE_BYTES
        )));
    }
    Ok(())
}

pub fn assemble(question: &CodingQuestion, language: Language, user_code: &str) -> Result<String> {
    check_source_size(user_code)?;

    let template = question.template(language)?;

    let parts: [String; 4] = match language {
        Language::Python => [
            ensure_list_import(&template.header),
            template.starter.clone(),
            indent_body(user_code),
            template.footer.clone(),
        ],
        Language::Cpp | Language::Java => [
            template.header.clone(),
            template.starter.clone(),
            user_code.to_string(),
            template.footer.clone(),
        ],
    };

    Ok(parts.join("\n"))
}

/// Names brought in by `from typing import ...` statements, including the
/// parenthesized form that spans several lines
fn typing_imports(header: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut lines = header.lines();
    while let Some(line) = lines.next() {
        let Some(rest) = line.trim().strip_prefix("from typing import") else {
            continue;
        };
        let rest = rest.trim();
        let Some(mut chunk) = rest.strip_prefix('(') else {
            names.extend(import_names(rest));
            continue;
        };
        loop {
            if let Some((inside, _)) = chunk.split_once(')') {
                names.extend(import_names(inside));
                break;
            }
            names.extend(import_names(chunk));
            match lines.next() {
                Some(next) => chunk = next,
                None => break,
            }
        }
    }
    names
}

/// `List as L` still binds `List`; comments and trailing commas are skipped
fn import_names<'a>(list: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let list = list.split('#').next().unwrap_or_default();
    list.split(',').filter_map(|name| name.split_whitespace().next())
}

fn imports_list(header: &str) -> bool {
    typing_imports(header).contains(&"List")
}

fn ensure_list_import(header: &str) -> String {
    if imports_list(header) {
        return header.to_string();
    }
    if header.trim().is_empty() {
        return PYTHON_LIST_IMPORT.to_string();
    }
    format!("{}\n{}", header.trim_end_matches('\n'), PYTHON_LIST_IMPORT)
}

/// Indent every line, including empty ones
fn indent_body(code: &str) -> String {
    code.split('\n')
        .map(|line| format!("{}{}", PYTHON_BODY_INDENT, line))
        .collect::<Vec<_>>()
        .join("\n")
}
