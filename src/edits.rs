//! Source rewriting through non-overlapping `(start, end, code)` edits.

use crate::validate::{CompilerError, ERR_EDIT_CONFLICT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: u32,
    pub end: u32,
    pub code: String,
}

impl Edit {
    pub fn replace(start: u32, end: u32, code: impl Into<String>) -> Self {
        Self {
            start,
            end,
            code: code.into(),
        }
    }

    pub fn insert(at: u32, code: impl Into<String>) -> Self {
        Self::replace(at, at, code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("edit [{second_start}, {second_end}) overlaps edit [{first_start}, {first_end})")]
pub struct EditConflict {
    pub first_start: u32,
    pub first_end: u32,
    pub second_start: u32,
    pub second_end: u32,
}

impl From<EditConflict> for CompilerError {
    fn from(err: EditConflict) -> Self {
        CompilerError::new(ERR_EDIT_CONFLICT, &err.to_string(), "", 0, 0)
    }
}

/// Applies `edits` to `source` in one left-to-right pass.
///
/// Edits are ordered by `(start, end)`, so a zero-width insertion sorts before
/// a replacement starting at the same offset. Two edits conflict when the
/// later one starts before the earlier one ends.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, EditConflict> {
    apply_edits_within(source, edits, 0, source.len() as u32)
}

/// Rewrites `source[start..end]` with the edits lying inside that window.
pub fn apply_edits_within(
    source: &str,
    edits: &[Edit],
    start: u32,
    end: u32,
) -> Result<String, EditConflict> {
    let mut sorted: Vec<&Edit> = edits
        .iter()
        .filter(|e| e.start >= start && e.end <= end)
        .collect();
    sorted.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity((end - start) as usize);
    let mut cursor = start;
    let mut prev: Option<&Edit> = None;
    for edit in sorted {
        if let Some(p) = prev {
            if edit.start < p.end {
                return Err(EditConflict {
                    first_start: p.start,
                    first_end: p.end,
                    second_start: edit.start,
                    second_end: edit.end,
                });
            }
        }
        out.push_str(slice(source, cursor, edit.start));
        out.push_str(&edit.code);
        cursor = edit.end;
        prev = Some(edit);
    }
    out.push_str(slice(source, cursor, end));
    Ok(out)
}

fn slice(source: &str, start: u32, end: u32) -> &str {
    source.get(start as usize..end as usize).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applies_in_order_regardless_of_input_order() {
        let src = "a.b + c";
        let edits = vec![
            Edit::replace(6, 7, "vm_0.c"),
            Edit::replace(0, 1, "vm_0.a"),
            Edit::insert(1, "?"),
        ];
        assert_eq!(apply_edits(src, &edits).unwrap(), "vm_0.a?.b + vm_0.c");
    }

    #[test]
    fn test_detects_overlap() {
        let edits = vec![Edit::replace(0, 3, "x"), Edit::replace(2, 4, "y")];
        let err = apply_edits("abcdef", &edits).unwrap_err();
        assert_eq!(err.first_start, 0);
        assert_eq!(err.second_start, 2);
    }

    #[test]
    fn test_window_only_uses_inner_edits() {
        let src = "(a[i])";
        let edits = vec![Edit::replace(3, 4, "_0_0"), Edit::replace(0, 6, "ignored")];
        assert_eq!(apply_edits_within(src, &edits, 1, 5).unwrap(), "a[_0_0]");
    }
}
