/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Index-based tag scanning.
//!
//! All template tags are located with plain substring searches rather than
//! regular expressions. Offsets are byte offsets into the scanned `&str`; every
//! offset handed out here sits on a char boundary because each search needle
//! starts with ASCII `{{`, or is a complete UTF-8 string compared byte-exactly.
//!
//! Tag vocabulary:
//!
//! | Tag | Meaning |
//! |---|---|
//! | `{{Name}}` | simple placeholder |
//! | `{{#Name}}...{{/Name}}` | slotted template |
//! | `{{@HTMLPLACEHOLDER[n]}}...{{/HTMLPLACEHOLDER[n]}}` | slot fill content |
//! | `{{$HTMLPLACEHOLDER[n]}}` | slot substitution point |
//! | `{{@key}}...{{/key}}` | array block or conditional block |
//! | `{{^key}}...{{/key}}` | negative (empty array) block |
//! | `{{$key}}` | JSON scalar |

/// Opening prefix of a slot fill block.
pub const SLOT_OPEN_PREFIX: &str = "{{@HTMLPLACEHOLDER";

/// Prefix of a slot substitution point inside a target template.
pub const SLOT_KEY_PREFIX: &str = "{{$HTMLPLACEHOLDER";

/// Build a tag literal such as `{{#Card}}` or `{{/Card}}`.
pub fn tag(sigil: &str, name: &str) -> String {
    let mut out = String::with_capacity(sigil.len() + name.len() + 4);
    out.push_str("{{");
    out.push_str(sigil);
    out.push_str(name);
    out.push_str("}}");
    out
}

/// Find `needle` at or after byte offset `from`.
pub fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|i| i + from)
}

/// Find `needle` at or after byte offset `from`, ignoring ASCII case.
pub fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if from > h.len() {
        return None;
    }
    if n.is_empty() {
        return Some(from);
    }
    if h.len() - from < n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Replace every occurrence of `search`, ignoring ASCII case.
///
/// Inserted text is never rescanned.
pub fn replace_all_ignore_case(input: &str, search: &str, replacement: &str) -> String {
    if search.is_empty() {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(found) = find_ignore_case(input, search, pos) {
        out.push_str(&input[pos..found]);
        out.push_str(replacement);
        pos = found + search.len();
    }
    out.push_str(&input[pos..]);
    out
}

/// Whether `name` is a valid tag name: ASCII alphanumerics and underscores.
pub fn is_tag_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Read the name of a tag whose name starts at `name_start`.
///
/// Returns the trimmed name and the offset just past the closing `}}`. The
/// name is not validated.
pub fn read_tag_name(content: &str, name_start: usize) -> Option<(&str, usize)> {
    let close = find_from(content, "}}", name_start)?;
    Some((content[name_start..close].trim(), close + 2))
}

/// Find the close tag balancing an already-consumed open tag.
///
/// Scanning starts at `start` with depth 1. Each open tag found before the
/// next close tag increases the depth; each close tag decreases it. Returns
/// the offset of the close tag that brings the depth to zero.
pub fn find_matching_close_tag(
    content: &str,
    start: usize,
    open_tag: &str,
    close_tag: &str,
) -> Option<usize> {
    let mut depth = 1usize;
    let mut cursor = start;
    loop {
        let next_close = find_from(content, close_tag, cursor)?;
        match find_from(content, open_tag, cursor) {
            Some(next_open) if next_open < next_close => {
                depth += 1;
                cursor = next_open + open_tag.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                cursor = next_close + close_tag.len();
            }
        }
    }
}

/// A bare `{{Name}}` placeholder located in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub full_match: String,
}

/// Find the next bare `{{Name}}` placeholder at or after `from`.
///
/// Tags whose first character after `{{` is `#`, `@`, `$` or `/` are skipped,
/// as are names that are not valid tag names.
pub fn next_simple_placeholder(content: &str, from: usize) -> Option<PlaceholderSpan> {
    let mut pos = from;
    while let Some(open) = find_from(content, "{{", pos) {
        let after = open + 2;
        if matches!(
            content.as_bytes().get(after),
            Some(b'#' | b'@' | b'$' | b'/')
        ) {
            pos = after;
            continue;
        }
        let (name, end) = read_tag_name(content, after)?;
        if !is_tag_name(name) {
            pos = open + 1;
            continue;
        }
        return Some(PlaceholderSpan {
            name: name.to_string(),
            start: open,
            end,
            full_match: content[open..end].to_string(),
        });
    }
    None
}

/// Whether `name` is a slot key name such as `HTMLPLACEHOLDER2`.
pub fn is_slot_name(name: &str) -> bool {
    const SLOT: &str = "HTMLPLACEHOLDER";
    name.get(..SLOT.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SLOT))
        && name[SLOT.len()..].bytes().all(|b| b.is_ascii_digit())
}

/// Find the next `{{$key}}` scalar reference at or after `from`.
///
/// Slot keys (`{{$HTMLPLACEHOLDER[n]}}`) and invalid names are skipped.
pub fn next_scalar_placeholder(content: &str, from: usize) -> Option<PlaceholderSpan> {
    let mut pos = from;
    while let Some(open) = find_from(content, "{{$", pos) {
        let (name, end) = read_tag_name(content, open + 3)?;
        if !is_tag_name(name) || is_slot_name(name) {
            pos = open + 1;
            continue;
        }
        return Some(PlaceholderSpan {
            name: name.to_string(),
            start: open,
            end,
            full_match: content[open..end].to_string(),
        });
    }
    None
}

/// Collect every bare `{{Name}}` placeholder in `content`.
pub fn scan_simple_placeholders(content: &str) -> Vec<PlaceholderSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(span) = next_simple_placeholder(content, pos) {
        pos = span.end;
        spans.push(span);
    }
    spans
}

/// A `{{#Name}}...{{/Name}}` block located in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlottedSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub inner_start: usize,
    pub inner_end: usize,
}

impl SlottedSpan {
    pub fn full_match<'a>(&self, content: &'a str) -> &'a str {
        &content[self.start..self.end]
    }

    pub fn inner<'a>(&self, content: &'a str) -> &'a str {
        &content[self.inner_start..self.inner_end]
    }
}

/// Find the next balanced slotted-template block at or after `from`.
///
/// Unbalanced opens and invalid names are skipped one byte at a time.
pub fn next_slotted_block(content: &str, from: usize) -> Option<SlottedSpan> {
    let mut pos = from;
    while let Some(open_start) = find_from(content, "{{#", pos) {
        let (name, inner_start) = read_tag_name(content, open_start + 3)?;
        if !is_tag_name(name) {
            pos = open_start + 1;
            continue;
        }
        let close_tag = tag("/", name);
        match find_matching_close_tag(content, inner_start, &tag("#", name), &close_tag) {
            Some(close_start) => {
                return Some(SlottedSpan {
                    name: name.to_string(),
                    start: open_start,
                    end: close_start + close_tag.len(),
                    inner_start,
                    inner_end: close_start,
                });
            }
            None => pos = open_start + 1,
        }
    }
    None
}

/// A `{{@HTMLPLACEHOLDER[n]}}...{{/HTMLPLACEHOLDER[n]}}` slot fill block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpan {
    /// Empty or decimal digits.
    pub number: String,
    pub start: usize,
    pub end: usize,
    pub content: String,
    pub open_tag: String,
    pub close_tag: String,
    /// The `{{$HTMLPLACEHOLDER[n]}}` key this slot fills.
    pub slot_key: String,
}

fn count_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

/// Slot substitution key for a slot number.
pub fn slot_key(number: &str) -> String {
    tag("$", &format!("HTMLPLACEHOLDER{number}"))
}

/// Extract every slot fill block from the inner content of a slotted block.
pub fn parse_slots(inner: &str) -> Vec<SlotSpan> {
    let mut slots = Vec::new();
    let mut pos = 0;
    while let Some(slot_start) = find_from(inner, SLOT_OPEN_PREFIX, pos) {
        let digits_start = slot_start + SLOT_OPEN_PREFIX.len();
        let digits_end = digits_start + count_digits(&inner[digits_start..]);
        if !inner[digits_end..].starts_with("}}") {
            pos = slot_start + 1;
            continue;
        }
        let number = &inner[digits_start..digits_end];
        let slot_name = format!("HTMLPLACEHOLDER{number}");
        let open_tag = tag("@", &slot_name);
        let close_tag = tag("/", &slot_name);
        let content_start = digits_end + 2;
        match find_matching_close_tag(inner, content_start, &open_tag, &close_tag) {
            Some(close_start) => {
                let end = close_start + close_tag.len();
                slots.push(SlotSpan {
                    number: number.to_string(),
                    start: slot_start,
                    end,
                    content: inner[content_start..close_start].to_string(),
                    slot_key: slot_key(number),
                    open_tag,
                    close_tag,
                });
                pos = end;
            }
            None => pos = slot_start + 1,
        }
    }
    slots
}

/// Substitute slot values into a target template body in one pass.
///
/// Every `{{$HTMLPLACEHOLDER[n]}}` is replaced by the value whose key matches
/// exactly, or removed when no value is supplied. Inserted values are never
/// rescanned, so one slot's content cannot fill another slot.
pub fn fill_slots(target: &str, values: &[(String, String)]) -> String {
    let mut out = String::with_capacity(target.len());
    let mut pos = 0;
    let mut search = 0;
    while let Some(start) = find_from(target, SLOT_KEY_PREFIX, search) {
        let digits_start = start + SLOT_KEY_PREFIX.len();
        let digits_end = digits_start + count_digits(&target[digits_start..]);
        if !target[digits_end..].starts_with("}}") {
            search = start + 1;
            continue;
        }
        let end = digits_end + 2;
        out.push_str(&target[pos..start]);
        let key = &target[start..end];
        if let Some((_, value)) = values.iter().find(|(k, _)| k == key) {
            out.push_str(value);
        }
        pos = end;
        search = end;
    }
    out.push_str(&target[pos..]);
    out
}

/// Strip every unfilled `{{$HTMLPLACEHOLDER[n]}}` key.
pub fn remove_remaining_slot_placeholders(html: &str) -> String {
    fill_slots(html, &[])
}

/// List every tag that indicates an unresolved reference.
///
/// `{{$...}}` tags are terminal markers (unfilled optional slots or unused
/// JSON keys) and are not reported.
pub fn find_unresolved_tags(html: &str) -> Vec<String> {
    let mut unresolved = Vec::new();
    let mut pos = 0;
    while let Some(open) = find_from(html, "{{", pos) {
        let Some(close) = find_from(html, "}}", open + 2) else {
            break;
        };
        let inner = html[open + 2..close].trim_start();
        if !inner.starts_with('$') {
            unresolved.push(html[open..close + 2].to_string());
        }
        pos = close + 2;
    }
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tag_builder() {
        assert_eq!(tag("#", "Card"), "{{#Card}}");
        assert_eq!(tag("", "Name"), "{{Name}}");
        assert_eq!(slot_key(""), "{{$HTMLPLACEHOLDER}}");
        assert_eq!(slot_key("2"), "{{$HTMLPLACEHOLDER2}}");
    }

    #[test]
    fn test_matching_close_tag_prefers_outer() {
        let content = "{{#A}}{{#A}}x{{/A}}{{/A}}";
        let found = find_matching_close_tag(content, 6, "{{#A}}", "{{/A}}");
        assert_eq!(found, Some(19));
        assert_eq!(&content[19..], "{{/A}}");
    }

    #[test]
    fn test_matching_close_tag_not_found() {
        assert_eq!(find_matching_close_tag("{{#A}}x", 6, "{{#A}}", "{{/A}}"), None);
        assert_eq!(
            find_matching_close_tag("{{#A}}{{#A}}x{{/A}}", 6, "{{#A}}", "{{/A}}"),
            None
        );
    }

    #[test]
    fn test_find_ignore_case() {
        assert_eq!(find_ignore_case("abc{{$TITLE}}", "{{$title}}", 0), Some(3));
        assert_eq!(find_ignore_case("abc{{$TITLE}}", "{{$title}}", 4), None);
        assert_eq!(find_ignore_case("ab", "abc", 0), None);
        assert_eq!(find_ignore_case("ab", "abc", 5), None);
    }

    #[test]
    fn test_replace_all_ignore_case_does_not_rescan() {
        assert_eq!(
            replace_all_ignore_case("{{$a}} {{$A}}", "{{$a}}", "[{{$a}}]"),
            "[{{$a}}] [{{$a}}]"
        );
        assert_eq!(
            replace_all_ignore_case("Hé {{$x}}", "{{$X}}", "ü"),
            "Hé ü"
        );
    }

    #[test]
    fn test_tag_names() {
        assert!(is_tag_name("Html3AContent"));
        assert!(is_tag_name("main_header"));
        assert!(!is_tag_name(""));
        assert!(!is_tag_name("has space"));
        assert!(!is_tag_name("dash-name"));
    }

    #[test]
    fn test_scan_simple_placeholders_skips_sigils() {
        let content = "{{#A}}{{@B}}{{$C}}{{/D}}{{ Header }}{{bad name}}{{Footer}}";
        let names: Vec<String> = scan_simple_placeholders(content)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Header".to_string(), "Footer".to_string()]);
    }

    #[test]
    fn test_scan_simple_placeholder_full_match_keeps_spacing() {
        let spans = scan_simple_placeholders("x{{ Header }}y");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].full_match, "{{ Header }}");
        assert_eq!(spans[0].start, 1);
        assert_eq!(spans[0].end, 13);
    }

    #[test]
    fn test_malformed_placeholder_retries_one_byte_later() {
        let spans = scan_simple_placeholders("{{{Name}}}");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].full_match, "{{Name}}");
    }

    #[test]
    fn test_next_slotted_block_nested() {
        let content = "<p>{{#A}}x{{#A}}y{{/A}}z{{/A}}</p>";
        let span = next_slotted_block(content, 0).unwrap();
        assert_eq!(span.name, "A");
        assert_eq!(span.full_match(content), "{{#A}}x{{#A}}y{{/A}}z{{/A}}");
        assert_eq!(span.inner(content), "x{{#A}}y{{/A}}z");
    }

    #[test]
    fn test_next_slotted_block_skips_unbalanced() {
        let content = "{{#Open}} {{#Card}}c{{/Card}}";
        let span = next_slotted_block(content, 0).unwrap();
        assert_eq!(span.name, "Card");
    }

    #[test]
    fn test_parse_numbered_slots() {
        let inner = "{{@HTMLPLACEHOLDER}}a{{/HTMLPLACEHOLDER}}{{@HTMLPLACEHOLDER2}}b{{/HTMLPLACEHOLDER2}}";
        let slots = parse_slots(inner);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].number, "");
        assert_eq!(slots[0].content, "a");
        assert_eq!(slots[0].slot_key, "{{$HTMLPLACEHOLDER}}");
        assert_eq!(slots[1].number, "2");
        assert_eq!(slots[1].content, "b");
        assert_eq!(slots[1].close_tag, "{{/HTMLPLACEHOLDER2}}");
    }

    #[test]
    fn test_parse_slots_nested_same_number() {
        let inner = "{{@HTMLPLACEHOLDER}}{{#X}}{{@HTMLPLACEHOLDER}}in{{/HTMLPLACEHOLDER}}{{/X}}{{/HTMLPLACEHOLDER}}";
        let slots = parse_slots(inner);
        assert_eq!(slots.len(), 1);
        assert_eq!(
            slots[0].content,
            "{{#X}}{{@HTMLPLACEHOLDER}}in{{/HTMLPLACEHOLDER}}{{/X}}"
        );
    }

    #[test]
    fn test_fill_slots_no_cross_contamination() {
        let target = "<b>{{$HTMLPLACEHOLDER}}</b><i>{{$HTMLPLACEHOLDER2}}</i><u>{{$HTMLPLACEHOLDER3}}</u>";
        let values = vec![
            (slot_key(""), "{{$HTMLPLACEHOLDER2}}".to_string()),
            (slot_key("2"), "two".to_string()),
        ];
        assert_eq!(
            fill_slots(target, &values),
            "<b>{{$HTMLPLACEHOLDER2}}</b><i>two</i><u></u>"
        );
    }

    #[test]
    fn test_remove_remaining_slot_placeholders() {
        assert_eq!(
            remove_remaining_slot_placeholders("a{{$HTMLPLACEHOLDER}}b{{$HTMLPLACEHOLDER12}}c{{$HTMLPLACEHOLDERx}}"),
            "abc{{$HTMLPLACEHOLDERx}}"
        );
    }

    #[test]
    fn test_find_unresolved_tags() {
        let html = "<p>{{Foo}}</p>{{$HTMLPLACEHOLDER}}{{$Title}}{{#Card}}";
        assert_eq!(
            find_unresolved_tags(html),
            vec!["{{Foo}}".to_string(), "{{#Card}}".to_string()]
        );
        assert!(find_unresolved_tags("<p>done</p>").is_empty());
    }

    #[test]
    fn test_next_scalar_placeholder_skips_slot_keys() {
        let content = "{{$HTMLPLACEHOLDER}}{{$HTMLPLACEHOLDER2}}{{$ bad name}}{{$ Title }}";
        let span = next_scalar_placeholder(content, 0).unwrap();
        assert_eq!(span.name, "Title");
        assert_eq!(span.full_match, "{{$ Title }}");
        assert_eq!(span.end, content.len());
        assert!(next_scalar_placeholder(content, span.end).is_none());

        assert!(is_slot_name("HTMLPLACEHOLDER"));
        assert!(is_slot_name("HtmlPlaceholder12"));
        assert!(!is_slot_name("HTMLPLACEHOLDERX"));
        assert!(!is_slot_name("Title"));
    }
}
