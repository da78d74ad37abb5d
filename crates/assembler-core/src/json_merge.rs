/*
 * json_merge.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Merging one template body with its own JSON data.
//!
//! For every array-valued key the first `{{@tag}}...{{/tag}}` block is
//! expanded once per item, and the first `{{^tag}}...{{/tag}}` negative block
//! is kept only when the array is empty. Remaining `{{$key}}` scalars are then
//! substituted. Tag matching ignores ASCII case throughout.
//!
//! The block-level functions here are shared by both engines: the Normal
//! engine applies them directly, the PreProcess loader records their results
//! as replacement mappings.

use serde_json::Value;

use crate::json::{JsonObject, get_ignore_case, is_truthy, scalar_text};
use crate::scanner::{find_ignore_case, is_tag_name, read_tag_name, replace_all_ignore_case, tag};

/// A located block and the text that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEdit {
    pub start: usize,
    pub end: usize,
    pub original: String,
    pub replacement: String,
}

impl BlockEdit {
    /// Splice the replacement into the content the edit was computed from.
    pub fn apply(&self, content: &str) -> String {
        let mut out =
            String::with_capacity(content.len() - (self.end - self.start) + self.replacement.len());
        out.push_str(&content[..self.start]);
        out.push_str(&self.replacement);
        out.push_str(&content[self.end..]);
        out
    }
}

/// Tag names tried for a JSON array key, in priority order.
///
/// The raw key, the lowercased key, the lowercased key without one trailing
/// `s`, and the lowercased key with a trailing `s`.
pub fn candidate_tags(key: &str) -> [String; 4] {
    let lower = key.to_lowercase();
    let singular = lower.strip_suffix('s').unwrap_or(&lower).to_string();
    let plural = format!("{lower}s");
    [key.to_string(), lower, singular, plural]
}

/// Locate the `sigil`-block for the first candidate whose open tag exists.
///
/// The close tag is the first `{{/tag}}` after the open tag; this level is not
/// nesting-aware. A candidate whose open tag is present but whose close tag is
/// missing ends the search without an edit.
fn locate_block(content: &str, key: &str, sigil: &str) -> Option<(usize, usize, usize, usize)> {
    for candidate in candidate_tags(key) {
        let open = tag(sigil, &candidate);
        let Some(start) = find_ignore_case(content, &open, 0) else {
            continue;
        };
        let inner_start = start + open.len();
        let close = tag("/", &candidate);
        let inner_end = find_ignore_case(content, &close, inner_start)?;
        return Some((start, inner_start, inner_end, inner_end + close.len()));
    }
    None
}

/// Expand the array block for `key`, one rendering of the block per item.
pub fn array_block_edit(content: &str, key: &str, items: &[Value]) -> Option<BlockEdit> {
    let (start, inner_start, inner_end, end) = locate_block(content, key, "@")?;
    let block = &content[inner_start..inner_end];
    Some(BlockEdit {
        start,
        end,
        original: content[start..end].to_string(),
        replacement: render_array_items(block, items),
    })
}

/// Resolve the negative block for `key`: its content when the array is empty,
/// nothing otherwise.
pub fn negative_block_edit(content: &str, key: &str, array_is_empty: bool) -> Option<BlockEdit> {
    let (start, inner_start, inner_end, end) = locate_block(content, key, "^")?;
    let replacement = if array_is_empty {
        content[inner_start..inner_end].to_string()
    } else {
        String::new()
    };
    Some(BlockEdit {
        start,
        end,
        original: content[start..end].to_string(),
        replacement,
    })
}

/// Render a block once per array item and concatenate the results.
///
/// Non-object items are exposed to the block as `{{$Value}}`.
pub fn render_array_items(block: &str, items: &[Value]) -> String {
    let mut merged = String::new();
    for item in items {
        match item {
            Value::Object(fields) => merged.push_str(&render_item(block, fields)),
            other => {
                let mut wrapped = JsonObject::new();
                wrapped.insert("Value".to_string(), other.clone());
                merged.push_str(&render_item(block, &wrapped));
            }
        }
    }
    merged
}

/// Render one array item: conditionals first, then `{{$Field}}` scalars.
///
/// Conditionals go first so that a field substitution can never rewrite a
/// conditional tag such as `{{@Selected}}`.
pub fn render_item(block: &str, item: &JsonObject) -> String {
    let mut result = process_conditional_blocks(block, item);
    for (field, value) in item {
        if let Some(text) = scalar_text(value) {
            result = replace_all_ignore_case(&result, &tag("$", field), &text);
        }
    }
    result
}

/// Names of every `{{@Name}}` tag in a block, in first-seen order.
pub fn conditional_keys(block: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut pos = 0;
    while let Some(open) = find_ignore_case(block, "{{@", pos) {
        let Some((name, after)) = read_tag_name(block, open + 3) else {
            break;
        };
        if is_tag_name(name) && !keys.iter().any(|k| k.eq_ignore_ascii_case(name)) {
            keys.push(name.to_string());
        }
        pos = after;
    }
    keys
}

/// Resolve every conditional block in an item rendering against the item.
///
/// Absent keys are false.
pub fn process_conditional_blocks(block: &str, item: &JsonObject) -> String {
    let mut result = block.to_string();
    for key in conditional_keys(block) {
        let condition = get_ignore_case(item, &key).is_some_and(is_truthy);
        result = handle_conditional(&result, &key, condition);
    }
    result
}

/// Keep or drop every `{{@key}}...{{/key}}` block.
///
/// Both `{{/key}}` and `{{ /key}}` close a block; whichever comes first after
/// the open tag is used. An open tag with no close tag ends processing and the
/// rest of the input is left untouched.
pub fn handle_conditional(input: &str, key: &str, condition: bool) -> String {
    let open = tag("@", key);
    let close = tag("/", key);
    let spaced_close = tag(" /", key);

    let mut result = input.to_string();
    let mut search = 0;
    while let Some(start) = find_ignore_case(&result, &open, search) {
        let inner_start = start + open.len();
        let plain = find_ignore_case(&result, &close, inner_start).map(|i| (i, close.len()));
        let spaced =
            find_ignore_case(&result, &spaced_close, inner_start).map(|i| (i, spaced_close.len()));
        let Some((inner_end, close_len)) = [plain, spaced].into_iter().flatten().min() else {
            break;
        };
        let replacement = if condition {
            result[inner_start..inner_end].to_string()
        } else {
            String::new()
        };
        result.replace_range(start..inner_end + close_len, &replacement);
        search = start;
    }
    result
}

/// The steps of merging a template body with its own JSON object.
///
/// Each block edit is computed against the text left by the previous one, so
/// replaying the edits in order (each at the first occurrence of its original
/// text), then every scalar substitution, reproduces `output` exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonMergePlan {
    pub block_edits: Vec<BlockEdit>,
    /// `(key, tag, value)` for every scalar whose `{{$key}}` tag occurs in
    /// the text at the point it is substituted.
    pub scalar_substitutions: Vec<(String, String, String)>,
    pub output: String,
}

/// Plan the merge of `template` with its own JSON object.
pub fn plan_json_merge(template: &str, data: &JsonObject) -> JsonMergePlan {
    let mut plan = JsonMergePlan {
        output: template.to_string(),
        ..JsonMergePlan::default()
    };

    for (key, value) in data {
        let Value::Array(items) = value else {
            continue;
        };
        if let Some(edit) = array_block_edit(&plan.output, key, items) {
            plan.output = edit.apply(&plan.output);
            plan.block_edits.push(edit);
        }
        if let Some(edit) = negative_block_edit(&plan.output, key, items.is_empty()) {
            plan.output = edit.apply(&plan.output);
            plan.block_edits.push(edit);
        }
    }

    for (key, value) in data {
        let Some(text) = scalar_text(value) else {
            continue;
        };
        let placeholder = tag("$", key);
        if find_ignore_case(&plan.output, &placeholder, 0).is_none() {
            continue;
        }
        plan.output = replace_all_ignore_case(&plan.output, &placeholder, &text);
        plan.scalar_substitutions.push((key.clone(), placeholder, text));
    }

    plan
}

/// Merge a template body with its own JSON object.
pub fn merge_template_with_json(template: &str, data: &JsonObject) -> String {
    plan_json_merge(template, data).output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parse_json_object;
    use pretty_assertions::assert_eq;

    fn data(text: &str) -> JsonObject {
        parse_json_object(text).unwrap()
    }

    #[test]
    fn test_candidate_tags() {
        assert_eq!(
            candidate_tags("Items"),
            [
                "Items".to_string(),
                "items".to_string(),
                "item".to_string(),
                "itemss".to_string()
            ]
        );
    }

    #[test]
    fn test_array_block_expands_per_item() {
        let template = "<ul>{{@Items}}<li>{{$Name}}</li>{{/Items}}</ul>";
        let json = data(r#"{"Items": [{"Name": "a"}, {"Name": "b"}, {"Name": "c"}]}"#);
        assert_eq!(
            merge_template_with_json(template, &json),
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn test_array_block_matches_singular_tag() {
        let template = "{{@item}}[{{$id}}]{{/item}}";
        let json = data(r#"{"Items": [{"Id": 1}, {"Id": 2}]}"#);
        assert_eq!(merge_template_with_json(template, &json), "[1][2]");
    }

    #[test]
    fn test_array_block_matches_plural_tag() {
        let template = "{{@rows}}<tr/>{{/rows}}";
        let json = data(r#"{"Row": [{}, {}]}"#);
        assert_eq!(merge_template_with_json(template, &json), "<tr/><tr/>");
    }

    #[test]
    fn test_negative_block_exclusivity() {
        let template = "{{@Items}}<li>{{$Name}}</li>{{/Items}}{{^Items}}<p>None</p>{{/Items}}";

        let filled = data(r#"{"Items": [{"Name": "a"}]}"#);
        assert_eq!(merge_template_with_json(template, &filled), "<li>a</li>");

        let empty = data(r#"{"Items": []}"#);
        assert_eq!(merge_template_with_json(template, &empty), "<p>None</p>");
    }

    #[test]
    fn test_negative_block_before_positive_block() {
        let template = "{{^Items}}none{{/Items}}|{{@Items}}x{{/Items}}";
        let empty = data(r#"{"Items": []}"#);
        assert_eq!(merge_template_with_json(template, &empty), "none|");
    }

    #[test]
    fn test_conditionals_inside_items() {
        let template = "{{@Options}}<option{{@Selected}} selected{{/Selected}}>{{$Label}}</option>{{/Options}}";
        let json = data(
            r#"{"Options": [
                {"Label": "a", "Selected": true},
                {"Label": "b", "Selected": "false"},
                {"Label": "c", "Selected": 1},
                {"Label": "d"}
            ]}"#,
        );
        assert_eq!(
            merge_template_with_json(template, &json),
            "<option selected>a</option><option>b</option><option selected>c</option><option>d</option>"
        );
    }

    #[test]
    fn test_conditional_spaced_close_form() {
        let item = data(r#"{"Flag": "TRUE"}"#);
        assert_eq!(process_conditional_blocks("<{{@Flag}}X{{ /Flag}}>", &item), "<X>");
        let item = data(r#"{"Flag": 0}"#);
        assert_eq!(process_conditional_blocks("<{{@Flag}}X{{ /Flag}}>", &item), "<>");
        assert_eq!(process_conditional_blocks("<{{@Flag}}X{{/Flag}}>", &item), "<>");
    }

    #[test]
    fn test_conditional_mixed_close_forms_pair_nearest() {
        let result = handle_conditional("{{@K}}a{{/K}}-{{@K}}b{{ /K}}", "K", false);
        assert_eq!(result, "-");
        let result = handle_conditional("{{@K}}a{{/K}}-{{@K}}b{{ /K}}", "k", true);
        assert_eq!(result, "a-b");
    }

    #[test]
    fn test_unbalanced_conditional_left_untouched() {
        let item = data(r#"{"Flag": true}"#);
        assert_eq!(
            process_conditional_blocks("a{{@Flag}}b", &item),
            "a{{@Flag}}b"
        );
    }

    #[test]
    fn test_scalar_substitution_is_case_insensitive() {
        let template = "<h1>{{$title}}</h1><p>{{$COUNT}} {{$Flag}}</p>";
        let json = data(r#"{"Title": "Hi", "Count": 3, "Flag": false, "Nothing": null}"#);
        assert_eq!(
            merge_template_with_json(template, &json),
            "<h1>Hi</h1><p>3 false</p>"
        );
    }

    #[test]
    fn test_scalar_array_items_use_value_field() {
        let template = "{{@Tags}}#{{$Value}} {{/Tags}}";
        let json = data(r#"{"Tags": ["rust", "html"]}"#);
        assert_eq!(merge_template_with_json(template, &json), "#rust #html ");
    }

    #[test]
    fn test_missing_close_tag_leaves_block() {
        let template = "{{@Items}}<li>{{$Name}}</li>";
        let json = data(r#"{"Items": [{"Name": "a"}]}"#);
        assert_eq!(merge_template_with_json(template, &json), template);
    }

    #[test]
    fn test_top_level_scalars_reach_into_items() {
        let template = "{{@Items}}{{$Name}}@{{$Site}};{{/Items}}";
        let json = data(r#"{"Site": "demo", "Items": [{"Name": "a"}, {"Name": "b"}]}"#);
        assert_eq!(merge_template_with_json(template, &json), "a@demo;b@demo;");
    }

    #[test]
    fn test_plan_edits_replay_to_output() {
        let template = "{{@Items}}<li>{{$Name}}</li>{{/Items}}{{^Items}}none{{/Items}}<p>{{$site}}</p>";
        let json = data(r#"{"Items": [{"Name": "a"}], "Site": "demo", "Unused": "x"}"#);
        let plan = plan_json_merge(template, &json);

        assert_eq!(plan.block_edits.len(), 2);
        assert_eq!(plan.block_edits[1].original, "{{^Items}}none{{/Items}}");
        assert_eq!(
            plan.scalar_substitutions,
            vec![("Site".to_string(), "{{$Site}}".to_string(), "demo".to_string())]
        );

        let mut replayed = template.to_string();
        for edit in &plan.block_edits {
            let at = replayed.find(&edit.original).unwrap();
            replayed.replace_range(at..at + edit.original.len(), &edit.replacement);
        }
        for (_, placeholder, value) in &plan.scalar_substitutions {
            replayed = replace_all_ignore_case(&replayed, placeholder, value);
        }
        assert_eq!(replayed, plan.output);
        assert_eq!(plan.output, "<li>a</li><p>demo</p>");
    }
}
