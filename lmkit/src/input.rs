use lmkit_llm::Prompt;

/// Parse a JSONL prompt file
///
/// Each non-blank line is a JSON string, message object or message array.
/// Lines that are not JSON at all are taken as plain user text.
pub fn parse_prompts(raw: &str) -> Vec<Prompt> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match serde_json::from_str(line) {
            Ok(value) => Prompt::from_json(value),
            Err(_) => Prompt::from(line),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mixed_lines() {
        let raw = r#""quoted prompt"

{"role": "user", "content": "hi"}
[{"role": "system", "content": "be brief"}, {"role": "user", "content": "hi"}]
plain text line
"#;
        let prompts = parse_prompts(raw);

        assert_eq!(
            prompts,
            vec![
                Prompt::Text("quoted prompt".to_owned()),
                Prompt::Records(vec![json!({ "role": "user", "content": "hi" })]),
                Prompt::Records(vec![
                    json!({ "role": "system", "content": "be brief" }),
                    json!({ "role": "user", "content": "hi" }),
                ]),
                Prompt::Text("plain text line".to_owned()),
            ]
        );
    }
}
