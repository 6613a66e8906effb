//! Prompt templates for Tubelens.
//!
//! Prompts can be customized by placing an `analysis.toml` file in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"))
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the transcript analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert content analyst. You read transcripts of spoken content (videos, podcasts, talks, meetings) and produce clear, well-structured analyses.

Guidelines:
- Base every statement on the transcript; never invent facts, names or numbers
- Quote the speaker verbatim when citing notable quotes
- Be concise but thorough
- If the transcript is truncated, analyze what is available and say so
- Format the response in Markdown with the exact section headings requested"#
                .to_string(),

            user: r#"Analyze the following transcript (source: {{source}}) and provide a structured analysis.

## Summary
A 2-3 paragraph overview of the content.

## Key Points
The 5-10 most important points, as a bulleted list.

## Main Topics
The main topics or themes discussed, with a short description of each.

## Notable Quotes
3-5 memorable or significant quotes, verbatim.

## Target Audience
Who this content is for and what prior knowledge it assumes.

## Content Quality Assessment
Depth, accuracy, clarity and production value, with a rating out of 10 and a one-line justification.

## Action Items
Practical takeaways or next steps a viewer could act on.

Transcript:
{{transcript}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in one pass over the template, so substituted
    /// values are never rescanned. Unknown placeholders are kept as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Build the user prompt for analyzing a transcript.
    pub fn analysis_user_prompt(&self, source_label: &str, transcript: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("source".to_string(), source_label.to_string());
        vars.insert("transcript".to_string(), transcript.to_string());
        self.render_with_custom(&self.analysis.user, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.analysis.system.is_empty());
        assert!(prompts.analysis.user.contains("{{transcript}}"));
        assert!(prompts.analysis.user.contains("## Action Items"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_analysis_prompt_inserts_transcript() {
        let mut prompts = Prompts::default();
        prompts.analysis.user = "[{{audience}}] {{source}}: {{transcript}}".to_string();
        prompts
            .variables
            .insert("audience".to_string(), "engineers".to_string());

        let rendered = prompts.analysis_user_prompt("dQw4w9WgXcQ", "hello world");
        assert_eq!(rendered, "[engineers] dQw4w9WgXcQ: hello world");
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
        assert_eq!(Prompts::render("{{name}} {{other}}", &vars), "Alice {{other}}");
    }

    #[test]
    fn test_transcript_placeholders_are_not_substituted() {
        let mut prompts = Prompts::default();
        prompts.analysis.user = "{{source}} [{{audience}}]: {{transcript}}".to_string();
        prompts
            .variables
            .insert("audience".to_string(), "engineers".to_string());

        let transcript = "he said {{source}} and {{audience}} literally";
        for _ in 0..50 {
            let rendered = prompts.analysis_user_prompt("VID", transcript);
            assert_eq!(
                rendered,
                "VID [engineers]: he said {{source}} and {{audience}} literally"
            );
        }
    }

    #[test]
    fn test_load_custom_analysis_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("analysis.toml"),
            "system = \"custom system\"\nuser = \"custom {{transcript}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.analysis.system, "custom system");
        assert_eq!(prompts.analysis.user, "custom {{transcript}}");
    }
}
