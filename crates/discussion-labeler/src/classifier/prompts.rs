//! Prompt template management.

use handlebars::{no_escape, Handlebars};
use serde::Serialize;

use super::{ClassificationError, LabelTaxonomy};

const CLASSIFY_TEMPLATE_NAME: &str = "classify";

/// Manages Handlebars prompt templates.
pub struct PromptManager {
    handlebars: Handlebars<'static>,
}

#[derive(Serialize)]
struct ClassifyInputs<'a> {
    title: &'a str,
    description: String,
    tags: Vec<&'a str>,
}

impl PromptManager {
    /// Create a prompt manager with the embedded templates.
    pub fn new() -> Result<Self, ClassificationError> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle code in bodies
        handlebars.register_escape_fn(no_escape);
        handlebars.set_strict_mode(true);

        handlebars
            .register_template_string(CLASSIFY_TEMPLATE_NAME, CLASSIFY_TEMPLATE)
            .map_err(|e| ClassificationError::Prompt(e.to_string()))?;

        Ok(Self { handlebars })
    }

    /// System message sent ahead of every classification prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// Render the classification prompt for one discussion.
    ///
    /// The body is augmented with one `name: description` line per
    /// taxonomy entry.
    pub fn render_classification(
        &self,
        title: &str,
        body: &str,
        taxonomy: &LabelTaxonomy,
    ) -> Result<String, ClassificationError> {
        let inputs = ClassifyInputs {
            title,
            description: format!("{body}\n\n{}", taxonomy.prompt_lines()),
            tags: taxonomy.names(),
        };

        self.handlebars
            .render(CLASSIFY_TEMPLATE_NAME, &inputs)
            .map_err(|e| ClassificationError::Prompt(e.to_string()))
    }
}

const SYSTEM_PROMPT: &str = r#"You are an assistant that labels GitHub discussions for a product community.

Choose the labels that best describe the discussion, using only names from the provided list.
Prefer precision over recall: two or three accurate labels are better than many loose ones.
If nothing fits, return an empty list.

Always respond with a JSON object of the form {"tags": ["<label>", ...]}."#;

/// Classification prompt template.
const CLASSIFY_TEMPLATE: &str = r#"## Discussion
Title: {{title}}

{{description}}

## Allowed labels
{{#each tags}}
- {{this}}
{{/each}}

## Task
Return the labels from the allowed list that apply to this discussion as JSON:
{ "tags": ["<label>"] }
"#;
