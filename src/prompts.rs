//! Prompts for the LLM translation backend.
//!
//! Callers can override the system prompt via
//! [`crate::config::TranslationConfig::system_prompt`]; the template here is
//! used only when no override is provided. Both forms go through
//! [`system_prompt`] so the `{source}`/`{target}` placeholders are filled the
//! same way.

/// Default system prompt for translating one text block.
///
/// `{source}` and `{target}` are replaced with language codes.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional document translator. Translate the user's text from {source} to {target}.

Follow these rules precisely:

1. Output ONLY the translation. No quotes, no commentary, no notes.
2. Preserve numbers, units, codes, references and proper nouns exactly.
3. Keep line breaks where the source has them.
4. The text is a fragment of a laid-out page (a heading, a table cell, a
   paragraph). Do not complete or expand it.
5. If the text is already in {target} or has nothing to translate, return it
   unchanged."#;

/// Language name used in the prompt; `"auto"` becomes a neutral phrase.
fn language_label(code: &str) -> String {
    if code.eq_ignore_ascii_case("auto") {
        "the detected source language".to_string()
    } else {
        format!("'{code}'")
    }
}

/// Fill the language placeholders of `template` (or the default prompt).
pub fn system_prompt(template: Option<&str>, source: &str, target: &str) -> String {
    template
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .replace("{source}", &language_label(source))
        .replace("{target}", &language_label(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_names_both_languages() {
        let p = system_prompt(None, "fr", "en");
        assert!(p.contains("from 'fr' to 'en'"));
        assert!(!p.contains("{source}"));
        assert!(!p.contains("{target}"));
    }

    #[test]
    fn auto_source_reads_naturally() {
        let p = system_prompt(None, "auto", "de");
        assert!(p.contains("from the detected source language to 'de'"));
    }

    #[test]
    fn custom_template_is_filled() {
        let p = system_prompt(Some("{source}->{target}"), "es", "it");
        assert_eq!(p, "'es'->'it'");
    }
}
