//! Prompt construction.

/// Version of the prompt template below.
///
/// Part of the cache fingerprint; bump it whenever the template changes so
/// stale answers are not served.
pub const PROMPT_VERSION: &str = "v1";

/// Error-message placeholders that mean "no error given".
const EMPTY_ERROR_MARKERS: [&str; 4] = ["N/A", "NA", "NONE", ""];

/// Build the analysis prompt for one request.
pub fn build_analysis_prompt(code: &str, error_message: &str, language: Option<&str>) -> String {
    let language = language.map(str::trim).filter(|l| !l.is_empty());
    let mut prompt = String::new();

    prompt.push_str(
        "Analyze the following code and error message. Explain the root cause precisely \
         and give a concrete, actionable fix.\n\n",
    );

    if let Some(lang) = language {
        prompt.push_str(&format!(
            "IMPORTANT: The code is written in {}. Use {}-specific syntax, conventions and \
             terminology. Do not confuse it with other languages.\n\n",
            lang.to_uppercase(),
            lang
        ));
    }

    prompt.push_str(&format!(
        "Code:\n```{}\n{}\n```\n\n",
        language.unwrap_or(""),
        code
    ));

    if is_missing_error(error_message) {
        prompt.push_str(
            "No error message provided. Only report an actual bug in the code. \
             If the code is correct, state that clearly.\n\n",
        );
    } else {
        prompt.push_str(&format!("Error Message:\n```\n{}\n```\n\n", error_message));
    }

    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

fn is_missing_error(error_message: &str) -> bool {
    let normalized = error_message.trim().to_uppercase();
    EMPTY_ERROR_MARKERS.contains(&normalized.as_str())
}

const RESPONSE_FORMAT: &str = r#"Guidance:
- Check syntax first: missing semicolons, brackets, parentheses or quotes.
- Distinguish properties from methods, and explain null/undefined states.
- Severity: "high" = crashes or breaks execution, "medium" = incorrect behavior, "low" = minor issue.

Respond with a JSON object of this shape:
{
  "explanation": "root cause of the bug",
  "suggestion": "concrete fix or debugging steps",
  "score": <0-100 confidence in this explanation>,
  "severity": "low|medium|high" (optional),
  "bug_type": "e.g. null reference, type error, logic error, syntax error" (optional)
}

Output ONLY the JSON object."#;
