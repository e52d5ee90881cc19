//! Analysis prompt construction.

use std::fmt::Write;

use playcoach_models::PromptSpec;

/// Capitalize the first character and lowercase the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn focus_section(focus: &str) -> String {
    format!(
        "### **Special Focus: {heading}**\n\
         - Pay particular attention to **{focus}** when analyzing the gameplay.\n\
         - Identify **mistakes, missed opportunities, and better alternatives** specifically related to {focus}.\n\
         - Prioritize improvements in {focus} over other areas in the breakdown.\n\n",
        heading = capitalize(focus),
        focus = focus,
    )
}

fn output_format(game: &str) -> String {
    format!(
        r#"### **Output Format:**
Return the analysis strictly in the following JSON format:
```json
{{
  "game": "{game}",
  "key_focus_areas": [
    "Factor 1",
    "Factor 2",
    "Factor 3",
    "Factor 4"
  ],
  "mistakes": [
    {{
      "timestamp": "00:00:00",
      "description": "Brief mistake description.",
      "why_incorrect": "Explanation of why this mistake is bad.",
      "better_alternative": "What should have been done instead.",
      "expected_benefit": "Why the alternative is superior."
    }}
  ],
  "repeated_errors": [
    {{
      "pattern": "Description of recurring mistake.",
      "occurrences": ["00:01:30", "00:04:15"],
      "fix": "Advice on how to correct this mistake."
    }}
  ],
  "missed_opportunities": [
    {{
      "timestamp": "00:02:45",
      "missed_action": "What could have been done instead.",
      "expected_outcome": "Benefit of the missed opportunity."
    }}
  ]
}}
```

"#,
        game = game
    )
}

const INSTRUCTIONS: &str = "### **Important Instructions:**\n\
- **Only return JSON output**. Do not include any additional text.\n\
- Focus exclusively on **mistakes, missed opportunities, and better alternatives.**\n\
- Do **not** include strengths or positive feedback.\n\
- Always include timestamps when referring to gameplay moments.\n\
- Keep every explanation specific, structured and **actionable**.\n\
- Phrase alternatives so it is clear **how the player should adjust their playstyle.**\n\
- Do not include conversational elements. Return only the structured JSON output.";

/// Build the instruction string sent alongside the video.
///
/// Deterministic for a given spec. A focus area adds a "Special Focus"
/// section ahead of the output format.
pub fn build_prompt(spec: &PromptSpec) -> String {
    let game = spec.game_name();
    let mut prompt = String::with_capacity(4096);

    let _ = write!(
        prompt,
        "You are an expert video game coach specializing in analyzing gameplay for {game}.\n\
         Your task is to analyze a gameplay video and provide **a comprehensive, mistake-focused breakdown** \
         based on the game's mechanics, strategies, and execution.\n\n\
         ### **Step 1: Identify Key Focus Areas for Analysis**\n\
         - Before analyzing the video, list at least **6-8 key factors** that influence success in {game}.\n\
         - These could include mechanics, strategy, decision-making, positioning, adaptability, execution, etc.\n\
         - Weigh their importance before selecting the **4-5 most critical areas** for identifying mistakes.\n\n\
         ### **Step 2: Extract and List All Mistakes & Better Alternatives**\n\
         Provide an exhaustive breakdown of **all major mistakes** made by the player, along with better choices they could have made.\n\
         - Each mistake must be accompanied by a **timestamp** and a specific explanation of why it was incorrect.\n\
         - Provide **a clearly superior alternative action** with a rationale for why it would have been better.\n\n",
        game = game
    );

    if let Some(focus) = spec.focus_on() {
        prompt.push_str(&focus_section(focus));
    }

    prompt.push_str(&output_format(game));
    prompt.push_str(INSTRUCTIONS);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(game: &str, focus: Option<&str>) -> PromptSpec {
        PromptSpec::new(game, focus.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_contains_output_contract() {
        let prompt = build_prompt(&spec("EA FC 24", None));
        assert!(prompt.contains("gameplay for EA FC 24"));
        assert!(prompt.contains("6-8 key factors"));
        assert!(prompt.contains("4-5 most critical areas"));
        assert!(prompt.contains("\"game\": \"EA FC 24\""));
        for key in [
            "key_focus_areas",
            "why_incorrect",
            "better_alternative",
            "expected_benefit",
            "occurrences",
            "missed_action",
            "expected_outcome",
        ] {
            assert!(prompt.contains(key), "missing {}", key);
        }
        assert!(prompt.contains("Only return JSON output"));
        assert!(!prompt.contains("Special Focus"));
    }

    #[test]
    fn test_focus_section_precedes_output_format() {
        let prompt = build_prompt(&spec("EA FC 24", Some("defending")));
        let focus_at = prompt.find("### **Special Focus: Defending**").unwrap();
        let format_at = prompt.find("### **Output Format:**").unwrap();
        assert!(focus_at < format_at);
        assert!(prompt.contains("attention to **defending**"));
    }

    #[test]
    fn test_deterministic() {
        let s = spec("Rocket League", Some("rotations"));
        assert_eq!(build_prompt(&s), build_prompt(&s));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("set PIECES"), "Set pieces");
        assert_eq!(capitalize(""), "");
    }
}
