//! Structured gameplay critique.
//!
//! This is the schema the model is instructed to return. Every top-level key
//! and every element field is required; a response missing any of them does
//! not deserialize.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema-constrained critique of a single gameplay video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    /// Game the critique is for
    pub game: String,
    /// The 4-5 success factors the model narrowed down to
    pub key_focus_areas: Vec<String>,
    /// Individual mistakes with a better alternative
    pub mistakes: Vec<Mistake>,
    /// Mistakes that recur across the video
    pub repeated_errors: Vec<RepeatedError>,
    /// Actions the player could have taken but didn't
    pub missed_opportunities: Vec<MissedOpportunity>,
}

/// A single mistake at a point in the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    /// Position in the video (HH:MM:SS)
    pub timestamp: String,
    pub description: String,
    pub why_incorrect: String,
    pub better_alternative: String,
    pub expected_benefit: String,
}

/// A recurring error pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedError {
    pub pattern: String,
    /// Timestamps where the pattern shows up
    pub occurrences: Vec<String>,
    pub fix: String,
}

/// An opportunity the player missed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedOpportunity {
    pub timestamp: String,
    pub missed_action: String,
    pub expected_outcome: String,
}

impl StructuredAnalysis {
    /// Total number of findings across all sections.
    pub fn finding_count(&self) -> usize {
        self.mistakes.len() + self.repeated_errors.len() + self.missed_opportunities.len()
    }
}

impl fmt::Display for StructuredAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game: {}\n\n", self.game)?;

        writeln!(f, "Key Focus Areas:")?;
        for area in &self.key_focus_areas {
            writeln!(f, "- {}", area)?;
        }

        write!(f, "\nMistakes:\n")?;
        for mistake in &self.mistakes {
            writeln!(f, "  Timestamp: {}", mistake.timestamp)?;
            writeln!(f, "  Description: {}", mistake.description)?;
            writeln!(f, "  Why Incorrect: {}", mistake.why_incorrect)?;
            writeln!(f, "  Better Alternative: {}", mistake.better_alternative)?;
            writeln!(f, "  Expected Benefit: {}", mistake.expected_benefit)?;
            writeln!(f)?;
        }

        writeln!(f, "Repeated Errors:")?;
        for error in &self.repeated_errors {
            writeln!(f, "  Pattern: {}", error.pattern)?;
            writeln!(f, "  Occurrences: {}", error.occurrences.join(", "))?;
            writeln!(f, "  Fix: {}", error.fix)?;
            writeln!(f)?;
        }

        writeln!(f, "Missed Opportunities:")?;
        for opportunity in &self.missed_opportunities {
            writeln!(f, "  Timestamp: {}", opportunity.timestamp)?;
            writeln!(f, "  Missed Action: {}", opportunity.missed_action)?;
            writeln!(f, "  Expected Outcome: {}", opportunity.expected_outcome)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Render an analysis as human-readable text.
pub fn render_analysis(analysis: &StructuredAnalysis) -> String {
    analysis.to_string()
}
