//! Analysis result model and model-response parsing

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Topic used when the model's answer could not be parsed
pub const FALLBACK_TOPIC: &str = "Unable to parse analysis";

/// Characters of the raw answer kept as the fallback summary
pub const FALLBACK_SUMMARY_CHARS: usize = 200;

/// Instruction sent to the model together with the uploaded video
pub const ANALYSIS_PROMPT: &str = r#"Analyze the content of this video from the perspective of a marketing analyst.
Based on the video's visual and audio content, please perform the following:
1. Identify the main topic of the video.
2. Provide a brief one-sentence summary.
3. Categorize the video into the most relevant interest bucket from this list:
   'Technology & Innovation', 'Entertainment & Pop Culture', 'Education & Learning',
   'Lifestyle & Wellness', 'Gaming', 'Finance & Business', 'Travel & Adventure'.

Please provide the output in a clean JSON format like this:
{
  "topic": "The main subject of the video",
  "summary": "A concise one-sentence summary.",
  "interest_bucket": "The most fitting category from the list"
}"#;

/// Closed set of audience interest categories
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum InterestBucket {
    /// Technology & Innovation
    #[serde(rename = "Technology & Innovation")]
    TechnologyInnovation,
    /// Entertainment & Pop Culture (also the fallback)
    #[default]
    #[serde(rename = "Entertainment & Pop Culture")]
    EntertainmentPopCulture,
    /// Education & Learning
    #[serde(rename = "Education & Learning")]
    EducationLearning,
    /// Lifestyle & Wellness
    #[serde(rename = "Lifestyle & Wellness")]
    LifestyleWellness,
    /// Gaming
    #[serde(rename = "Gaming")]
    Gaming,
    /// Finance & Business
    #[serde(rename = "Finance & Business")]
    FinanceBusiness,
    /// Travel & Adventure
    #[serde(rename = "Travel & Adventure")]
    TravelAdventure,
}

impl InterestBucket {
    /// All buckets in prompt order
    pub const ALL: [InterestBucket; 7] = [
        InterestBucket::TechnologyInnovation,
        InterestBucket::EntertainmentPopCulture,
        InterestBucket::EducationLearning,
        InterestBucket::LifestyleWellness,
        InterestBucket::Gaming,
        InterestBucket::FinanceBusiness,
        InterestBucket::TravelAdventure,
    ];

    /// Display label, identical to the serialized form
    pub fn label(&self) -> &'static str {
        match self {
            InterestBucket::TechnologyInnovation => "Technology & Innovation",
            InterestBucket::EntertainmentPopCulture => "Entertainment & Pop Culture",
            InterestBucket::EducationLearning => "Education & Learning",
            InterestBucket::LifestyleWellness => "Lifestyle & Wellness",
            InterestBucket::Gaming => "Gaming",
            InterestBucket::FinanceBusiness => "Finance & Business",
            InterestBucket::TravelAdventure => "Travel & Adventure",
        }
    }

    /// Bucket for a label, ignoring case and surrounding whitespace/quotes
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(wanted))
    }
}

impl std::fmt::Display for InterestBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured classification of a video
///
/// Always fully populated: either parsed from the model's answer or built by
/// [`AnalysisResult::fallback`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    /// Main subject of the video
    pub topic: String,
    /// One-sentence summary
    pub summary: String,
    /// Most fitting audience category
    pub interest_bucket: InterestBucket,
}

impl AnalysisResult {
    /// Result used when the raw answer is not the expected JSON
    pub fn fallback(raw: &str) -> Self {
        Self {
            topic: FALLBACK_TOPIC.to_string(),
            summary: raw.chars().take(FALLBACK_SUMMARY_CHARS).collect(),
            interest_bucket: InterestBucket::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawAnswer {
    topic: String,
    summary: String,
    interest_bucket: String,
}

/// Parse the model's answer, falling back instead of failing
///
/// Code fences (```` ```json ```` / ```` ``` ````) are removed before parsing.
/// A bucket label outside the closed set maps to the default bucket.
pub fn parse_model_response(raw: &str) -> AnalysisResult {
    let cleaned = raw
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "");

    match serde_json::from_str::<RawAnswer>(cleaned.trim()) {
        Ok(answer) => {
            let interest_bucket =
                InterestBucket::from_label(&answer.interest_bucket).unwrap_or_else(|| {
                    tracing::warn!(
                        bucket = %answer.interest_bucket,
                        "model returned an unknown interest bucket, using default"
                    );
                    InterestBucket::default()
                });
            AnalysisResult {
                topic: answer.topic,
                summary: answer.summary,
                interest_bucket,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse model response as JSON, using fallback");
            AnalysisResult::fallback(raw)
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_parsed() {
        let raw = "```json\n{\n  \"topic\": \"Rust async\",\n  \"summary\": \"A talk about futures.\",\n  \"interest_bucket\": \"Technology & Innovation\"\n}\n```";
        let result = parse_model_response(raw);
        assert_eq!(result.topic, "Rust async");
        assert_eq!(result.summary, "A talk about futures.");
        assert_eq!(result.interest_bucket, InterestBucket::TechnologyInnovation);
    }

    #[test]
    fn bare_json_is_parsed() {
        let raw = r#"{"topic":"Speedrun","summary":"Fast.","interest_bucket":"gaming"}"#;
        let result = parse_model_response(raw);
        assert_eq!(result.interest_bucket, InterestBucket::Gaming);
    }

    #[test]
    fn fenced_invalid_json_falls_back_with_all_fields() {
        let raw = "```json\n{\"topic\": \"Cooking\", \"summary\": unquoted}\n```";
        let result = parse_model_response(raw);
        assert_eq!(result.topic, FALLBACK_TOPIC);
        assert_eq!(result.summary, raw);
        assert_eq!(result.interest_bucket, InterestBucket::EntertainmentPopCulture);
    }

    #[test]
    fn missing_field_falls_back() {
        let result = parse_model_response(r#"{"topic":"x","summary":"y"}"#);
        assert_eq!(result.topic, FALLBACK_TOPIC);
    }

    #[test]
    fn fallback_summary_is_first_200_chars() {
        let raw = "é".repeat(500);
        let result = AnalysisResult::fallback(&raw);
        assert_eq!(result.summary.chars().count(), 200);
        assert!(raw.starts_with(&result.summary));

        let short = AnalysisResult::fallback("The video shows a cat.");
        assert_eq!(short.summary, "The video shows a cat.");
    }

    #[test]
    fn unknown_bucket_maps_to_default() {
        let raw = r#"{"topic":"t","summary":"s","interest_bucket":"Sports"}"#;
        let result = parse_model_response(raw);
        assert_eq!(result.topic, "t");
        assert_eq!(result.interest_bucket, InterestBucket::default());
    }

    #[test]
    fn bucket_labels_roundtrip_through_serde() {
        for bucket in InterestBucket::ALL {
            let json = serde_json::to_string(&bucket).unwrap();
            assert_eq!(json, format!("\"{}\"", bucket.label()));
            assert_eq!(InterestBucket::from_label(bucket.label()), Some(bucket));
        }
        assert_eq!(
            InterestBucket::from_label(" 'finance & business' "),
            Some(InterestBucket::FinanceBusiness)
        );
    }

    #[test]
    fn prompt_lists_every_bucket() {
        for bucket in InterestBucket::ALL {
            assert!(ANALYSIS_PROMPT.contains(bucket.label()));
        }
    }
}
