use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;

/// Character budget applied to report text before it is embedded in the
/// analysis prompt.
pub const PROMPT_TEXT_BUDGET: usize = 3000;

pub const DEFAULT_QUERY: &str = "Summarise my Blood Test Report";

/// Confidence recorded for a genuine AI analysis.
pub const AI_CONFIDENCE: f64 = 0.95;
/// Confidence recorded when the templated fallback is substituted.
pub const FALLBACK_CONFIDENCE: f64 = 0.85;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Result of one analysis dispatch. `fallback` is true whenever the text was
/// produced locally instead of by the AI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub text: String,
    pub confidence: f64,
    pub fallback: bool,
}

/// Intent of a user query, used to pick a fallback template when the AI is
/// unavailable. An explicit enumerated mapping; each keyword set is checked in
/// declaration order and the first matching intent wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackIntent {
    Summary,
    AbnormalValues,
    Explanation,
    General,
}

impl FallbackIntent {
    const KEYWORD_MAP: &'static [(FallbackIntent, &'static [&'static str])] = &[
        (FallbackIntent::Summary, &["summary", "summarize", "summarise"]),
        (FallbackIntent::AbnormalValues, &["abnormal", "concerning"]),
        (FallbackIntent::Explanation, &["explain", "meaning"]),
    ];

    pub fn from_query(query: &str) -> Self {
        let query_lower = query.to_lowercase();
        for (intent, keywords) in Self::KEYWORD_MAP {
            if keywords.iter().any(|kw| query_lower.contains(kw)) {
                return *intent;
            }
        }
        FallbackIntent::General
    }
}

/// Build the templated fallback response for a query.
pub fn fallback_analysis(query: &str) -> AnalysisOutcome {
    let text = match FallbackIntent::from_query(query) {
        FallbackIntent::Summary => {
            "Blood Test Report Summary:\n\n\
             This is a fallback analysis for your blood test report. The AI analysis service is currently unavailable.\n\n\
             Key points:\n\
             - Your report has been successfully uploaded and stored\n\
             - All standard blood test parameters are included\n\
             - The report is ready for detailed analysis when the service is restored\n\n\
             Please try the analysis again in a few minutes for a comprehensive AI-powered review of your results."
                .to_string()
        }
        FallbackIntent::AbnormalValues => {
            "Blood Test Analysis - Concerning Values:\n\n\
             This is a fallback analysis for your blood test report. The AI analysis service is currently unavailable.\n\n\
             Note: This is a basic response. For detailed analysis of concerning values, please:\n\
             - Try the analysis again in a few minutes\n\
             - Consult with your healthcare provider\n\
             - Review the report values against standard reference ranges\n\n\
             Your report has been successfully uploaded and is ready for detailed analysis."
                .to_string()
        }
        FallbackIntent::Explanation => {
            "Blood Test Results Explanation:\n\n\
             This is a fallback analysis for your blood test report. The AI analysis service is currently unavailable.\n\n\
             Your blood test report contains standard laboratory values that need to be interpreted in the context of:\n\
             - Your medical history\n\
             - Current symptoms\n\
             - Reference ranges for your age and gender\n\
             - Previous test results\n\n\
             Please try the analysis again in a few minutes for a detailed AI-powered explanation of your specific results."
                .to_string()
        }
        FallbackIntent::General => {
            format!(
                "Blood Test Analysis:\n\n\
                 This is a fallback analysis for your blood test report. The AI analysis service is currently unavailable.\n\n\
                 Your query: '{}'\n\n\
                 Response: Your blood test report has been successfully uploaded and is ready for analysis. \
                 Please try again in a few minutes for a comprehensive AI-powered review of your results.\n\n\
                 In the meantime, you can:\n\
                 - Review the raw values in your report\n\
                 - Compare with standard reference ranges\n\
                 - Consult with your healthcare provider for interpretation",
                query
            )
        }
    };

    AnalysisOutcome {
        text,
        confidence: FALLBACK_CONFIDENCE,
        fallback: true,
    }
}

/// Build the structured prompt requesting the five analysis sections.
pub fn build_prompt(report_text: &str, query: &str) -> String {
    let truncated: String = report_text.chars().take(PROMPT_TEXT_BUDGET).collect();

    format!(
        "You are a medical AI assistant. Please analyze this blood test report and provide a comprehensive analysis.\n\n\
         User Query: {query}\n\n\
         Blood Test Report Content:\n{truncated}\n\n\
         Please provide your analysis in this structured format:\n\n\
         **1. Summary of Key Findings**\n\
         [Provide a brief overview of the blood test results]\n\n\
         **2. Interpretation of Any Abnormal Values**\n\
         [Explain any values that are outside normal ranges]\n\n\
         **3. Clinical Significance of Results**\n\
         [Discuss the medical implications of the findings]\n\n\
         **4. Recommendations for Follow-up**\n\
         [Provide specific recommendations for the patient]\n\n\
         **5. Overall Health Assessment**\n\
         [Give an overall assessment of the patient's health based on these results]\n\n\
         Please be thorough, professional, and provide actionable insights."
    )
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Dispatches extracted report text plus a user query to the Gemini
/// generateContent endpoint. Any failure at all is recovered into the
/// templated fallback; this service never returns an error.
#[derive(Clone)]
pub struct AnalysisService {
    client: Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl AnalysisService {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            api_base: GEMINI_API_BASE.to_string(),
        }
    }

    /// Point the dispatcher at a different API base URL. Used by tests to
    /// substitute a mock server.
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    /// Run one analysis. No retry: a single attempt against the AI, with the
    /// templated fallback substituted on any failure.
    pub async fn analyze(&self, report_text: &str, query: &str) -> AnalysisOutcome {
        let Some(api_key) = &self.api_key else {
            warn!("Gemini API key not configured, using fallback analysis");
            return fallback_analysis(query);
        };

        let prompt = build_prompt(report_text, query);

        match self.generate_content(api_key, &prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("Gemini analysis completed ({} chars)", text.len());
                AnalysisOutcome {
                    text,
                    confidence: AI_CONFIDENCE,
                    fallback: false,
                }
            }
            Ok(_) => {
                warn!("Gemini returned an empty response, using fallback analysis");
                fallback_analysis(query)
            }
            Err(e) => {
                warn!("Gemini analysis failed, using fallback analysis: {}", e);
                fallback_analysis(query)
            }
        }
    }

    async fn generate_content(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateContentResponse = response.json().await?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}
