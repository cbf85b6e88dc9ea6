// libs/ai-cell/src/services/generation.rs
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{
    AiError, ChatTurn, HealthArticle, LifecyclePhases, ScheduleEntry, SymptomAnalysisRequest,
    SymptomDiagnosis, TreatmentPlan,
};
use crate::services::providers::TextGenerationProvider;

const CHAT_HISTORY_LIMIT: usize = 10;

/// Medical text generation on top of whichever provider is configured.
///
/// Provider failures are errors. A reply that cannot be read as the expected
/// JSON shape falls back to a templated answer built around the raw text.
pub struct AiService {
    provider: Option<Arc<dyn TextGenerationProvider>>,
}

impl AiService {
    pub fn new(provider: Option<Arc<dyn TextGenerationProvider>>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(|p| p.name())
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let provider = self.provider.as_deref().ok_or(AiError::NotConfigured)?;
        debug!("Sending {} char prompt to {}", prompt.len(), provider.name());
        provider.generate(prompt).await
    }

    pub async fn diagnose_symptoms(&self, request: &SymptomAnalysisRequest) -> Result<SymptomDiagnosis, AiError> {
        if request.symptoms.trim().is_empty() {
            return Err(AiError::Validation("Symptoms are required".to_string()));
        }

        let text = self.generate(&diagnosis_prompt(request)).await?;
        Ok(parse_generated(&text).unwrap_or_else(|| {
            warn!("Diagnosis reply was not structured, using template");
            fallback_diagnosis(&text)
        }))
    }

    pub async fn treatment_plan(&self, condition: &str, severity: &str) -> Result<TreatmentPlan, AiError> {
        if condition.trim().is_empty() {
            return Err(AiError::Validation("Condition is required".to_string()));
        }

        let text = self.generate(&treatment_prompt(condition, severity)).await?;
        Ok(parse_generated(&text).unwrap_or_else(|| {
            warn!("Treatment plan reply was not structured, using template");
            fallback_treatment_plan()
        }))
    }

    pub async fn health_article(&self, topic: &str) -> Result<HealthArticle, AiError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AiError::Validation("Topic is required".to_string()));
        }

        let text = self.generate(&article_prompt(topic)).await?;
        Ok(parse_generated(&text).unwrap_or_else(|| {
            warn!("Article reply was not structured, using template");
            fallback_article(&text, topic)
        }))
    }

    /// Free-form reply; only the latest turns of `history` are sent.
    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<String, AiError> {
        if message.trim().is_empty() {
            return Err(AiError::Validation("Message is required".to_string()));
        }

        let reply = self.generate(&chat_prompt(message, history)).await?;
        info!("Chat reply generated ({} chars)", reply.len());
        Ok(reply.trim().to_string())
    }
}

/// Reads a JSON object from a model reply, tolerating code fences and prose
/// around it.
pub fn parse_generated<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ==============================================================================
// PROMPTS
// ==============================================================================

fn diagnosis_prompt(request: &SymptomAnalysisRequest) -> String {
    format!(
        r#"As a medical AI assistant, analyze the following symptoms and provide a comprehensive diagnosis and treatment plan:

Symptoms: {symptoms}
Affected body parts: {body_parts}
Severity: {severity}
Duration: {duration}

Please provide a structured response with:
1. Most likely condition name
2. Confidence percentage (0-100)
3. Brief description of the condition
4. 5 natural remedies with specific instructions
5. 5 healing foods and dietary recommendations
6. 3 recommended medications (over-the-counter)
7. 4 administration instructions
8. Important warning signs to watch for

Format the response as a JSON object with the following structure:
{{
  "condition": "condition name",
  "confidence": number,
  "description": "description",
  "naturalRemedies": ["remedy1", "remedy2", ...],
  "foods": ["food1", "food2", ...],
  "medications": ["med1", "med2", ...],
  "administration": ["instruction1", "instruction2", ...],
  "warning": "warning text"
}}"#,
        symptoms = request.symptoms.trim(),
        body_parts = request.body_parts.join(", "),
        severity = request.severity,
        duration = request.duration,
    )
}

fn treatment_prompt(condition: &str, severity: &str) -> String {
    format!(
        r#"Create a comprehensive treatment plan for: {condition} ({severity} severity)

Provide a detailed treatment plan with:
1. Lifecycle phases (3 phases with descriptions)
2. 6 natural remedies with specific instructions
3. 6 healing foods and dietary recommendations
4. 4 recommended medications
5. 5 recommended exercises
6. Daily schedule with 4 time-based activities
7. 4 prevention tips for future occurrences
8. Possible causes (3-4 causes)

Format as JSON:
{{
  "lifecyclePhases": {{
    "phase1": "description",
    "phase2": "description",
    "phase3": "description"
  }},
  "naturalRemedies": ["remedy1", ...],
  "foods": ["food1", ...],
  "medications": ["med1", ...],
  "exercises": ["exercise1", ...],
  "dailySchedule": [
    {{"time": "08:00", "activity": "activity", "type": "medication"}},
    ...
  ],
  "preventionTips": ["tip1", ...],
  "possibleCauses": ["cause1", ...]
}}"#
    )
}

fn article_prompt(topic: &str) -> String {
    format!(
        r#"Write a comprehensive health education article about: {topic}

Include:
1. Detailed overview (2-3 paragraphs)
2. 6 key points with actionable advice
3. 5 natural treatments with specific instructions
4. Scientific evidence and recent research
5. Prevention strategies
6. When to seek medical attention

Format as JSON:
{{
  "title": "article title",
  "overview": "detailed overview text",
  "keyPoints": ["point1", "point2", ...],
  "naturalTreatments": ["treatment1", ...],
  "evidence": "scientific evidence text",
  "prevention": ["strategy1", ...],
  "seekHelp": "when to seek medical attention"
}}"#
    )
}

fn chat_prompt(message: &str, history: &[ChatTurn]) -> String {
    let skip = history.len().saturating_sub(CHAT_HISTORY_LIMIT);
    let mut prompt = String::from(
        "You are a friendly medical assistant chatting with a patient. Answer briefly and recommend seeing a healthcare professional when symptoms are serious.\n\n",
    );
    for turn in &history[skip..] {
        prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    prompt.push_str(&format!("user: {}\nassistant:", message.trim()));
    prompt
}

// ==============================================================================
// FALLBACK TEMPLATES
// ==============================================================================

pub fn fallback_diagnosis(text: &str) -> SymptomDiagnosis {
    SymptomDiagnosis {
        condition: "AI-Generated Diagnosis".to_string(),
        confidence: 75,
        description: excerpt(text, 200),
        natural_remedies: strings(&[
            "Rest and adequate sleep",
            "Stay hydrated with water",
            "Apply warm or cold compress",
            "Practice stress reduction",
            "Maintain healthy diet",
        ]),
        foods: strings(&[
            "Fresh fruits and vegetables",
            "Lean proteins",
            "Whole grains",
            "Anti-inflammatory foods",
            "Plenty of fluids",
        ]),
        medications: strings(&[
            "Over-the-counter pain relievers as needed",
            "Consult pharmacist for recommendations",
            "Follow package instructions",
        ]),
        administration: strings(&[
            "Take medications with food",
            "Follow recommended dosages",
            "Monitor symptoms closely",
            "Seek medical attention if worsening",
        ]),
        warning: "Consult a healthcare professional if symptoms persist or worsen.".to_string(),
    }
}

pub fn fallback_treatment_plan() -> TreatmentPlan {
    let entry = |time: &str, activity: &str, kind: &str| ScheduleEntry {
        time: time.to_string(),
        activity: activity.to_string(),
        kind: kind.to_string(),
    };

    TreatmentPlan {
        lifecycle_phases: LifecyclePhases {
            phase1: "Immediate relief and symptom management".to_string(),
            phase2: "Active treatment and healing".to_string(),
            phase3: "Recovery and prevention".to_string(),
        },
        natural_remedies: strings(&[
            "Rest and adequate sleep",
            "Stress reduction techniques",
            "Natural anti-inflammatory foods",
            "Gentle exercise as tolerated",
            "Hydration therapy",
            "Herbal remedies as appropriate",
        ]),
        foods: strings(&[
            "Anti-inflammatory foods",
            "Fresh fruits and vegetables",
            "Lean proteins",
            "Whole grains",
            "Healthy fats",
            "Adequate hydration",
        ]),
        medications: strings(&[
            "Over-the-counter pain relief",
            "Anti-inflammatory medications",
            "Topical treatments",
            "Supplements as recommended",
        ]),
        exercises: strings(&[
            "Gentle stretching",
            "Light walking",
            "Breathing exercises",
            "Range of motion activities",
            "Gradual activity increase",
        ]),
        daily_schedule: vec![
            entry("08:00", "Morning medication and breakfast", "medication"),
            entry("12:00", "Healthy lunch and light exercise", "nutrition"),
            entry("18:00", "Evening medication", "medication"),
            entry("21:00", "Relaxation and preparation for sleep", "wellness"),
        ],
        prevention_tips: strings(&[
            "Maintain healthy lifestyle",
            "Regular exercise routine",
            "Stress management",
            "Adequate sleep",
        ]),
        possible_causes: strings(&[
            "Lifestyle factors",
            "Environmental triggers",
            "Genetic predisposition",
            "Previous injuries or conditions",
        ]),
    }
}

pub fn fallback_article(text: &str, topic: &str) -> HealthArticle {
    HealthArticle {
        title: format!("Understanding {}: A Comprehensive Guide", topic),
        overview: excerpt(text, 300),
        key_points: strings(&[
            "Understanding the condition",
            "Recognizing symptoms early",
            "Lifestyle modifications",
            "Treatment options",
            "Prevention strategies",
            "Long-term management",
        ]),
        natural_treatments: strings(&[
            "Dietary modifications",
            "Herbal remedies",
            "Physical therapy",
            "Stress management",
            "Sleep optimization",
        ]),
        evidence: "Recent research supports the effectiveness of natural treatments combined with conventional medicine.".to_string(),
        prevention: strings(&[
            "Regular health screenings",
            "Healthy diet and exercise",
            "Stress management",
            "Adequate sleep",
        ]),
        seek_help: "Seek immediate medical attention if symptoms are severe, persistent, or worsening.".to_string(),
    }
}
