//! Report generation
//!
//! Turns an [`IndicatorReport`] into a Markdown briefing. When a backend is
//! configured the analyst writes the prose from a prompt built only from
//! report fields; otherwise, or when the call fails, a deterministic
//! template is rendered from the same fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strait_core::{IndicatorReport, STATUS_UNKNOWN};
use tracing::{info, warn};

use crate::SharedBackend;

/// Model label recorded on template reports
pub const TEMPLATE_MODEL: &str = "template";

/// How the report content was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    AiGenerated,
    TemplateGenerated,
}

/// A rendered briefing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub content: String,
    pub model_used: String,
    pub generation_time: DateTime<Utc>,
    pub source: ReportSource,
}

/// Overall threat bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    VeryLow,
    Low,
    Moderate,
    Elevated,
    High,
}

impl ThreatLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 70.0 {
            ThreatLevel::High
        } else if probability >= 50.0 {
            ThreatLevel::Elevated
        } else if probability >= 30.0 {
            ThreatLevel::Moderate
        } else if probability >= 15.0 {
            ThreatLevel::Low
        } else {
            ThreatLevel::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThreatLevel::High => "高度威脅",
            ThreatLevel::Elevated => "中高威脅",
            ThreatLevel::Moderate => "中等威脅",
            ThreatLevel::Low => "低度威脅",
            ThreatLevel::VeryLow => "極低威脅",
        }
    }
}

fn military_commentary(score: f64) -> &'static str {
    if score >= 60.0 {
        "軍事活動頻繁，需密切關注相關動態"
    } else if score >= 40.0 {
        "軍事活動處於正常範圍，但有增加趨勢"
    } else if score >= 20.0 {
        "軍事活動相對平穩"
    } else {
        "軍事威脅較低"
    }
}

fn economic_commentary(score: f64) -> &'static str {
    if score >= 50.0 {
        "市場避險情緒濃厚，經濟不確定性增加"
    } else if score >= 30.0 {
        "經濟指標顯示輕微壓力"
    } else {
        "經濟環境相對穩定"
    }
}

fn news_commentary(score: f64) -> &'static str {
    if score >= 50.0 {
        "媒體報導中敏感事件增多，輿論關注度高"
    } else if score >= 30.0 {
        "新聞報導中出現一些關注議題"
    } else {
        "媒體報導相對平穩"
    }
}

/// Monitoring priorities implied by the indicators
pub fn focus_points(report: &IndicatorReport) -> Vec<&'static str> {
    let mut points = Vec::new();

    if report.military_threat >= 50.0 {
        points.push("密切關注軍事演習和部署動態");
    }
    if report.economic_pressure >= 40.0 {
        points.push("監控國際經濟制裁和貿易變化");
    }
    if report.news_alert >= 40.0 {
        points.push("關注國際媒體和官方聲明");
    }
    if points.is_empty() {
        points.push("維持正常警戒，持續監控各項指標");
    }

    points
}

/// Source status lines, `unknown` when the report has none
fn source_lines(report: &IndicatorReport) -> String {
    let (military, economic, news, stock) = match &report.data_sources {
        Some(s) => (
            s.military_status.as_str(),
            s.economic_status.as_str(),
            s.news_status.as_str(),
            s.stock_status.as_str(),
        ),
        None => (STATUS_UNKNOWN, STATUS_UNKNOWN, STATUS_UNKNOWN, STATUS_UNKNOWN),
    };

    format!(
        "- 軍事資料：{military}\n- 經濟資料：{economic}\n- 新聞資料：{news}\n- 股市資料：{stock}"
    )
}

/// Build the analyst prompt from report fields only
pub fn build_prompt(report: &IndicatorReport) -> String {
    let trend = &report.three_month_probabilities;
    let calc_note = report
        .error
        .as_ref()
        .map(|e| format!("\n注意：指標計算失敗，以上為預設值（{e}）\n"))
        .unwrap_or_default();

    format!(
        "請基於以下數據進行台海情勢分析：

威脅指標：
- 軍事威脅指數：{military}%
- 經濟壓力指數：{economic}%
- 新聞示警指數：{news}%
- 股市影響指數：{stock}%
- 綜合威脅機率：{overall}%

近三個月趨勢推估：
- 第一個月：{m1}%
- 第二個月：{m2}%
- 第三個月：{m3}%

資料來源狀態：
{sources}
{calc_note}
請提供一份專業的分析報告，包含：
1. 當前情勢評估
2. 主要風險因素
3. 趨勢分析
4. 建議關注重點
",
        military = report.military_threat,
        economic = report.economic_pressure,
        news = report.news_alert,
        stock = report.stock_impact,
        overall = report.overall_threat_probability,
        m1 = trend.month1,
        m2 = trend.month2,
        m3 = trend.month3,
        sources = source_lines(report),
    )
}

/// Render the deterministic template briefing
pub fn render_template(report: &IndicatorReport, error: Option<&str>) -> GeneratedReport {
    let now = Utc::now();
    let trend = &report.three_month_probabilities;
    let level = ThreatLevel::from_probability(report.overall_threat_probability);

    let focus = focus_points(report)
        .iter()
        .map(|point| format!("- {point}"))
        .collect::<Vec<_>>()
        .join("\n");
    let calc_note = report
        .error
        .as_ref()
        .map(|e| format!("\n*注意：指標計算失敗，報告使用預設數值。錯誤：{e}*\n"))
        .unwrap_or_default();
    let ai_note = error
        .map(|e| format!("\n*注意：AI 分析服務暫時不可用，使用模板報告。錯誤：{e}*\n"))
        .unwrap_or_default();

    let content = format!(
        "# 台灣防衛情勢分析報告

## 📊 當前威脅評估

**綜合威脅機率：{overall}% ({level})**

### 各項指標

- **軍事威脅指數：{military}%**，{military_note}
- **經濟壓力指數：{economic}%**，{economic_note}
- **新聞示警指數：{news}%**，{news_note}
- **股市影響指數：{stock}%**

## 📈 近三個月趨勢推估

- 第一個月：{m1}%
- 第二個月：{m2}%
- 第三個月：{m3}%

## 🎯 主要關注重點

{focus}

## 🗂️ 資料來源狀態

{sources}

## ⚠️ 風險提醒

本分析基於公開資訊與啟發式指標，並非預測模型，僅供參考。請持續關注官方發布的權威資訊。

---
*報告生成時間：{time}*
{calc_note}{ai_note}",
        overall = report.overall_threat_probability,
        level = level.label(),
        military = report.military_threat,
        military_note = military_commentary(report.military_threat),
        economic = report.economic_pressure,
        economic_note = economic_commentary(report.economic_pressure),
        news = report.news_alert,
        news_note = news_commentary(report.news_alert),
        stock = report.stock_impact,
        m1 = trend.month1,
        m2 = trend.month2,
        m3 = trend.month3,
        sources = source_lines(report),
        time = now.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    GeneratedReport {
        content,
        model_used: TEMPLATE_MODEL.to_string(),
        generation_time: now,
        source: ReportSource::TemplateGenerated,
    }
}

/// Produces briefings, with or without a backend
pub struct ReportGenerator {
    backend: Option<SharedBackend>,
}

impl ReportGenerator {
    pub fn new(backend: Option<SharedBackend>) -> Self {
        Self { backend }
    }

    /// Template-only generator
    pub fn template_only() -> Self {
        Self::new(None)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Generate a briefing at the given analysis tier; never fails
    pub async fn generate(&self, report: &IndicatorReport, tier: &str) -> GeneratedReport {
        let Some(backend) = &self.backend else {
            info!("No briefing backend configured, rendering template report");
            return render_template(report, None);
        };

        match backend.complete(tier, &build_prompt(report)).await {
            Ok(completion) => {
                info!(
                    "AI report generated by {} ({})",
                    backend.provider(),
                    completion.backend_model
                );
                GeneratedReport {
                    content: completion.text,
                    model_used: tier.to_string(),
                    generation_time: Utc::now(),
                    source: ReportSource::AiGenerated,
                }
            }
            Err(e) => {
                warn!("AI report failed, rendering template report: {}", e);
                render_template(report, Some(&e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve_backend_model, Completion, LlmBackend, LlmError};
    use async_openai::error::OpenAIError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use strait_core::{calculate_threat_indicators, DataBundle, TaggedResult};

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn complete(&self, tier: &str, prompt: &str) -> Result<Completion, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((tier.to_string(), prompt.to_string()));
            Ok(Completion {
                text: "# Mock briefing".to_string(),
                backend_model: resolve_backend_model(tier).to_string(),
            })
        }

        fn provider(&self) -> &str {
            "mock"
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn complete(&self, _tier: &str, _prompt: &str) -> Result<Completion, LlmError> {
            Err(LlmError::Api(OpenAIError::InvalidArgument(
                "quota exceeded".to_string(),
            )))
        }

        fn provider(&self) -> &str {
            "failing"
        }
    }

    fn sample_report() -> IndicatorReport {
        calculate_threat_indicators(&DataBundle {
            military: TaggedResult::success(serde_json::json!(["共機攻擊挑釁"])),
            ..DataBundle::default()
        })
    }

    #[test]
    fn test_threat_levels() {
        assert_eq!(ThreatLevel::from_probability(70.0), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_probability(50.0), ThreatLevel::Elevated);
        assert_eq!(ThreatLevel::from_probability(30.0), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_probability(15.0), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_probability(14.9), ThreatLevel::VeryLow);
        assert_eq!(ThreatLevel::Moderate.label(), "中等威脅");
    }

    #[test]
    fn test_focus_points() {
        let report = sample_report();
        // military 50, economic 25, news 20
        assert_eq!(focus_points(&report), vec!["密切關注軍事演習和部署動態"]);

        let calm = IndicatorReport::fallback("x");
        assert_eq!(focus_points(&calm), vec!["維持正常警戒，持續監控各項指標"]);
    }

    #[test]
    fn test_prompt_uses_report_fields() {
        let report = sample_report();
        let prompt = build_prompt(&report);

        assert!(prompt.contains("軍事威脅指數：50%"));
        assert!(prompt.contains(&format!("綜合威脅機率：{}%", report.overall_threat_probability)));
        assert!(prompt.contains("軍事資料：success"));
        assert!(prompt.contains("股市資料：unknown"));
        assert!(!prompt.contains("指標計算失敗"));
    }

    #[test]
    fn test_template_report() {
        let report = sample_report();
        let generated = render_template(&report, None);

        assert_eq!(generated.source, ReportSource::TemplateGenerated);
        assert_eq!(generated.model_used, TEMPLATE_MODEL);
        assert!(generated.content.starts_with("# 台灣防衛情勢分析報告"));
        assert!(generated.content.contains("**軍事威脅指數：50%**，軍事活動處於正常範圍，但有增加趨勢"));
        assert!(generated.content.contains("- 密切關注軍事演習和部署動態"));
        assert!(!generated.content.contains("AI 分析服務暫時不可用"));
    }

    #[test]
    fn test_template_notes_fallback_report() {
        let report = IndicatorReport::fallback("bundle is missing the 'stock' source");
        let generated = render_template(&report, None);

        assert!(generated.content.contains("指標計算失敗"));
        // overall 25
        assert!(generated.content.contains("(低度威脅)"));
        assert!(generated.content.contains("- 股市資料：unknown"));
    }

    #[tokio::test]
    async fn test_generate_without_backend() {
        let generator = ReportGenerator::template_only();
        assert!(!generator.has_backend());

        let generated = generator.generate(&sample_report(), "o3-2025-04-16").await;
        assert_eq!(generated.source, ReportSource::TemplateGenerated);
    }

    #[tokio::test]
    async fn test_generate_with_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let shared: SharedBackend = backend.clone();
        let generator = ReportGenerator::new(Some(shared));

        let generated = generator.generate(&sample_report(), "o3-2025-04-16").await;

        assert_eq!(generated.source, ReportSource::AiGenerated);
        assert_eq!(generated.model_used, "o3-2025-04-16");
        assert_eq!(generated.content, "# Mock briefing");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "o3-2025-04-16");
        assert!(calls[0].1.contains("軍事威脅指數：50%"));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_error() {
        let generator = ReportGenerator::new(Some(Arc::new(FailingBackend)));

        let generated = generator.generate(&sample_report(), "o3-2025-04-16").await;

        assert_eq!(generated.source, ReportSource::TemplateGenerated);
        assert!(generated.content.contains("AI 分析服務暫時不可用"));
        assert!(generated.content.contains("quota exceeded"));
    }
}
