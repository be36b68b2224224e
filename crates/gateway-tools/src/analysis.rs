//! `analysis` toolset — pure computation over data the model has already
//! fetched with a `base_data` tool earlier in the same turn (§4.1).
//!
//! These handlers take no upstream collaborator: they are one step removed
//! from `ExternalDataClient`, operating on the scores/answers the model
//! passes as arguments rather than re-fetching them. Still teacher-isolated
//! per §4.5, since the numbers they crunch are a specific teacher's data.

use async_trait::async_trait;
use gateway_kernel::{ToolContext, ToolError, ToolExecutor, ToolOutcome};
use serde_json::{json, Value};
use tracing::instrument;

use crate::util::{require_teacher_id, wrap_ok};

#[derive(Default)]
pub struct AnalysisTools;

impl AnalysisTools {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, args))]
    fn calculate_stats(&self, args: &Value) -> Result<Value, ToolError> {
        let scores = numeric_array(args, "scores")?;
        if scores.is_empty() {
            return Ok(json!({"status": "no_result", "reason": "no scores supplied"}));
        }
        Ok(json!({
            "status": "ok",
            "count": scores.len(),
            "mean": mean(&scores),
            "median": median(&scores),
            "min": scores.iter().cloned().fold(f64::INFINITY, f64::min),
            "max": scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            "stddev": stddev(&scores),
        }))
    }

    #[instrument(skip(self, args))]
    fn compare_performance(&self, args: &Value) -> Result<Value, ToolError> {
        let group_a = numeric_array(args, "group_a_scores")?;
        let group_b = numeric_array(args, "group_b_scores")?;
        if group_a.is_empty() || group_b.is_empty() {
            return Ok(json!({"status": "no_result", "reason": "both groups require at least one score"}));
        }
        let mean_a = mean(&group_a);
        let mean_b = mean(&group_b);
        let delta = mean_a - mean_b;
        let pct_change = if mean_b.abs() > f64::EPSILON { delta / mean_b * 100.0 } else { 0.0 };
        Ok(json!({
            "status": "ok",
            "label_a": args.get("label_a").and_then(Value::as_str).unwrap_or("group_a"),
            "label_b": args.get("label_b").and_then(Value::as_str).unwrap_or("group_b"),
            "mean_a": mean_a,
            "mean_b": mean_b,
            "delta": delta,
            "pct_change": pct_change,
        }))
    }

    #[instrument(skip(self, args))]
    fn analyze_student_weakness(&self, args: &Value) -> Result<Value, ToolError> {
        let results = args
            .get("question_results")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::InvalidArguments("missing `question_results` array".into()))?;

        let mut by_topic: std::collections::HashMap<String, (u32, u32)> = std::collections::HashMap::new();
        for entry in results {
            let topic = entry.get("topic").and_then(Value::as_str).unwrap_or("unknown").to_string();
            let correct = entry.get("correct").and_then(Value::as_bool).unwrap_or(false);
            let counter = by_topic.entry(topic).or_insert((0, 0));
            counter.1 += 1;
            if !correct {
                counter.0 += 1;
            }
        }

        if by_topic.is_empty() {
            return Ok(json!({"status": "no_result", "reason": "no question results supplied"}));
        }

        let mut weaknesses: Vec<Value> = by_topic
            .into_iter()
            .map(|(topic, (misses, total))| {
                json!({
                    "topic": topic,
                    "miss_rate": misses as f64 / total as f64,
                    "attempts": total,
                })
            })
            .collect();
        weaknesses.sort_by(|a, b| {
            b["miss_rate"].as_f64().unwrap_or(0.0).partial_cmp(&a["miss_rate"].as_f64().unwrap_or(0.0)).unwrap()
        });

        Ok(json!({"status": "ok", "weaknesses": weaknesses}))
    }

    #[instrument(skip(self, args))]
    fn get_student_error_patterns(&self, args: &Value) -> Result<Value, ToolError> {
        let errors = args
            .get("incorrect_answers")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::InvalidArguments("missing `incorrect_answers` array".into()))?;

        let mut counts: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
        for entry in errors {
            let error_type = entry.get("error_type").and_then(Value::as_str).unwrap_or("unclassified").to_string();
            *counts.entry(error_type).or_insert(0) += 1;
        }

        if counts.is_empty() {
            return Ok(json!({"status": "no_result", "reason": "no incorrect answers supplied"}));
        }

        let mut patterns: Vec<Value> = counts
            .into_iter()
            .map(|(error_type, count)| json!({"error_type": error_type, "count": count}))
            .collect();
        patterns.sort_by(|a, b| b["count"].as_u64().cmp(&a["count"].as_u64()));

        Ok(json!({"status": "ok", "patterns": patterns}))
    }

    #[instrument(skip(self, args))]
    fn calculate_class_mastery(&self, args: &Value) -> Result<Value, ToolError> {
        let mastery_scores = numeric_array(args, "student_mastery_scores")?;
        if mastery_scores.is_empty() {
            return Ok(json!({"status": "no_result", "reason": "no mastery scores supplied"}));
        }
        let threshold = args.get("threshold").and_then(Value::as_f64).unwrap_or(0.8);
        let at_or_above = mastery_scores.iter().filter(|&&s| s >= threshold).count();

        Ok(json!({
            "status": "ok",
            "class_average_mastery": mean(&mastery_scores),
            "students_at_or_above_threshold": at_or_above,
            "total_students": mastery_scores.len(),
            "threshold": threshold,
        }))
    }
}

#[async_trait]
impl ToolExecutor for AnalysisTools {
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>> {
        if let Err(outcome) = require_teacher_id(ctx) {
            return Some(Ok(ToolOutcome::RawDataMap(outcome)));
        }

        let result = match name {
            "calculate_stats" => self.calculate_stats(&args),
            "compare_performance" => self.compare_performance(&args),
            "analyze_student_weakness" => self.analyze_student_weakness(&args),
            "get_student_error_patterns" => self.get_student_error_patterns(&args),
            "calculate_class_mastery" => self.calculate_class_mastery(&args),
            _ => return None,
        };

        Some(result.map(|v| ToolOutcome::RawDataMap(wrap_ok(v))))
    }
}

fn numeric_array(args: &Value, field: &str) -> Result<Vec<f64>, ToolError> {
    args.get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing `{field}` array")))?
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| ToolError::InvalidArguments(format!("`{field}` must contain only numbers"))))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn stddev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ToolContext {
        ToolContext::new("teacher-1", "conv-1")
    }

    #[tokio::test]
    async fn calculate_stats_reports_basic_aggregates() {
        let tools = AnalysisTools::new();
        let args = json!({"scores": [60.0, 70.0, 80.0, 90.0]});
        let outcome = tools.call("calculate_stats", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["count"], 4);
        assert!((json["mean"].as_f64().unwrap() - 75.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn calculate_stats_with_no_scores_is_no_result() {
        let tools = AnalysisTools::new();
        let outcome = tools.call("calculate_stats", json!({"scores": []}), &ctx()).await.unwrap().unwrap();
        assert_eq!(outcome.into_json()["status"], "no_result");
    }

    #[tokio::test]
    async fn compare_performance_reports_signed_delta() {
        let tools = AnalysisTools::new();
        let args = json!({"group_a_scores": [90.0, 80.0], "group_b_scores": [70.0, 60.0]});
        let outcome = tools.call("compare_performance", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert!(json["delta"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn analyze_student_weakness_ranks_worst_topic_first() {
        let tools = AnalysisTools::new();
        let args = json!({"question_results": [
            {"topic": "fractions", "correct": false},
            {"topic": "fractions", "correct": false},
            {"topic": "geometry", "correct": true},
        ]});
        let outcome = tools.call("analyze_student_weakness", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["weaknesses"][0]["topic"], "fractions");
    }

    #[tokio::test]
    async fn missing_teacher_id_short_circuits_every_analysis_tool() {
        let tools = AnalysisTools::new();
        let mut no_teacher = ctx();
        no_teacher.teacher_id.clear();
        let outcome = tools.call("calculate_stats", json!({"scores": [1.0]}), &no_teacher).await.unwrap().unwrap();
        assert_eq!(outcome.into_json()["status"], "error");
    }

    #[tokio::test]
    async fn unknown_tool_returns_none() {
        let tools = AnalysisTools::new();
        assert!(tools.call("not_a_tool", Value::Null, &ctx()).await.is_none());
    }
}
