//! Integration tests exercising the registry and selector together, the
//! way `gateway-agent`'s runtime uses them at the start of a turn:
//! select toolsets from the user's message, then pull the concrete tool
//! definitions for those toolsets out of the registry.

use gateway_kernel::{select_toolsets, OutputType, SelectorContext, ToolDefinition, ToolRegistry, Toolset};
use serde_json::json;

fn sample_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_teacher_classes",
            "List the classes a teacher teaches",
            json!({"type": "object", "properties": {}}),
            Toolset::BaseData,
        ),
        ToolDefinition::new(
            "calculate_class_mastery",
            "Compute a mastery score for a class",
            json!({"type": "object", "properties": {"class_id": {"type": "string"}}}),
            Toolset::Analysis,
        ),
        ToolDefinition::new(
            "generate_quiz_questions",
            "Generate quiz questions for a topic",
            json!({"type": "object", "properties": {"topic": {"type": "string"}}}),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        ToolDefinition::new(
            "patch_artifact",
            "Apply a structured edit to an existing artifact",
            json!({"type": "object", "properties": {"artifact_id": {"type": "string"}}}),
            Toolset::ArtifactOps,
        )
        .with_output_type(OutputType::ToolResult),
        ToolDefinition::new(
            "ask_clarification",
            "Ask the teacher a clarifying question",
            json!({"type": "object", "properties": {"question": {"type": "string"}}}),
            Toolset::Platform,
        )
        .with_output_type(OutputType::ClarifyEvent),
    ]
}

fn registry_with_samples() -> ToolRegistry {
    let registry = ToolRegistry::new();
    for def in sample_definitions() {
        registry.register(def).unwrap();
    }
    registry
}

#[test]
fn plain_chat_turn_only_resolves_base_data_and_platform_tools() {
    let registry = registry_with_samples();
    let toolsets = select_toolsets("how many students are in my class?", &SelectorContext::default());

    let tools = registry.get_tools(&toolsets);
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

    assert!(names.contains(&"get_teacher_classes"));
    assert!(names.contains(&"ask_clarification"));
    assert!(!names.contains(&"generate_quiz_questions"));
    assert!(!names.contains(&"calculate_class_mastery"));
}

#[test]
fn generation_request_resolves_generation_tools_too() {
    let registry = registry_with_samples();
    let toolsets = select_toolsets("please generate a quiz on fractions", &SelectorContext::default());

    let tools = registry.get_tools(&toolsets);
    assert!(tools.iter().any(|t| t.name == "generate_quiz_questions"));
}

#[test]
fn existing_artifact_in_context_resolves_artifact_ops_without_a_keyword() {
    let registry = registry_with_samples();
    let context = SelectorContext {
        has_artifacts: true,
        class_id: None,
    };
    let toolsets = select_toolsets("looks good", &context);

    let tools = registry.get_tools(&toolsets);
    assert!(tools.iter().any(|t| t.name == "patch_artifact"));
}

#[test]
fn unknown_tool_lookup_is_an_error() {
    let registry = registry_with_samples();
    assert!(registry.lookup("does_not_exist").is_err());
}

#[test]
fn registry_resolved_tools_carry_their_declared_output_type() {
    let registry = registry_with_samples();
    let clarify = registry.lookup("ask_clarification").unwrap();
    assert_eq!(clarify.output_type, OutputType::ClarifyEvent);

    let base = registry.lookup("get_teacher_classes").unwrap();
    assert_eq!(base.output_type, OutputType::RawDataMap);
}

#[test]
fn get_all_includes_every_registered_tool_exactly_once() {
    let registry = registry_with_samples();
    assert_eq!(registry.get_all().len(), sample_definitions().len());
    assert_eq!(registry.count(), sample_definitions().len());
}
