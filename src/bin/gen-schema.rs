use schemars::schema_for;
use serde_json::{json, Value};
use splitlab::model::{
    AnalysisReport, AnalyzeRequest, EffectPlanRequest, ErrorBody, PlanRequest, PlanningEstimate,
    SampleAnalysisRequest,
};
use splitlab::store::{ExperimentConfig, ExperimentRecord};

fn main() -> anyhow::Result<()> {
    // Prints one JSON document keyed by wire type name.
    // Use: cargo run --bin gen-schema > schema.json
    let schemas: Vec<(&str, Value)> = vec![
        ("PlanRequest", serde_json::to_value(schema_for!(PlanRequest))?),
        ("EffectPlanRequest", serde_json::to_value(schema_for!(EffectPlanRequest))?),
        ("PlanningEstimate", serde_json::to_value(schema_for!(PlanningEstimate))?),
        ("AnalyzeRequest", serde_json::to_value(schema_for!(AnalyzeRequest))?),
        (
            "SampleAnalysisRequest",
            serde_json::to_value(schema_for!(SampleAnalysisRequest))?,
        ),
        ("AnalysisReport", serde_json::to_value(schema_for!(AnalysisReport))?),
        ("ExperimentConfig", serde_json::to_value(schema_for!(ExperimentConfig))?),
        ("ExperimentRecord", serde_json::to_value(schema_for!(ExperimentRecord))?),
        ("ErrorBody", serde_json::to_value(schema_for!(ErrorBody))?),
    ];

    let mut document = json!({});
    for (name, schema) in schemas {
        document[name] = schema;
    }

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
