//! Match options, per-field directives and embedded-field promotion.

mod common;

use autoflex::{expand, flatten, Options};
use autoflex_types::{FieldDef, StructType, Type, TypedValue, Value, WrappedType, WrappedValue};
use common::{assert_clean, init_tracing, pointee, ptr_to, wrapped};
use std::io::Write;

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_prefix_trimmed_names_match_both_ways() {
    init_tracing();
    let service = StructType::new(
        "Cluster",
        vec![
            FieldDef::new("ClusterName", Type::String),
            FieldDef::new("ClusterVersion", Type::pointer(Type::String)),
        ],
    );
    let resource = StructType::new(
        "ClusterModel",
        vec![
            FieldDef::new("Name", Type::Wrapped(WrappedType::String)),
            FieldDef::new("Version", Type::Wrapped(WrappedType::String)),
        ],
    );
    let options = Options::new().with_field_name_prefix("Cluster");
    let source = service
        .zero()
        .with("ClusterName", Value::string("prod"))
        .with("ClusterVersion", Value::pointer(Value::string("1.30")));

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(&Value::Struct(source.clone()), &mut flat, &options));
    assert_eq!(wrapped(pointee(&flat), "Name"), &WrappedValue::string("prod"));
    assert_eq!(wrapped(pointee(&flat), "Version"), &WrappedValue::string("1.30"));

    let mut back = ptr_to(service.zero());
    assert_clean(&expand(&flat, &mut back, &options));
    assert_eq!(pointee(&back), &source);
}

#[test]
fn test_without_prefix_option_names_do_not_match() {
    init_tracing();
    let service = StructType::new("Cluster", vec![FieldDef::new("ClusterName", Type::String)]);
    let resource = StructType::new(
        "ClusterModel",
        vec![FieldDef::new("Name", Type::Wrapped(WrappedType::String))],
    );
    let source = service.zero().with("ClusterName", Value::string("prod"));

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(&Value::Struct(source), &mut flat, &Options::new()));
    assert!(wrapped(pointee(&flat), "Name").is_null());
}

fn tagged() -> (std::sync::Arc<StructType>, std::sync::Arc<StructType>, Value) {
    let service = StructType::new(
        "Bucket",
        vec![
            FieldDef::new("Name", Type::String),
            FieldDef::new("Tags", Type::map(Type::String)),
        ],
    );
    let resource = StructType::new(
        "BucketModel",
        vec![
            FieldDef::new("Name", Type::Wrapped(WrappedType::String)),
            FieldDef::new("Tags", Type::Wrapped(WrappedType::map(WrappedType::String))),
        ],
    );
    let tags = [("team".to_string(), Value::string("core"))].into_iter().collect();
    let source = Value::Struct(
        service
            .zero()
            .with("Name", Value::string("logs"))
            .with("Tags", Value::map(Type::String, tags)),
    );
    (service, resource, source)
}

#[test]
fn test_tags_are_ignored_by_default() {
    init_tracing();
    let (_, resource, source) = tagged();

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(&source, &mut flat, &Options::new()));
    assert_eq!(wrapped(pointee(&flat), "Name"), &WrappedValue::string("logs"));
    assert!(wrapped(pointee(&flat), "Tags").is_null());
}

#[test]
fn test_include_all_fields_from_yaml_file() -> anyhow::Result<()> {
    init_tracing();
    let (_, resource, source) = tagged();

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "include_all_fields: true")?;
    writeln!(file, "additional_ignored_field_names:")?;
    writeln!(file, "  - Name")?;
    let options = Options::from_file(file.path())?;

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(&source, &mut flat, &options));
    assert!(wrapped(pointee(&flat), "Name").is_null());
    assert_eq!(
        wrapped(pointee(&flat), "Tags").entries().map(|e| e.len()),
        Some(1)
    );
    Ok(())
}

// ============================================================================
// Directives
// ============================================================================

#[test]
fn test_legacy_directive() {
    init_tracing();
    let service = StructType::new(
        "Queue",
        vec![
            FieldDef::new("Delay", Type::pointer(Type::Int64)),
            FieldDef::new("Policy", Type::pointer(Type::String)),
            FieldDef::new("Targets", Type::slice(Type::String)),
        ],
    );
    let resource = StructType::new(
        "QueueModel",
        vec![
            FieldDef::new("Delay", Type::Wrapped(WrappedType::Int64)).legacy(),
            FieldDef::new("Policy", Type::Wrapped(WrappedType::String)).legacy(),
            FieldDef::new("Targets", Type::Wrapped(WrappedType::list(WrappedType::String)))
                .legacy(),
        ],
    );

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(
        &Value::Struct(service.zero()),
        &mut flat,
        &Options::new(),
    ));
    let model = pointee(&flat);
    assert_eq!(wrapped(model, "Delay"), &WrappedValue::int64(0));
    assert_eq!(wrapped(model, "Policy"), &WrappedValue::string(""));
    assert_eq!(
        wrapped(model, "Targets"),
        &WrappedValue::list(WrappedType::String, vec![])
    );

    // Null expands to a pointer to the zero value.
    let mut back = ptr_to(service.zero());
    assert_clean(&expand(&ptr_to(resource.zero()), &mut back, &Options::new()));
    let expanded = pointee(&back);
    assert_eq!(
        expanded.field("Delay"),
        Some(&Value::pointer(Value::Int64(0)))
    );
    assert_eq!(
        expanded.field("Policy"),
        Some(&Value::pointer(Value::string("")))
    );
}

#[test]
fn test_omit_empty_directive() {
    init_tracing();
    let service = StructType::new(
        "Function",
        vec![
            FieldDef::new("Handler", Type::String),
            FieldDef::new("Role", Type::pointer(Type::String)),
        ],
    );
    let resource = StructType::new(
        "FunctionModel",
        vec![
            FieldDef::new("Handler", Type::Wrapped(WrappedType::String)).omit_empty(),
            FieldDef::new("Role", Type::Wrapped(WrappedType::String)).omit_empty(),
        ],
    );

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(
        &Value::Struct(service.zero()),
        &mut flat,
        &Options::new(),
    ));
    assert!(wrapped(pointee(&flat), "Handler").is_null());

    let model = resource
        .zero()
        .with("Handler", WrappedValue::string(""))
        .with("Role", WrappedValue::string(""));
    let mut back = ptr_to(service.zero());
    assert_clean(&expand(&ptr_to(model), &mut back, &Options::new()));
    assert_eq!(
        pointee(&back).field("Role"),
        Some(&Value::nil_pointer(Type::String))
    );
}

#[test]
fn test_no_flatten_directive_only_applies_to_flatten() {
    init_tracing();
    let service = StructType::new(
        "Topic",
        vec![
            FieldDef::new("Name", Type::String),
            FieldDef::new("Arn", Type::pointer(Type::String)),
        ],
    );
    let resource = StructType::new(
        "TopicModel",
        vec![
            FieldDef::new("Name", Type::Wrapped(WrappedType::String)),
            FieldDef::new("Arn", Type::Wrapped(WrappedType::String)).no_flatten(),
        ],
    );
    let source = service
        .zero()
        .with("Name", Value::string("events"))
        .with("Arn", Value::pointer(Value::string("arn:topic")));

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(&Value::Struct(source), &mut flat, &Options::new()));
    assert!(wrapped(pointee(&flat), "Arn").is_null());

    let model = resource
        .zero()
        .with("Name", WrappedValue::string("events"))
        .with("Arn", WrappedValue::string("arn:topic"));
    let mut back = ptr_to(service.zero());
    assert_clean(&expand(&ptr_to(model), &mut back, &Options::new()));
    assert_eq!(
        pointee(&back).field("Arn"),
        Some(&Value::pointer(Value::string("arn:topic")))
    );
}

#[test]
fn test_unknown_values_expand_to_zero() {
    init_tracing();
    let service = StructType::new(
        "Table",
        vec![
            FieldDef::new("Name", Type::String),
            FieldDef::new("Capacity", Type::pointer(Type::Int64)),
        ],
    );
    let resource = StructType::new(
        "TableModel",
        vec![
            FieldDef::new("Name", Type::Wrapped(WrappedType::String)),
            FieldDef::new("Capacity", Type::Wrapped(WrappedType::Int64)),
        ],
    );
    let model = resource
        .zero()
        .with("Name", WrappedValue::unknown(WrappedType::String))
        .with("Capacity", WrappedValue::unknown(WrappedType::Int64));
    let mut back = ptr_to(service.zero().with("Name", Value::string("stale")));

    assert_clean(&expand(&ptr_to(model), &mut back, &Options::new()));
    assert_eq!(pointee(&back), &service.zero());
}

// ============================================================================
// Embedded fields and determinism
// ============================================================================

#[test]
fn test_embedded_fields_are_promoted() {
    init_tracing();
    let base = StructType::new(
        "Base",
        vec![
            FieldDef::new("Id", Type::String),
            FieldDef::new("Region", Type::String),
        ],
    );
    let service = StructType::new(
        "Instance",
        vec![
            FieldDef::embedded(&base),
            FieldDef::new("Size", Type::Int64),
        ],
    );
    let resource = StructType::new(
        "InstanceModel",
        vec![
            FieldDef::new("Id", Type::Wrapped(WrappedType::String)),
            FieldDef::new("Region", Type::Wrapped(WrappedType::String)),
            FieldDef::new("Size", Type::Wrapped(WrappedType::Int64)),
        ],
    );
    let source = service
        .zero()
        .with("Id", Value::string("i-1"))
        .with("Region", Value::string("eu-west-1"))
        .with("Size", Value::Int64(2));
    assert_eq!(
        source.fields[0],
        Value::Struct(
            base.zero()
                .with("Id", Value::string("i-1"))
                .with("Region", Value::string("eu-west-1"))
        )
    );

    let mut flat = ptr_to(resource.zero());
    assert_clean(&flatten(&Value::Struct(source.clone()), &mut flat, &Options::new()));
    assert_eq!(wrapped(pointee(&flat), "Id"), &WrappedValue::string("i-1"));
    assert_eq!(
        wrapped(pointee(&flat), "Region"),
        &WrappedValue::string("eu-west-1")
    );

    let mut back = ptr_to(service.zero());
    assert_clean(&expand(&flat, &mut back, &Options::new()));
    assert_eq!(pointee(&back), &source);
}

#[test]
fn test_repeated_calls_are_deterministic() {
    init_tracing();
    let service = StructType::new(
        "Service",
        vec![
            FieldDef::new("Names", Type::slice(Type::String)),
            FieldDef::new("Count", Type::Int64),
            FieldDef::new("Limit", Type::Int64),
        ],
    );
    let resource = StructType::new(
        "Resource",
        vec![
            FieldDef::new("Name", Type::Wrapped(WrappedType::list(WrappedType::String))),
            FieldDef::new("Count", Type::Wrapped(WrappedType::Int64)),
            FieldDef::new("Limit", Type::Wrapped(WrappedType::Int32)),
        ],
    );
    let source = Value::Struct(
        service
            .zero()
            .with("Names", Value::slice(Type::String, vec![Value::string("x")]))
            .with("Count", Value::Int64(1)),
    );

    let mut first = ptr_to(resource.zero());
    let mut second = ptr_to(resource.zero());
    let first_diags = flatten(&source, &mut first, &Options::new());
    let second_diags = flatten(&source, &mut second, &Options::new());

    assert_eq!(first, second);
    assert_eq!(first_diags.len(), 1);
    assert_eq!(
        first_diags.iter().map(|d| d.message.clone()).collect::<Vec<_>>(),
        second_diags.iter().map(|d| d.message.clone()).collect::<Vec<_>>()
    );
    assert!(wrapped(pointee(&first), "Count").is_known());
}
