//! No-mock schema resolution tests.
//!
//! Covers:
//! - Fallback priority (direct value > fallback > default)
//! - Pass-through and format-string fallback scenarios
//! - Recursive and cyclic fallback chains
//! - Static configuration instances
//! - Copy independence of list/dict reads

use cm_schema::{Config, ConfigError, Fallback, Field, Schema};
use serde_json::json;
use std::sync::Arc;

fn renamed_field_schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .field("oldfield", Field::text("Deprecated spelling."))
            .field(
                "newfield",
                Field::text("Preferred spelling.")
                    .required()
                    .fallback(Fallback::single("oldfield")),
            )
            .build()
            .expect("schema builds"),
    )
}

#[test]
fn test_pass_through_fallback_supplies_value() {
    let config = Config::new(renamed_field_schema(), json!({"oldfield": "foo"}))
        .expect("fallback satisfies the required field");
    assert_eq!(config.text("newfield").unwrap().as_deref(), Some("foo"));
    assert!(config.present("newfield").unwrap());
}

#[test]
fn test_direct_value_wins_over_fallback() {
    let config = Config::new(
        renamed_field_schema(),
        json!({"oldfield": "foo", "newfield": "bar"}),
    )
    .unwrap();
    assert_eq!(config.text("newfield").unwrap().as_deref(), Some("bar"));
}

#[test]
fn test_required_field_with_unsatisfied_fallback_fails() {
    let err = Config::new(renamed_field_schema(), json!({})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'newfield' is required but no value is present."
    );
}

#[test]
fn test_fallback_value_beats_field_default() {
    let schema = Arc::new(
        Schema::builder()
            .field("primary", Field::text("Primary value."))
            .field(
                "derived",
                Field::text("Derived value.")
                    .default(json!("static-default"))
                    .fallback(Fallback::single("primary")),
            )
            .build()
            .unwrap(),
    );

    let config = Config::new(schema.clone(), json!({"primary": "live"})).unwrap();
    assert_eq!(config.text("derived").unwrap().as_deref(), Some("live"));

    // Without the fallback's dependency the default applies.
    let config = Config::new(schema, json!({})).unwrap();
    assert_eq!(
        config.text("derived").unwrap().as_deref(),
        Some("static-default")
    );
}

#[test]
fn test_format_fallback_with_optional_default() {
    let schema = Arc::new(
        Schema::builder()
            .field("text_field", Field::text("A label.").default(json!("foo")))
            .field("int_field", Field::int("A number."))
            .field(
                "combined",
                Field::text("Label and number.").fallback(Fallback::format(
                    "{text_field}::{int_field:02d}",
                    vec!["int_field"],
                    vec!["text_field"],
                )),
            )
            .build()
            .unwrap(),
    );

    let config = Config::new(schema.clone(), json!({"int_field": 3})).unwrap();
    assert!(config.present("combined").unwrap());
    assert_eq!(config.text("combined").unwrap().as_deref(), Some("foo::03"));

    // The required part of the template missing means the fallback is not
    // present, so the field resolves to nothing.
    let config = Config::new(schema, json!({"text_field": "bar"})).unwrap();
    assert!(!config.present("combined").unwrap());
    assert_eq!(config.text("combined").unwrap(), None);
}

#[test]
fn test_fallback_chain_resolves_recursively() {
    // newest -> newer -> oldest across two fallback hops.
    let schema = Arc::new(
        Schema::builder()
            .field("oldest", Field::text("Original."))
            .field(
                "newer",
                Field::text("Renamed once.").fallback(Fallback::single("oldest")),
            )
            .field(
                "newest",
                Field::text("Renamed twice.")
                    .required()
                    .fallback(Fallback::single("newer")),
            )
            .build()
            .unwrap(),
    );

    let config = Config::new(schema, json!({"oldest": "foo"})).unwrap();
    assert_eq!(config.text("newest").unwrap().as_deref(), Some("foo"));
}

#[test]
fn test_cyclic_fallbacks_terminate() {
    let schema = Arc::new(
        Schema::builder()
            .field(
                "alpha",
                Field::text("Falls back to beta.").fallback(Fallback::single("beta")),
            )
            .field(
                "beta",
                Field::text("Falls back to alpha.").fallback(Fallback::single("alpha")),
            )
            .build()
            .unwrap(),
    );

    // Neither side present: resolution terminates with nothing found.
    let config = Config::new(schema.clone(), json!({})).unwrap();
    assert!(!config.present("alpha").unwrap());
    assert_eq!(config.text("alpha").unwrap(), None);

    // One side present directly: the other resolves through the cycle.
    let config = Config::new(schema, json!({"beta": "b"})).unwrap();
    assert_eq!(config.text("alpha").unwrap().as_deref(), Some("b"));
    assert_eq!(config.text("beta").unwrap().as_deref(), Some("b"));
}

#[test]
fn test_fallback_dependency_need_not_be_required() {
    // A field used purely as a fallback dependency counts as present even
    // though it is optional itself.
    let schema = Arc::new(
        Schema::builder()
            .field("optional_source", Field::int("Optional source."))
            .field(
                "target",
                Field::int("Target.")
                    .required()
                    .fallback(Fallback::single("optional_source")),
            )
            .build()
            .unwrap(),
    );

    let config = Config::new(schema, json!({"optional_source": 9})).unwrap();
    assert_eq!(config.int("target").unwrap(), Some(9));
}

#[test]
fn test_pass_through_arity_checked_at_construction() {
    assert!(Fallback::pass_through(Vec::<String>::new()).is_err());
    assert!(Fallback::pass_through(vec!["one", "two"]).is_err());
    let single = Fallback::pass_through(vec!["one"]).unwrap();
    assert_eq!(single.referenced_fields().collect::<Vec<_>>(), vec!["one"]);
}

#[test]
fn test_bool_field_through_config() {
    let schema = Arc::new(
        Schema::builder()
            .field("verbose", Field::boolean("Verbose output.").default(json!(false)))
            .build()
            .unwrap(),
    );

    let config = Config::new(schema.clone(), json!({"verbose": "False"})).unwrap();
    assert_eq!(config.boolean("verbose").unwrap(), Some(false));

    let config = Config::new(schema.clone(), json!({"verbose": "yes"})).unwrap();
    assert_eq!(config.boolean("verbose").unwrap(), Some(true));

    let config = Config::new(schema, json!({})).unwrap();
    assert_eq!(config.boolean("verbose").unwrap(), Some(false));
}

#[test]
fn test_list_reads_are_copy_independent() {
    let schema = Arc::new(
        Schema::builder()
            .field("tags", Field::list("Tags.").default(json!(["a", "b"])))
            .build()
            .unwrap(),
    );

    let config = Config::new(schema, json!({})).unwrap();
    let mut first = config.list("tags").unwrap().unwrap();
    first.push(json!("mutated"));

    let second = config.list("tags").unwrap().unwrap();
    assert_eq!(second, vec![json!("a"), json!("b")]);
}

#[test]
fn test_dict_reads_are_copy_independent() {
    let schema = Arc::new(
        Schema::builder()
            .field("limits", Field::dict("Limits."))
            .build()
            .unwrap(),
    );

    let config = Config::new(schema, json!({"limits": {"cpu": 2}})).unwrap();
    let mut first = config.dict("limits").unwrap().unwrap();
    first.insert("mem".to_string(), json!(512));

    let second = config.dict("limits").unwrap().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second.get("cpu"), Some(&json!(2)));
}

#[test]
fn test_url_and_regex_fields_end_to_end() {
    let schema = Arc::new(
        Schema::builder()
            .field("endpoint", Field::url("Service endpoint.").required())
            .field("name_pattern", Field::regex("Name filter."))
            .build()
            .unwrap(),
    );

    let config = Config::new(
        schema.clone(),
        json!({"endpoint": "https://api.example.com/v1", "name_pattern": "^svc-"}),
    )
    .unwrap();

    let endpoint = config.url("endpoint").unwrap().unwrap();
    assert_eq!(endpoint.host_str(), Some("api.example.com"));
    let pattern = config.regex("name_pattern").unwrap().unwrap();
    assert!(pattern.is_match("svc-db"));

    let err = Config::new(schema, json!({"endpoint": "https://ok", "name_pattern": "("}))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'name_pattern' could not be compiled as a regex."
    );
}

#[test]
fn test_static_config_skips_and_gates_non_static_fields() {
    let schema = Arc::new(
        Schema::builder()
            .field("worker_class", Field::text("Worker class.").static_field())
            .field("amqp_url", Field::url("Broker URL.").required())
            .build()
            .unwrap(),
    );

    // amqp_url is required and absent, but a static instance never looks at
    // it.
    let config = Config::new_static(schema.clone(), json!({"worker_class": "echo"})).unwrap();
    assert_eq!(
        config.text("worker_class").unwrap().as_deref(),
        Some("echo")
    );
    let err = config.url("amqp_url").unwrap_err();
    assert_eq!(err.to_string(), "Field 'amqp_url' is not marked as static.");

    // A non-static instance over the same data fails construction.
    let err = Config::new(schema, json!({"worker_class": "echo"})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'amqp_url' is required but no value is present."
    );
}

#[test]
fn test_post_validate_error_propagates_verbatim() {
    let schema = Arc::new(
        Schema::builder()
            .field("host", Field::text("Host."))
            .field("socket", Field::text("Unix socket path."))
            .post_validate(|config| {
                if config.text("host")?.is_none() && config.text("socket")?.is_none() {
                    return Err(ConfigError::new("either host or socket must be set"));
                }
                Ok(())
            })
            .build()
            .unwrap(),
    );

    assert!(Config::new(schema.clone(), json!({"host": "db"})).is_ok());
    let err = Config::new(schema, json!({})).unwrap_err();
    assert_eq!(err.to_string(), "either host or socket must be set");
}
