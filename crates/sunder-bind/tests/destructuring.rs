//! End-to-end scenarios: a class opts in, declares its views, and a
//! matcher-shaped caller destructures instances through both the typed
//! entry points and the installed dynamic methods.

use std::sync::Arc;
use sunder_bind::{BindingRegistry, DECONSTRUCT, DECONSTRUCT_KEYS, PositionalSource};
use sunder_core::{BindingKind, ClassDef, Instance, Param, RuntimeError, Value};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn person_class() -> Arc<ClassDef> {
    let class = ClassDef::new(
        "Person",
        vec![Param::required("name"), Param::required("age")],
    );
    class.define_reader("name");
    class.define_reader("age");
    class
}

fn alice(class: &Arc<ClassDef>) -> Instance {
    Instance::new(class.clone(), vec![Value::from("Alice"), Value::Int(42)]).unwrap()
}

#[test]
fn positional_view_returns_the_source_sequence() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = person_class();
    class.define_method("to_sequence", |instance, _args| {
        Ok(Value::List(vec![
            instance.call("name", &[])?,
            instance.call("age", &[])?,
        ]))
    });

    let outcome =
        registry.declare_positional(&class, PositionalSource::Method("to_sequence".to_string()));
    assert!(outcome.bound);

    let instance = alice(&class);
    assert_eq!(
        registry.deconstruct(&instance),
        Ok(Value::List(vec![Value::from("Alice"), Value::Int(42)]))
    );
}

#[test]
fn constructor_derived_positional_view() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = person_class();
    registry.declare_positional(&class, PositionalSource::Constructor);

    let instance = alice(&class);
    assert_eq!(
        registry.deconstruct(&instance),
        Ok(Value::List(vec![Value::from("Alice"), Value::Int(42)]))
    );
}

#[test]
fn keyed_view_full_subset_and_missing() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = person_class();
    registry.declare_keyed(&class, ["name", "age"]);

    let instance = alice(&class);

    let all = registry.deconstruct_keys(&instance, None).unwrap();
    assert_eq!(
        all.iter().collect::<Vec<_>>(),
        vec![
            (&"name".to_string(), &Value::from("Alice")),
            (&"age".to_string(), &Value::Int(42)),
        ]
    );

    let subset = registry
        .deconstruct_keys(&instance, Some(&["name".to_string()]))
        .unwrap();
    assert_eq!(subset.len(), 1);
    assert_eq!(subset.get("name"), Some(&Value::from("Alice")));

    let missing = registry
        .deconstruct_keys(&instance, Some(&["missing".to_string()]))
        .unwrap();
    assert!(missing.is_empty());
}

#[test]
fn double_declaration_changes_nothing() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = person_class();

    let first = registry.declare_positional(&class, PositionalSource::Constructor);
    let second = registry.declare_positional(&class, PositionalSource::Constructor);
    assert_eq!(first, second);

    registry.declare_keyed(&class, ["name", "age"]);
    registry.declare_keyed(&class, ["age", "shoe_size"]);
    assert_eq!(
        registry.keyed_fields(&class),
        Some(vec!["name".to_string(), "age".to_string()])
    );

    // First-declared order survives later duplicate declarations.
    let instance = alice(&class);
    let all = registry.deconstruct_keys(&instance, None).unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["name", "age"]);
}

#[test]
fn deferred_binding_completes_when_the_method_appears() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = person_class();

    let outcome =
        registry.declare_positional(&class, PositionalSource::Method("to_sequence".to_string()));
    assert!(!outcome.bound);

    let instance = alice(&class);
    // Before the source exists the view is unavailable.
    assert!(matches!(
        registry.deconstruct(&instance),
        Err(RuntimeError::NotBound { .. })
    ));

    class.define_method("to_sequence", |instance, _args| {
        Ok(Value::List(vec![instance.call("name", &[])?]))
    });

    assert!(registry.is_bound(&class, BindingKind::Positional));
    assert_eq!(
        registry.deconstruct(&instance),
        Ok(Value::List(vec![Value::from("Alice")]))
    );
}

#[test]
fn missing_accessor_surfaces_as_unmatched_name() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = ClassDef::new("Person", vec![Param::required("name")]);
    class.define_reader("name");
    registry.declare_keyed(&class, ["name", "email"]);

    let instance = Instance::new(class, vec![Value::from("Alice")]).unwrap();
    let err = registry.deconstruct_keys(&instance, None);
    let Err(RuntimeError::UnmatchedName(message)) = err else {
        panic!("Expected UnmatchedName, got {err:?}");
    };
    assert!(message.contains("`email`"));
}

#[test]
fn installed_methods_are_callable_and_overridable() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = person_class();
    registry.declare_positional(&class, PositionalSource::Constructor);
    registry.declare_keyed(&class, ["name", "age"]);

    let instance = alice(&class);

    // The installed layer answers ordinary dynamic calls.
    assert_eq!(
        instance.call(DECONSTRUCT, &[]),
        Ok(Value::List(vec![Value::from("Alice"), Value::Int(42)]))
    );
    let keys_arg = Value::List(vec![Value::Word("age".to_string())]);
    let Ok(Value::Dict(subset)) = instance.call(DECONSTRUCT_KEYS, &[keys_arg]) else {
        panic!("Expected a dict");
    };
    assert_eq!(subset.get("age"), Some(&Value::Int(42)));

    // Null filter means every declared field.
    let Ok(Value::Dict(all)) = instance.call(DECONSTRUCT_KEYS, &[Value::Null]) else {
        panic!("Expected a dict");
    };
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["name", "age"]);

    // An own method defined later wins ordinary calls without disturbing
    // the registry's view.
    class.define_method(DECONSTRUCT, |_i, _a| Ok(Value::from("custom")));
    assert_eq!(instance.call(DECONSTRUCT, &[]), Ok(Value::from("custom")));
    assert_eq!(
        registry.deconstruct(&instance),
        Ok(Value::List(vec![Value::from("Alice"), Value::Int(42)]))
    );
}

#[test]
fn constructor_mode_flattens_every_parameter_kind() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = ClassDef::new(
        "Invocation",
        vec![
            Param::required("target"),
            Param::optional("hint"),
            Param::rest("args"),
            Param::keyword("mode"),
        ],
    );
    for field in ["target", "hint", "args", "mode"] {
        class.define_reader(field);
    }
    registry.declare_positional(&class, PositionalSource::Constructor);

    let mut kwargs = indexmap::IndexMap::new();
    kwargs.insert("mode".to_string(), Value::from("fast"));
    let instance = Instance::new(
        class,
        vec![
            Value::from("run"),
            Value::from("soon"),
            Value::Int(1),
            Value::Dict(kwargs),
        ],
    )
    .unwrap();

    assert_eq!(
        registry.deconstruct(&instance),
        Ok(Value::List(vec![
            Value::from("run"),
            Value::from("soon"),
            Value::List(vec![Value::Int(1)]),
            Value::from("fast"),
        ]))
    );
}

#[test]
fn unrelated_accessor_failures_are_not_translated() {
    init_logging();
    let registry = BindingRegistry::new();
    let class = ClassDef::new("Person", vec![]);
    class.define_method("name", |_i, _a| {
        Err(RuntimeError::TypeError("corrupt".to_string()))
    });
    registry.declare_keyed(&class, ["name"]);

    let instance = Instance::new(class, vec![]).unwrap();
    assert_eq!(
        registry.deconstruct_keys(&instance, None),
        Err(RuntimeError::TypeError("corrupt".to_string()))
    );
}
