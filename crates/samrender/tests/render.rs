//! End to end tests: config file, render and diff

use pretty_assertions::assert_eq;
use samrender::backend::{MockResolver, Secret, StaticResolver, UnconfiguredResolver};
use samrender::config::load_overrides;
use samrender::context::EvaluationContext;
use samrender::diff::{diff, Difference};
use samrender::error::{ErrorKind, ExternalError};
use samrender::path::Path;
use samrender::template::Template;
use samrender::value::Value;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn render_environment(
    environment: &str,
    backend: &dyn samrender::backend::ExternalResolver,
) -> samrender::error::Result<Value> {
    let template = Template::load_file(&fixture("environments.yaml")).unwrap();
    let overrides = load_overrides(&fixture("samconfig.toml"), environment).unwrap();

    let mut context = EvaluationContext::builder(&template)
        .overrides(overrides)
        .backend(backend)
        .build()?;
    samrender::resolver::render(&template, &mut context)
}

fn property(rendered: &Value, name: &str) -> Value {
    rendered.as_mapping().unwrap()["Resources"].as_mapping().unwrap()["Database"]
        .as_mapping()
        .unwrap()["Properties"]
        .as_mapping()
        .unwrap()[name]
        .clone()
}

#[test]
fn environment_overrides_apply() {
    let rendered = render_environment("dev", &MockResolver).unwrap();

    assert_eq!(property(&rendered, "DBName"), Value::from("dev-db"));
    assert_eq!(property(&rendered, "VpcId"), Value::from("mock-import-vpc-VpcId"));
    assert_eq!(
        property(&rendered, "MasterUserPassword"),
        Value::from("local-password")
    );
}

#[test]
fn secret_only_fetched_when_selected() {
    // dev never selects the secret branch
    let backend = StaticResolver::default().with_export("vpc-VpcId", "vpc-0123");
    let rendered = render_environment("dev", &backend).unwrap();
    assert_eq!(property(&rendered, "VpcId"), Value::from("vpc-0123"));

    let error = render_environment("prod", &backend).unwrap_err();
    assert_eq!(
        error.path.to_string(),
        "Resources.Database.Properties.MasterUserPassword.Fn::If[1]"
    );
    assert!(matches!(
        error.kind,
        ErrorKind::ExternalResolution(ExternalError::NotFound { .. })
    ));
}

#[test]
fn secrets_are_picked_by_key() {
    let backend = StaticResolver::default()
        .with_export("vpc-VpcId", "vpc-0123")
        .with_secret(
            "prod-db",
            Secret::Text(r#"{"username": "admin", "password": "hunter2"}"#.into()),
        );

    let rendered = render_environment("prod", &backend).unwrap();
    assert_eq!(property(&rendered, "MasterUserPassword"), Value::from("hunter2"));
}

#[test]
fn unconfigured_backend_fails_on_import() {
    let error = render_environment("dev", &UnconfiguredResolver).unwrap_err();
    assert_eq!(error.path.to_string(), "Resources.Database.Properties.VpcId");
}

#[test]
fn disallowed_override_is_rejected() {
    let error = render_environment("broken", &MockResolver).unwrap_err();
    assert_eq!(error.path.to_string(), "Parameters.Environment");
    assert!(matches!(
        error.kind,
        ErrorKind::DisallowedParameterValue { value, .. } if value == "staging"
    ));
}

#[test]
fn diff_between_environments() {
    let dev = render_environment("dev", &MockResolver).unwrap();
    let prod = render_environment("prod", &MockResolver).unwrap();

    let properties = Path::root()
        .key("Resources")
        .key("Database")
        .key("Properties");
    assert_eq!(
        diff(&dev, &prod),
        vec![
            Difference::Changed {
                path: properties.key("DBInstanceClass"),
                old: "db.small".into(),
                new: "db.large".into(),
            },
            Difference::Changed {
                path: properties.key("DBName"),
                old: "dev-db".into(),
                new: "prod-db".into(),
            },
            Difference::Changed {
                path: properties.key("MasterUserPassword"),
                old: "local-password".into(),
                new: "mock-secret-prod-db".into(),
            },
            Difference::Changed {
                path: Path::root().key("Conditions").key("IsProd"),
                old: false.into(),
                new: true.into(),
            },
        ]
    );

    assert!(diff(&dev, &dev).is_empty());
}

#[test]
fn only_mapped_instance_size_differs() {
    let template = samrender::template! {r#"
    Parameters:
      Env: {Type: String, AllowedValues: [dev, prod]}
    Mappings:
      Sizes:
        dev: {Instance: t3.small}
        prod: {Instance: m5.large}
    Resources:
      Server:
        Type: AWS::EC2::Instance
        Properties:
          InstanceType: !FindInMap [Sizes, !Ref Env, Instance]
          ImageId: ami-123
    "#};

    let render = |env: &str| {
        let mut context = EvaluationContext::builder(&template)
            .parameter("Env", env)
            .build()
            .unwrap();
        samrender::resolver::render(&template, &mut context).unwrap()
    };

    let lines: Vec<String> = diff(&render("dev"), &render("prod"))
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        lines,
        vec!["~ Resources.Server.Properties.InstanceType: t3.small -> m5.large"]
    );
}
