//! Snapshot tests
//!
//! Renders each *.yaml template in /tests/ with default parameters and mocked external values and
//! compares if the output changes.

use samrender::context::EvaluationContext;
use samrender::template::Template;

#[test]
fn snapshots() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("SAMRENDER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    insta::glob!("*.yaml", |path| {
        let template = Template::load_file(path).expect("must be a valid template");
        let mut context = EvaluationContext::builder(&template)
            .build()
            .expect("parameters must resolve");

        let rendered =
            samrender::resolver::render(&template, &mut context).expect("template must render");

        insta::assert_snapshot!(serde_json::to_string_pretty(&rendered).unwrap());
    });
}
