mod cli;

use indexmap::IndexMap;
use samrender::backend::{ExternalResolver, FallbackToMock, MockResolver};
use samrender::context::{EvaluationContext, DEFAULT_REGION, REGION};
use samrender::template::Template;
use samrender::value::{IntrinsicCall, Mapping, Value};
use samrender::visit::VisitIntrinsics;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("SAMRENDER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Render(render_cli) => render(render_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn render(cli: cli::RenderCommand) -> anyhow::Result<()> {
    let template = Template::load_file(&cli.template)?;
    let overrides = samrender::config::load_overrides(&cli.config.file, &cli.config.env)?;

    let region = overrides
        .get(REGION)
        .map_or(DEFAULT_REGION, String::as_str)
        .to_owned();
    let backend = backend(&cli.backend, &region)?;

    let Some(env2) = cli.env2 else {
        let rendered = render_environment(&template, overrides, backend.as_ref())?;
        return output(&cli.output, &rendered);
    };

    let overrides2 = samrender::config::load_overrides(&cli.config.file, &env2)?;
    let (first, second) = std::thread::scope(|scope| {
        let second =
            scope.spawn(|| render_environment(&template, overrides2, backend.as_ref()));
        let first = render_environment(&template, overrides, backend.as_ref());
        let second = second
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("rendering environment `{env2}` panicked")));
        (first, second)
    });
    let first = first.map_err(|e| e.context(format!("environment `{}`", cli.config.env)))?;
    let second = second.map_err(|e| e.context(format!("environment `{env2}`")))?;

    let differences = samrender::diff::diff(&first, &second);
    if differences.is_empty() {
        eprintln!("environments `{}` and `{env2}` render identically", cli.config.env);
    }
    for difference in differences {
        println!("{difference}");
    }

    Ok(())
}

fn render_environment(
    template: &Template,
    overrides: IndexMap<String, String>,
    backend: &dyn ExternalResolver,
) -> anyhow::Result<Value> {
    let mut context = EvaluationContext::builder(template)
        .overrides(overrides)
        .backend(backend)
        .build()?;

    Ok(samrender::resolver::render(template, &mut context)?)
}

fn backend(args: &cli::BackendArgs, region: &str) -> anyhow::Result<Box<dyn ExternalResolver>> {
    let Some(profile) = &args.profile else {
        return Ok(Box::new(MockResolver));
    };

    let resolver = aws_backend(profile, region, args.timeout)?;
    if args.mock_on_failure {
        return Ok(Box::new(FallbackToMock::new(resolver)));
    }

    Ok(resolver)
}

#[cfg(feature = "aws")]
fn aws_backend(
    profile: &str,
    region: &str,
    timeout: u64,
) -> anyhow::Result<Box<dyn ExternalResolver>> {
    let timeout = std::time::Duration::from_secs(timeout);
    Ok(Box::new(samrender::backend::AwsResolver::new(
        profile, region, timeout,
    )?))
}

#[cfg(not(feature = "aws"))]
fn aws_backend(
    profile: &str,
    _region: &str,
    _timeout: u64,
) -> anyhow::Result<Box<dyn ExternalResolver>> {
    anyhow::bail!("--profile {profile} needs samrender built with the `aws` feature")
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (samrender-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    match cli.command {
        cli::DevSubCommand::Template { template } => {
            let template = Template::load_file(&template)?;
            println!("{template:#?}");
        }
        cli::DevSubCommand::Functions { template } => {
            let template = Template::load_file(&template)?;
            let no_outputs = Mapping::new();

            let mut used: IndexMap<String, usize> = IndexMap::new();
            let mut count = |call: &IntrinsicCall| *used.entry(call.name.clone()).or_default() += 1;
            for section in [
                &template.conditions,
                &template.resources,
                template.outputs.as_ref().unwrap_or(&no_outputs),
            ] {
                for value in section.values() {
                    value.visit_intrinsics(&mut count);
                }
            }

            for (name, uses) in used {
                println!("{name}\t{uses}");
            }
        }
    }

    Ok(())
}
