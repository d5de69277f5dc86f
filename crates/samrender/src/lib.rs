//! # samrender - local CloudFormation/SAM template renderer
//!
//! Resolves the intrinsic functions of a template for one environment, so the result can be read
//! (or diffed against another environment) without deploying anything.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `samrender` works internally.
//!
//! ### Loading
//!
//! A template is read as YAML into a [value::Value] tree (see [template]). The short-form tags
//! (`!Ref`, `!Sub`, `!GetAtt`, ...) are expanded while loading, so from then on an intrinsic call
//! is always a [value::Value::Intrinsic] holding the long name (`Fn::Sub`) and its raw argument.
//! The [template::Template] splits the document into its sections and keeps the parameter
//! definitions.
//!
//! ### Evaluation context
//!
//! An [context::EvaluationContext] is built once per render (see [context::ContextBuilder]). It
//! holds the final parameter values (override > given value > default), the pseudo-parameters,
//! the mappings and conditions, and the [backend::ExternalResolver] used for imports and secrets.
//!
//! ### Resolution
//!
//! [resolver::resolve] walks the tree. Literals come back unchanged, containers are resolved
//! element by element and every intrinsic call is dispatched by name to its rule in
//! [functions]. Rules receive their arguments unresolved and resolve what they need, which makes
//! `Fn::If`, `Fn::And`, `Fn::Or` and the `Fn::FindInMap` default lazy:
//!
//! ```yaml
//! Conditions:
//!   IsProd: !Equals [!Ref Env, prod]
//! Resources:
//!   Db:
//!     Properties:
//!       # only fetched when IsProd holds
//!       Password: !If [IsProd, "{{resolve:secretsmanager:prod-db:password}}", local]
//! ```
//!
//! Named conditions are evaluated once and cached. Dependency loops between conditions are
//! detected and reported with the full cycle.
//!
//! Strings are scanned for `{{resolve:secretsmanager:...}}` dynamic references (see
//! [dynamic_reference]) whenever they are produced or read.
//!
//! ### Output
//!
//! [resolver::render] evaluates all conditions, then `Resources` and `Outputs`. The result
//! contains no intrinsic calls and is serialized via [serde]. Two renders can be compared with
//! [diff::diff].
//!
//! Errors ([error::Error]) always carry the [path::Path] of the node that failed.
pub mod backend;
pub mod config;
pub mod context;
pub mod diff;
pub mod dynamic_reference;
pub mod error;
pub mod functions;
pub mod path;
pub mod resolver;
pub mod template;
pub mod value;
pub mod visit;
