//! Command-line surface of the `cdevents` binary.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use cdevents_core::schema::schema_url;
use cdevents_core::{
    BuiltinEvent, CustomData, CustomDataPayload, EventReference, Link, RawEvent, SchemaRegistry,
    TypeIdentifier,
};

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "cdevents", version, about = "Inspect, validate and construct CDEvents")]
pub struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Work with event type strings
    #[command(subcommand)]
    Type(TypeCommand),

    /// Parse an event from a file (or stdin) and print a summary
    Inspect {
        /// Event file; reads stdin when omitted or "-"
        file: Option<PathBuf>,
        /// Fail unless the event type is compatible with this type
        #[arg(long)]
        expect: Option<String>,
        /// Directory holding `<subject>-<predicate>-event.json` schema files
        #[arg(long)]
        schema_dir: Option<PathBuf>,
    },

    /// Construct an event and print it
    New(NewArgs),
}

#[derive(Debug, Subcommand)]
pub enum TypeCommand {
    /// Print the structured form of a type string
    Parse { value: String },
    /// Check whether events of type B can be read as type A
    Compat { a: String, b: String },
}

#[derive(Debug, clap::Args)]
pub struct NewArgs {
    /// Event type, e.g. dev.cdevents.pipelinerun.queued.0.2.0
    pub event_type: String,
    #[arg(long)]
    pub subject_id: String,
    /// Value of `subject.type`; defaults to the type's subject
    #[arg(long)]
    pub subject_type: Option<String>,
    /// Subject content as JSON
    #[arg(long)]
    pub content: Option<String>,
    /// Overrides the configured source
    #[arg(long)]
    pub source: Option<String>,
    /// Structured custom data as JSON
    #[arg(long, group = "custom_payload", conflicts_with = "custom_data_base64")]
    pub custom_data: Option<String>,
    /// Binary custom data, already base64-encoded
    #[arg(long, group = "custom_payload")]
    pub custom_data_base64: Option<String>,
    /// Content type of the custom data
    #[arg(long, requires = "custom_payload")]
    pub content_type: Option<String>,
    /// Add a PATH link from this context id (repeatable)
    #[arg(long = "path-from")]
    pub path_from: Vec<String>,
    /// Add an END link from this context id (repeatable)
    #[arg(long = "end-from")]
    pub end_from: Vec<String>,
    /// Add a RELATION link as KIND=CONTEXT_ID (repeatable)
    #[arg(long = "relation")]
    pub relation: Vec<String>,
}

/// Result of a command: text for stdout and whether it succeeded.
#[derive(Debug)]
pub struct Output {
    pub text: String,
    pub success: bool,
}

impl Output {
    fn ok(text: String) -> Self {
        Self { text, success: true }
    }
}

pub fn run(cli: Cli, config: &CliConfig, stdin: impl Read) -> anyhow::Result<Output> {
    let pretty = cli.pretty || config.pretty();
    match cli.command {
        Command::Type(TypeCommand::Parse { value }) => {
            let id = TypeIdentifier::parse(&value)?;
            render(&describe_type(&id), pretty).map(Output::ok)
        }
        Command::Type(TypeCommand::Compat { a, b }) => {
            let a = TypeIdentifier::parse(&a)?;
            let b = TypeIdentifier::parse(&b)?;
            let compatible = a.is_compatible(&b);
            Ok(Output {
                text: compatible.to_string(),
                success: compatible,
            })
        }
        Command::Inspect {
            file,
            expect,
            schema_dir,
        } => {
            let input = read_input(file.as_deref(), stdin)?;
            inspect(&input, expect.as_deref(), schema_dir.as_deref(), pretty).map(Output::ok)
        }
        Command::New(args) => {
            let event = build_event(args, config)?;
            let text = if pretty {
                serde_json::to_string_pretty(&event)?
            } else {
                event.to_json()?
            };
            Ok(Output::ok(text))
        }
    }
}

fn describe_type(id: &TypeIdentifier) -> Value {
    json!({
        "root": id.root(),
        "customNamespace": id.custom_namespace(),
        "subject": id.subject,
        "predicate": id.predicate,
        "version": id.version,
        "shortName": id.short_name(),
        "unversioned": id.unversioned(),
    })
}

fn read_input(file: Option<&Path>, mut stdin: impl Read) -> anyhow::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut input = String::new();
            stdin.read_to_string(&mut input).context("failed to read stdin")?;
            Ok(input)
        }
    }
}

/// Parse `input` and summarize it.
pub fn inspect(
    input: &str,
    expect: Option<&str>,
    schema_dir: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<String> {
    let raw = RawEvent::parse(input)?;

    if let Some(expected) = expect {
        let expected = TypeIdentifier::parse(expected)?;
        if !expected.is_compatible(raw.event_type()) {
            bail!(
                "event type `{}` is not compatible with `{}`",
                raw.event_type(),
                expected
            );
        }
    }

    let schema = match raw.schema_uri() {
        Some(uri) => uri.to_string(),
        None => schema_url(raw.spec_version(), raw.event_type()),
    };
    let schema_available = match schema_dir {
        Some(dir) => Some(load_schema(dir, &raw)?.is_some()),
        None => None,
    };

    let custom_data = raw.custom_data().payload().kind();
    let content_type = raw.custom_data().wire_content_type().map(str::to_string);
    let links = raw.links().map_or(0, |links| links.len());
    let event = BuiltinEvent::from_raw(raw)?;
    let event_type = event.event_type();

    tracing::info!(event_type = %event_type, builtin = event.is_builtin(), "inspected event");

    let mut summary = json!({
        "type": event_type.to_string(),
        "shortName": event_type.short_name(),
        "builtin": event.is_builtin(),
        "links": links,
        "customData": custom_data,
        "customDataContentType": content_type,
        "schemaUrl": schema,
    });
    if let Some(available) = schema_available {
        summary["schemaAvailable"] = json!(available);
    }
    render(&summary, pretty)
}

fn load_schema(dir: &Path, raw: &RawEvent) -> anyhow::Result<Option<String>> {
    let ty = raw.event_type();
    let path = dir.join(format!("{}-{}-event.json", ty.subject, ty.predicate));
    if !path.exists() {
        tracing::warn!(path = %path.display(), "schema file not found");
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;

    let mut registry = SchemaRegistry::new();
    registry.register(ty, text);
    Ok(raw.schema_data(&registry).map(|entry| entry.text.clone()))
}

/// Construct an event from command-line arguments.
pub fn build_event(args: NewArgs, config: &CliConfig) -> anyhow::Result<BuiltinEvent> {
    let event_type = TypeIdentifier::parse(&args.event_type)?;
    if event_type.short_name().is_empty() {
        bail!("event type must name a subject and a predicate");
    }

    let subject_type = args.subject_type.unwrap_or_else(|| {
        BuiltinEvent::subject_type_for(&event_type)
            .map(str::to_string)
            .unwrap_or_else(|| event_type.subject.clone())
    });
    let mut raw = RawEvent::with_type(event_type, subject_type);
    raw.set_source(args.source.as_deref().unwrap_or(config.source()));
    raw.set_subject_id(args.subject_id);

    if let Some(content) = args.content {
        let content: Value = serde_json::from_str(&content).context("invalid --content JSON")?;
        raw.set_content(content);
    }

    for id in args.path_from {
        raw.add_link(Link::path(EventReference::new(id)));
    }
    for id in args.end_from {
        raw.add_link(Link::end(EventReference::new(id)));
    }
    for relation in args.relation {
        let (kind, id) = relation
            .split_once('=')
            .with_context(|| format!("invalid --relation `{relation}`, expected KIND=CONTEXT_ID"))?;
        raw.add_link(Link::relation(EventReference::new(id), kind));
    }

    if let Some(data) = args.custom_data {
        let data: Value = serde_json::from_str(&data).context("invalid --custom-data JSON")?;
        let content_type = args
            .content_type
            .unwrap_or_else(|| cdevents_core::custom_data::JSON_CONTENT_TYPE.to_string());
        raw.set_custom_data_payload(content_type, CustomDataPayload::Json(data))?;
    } else if let Some(encoded) = args.custom_data_base64 {
        let content_type = args
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = CustomData::decode(Some(&content_type), Some(Value::String(encoded)))?;
        raw.set_custom_data(data);
    }

    // Narrowing checks the content against built-in types.
    Ok(BuiltinEvent::from_raw(raw)?)
}

fn render(value: &Value, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
