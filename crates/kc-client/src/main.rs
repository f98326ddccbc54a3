use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use kc_client::bootstrap::{self, RuntimeConfig};
use kc_client::config::AppConfig;
use kc_client::logging::init_logging;
use kc_client::polling::poll_artifact;
use kc_client::workflow::{ConsoleService, HumanEdit, InterviewUpload};
use kc_core::core::{
    is_valid_question_text, AnswerBlock, ArtifactKind, ArtifactStatus, AudioId, DeleteOutcome,
    DeleteScope, GuideId, InterviewStatus, ModelName, Passphrase, RecordMetadata, VersionNumber,
    VersionSelector,
};
use kc_export::{
    bulk_filename, export_bulk_text, export_interview_text, export_to_json, interview_filename,
    sort_interviews, InterviewFilter, SortKey, StatusKind,
};

#[derive(Parser)]
#[command(name = "kc", about = "Farmer-interview console client")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the configuration file (optional; defaults apply when absent).
    #[arg(short, long, default_value = "kc.toml", global = true)]
    config: PathBuf,

    /// Console passphrase; destructive commands need the admin one.
    #[arg(long, global = true)]
    passphrase: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and exit.
    Validate,
    /// Uploaded audio records.
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Print the transcript of a record.
    Transcript(ArtifactArgs),
    /// Print the English translation of a record.
    Translation(ArtifactArgs),
    /// Interview guides.
    #[command(subcommand)]
    Guides(GuidesCommand),
    /// Trigger a new analysis for an (audio, guide) pair.
    Analyze(PairArgs),
    /// List analysis versions for an (audio, guide) pair.
    Versions {
        #[command(flatten)]
        pair: PairArgs,
        /// Fetch version bodies to fill in missing model names.
        #[arg(long)]
        models: bool,
    },
    /// Show reconciled answers for one analysis version.
    Answers {
        #[command(flatten)]
        pair: PairArgs,
        /// `latest`, `3` or `v3`.
        #[arg(long, default_value = "latest")]
        version: VersionSelector,
        #[arg(long)]
        json: bool,
    },
    /// Save edited answers as a new human-edit version.
    SaveEdit {
        #[command(flatten)]
        pair: PairArgs,
        /// JSON file: `{"answers": [{"index": 0, "answer": "..."}], "prompts": [...]}`.
        #[arg(long)]
        file: PathBuf,
        /// Version the edits apply to.
        #[arg(long, default_value = "latest")]
        version: VersionSelector,
    },
    /// Delete one analysis version, or all of them.
    DeleteAnalysis {
        #[command(flatten)]
        pair: PairArgs,
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        version: Option<u32>,
        #[arg(long)]
        all: bool,
    },
    /// Export interviews as text or JSON files.
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum RecordsCommand {
    /// List records as interviews.
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Upload an audio file and wait for its transcript and translation.
    Upload {
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Merge-update a record's metadata.
    Metadata {
        audio_id: String,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Delete a record and its artifacts.
    Delete { audio_id: String },
}

#[derive(Subcommand)]
enum GuidesCommand {
    List,
    /// Print the parsed questions and prompts of a guide.
    Show { guide_id: String },
    /// Upload a guide file (JSON `{questions, prompts}` or one question per line).
    Upload { name: String, file: PathBuf },
    Delete { guide_id: String },
}

#[derive(Args)]
struct ArtifactArgs {
    audio_id: String,
    /// Poll until the artifact is ready.
    #[arg(long)]
    wait: bool,
}

#[derive(Args)]
struct PairArgs {
    audio_id: String,
    guide_id: String,
}

#[derive(Args, Default)]
struct MetadataArgs {
    #[arg(long)]
    interviewer: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    village: Option<String>,
    #[arg(long)]
    farmer: Option<String>,
    #[arg(long)]
    guide: Option<String>,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    guide: Option<String>,
    #[arg(long)]
    village: Option<String>,
    /// draft, generated or human-edited
    #[arg(long)]
    status: Option<StatusKind>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    human_edited: bool,
    /// date, farmer or village
    #[arg(long, default_value = "date")]
    sort: SortKey,
    #[arg(long)]
    desc: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Only these records (repeatable).
    #[arg(long = "audio")]
    audio_ids: Vec<String>,
    /// Write a single bulk file instead of one file per interview.
    #[arg(long)]
    bulk: bool,
    #[arg(long)]
    json: bool,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

/// Edits file read by `save-edit`.
#[derive(Deserialize)]
struct EditFile {
    #[serde(default)]
    answers: Vec<AnswerEdit>,
    #[serde(default)]
    prompts: Vec<AnswerEdit>,
}

#[derive(Deserialize)]
struct AnswerEdit {
    index: usize,
    answer: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Command::Validate) {
        return run_validate(&cli.config);
    }

    let runtime = match load_runtime(&cli.config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Config invalid: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&runtime.log_level, runtime.log_format) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli, runtime).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_validate(path: &Path) -> ExitCode {
    match load_runtime(path) {
        Ok(runtime) => {
            println!("Config valid: {} (backend {})", path.display(), runtime.base_url);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config invalid: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_runtime(path: &Path) -> Result<RuntimeConfig, anyhow::Error> {
    let config = AppConfig::load(Some(path))
        .with_context(|| format!("reading {}", path.display()))?;
    bootstrap::into_runtime(config)
}

async fn run(cli: Cli, runtime: RuntimeConfig) -> Result<(), anyhow::Error> {
    let passphrase = cli.passphrase.map(Passphrase::new);
    let gate = &runtime.access_gate;
    gate.check(passphrase.as_ref())?;
    if is_destructive(&cli.command) {
        gate.require_admin(passphrase.as_ref())?;
    }

    let service = ConsoleService::from_runtime(&runtime)?;
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Command::Validate => Ok(()),
        Command::Records(cmd) => run_records(&service, cmd, &cancel).await,
        Command::Transcript(args) => {
            run_artifact(&service, &runtime, args, ArtifactKind::Transcript, &cancel).await
        }
        Command::Translation(args) => {
            run_artifact(&service, &runtime, args, ArtifactKind::Translation, &cancel).await
        }
        Command::Guides(cmd) => run_guides(&service, cmd).await,
        Command::Analyze(pair) => {
            let (audio, guide) = pair.ids();
            let run = service.run_analysis(&audio, &guide).await?;
            match run.version {
                Some(v) => println!("Analysis {v} stored ({})", run.status),
                None => println!("Analysis stored ({})", run.status),
            }
            print_answers(&run.reconciliation.answers);
            Ok(())
        }
        Command::Versions { pair, models } => {
            let (audio, guide) = pair.ids();
            let versions = if models {
                service.versions.list_with_models(&audio, &guide).await?
            } else {
                service.versions.list(&audio, &guide).await?
            };
            if versions.is_empty() {
                println!("No versions available for audio {audio} and guide {guide}");
            }
            for v in versions {
                println!(
                    "{:>5}  {:<28}  {}",
                    v.version.to_string(),
                    v.model.as_ref().map(ModelName::as_str).unwrap_or("-"),
                    v.last_modified
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Answers {
            pair,
            version,
            json,
        } => {
            let (audio, guide) = pair.ids();
            let loaded = service.load_answers(&audio, &guide, version).await?;
            if json {
                return print_json(&loaded.reconciliation.answers);
            }
            println!(
                "{} {} ({})",
                loaded.guide.name,
                loaded.version.version,
                loaded.model.as_ref().map(ModelName::as_str).unwrap_or("unknown model")
            );
            if loaded.reconciliation.drift() {
                println!(
                    "warning: guide has {} questions, analysis has {}",
                    loaded.reconciliation.filtered_count, loaded.reconciliation.result_count
                );
            }
            for prompt in &loaded.reconciliation.prompts {
                println!("* {}\n  {}", prompt.prompt_text, prompt.response);
            }
            print_answers(&loaded.reconciliation.answers);
            Ok(())
        }
        Command::SaveEdit {
            pair,
            file,
            version,
        } => {
            let (audio, guide) = pair.ids();
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let edits: EditFile = serde_json::from_str(&raw).context("parsing edits file")?;

            let loaded = service.load_answers(&audio, &guide, version).await?;
            let mut answers = loaded.reconciliation.answers;
            let mut prompts = loaded.reconciliation.prompts;
            for edit in edits.answers {
                match answers.iter_mut().find(|a| a.index == edit.index) {
                    Some(a) => a.answer = edit.answer,
                    None => bail!("no question with index {}", edit.index),
                }
            }
            for edit in edits.prompts {
                match prompts.iter_mut().find(|p| p.index == edit.index) {
                    Some(p) => p.response = edit.answer,
                    None => bail!("no prompt with index {}", edit.index),
                }
            }

            let base_model = base_model(loaded.model.as_ref(), &runtime.default_model);
            let saved = service
                .save_human_edit(
                    &audio,
                    &guide,
                    HumanEdit {
                        answers,
                        prompts,
                        base_model,
                        based_on_version: Some(loaded.version.version),
                    },
                )
                .await?;
            match saved {
                Some(v) => println!("Saved human edit as {v}"),
                None => println!("Saved human edit"),
            }
            Ok(())
        }
        Command::DeleteAnalysis { pair, version, all } => {
            let (audio, guide) = pair.ids();
            let scope = match (version, all) {
                (_, true) => DeleteScope::AllVersions,
                (Some(v), false) => DeleteScope::Version(VersionNumber::new(v)),
                (None, false) => bail!("pass --version N or --all"),
            };
            let outcome = service.delete_analysis(&audio, &guide, scope).await?;
            report_delete("analysis", outcome);
            Ok(())
        }
        Command::Export(args) => run_export(&service, args).await,
    }
}

fn is_destructive(command: &Command) -> bool {
    matches!(
        command,
        Command::Records(RecordsCommand::Delete { .. })
            | Command::Guides(GuidesCommand::Delete { .. })
            | Command::Guides(GuidesCommand::Upload { .. })
            | Command::DeleteAnalysis { .. }
    )
}

/// The generating model without any human-edit marker.
fn base_model(model: Option<&ModelName>, fallback: &ModelName) -> ModelName {
    model
        .map(|m| InterviewStatus::from_wire(m.as_str()))
        .and_then(|status| status.model().cloned())
        .unwrap_or_else(|| fallback.clone())
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

async fn run_records(
    service: &ConsoleService,
    cmd: RecordsCommand,
    cancel: &CancellationToken,
) -> Result<(), anyhow::Error> {
    match cmd {
        RecordsCommand::List { filter, json } => {
            let mut interviews = service.interviews.list().await?;
            let (criteria, key, descending) = filter.into_parts();
            sort_interviews(&mut interviews, key, descending);
            let selected = criteria.apply(&interviews);
            if json {
                return print_json(&selected);
            }
            for i in selected {
                println!(
                    "{:<24} {:<20} {:<16} {:<10} {:<16} {}",
                    i.audio_id,
                    i.farmer_name,
                    i.village,
                    i.date.map(|d| d.to_string()).unwrap_or_default(),
                    i.guide_name,
                    i.status
                );
            }
            Ok(())
        }
        RecordsCommand::Upload {
            file,
            content_type,
            metadata,
        } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .context("audio file name is not valid UTF-8")?
                .to_owned();
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&file).to_owned());
            let metadata = metadata.into_metadata(service).await?;

            let uploaded = service
                .upload_interview(
                    InterviewUpload {
                        file_name,
                        content_type,
                        bytes,
                        metadata,
                    },
                    cancel,
                )
                .await?;
            println!("Uploaded {}", uploaded.audio_id);
            println!("\nTranscript:\n{}", uploaded.transcript);
            println!("\nTranslation:\n{}", uploaded.translation);
            Ok(())
        }
        RecordsCommand::Metadata { audio_id, metadata } => {
            let patch = metadata.into_metadata(service).await?;
            service
                .update_metadata(&AudioId::new(audio_id.as_str()), patch)
                .await?;
            println!("Updated {audio_id}");
            Ok(())
        }
        RecordsCommand::Delete { audio_id } => {
            let outcome = service.delete_interview(&AudioId::new(audio_id)).await?;
            report_delete("record", outcome);
            Ok(())
        }
    }
}

async fn run_artifact(
    service: &ConsoleService,
    runtime: &RuntimeConfig,
    args: ArtifactArgs,
    kind: ArtifactKind,
    cancel: &CancellationToken,
) -> Result<(), anyhow::Error> {
    let audio = AudioId::new(args.audio_id);
    if args.wait {
        let text = poll_artifact(service.backend(), &audio, kind, &runtime.poll, cancel).await?;
        println!("{text}");
        return Ok(());
    }
    match service.artifact(&audio, kind).await? {
        ArtifactStatus::Ready(text) => println!("{text}"),
        ArtifactStatus::Pending => println!("{kind} for {audio} is still pending"),
    }
    Ok(())
}

async fn run_guides(service: &ConsoleService, cmd: GuidesCommand) -> Result<(), anyhow::Error> {
    match cmd {
        GuidesCommand::List => {
            for g in service.guides.list().await? {
                println!("{:<32} {}", g.id, g.display_name());
            }
            Ok(())
        }
        GuidesCommand::Show { guide_id } => {
            let guide = service.guides.get(&GuideId::new(guide_id)).await?;
            println!("{} ({})", guide.name, guide.id);
            println!("\nQuestions:");
            for (n, q) in guide.questions.iter().enumerate() {
                if is_valid_question_text(q) {
                    println!("{:>3}. {q}", n + 1);
                }
            }
            if guide.prompts.iter().any(|p| is_valid_question_text(p)) {
                println!("\nPrompts:");
                for (n, p) in guide.prompts.iter().enumerate() {
                    if is_valid_question_text(p) {
                        println!("{:>3}. {p}", n + 1);
                    }
                }
            }
            Ok(())
        }
        GuidesCommand::Upload { name, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let id = service.upload_guide(&name, &text).await?;
            println!("Uploaded guide {id}");
            Ok(())
        }
        GuidesCommand::Delete { guide_id } => {
            let outcome = service.delete_guide(&GuideId::new(guide_id)).await?;
            report_delete("guide", outcome);
            Ok(())
        }
    }
}

async fn run_export(service: &ConsoleService, args: ExportArgs) -> Result<(), anyhow::Error> {
    let mut shells = service.interviews.list().await?;
    let (criteria, key, descending) = args.filter.into_parts();
    sort_interviews(&mut shells, key, descending);

    let mut interviews = Vec::new();
    for shell in criteria.apply(&shells) {
        if !args.audio_ids.is_empty() && !args.audio_ids.iter().any(|a| a == shell.audio_id.as_str())
        {
            continue;
        }
        if let Some(full) = service.load_interview(&shell.audio_id).await? {
            interviews.push(full);
        }
    }
    if interviews.is_empty() {
        bail!("no interviews match");
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let now = Utc::now();

    if args.json {
        let path = args.out.join(bulk_filename(now)).with_extension("json");
        write_file(&path, &export_to_json(&interviews, now)?)?;
    } else if args.bulk {
        let path = args.out.join(bulk_filename(now));
        write_file(&path, &export_bulk_text(&interviews))?;
    } else {
        for interview in &interviews {
            let path = args
                .out
                .join(interview_filename(&interview.id, &interview.farmer_name));
            write_file(&path, &export_interview_text(interview))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

impl PairArgs {
    fn ids(&self) -> (AudioId, GuideId) {
        (
            AudioId::new(self.audio_id.as_str()),
            GuideId::new(self.guide_id.as_str()),
        )
    }
}

impl MetadataArgs {
    /// Resolves the guide's display name when a guide id is given.
    async fn into_metadata(self, service: &ConsoleService) -> Result<RecordMetadata, anyhow::Error> {
        let guide_id = self.guide.map(GuideId::new);
        let guide_name = match &guide_id {
            Some(id) => {
                let summaries = service.guides.list().await?;
                let Some(summary) = summaries.iter().find(|s| &s.id == id) else {
                    bail!("unknown guide {id}");
                };
                Some(summary.display_name().to_owned())
            }
            None => None,
        };
        Ok(RecordMetadata {
            interviewer: self.interviewer,
            date: self.date,
            village: self.village,
            farmer_name: self.farmer,
            guide_id,
            guide_name,
            status: None,
        })
    }
}

impl FilterArgs {
    fn into_parts(self) -> (InterviewFilter, SortKey, bool) {
        (
            InterviewFilter {
                guide_id: self.guide.map(GuideId::new),
                village: self.village,
                status: self.status,
                search: self.search,
                human_edited_only: self.human_edited,
            },
            self.sort,
            self.desc,
        )
    }
}

fn guess_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_answers(answers: &[AnswerBlock]) {
    for (n, a) in answers.iter().enumerate() {
        println!("\nQ{}. {}", n + 1, a.question);
        if a.is_answered() {
            println!("A: {}", a.answer);
        } else {
            println!("A: (no answer)");
        }
        for q in &a.quotes {
            println!("   \"{}\"", q.quote);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), anyhow::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_delete(what: &str, outcome: DeleteOutcome) {
    match outcome {
        DeleteOutcome::Deleted => println!("Deleted {what}"),
        DeleteOutcome::AlreadyAbsent => println!("{what} was already absent"),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), anyhow::Error> {
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
