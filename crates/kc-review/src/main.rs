use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use kc_client::bootstrap;
use kc_client::config::AppConfig;
use kc_client::logging::init_logging;
use kc_client::workflow::{ConsoleService, HumanEdit};
use kc_core::core::{
    AnswerBlock, AudioId, GuideId, InterviewStatus, Passphrase, PromptBlock, VersionSelector,
};

#[derive(Debug, Parser)]
#[command(
    name = "kc-review",
    about = "Walk through an interview's answers and save a human-edited version"
)]
struct Args {
    #[arg(short, long, default_value = "kc.toml")]
    config: PathBuf,
    #[arg(long)]
    passphrase: Option<String>,
    audio_id: String,
    guide_id: String,
    /// `latest`, `3` or `v3`.
    #[arg(long, default_value = "latest")]
    version: VersionSelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Accept,
    Edit,
    Clear,
    Quit,
}

fn parse_action(input: &str) -> Option<Action> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "a" => Some(Action::Accept),
        "e" => Some(Action::Edit),
        "c" => Some(Action::Clear),
        "q" => Some(Action::Quit),
        _ => None,
    }
}

fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(input.trim().to_owned())),
        Err(err) => Err(err),
    }
}

fn ask_action() -> io::Result<Action> {
    loop {
        let Some(input) = prompt_line("[a]ccept / [e]dit / [c]lear / [q]uit (Enter accepts): ")?
        else {
            println!();
            return Ok(Action::Quit);
        };
        match parse_action(&input) {
            Some(action) => return Ok(action),
            None => eprintln!("{}", "Please enter a, e, c or q.".yellow()),
        }
    }
}

/// Returns `None` when the reviewer quits; `Some(changed)` otherwise.
fn review_text(current: &mut String) -> io::Result<Option<bool>> {
    match ask_action()? {
        Action::Accept => Ok(Some(false)),
        Action::Clear => {
            let changed = !current.is_empty();
            current.clear();
            Ok(Some(changed))
        }
        Action::Edit => match prompt_line("New text (Enter keeps current): ")? {
            Some(value) if !value.is_empty() && value != *current => {
                *current = value;
                Ok(Some(true))
            }
            Some(_) => Ok(Some(false)),
            None => Ok(None),
        },
        Action::Quit => Ok(None),
    }
}

fn show_answer(n: usize, total: usize, block: &AnswerBlock) {
    println!();
    println!(
        "{} {}",
        format!("Q{n}/{total}.").bright_cyan().bold(),
        block.question.bold()
    );
    if block.answer.trim().is_empty() {
        println!("A: {}", "(no answer)".yellow());
    } else {
        println!("A: {}", block.answer);
    }
    for quote in &block.quotes {
        match quote.note.as_deref() {
            Some(note) => println!("   {}", format!("\"{}\" ({note})", quote.quote).dimmed()),
            None => println!("   {}", format!("\"{}\"", quote.quote).dimmed()),
        }
    }
    if let Some(reasoning) = block.reasoning.as_deref() {
        println!("   {}", format!("reasoning: {reasoning}").dimmed());
    }
}

fn show_prompt(n: usize, total: usize, block: &PromptBlock) {
    println!();
    println!(
        "{} {}",
        format!("P{n}/{total}.").bright_magenta().bold(),
        block.prompt_text.bold()
    );
    if block.response.trim().is_empty() {
        println!("R: {}", "(no response)".yellow());
    } else {
        println!("R: {}", block.response);
    }
}

/// Walks every answer and prompt response. `None` means the reviewer quit.
fn review(answers: &mut [AnswerBlock], prompts: &mut [PromptBlock]) -> io::Result<Option<usize>> {
    let mut changes = 0;

    let total = answers.len();
    for (n, block) in answers.iter_mut().enumerate() {
        show_answer(n + 1, total, block);
        match review_text(&mut block.answer)? {
            Some(true) => changes += 1,
            Some(false) => {}
            None => return Ok(None),
        }
    }

    let total = prompts.len();
    for (n, block) in prompts.iter_mut().enumerate() {
        show_prompt(n + 1, total, block);
        match review_text(&mut block.response)? {
            Some(true) => changes += 1,
            Some(false) => {}
            None => return Ok(None),
        }
    }

    Ok(Some(changes))
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    let config = AppConfig::load(Some(args.config.as_path()))
        .with_context(|| format!("reading {}", args.config.display()))?;
    let runtime = bootstrap::into_runtime(config)?;
    init_logging(&runtime.log_level, runtime.log_format)?;

    let passphrase = args.passphrase.map(Passphrase::new);
    runtime.access_gate.check(passphrase.as_ref())?;

    let service = ConsoleService::from_runtime(&runtime)?;
    let audio = AudioId::new(args.audio_id);
    let guide = GuideId::new(args.guide_id);

    let loaded = service.load_answers(&audio, &guide, args.version).await?;
    let model = loaded
        .model
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "unknown model".to_owned());
    println!(
        "{} {} / {} (version {}, {})",
        "Reviewing".bright_green().bold(),
        audio,
        loaded.guide.name,
        loaded.version.version,
        model
    );
    if loaded.reconciliation.drift() {
        eprintln!(
            "{}",
            format!(
                "Warning: guide has {} questions but the analysis has {}",
                loaded.reconciliation.filtered_count, loaded.reconciliation.result_count
            )
            .yellow()
        );
    }

    let mut answers = loaded.reconciliation.answers.clone();
    let mut prompts = loaded.reconciliation.prompts.clone();
    let Some(changes) = review(&mut answers, &mut prompts)? else {
        println!("{}", "Review abandoned; nothing saved.".yellow());
        return Ok(());
    };
    if changes == 0 {
        println!("{}", "No changes; nothing saved.".bright_green());
        return Ok(());
    }

    let confirm = prompt_line(&format!("Save {changes} change(s) as a human-edited version? [y/N]: "))?;
    if !matches!(confirm.as_deref(), Some("y") | Some("Y")) {
        println!("{}", "Not saved.".yellow());
        return Ok(());
    }

    let base_model = loaded
        .model
        .as_ref()
        .map(|m| InterviewStatus::from_wire(m.as_str()))
        .and_then(|status| status.model().cloned())
        .unwrap_or_else(|| runtime.default_model.clone());
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
        Some(version) => println!("{}", format!("Saved as version {version}.").bright_green()),
        None => println!("{}", "Saved.".bright_green()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "review failed");
            eprintln!("{}", format!("Error: {err:#}").red());
            ExitCode::FAILURE
        }
    }
}
