//! Two-agent project builder CLI.
//!
//! Resolves a skill, lets the generation agent build the project in a fresh
//! workdir, has the review agent check it, and prints the delivery record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use builder::core::types::{DeliveryRecord, DeliveryStatus};
use builder::exit_codes;
use builder::io::agent::CommandAgent;
use builder::io::config::load_config;
use builder::io::init::{InitOptions, init_builder};
use builder::io::instructions::Instructions;
use builder::io::skills::{DirSkillRegistry, SkillNotFound, SkillRegistry};
use builder::logging;
use builder::workflow::{FixSkipReason, RunEvent, RunRequest, Workflow};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "builder",
    version,
    about = "Generate and review web projects with two cooperating agents"
)]
struct Cli {
    /// Path to the builder config file.
    #[arg(long, global = true, default_value = "builder.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config and seed prompts, skills and knowledge base.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// List registered skills.
    List,
    /// Run the generate → review → fix pipeline for one skill.
    Run {
        /// Skill id, as shown by `builder list`.
        skill_id: String,
        /// Free-text request; multiple words are joined with spaces.
        user_input: Vec<String>,
        /// Use this run id instead of a random one.
        #[arg(long)]
        run_id: Option<String>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            if err.downcast_ref::<SkillNotFound>().is_some() {
                eprintln!("hint: `builder list` shows the available skills");
            }
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::List => cmd_list(&cli.config),
        Command::Run {
            skill_id,
            user_input,
            run_id,
        } => cmd_run(&cli.config, skill_id, user_input.join(" "), run_id),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    let report = init_builder(config_path, &InitOptions { force })?;
    for path in &report.written {
        println!("wrote {}", path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_list(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let registry = DirSkillRegistry::new(&config.skills_dir);
    for skill in registry.list()? {
        println!("{}\t{}\t{}", skill.id, skill.name, skill.description);
    }
    Ok(exit_codes::OK)
}

fn cmd_run(
    config_path: &Path,
    skill_id: String,
    user_input: String,
    run_id: Option<String>,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let api_key = read_api_key(&config.agent.api_key_env)?;
    let instructions = Instructions::load(&config.prompts_dir, &config.knowledge_dir)
        .context("load agent instructions")?;
    let registry = DirSkillRegistry::new(&config.skills_dir);
    let agent = CommandAgent::new(config.agent.clone(), api_key);
    let workflow = Workflow::new(&config, instructions, &registry, &agent);

    let request = RunRequest {
        skill_id,
        user_input,
        run_id,
    };
    let record = workflow.run(&request, |event| {
        if let Some(line) = describe(event) {
            eprintln!("{line}");
        }
    })?;
    print_record(&record)?;
    Ok(match record.status {
        DeliveryStatus::Success => exit_codes::OK,
        DeliveryStatus::Fail => exit_codes::DELIVERY_FAILED,
    })
}

/// Read the agent API key up front so a missing key fails before any workdir
/// is created. An empty `api_key_env` leaves credentials to the agent CLI.
fn read_api_key(env_name: &str) -> Result<Option<String>> {
    if env_name.is_empty() {
        return Ok(None);
    }
    match std::env::var(env_name) {
        Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
        _ => bail!("{env_name} is not set; export it before `builder run`"),
    }
}

fn print_record(record: &DeliveryRecord) -> Result<()> {
    let payload = serde_json::to_string_pretty(record).context("serialize delivery record")?;
    println!("{payload}");
    Ok(())
}

/// One progress line per event worth showing.
fn describe(event: &RunEvent) -> Option<String> {
    let line = match event {
        RunEvent::PhaseEntered(_) => return None,
        RunEvent::Started {
            run_id,
            workdir,
            skill,
        } => format!("[{run_id}] {skill} -> {}", workdir.display()),
        RunEvent::GenerationFinished { produced: true } => "generation finished".to_string(),
        RunEvent::GenerationFinished { produced: false } => "generation failed".to_string(),
        RunEvent::ReviewFinished {
            passed,
            score,
            issues,
            critical,
        } => format!(
            "review: passed={passed} score={score} issues={issues} critical={critical}"
        ),
        RunEvent::ReviewMissing => "review: no usable report".to_string(),
        RunEvent::FixRequested { critical } => {
            format!("fix: sending {critical} critical issue(s) back")
        }
        RunEvent::FixSkipped(FixSkipReason::NotNeeded) => "fix: not needed".to_string(),
        RunEvent::FixSkipped(FixSkipReason::NoCriticalIssues) => {
            "fix: skipped, no critical issues".to_string()
        }
        RunEvent::Delivered(record) => match record.error() {
            Some(error) => format!("delivered: fail ({error})"),
            None => "delivered: success".to_string(),
        },
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder::workflow::Phase;

    #[test]
    fn parse_run_with_words_and_run_id() {
        let cli = Cli::parse_from([
            "builder",
            "run",
            "restaurant-menu",
            "中文，红色主题",
            "dark",
            "--run-id",
            "demo01",
        ]);
        let Command::Run {
            skill_id,
            user_input,
            run_id,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(skill_id, "restaurant-menu");
        assert_eq!(user_input.join(" "), "中文，红色主题 dark");
        assert_eq!(run_id.as_deref(), Some("demo01"));
        assert_eq!(cli.config, PathBuf::from("builder.toml"));
    }

    #[test]
    fn parse_global_config_and_init_force() {
        let cli = Cli::parse_from(["builder", "init", "--force", "--config", "/tmp/b.toml"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from("/tmp/b.toml"));
    }

    #[test]
    fn empty_key_env_skips_the_check() {
        assert_eq!(read_api_key("").expect("no check"), None);
        let err = read_api_key("BUILDER_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(err.to_string().contains("is not set"));
    }

    #[test]
    fn phase_events_are_silent() {
        assert!(describe(&RunEvent::PhaseEntered(Phase::Review)).is_none());
        assert_eq!(
            describe(&RunEvent::FixRequested { critical: 2 }).as_deref(),
            Some("fix: sending 2 critical issue(s) back")
        );
    }
}
