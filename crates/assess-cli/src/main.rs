//! `assess` command-line tool
//!
//! Inspects framework definitions and persisted assessment snapshots.

use anyhow::{bail, Context, Result};
use assess_core::navigation::Cursor;
use assess_core::{progress, read_snapshot, ProgressReport};
use assess_framework::{load_framework, ValidatedFramework};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("assess")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compliance self-assessment engine")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a framework definition and print a summary")
                .arg(framework_arg()),
        )
        .subcommand(
            Command::new("walk")
                .about("List questions in traversal order")
                .arg(framework_arg()),
        )
        .subcommand(
            Command::new("progress")
                .about("Report progress of a saved assessment")
                .arg(framework_arg())
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .short('s')
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Snapshot JSON file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn framework_arg() -> Arg {
    Arg::new("framework")
        .long("framework")
        .short('f')
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .help("Framework definition (.json, .yaml, .yml)")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let output = run(&matches)?;
    print!("{output}");
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<String> {
    match matches.subcommand() {
        Some(("validate", args)) => validate(&open_framework(args)?),
        Some(("walk", args)) => walk(&open_framework(args)?),
        Some(("progress", args)) => {
            let framework = open_framework(args)?;
            let snapshot = args
                .get_one::<PathBuf>("snapshot")
                .context("missing --snapshot")?;
            report(&framework, snapshot, args.get_flag("json"))
        }
        _ => bail!("unknown command"),
    }
}

fn open_framework(args: &ArgMatches) -> Result<ValidatedFramework> {
    let path = args
        .get_one::<PathBuf>("framework")
        .context("missing --framework")?;
    let framework = load_framework(path)
        .with_context(|| format!("loading {}", path.display()))?
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;
    Ok(framework)
}

fn validate(framework: &ValidatedFramework) -> Result<String> {
    let mut out = String::new();
    let name = &framework.framework().name;
    writeln!(out, "{} v{} ({name})", framework.id(), framework.version())?;
    writeln!(out, "  sections:  {}", framework.sections().len())?;
    let categories: usize = framework.sections().iter().map(|s| s.categories.len()).sum();
    writeln!(out, "  categories: {categories}")?;
    writeln!(out, "  questions: {}", framework.question_count())?;
    let high = framework.entries().filter(|(_, q)| q.priority.is_high()).count();
    writeln!(out, "  high priority: {high}")?;
    writeln!(out, "OK")?;
    Ok(out)
}

fn walk(framework: &ValidatedFramework) -> Result<String> {
    let mut out = String::new();
    let mut cursor = Cursor::new();
    let mut n = 0;
    while let Some(question) = cursor.current_question(framework) {
        n += 1;
        let p = cursor.position();
        let section = &framework.sections()[p.section];
        writeln!(
            out,
            "{n:>4}. [{}/{}] {} {}",
            section.id, section.categories[p.category].id, question.id, question.text
        )?;
        if !cursor.advance(framework) {
            break;
        }
    }
    Ok(out)
}

fn report(framework: &ValidatedFramework, snapshot: &Path, json: bool) -> Result<String> {
    let snapshot = read_snapshot(snapshot).with_context(|| format!("reading {}", snapshot.display()))?;
    if snapshot.framework_id != *framework.id() {
        bail!(
            "snapshot is for framework {}, not {}",
            snapshot.framework_id,
            framework.id()
        );
    }
    if !snapshot.is_consistent() {
        tracing::warn!(assessment = %snapshot.assessment_id, "snapshot counters are inconsistent");
    }

    let store = snapshot.to_store();
    let progress = progress::calculate(framework, &store);
    if json {
        return Ok(serde_json::to_string_pretty(&progress)? + "\n");
    }
    render(&progress, &snapshot)
}

fn render(progress: &ProgressReport, snapshot: &assess_state::AssessmentSnapshot) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Assessment {} ({:?})", snapshot.assessment_id, snapshot.status)?;
    writeln!(
        out,
        "Progress: {}/{} ({}%){}",
        progress.answered,
        progress.total,
        progress.percentage,
        if progress.is_complete { " complete" } else { "" }
    )?;
    writeln!(
        out,
        "High priority: {}/{}",
        progress.high_priority_answered, progress.high_priority_total
    )?;
    match progress.maturity_score {
        Some(score) => writeln!(out, "Maturity: {score:.1}")?,
        None => writeln!(out, "Maturity: n/a")?,
    }
    writeln!(out, "Bookmarked: {}  Flagged: {}", progress.bookmarked, progress.flagged)?;
    for section in &progress.sections {
        writeln!(
            out,
            "  {:<12} {:>3}%  {}/{}",
            section.section.as_str(), section.percentage, section.completion.answered, section.completion.total
        )?;
    }
    writeln!(out, "Changes: {}", snapshot.change_log.len())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_state::{
        AssessmentId, AssessmentSnapshot, AssessmentStatus, Completion, EvidenceLibrary,
        ResponseStore, SessionTiming, SnapshotHeader,
    };

    const FRAMEWORK: &str = r#"
id: mini
version: "2.1"
name: Mini
sections:
  - id: gov
    name: Governance
    categories:
      - id: pol
        name: Policy
        questions:
          - id: q1
            text: Policy exists?
            priority: high
            options: [{value: 0, label: "No"}, {value: 4, label: "Yes"}]
          - id: q2
            text: Reviewed yearly?
            options: [{value: 0, label: "No"}, {value: 4, label: "Yes"}]
"#;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mini.yaml");
        std::fs::write(&path, FRAMEWORK).unwrap();
        (dir, path)
    }

    fn args(list: &[&str]) -> ArgMatches {
        cli().try_get_matches_from(list).unwrap()
    }

    #[test]
    fn validate_prints_summary() {
        let (_dir, path) = fixture();
        let out = run(&args(&["assess", "validate", "-f", path.to_str().unwrap()])).unwrap();
        assert!(out.starts_with("mini v2.1 (Mini)"));
        assert!(out.contains("questions: 2"));
        assert!(out.contains("high priority: 1"));
    }

    #[test]
    fn walk_lists_in_order() {
        let (_dir, path) = fixture();
        let out = run(&args(&["assess", "walk", "-f", path.to_str().unwrap()])).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[gov/pol] q1"));
        assert!(lines[1].contains("q2 Reviewed yearly?"));
    }

    #[test]
    fn progress_report_from_snapshot() {
        let (dir, path) = fixture();
        let framework = load_framework(&path).unwrap().validate().unwrap();
        let mut store = ResponseStore::new();
        let q1 = framework.question(&"q1".into()).unwrap().question;
        store.set_response(q1, 4, None).unwrap();

        let snapshot = AssessmentSnapshot::assemble(
            SnapshotHeader {
                assessment_id: AssessmentId::new(),
                framework_id: framework.id().clone(),
                framework_version: "2.1".into(),
                status: AssessmentStatus::InProgress,
            },
            &store,
            &EvidenceLibrary::new(),
            Completion::new(1, 2),
            SessionTiming::starting_now(),
            Vec::new(),
        );
        let snap_path = dir.path().join("snap.json");
        std::fs::write(&snap_path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

        let framework_arg = path.to_str().unwrap();
        let snapshot_arg = snap_path.to_str().unwrap();
        let text = run(&args(&["assess", "progress", "-f", framework_arg, "-s", snapshot_arg])).unwrap();
        assert!(text.contains("Progress: 1/2 (50%)"));
        assert!(text.contains("Maturity: 100.0"));

        let json = run(&args(&["assess", "progress", "-f", framework_arg, "-s", snapshot_arg, "--json"])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["percentage"], 50);
        assert_eq!(value["high_priority_answered"], 1);
    }

    #[test]
    fn missing_framework_is_an_error() {
        let err = run(&args(&["assess", "validate", "-f", "/nonexistent/fw.yaml"])).unwrap_err();
        assert!(err.to_string().contains("loading"));
    }
}
