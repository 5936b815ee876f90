use anyhow::Result;
use mlwizard::config::WizardConfig;
use mlwizard::logging::{log, obj, v_num, v_str, Domain, Level};
use mlwizard::project::ProjectDraft;
use mlwizard::runner::WizardRunner;
use serde_json::json;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = WizardConfig::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("time_scale", v_num(cfg.time_scale)),
            ("best_policy", v_str(&format!("{:?}", cfg.best_policy))),
            ("store", v_str(cfg.store_path.as_deref().unwrap_or("memory"))),
        ]),
    );

    let draft = ProjectDraft::new(&cfg.project_name, cfg.problem_type)
        .with_description(&cfg.project_description);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut runner = WizardRunner::new(cfg)?.with_progress(tx);
    runner.create_project(&draft)?;

    // Progress already goes to the trace log; drain the channel so the
    // sender side never accumulates.
    let drain = tokio::spawn(async move {
        let mut updates = 0u64;
        while rx.recv().await.is_some() {
            updates += 1;
        }
        updates
    });

    let summary = runner.run_to_end().await?;
    let monitoring = runner.monitoring();
    drop(runner);
    let updates = drain.await.unwrap_or(0);

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "summary": summary,
            "monitoring": monitoring,
            "progress_updates": updates,
        }))?
    );
    Ok(())
}
