mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource, EvaluationRecord};
use policy_engine::{CallerContext, FilterDecision, MaskDecision, PolicyEngine};

use crate::cli::{CallerArgs, Cli, Command};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build an immutable caller context from the CLI identity flags.
fn caller_context(args: &CallerArgs) -> CallerContext {
    CallerContext::new(args.role.as_str(), args.user.as_str())
        .with_secondary_roles(args.secondary_roles.iter().cloned())
}

/// Summarise a mask decision for the audit trail without the raw value.
fn mask_record(policy: &str, decision: &MaskDecision, unchanged: bool) -> EvaluationRecord {
    EvaluationRecord {
        policy: policy.to_string(),
        matched_rule: decision.matched_rule.clone(),
        outcome: if unchanged {
            "value unchanged".to_string()
        } else {
            "value transformed".to_string()
        },
    }
}

/// Summarise a row-filter decision for the audit trail.
fn filter_record(policy: &str, decision: &FilterDecision) -> EvaluationRecord {
    EvaluationRecord {
        policy: policy.to_string(),
        matched_rule: decision.matched_rule.clone(),
        outcome: if decision.visible {
            "admit".to_string()
        } else {
            "exclude".to_string()
        },
    }
}

// ---------------------------------------------------------------------------
// Subcommand execution
// ---------------------------------------------------------------------------

/// Execute the chosen subcommand and return the process exit code.
///
/// Exit codes: 0 for success (including a successfully computed mask), 2 when
/// a row access policy hides the row from the caller.
async fn run(cli: &Cli, engine: &PolicyEngine, audit: &AuditSink) -> Result<i32> {
    match &cli.command {
        Command::Validate => {
            let registry = engine.registry();
            println!(
                "policy file OK: {} policies, {} bindings",
                registry.policy_count(),
                registry.binding_count()
            );
            Ok(0)
        }

        Command::Mask {
            policy,
            caller,
            value,
        } => {
            let ctx = caller_context(caller);
            let decision = engine
                .evaluate_mask(policy, &ctx, value)
                .context("mask evaluation failed")?;

            audit
                .log(
                    AuditEntry::new(
                        AuditEventType::MaskEvaluated,
                        AuditSource::new("data-veil").with_caller_role(&caller.role),
                        serde_json::json!({ "reason": decision.reason }),
                    )
                    .with_evaluation(mask_record(policy, &decision, decision.value == *value)),
                )
                .await;

            println!("{}", decision.value);
            Ok(0)
        }

        Command::Filter {
            policy,
            caller,
            discriminant,
        } => {
            let ctx = caller_context(caller);
            let decision = engine
                .evaluate_row_filter(policy, &ctx, discriminant)
                .context("row filter evaluation failed")?;

            audit
                .log(
                    AuditEntry::new(
                        AuditEventType::RowFilterEvaluated,
                        AuditSource::new("data-veil").with_caller_role(&caller.role),
                        serde_json::json!({ "reason": decision.reason }),
                    )
                    .with_evaluation(filter_record(policy, &decision)),
                )
                .await;

            if decision.visible {
                println!("visible");
                Ok(0)
            } else {
                println!("hidden");
                Ok(2)
            }
        }

        Command::Cell {
            table,
            column,
            discriminant,
            caller,
            value,
        } => {
            let ctx = caller_context(caller);
            let cell = engine.evaluate_cell(table, column, &ctx, discriminant, value);
            let bound_policy = engine
                .registry()
                .resolve_mask(table, column)
                .map(|p| p.name().to_string())
                .unwrap_or_else(|| "unbound".to_string());

            let source = AuditSource::new("data-veil")
                .with_caller_role(&caller.role)
                .with_target(table, Some(column.clone()));

            match cell {
                Some(decision) => {
                    audit
                        .log(
                            AuditEntry::new(
                                AuditEventType::CellEvaluated,
                                source,
                                serde_json::json!({ "reason": decision.reason }),
                            )
                            .with_evaluation(mask_record(
                                &bound_policy,
                                &decision,
                                decision.value == *value,
                            )),
                        )
                        .await;

                    println!("{}", decision.value);
                    Ok(0)
                }
                None => {
                    audit
                        .log(AuditEntry::new(
                            AuditEventType::CellEvaluated,
                            source,
                            serde_json::json!({ "outcome": "row hidden" }),
                        ))
                        .await;

                    println!("hidden");
                    Ok(2)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;
    if let Some(ref policy_file) = cli.policy_file {
        cfg.policy_file = policy_file.clone();
    }

    // 3. Init tracing-subscriber with JSON format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        config_file = %cli.config.display(),
        policy_file = %cfg.policy_file.display(),
        "data-veil starting"
    );

    // 4. Start the audit trail.
    let (audit, audit_handle) = AuditSink::start(&cfg.logging.audit_log_path)
        .await
        .context("failed to start audit logger")?;

    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStarted,
            AuditSource::new("data-veil"),
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_file": cli.config.display().to_string(),
            }),
        ))
        .await;

    // 5. Load the policy file and build the engine.
    let engine = match policy_engine::loader::load_policy(&cfg.policy_file)
        .and_then(|config| PolicyEngine::new(config).map_err(Into::into))
    {
        Ok(engine) => engine,
        Err(err) => {
            audit
                .log(AuditEntry::new(
                    AuditEventType::ValidationFailed,
                    AuditSource::new("data-veil"),
                    serde_json::json!({
                        "policy_file": cfg.policy_file.display().to_string(),
                        "error": err.to_string(),
                    }),
                ))
                .await;
            drop(audit);
            let _ = audit_handle.await;
            return Err(err.context("failed to load policy file"));
        }
    };

    info!(policy_file = %cfg.policy_file.display(), ?engine, "policy engine loaded");

    audit
        .log(AuditEntry::new(
            AuditEventType::PolicyLoaded,
            AuditSource::new("data-veil"),
            serde_json::json!({
                "policy_file": cfg.policy_file.display().to_string(),
                "policies": engine.registry().policy_count(),
                "bindings": engine.registry().binding_count(),
            }),
        ))
        .await;

    // 6. Execute the subcommand.
    let exit_code = run(&cli, &engine, &audit).await?;

    // 7. Log shutdown and let the audit writer drain.
    audit
        .log(AuditEntry::new(
            AuditEventType::ProcessStopped,
            AuditSource::new("data-veil"),
            serde_json::json!({ "exit_code": exit_code }),
        ))
        .await;

    drop(audit);
    let _ = audit_handle.await;

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
