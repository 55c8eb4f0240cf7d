//! Declarative commands
//!
//! - `apply` - Make the server match the manifest
//! - `diff` - Preview which schemes apply would reconcile
//! - `status` - Show what the server currently has
//! - `forget` - Drop the recorded state of an application

use anyhow::{Context as AnyhowContext, Result, bail};
use authsync::{ChangeSet, DesiredSpec, Scheme};
use colored::Colorize;
use iisapi::Client;

use crate::Context;
use crate::cli::{ApplyArgs, ManifestArgs};
use crate::config::{Manifest, Settings};
use crate::paths;
use crate::progress::TerminalObserver;
use crate::resource::{AuthenticationResource, record_outcome};
use crate::state::IisctlState;
use crate::ui;

// ============================================================================
// Planning
// ============================================================================

/// One manifest entry with the schemes due for reconciliation
#[derive(Debug)]
struct Pending {
    application: String,
    desired: DesiredSpec,
    changed: ChangeSet,
}

fn load_manifest(args: &ManifestArgs) -> Result<Manifest> {
    let path = paths::expand(&args.manifest.to_string_lossy());
    Manifest::load(&path)
}

/// Work out what each entry needs, without touching the network
fn pending(
    manifest: &Manifest,
    state: &IisctlState,
    application: Option<&str>,
    force: bool,
) -> Result<Vec<Pending>> {
    manifest
        .entries(application)?
        .into_iter()
        .map(|entry| {
            let desired = entry.desired()?;
            let changed = if force {
                ChangeSet::all_declared(&desired)
            } else {
                state.changes(&entry.application, &desired)
            };
            Ok(Pending {
                application: entry.application.clone(),
                desired,
                changed,
            })
        })
        .collect()
}

fn connect(ctx: &Context) -> Result<Client> {
    let settings = Settings::load()?;
    let connection = settings.connection(ctx.host.as_deref(), ctx.access_key.as_deref())?;
    log::debug!("Connecting with {connection:?}");
    Client::new(&connection).context("Could not set up HTTP client")
}

fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_pending(item: &Pending) {
    ui::section(&item.application);
    for (scheme, block) in item.desired.iter() {
        if item.changed.contains(scheme) {
            println!("  {} {} {}", "~".yellow(), scheme, ui::format_attributes(block).dimmed());
        } else {
            println!("  {} {} {}", "=".dimmed(), scheme, "unchanged".dimmed());
        }
    }
    for scheme in Scheme::all() {
        if !item.desired.contains(*scheme) {
            println!("  {} {} {}", " ".dimmed(), scheme, "not managed".dimmed());
        }
    }
}

// ============================================================================
// Diff Command
// ============================================================================

pub fn diff(_ctx: &Context, args: &ManifestArgs) -> Result<()> {
    let manifest = load_manifest(args)?;
    let state = IisctlState::load()?;
    let items = pending(&manifest, &state, args.application.as_deref(), false)?;

    ui::header("Authentication Diff");
    let mut due = 0;
    for item in &items {
        print_pending(item);
        due += item.changed.len();
    }

    println!();
    if due == 0 {
        ui::success("Everything is up to date");
    } else {
        ui::info(&format!("{due} scheme(s) would be reconciled. Run 'iisctl apply' to apply."));
    }
    Ok(())
}

// ============================================================================
// Apply Command
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let manifest = load_manifest(&args.manifest)?;
    let mut state = IisctlState::load()?;
    let items = pending(
        &manifest,
        &state,
        args.manifest.application.as_deref(),
        args.force,
    )?;

    if !args.dry_run {
        for item in &items {
            state.prune_undeclared(&item.application, &item.desired);
        }
    }

    let (due, up_to_date): (Vec<_>, Vec<_>) = items.into_iter().partition(|i| !i.changed.is_empty());
    for item in &up_to_date {
        log::info!("{}: no changes", item.application);
    }
    if due.is_empty() {
        if !args.dry_run {
            state.save()?;
        }
        ui::success("Everything is up to date");
        return Ok(());
    }

    ui::header("Authentication Apply");
    for item in &due {
        print_pending(item);
    }
    println!();

    let client = connect(ctx)?;
    let resource = AuthenticationResource::new(&client);

    if args.dry_run {
        return dry_run(&resource, &state, &due);
    }

    if !args.yes && !confirm_proceed()? {
        ui::info("Aborted");
        return Ok(());
    }

    let mut failed = 0;
    for item in &due {
        if !ctx.quiet {
            ui::section(&item.application);
        }
        let mut observer = TerminalObserver::new(ctx.quiet);
        let root_id = state
            .application(&item.application)
            .and_then(|app| app.root_id.clone());

        let outcome = match &root_id {
            Some(root_id) => resource.update(root_id, &item.desired, &item.changed, &mut observer),
            None => resource.create(&item.application, &item.desired, &mut observer),
        };

        match outcome {
            Ok(outcome) => {
                record_outcome(&mut state, &item.application, &item.desired, &outcome);
                if let Err(failure) = &outcome.result {
                    failed += 1;
                    ui::error(&format!("{}: {failure}", item.application));
                    ui::dim(failure.source.category().advice());
                    if failure.is_partial() {
                        ui::dim(&format!(
                            "{} scheme(s) were committed before the failure",
                            failure.applied.len()
                        ));
                    }
                } else if !ctx.quiet {
                    ui::success(&format!(
                        "{}: {} applied, {} already in sync",
                        item.application,
                        observer.applied(),
                        observer.in_sync()
                    ));
                }
            }
            Err(e) => {
                failed += 1;
                state.record_error(&item.application, Some(e.to_string()));
                ui::error(&format!("{}: {e}", item.application));
                ui::dim(e.category().advice());
            }
        }

        // Persist after every application so partial progress survives.
        state.save()?;
    }

    if failed > 0 {
        bail!("{failed} application(s) failed");
    }
    Ok(())
}

fn dry_run(resource: &AuthenticationResource<'_>, state: &IisctlState, due: &[Pending]) -> Result<()> {
    ui::header("Dry Run");
    for item in due {
        let root_id = state
            .application(&item.application)
            .and_then(|app| app.root_id.as_deref());
        let plans = resource
            .plan(&item.application, root_id, &item.desired, &item.changed)
            .with_context(|| format!("Could not plan {}", item.application))?;

        ui::section(&item.application);
        for plan in plans {
            if !plan.has_changes() {
                println!("  {} {} {}", "=".dimmed(), plan.scheme, "in sync".dimmed());
                continue;
            }
            println!("  {} {}", "~".yellow(), plan.scheme);
            let before = plan.current.to_attributes();
            let after = plan.merged.to_attributes();
            for key in &plan.changed_keys {
                ui::dim(&ui::format_change(key, before.get(key), after.get(key)));
            }
        }
    }
    println!();
    ui::info("Dry run: nothing was written");
    Ok(())
}

// ============================================================================
// Status Command
// ============================================================================

pub fn status(ctx: &Context, application: &str) -> Result<()> {
    let client = connect(ctx)?;
    let state = IisctlState::load()?;
    let resource = AuthenticationResource::new(&client);

    let current = match state.application(application).and_then(|a| a.root_id.as_deref()) {
        Some(root_id) => resource.read(root_id),
        None => resource.read_application(application),
    }
    .with_context(|| format!("Could not read authentication of {application}"))?;

    ui::header(&format!("Authentication of {application}"));
    ui::kv("root", &current.root_id);
    for (scheme, provider) in &current.schemes {
        match provider {
            Some(provider) => {
                let mark = if provider.enabled() {
                    "●".green()
                } else {
                    "○".dimmed()
                };
                let mut attributes = provider.to_attributes();
                attributes.remove("enabled");
                println!("  {mark} {scheme:<10} {}", ui::format_attributes(&attributes));
            }
            None => println!("  {} {scheme:<10} {}", "-".dimmed(), "not exposed".dimmed()),
        }
    }

    if let Some(recorded) = state.application(application) {
        if let Some(when) = recorded.last_applied {
            println!();
            ui::kv("last applied", &when.to_rfc3339());
        }
        if let Some(error) = &recorded.last_error {
            ui::warn(&format!("Last apply failed: {error}"));
        }
    }
    Ok(())
}

// ============================================================================
// Forget Command
// ============================================================================

pub fn forget(_ctx: &Context, application: &str) -> Result<()> {
    let mut state = IisctlState::load()?;
    if AuthenticationResource::delete(&mut state, application) {
        state.save()?;
        ui::success(&format!("Forgot {application}; the next apply reconciles every declared scheme"));
    } else {
        ui::info(&format!("Nothing recorded for {application}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Manifest;
    use authsync::{Attributes, BasicAuthentication, ProviderState};

    const MANIFEST: &str = r#"
[[authentication]]
application = "app1"

[authentication.basic]
realm = "Corp"

[[authentication]]
application = "app2"

[authentication.windows]
enabled = true
"#;

    fn observed() -> ProviderState {
        ProviderState::Basic(BasicAuthentication {
            id: "ba1".to_string(),
            enabled: true,
            default_logon_domain: String::new(),
            realm: "Corp".to_string(),
            extra: serde_json::Map::new(),
        })
    }

    #[test]
    fn test_pending_without_state_marks_everything() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let items = pending(&manifest, &IisctlState::default(), None, false).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].changed.contains(Scheme::Basic));
        assert!(items[1].changed.contains(Scheme::Windows));
    }

    #[test]
    fn test_pending_uses_recorded_state() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let mut state = IisctlState::default();
        let block = Attributes::from([("realm".to_string(), "Corp".into())]);
        state.record_applied("app1", Scheme::Basic, &block, &observed());

        let items = pending(&manifest, &state, Some("app1"), false).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].changed.is_empty());

        let forced = pending(&manifest, &state, Some("app1"), true).unwrap();
        assert!(forced[0].changed.contains(Scheme::Basic));
    }

    #[test]
    fn test_pending_unknown_application() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert!(pending(&manifest, &IisctlState::default(), Some("app9"), false).is_err());
    }
}
