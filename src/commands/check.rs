use super::{report_warnings, Context};
use crate::output::UserOutput;
use devstack::dependency::DependencyStatus;
use devstack::{ReconciliationReport, Registry};

pub async fn run_check(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("Checking development dependencies...\n");
    check_registry(ctx, &Registry::base(), out).await
}

pub async fn run_check_cluster_deps(ctx: &Context, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.status("Checking cluster dependencies...\n");
    check_registry(ctx, &Registry::cluster(), out).await
}

async fn check_registry(
    ctx: &Context,
    registry: &Registry,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let report = ctx.bootstrap().check(registry).await;
    print_report(registry, &report, out);
    out.blank();

    if let Some(warning) = report.optional_warning() {
        report_warnings(&[warning], out);
    }
    report.ensure_required()?;
    out.success("All required dependencies are installed");
    Ok(())
}

/// One line per dependency, in registry order.
fn print_report(registry: &Registry, report: &ReconciliationReport, out: &dyn UserOutput) {
    for dep in registry.dependencies() {
        out.progress(&format!("{}: ", dep.name));

        let checked = report
            .present
            .iter()
            .chain(report.unhealthy.iter())
            .find(|c| c.name() == dep.name);
        let line = match checked.map(|c| &c.status) {
            Some(DependencyStatus::Present { version }) => {
                version.clone().unwrap_or_else(|| "installed".to_string())
            }
            Some(DependencyStatus::Unhealthy { reason }) => {
                format!("installed but not healthy ({})", reason)
            }
            Some(DependencyStatus::Missing) | None if dep.required => "Not found".to_string(),
            Some(DependencyStatus::Missing) | None => "Not found (optional)".to_string(),
        };
        out.finish_progress(&line);
    }
}
